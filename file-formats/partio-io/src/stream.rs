//! File streams with transparent gzip handling
//!
//! Input streams sniff the gzip magic so every format reads compressed and
//! plain files alike. Output streams gzip when asked and must be finished
//! explicitly so the trailer is written.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use log::debug;

/// Leading bytes of every gzip member
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A readable stream that may be gzip-wrapped
#[derive(Debug)]
pub enum Input<R: BufRead> {
    /// Bytes are passed through
    Plain(R),
    /// Bytes are gunzipped
    Gzip(BufReader<MultiGzDecoder<R>>),
}

impl<R: BufRead> Input<R> {
    /// Wrap `reader`, inflating it if it starts with the gzip magic
    pub fn detect(mut reader: R) -> io::Result<Self> {
        let head = reader.fill_buf()?;
        if head.starts_with(&GZIP_MAGIC) {
            debug!("gzip wrapper detected");
            Ok(Input::Gzip(BufReader::new(MultiGzDecoder::new(reader))))
        } else {
            Ok(Input::Plain(reader))
        }
    }

    /// Whether the stream is being gunzipped
    pub fn is_compressed(&self) -> bool {
        matches!(self, Input::Gzip(_))
    }
}

impl<R: BufRead> Read for Input<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::Plain(r) => r.read(buf),
            Input::Gzip(r) => r.read(buf),
        }
    }
}

impl<R: BufRead> BufRead for Input<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Input::Plain(r) => r.fill_buf(),
            Input::Gzip(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amount: usize) {
        match self {
            Input::Plain(r) => r.consume(amount),
            Input::Gzip(r) => r.consume(amount),
        }
    }
}

/// Open `path` for reading with gzip detection
pub fn open_input(path: &Path) -> io::Result<Input<BufReader<File>>> {
    Input::detect(BufReader::new(File::open(path)?))
}

/// A writable stream that may gzip its contents
#[derive(Debug)]
pub enum Output<W: Write> {
    /// Bytes are passed through
    Plain(W),
    /// Bytes are gzipped
    Gzip(GzEncoder<W>),
}

impl<W: Write> Output<W> {
    /// Wrap `writer`, gzipping when `compressed` is set
    pub fn new(writer: W, compressed: bool) -> Self {
        if compressed {
            Output::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            Output::Plain(writer)
        }
    }

    /// Flush everything, write the gzip trailer if any, and return the inner writer
    pub fn finish(self) -> io::Result<W> {
        let mut writer = match self {
            Output::Plain(w) => w,
            Output::Gzip(encoder) => encoder.finish()?,
        };
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write> Write for Output<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Plain(w) => w.write(buf),
            Output::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Plain(w) => w.flush(),
            Output::Gzip(w) => w.flush(),
        }
    }
}

/// Create `path` for writing, gzipping when `compressed` is set
pub fn create_output(path: &Path, compressed: bool) -> io::Result<Output<BufWriter<File>>> {
    Ok(Output::new(BufWriter::new(File::create(path)?), compressed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_passthrough() {
        let mut input = Input::detect(&b"PGEOMETRY V5"[..]).unwrap();
        assert!(!input.is_compressed());
        let mut text = String::new();
        input.read_to_string(&mut text).unwrap();
        assert_eq!(text, "PGEOMETRY V5");
    }

    #[test]
    fn test_gzip_round_trip() {
        let mut output = Output::new(Vec::new(), true);
        output.write_all(b"ICECACHE").unwrap();
        let bytes = output.finish().unwrap();
        assert!(bytes.starts_with(&GZIP_MAGIC));

        let mut input = Input::detect(bytes.as_slice()).unwrap();
        assert!(input.is_compressed());
        let mut decoded = Vec::new();
        input.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, b"ICECACHE");
    }

    #[test]
    fn test_empty_input() {
        let mut input = Input::detect(&b""[..]).unwrap();
        let mut decoded = Vec::new();
        assert_eq!(input.read_to_end(&mut decoded).unwrap(), 0);
    }
}
