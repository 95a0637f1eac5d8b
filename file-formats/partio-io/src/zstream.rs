//! Chunked zlib streams driven over raw `flate2` state machines
//!
//! The deflate algorithm comes from `flate2`; buffering and chunking are
//! done here so codecs control how many compressed bytes are pulled from the
//! underlying reader at a time. Both types expose `std::io` traits so codecs
//! can apply per-value byte order conversion with `byteorder`.

use std::io::{self, Read, Write};

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

/// Compressed bytes pulled from the source per refill
pub const CHUNK_SIZE: usize = 4096;

/// Inflates a zlib stream read from `R`
#[derive(Debug)]
pub struct ZlibReader<R> {
    input: R,
    inflater: Decompress,
    buffer: Box<[u8]>,
    pos: usize,
    len: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> ZlibReader<R> {
    /// Wrap `input`, which must be positioned at the zlib header
    pub fn new(input: R) -> Self {
        Self {
            input,
            inflater: Decompress::new(true),
            buffer: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            eof: false,
            finished: false,
        }
    }

    /// True once the zlib trailer has been consumed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Total decompressed bytes produced
    pub fn total_out(&self) -> u64 {
        self.inflater.total_out()
    }

    fn refill(&mut self) -> io::Result<()> {
        if self.pos == self.len && !self.eof {
            self.len = self.input.read(&mut self.buffer)?;
            self.pos = 0;
            if self.len == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for ZlibReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.finished {
            return Ok(0);
        }

        loop {
            self.refill()?;
            let flush = if self.eof {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };

            let before_in = self.inflater.total_in();
            let before_out = self.inflater.total_out();
            let status = self
                .inflater
                .decompress(&self.buffer[self.pos..self.len], out, flush)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let consumed = (self.inflater.total_in() - before_in) as usize;
            let produced = (self.inflater.total_out() - before_out) as usize;
            self.pos += consumed;

            if status == Status::StreamEnd {
                self.finished = true;
                return Ok(produced);
            }
            if produced > 0 {
                return Ok(produced);
            }
            if consumed == 0 && (self.eof || self.pos < self.len) {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "zlib stream ended before its trailer",
                ));
            }
        }
    }
}

/// Deflates everything written to it into a zlib stream on `W`
#[derive(Debug)]
pub struct ZlibWriter<W: Write> {
    output: W,
    deflater: Compress,
    buffer: Box<[u8]>,
}

impl<W: Write> ZlibWriter<W> {
    /// Start a zlib stream on `output` at the default compression level
    pub fn new(output: W) -> Self {
        Self {
            output,
            deflater: Compress::new(Compression::default(), true),
            buffer: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
        }
    }

    fn step(&mut self, input: &[u8], flush: FlushCompress) -> io::Result<(usize, Status)> {
        let before_in = self.deflater.total_in();
        let before_out = self.deflater.total_out();
        let status = self
            .deflater
            .compress(input, &mut self.buffer, flush)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let consumed = (self.deflater.total_in() - before_in) as usize;
        let produced = (self.deflater.total_out() - before_out) as usize;
        self.output.write_all(&self.buffer[..produced])?;
        Ok((consumed, status))
    }

    /// Write the zlib trailer and return the inner writer
    pub fn finish(mut self) -> io::Result<W> {
        loop {
            let (_, status) = self.step(&[], FlushCompress::Finish)?;
            if status == Status::StreamEnd {
                break;
            }
        }
        self.output.flush()?;
        Ok(self.output)
    }
}

impl<W: Write> Write for ZlibWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        loop {
            let (consumed, _) = self.step(data, FlushCompress::None)?;
            if consumed > 0 {
                return Ok(consumed);
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Deflate `data` into a standalone zlib stream
pub fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut writer = ZlibWriter::new(Vec::with_capacity(data.len() / 2 + 64));
    writer.write_all(data)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

    #[test]
    fn test_round_trip_across_chunks() {
        let original: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let compressed = deflate(&original).unwrap();
        assert!(compressed.len() < original.len());

        let mut reader = ZlibReader::new(compressed.as_slice());
        let mut decoded = Vec::new();
        reader.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, original);
        assert!(reader.is_finished());
    }

    #[test]
    fn test_per_value_encoding() {
        let mut writer = ZlibWriter::new(Vec::new());
        for i in 0..1000 {
            writer.write_f32::<LittleEndian>(i as f32 * 0.25).unwrap();
        }
        let compressed = writer.finish().unwrap();

        let mut reader = ZlibReader::new(compressed.as_slice());
        for i in 0..1000 {
            assert_eq!(reader.read_f32::<LittleEndian>().unwrap(), i as f32 * 0.25);
        }
        assert_eq!(reader.read_u8().unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = deflate(&[7u8; 10_000]).unwrap();
        let truncated = &compressed[..compressed.len() / 2];
        let mut reader = ZlibReader::new(truncated);
        let mut out = vec![0u8; 10_000];
        let err = reader.read_exact(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_corrupt_stream() {
        let mut reader = ZlibReader::new(&[0xffu8, 0xff, 0xff, 0xff][..]);
        let mut out = [0u8; 16];
        assert_eq!(
            reader.read(&mut out).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
    }
}
