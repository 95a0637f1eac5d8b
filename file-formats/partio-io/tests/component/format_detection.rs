//! Format selection from paths and gzip detection from content

use std::fs;

use crate::common::{assert_same_attribute, cache_path, sample_particles, temp_dir};
use partio_io::{Error, ParticleFormat, ReadOptions, WriteOptions};

#[test]
fn test_gzip_detected_by_magic_not_name() {
    let dir = temp_dir();
    let compressed = cache_path(dir.path(), "frame.pdb.gz");
    let renamed = cache_path(dir.path(), "frame.pdb");
    let particles = sample_particles(5, 30);

    partio_io::write(&compressed, &particles, false).expect("write");
    let bytes = fs::read(&compressed).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

    fs::rename(&compressed, &renamed).unwrap();
    let read = partio_io::read(&renamed).expect("read");
    assert_same_attribute(&particles, &read, "position");
}

#[test]
fn test_compressed_flag_without_suffix() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "frame.pda");
    let particles = sample_particles(5, 3);

    partio_io::write(&path, &particles, true).expect("write");
    assert_eq!(&fs::read(&path).unwrap()[..2], &[0x1f, 0x8b]);
    let read = partio_io::read(&path).expect("read");
    assert_same_attribute(&particles, &read, "mass");
}

#[test]
fn test_forced_format_ignores_extension() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "frame.cache");
    let particles = sample_particles(9, 12);

    let options = WriteOptions::new().format(ParticleFormat::Rpc);
    partio_io::write_with(&path, &particles, options).expect("write");
    assert!(partio_io::read(&path).unwrap_err().is_usage());

    let read = partio_io::read_with(&path, ReadOptions::new().format(ParticleFormat::Rpc))
        .expect("read");
    assert_same_attribute(&particles, &read, "velocity");
}

#[test]
fn test_uppercase_extension() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "FRAME.BGEO");
    let particles = sample_particles(2, 4);
    partio_io::write(&path, &particles, false).expect("write");
    assert_eq!(partio_io::read(&path).expect("read").num_particles(), 4);
}

#[test]
fn test_missing_file_and_unknown_extension() {
    let dir = temp_dir();
    let missing = partio_io::read(cache_path(dir.path(), "nothing.prt")).unwrap_err();
    assert!(matches!(missing, Error::Io(_)));

    let unknown = partio_io::read(cache_path(dir.path(), "frame.xyz")).unwrap_err();
    assert!(matches!(unknown, Error::UnknownExtension(ref ext) if ext == "xyz"));

    let particles = sample_particles(2, 1);
    let err = partio_io::write(cache_path(dir.path(), "noextension"), &particles, false)
        .unwrap_err();
    assert!(matches!(err, Error::NoExtension(_)));
}

#[test]
fn test_wrong_format_content() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "frame.prt");
    fs::write(&path, b"definitely not a particle file").unwrap();
    assert!(partio_io::read(&path).unwrap_err().is_corruption());
}
