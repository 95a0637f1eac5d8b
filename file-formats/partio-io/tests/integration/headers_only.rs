//! Headers-only reads report the same schema as full reads

use crate::common::{cache_path, sample_particles, temp_dir};
use test_case::test_case;

#[test_case("h.bgeo")]
#[test_case("h.geo")]
#[test_case("h.prt")]
#[test_case("h.rpc")]
#[test_case("h.ptc")]
#[test_case("h.pdb")]
#[test_case("h.pda")]
#[test_case("h.icecache.gz")]
fn test_headers_match_full_read(name: &str) {
    let dir = temp_dir();
    let path = cache_path(dir.path(), name);
    partio_io::write(&path, &sample_particles(21, 64), false).expect("write");

    let full = partio_io::read(&path).expect("full read");
    let headers = partio_io::read_headers(&path).expect("headers read");

    assert!(headers.is_headers_only());
    assert!(!full.is_headers_only());
    assert_eq!(headers.num_particles(), full.num_particles());
    assert_eq!(headers.num_attributes(), full.num_attributes());
    for attr in full.attributes() {
        let declared = headers
            .attribute_info(&attr.name)
            .unwrap_or_else(|| panic!("'{}' missing from headers", attr.name));
        assert_eq!(declared.attr_type, attr.attr_type);
        assert_eq!(declared.count, attr.count);
    }
}

#[test]
fn test_headers_only_skips_body_damage() {
    let dir = temp_dir();
    let path = cache_path(dir.path(), "damaged.prt");
    partio_io::write(&path, &sample_particles(4, 500), false).expect("write");

    let mut bytes = std::fs::read(&path).unwrap();
    let len = bytes.len();
    bytes.truncate(len - len / 3);
    std::fs::write(&path, &bytes).unwrap();

    let headers = partio_io::read_headers(&path).expect("headers survive");
    assert_eq!(headers.num_particles(), 500);
    assert!(partio_io::read(&path).unwrap_err().is_corruption());
}
