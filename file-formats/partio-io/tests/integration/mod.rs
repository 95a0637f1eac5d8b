//! Level 3: Feature Integration Tests

pub mod headers_only;
pub mod partial_reads;
