//! Level 2: Component Tests

pub mod format_detection;
pub mod round_trip;
