//! Specific background job implementations.

pub mod gazette_scan;

pub use gazette_scan::GazetteScanJob;
