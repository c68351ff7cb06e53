/// Shared primitive types (frames, canvas, filters, geometry re-exports).
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
pub(crate) mod math;
