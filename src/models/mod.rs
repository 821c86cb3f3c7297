pub mod product;
pub mod snapshot;
pub mod change_set;

// Re-exports for convenience
pub use product::*;
pub use snapshot::*;
pub use change_set::*;
