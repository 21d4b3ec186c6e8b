// Application layer - use cases and orchestration over the repository
// and the pure settlement engine.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
