//! Imports for syntax extensions.

pub use crate::IntoTarget as _;
pub use crate::engine::EngineResponse as _;
pub use crate::engine::HttpEngine as _;
