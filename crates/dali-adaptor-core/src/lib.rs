//! Shared foundations for the DALi adaptor crates
//!
//! Error types, geometry and DPI values, and the adaptor configuration used by
//! both the font face manager (`dali-text`) and the render surfaces
//! (`dali-surface`).

pub mod config;
pub mod error;
pub mod types;

pub use config::AdaptorConfig;
pub use error::{AdaptorError, FaceError, FaceResult, Result, SurfaceError, SurfaceResult};
pub use types::{ColorDepth, Dpi, PositionSize};
