//! Error types for the DALi adaptor crates
//!
//! Font errors carry the native FreeType error code so callers can log or
//! compare it unchanged. Surface errors describe lifecycle misuse and native
//! resource failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdaptorError>;

/// Result of a face or size operation
pub type FaceResult<T> = std::result::Result<T, FaceError>;

/// Result of a render-surface operation
pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

/// FreeType-compatible error codes
pub mod codes {
    pub const OK: i32 = 0x00;
    pub const CANNOT_OPEN_RESOURCE: i32 = 0x01;
    pub const UNKNOWN_FILE_FORMAT: i32 = 0x02;
    pub const INVALID_FILE_FORMAT: i32 = 0x03;
    pub const INVALID_ARGUMENT: i32 = 0x06;
    pub const UNIMPLEMENTED_FEATURE: i32 = 0x07;
    pub const INVALID_PIXEL_SIZE: i32 = 0x17;
    pub const INVALID_FACE_HANDLE: i32 = 0x23;
    pub const INVALID_SIZE_HANDLE: i32 = 0x24;
    pub const OUT_OF_MEMORY: i32 = 0x40;
}

/// Main error type for the adaptor
#[derive(Debug, Error)]
pub enum AdaptorError {
    #[error("Font face error: {0}")]
    Face(#[from] FaceError),

    #[error("Render surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Face loading and size activation errors
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("Cannot open font resource {path}: {source}")]
    CannotOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown font file format: {0}")]
    UnknownFormat(String),

    #[error("{operation} failed, error code: 0x{code:02X}")]
    Native { operation: &'static str, code: i32 },
}

impl FaceError {
    /// Build an error for a failed native call
    pub fn native(operation: &'static str, code: i32) -> Self {
        Self::Native { operation, code }
    }

    /// The FreeType error code this error corresponds to
    pub fn code(&self) -> i32 {
        match self {
            Self::CannotOpen { .. } => codes::CANNOT_OPEN_RESOURCE,
            Self::UnknownFormat(_) => codes::UNKNOWN_FILE_FORMAT,
            Self::Native { code, .. } => *code,
        }
    }
}

/// Render-surface errors
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid surface size: {width}x{height}")]
    InvalidSize { width: f32, height: f32 },

    #[error("Failed to create native {kind}")]
    NativeCreation { kind: &'static str },

    #[error("Failed to create graphics surface: {0}")]
    GraphicsSurface(String),

    #[error("Graphics not initialized")]
    GraphicsNotInitialized,

    #[error("Buffer queue error: {0}")]
    BufferQueue(String),
}
