//! Adaptor configuration
//!
//! Values are read once, usually at process start, and handed to the
//! components that need them. Nothing here is global.
//!
//! ```
//! use dali_adaptor_core::AdaptorConfig;
//!
//! let config = AdaptorConfig::from_lookup(|name| match name {
//!     "DALI_FACE_SIZE_CACHE_MAX" => Some("64".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.face_size_cache_max, 64);
//! ```

use std::time::Duration;

use crate::types::Dpi;

pub const FACE_SIZE_CACHE_MAX_ENV: &str = "DALI_FACE_SIZE_CACHE_MAX";
pub const WINDOW_WIDTH_ENV: &str = "DALI_WINDOW_WIDTH";
pub const WINDOW_HEIGHT_ENV: &str = "DALI_WINDOW_HEIGHT";
pub const NATIVE_BUFFER_WAIT_ENV: &str = "DALI_NATIVE_BUFFER_WAIT_MS";
pub const DPI_HORIZONTAL_ENV: &str = "DALI_DPI_HORIZONTAL";
pub const DPI_VERTICAL_ENV: &str = "DALI_DPI_VERTICAL";

pub const DEFAULT_FACE_SIZE_CACHE_MAX: usize = 32;
pub const MINIMUM_FACE_SIZE_CACHE_MAX: usize = 3;
pub const DEFAULT_NATIVE_BUFFER_WAIT: Duration = Duration::from_millis(100);

/// Configuration shared by the font and surface subsystems
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptorConfig {
    /// Capacity of the face-size LRU cache
    pub face_size_cache_max: usize,
    /// Window size used when a window surface is created with a zero dimension
    pub default_window_size: Option<(u32, u32)>,
    /// How long a buffer-queue surface waits for a free slot in `pre_render`
    pub native_buffer_wait: Duration,
    /// DPI override for size activation
    pub dpi: Option<Dpi>,
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self {
            face_size_cache_max: DEFAULT_FACE_SIZE_CACHE_MAX,
            default_window_size: None,
            native_buffer_wait: DEFAULT_NATIVE_BUFFER_WAIT,
            dpi: None,
        }
    }
}

impl AdaptorConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(max) = parse_var::<usize, _>(&lookup, FACE_SIZE_CACHE_MAX_ENV) {
            config.face_size_cache_max = max.max(MINIMUM_FACE_SIZE_CACHE_MAX);
        }

        let width = parse_var::<u32, _>(&lookup, WINDOW_WIDTH_ENV);
        let height = parse_var::<u32, _>(&lookup, WINDOW_HEIGHT_ENV);
        if let (Some(width), Some(height)) = (width, height) {
            if width > 0 && height > 0 {
                config.default_window_size = Some((width, height));
            }
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, NATIVE_BUFFER_WAIT_ENV) {
            config.native_buffer_wait = Duration::from_millis(ms);
        }

        let horizontal = parse_var::<u32, _>(&lookup, DPI_HORIZONTAL_ENV);
        let vertical = parse_var::<u32, _>(&lookup, DPI_VERTICAL_ENV);
        if horizontal.is_some() || vertical.is_some() {
            config.dpi = Some(Dpi::new(
                horizontal.unwrap_or_default(),
                vertical.or(horizontal).unwrap_or_default(),
            ));
        }

        log::info!(
            "Adaptor config: face size cache {}, window size {:?}, buffer wait {:?}, dpi {:?}",
            config.face_size_cache_max,
            config.default_window_size,
            config.native_buffer_wait,
            config.dpi
        );
        config
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid number", name, raw);
            None
        }
    }
}
