//! Geometry, colour depth and DPI values shared by fonts and surfaces

/// Position and size of a surface in window-system coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionSize {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PositionSize {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when either dimension is zero or negative
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Width and height with the axes exchanged, for 90/270 degree outputs
    pub fn swapped(&self) -> Self {
        Self {
            x: self.x,
            y: self.y,
            width: self.height,
            height: self.width,
        }
    }
}

/// Colour depth of a surface's pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorDepth {
    #[default]
    Depth24,
    Depth32,
}

impl ColorDepth {
    /// Transparent surfaces need an alpha channel
    pub fn from_transparency(transparent: bool) -> Self {
        if transparent {
            Self::Depth32
        } else {
            Self::Depth24
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Depth24 => 24,
            Self::Depth32 => 32,
        }
    }

    pub fn has_alpha(self) -> bool {
        self == Self::Depth32
    }
}

/// Device resolution in dots per inch
///
/// A zero component means "use the typographic default of 72".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dpi {
    pub horizontal: u32,
    pub vertical: u32,
}

impl Dpi {
    pub const DEFAULT: u32 = 72;

    pub fn new(horizontal: u32, vertical: u32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Horizontal resolution with the zero fallback applied
    pub fn effective_horizontal(&self) -> u32 {
        if self.horizontal == 0 {
            Self::DEFAULT
        } else {
            self.horizontal
        }
    }

    /// Vertical resolution with the zero fallback applied
    pub fn effective_vertical(&self) -> u32 {
        if self.vertical == 0 {
            Self::DEFAULT
        } else {
            self.vertical
        }
    }
}
