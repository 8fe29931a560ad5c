use std::fmt;

/// Color layout of a display or surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    Rgb16,
    Rgb24,
    #[default]
    Rgba32,
    /// The platform did not report a format.
    Unknown,
}

impl PixelFormat {
    #[must_use]
    pub const fn bit_depth(self) -> u32 {
        match self {
            PixelFormat::Rgb16 => 16,
            PixelFormat::Rgb24 => 24,
            PixelFormat::Rgba32 => 32,
            PixelFormat::Unknown => 0,
        }
    }
}

/// Resolution and pixel format of a display.
///
/// Two modes are equal only when both dimensions and the format match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl DisplayMode {
    #[must_use]
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} ({:?})", self.width, self.height, self.pixel_format)
    }
}
