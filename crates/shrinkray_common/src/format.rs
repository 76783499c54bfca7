//! Image formats recognized by the pipeline.

use std::fmt;
use std::path::Path;

/// File extensions accepted as pipeline inputs, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp"];

/// An image format the pipeline knows how to route.
///
/// Every supported source extension maps to exactly one variant. The format
/// decides whether the primary output is re-encoded or copied, and whether a
/// WebP derivative is produced alongside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG (`.jpg`, `.jpeg`).
    Jpeg,
    /// PNG (`.png`).
    Png,
    /// GIF (`.gif`).
    Gif,
    /// SVG (`.svg`).
    Svg,
    /// WebP (`.webp`), also the derivative format.
    WebP,
}

impl ImageFormat {
    /// The format generated next to eligible raster outputs.
    pub const DERIVATIVE: ImageFormat = ImageFormat::WebP;

    /// Looks up a format by file extension, ignoring ASCII case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "svg" => Some(Self::Svg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Looks up the format of a path from its extension.
    ///
    /// Returns `None` for paths without an extension, non-UTF-8 extensions,
    /// and extensions outside [`SUPPORTED_EXTENSIONS`].
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }

    /// Whether a WebP derivative is generated for sources of this format.
    pub fn has_derivative(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }

    /// Whether the primary output is a byte-for-byte copy of the source.
    pub fn is_passthrough(self) -> bool {
        matches!(self, Self::Gif | Self::WebP)
    }

    /// Canonical file extension written for outputs of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Svg => "svg",
            Self::WebP => "webp",
        }
    }

    /// Lowercase name used in configuration keys and log output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Svg => "svg",
            Self::WebP => "webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
