//! Configuration types deserialized from `shrinkray.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use shrinkray_common::ImageFormat;

/// The top-level configuration parsed from `shrinkray.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Source, output, and manifest locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Change-detection settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Execution settings.
    #[serde(default)]
    pub run: RunConfig,
    /// External optimizer commands, one per output format.
    #[serde(default)]
    pub encoders: EncodersConfig,
}

/// Filesystem layout, relative to the project root.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the original images.
    #[serde(default = "default_source")]
    pub source: String,
    /// Directory that mirrors the source tree with optimized outputs.
    #[serde(default = "default_output")]
    pub output: String,
    /// Manifest file recording what was processed.
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            manifest: default_manifest(),
        }
    }
}

fn default_source() -> String {
    "src/images".to_string()
}

fn default_output() -> String {
    "images".to_string()
}

fn default_manifest() -> String {
    ".image-cache.json".to_string()
}

/// Change-detection settings.
#[derive(Debug, Default, Deserialize)]
pub struct CacheConfig {
    /// Hash every file instead of trusting matching size and mtime.
    #[serde(default)]
    pub verify_content: bool,
}

/// Execution settings.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Number of files decided and encoded concurrently. `1` is sequential.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
        }
    }
}

fn default_jobs() -> usize {
    1
}

/// Optimizer command lines, keyed by the format they produce.
///
/// Each command receives the source bytes on stdin and must write the encoded
/// bytes to stdout. A command may be written as a single program name or as
/// an argument list.
#[derive(Debug, Deserialize)]
pub struct EncodersConfig {
    /// Command producing optimized JPEG.
    #[serde(default = "default_jpeg", deserialize_with = "deserialize_string_or_vec")]
    pub jpeg: Vec<String>,
    /// Command producing optimized PNG.
    #[serde(default = "default_png", deserialize_with = "deserialize_string_or_vec")]
    pub png: Vec<String>,
    /// Command producing optimized SVG.
    #[serde(default = "default_svg", deserialize_with = "deserialize_string_or_vec")]
    pub svg: Vec<String>,
    /// Command producing WebP derivatives.
    #[serde(default = "default_webp", deserialize_with = "deserialize_string_or_vec")]
    pub webp: Vec<String>,
}

impl EncodersConfig {
    /// Returns the command line for `format`, or `None` for formats that are
    /// never re-encoded.
    pub fn command(&self, format: ImageFormat) -> Option<&[String]> {
        match format {
            ImageFormat::Jpeg => Some(&self.jpeg),
            ImageFormat::Png => Some(&self.png),
            ImageFormat::Svg => Some(&self.svg),
            ImageFormat::WebP => Some(&self.webp),
            ImageFormat::Gif => None,
        }
    }
}

impl Default for EncodersConfig {
    fn default() -> Self {
        Self {
            jpeg: default_jpeg(),
            png: default_png(),
            svg: default_svg(),
            webp: default_webp(),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn default_jpeg() -> Vec<String> {
    argv(&["cjpeg", "-quality", "80"])
}

fn default_png() -> Vec<String> {
    argv(&["pngquant", "--quality=65-90", "-"])
}

fn default_svg() -> Vec<String> {
    argv(&["svgo", "--input=-", "--output=-"])
}

fn default_webp() -> Vec<String> {
    argv(&["cwebp", "-quiet", "-q", "80", "-o", "-", "--", "-"])
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `jpeg = "my-jpeg-wrapper"` as shorthand for a one-element command.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
