//! Change detection: deciding whether a source file must be re-encoded.
//!
//! Decisions are made in a fixed order, first match wins:
//!
//! 1. not a regular file → skip
//! 2. unsupported extension → skip
//! 3. recorded size and mtime match and all outputs exist → hit, content unread
//! 4. content hash matches the record → hit if outputs exist (stat refreshed),
//!    otherwise re-encode to restore the outputs
//! 5. anything else → re-encode

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use shrinkray_common::{ContentHash, ImageFormat};

use crate::error::CacheError;
use crate::hasher::{FileStat, SourceHasher};
use crate::manifest::{Manifest, ManifestRecord};
use crate::resolver::{PathResolver, ResolvedPaths};

/// Why a file was not considered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Missing, a directory, or some other non-regular file.
    NotFile,
    /// Extension outside the supported set.
    Unsupported,
}

/// Why a file has to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleCause {
    /// No manifest record exists for the key.
    New,
    /// The content hash differs from the record.
    ContentChanged,
    /// Content is unchanged but an expected output is gone.
    OutputsMissing,
}

/// Outcome of checking a supported source file against its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Stat matched the record and the outputs exist; nothing to update.
    Fresh,
    /// Content matched the record and the outputs exist; the record's stat
    /// fields must be replaced with this one.
    Refreshed(ManifestRecord),
    /// The file must be encoded. The hash was computed while deciding.
    Stale {
        /// Content hash of the current source bytes.
        hash: ContentHash,
        /// What made the cached state unusable.
        cause: StaleCause,
    },
}

/// User-facing reason attached to each decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Not a regular file.
    NotFile,
    /// Unsupported extension.
    Unsupported,
    /// Existing outputs reused.
    Cached,
    /// Outputs regenerated.
    Updated,
}

impl Reason {
    /// Stable short name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFile => "not-file",
            Self::Unsupported => "unsupported",
            Self::Cached => "cached",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A supported source file, with everything known about it at decision time.
#[derive(Debug, Clone)]
pub struct Target {
    /// Absolute source path.
    pub source: PathBuf,
    /// Format derived from the extension.
    pub format: ImageFormat,
    /// Cache key and output locations.
    pub paths: ResolvedPaths,
    /// Size and mtime observed before deciding.
    pub stat: FileStat,
}

impl Target {
    /// Builds the record describing this target with the given content hash.
    pub fn record(&self, hash: ContentHash) -> ManifestRecord {
        ManifestRecord {
            hash,
            size: self.stat.size,
            modified_time: self.stat.modified_time,
            has_derivative: self.paths.derivative.is_some(),
        }
    }
}

/// Result of [`ChangeDetector::inspect`].
#[derive(Debug, Clone)]
pub enum Inspection {
    /// The file is ignored and does not count as processed.
    Skipped(SkipReason),
    /// The file is a pipeline target.
    Checked {
        /// The file and its resolved outputs.
        target: Target,
        /// Whether it needs encoding.
        verdict: Verdict,
    },
}

impl Inspection {
    /// The reason reported for this inspection.
    pub fn reason(&self) -> Reason {
        match self {
            Self::Skipped(SkipReason::NotFile) => Reason::NotFile,
            Self::Skipped(SkipReason::Unsupported) => Reason::Unsupported,
            Self::Checked {
                verdict: Verdict::Stale { .. },
                ..
            } => Reason::Updated,
            Self::Checked { .. } => Reason::Cached,
        }
    }
}

/// Decides whether cached outputs of a source file are still valid.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    resolver: PathResolver,
    verify_content: bool,
}

impl ChangeDetector {
    /// Creates a detector that trusts matching size and mtime.
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            verify_content: false,
        }
    }

    /// When enabled, the stat fast path is skipped and every file is hashed.
    pub fn with_verify_content(mut self, verify_content: bool) -> Self {
        self.verify_content = verify_content;
        self
    }

    /// The resolver used for keys and output paths.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Inspects one source file against the manifest.
    ///
    /// Reads the source's metadata and, unless the fast path applies, its
    /// content. The manifest is not modified; callers apply the verdict.
    pub fn inspect(&self, source: &Path, manifest: &Manifest) -> Result<Inspection, CacheError> {
        let meta = match std::fs::metadata(source) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Inspection::Skipped(SkipReason::NotFile));
            }
            Err(e) => return Err(CacheError::io(source, e)),
        };
        if !meta.is_file() {
            return Ok(Inspection::Skipped(SkipReason::NotFile));
        }
        let Some(format) = ImageFormat::from_path(source) else {
            return Ok(Inspection::Skipped(SkipReason::Unsupported));
        };

        let target = Target {
            source: source.to_path_buf(),
            format,
            paths: self.resolver.resolve(source)?,
            stat: FileStat::from_metadata(&meta).map_err(|e| CacheError::io(source, e))?,
        };
        let verdict = self.judge(&target, manifest.get(&target.paths.key))?;
        Ok(Inspection::Checked { target, verdict })
    }

    fn judge(&self, target: &Target, prior: Option<&ManifestRecord>) -> Result<Verdict, CacheError> {
        if !self.verify_content {
            if let Some(record) = prior {
                if record.size == target.stat.size
                    && record.modified_time == target.stat.modified_time
                    && target.paths.outputs_exist()
                {
                    return Ok(Verdict::Fresh);
                }
            }
        }

        let hash = SourceHasher::hash_file(&target.source)?;
        let cause = match prior {
            None => StaleCause::New,
            Some(record) if record.hash != hash => StaleCause::ContentChanged,
            Some(record) if target.paths.outputs_exist() => {
                let refreshed = ManifestRecord {
                    hash,
                    size: target.stat.size,
                    modified_time: target.stat.modified_time,
                    has_derivative: record.has_derivative,
                };
                if refreshed == *record {
                    return Ok(Verdict::Fresh);
                }
                return Ok(Verdict::Refreshed(refreshed));
            }
            Some(_) => StaleCause::OutputsMissing,
        };
        Ok(Verdict::Stale { hash, cause })
    }
}
