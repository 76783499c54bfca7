//! Run orchestration: targets → decide → encode → fold → save.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use shrinkray_cache::{
    write_atomic, CacheError, ChangeDetector, Inspection, Manifest, ManifestRecord, ManifestStore,
    PathResolver, Reason, Target, Verdict,
};
use shrinkray_common::{ContentHash, ImageFormat};
use shrinkray_config::Config;
use shrinkray_encode::Encoder;

use crate::error::PipelineError;
use crate::targets::discover_sources;

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a regular file or not a supported image; no manifest effect.
    Skipped {
        /// Why it was skipped.
        reason: Reason,
    },
    /// Outputs reused. `refreshed` carries new stat data to record, if any.
    Cached {
        /// Cache key.
        key: String,
        /// Replacement record after a touched-but-unchanged file.
        refreshed: Option<ManifestRecord>,
    },
    /// Outputs regenerated.
    Updated {
        /// Cache key.
        key: String,
        /// Record describing what was encoded.
        record: ManifestRecord,
    },
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Targets considered.
    pub targets: usize,
    /// Targets re-encoded.
    pub processed: usize,
    /// Targets whose outputs were reused.
    pub cached: usize,
    /// Targets ignored as non-files or unsupported.
    pub skipped: usize,
}

impl RunReport {
    /// Returns `true` if the run had no targets at all.
    pub fn nothing_to_do(&self) -> bool {
        self.targets == 0
    }
}

/// Applies per-file outcomes to the manifest in order.
///
/// This is the only place the manifest changes during a run.
pub fn fold_outcomes(
    manifest: Manifest,
    outcomes: impl IntoIterator<Item = Outcome>,
) -> (Manifest, RunReport) {
    outcomes
        .into_iter()
        .fold((manifest, RunReport::default()), |(mut manifest, mut report), outcome| {
            report.targets += 1;
            match outcome {
                Outcome::Skipped { .. } => report.skipped += 1,
                Outcome::Cached { key, refreshed } => {
                    report.cached += 1;
                    if let Some(record) = refreshed {
                        manifest.insert(key, record);
                    }
                }
                Outcome::Updated { key, record } => {
                    report.processed += 1;
                    manifest.insert(key, record);
                }
            }
            (manifest, report)
        })
}

/// Two targets that resolve to the same output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCollision {
    /// The contested output path.
    pub output: PathBuf,
    /// Key of the earlier target in run order.
    pub first: String,
    /// Key of the later target, whose output is the one kept.
    pub second: String,
}

/// An incremental image pipeline over one source root and output root.
pub struct Pipeline<E> {
    detector: ChangeDetector,
    encoder: E,
    jobs: usize,
    cwd: PathBuf,
    cancel: Option<Arc<AtomicBool>>,
}

impl<E: Encoder> Pipeline<E> {
    /// Creates a sequential pipeline. Explicit targets resolve against the
    /// process working directory unless [`with_cwd`](Self::with_cwd) is set.
    pub fn new(detector: ChangeDetector, encoder: E) -> Self {
        Self {
            detector,
            encoder,
            jobs: 1,
            cwd: PathBuf::from("."),
            cancel: None,
        }
    }

    /// Creates a pipeline from a project's configuration.
    ///
    /// Configured paths are relative to `project_root`, which also becomes
    /// the base for explicit targets. `project_root` should be absolute.
    pub fn from_config(project_root: &Path, config: &Config, encoder: E) -> Self {
        let resolver = PathResolver::new(
            project_root,
            Path::new(&config.paths.source),
            Path::new(&config.paths.output),
        );
        let detector = ChangeDetector::new(resolver).with_verify_content(config.cache.verify_content);
        Self::new(detector, encoder)
            .with_jobs(config.run.jobs)
            .with_cwd(project_root)
    }

    /// Sets how many files are decided and encoded concurrently.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Sets the directory relative explicit targets are resolved against.
    pub fn with_cwd(mut self, cwd: &Path) -> Self {
        self.cwd = cwd.to_path_buf();
        self
    }

    /// Checks `flag` before each file; once set, the run stops without saving.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The resolver used for keys and output paths.
    pub fn resolver(&self) -> &PathResolver {
        self.detector.resolver()
    }

    /// Builds the target list: the explicit paths that lie inside the source
    /// root, or every supported file under it when none are given.
    pub fn targets<P: AsRef<Path>>(&self, explicit: &[P]) -> Result<Vec<PathBuf>, PipelineError> {
        if explicit.is_empty() {
            return discover_sources(self.resolver().source_root());
        }
        Ok(self.resolver().filter_explicit(explicit, &absolute(&self.cwd)?))
    }

    /// Finds targets whose primary or derivative outputs coincide, such as
    /// `logo.png` and `logo.jpg` both producing `logo.webp`.
    pub fn output_collisions(&self, targets: &[PathBuf]) -> Vec<OutputCollision> {
        let mut owners: HashMap<PathBuf, String> = HashMap::new();
        let mut collisions = Vec::new();
        for source in targets {
            if ImageFormat::from_path(source).is_none() {
                continue;
            }
            let Ok(paths) = self.resolver().resolve(source) else {
                continue;
            };
            for output in std::iter::once(paths.primary).chain(paths.derivative) {
                match owners.entry(output) {
                    Entry::Occupied(owner) => collisions.push(OutputCollision {
                        output: owner.key().clone(),
                        first: owner.get().clone(),
                        second: paths.key.clone(),
                    }),
                    Entry::Vacant(slot) => {
                        slot.insert(paths.key.clone());
                    }
                }
            }
        }
        collisions
    }

    /// Runs the pipeline once.
    ///
    /// The manifest is loaded from `store` at the start and saved to it
    /// exactly once at the end, also when there was nothing to do. On error
    /// nothing is saved.
    pub fn run<S, P>(&self, store: &S, explicit: &[P]) -> Result<RunReport, PipelineError>
    where
        S: ManifestStore + ?Sized,
        P: AsRef<Path>,
    {
        let manifest = store.load();
        let targets = self.targets(explicit)?;

        if targets.is_empty() {
            tracing::info!("No images to process.");
            store.save(&manifest)?;
            return Ok(RunReport::default());
        }

        let collisions = self.output_collisions(&targets);
        for collision in &collisions {
            tracing::warn!(
                output = %collision.output.display(),
                first = %collision.first,
                second = %collision.second,
                "two sources write the same output; the later one wins"
            );
        }

        // Colliding outputs are written in target order.
        let parallel = self.jobs > 1 && collisions.is_empty();
        let outcomes = self.process_all(&targets, &manifest, parallel)?;
        let (manifest, report) = fold_outcomes(manifest, outcomes);
        store.save(&manifest)?;

        tracing::info!(
            targets = report.targets,
            processed = report.processed,
            cached = report.cached,
            skipped = report.skipped,
            "run complete"
        );
        Ok(report)
    }

    fn process_all(
        &self,
        targets: &[PathBuf],
        manifest: &Manifest,
        parallel: bool,
    ) -> Result<Vec<Outcome>, PipelineError> {
        if !parallel {
            return targets.iter().map(|t| self.process(t, manifest)).collect();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
        pool.install(|| {
            targets
                .par_iter()
                .map(|t| self.process(t, manifest))
                .collect()
        })
    }

    /// Decides one file and encodes it on a miss. Reads the manifest only.
    fn process(&self, source: &Path, manifest: &Manifest) -> Result<Outcome, PipelineError> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(PipelineError::Cancelled);
        }

        let inspection = self.detector.inspect(source, manifest)?;
        let reason = inspection.reason();
        let outcome = match inspection {
            Inspection::Skipped(_) => {
                tracing::debug!(path = %source.display(), reason = %reason, "skipped");
                Outcome::Skipped { reason }
            }
            Inspection::Checked { target, verdict } => {
                let key = target.paths.key.clone();
                match verdict {
                    Verdict::Fresh => {
                        tracing::debug!(key = %key, reason = %reason, "unchanged");
                        Outcome::Cached {
                            key,
                            refreshed: None,
                        }
                    }
                    Verdict::Refreshed(record) => {
                        tracing::debug!(key = %key, reason = %reason, "touched, content unchanged");
                        Outcome::Cached {
                            key,
                            refreshed: Some(record),
                        }
                    }
                    Verdict::Stale { hash, cause } => {
                        tracing::debug!(key = %key, reason = %reason, cause = ?cause, "encoding");
                        let record = self.encode_outputs(&target, hash)?;
                        Outcome::Updated { key, record }
                    }
                }
            }
        };
        Ok(outcome)
    }

    /// Writes the primary output and, for eligible formats, the derivative.
    fn encode_outputs(&self, target: &Target, hash: ContentHash) -> Result<ManifestRecord, PipelineError> {
        let bytes = std::fs::read(&target.source).map_err(|e| CacheError::io(&target.source, e))?;

        if target.format.is_passthrough() {
            write_atomic(&target.paths.primary, &bytes)?;
        } else {
            let encoded = self.encode(target, &bytes, target.format)?;
            write_atomic(&target.paths.primary, &encoded)?;
        }

        if let Some(derivative) = &target.paths.derivative {
            let encoded = self.encode(target, &bytes, ImageFormat::DERIVATIVE)?;
            write_atomic(derivative, &encoded)?;
        }

        Ok(target.record(hash))
    }

    fn encode(&self, target: &Target, bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>, PipelineError> {
        self.encoder
            .encode(bytes, format)
            .map_err(|source| PipelineError::Encode {
                path: target.source.clone(),
                source,
            })
    }
}

fn absolute(path: &Path) -> Result<PathBuf, PipelineError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| CacheError::io(path, e))?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: &[u8]) -> ManifestRecord {
        ManifestRecord {
            hash: ContentHash::from_bytes(tag),
            size: tag.len() as u64,
            modified_time: 1,
            has_derivative: false,
        }
    }

    #[test]
    fn fold_counts_each_outcome() {
        let outcomes = vec![
            Outcome::Skipped {
                reason: Reason::Unsupported,
            },
            Outcome::Cached {
                key: "a.png".to_string(),
                refreshed: None,
            },
            Outcome::Updated {
                key: "b.png".to_string(),
                record: record(b"b"),
            },
            Outcome::Updated {
                key: "c.svg".to_string(),
                record: record(b"c"),
            },
        ];
        let (manifest, report) = fold_outcomes(Manifest::new(), outcomes);
        assert_eq!(
            report,
            RunReport {
                targets: 4,
                processed: 2,
                cached: 1,
                skipped: 1,
            }
        );
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn fold_applies_refresh_and_keeps_untouched_entries() {
        let mut manifest = Manifest::new();
        manifest.insert("a.png", record(b"old"));
        manifest.insert("z.gif", record(b"z"));

        let (manifest, report) = fold_outcomes(
            manifest,
            [Outcome::Cached {
                key: "a.png".to_string(),
                refreshed: Some(record(b"fresh")),
            }],
        );
        assert_eq!(report.processed, 0);
        assert_eq!(manifest.get("a.png"), Some(&record(b"fresh")));
        assert_eq!(manifest.get("z.gif"), Some(&record(b"z")));
    }

    #[test]
    fn fold_of_nothing_is_identity() {
        let mut manifest = Manifest::new();
        manifest.insert("a.png", record(b"a"));
        let (after, report) = fold_outcomes(manifest.clone(), Vec::new());
        assert_eq!(after, manifest);
        assert!(report.nothing_to_do());
    }

    fn pipeline() -> Pipeline<shrinkray_encode::PassthroughEncoder> {
        let resolver = PathResolver::new(Path::new("/p"), Path::new("src"), Path::new("out"));
        Pipeline::new(ChangeDetector::new(resolver), shrinkray_encode::PassthroughEncoder)
    }

    #[test]
    fn collisions_on_shared_webp() {
        let targets = [
            PathBuf::from("/p/src/logo.jpg"),
            PathBuf::from("/p/src/logo.png"),
            PathBuf::from("/p/src/logo.webp"),
            PathBuf::from("/p/src/notes.txt"),
        ];
        let collisions = pipeline().output_collisions(&targets);
        let webp = PathBuf::from("/p/out/logo.webp");
        assert_eq!(
            collisions,
            vec![
                OutputCollision {
                    output: webp.clone(),
                    first: "logo.jpg".to_string(),
                    second: "logo.png".to_string(),
                },
                OutputCollision {
                    output: webp,
                    first: "logo.jpg".to_string(),
                    second: "logo.webp".to_string(),
                },
            ]
        );
    }

    #[test]
    fn distinct_stems_do_not_collide() {
        let targets = [
            PathBuf::from("/p/src/a.png"),
            PathBuf::from("/p/src/b.jpg"),
            PathBuf::from("/p/src/a/a.png"),
        ];
        assert!(pipeline().output_collisions(&targets).is_empty());
    }

    #[test]
    fn record_uses_hash_from_detection() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/a.svg"), b"<svg/>").unwrap();
        let resolver = PathResolver::new(root, Path::new("src"), Path::new("out"));
        let detector = ChangeDetector::new(resolver);
        let pipeline = Pipeline::new(detector.clone(), shrinkray_encode::PassthroughEncoder);

        let Inspection::Checked { target, .. } = detector
            .inspect(&root.join("src/a.svg"), &Manifest::new())
            .unwrap()
        else {
            panic!("expected a target");
        };
        let supplied = ContentHash::from_bytes(b"from detection");
        let record = pipeline.encode_outputs(&target, supplied).unwrap();
        assert_eq!(record.hash, supplied);
        assert_eq!(std::fs::read(root.join("out/a.svg")).unwrap(), b"<svg/>");
    }

    #[test]
    fn jobs_are_at_least_one() {
        assert_eq!(pipeline().with_jobs(0).jobs, 1);
    }
}
