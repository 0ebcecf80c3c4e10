use crate::catalog::DirectoryCatalog;
use crate::digest::DigestCache;
use crate::progress::{NoProgress, ProgressEvent, ProgressSink};
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Forward progress events to the sink. When off the sink is never called.
    pub show_progress: bool,
    /// Skip names that already took part in an earlier duplicate group instead
    /// of visiting them again as the current item. Leaves the same files behind.
    pub skip_resolved: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            show_progress: true,
            skip_resolved: false,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What a single run did.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub candidates: usize,
    pub visited: usize,
    pub skipped: usize,
    pub duplicate_groups: usize,
    pub deleted: Vec<PathBuf>,
    pub reclaimed_bytes: u64,
    pub failures: Vec<DeletionFailure>,
}

impl RunReport {
    fn new(candidates: usize) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    fn record_deletion(&mut self, path: &Path, size: u64) {
        self.deleted.push(path.to_path_buf());
        self.reclaimed_bytes += size;
    }

    fn record_failure(&mut self, path: &Path, err: impl ToString) {
        self.failures.push(DeletionFailure {
            path: path.to_path_buf(),
            error: err.to_string(),
        });
    }
}

/// Deletes every file in a catalog whose content duplicates a file listed
/// before it, keeping the earliest copy.
pub struct DuplicateResolver<S = NoProgress> {
    sink: S,
    options: ResolverOptions,
}

impl DuplicateResolver<NoProgress> {
    pub fn new() -> Self {
        Self::with_sink(NoProgress)
    }
}

impl Default for DuplicateResolver<NoProgress> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ProgressSink> DuplicateResolver<S> {
    pub fn with_sink(sink: S) -> Self {
        Self {
            sink,
            options: ResolverOptions::default(),
        }
    }

    pub fn options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Visits every catalogued name in order and resolves its duplicate group.
    ///
    /// Files that vanish mid-run never match anything, and a file that cannot
    /// be deleted is reported and skipped; neither stops the run.
    pub fn run(&mut self, catalog: &DirectoryCatalog) -> RunReport {
        let mut report = RunReport::new(catalog.len());
        let mut digests = DigestCache::new();
        let mut resolved: HashSet<&OsStr> = HashSet::new();
        let mut survivors: HashSet<&OsStr> = HashSet::new();
        let mut failed: HashSet<PathBuf> = HashSet::new();

        for item in catalog.files() {
            if self.options.skip_resolved && resolved.contains(item.as_os_str()) {
                report.skipped += 1;
                continue;
            }
            report.visited += 1;

            let group = self.duplicate_group(catalog, item, &mut digests);
            if group.len() <= 1 {
                continue;
            }
            // A member whose deletion failed rebuilds its survivor's group when visited.
            if survivors.insert(group[0].as_os_str()) {
                report.duplicate_groups += 1;
            }
            resolved.extend(group.iter().map(|name| name.as_os_str()));
            self.delete_all_but_first(catalog, &group, &mut digests, &mut failed, &mut report);
        }

        log::debug!(
            "Run over {} finished: {} visited, {} skipped, {} groups, {} deleted, {} failures",
            catalog.directory().display(),
            report.visited,
            report.skipped,
            report.duplicate_groups,
            report.deleted.len(),
            report.failures.len()
        );
        report
    }

    fn emit(&mut self, event: ProgressEvent) {
        if self.options.show_progress {
            self.sink.notify(&event);
        }
    }

    /// Collects every catalogued name whose content equals `item`'s, in
    /// catalog order. Empty when `item` itself is gone.
    fn duplicate_group<'c>(
        &mut self,
        catalog: &'c DirectoryCatalog,
        item: &OsString,
        digests: &mut DigestCache,
    ) -> Vec<&'c OsString> {
        let item_path = catalog.resolve_path(item);
        self.emit(ProgressEvent::Reading(item_path.clone()));

        let mut group = Vec::new();
        for candidate in catalog.files() {
            let candidate_path = catalog.resolve_path(candidate);
            self.emit(ProgressEvent::Comparing(candidate_path.clone()));

            if !candidate_path.exists() || !item_path.exists() {
                continue;
            }
            let (Some(expected), Some(actual)) =
                (digests.digest(&item_path), digests.digest(&candidate_path))
            else {
                continue;
            };
            if expected == actual {
                group.push(candidate);
            }
        }
        group
    }

    fn delete_all_but_first(
        &mut self,
        catalog: &DirectoryCatalog,
        group: &[&OsString],
        digests: &mut DigestCache,
        failed: &mut HashSet<PathBuf>,
        report: &mut RunReport,
    ) {
        for name in group.iter().skip(1) {
            let path = catalog.resolve_path(name);
            if !path.exists() || failed.contains(&path) {
                continue;
            }
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            self.emit(ProgressEvent::Deleting(path.clone()));
            match fs::remove_file(&path) {
                Ok(()) => {
                    digests.evict(&path);
                    report.record_deletion(&path, size);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    digests.evict(&path);
                }
                Err(err) => {
                    log::warn!("Error deleting {}: {}", path.display(), err);
                    self.emit(ProgressEvent::DeleteFailed {
                        path: path.clone(),
                        error: err.to_string(),
                    });
                    report.record_failure(&path, err);
                    failed.insert(path);
                }
            }
        }
    }
}
