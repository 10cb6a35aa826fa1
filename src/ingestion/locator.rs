//! Resolution of logical sources to workbook files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::{EngineConfig, SourceSpec};
use crate::error::{NormalizeError, NormalizeResult};
use crate::ingestion::excel::WORKBOOK_EXTENSIONS;

/// A logical source and the outcome of looking its file up.
#[derive(Debug)]
pub struct ResolvedSource {
    pub name: String,
    pub path: NormalizeResult<PathBuf>,
}

/// Looks files up across an ordered list of directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    search_paths: Vec<PathBuf>,
}

impl SourceLocator {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(cfg.search_paths.clone())
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First existing `<dir>/<file_name>` in search order.
    pub fn locate(&self, spec: &SourceSpec) -> NormalizeResult<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(&spec.file_name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| NormalizeError::SourceNotFound {
                name: spec.name.clone(),
                file_name: spec.file_name.clone(),
                searched: self.search_paths.clone(),
            })
    }

    /// Resolve every source independently; one missing file never affects the others.
    ///
    /// With no specs, falls back to [`Self::discover`].
    pub fn resolve(&self, specs: &[SourceSpec]) -> Vec<ResolvedSource> {
        if specs.is_empty() {
            return self
                .discover()
                .into_iter()
                .map(|(name, path)| ResolvedSource { name, path: Ok(path) })
                .collect();
        }
        specs
            .iter()
            .map(|spec| {
                let path = self.locate(spec);
                match &path {
                    Ok(p) => {
                        tracing::info!(source = %spec.name, path = %p.display(), "source resolved")
                    }
                    Err(err) => {
                        tracing::warn!(source = %spec.name, error = %err, "source not found")
                    }
                }
                ResolvedSource {
                    name: spec.name.clone(),
                    path,
                }
            })
            .collect()
    }

    /// Every workbook or `.csv` file of the first search directory holding at least one.
    ///
    /// Sources are named after the file stem (the full file name when two stems collide) and
    /// sorted by file name. Office lock files (`~$...`) are ignored.
    pub fn discover(&self) -> Vec<(String, PathBuf)> {
        for dir in self.search_paths.iter().filter(|d| d.is_dir()) {
            let files = list_workbooks(dir);
            if files.is_empty() {
                continue;
            }
            tracing::info!(dir = %dir.display(), files = files.len(), "discovered workbooks");

            let mut taken = BTreeSet::new();
            return files
                .into_iter()
                .map(|path| {
                    let stem = file_part(path.file_stem());
                    let name = if taken.insert(stem.clone()) {
                        stem
                    } else {
                        file_part(path.file_name())
                    };
                    (name, path)
                })
                .collect();
        }
        tracing::warn!(searched = ?self.search_paths, "no workbooks discovered");
        Vec::new()
    }
}

fn list_workbooks(dir: &Path) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files: Vec<PathBuf> = WORKBOOK_EXTENSIONS
        .iter()
        .chain(std::iter::once(&"csv"))
        .flat_map(|ext| {
            let pattern = format!("{base}/*.{ext}");
            let options = glob::MatchOptions {
                case_sensitive: false,
                ..Default::default()
            };
            glob::glob_with(&pattern, options)
                .map(|paths| paths.filter_map(Result::ok).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .filter(|p| p.is_file())
        .filter(|p| !file_part(p.file_name()).starts_with("~$"))
        .collect();
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    files.dedup();
    files
}

fn file_part(part: Option<&std::ffi::OsStr>) -> String {
    part.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}
