//! Transfers between the local filesystem and the grid
//!
//! `get` downloads remote sources into a local folder. `put` uploads a local
//! folder, honoring exclusion/inclusion lists, and tags what it uploaded.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::application::options::{GetOptions, PutOptions, Resolved};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::MetaTriple;
use crate::infrastructure::session::GridSession;
use crate::infrastructure::traits::{FileSystem, StorageGrid};

/// One file to upload and where it lands on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub local: PathBuf,
    pub remote: String,
}

/// What a transfer moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Remote paths downloaded, or remote paths written
    pub items: Vec<String>,
}

/// Remote sources listed in a local file, one per line; blank lines skipped.
pub fn read_source_list(fs: &dyn FileSystem, list: &Path) -> ApplicationResult<Vec<String>> {
    let content = fs
        .read_to_string(list)
        .or_does_not_exist("read source list", list)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Split a delimited list, trimming entries and dropping empty ones.
pub fn split_list(list: &str, delimiter: &str) -> Vec<String> {
    if list.is_empty() {
        return Vec::new();
    }
    let entries: Vec<&str> = if delimiter.is_empty() {
        vec![list]
    } else {
        list.split(delimiter).collect()
    };
    entries
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

/// Join a relative local path onto a remote collection using `/`.
pub fn remote_join(collection: &str, relative: &Path) -> String {
    let tail = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .join("/");
    format!("{}/{}", collection.trim_end_matches('/'), tail)
}

/// Parent collection of a remote path.
fn remote_parent(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| if idx == 0 { "/" } else { &path[..idx] })
}

/// Whether a list entry names a file, or a folder containing it, by relative
/// path or full path. A single-component entry also matches a bare file name.
fn matches_entry(entry: &str, file: &Path, relative: &Path) -> bool {
    let entry_path = Path::new(entry);
    let entry_path = entry_path.strip_prefix(".").unwrap_or(entry_path);
    if entry_path.as_os_str().is_empty() {
        return false;
    }
    relative.starts_with(entry_path)
        || file.starts_with(entry_path)
        || (entry_path.components().count() == 1 && file.file_name() == Some(entry_path.as_os_str()))
}

/// Decide which files under `source` to upload and where.
///
/// A file is skipped when an exclusion entry matches it, unless an inclusion
/// entry matches it too.
pub fn plan_upload(
    source: &Path,
    files: &[PathBuf],
    destination: &str,
    excludes: &[String],
    includes: &[String],
) -> Vec<UploadItem> {
    files
        .iter()
        .filter_map(|file| {
            let relative = pathdiff::diff_paths(file, source)?;
            let excluded = excludes.iter().any(|e| matches_entry(e, file, &relative));
            let included = includes.iter().any(|i| matches_entry(i, file, &relative));
            if excluded && !included {
                debug!("plan_upload: excluding {}", relative.display());
                return None;
            }
            Some(UploadItem {
                local: file.clone(),
                remote: remote_join(destination, &relative),
            })
        })
        .collect()
}

/// Executes downloads and uploads against the grid.
pub struct TransferService {
    fs: Arc<dyn FileSystem>,
    grid: Arc<dyn StorageGrid>,
    settings: Arc<Settings>,
}

impl TransferService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        grid: Arc<dyn StorageGrid>,
        settings: Arc<Settings>,
    ) -> Self {
        Self { fs, grid, settings }
    }

    /// Download every source into the destination folder, in order.
    #[instrument(skip_all)]
    pub fn get(&self, resolved: &Resolved<GetOptions>) -> ApplicationResult<TransferSummary> {
        let options = &resolved.options;
        let mut sources: Vec<String> = options.source.iter().cloned().collect();
        if let Some(list) = &options.source_list {
            sources.extend(read_source_list(self.fs.as_ref(), list)?);
        }
        if !options.meta.is_empty() {
            debug!("get: ignoring {} metadata triple(s) on download", options.meta.len());
        }

        let session = self.grid.open_session(&resolved.config)?;
        for source in &sources {
            info!("downloading {} to {}", source, options.destination.display());
            self.grid.download(&session, source, &options.destination)?;
        }
        Ok(TransferSummary { items: sources })
    }

    /// Upload the source folder, tag the uploads, and grant ownership.
    #[instrument(skip_all)]
    pub fn put(&self, resolved: &Resolved<PutOptions>) -> ApplicationResult<TransferSummary> {
        let options = &resolved.options;
        let destination = options.destination.as_deref().ok_or_else(|| {
            ApplicationError::Config {
                message: "put requires a validated destination".to_string(),
            }
        })?;

        let excludes = if options.exclude.is_empty() {
            Vec::new()
        } else {
            let path = Path::new(&options.exclude);
            let content = self
                .fs
                .read_to_string(path)
                .or_does_not_exist("read exclusion list", path)?;
            split_list(&content, &options.exclude_delimiter)
        };
        let includes = split_list(&options.include, &options.include_delimiter);

        let files = self
            .fs
            .walk_files(&options.source)
            .or_does_not_exist("list upload source", &options.source)?;
        let plan = plan_upload(&options.source, &files, destination, &excludes, &includes);
        debug!(
            "put: {} of {} file(s) planned, {} excluded entries",
            plan.len(),
            files.len(),
            excludes.len()
        );

        let tags = self.tags(resolved);
        let session = self.grid.open_session(&resolved.config)?;

        let collections: BTreeSet<&str> = std::iter::once(destination)
            .chain(plan.iter().filter_map(|item| remote_parent(&item.remote)))
            .collect();
        for collection in collections {
            self.grid.mkdir(&session, collection)?;
        }

        for item in &plan {
            info!("uploading {} to {}", item.local.display(), item.remote);
            self.grid.upload(&session, &item.local, &item.remote)?;
            self.tag(&session, &item.remote, false, &tags)?;
        }

        if !options.skip_parent_meta {
            self.tag(&session, destination, true, &tags)?;
        }

        if let Some(user) = options.user.as_deref().filter(|u| !u.is_empty()) {
            self.grid.grant_own(&session, user, destination)?;
        }

        Ok(TransferSummary {
            items: plan.into_iter().map(|item| item.remote).collect(),
        })
    }

    /// Job id tag (when known) followed by the `--meta` triples in order.
    fn tags(&self, resolved: &Resolved<PutOptions>) -> Vec<MetaTriple> {
        let job_tag = resolved
            .credentials
            .job_uuid
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| MetaTriple::new(&self.settings.grid.job_uuid_attribute, id, ""));
        job_tag
            .into_iter()
            .chain(resolved.options.meta.iter().cloned())
            .collect()
    }

    fn tag(
        &self,
        session: &GridSession,
        path: &str,
        is_collection: bool,
        tags: &[MetaTriple],
    ) -> ApplicationResult<()> {
        for triple in tags {
            self.grid.add_meta(session, path, is_collection, triple)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_newline_list_when_split_then_drops_blank_entries() {
        assert_eq!(
            split_list("a.txt\n\n b/c.txt \n", "\n"),
            vec!["a.txt".to_string(), "b/c.txt".to_string()]
        );
    }

    #[test]
    fn given_empty_list_when_split_then_empty() {
        assert!(split_list("", ",").is_empty());
    }

    #[test]
    fn given_nested_relative_path_when_joined_then_uses_slashes() {
        assert_eq!(
            remote_join("/zone/out/", Path::new("sub/dir/f.txt")),
            "/zone/out/sub/dir/f.txt"
        );
    }

    #[test]
    fn given_remote_paths_when_parent_then_strips_last_segment() {
        assert_eq!(remote_parent("/zone/out/f.txt"), Some("/zone/out"));
        assert_eq!(remote_parent("/f.txt"), Some("/"));
        assert_eq!(remote_parent("f.txt"), None);
    }

    #[test]
    fn given_excludes_and_includes_when_planned_then_include_wins() {
        let source = Path::new("/work");
        let files = vec![
            PathBuf::from("/work/keep.txt"),
            PathBuf::from("/work/logs/run.log"),
            PathBuf::from("/work/tmp.dat"),
            PathBuf::from("/work/logs/condor.log"),
        ];
        let excludes = vec!["logs/run.log".to_string(), "tmp.dat".to_string(), "condor.log".to_string()];
        let includes = vec!["condor.log".to_string()];

        let plan = plan_upload(source, &files, "/zone/out", &excludes, &includes);

        let remotes: Vec<&str> = plan.iter().map(|i| i.remote.as_str()).collect();
        assert_eq!(remotes, vec!["/zone/out/keep.txt", "/zone/out/logs/condor.log"]);
    }

    #[test]
    fn given_absolute_exclude_entry_when_planned_then_matches_full_path() {
        let source = Path::new("/work");
        let files = vec![PathBuf::from("/work/a.txt"), PathBuf::from("/work/b.txt")];

        let plan = plan_upload(source, &files, "/zone", &["/work/a.txt".to_string()], &[]);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].remote, "/zone/b.txt");
    }

    #[test]
    fn given_folder_exclude_entry_when_planned_then_skips_everything_below_it() {
        let source = Path::new("/work");
        let files = vec![
            PathBuf::from("/work/a.txt"),
            PathBuf::from("/work/logs/x.log"),
            PathBuf::from("/work/logs/deep/y.log"),
            PathBuf::from("/work/logsheet.csv"),
        ];
        let excludes = vec!["./logs".to_string()];
        let includes = vec!["logs/deep".to_string()];

        let plan = plan_upload(source, &files, "/zone", &excludes, &includes);

        let remotes: Vec<&str> = plan.iter().map(|i| i.remote.as_str()).collect();
        assert_eq!(remotes, vec!["/zone/a.txt", "/zone/logs/deep/y.log", "/zone/logsheet.csv"]);
    }
}
