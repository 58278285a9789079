//! Pre-flight validation of resolved options
//!
//! Checks run in a fixed order and stop at the first failure, which is always
//! a classified [`ErrorRecord`].

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::options::{GetOptions, PutOptions, Resolved};
use crate::application::services::read_source_list;
use crate::application::ApplicationResult;
use crate::domain::ErrorRecord;
use crate::infrastructure::session::GridSession;
use crate::infrastructure::traits::{FileSystem, StorageGrid};

/// Validates `get` and `put` options against the local filesystem and the grid.
pub struct ValidationService {
    fs: Arc<dyn FileSystem>,
    grid: Arc<dyn StorageGrid>,
}

impl ValidationService {
    pub fn new(fs: Arc<dyn FileSystem>, grid: Arc<dyn StorageGrid>) -> Self {
        Self { fs, grid }
    }

    /// Validate a download.
    ///
    /// Order: a source is given; the source list is a readable file; every
    /// remote source is absolute and exists; the destination is a writeable folder.
    #[instrument(skip_all)]
    pub fn validate_get(&self, resolved: &Resolved<GetOptions>) -> ApplicationResult<()> {
        let options = &resolved.options;
        if options.source.is_none() && options.source_list.is_none() {
            return Err(ErrorRecord::missing_option("--source").into());
        }

        let mut sources = Vec::new();
        if let Some(list) = &options.source_list {
            self.local_file(list)?;
        }
        if let Some(source) = &options.source {
            sources.push(source.clone());
        }
        if let Some(list) = &options.source_list {
            sources.extend(read_source_list(self.fs.as_ref(), list)?);
        }

        let session = self.grid.open_session(&resolved.config)?;
        for source in &sources {
            self.remote_exists(&session, source)?;
        }

        self.local_folder(&options.destination)?;
        if !self.fs.is_writable(&options.destination) {
            return Err(ErrorRecord::not_writeable(&options.destination).into());
        }
        debug!("validate_get: {} source(s) ok", sources.len());
        Ok(())
    }

    /// Validate an upload.
    ///
    /// Order: the destination is given and absolute; the source is a folder;
    /// a non-empty exclusion list is a file.
    #[instrument(skip_all)]
    pub fn validate_put(&self, resolved: &Resolved<PutOptions>) -> ApplicationResult<()> {
        let options = &resolved.options;
        let destination = options
            .destination
            .as_deref()
            .ok_or_else(|| ErrorRecord::missing_option("--destination"))?;
        if !is_absolute_remote(destination) {
            return Err(ErrorRecord::path_not_absolute(destination).into());
        }

        self.local_folder(&options.source)?;

        if !options.exclude.is_empty() {
            self.local_file(Path::new(&options.exclude))?;
        }
        debug!("validate_put: ok");
        Ok(())
    }

    fn local_file(&self, path: &Path) -> ApplicationResult<()> {
        if !self.fs.exists(path) {
            return Err(ErrorRecord::does_not_exist(path).into());
        }
        if !self.fs.is_file(path) {
            return Err(ErrorRecord::not_a_file(path).into());
        }
        Ok(())
    }

    fn local_folder(&self, path: &Path) -> ApplicationResult<()> {
        if !self.fs.exists(path) {
            return Err(ErrorRecord::does_not_exist(path).into());
        }
        if !self.fs.is_dir(path) {
            return Err(ErrorRecord::not_a_folder(path).into());
        }
        Ok(())
    }

    fn remote_exists(&self, session: &GridSession, path: &str) -> ApplicationResult<()> {
        if !is_absolute_remote(path) {
            return Err(ErrorRecord::path_not_absolute(path).into());
        }
        if !self.grid.exists(session, path)? {
            return Err(ErrorRecord::does_not_exist(path).into());
        }
        Ok(())
    }
}

/// Grid paths are slash-rooted regardless of the local platform.
pub fn is_absolute_remote(path: &str) -> bool {
    path.starts_with('/')
}
