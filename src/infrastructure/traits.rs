//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;

use tracing::warn;

use crate::domain::{MetaTriple, StorageConfig};
use crate::infrastructure::session::GridSession;
use crate::infrastructure::InfraResult;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents as bytes.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if the current process can create files in a directory.
    fn is_writable(&self, dir: &Path) -> bool;

    /// List all regular files below a directory, recursively, in sorted order.
    ///
    /// Symlinks are followed. Dangling links and link cycles are skipped.
    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command with arguments and extra environment variables.
    fn run_with_env(&self, cmd: &str, args: &[&str], env: &[(&str, &str)]) -> io::Result<Output>;
}

/// Process environment abstraction.
pub trait EnvReader: Send + Sync {
    /// Value of a variable, `None` if unset or not valid unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// Secrets service client: exchanges address, token and job id for a
/// storage-access configuration.
pub trait SecretsClient: Send + Sync {
    fn fetch_config(
        &self,
        vault_addr: Option<&str>,
        vault_token: Option<&str>,
        job_uuid: Option<&str>,
    ) -> InfraResult<StorageConfig>;
}

/// Storage grid operations used by validation and transfers.
///
/// Remote paths are absolute, slash-separated strings.
pub trait StorageGrid: Send + Sync {
    /// Open a session authenticated by the given configuration.
    fn open_session(&self, config: &StorageConfig) -> InfraResult<GridSession>;

    /// Check whether a data object or collection exists.
    fn exists(&self, session: &GridSession, path: &str) -> InfraResult<bool>;

    /// Create a collection and its parents.
    fn mkdir(&self, session: &GridSession, path: &str) -> InfraResult<()>;

    /// Download a data object or collection (recursively) into a local directory.
    fn download(&self, session: &GridSession, source: &str, destination: &Path) -> InfraResult<()>;

    /// Upload a local file to a remote path.
    fn upload(&self, session: &GridSession, source: &Path, destination: &str) -> InfraResult<()>;

    /// Attach a metadata triple to a data object or collection.
    fn add_meta(&self, session: &GridSession, path: &str, is_collection: bool, triple: &MetaTriple)
        -> InfraResult<()>;

    /// Grant `own` permission to a user, recursively.
    fn grant_own(&self, session: &GridSession, user: &str, path: &str) -> InfraResult<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_writable(&self, dir: &Path) -> bool {
        // Scratch file is removed on drop.
        tempfile::Builder::new()
            .prefix(".gridstage-write-check")
            .tempfile_in(dir)
            .is_ok()
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        use walkdir::WalkDir;

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_unusable_link(&e) => {
                    warn!("walk_files: skipping {:?}: {}", e.path(), e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

fn is_unusable_link(e: &walkdir::Error) -> bool {
    let dangling = e
        .io_error()
        .is_some_and(|io| io.kind() == io::ErrorKind::NotFound)
        && e.path().is_some_and(|p| p.is_symlink());
    dangling || e.loop_ancestor().is_some()
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run_with_env(&self, cmd: &str, args: &[&str], env: &[(&str, &str)]) -> io::Result<Output> {
        std::process::Command::new(cmd)
            .args(args)
            .envs(env.iter().copied())
            .output()
    }
}

/// Real environment reader over `std::env`.
#[derive(Debug, Default)]
pub struct ProcessEnv;

impl EnvReader for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_temp_dir_when_checked_then_is_writable_and_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();

        assert!(RealFileSystem.is_writable(temp.path()));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn given_missing_dir_when_checked_then_is_not_writable() {
        let temp = TempDir::new().unwrap();

        assert!(!RealFileSystem.is_writable(&temp.path().join("gone")));
    }

    #[cfg(unix)]
    #[test]
    fn given_read_only_dir_when_checked_then_is_not_writable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("ro");
        std::fs::create_dir(&dir).unwrap();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind a privileged user.
        let privileged = std::fs::write(dir.join("x"), "x").is_ok();
        if !privileged {
            assert!(!RealFileSystem.is_writable(&dir));
        }

        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn given_nested_tree_when_walked_then_lists_files_sorted() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("b")).unwrap();
        std::fs::write(temp.path().join("b/y.txt"), "y").unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();

        let files = RealFileSystem.walk_files(temp.path()).unwrap();

        assert_eq!(files, vec![temp.path().join("a.txt"), temp.path().join("b/y.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn given_symlinks_when_walked_then_follows_live_links_and_skips_dangling_ones() {
        use std::os::unix::fs::symlink;

        // Arrange
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("result.csv"), "r").unwrap();
        std::fs::create_dir(outside.path().join("shared")).unwrap();
        std::fs::write(outside.path().join("shared/s.txt"), "s").unwrap();

        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        symlink(outside.path().join("result.csv"), temp.path().join("linked.csv")).unwrap();
        symlink(outside.path().join("shared"), temp.path().join("shared")).unwrap();
        symlink(temp.path().join("nowhere"), temp.path().join("dangling")).unwrap();
        symlink(temp.path(), temp.path().join("loop")).unwrap();

        // Act
        let files = RealFileSystem.walk_files(temp.path()).unwrap();

        // Assert
        assert_eq!(
            files,
            vec![
                temp.path().join("a.txt"),
                temp.path().join("linked.csv"),
                temp.path().join("shared/s.txt"),
            ]
        );
    }
}
