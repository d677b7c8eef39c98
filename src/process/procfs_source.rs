use std::path::{Path, PathBuf};

use procfs::ProcError;
use procfs::process::{Process, all_processes_with_root};

use super::{DEFAULT_PROC_ROOT, ProcessRecord, ProcessSource};
use crate::prelude::*;

/// Reads processes from a proc filesystem mount
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
}

impl ProcfsSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcessSource for ProcfsSource {
    fn pids(&self) -> Result<Vec<i32>> {
        let processes = all_processes_with_root(&self.root)
            .with_context(|| format!("Error in reading dir {}", self.root.display()))?;

        let mut pids = Vec::new();
        for process in processes {
            match process {
                Ok(process) => pids.push(process.pid()),
                Err(ProcError::NotFound(path)) => {
                    trace!("Process entry disappeared while listing: {path:?}");
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Error in reading dir {}", self.root.display()));
                }
            }
        }

        Ok(pids)
    }

    fn lookup(&self, pid: i32) -> Result<Option<ProcessRecord>> {
        let process_dir = self.root.join(pid.to_string());
        let stat = match Process::new_with_root(process_dir.clone())
            .and_then(|process| process.stat())
        {
            Ok(stat) => stat,
            Err(e) if has_vanished(&e, &process_dir) => {
                trace!("Process {pid} vanished before its stat could be read: {e}");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read {}/{pid}/stat", self.root.display())
                });
            }
        };

        Ok(Some(ProcessRecord::new(stat.pid, stat.ppid, stat.comm)))
    }
}

/// Whether `err` means the process exited while it was being read.
///
/// A process that exits after its directory was opened makes reads fail with
/// `ESRCH` instead of `ENOENT`.
fn has_vanished(err: &ProcError, process_dir: &Path) -> bool {
    match err {
        ProcError::NotFound(_) => true,
        ProcError::Io(e, _) if e.raw_os_error() == Some(libc::ESRCH) => true,
        _ => !process_dir.exists(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_stat(root: &Path, pid: i32, ppid: i32, comm: &str) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        let tail = vec!["0"; 48].join(" ");
        fs::write(dir.join("stat"), format!("{pid} ({comm}) S {ppid} {tail}\n")).unwrap();
    }

    #[test]
    fn test_pids_ignores_non_numeric_entries() {
        let root = TempDir::new().unwrap();
        write_stat(root.path(), 1, 0, "init");
        write_stat(root.path(), 42, 1, "sshd");
        fs::create_dir_all(root.path().join("sys")).unwrap();
        fs::write(root.path().join("uptime"), "1.0 1.0\n").unwrap();

        let source = ProcfsSource::new(root.path());
        let pids = source.pids().unwrap().into_iter().sorted().collect_vec();
        assert_eq!(pids, vec![1, 42]);
    }

    #[test]
    fn test_lookup_parses_stat() {
        let root = TempDir::new().unwrap();
        write_stat(root.path(), 42, 1, "tmux: server");

        let source = ProcfsSource::new(root.path());
        let record = source.lookup(42).unwrap().unwrap();
        assert_eq!(record.pid, 42);
        assert_eq!(record.parent_pid, 1);
        assert_eq!(record.name, "tmux: server");
    }

    #[test]
    fn test_lookup_missing_process() {
        let root = TempDir::new().unwrap();
        let source = ProcfsSource::new(root.path());
        assert_eq!(source.lookup(4242).unwrap(), None);
    }

    #[test]
    fn test_esrch_counts_as_vanished() {
        let root = TempDir::new().unwrap();
        write_stat(root.path(), 42, 1, "sshd");
        let err = ProcError::Io(std::io::Error::from_raw_os_error(libc::ESRCH), None);
        assert!(has_vanished(&err, &root.path().join("42")));
    }

    #[test]
    fn test_error_on_removed_process_dir_counts_as_vanished() {
        let root = TempDir::new().unwrap();
        let err = ProcError::Other("short read".to_string());
        assert!(has_vanished(&err, &root.path().join("42")));
    }

    #[test]
    fn test_malformed_stat_is_an_error() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("42");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), "garbage\n").unwrap();

        let source = ProcfsSource::new(root.path());
        let err = source.lookup(42).unwrap_err();
        assert!(err.to_string().contains("/42/stat"));
    }

    #[test]
    fn test_live_proc_contains_current_process() {
        let source = ProcfsSource::default();
        let me = std::process::id() as i32;
        assert!(source.pids().unwrap().contains(&me));

        let record = source.lookup(me).unwrap().unwrap();
        assert_eq!(record.pid, me);
    }
}
