//! Flat snapshot of the running processes.
//!
//! Records are collected once, in discovery order, from a [`ProcessSource`].
//! The tree builder later threads `first_child`/`next_sibling` links through
//! the store by index, the records themselves never move.

#[cfg(target_os = "linux")]
mod procfs_source;

#[cfg(target_os = "linux")]
pub use procfs_source::ProcfsSource;

use std::path::Path;

use crate::prelude::*;
use crate::tree::NodeId;

/// Longest process name kept in a record, longer names are truncated
pub const MAX_NAME_LEN: usize = 19;

pub const DEFAULT_PROC_ROOT: &str = "/proc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: i32,
    pub parent_pid: i32,
    pub name: String,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl ProcessRecord {
    pub fn new(pid: i32, parent_pid: i32, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if let Some((cut, _)) = name.char_indices().nth(MAX_NAME_LEN) {
            name.truncate(cut);
        }

        Self {
            pid,
            parent_pid,
            name,
            first_child: None,
            next_sibling: None,
        }
    }
}

/// What to do when a process disappears between enumeration and lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupPolicy {
    /// Abort the whole snapshot
    Strict,
    /// Drop the vanished process and keep going
    #[default]
    SkipVanished,
}

impl LookupPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            LookupPolicy::Strict
        } else {
            LookupPolicy::SkipVanished
        }
    }
}

/// Source of live processes, typically the proc filesystem
pub trait ProcessSource {
    /// All live process ids, in enumeration order
    fn pids(&self) -> Result<Vec<i32>>;

    /// Details of a single process, `Ok(None)` if it no longer exists
    fn lookup(&self, pid: i32) -> Result<Option<ProcessRecord>>;
}

/// Source reading the proc filesystem mounted at `proc_root`
#[cfg(target_os = "linux")]
pub fn default_source(proc_root: &Path) -> Result<Box<dyn ProcessSource>> {
    Ok(Box::new(ProcfsSource::new(proc_root)))
}

#[cfg(not(target_os = "linux"))]
pub fn default_source(proc_root: &Path) -> Result<Box<dyn ProcessSource>> {
    bail!(
        "Reading processes from {} is only supported on Linux",
        proc_root.display()
    )
}

#[derive(Debug, Clone, Default)]
pub struct ProcessStore {
    records: Vec<ProcessRecord>,
}

impl ProcessStore {
    pub fn from_records(records: Vec<ProcessRecord>) -> Self {
        Self { records }
    }

    /// Enumerate every process of `source` and look each one up.
    ///
    /// Fails when enumeration fails or yields no process. A process that
    /// vanished before its lookup is skipped or fatal depending on `policy`.
    pub fn snapshot(source: &dyn ProcessSource, policy: LookupPolicy) -> Result<Self> {
        let pids = source.pids().context("Failed to enumerate processes")?;
        if pids.is_empty() {
            bail!("No process found while enumerating processes");
        }

        let mut records = Vec::with_capacity(pids.len());
        for pid in pids {
            let record = source
                .lookup(pid)
                .with_context(|| format!("Failed to get process info for pid {pid}"))?;
            match (record, policy) {
                (Some(record), _) => records.push(record),
                (None, LookupPolicy::Strict) => {
                    bail!("Process {pid} exited before its info could be read")
                }
                (None, LookupPolicy::SkipVanished) => {
                    debug!("Process {pid} vanished during the snapshot, skipping it");
                }
            }
        }

        debug!("Snapshot contains {} processes", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut ProcessRecord {
        &mut self.records[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ProcessRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (NodeId(index), record))
    }

    /// Index of the first record with the given pid
    pub fn position_of(&self, pid: i32) -> Option<NodeId> {
        self.records
            .iter()
            .position(|record| record.pid == pid)
            .map(NodeId)
    }
}

impl std::ops::Index<NodeId> for ProcessStore {
    type Output = ProcessRecord;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.records[id.0]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct StaticSource {
        pids: Vec<i32>,
        records: HashMap<i32, ProcessRecord>,
    }

    impl StaticSource {
        fn new(records: &[(i32, i32, &str)], vanished: &[i32]) -> Self {
            let mut pids = records.iter().map(|(pid, _, _)| *pid).collect_vec();
            pids.extend_from_slice(vanished);
            Self {
                pids,
                records: records
                    .iter()
                    .map(|(pid, ppid, name)| (*pid, ProcessRecord::new(*pid, *ppid, *name)))
                    .collect(),
            }
        }
    }

    impl ProcessSource for StaticSource {
        fn pids(&self) -> Result<Vec<i32>> {
            Ok(self.pids.clone())
        }

        fn lookup(&self, pid: i32) -> Result<Option<ProcessRecord>> {
            Ok(self.records.get(&pid).cloned())
        }
    }

    struct BrokenSource;

    impl ProcessSource for BrokenSource {
        fn pids(&self) -> Result<Vec<i32>> {
            bail!("proc is not mounted")
        }

        fn lookup(&self, _pid: i32) -> Result<Option<ProcessRecord>> {
            unreachable!()
        }
    }

    #[test]
    fn test_name_is_truncated() {
        let record = ProcessRecord::new(42, 1, "a-very-long-process-name-indeed");
        assert_eq!(record.name, "a-very-long-process");
        assert_eq!(record.name.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_name_truncation_respects_char_boundaries() {
        let record = ProcessRecord::new(42, 1, "ééééééééééééééééééééééé");
        assert_eq!(record.name.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_short_name_is_kept() {
        let record = ProcessRecord::new(1, 0, "init");
        assert_eq!(record.name, "init");
        assert_eq!(record.first_child, None);
        assert_eq!(record.next_sibling, None);
    }

    #[test]
    fn test_snapshot_keeps_discovery_order() {
        let source = StaticSource::new(&[(10, 1, "bash"), (2, 1, "sshd"), (1, 0, "init")], &[]);
        let store = ProcessStore::snapshot(&source, LookupPolicy::Strict).unwrap();
        let pids = store.iter().map(|(_, record)| record.pid).collect_vec();
        assert_eq!(pids, vec![10, 2, 1]);
    }

    #[test_log::test]
    fn test_snapshot_skips_vanished_processes() {
        let source = StaticSource::new(&[(1, 0, "init"), (2, 1, "sshd")], &[77]);
        let store = ProcessStore::snapshot(&source, LookupPolicy::SkipVanished).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.position_of(77), None);
    }

    #[test]
    fn test_snapshot_strict_fails_on_vanished_process() {
        let source = StaticSource::new(&[(1, 0, "init")], &[77]);
        let err = ProcessStore::snapshot(&source, LookupPolicy::Strict).unwrap_err();
        assert!(err.to_string().contains("77"));
    }

    #[test]
    fn test_snapshot_fails_without_processes() {
        let source = StaticSource::new(&[], &[]);
        assert!(ProcessStore::snapshot(&source, LookupPolicy::SkipVanished).is_err());
    }

    #[test]
    fn test_snapshot_fails_when_enumeration_fails() {
        let err = ProcessStore::snapshot(&BrokenSource, LookupPolicy::SkipVanished).unwrap_err();
        assert_eq!(err.to_string(), "Failed to enumerate processes");
    }

    #[test]
    fn test_policy_from_strict() {
        assert_eq!(LookupPolicy::from_strict(true), LookupPolicy::Strict);
        assert_eq!(LookupPolicy::from_strict(false), LookupPolicy::SkipVanished);
    }
}
