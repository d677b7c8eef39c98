use std::collections::HashMap;

use super::NodeId;
use crate::prelude::*;
use crate::process::{ProcessRecord, ProcessStore};

/// Pid of the init process, the only possible tree root
pub const INIT_PID: i32 = 1;

/// Order in which the children of a node are linked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Order in which the processes were enumerated
    #[default]
    Discovery,
    /// Ascending pid
    NumericPid,
}

impl SortOrder {
    pub fn from_numeric_sort(numeric_sort: bool) -> Self {
        if numeric_sort {
            SortOrder::NumericPid
        } else {
            SortOrder::Discovery
        }
    }
}

/// Children list under construction, linked through `next_sibling`
#[derive(Default)]
struct ChildList {
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl ChildList {
    fn insert(&mut self, store: &mut ProcessStore, id: NodeId, order: SortOrder) {
        let (Some(head), Some(tail)) = (self.head, self.tail) else {
            self.head = Some(id);
            self.tail = Some(id);
            return;
        };

        let pid = store[id].pid;
        if order == SortOrder::Discovery || pid >= store[tail].pid {
            store.get_mut(tail).next_sibling = Some(id);
            self.tail = Some(id);
        } else if pid < store[head].pid {
            store.get_mut(id).next_sibling = Some(head);
            self.head = Some(id);
        } else {
            // head.pid <= pid < tail.pid, so the scan stops before the tail
            let mut curr = head;
            while let Some(next) = store[curr].next_sibling {
                if store[next].pid >= pid {
                    break;
                }
                curr = next;
            }
            store.get_mut(id).next_sibling = store[curr].next_sibling;
            store.get_mut(curr).next_sibling = Some(id);
        }
    }
}

/// Process forest rooted at init, encoded with first-child/next-sibling links
#[derive(Debug, Clone)]
pub struct ProcessTree {
    store: ProcessStore,
    root: NodeId,
    reachable: usize,
}

impl ProcessTree {
    /// Link every record reachable from pid 1 into its parent's children list.
    ///
    /// Returns `None` when no record has pid 1. Records whose parent chain does
    /// not lead back to the root are left unlinked and never rendered.
    pub fn build(mut store: ProcessStore, order: SortOrder) -> Option<Self> {
        let root = store.position_of(INIT_PID)?;

        let children_by_parent: HashMap<i32, Vec<NodeId>> = store
            .iter()
            .filter(|(id, _)| *id != root)
            .map(|(id, record)| (record.parent_pid, id))
            .into_group_map();

        let mut attached = vec![false; store.len()];
        attached[root.index()] = true;
        let mut reachable = 1;

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let mut children = ChildList::default();
            let candidates = children_by_parent.get(&store[node].pid);
            for &child in candidates.into_iter().flatten() {
                if attached[child.index()] {
                    warn!("Process {} is listed more than once", store[child].pid);
                    continue;
                }
                attached[child.index()] = true;
                children.insert(&mut store, child, order);
            }
            store.get_mut(node).first_child = children.head;

            let linked = Children::new(&store, children.head).collect_vec();
            reachable += linked.len();
            stack.extend(linked.into_iter().rev());
        }

        debug!(
            "Built process tree with {reachable} nodes, {} processes not attached",
            store.len() - reachable
        );

        Some(Self {
            store,
            root,
            reachable,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ProcessRecord {
        &self.store[id]
    }

    /// Direct children of `id`, in rendering order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children::new(&self.store, self.store[id].first_child)
    }

    /// Number of records linked into the tree, root included
    pub fn len_reachable(&self) -> usize {
        self.reachable
    }

    pub fn store(&self) -> &ProcessStore {
        &self.store
    }
}

pub struct Children<'a> {
    store: &'a ProcessStore,
    next: Option<NodeId>,
}

impl<'a> Children<'a> {
    fn new(store: &'a ProcessStore, head: Option<NodeId>) -> Self {
        Self { store, next: head }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.store[current].next_sibling;
        Some(current)
    }
}
