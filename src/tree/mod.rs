mod builder;
mod render;

pub use builder::{Children, INIT_PID, ProcessTree, SortOrder};
pub use render::{RenderOptions, render, render_to_string};

/// Index of a record inside a [`crate::ProcessStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}
