//! proctree library: snapshot the running processes and render them as a tree

mod prelude;

pub mod cli;
pub mod config;
pub mod logger;
pub mod process;
pub mod tree;

pub use process::{LookupPolicy, ProcessRecord, ProcessSource, ProcessStore};
pub use tree::{NodeId, ProcessTree, RenderOptions, SortOrder};
