use std::fmt;
use std::io::{self, Write};

use super::{NodeId, ProcessTree};
use crate::process::ProcessRecord;

const INDENT: &str = "    ";
const VERTICAL: &str = "│ ";
const BRANCH: &str = "├─";
const LAST_BRANCH: &str = "└─";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append `(pid)` to every label
    pub show_pids: bool,
}

struct Label<'a> {
    record: &'a ProcessRecord,
    show_pid: bool,
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.show_pid {
            write!(f, "{} ({})", self.record.name, self.record.pid)
        } else {
            write!(f, "{}", self.record.name)
        }
    }
}

/// Write the tree to `out`, one line per process, depth first.
///
/// The root is printed bare. Every other line starts with one indentation
/// unit per ancestor edge. Each unit is followed by `│ `, except the last one,
/// which carries the node's own branch connector.
pub fn render<W: Write>(
    tree: &ProcessTree,
    options: &RenderOptions,
    out: &mut W,
) -> io::Result<()> {
    let mut stack: Vec<(NodeId, usize, bool)> = vec![(tree.root(), 0, true)];
    let mut prefix = String::new();

    while let Some((id, depth, is_last)) = stack.pop() {
        prefix.clear();
        if depth > 0 {
            for _ in 1..depth {
                prefix.push_str(INDENT);
                prefix.push_str(VERTICAL);
            }
            prefix.push_str(INDENT);
            prefix.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        }

        let label = Label {
            record: tree.node(id),
            show_pid: options.show_pids,
        };
        writeln!(out, "{prefix}{label}")?;

        let children: Vec<NodeId> = tree.children(id).collect();
        stack.extend(
            children
                .into_iter()
                .rev()
                .map(|child| (child, depth + 1, tree.node(child).next_sibling.is_none())),
        );
    }

    out.flush()
}

pub fn render_to_string(tree: &ProcessTree, options: &RenderOptions) -> io::Result<String> {
    let mut buffer = Vec::new();
    render(tree, options, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
