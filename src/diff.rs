//! Diff trees: what the previous layout pass measured and emitted, per node position.
//!
//! A diff tree mirrors the layout node tree it was flattened from, with nested trees spliced in
//! at their holder's position. The next pass walks it in lockstep with its new tree to reuse
//! measurements and output ids.

use crate::component::Component;
use crate::error::Result;
use crate::node::Style;
use crate::output::OutputId;
use crate::pools::Pools;
use crate::size_spec::{Size, SizeSpec};
use crate::tree::{MeasureKind, NodeId, NodeTree};
use std::fmt;
use std::sync::Arc;

/// An output recorded in a diff node.
#[derive(Debug, Clone)]
pub struct DiffOutput {
    pub id: OutputId,
    pub component: Component,
}

/// Shadow of one layout node from a previous pass.
#[derive(Debug, Default)]
pub struct DiffNode {
    pub(crate) component: Option<Component>,
    pub(crate) style: Style,
    pub(crate) last_width_spec: Option<SizeSpec>,
    pub(crate) last_height_spec: Option<SizeSpec>,
    pub(crate) last_measured: Option<Size>,
    pub(crate) children: Vec<usize>,
    pub(crate) host: Option<DiffOutput>,
    pub(crate) background: Option<DiffOutput>,
    pub(crate) content: Option<DiffOutput>,
    pub(crate) foreground: Option<DiffOutput>,
    pub(crate) border: Option<DiffOutput>,
    pub(crate) visibility: Option<OutputId>,
}

impl DiffNode {
    pub(crate) fn reset(&mut self) {
        let mut children = std::mem::take(&mut self.children);
        children.clear();
        *self = DiffNode {
            children,
            ..DiffNode::default()
        };
    }

    pub fn component(&self) -> Option<&Component> {
        self.component.as_ref()
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn last_measured(&self) -> Option<Size> {
        self.last_measured
    }

    pub fn content(&self) -> Option<&DiffOutput> {
        self.content.as_ref()
    }

    pub fn host(&self) -> Option<&DiffOutput> {
        self.host.as_ref()
    }
}

/// Diff nodes of one layout pass. Nodes return to their pool when the tree is dropped.
pub struct DiffTree {
    nodes: Vec<DiffNode>,
    root: Option<usize>,
    pools: Arc<Pools>,
}

impl DiffTree {
    pub(crate) fn new(pools: Arc<Pools>) -> DiffTree {
        DiffTree {
            nodes: Vec::new(),
            root: None,
            pools,
        }
    }

    /// Adds a node, as the last child of `parent` or as the root.
    pub(crate) fn push(
        &mut self,
        parent: Option<usize>,
        configure: impl FnOnce(&mut DiffNode),
    ) -> usize {
        let mut node = self.pools.acquire_diff_node();
        configure(&mut node);
        let index = self.nodes.len();
        self.nodes.push(node);
        match parent {
            Some(parent) => self.nodes[parent].children.push(index),
            None => self.root = Some(index),
        }
        index
    }

    pub fn root(&self) -> Option<usize> {
        self.root
    }

    pub fn node(&self, index: usize) -> Option<&DiffNode> {
        self.nodes.get(index)
    }

    pub(crate) fn node_mut(&mut self, index: usize) -> Option<&mut DiffNode> {
        self.nodes.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Drop for DiffTree {
    fn drop(&mut self) {
        for node in self.nodes.drain(..) {
            self.pools.release_diff_node(node);
        }
    }
}

impl fmt::Debug for DiffTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DiffTree")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish()
    }
}

fn host_is_compatible(node: Option<&Component>, diff: Option<&Component>) -> bool {
    match (node, diff) {
        (Some(node), Some(diff)) => node.is_same_type(diff),
        (None, None) => true,
        _ => false,
    }
}

/// Walks `node` and the diff node at `diff_index` in lockstep, linking matching nodes and
/// carrying measurements over to unchanged leaves.
///
/// Nested tree holders only get linked; their nested tree is diffed against the same diff node
/// once it is resolved, with `is_tree_root` set.
pub(crate) fn apply_diff_to_unchanged_nodes(
    tree: &mut NodeTree,
    node: NodeId,
    diff: &DiffTree,
    diff_index: usize,
    is_tree_root: bool,
) -> Result<()> {
    let diff_node = match diff.node(diff_index) {
        Some(diff_node) => diff_node,
        None => return Ok(()),
    };

    let layout = tree.node(node)?;
    if layout.is_nested_tree_holder() && !is_tree_root {
        tree.node_mut(node)?.diff_node = Some(diff_index);
        return Ok(());
    }

    if !host_is_compatible(layout.component.as_ref(), diff_node.component.as_ref()) {
        return Ok(());
    }

    let children = layout.children.clone();
    tree.node_mut(node)?.diff_node = Some(diff_index);

    if !children.is_empty() && !diff_node.children.is_empty() {
        for (child, diff_child) in children.iter().zip(&diff_node.children) {
            apply_diff_to_unchanged_nodes(tree, *child, diff, *diff_child, false)?;
        }
        return Ok(());
    }

    let layout = tree.node(node)?;
    if layout.measure != MeasureKind::Component || !layout.style.measures_like(&diff_node.style) {
        return Ok(());
    }
    let unchanged = match (&layout.component, &diff_node.component) {
        (Some(next), Some(previous)) => !Component::should_update(previous, next),
        _ => false,
    };
    if unchanged {
        let layout = tree.node_mut(node)?;
        layout.cached_measures_valid = true;
        layout.last_width_spec = diff_node.last_width_spec;
        layout.last_height_spec = diff_node.last_height_spec;
        layout.last_measured = diff_node.last_measured;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_nodes_return_to_their_pool() {
        let pools = Arc::new(Pools::new());
        let mut diff = DiffTree::new(Arc::clone(&pools));
        let root = diff.push(None, |node| node.last_measured = Some(Size::new(1, 2)));
        diff.push(Some(root), |_| ());
        diff.push(Some(root), |_| ());
        assert_eq!(diff.root(), Some(root));
        assert_eq!(diff.node(root).unwrap().children(), &[1, 2]);
        drop(diff);
        assert_eq!(pools.diff_node_pool_len(), 3);

        let mut diff = DiffTree::new(Arc::clone(&pools));
        let root = diff.push(None, |_| ());
        assert_eq!(diff.node(root).unwrap().last_measured(), None, "pooled nodes are reset");
        assert_eq!(pools.diff_node_pool_len(), 2);
    }
}
