use crate::arena::{Arena, GenIndex};
use crate::component::Component;
use crate::diff::DiffTree;
use crate::error::{PoolError, Result};
use crate::node::{NodeInfo, Style, StyleBits, VisibilityHandlers};
use crate::pools::Pools;
use crate::rect::Rect;
use crate::size_spec::{Size, SizeSpec};
use std::fmt;
use std::sync::Arc;

/// A handle to a node in a [`NodeTree`].
pub type NodeId = GenIndex;

/// How the measurement engine obtains the size of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureKind {
    /// Sized by style and children only.
    #[default]
    None,
    /// The component measures its own content.
    Component,
    /// The component builds a nested tree once the constraints are known.
    NestedTree,
}

/// One step of layout resolution.
#[derive(Default)]
pub struct LayoutNode {
    pub(crate) component: Option<Component>,
    pub(crate) style: Style,
    pub(crate) bits: StyleBits,
    pub(crate) node_info: Option<Arc<NodeInfo>>,
    pub(crate) visibility: Option<Arc<VisibilityHandlers>>,
    pub(crate) measure: MeasureKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Position relative to the parent, and size.
    pub(crate) bounds: Rect,
    /// Matching node in the previous pass's diff tree.
    pub(crate) diff_node: Option<usize>,
    pub(crate) cached_measures_valid: bool,
    pub(crate) last_width_spec: Option<SizeSpec>,
    pub(crate) last_height_spec: Option<SizeSpec>,
    pub(crate) last_measured: Option<Size>,
    pub(crate) nested_tree: Option<Arc<NodeTree>>,
}

impl LayoutNode {
    /// Clears everything but keeps allocations, for reuse from a pool.
    pub(crate) fn reset(&mut self) {
        let mut children = std::mem::take(&mut self.children);
        children.clear();
        *self = LayoutNode {
            children,
            ..LayoutNode::default()
        };
    }

    pub fn component(&self) -> Option<&Component> {
        self.component.as_ref()
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn bits(&self) -> StyleBits {
        self.bits
    }

    pub fn node_info(&self) -> Option<&NodeInfo> {
        self.node_info.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn measure_kind(&self) -> MeasureKind {
        self.measure
    }

    /// Whether the measurement engine has to ask the core for this node's size.
    pub fn is_measurable(&self) -> bool {
        self.measure != MeasureKind::None
    }

    pub fn is_nested_tree_holder(&self) -> bool {
        self.measure == MeasureKind::NestedTree
    }

    pub fn nested_tree(&self) -> Option<&Arc<NodeTree>> {
        self.nested_tree.as_ref()
    }

    pub fn has_cached_measures(&self) -> bool {
        self.cached_measures_valid
    }
}

/// A tree of layout nodes, stored in an arena.
///
/// Nodes come from and return to a [`Pools`] instance. A node may only be released once it has
/// been detached from its parent and has no children left; dropping the tree releases every node
/// that is still alive.
pub struct NodeTree {
    nodes: Arena<LayoutNode>,
    root: Option<NodeId>,
    pools: Arc<Pools>,
    pool_capacity: usize,
    previous_diff: Option<Arc<DiffTree>>,
}

impl NodeTree {
    pub fn new(pools: Arc<Pools>, pool_capacity: usize) -> NodeTree {
        NodeTree {
            nodes: Arena::new(),
            root: None,
            pools,
            pool_capacity,
            previous_diff: None,
        }
    }

    /// Acquires a fresh node from the pool.
    pub fn create_node(&mut self) -> NodeId {
        let node = self.pools.acquire_layout_node();
        self.nodes.insert(node)
    }

    pub fn node(&self, id: NodeId) -> Result<&LayoutNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| PoolError::StaleHandle(id).into())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut LayoutNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| PoolError::StaleHandle(id).into())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn style(&self, id: NodeId) -> Result<&Style> {
        Ok(&self.node(id)?.style)
    }

    /// Sets a node's position (relative to its parent) and size. Used by layout engines.
    pub fn set_bounds(&mut self, id: NodeId, bounds: Rect) -> Result<()> {
        self.node_mut(id)?.bounds = bounds;
        Ok(())
    }

    pub(crate) fn previous_diff(&self) -> Option<&Arc<DiffTree>> {
        self.previous_diff.as_ref()
    }

    pub(crate) fn set_previous_diff(&mut self, diff: Option<Arc<DiffTree>>) {
        self.previous_diff = diff;
    }

    pub(crate) fn pools(&self) -> &Arc<Pools> {
        &self.pools
    }

    pub(crate) fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Attaches `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        let child_node = self.node_mut(child)?;
        if child_node.parent.is_some() {
            return Err(PoolError::AlreadyAttached(child).into());
        }
        child_node.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Detaches the child at `index` and returns it.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let parent_node = self.node_mut(parent)?;
        if index >= parent_node.children.len() {
            return Err(crate::Error::Layout(format!(
                "child index {} out of range for {:?}",
                index, parent
            )));
        }
        let child = parent_node.children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok(child)
    }

    /// Returns a detached, childless node to the pool.
    pub fn release(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        if node.parent.is_some() {
            return Err(PoolError::ReleasedAttachedNode(id).into());
        }
        if !node.children.is_empty() {
            return Err(PoolError::ReleasedNodeWithChildren(id).into());
        }
        if self.root == Some(id) {
            self.root = None;
        }
        if let Some(node) = self.nodes.remove(id) {
            self.pools.release_layout_node(node, self.pool_capacity);
        }
        Ok(())
    }

    /// Releases every node, detaching them first.
    pub fn release_tree(self) {
        drop(self)
    }

    /// Collects node ids in depth-first pre-order, starting at the root.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                order.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }
}

impl Drop for NodeTree {
    fn drop(&mut self) {
        for id in self.nodes.handles() {
            if let Some(node) = self.nodes.remove(id) {
                self.pools.release_layout_node(node, self.pool_capacity);
            }
        }
    }
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn write_node(
            tree: &NodeTree,
            id: NodeId,
            depth: usize,
            f: &mut fmt::Formatter,
        ) -> fmt::Result {
            let node = match tree.nodes.get(id) {
                Some(node) => node,
                None => return writeln!(f, "{:indent$}<stale {:?}>", "", id, indent = depth * 2),
            };
            let name = node
                .component
                .as_ref()
                .map_or_else(|| "Container".to_owned(), Component::describe);
            writeln!(f, "{:indent$}{} {:?}", "", name, node.bounds, indent = depth * 2)?;
            for child in &node.children {
                write_node(tree, *child, depth + 1, f)?;
            }
            Ok(())
        }

        writeln!(f, "NodeTree ({} nodes)", self.nodes.len())?;
        if let Some(root) = self.root {
            write_node(self, root, 1, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn tree() -> (Arc<Pools>, NodeTree) {
        let pools = Arc::new(Pools::new());
        let tree = NodeTree::new(Arc::clone(&pools), 16);
        (pools, tree)
    }

    #[test]
    fn releasing_an_attached_node_fails() {
        let (_, mut tree) = tree();
        let parent = tree.create_node();
        let child = tree.create_node();
        tree.append_child(parent, child).unwrap();

        let err = tree.release(child).expect_err("child is attached");
        assert!(matches!(err, Error::Pool(PoolError::ReleasedAttachedNode(id)) if id == child));

        let err = tree.release(parent).expect_err("parent has children");
        assert!(matches!(err, Error::Pool(PoolError::ReleasedNodeWithChildren(_))));
    }

    #[test]
    fn double_release_fails() {
        let (pools, mut tree) = tree();
        let parent = tree.create_node();
        let child = tree.create_node();
        tree.append_child(parent, child).unwrap();

        assert_eq!(tree.remove_child(parent, 0).unwrap(), child);
        tree.release(child).unwrap();
        assert_eq!(pools.layout_node_pool_len(), 1);

        let err = tree.release(child).expect_err("already released");
        assert!(matches!(err, Error::Pool(PoolError::StaleHandle(_))));
        assert!(tree.node(child).is_err(), "stale handles can't be read");

        // the slot is reused, but the old handle stays dead
        let reused = tree.create_node();
        assert_eq!(reused.index, child.index);
        assert!(tree.node(child).is_err());
        assert_eq!(pools.layout_node_pool_len(), 0);
    }

    #[test]
    fn attaching_twice_fails() {
        let (_, mut tree) = tree();
        let a = tree.create_node();
        let b = tree.create_node();
        let child = tree.create_node();
        tree.append_child(a, child).unwrap();
        assert!(matches!(
            tree.append_child(b, child),
            Err(Error::Pool(PoolError::AlreadyAttached(_)))
        ));
    }

    #[test]
    fn dropping_the_tree_recycles_nodes() {
        let (pools, mut tree) = tree();
        let root = tree.create_node();
        tree.set_root(root);
        for _ in 0..3 {
            let child = tree.create_node();
            tree.append_child(root, child).unwrap();
        }
        assert_eq!(tree.preorder().len(), 4);
        tree.release_tree();
        assert_eq!(pools.layout_node_pool_len(), 4);
    }
}
