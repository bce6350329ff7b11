//! Object pools.
//!
//! Layout nodes and diff nodes are recycled between layout passes, which may run on background
//! threads, so every pool is behind a lock. Mount content is pooled per component type.

use crate::component::{Component, LifecycleId};
use crate::diff::DiffNode;
use crate::error::Result;
use crate::mount_item::MountContent;
use crate::tree::LayoutNode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

const DIFF_NODE_POOL_SIZE: usize = 256;

static GLOBAL: OnceLock<Arc<Pools>> = OnceLock::new();

#[derive(Default)]
pub struct Pools {
    layout_nodes: Mutex<Vec<LayoutNode>>,
    diff_nodes: Mutex<Vec<DiffNode>>,
    mount_content: Mutex<HashMap<LifecycleId, Vec<MountContent>>>,
}

impl Pools {
    pub fn new() -> Pools {
        Pools::default()
    }

    /// The process-wide pools.
    pub fn global() -> Arc<Pools> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Pools::new())))
    }

    pub(crate) fn acquire_layout_node(&self) -> LayoutNode {
        self.layout_nodes.lock().pop().unwrap_or_default()
    }

    pub(crate) fn release_layout_node(&self, mut node: LayoutNode, capacity: usize) {
        node.reset();
        let mut pool = self.layout_nodes.lock();
        if pool.len() < capacity {
            pool.push(node);
        }
    }

    pub(crate) fn acquire_diff_node(&self) -> DiffNode {
        self.diff_nodes.lock().pop().unwrap_or_default()
    }

    pub(crate) fn release_diff_node(&self, mut node: DiffNode) {
        node.reset();
        let mut pool = self.diff_nodes.lock();
        if pool.len() < DIFF_NODE_POOL_SIZE {
            pool.push(node);
        }
    }

    /// Takes pooled content for the component's type, or creates new content.
    pub(crate) fn acquire_mount_content(&self, component: &Component) -> Result<MountContent> {
        let pooled = self
            .mount_content
            .lock()
            .get_mut(&component.lifecycle())
            .and_then(Vec::pop);
        match pooled {
            Some(content) => Ok(content),
            None => component.spec().create_mount_content(),
        }
    }

    /// Returns content to the pool. Content beyond the pool's capacity is dropped.
    pub(crate) fn release_mount_content(
        &self,
        component: &Component,
        content: MountContent,
        default_capacity: usize,
    ) {
        let capacity = component.spec().pool_size().unwrap_or(default_capacity);
        let mut pools = self.mount_content.lock();
        let pool = pools.entry(component.lifecycle()).or_insert_with(Vec::new);
        if pool.len() < capacity {
            pool.push(content);
        }
    }

    pub fn layout_node_pool_len(&self) -> usize {
        self.layout_nodes.lock().len()
    }

    pub fn diff_node_pool_len(&self) -> usize {
        self.diff_nodes.lock().len()
    }

    pub fn mount_content_pool_len(&self, lifecycle: LifecycleId) -> usize {
        self.mount_content
            .lock()
            .get(&lifecycle)
            .map_or(0, Vec::len)
    }

    /// Drops everything pooled.
    pub fn clear(&self) {
        self.layout_nodes.lock().clear();
        self.diff_nodes.lock().clear();
        self.mount_content.lock().clear();
    }
}

impl fmt::Debug for Pools {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pools")
            .field("layout_nodes", &self.layout_node_pool_len())
            .field("diff_nodes", &self.diff_node_pool_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::component::DrawableComponent;

    #[test]
    fn mount_content_is_reused_per_type() {
        let pools = Pools::new();
        let component = Component::new(DrawableComponent::new(Color::BLACK.into()));
        let content = pools.acquire_mount_content(&component).unwrap();
        assert_eq!(pools.mount_content_pool_len(component.lifecycle()), 0);

        pools.release_mount_content(&component, content, 1);
        assert_eq!(pools.mount_content_pool_len(component.lifecycle()), 1);

        let extra = component.spec().create_mount_content().unwrap();
        pools.release_mount_content(&component, extra, 1);
        assert_eq!(
            pools.mount_content_pool_len(component.lifecycle()),
            1,
            "content beyond capacity is dropped"
        );

        pools.acquire_mount_content(&component).unwrap();
        assert_eq!(pools.mount_content_pool_len(component.lifecycle()), 0);
    }

    #[test]
    fn layout_nodes_are_recycled() {
        let pools = Pools::new();
        let node = pools.acquire_layout_node();
        pools.release_layout_node(node, 4);
        assert_eq!(pools.layout_node_pool_len(), 1);
        let _ = pools.acquire_layout_node();
        assert_eq!(pools.layout_node_pool_len(), 0);
        pools.release_layout_node(LayoutNode::default(), 0);
        assert_eq!(pools.layout_node_pool_len(), 0);
    }
}
