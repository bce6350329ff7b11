//! Resolves component descriptions into node trees.

use crate::component::{Component, ComponentKind};
use crate::context::ComponentContext;
use crate::diff::apply_diff_to_unchanged_nodes;
use crate::engine::{LayoutEngine, LeafMeasurer};
use crate::error::{Error, Result, StructuralError};
use crate::node::{Node, NodeSource, StyleBits};
use crate::size_spec::{Size, SizeSpec};
use crate::tree::{MeasureKind, NodeId, NodeTree};
use std::sync::Arc;

/// Builds the node tree for `root`. Nested trees stay unresolved until measurement.
pub fn create_tree(c: &ComponentContext, root: &Component) -> Result<NodeTree> {
    let mut tree = NodeTree::new(Arc::clone(c.pools()), c.config().layout_node_pool_size);
    let root = resolve_component(c, &mut tree, root, true)?;
    tree.set_root(root);
    Ok(tree)
}

fn resolve_component(
    c: &ComponentContext,
    tree: &mut NodeTree,
    component: &Component,
    is_root: bool,
) -> Result<NodeId> {
    let id = match component.kind() {
        ComponentKind::Layout => match component.spec().on_create_layout(c)? {
            Some(layout) => resolve_node(c, tree, &layout, is_root, &component.describe())?,
            None => {
                log::trace!("{} has an empty layout", component.describe());
                tree.create_node()
            }
        },
        ComponentKind::NestedTree => {
            let id = tree.create_node();
            tree.node_mut(id)?.measure = MeasureKind::NestedTree;
            id
        }
        ComponentKind::Mount(_) => {
            let id = tree.create_node();
            if component.spec().can_measure() {
                tree.node_mut(id)?.measure = MeasureKind::Component;
            }
            id
        }
    };

    // nodes keep the innermost component that produced them
    let node = tree.node_mut(id)?;
    if node.component.is_none() {
        node.component = Some(component.clone());
    }
    Ok(id)
}

fn validate(node: &Node, is_root: bool, owner: &str) -> Result<()> {
    if let Some((property, conflicts_with)) = node.conflict {
        return Err(StructuralError::ConflictingProperty {
            component: owner.to_owned(),
            property,
            conflicts_with,
        }
        .into());
    }
    if !is_root && node.bits.intersects(StyleBits::ROOT_ONLY) {
        return Err(StructuralError::RootOnlyProperty {
            component: owner.to_owned(),
            property: "layout_direction",
        }
        .into());
    }
    Ok(())
}

fn resolve_node(
    c: &ComponentContext,
    tree: &mut NodeTree,
    node: &Node,
    is_root: bool,
    owner: &str,
) -> Result<NodeId> {
    validate(node, is_root, owner)?;

    let id = match &node.source {
        NodeSource::Container => {
            let id = tree.create_node();
            for child in &node.children {
                let child = resolve_node(c, tree, child, false, owner)?;
                tree.append_child(id, child)?;
            }
            id
        }
        NodeSource::Component(component) => resolve_component(c, tree, component, is_root)?,
    };

    let layout = tree.node_mut(id)?;
    match &node.source {
        NodeSource::Container => {
            layout.style = node.style.clone();
            layout.bits = node.bits;
        }
        NodeSource::Component(_) => {
            layout.style.merge_from(&node.style, node.bits);
            layout.bits |= node.bits;
        }
    }
    if !node.node_info.is_empty() {
        let mut info = layout.node_info.as_deref().cloned().unwrap_or_default();
        info.merge_from(&node.node_info);
        layout.node_info = Some(Arc::new(info));
    }
    if !node.visibility.is_empty() {
        let mut handlers = layout.visibility.as_deref().cloned().unwrap_or_default();
        handlers.merge_from(&node.visibility);
        layout.visibility = Some(Arc::new(handlers));
    }
    Ok(id)
}

/// Resolves and measures the nested tree of a holder node for the given constraints.
///
/// The result is cached on the holder's component; asking again with the same specs returns the
/// cached tree without calling the component.
pub(crate) fn resolve_nested_tree(
    c: &ComponentContext,
    engine: &dyn LayoutEngine,
    measurer: &mut dyn LeafMeasurer,
    holder_tree: &NodeTree,
    holder: NodeId,
    width: SizeSpec,
    height: SizeSpec,
) -> Result<Arc<NodeTree>> {
    let holder_node = holder_tree.node(holder)?;
    let component = match &holder_node.component {
        Some(component) => component.clone(),
        None => {
            return Err(Error::Layout(format!(
                "nested tree holder {:?} has no component",
                holder
            )))
        }
    };
    if let Some(cached) = component.cached_nested_tree(width, height) {
        log::trace!("reusing nested tree of {}", component.describe());
        return Ok(cached);
    }

    let nested_context = c.with_size_specs(width, height);
    let layout = component
        .spec()
        .on_create_layout_with_size_spec(&nested_context, width, height)?;

    let mut nested = NodeTree::new(Arc::clone(holder_tree.pools()), holder_tree.pool_capacity());
    let root = match layout {
        Some(layout) => resolve_node(
            &nested_context,
            &mut nested,
            &layout,
            true,
            &component.describe(),
        )?,
        None => nested.create_node(),
    };
    nested.set_root(root);

    // the holder's own props apply to the nested root; the holder's component is not stored in
    // its own cached tree
    {
        let root_node = nested.node_mut(root)?;
        root_node.style.merge_from(&holder_node.style, holder_node.bits);
        root_node.bits |= holder_node.bits;
        if let Some(info) = &holder_node.node_info {
            let mut merged = root_node.node_info.as_deref().cloned().unwrap_or_default();
            merged.merge_from(info);
            root_node.node_info = Some(Arc::new(merged));
        }
        if let Some(handlers) = &holder_node.visibility {
            let mut merged = root_node.visibility.as_deref().cloned().unwrap_or_default();
            merged.merge_from(handlers);
            root_node.visibility = Some(Arc::new(merged));
        }
    }

    nested.set_previous_diff(holder_tree.previous_diff().cloned());
    if let (Some(diff), Some(diff_index)) =
        (holder_tree.previous_diff().cloned(), holder_node.diff_node)
    {
        apply_diff_to_unchanged_nodes(&mut nested, root, &diff, diff_index, true)?;
    }

    engine.calculate_layout(&mut nested, root, width, height, measurer)?;

    let nested = Arc::new(nested);
    component.set_cached_nested_tree(width, height, Arc::clone(&nested));
    Ok(nested)
}

/// Measures leaves for a layout engine: asks components for their size, reusing measurements
/// carried over by the diff engine, and resolves nested trees.
pub struct NodeMeasurer<'a> {
    context: &'a ComponentContext,
    engine: &'a dyn LayoutEngine,
}

impl<'a> NodeMeasurer<'a> {
    pub fn new(context: &'a ComponentContext, engine: &'a dyn LayoutEngine) -> NodeMeasurer<'a> {
        NodeMeasurer { context, engine }
    }

    fn measure_component(
        &mut self,
        tree: &mut NodeTree,
        id: NodeId,
        width: SizeSpec,
        height: SizeSpec,
    ) -> Result<Size> {
        let node = tree.node(id)?;
        if node.cached_measures_valid {
            if let (Some(last_width), Some(last_height), Some(measured)) =
                (node.last_width_spec, node.last_height_spec, node.last_measured)
            {
                if width.is_compatible(last_width, measured.x)
                    && height.is_compatible(last_height, measured.y)
                {
                    return Ok(measured);
                }
            }
        }

        let component = match &node.component {
            Some(component) => component.clone(),
            None => return Err(Error::Layout(format!("measurable node {:?} has no component", id))),
        };
        let size = component.spec().on_measure(self.context, width, height)?;

        let node = tree.node_mut(id)?;
        node.last_width_spec = Some(width);
        node.last_height_spec = Some(height);
        node.last_measured = Some(size);
        node.cached_measures_valid = true;
        Ok(size)
    }
}

impl<'a> LeafMeasurer for NodeMeasurer<'a> {
    fn measure(
        &mut self,
        tree: &mut NodeTree,
        node: NodeId,
        width: SizeSpec,
        height: SizeSpec,
    ) -> Result<Size> {
        let kind = tree.node(node)?.measure;
        match kind {
            MeasureKind::Component => self.measure_component(tree, node, width, height),
            MeasureKind::NestedTree => {
                let (context, engine) = (self.context, self.engine);
                let nested = resolve_nested_tree(context, engine, self, tree, node, width, height)?;
                let size = match nested.root() {
                    Some(root) => nested.node(root)?.bounds.size,
                    None => Size::new(0, 0),
                };
                let holder = tree.node_mut(node)?;
                holder.nested_tree = Some(nested);
                holder.last_width_spec = Some(width);
                holder.last_height_spec = Some(height);
                holder.last_measured = Some(size);
                Ok(size)
            }
            MeasureKind::None => Ok(tree.node(node)?.bounds.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LayoutDirection;
    use crate::pools::Pools;

    #[derive(Debug, PartialEq)]
    struct Leaf;
    crate::impl_component! {
        Leaf;
        fn kind(&self) -> ComponentKind {
            ComponentKind::Mount(crate::component::MountType::Drawable)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Wrapper(bool);
    crate::impl_component! {
        Wrapper;
        fn on_create_layout(&self, _c: &ComponentContext) -> Result<Option<Node>> {
            if !self.0 {
                return Ok(None);
            }
            Ok(Some(Node::row().child(Node::component(Leaf).width(4)).child(Node::component(Leaf))))
        }
    }

    fn context() -> ComponentContext {
        ComponentContext::new().with_pools(Arc::new(Pools::new()))
    }

    #[test]
    fn layout_components_resolve_to_their_layout() {
        let tree = create_tree(&context(), &Component::new(Wrapper(true))).unwrap();
        let root = tree.root().unwrap();
        let root_node = tree.node(root).unwrap();
        assert!(root_node.component().unwrap().downcast_ref::<Wrapper>().is_some());
        assert_eq!(root_node.children().len(), 2);

        let first = tree.node(root_node.children()[0]).unwrap();
        assert!(first.component().unwrap().downcast_ref::<Leaf>().is_some());
        assert_eq!(first.style().width, Some(4));
        assert!(first.bits().contains(StyleBits::WIDTH));
    }

    #[test]
    fn empty_layouts_are_childless_nodes() {
        let tree = create_tree(&context(), &Component::new(Wrapper(false))).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.children(tree.root().unwrap()).unwrap().is_empty());
    }

    #[derive(Debug, PartialEq)]
    struct Conflicted;
    crate::impl_component! {
        Conflicted;
        fn on_create_layout(&self, _c: &ComponentContext) -> Result<Option<Node>> {
            Ok(Some(Node::column().child(Node::column().position(1, 1).flex_grow(1.))))
        }
    }

    #[derive(Debug, PartialEq)]
    struct DeepDirection;
    crate::impl_component! {
        DeepDirection;
        fn on_create_layout(&self, _c: &ComponentContext) -> Result<Option<Node>> {
            Ok(Some(
                Node::column()
                    .layout_direction(LayoutDirection::Rtl)
                    .child(Node::column().layout_direction(LayoutDirection::Ltr)),
            ))
        }
    }

    #[test]
    fn structural_errors_name_the_component() {
        let err = create_tree(&context(), &Component::new(Conflicted)).expect_err("conflict");
        assert!(matches!(
            err,
            Error::Structural(StructuralError::ConflictingProperty {
                ref component,
                property: "flex_grow",
                ..
            }) if component == "Conflicted"
        ));

        let err = create_tree(&context(), &Component::keyed(DeepDirection, "d"))
            .expect_err("root only");
        assert!(matches!(
            err,
            Error::Structural(StructuralError::RootOnlyProperty { ref component, .. })
                if component == "DeepDirection(key=\"d\")"
        ));
    }
}
