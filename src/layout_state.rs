//! Layout states: the flattened, positioned outputs of one layout pass.

use crate::builder::{self, NodeMeasurer};
use crate::component::{Component, DrawableComponent, HostComponent, MountType};
use crate::context::ComponentContext;
use crate::diff::{apply_diff_to_unchanged_nodes, DiffOutput, DiffTree};
use crate::engine::LayoutEngine;
use crate::error::{Error, Result};
use crate::logger::{PerfEvent, EVENT_CALCULATE_LAYOUT_STATE, PARAM_OUTPUT_COUNT};
use crate::node::{Accessibility, StyleBits};
use crate::output::{
    IdCalculator, LayoutOutput, OutputFlags, OutputId, OutputType, UpdateState, ViewNodeInfo,
    VisibilityOutput,
};
use crate::size_spec::{Size, SizeSpec};
use crate::tree::{NodeId, NodeTree};
use cgmath::{EuclideanSpace, Vector2};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifies one layout state. Mount states compare these to tell a new layout state from the
/// one they mounted last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutStateId(Uuid);

impl LayoutStateId {
    fn new() -> LayoutStateId {
        LayoutStateId(Uuid::new_v4())
    }
}

/// The outputs of one layout pass, with the indices incremental mount sweeps over.
///
/// Immutable once built.
pub struct LayoutState {
    id: LayoutStateId,
    component: Component,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    size: Size,
    outputs: Vec<LayoutOutput>,
    indices: HashMap<OutputId, usize>,
    tops: Vec<usize>,
    bottoms: Vec<usize>,
    visibility_outputs: Vec<VisibilityOutput>,
    diff_tree: Option<Arc<DiffTree>>,
}

impl LayoutState {
    /// Runs the whole pipeline for `component`: builds the node tree, carries over what the
    /// previous pass measured, lays the tree out and flattens it.
    pub fn calculate(
        c: &ComponentContext,
        component: &Component,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        previous_diff: Option<Arc<DiffTree>>,
        engine: &dyn LayoutEngine,
    ) -> Result<LayoutState> {
        let c = c.with_size_specs(width_spec, height_spec);
        let use_diff_tree = c.config().use_diff_tree;

        let mut tree = builder::create_tree(&c, component)?;
        let root = tree
            .root()
            .ok_or_else(|| Error::Layout(format!("{} resolved to no root", component.describe())))?;

        if use_diff_tree {
            if let Some(diff) = previous_diff {
                if let Some(diff_root) = diff.root() {
                    apply_diff_to_unchanged_nodes(&mut tree, root, &diff, diff_root, false)?;
                }
                tree.set_previous_diff(Some(diff));
            }
        }

        let mut measurer = NodeMeasurer::new(&c, engine);
        let size =
            engine.calculate_layout(&mut tree, root, width_spec, height_spec, &mut measurer)?;

        let mut flattener = Flattener {
            outputs: Vec::new(),
            visibility_outputs: Vec::new(),
            ids: IdCalculator::new(),
            visibility_ids: IdCalculator::new(),
            diff: if use_diff_tree {
                Some(DiffTree::new(Arc::clone(c.pools())))
            } else {
                None
            },
            host_component: Component::new(HostComponent),
            drawables_in_host_view: c.config().drawables_in_host_view,
        };
        let root_host = HostContext {
            marker: OutputId::ROOT_HOST,
            translation: Vector2::new(0, 0),
        };
        flattener.collect(&tree, root, 0, Vector2::new(0, 0), root_host, None, true)?;
        tree.release_tree();

        let Flattener {
            outputs,
            visibility_outputs,
            diff,
            ..
        } = flattener;

        let indices = outputs
            .iter()
            .enumerate()
            .map(|(index, output)| (output.id, index))
            .collect();
        let mut tops: Vec<usize> = (0..outputs.len()).collect();
        tops.sort_by_key(|&index| (outputs[index].bounds.top(), index));
        let mut bottoms: Vec<usize> = (0..outputs.len()).collect();
        bottoms.sort_by_key(|&index| (outputs[index].bounds.bottom(), index));

        log::debug!(
            "calculated layout state for {}: {} outputs, {} visibility outputs",
            component.describe(),
            outputs.len(),
            visibility_outputs.len()
        );
        c.log(EVENT_CALCULATE_LAYOUT_STATE, || {
            PerfEvent::new(EVENT_CALCULATE_LAYOUT_STATE)
                .with_count(PARAM_OUTPUT_COUNT, outputs.len())
        });

        Ok(LayoutState {
            id: LayoutStateId::new(),
            component: component.clone(),
            width_spec,
            height_spec,
            size,
            outputs,
            indices,
            tops,
            bottoms,
            visibility_outputs,
            diff_tree: diff.map(Arc::new),
        })
    }

    pub fn id(&self) -> LayoutStateId {
        self.id
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn width_spec(&self) -> SizeSpec {
        self.width_spec
    }

    pub fn height_spec(&self) -> SizeSpec {
        self.height_spec
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Outputs in emission order. Hosts always precede the outputs they host.
    pub fn outputs(&self) -> &[LayoutOutput] {
        &self.outputs
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn output(&self, index: usize) -> Option<&LayoutOutput> {
        self.outputs.get(index)
    }

    pub fn index_of(&self, id: OutputId) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    pub fn output_by_id(&self, id: OutputId) -> Option<&LayoutOutput> {
        self.index_of(id).map(|index| &self.outputs[index])
    }

    /// Output indices sorted by top edge, ties in emission order.
    pub fn tops(&self) -> &[usize] {
        &self.tops
    }

    /// Output indices sorted by bottom edge, ties in emission order.
    pub fn bottoms(&self) -> &[usize] {
        &self.bottoms
    }

    pub fn visibility_outputs(&self) -> &[VisibilityOutput] {
        &self.visibility_outputs
    }

    /// What this pass measured, for the next pass to reuse.
    pub fn diff_tree(&self) -> Option<&Arc<DiffTree>> {
        self.diff_tree.as_ref()
    }

    /// Whether this layout state is still valid for `component` under the given specs.
    pub fn is_compatible(
        &self,
        component: &Component,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> bool {
        self.component.ptr_eq(component)
            && width_spec.is_compatible(self.width_spec, self.size.x)
            && height_spec.is_compatible(self.height_spec, self.size.y)
    }
}

impl fmt::Debug for LayoutState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LayoutState")
            .field("id", &self.id)
            .field("component", &self.component.describe())
            .field("size", &self.size)
            .field("outputs", &self.outputs.len())
            .field("visibility_outputs", &self.visibility_outputs.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct HostContext {
    marker: OutputId,
    translation: Vector2<i32>,
}

struct Flattener {
    outputs: Vec<LayoutOutput>,
    visibility_outputs: Vec<VisibilityOutput>,
    ids: IdCalculator,
    visibility_ids: IdCalculator,
    diff: Option<DiffTree>,
    host_component: Component,
    drawables_in_host_view: bool,
}

impl Flattener {
    fn output_id(
        &mut self,
        component: &Component,
        key: Option<&str>,
        describe: &dyn Fn() -> String,
        level: usize,
        ty: OutputType,
        previous: Option<&DiffOutput>,
    ) -> Result<(OutputId, UpdateState, Option<Component>)> {
        let id = self.ids.calculate(
            component.lifecycle(),
            key,
            describe,
            level,
            ty,
            previous.map(|previous| previous.id),
        )?;
        Ok(match previous {
            Some(previous) if previous.id == id => {
                let state = if Component::should_update(&previous.component, component) {
                    UpdateState::Dirty
                } else {
                    UpdateState::Updated
                };
                (id, state, Some(previous.component.clone()))
            }
            _ => (id, UpdateState::Unknown, None),
        })
    }

    fn record(
        &mut self,
        diff_index: Option<usize>,
        record: impl FnOnce(&mut crate::diff::DiffNode),
    ) {
        if let (Some(diff), Some(index)) = (self.diff.as_mut(), diff_index) {
            if let Some(node) = diff.node_mut(index) {
                record(node);
            }
        }
    }

    /// Emits the outputs of `id` and its subtree: host, background, content, children, border,
    /// foreground.
    #[allow(clippy::too_many_arguments)]
    fn collect(
        &mut self,
        tree: &NodeTree,
        id: NodeId,
        level: usize,
        offset: Vector2<i32>,
        host: HostContext,
        parent_diff: Option<usize>,
        is_root: bool,
    ) -> Result<()> {
        let node = tree.node(id)?;

        if node.is_nested_tree_holder() {
            let nested = node.nested_tree.as_ref().ok_or_else(|| {
                Error::Layout(format!("nested tree of {:?} was never measured", node.component))
            })?;
            let nested_root = nested
                .root()
                .ok_or_else(|| Error::Layout("nested tree has no root".to_owned()))?;
            let offset = offset + node.bounds.origin.to_vec();
            return self.collect(nested, nested_root, level, offset, host, parent_diff, is_root);
        }

        let style = &node.style;
        let bounds = node.bounds + offset;
        let key = node.component.as_ref().and_then(Component::key);
        let describe = || {
            node.component
                .as_ref()
                .map_or_else(|| "Container".to_owned(), Component::describe)
        };
        let previous = node
            .diff_node
            .and_then(|index| tree.previous_diff().and_then(|diff| diff.node(index)));

        let diff_index = self.diff.as_mut().map(|diff| {
            diff.push(parent_diff, |diff_node| {
                diff_node.component = node.component.clone();
                diff_node.style = node.style.clone();
                diff_node.last_width_spec = node.last_width_spec;
                diff_node.last_height_spec = node.last_height_spec;
                diff_node.last_measured = node.last_measured;
            })
        });

        let mount_type = node.component.as_ref().and_then(Component::mount_type);
        let is_view_mount = mount_type == Some(MountType::View);
        let node_info = node.node_info.clone().filter(|info| !info.is_empty());
        let host_drawables = self.drawables_in_host_view
            && !is_view_mount
            && (style.background.is_some() || style.foreground.is_some());
        let needs_host = is_root
            || host_drawables
            || (!is_view_mount
                && (style.wrap_in_view
                    || style.transition_key.is_some()
                    || style.duplicate_children_states
                    || node_info.as_ref().map_or(false, |info| info.needs_view())));
        let touch_expansion = if node.bits.contains(StyleBits::TOUCH_EXPANSION) {
            Some(style.touch_expansion)
        } else {
            None
        };
        let important = style.accessibility == Accessibility::Yes;

        let mut host = host;
        if needs_host {
            let previous_host = previous.and_then(|previous| previous.host.as_ref());
            let host_component = self.host_component.clone();
            let (host_id, state, diff_component) = if is_root {
                match previous_host {
                    Some(previous) => (
                        OutputId::ROOT_HOST,
                        UpdateState::Updated,
                        Some(previous.component.clone()),
                    ),
                    None => (OutputId::ROOT_HOST, UpdateState::Unknown, None),
                }
            } else {
                self.output_id(
                    &host_component,
                    key,
                    &describe,
                    level,
                    OutputType::Host,
                    previous_host,
                )?
            };

            let mut flags = OutputFlags::IS_HOST;
            flags.set(OutputFlags::DUPLICATE_PARENT_STATE, style.duplicate_parent_state);
            flags.set(OutputFlags::DUPLICATE_CHILDREN_STATES, style.duplicate_children_states);
            flags.set(OutputFlags::IMPORTANT_FOR_ACCESSIBILITY, important);
            let view_node_info = ViewNodeInfo {
                background: style.background.clone().filter(|_| host_drawables),
                foreground: style.foreground.clone().filter(|_| host_drawables),
                padding: style.padding,
                layout_direction: style.layout_direction,
            };

            self.outputs.push(LayoutOutput {
                id: host_id,
                component: host_component.clone(),
                bounds,
                host_translation: host.translation,
                host_marker: host.marker,
                flags,
                node_info: node_info.clone(),
                view_node_info: Some(Arc::new(view_node_info)).filter(|info| !info.is_empty()),
                update_state: state,
                diff_component,
                touch_expansion,
            });
            self.record(diff_index, |diff_node| {
                diff_node.host = Some(DiffOutput {
                    id: host_id,
                    component: host_component,
                })
            });
            host = HostContext {
                marker: host_id,
                translation: bounds.origin.to_vec(),
            };
        }

        // drawables inside their own host copy its pressed state
        let mut drawable_flags = OutputFlags::empty();
        drawable_flags.set(
            OutputFlags::DUPLICATE_PARENT_STATE,
            needs_host || style.duplicate_parent_state,
        );

        if let (Some(background), false) = (&style.background, is_view_mount || host_drawables) {
            let component = Component::new(DrawableComponent::new(background.clone()));
            let previous = previous.and_then(|previous| previous.background.as_ref());
            let (output_id, state, diff_component) = self.output_id(
                &component,
                key,
                &describe,
                level,
                OutputType::Background,
                previous,
            )?;
            self.push_drawable(
                output_id,
                component.clone(),
                bounds,
                host,
                drawable_flags,
                (state, diff_component),
            );
            self.record(diff_index, |diff_node| {
                diff_node.background = Some(DiffOutput { id: output_id, component })
            });
        }

        if let (Some(component), Some(mount_type)) = (&node.component, mount_type) {
            let previous = previous.and_then(|previous| previous.content.as_ref());
            let (output_id, state, diff_component) =
                self.output_id(component, key, &describe, level, OutputType::Content, previous)?;

            let mut flags = OutputFlags::empty();
            flags.set(
                OutputFlags::DUPLICATE_PARENT_STATE,
                needs_host || style.duplicate_parent_state,
            );
            flags.set(OutputFlags::IMPORTANT_FOR_ACCESSIBILITY, important && !needs_host);
            let (content_bounds, view_node_info) = match mount_type {
                MountType::Drawable => (bounds.inset(style.padding), None),
                MountType::View => {
                    let info = ViewNodeInfo {
                        background: style.background.clone(),
                        foreground: style.foreground.clone(),
                        padding: style.padding,
                        layout_direction: style.layout_direction,
                    };
                    (bounds, Some(Arc::new(info)).filter(|info| !info.is_empty()))
                }
            };

            self.outputs.push(LayoutOutput {
                id: output_id,
                component: component.clone(),
                bounds: content_bounds,
                host_translation: host.translation,
                host_marker: host.marker,
                flags,
                node_info: if needs_host { None } else { node_info.clone() },
                view_node_info,
                update_state: state,
                diff_component,
                touch_expansion: if needs_host { None } else { touch_expansion },
            });
            let component = component.clone();
            self.record(diff_index, |diff_node| {
                diff_node.content = Some(DiffOutput { id: output_id, component })
            });
        }

        if let Some(handlers) = node.visibility.as_ref().filter(|handlers| !handlers.is_empty()) {
            let component = node
                .component
                .clone()
                .unwrap_or_else(|| self.host_component.clone());
            let previous_id = previous.and_then(|previous| previous.visibility);
            let visibility_id = self.visibility_ids.calculate(
                component.lifecycle(),
                key,
                &describe,
                level,
                OutputType::Content,
                previous_id,
            )?;
            self.visibility_outputs.push(VisibilityOutput {
                id: visibility_id,
                component: node.component.clone(),
                bounds,
                handlers: Arc::clone(handlers),
            });
            self.record(diff_index, |diff_node| diff_node.visibility = Some(visibility_id));
        }

        for child in &node.children {
            self.collect(tree, *child, level + 1, bounds.origin.to_vec(), host, diff_index, false)?;
        }

        if is_view_mount {
            return Ok(());
        }
        if let Some(border) = &style.border {
            let component = Component::new(DrawableComponent::new(border.clone()));
            let previous = previous.and_then(|previous| previous.border.as_ref());
            let (output_id, state, diff_component) = self.output_id(
                &component,
                key,
                &describe,
                level,
                OutputType::Foreground,
                previous,
            )?;
            self.push_drawable(
                output_id,
                component.clone(),
                bounds,
                host,
                drawable_flags,
                (state, diff_component),
            );
            self.record(diff_index, |diff_node| {
                diff_node.border = Some(DiffOutput { id: output_id, component })
            });
        }
        if let (Some(foreground), false) = (&style.foreground, host_drawables) {
            let component = Component::new(DrawableComponent::new(foreground.clone()));
            let previous = previous.and_then(|previous| previous.foreground.as_ref());
            let (output_id, state, diff_component) = self.output_id(
                &component,
                key,
                &describe,
                level,
                OutputType::Foreground,
                previous,
            )?;
            self.push_drawable(
                output_id,
                component.clone(),
                bounds,
                host,
                drawable_flags,
                (state, diff_component),
            );
            self.record(diff_index, |diff_node| {
                diff_node.foreground = Some(DiffOutput { id: output_id, component })
            });
        }
        Ok(())
    }

    fn push_drawable(
        &mut self,
        id: OutputId,
        component: Component,
        bounds: crate::rect::Rect,
        host: HostContext,
        flags: OutputFlags,
        (update_state, diff_component): (UpdateState, Option<Component>),
    ) {
        self.outputs.push(LayoutOutput {
            id,
            component,
            bounds,
            host_translation: host.translation,
            host_marker: host.marker,
            flags,
            node_info: None,
            view_node_info: None,
            update_state,
            diff_component,
            touch_expansion: None,
        });
    }
}
