//! Mounting layout states.
//!
//! A [`MountState`] owns every mounted item, keyed by output id, and keeps them in sync with a
//! layout state and a visible rectangle. Mounting the same layout state again with a rectangle
//! that only moved vertically sweeps the layout state's top and bottom indices instead of
//! visiting every output.
//!
//! Mount states are not thread safe: all mounting happens on one thread.

use crate::component::Component;
use crate::context::ComponentContext;
use crate::error::{Error, Result};
use crate::host::{touch_area, ComponentHost, HostedItem};
use crate::layout_state::{LayoutState, LayoutStateId};
use crate::logger::{
    PerfEvent, EVENT_MOUNT, EVENT_PREPARE_MOUNT, PARAM_IS_DIRTY, PARAM_MOUNTED_COUNT,
    PARAM_MOVED_COUNT, PARAM_NO_OP_COUNT, PARAM_UNMOUNTED_COUNT, PARAM_UPDATED_COUNT,
};
use crate::mount_item::{MountContent, MountItem};
use crate::output::{LayoutOutput, OutputFlags, OutputId, UpdateState};
use crate::rect::Rect;
use crate::visibility::VisibilityTracker;
use cgmath::Point2;
use std::collections::HashMap;
use std::ops::Range;

/// What one call to [`MountState::mount`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountStats {
    pub mounted: usize,
    pub unmounted: usize,
    pub updated: usize,
    pub moved: usize,
    pub no_op: usize,
    /// Whether the pass visited every output.
    pub is_dirty: bool,
}

pub struct MountState {
    context: ComponentContext,
    root_host: ComponentHost,
    items: HashMap<OutputId, MountItem>,
    layout_state: Option<LayoutStateId>,
    previous_rect: Option<Rect>,
    previous_tops_index: usize,
    previous_bottoms_index: usize,
    is_dirty: bool,
    visibility: VisibilityTracker,
    last_stats: MountStats,
}

fn span(a: usize, b: usize) -> Range<usize> {
    a.min(b)..a.max(b)
}

impl MountState {
    pub fn new(context: ComponentContext) -> MountState {
        let mut root_host = ComponentHost::new();
        root_host.set_id(Some(OutputId::ROOT_HOST));
        MountState {
            context,
            root_host,
            items: HashMap::new(),
            layout_state: None,
            previous_rect: None,
            previous_tops_index: 0,
            previous_bottoms_index: 0,
            is_dirty: true,
            visibility: VisibilityTracker::new(),
            last_stats: MountStats::default(),
        }
    }

    /// Forces the next mount to visit every output.
    pub fn set_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Brings mounted content in line with `layout_state` seen through `visible_rect`.
    ///
    /// Errors from component callbacks are returned as-is; the mount state is left wherever the
    /// failure happened.
    pub fn mount(&mut self, layout_state: &LayoutState, visible_rect: Rect) -> Result<()> {
        let is_new = self.layout_state != Some(layout_state.id());
        let is_dirty = self.is_dirty || is_new;
        let incremental = self.context.config().incremental_mount;
        let mut stats = MountStats {
            is_dirty,
            ..MountStats::default()
        };

        if is_new && self.layout_state.is_some() {
            self.prepare_mount(layout_state, &mut stats)?;
        }

        let only_moved_vertically = self.previous_rect.map_or(false, |previous| {
            previous.left() == visible_rect.left() && previous.right() == visible_rect.right()
        });
        if incremental && !is_dirty && only_moved_vertically {
            self.perform_incremental_mount(layout_state, visible_rect, &mut stats)?;
        } else {
            for (index, output) in layout_state.outputs().iter().enumerate() {
                if output.id == OutputId::ROOT_HOST {
                    self.update_root_host(output);
                    continue;
                }
                let visible = !incremental || output.bounds.intersects(visible_rect);
                let mounted = self.items.contains_key(&output.id);
                match (visible, mounted) {
                    (true, false) => self.mount_output(layout_state, index, &mut stats)?,
                    (false, true) => self.unmount_item(output.id, &mut stats)?,
                    (true, true) if is_dirty => {
                        if self.update_item(output, index)? {
                            stats.updated += 1;
                        } else {
                            stats.no_op += 1;
                        }
                    }
                    _ => (),
                }
            }
        }

        let (tops_index, bottoms_index) = sweep_indices(layout_state, visible_rect);
        self.previous_tops_index = tops_index;
        self.previous_bottoms_index = bottoms_index;
        self.previous_rect = Some(visible_rect);
        self.layout_state = Some(layout_state.id());
        self.is_dirty = false;

        if self.context.config().process_visibility_outputs {
            self.visibility.process(layout_state, visible_rect);
        }

        log::debug!("mounted {:?} in {:?}: {:?}", layout_state.id(), visible_rect, stats);
        self.context.log(EVENT_MOUNT, || {
            PerfEvent::new(EVENT_MOUNT)
                .with_count(PARAM_MOUNTED_COUNT, stats.mounted)
                .with_count(PARAM_UNMOUNTED_COUNT, stats.unmounted)
                .with_count(PARAM_UPDATED_COUNT, stats.updated)
                .with_count(PARAM_MOVED_COUNT, stats.moved)
                .with_count(PARAM_NO_OP_COUNT, stats.no_op)
                .with_flag(PARAM_IS_DIRTY, stats.is_dirty)
        });
        self.last_stats = stats;
        Ok(())
    }

    /// Unmounts items that are gone from the new layout state or changed host, and moves items
    /// whose position changed.
    fn prepare_mount(&mut self, layout_state: &LayoutState, stats: &mut MountStats) -> Result<()> {
        let (unmounted_before, moved_before) = (stats.unmounted, stats.moved);
        let mut mounted: Vec<(usize, OutputId)> = self
            .items
            .values()
            .map(|item| (item.index, item.id))
            .collect();
        mounted.sort_unstable_by(|a, b| b.cmp(a));

        for (old_index, id) in mounted {
            let host = match self.items.get(&id) {
                Some(item) => item.host,
                // went away with its host
                None => continue,
            };
            let new_index = layout_state
                .index_of(id)
                .filter(|&index| layout_state.outputs()[index].host_marker == host);
            match new_index {
                Some(new_index) if new_index != old_index => {
                    if let Some(host) = self.host_mut(host) {
                        host.move_item(id, old_index, new_index);
                    }
                    if let Some(item) = self.items.get_mut(&id) {
                        item.index = new_index;
                    }
                    stats.moved += 1;
                }
                Some(_) => (),
                None => self.unmount_item(id, stats)?,
            }
        }

        self.context.log(EVENT_PREPARE_MOUNT, || {
            PerfEvent::new(EVENT_PREPARE_MOUNT)
                .with_count(PARAM_UNMOUNTED_COUNT, stats.unmounted - unmounted_before)
                .with_count(PARAM_MOVED_COUNT, stats.moved - moved_before)
        });
        Ok(())
    }

    fn perform_incremental_mount(
        &mut self,
        layout_state: &LayoutState,
        visible_rect: Rect,
        stats: &mut MountStats,
    ) -> Result<()> {
        let outputs = layout_state.outputs();
        let (tops_index, bottoms_index) = sweep_indices(layout_state, visible_rect);

        // only outputs crossing either index can change membership
        let mut candidates: Vec<usize> = layout_state.bottoms()
            [span(self.previous_bottoms_index, bottoms_index)]
            .iter()
            .chain(&layout_state.tops()[span(self.previous_tops_index, tops_index)])
            .copied()
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let mut leaving = Vec::new();
        let mut entering = Vec::new();
        for index in candidates {
            let output = &outputs[index];
            if output.id == OutputId::ROOT_HOST {
                continue;
            }
            let visible = output.bounds.intersects(visible_rect);
            match (visible, self.items.contains_key(&output.id)) {
                (false, true) => leaving.push(index),
                (true, false) => entering.push(index),
                _ => (),
            }
        }

        for index in leaving.into_iter().rev() {
            self.unmount_item(outputs[index].id, stats)?;
        }
        for index in entering {
            if !self.items.contains_key(&outputs[index].id) {
                self.mount_output(layout_state, index, stats)?;
            }
        }
        Ok(())
    }

    fn host_mut(&mut self, id: OutputId) -> Option<&mut ComponentHost> {
        if id == OutputId::ROOT_HOST {
            return Some(&mut self.root_host);
        }
        self.items
            .get_mut(&id)
            .and_then(|item| item.content.as_host_mut())
    }

    fn update_root_host(&mut self, output: &LayoutOutput) {
        self.root_host.set_bounds(output.bounds);
        self.root_host.set_node_info(output.node_info.clone());
        self.root_host.set_view_node_info(output.view_node_info.clone());
    }

    /// Mounts the output at `index`, mounting its host first if needed.
    fn mount_output(
        &mut self,
        layout_state: &LayoutState,
        index: usize,
        stats: &mut MountStats,
    ) -> Result<()> {
        let output = &layout_state.outputs()[index];
        let host_id = output.host_marker;
        if !self.is_mounted(host_id) {
            let host_index = layout_state.index_of(host_id).ok_or_else(|| {
                Error::Layout(format!(
                    "host {:?} of {:?} is not in the layout state",
                    host_id, output.id
                ))
            })?;
            self.mount_output(layout_state, host_index, stats)?;
        }

        let component = &output.component;
        let mut content = self.context.pools().acquire_mount_content(component)?;
        component.spec().mount(&mut content)?;
        if let Some(host) = content.as_host_mut() {
            host.set_id(Some(output.id));
        }
        let bounds = output.mount_bounds();
        content.set_bounds(bounds);
        content.apply_info(output.node_info.as_ref(), output.view_node_info.as_ref());

        let duplicate_parent_state = output.flags.contains(OutputFlags::DUPLICATE_PARENT_STATE);
        let hosted = HostedItem {
            id: output.id,
            mount_type: content.mount_type(),
            duplicate_parent_state,
        };
        let host = self.host_mut(host_id).ok_or_else(|| {
            Error::Layout(format!(
                "{:?} is mounted into {:?}, which is not a host",
                output.id, host_id
            ))
        })?;
        host.mount(index, hosted, touch_area(bounds, output.touch_expansion));
        if duplicate_parent_state {
            content.set_pressed(host.is_pressed());
        }

        component.spec().bind(&mut content)?;

        self.items.insert(
            output.id,
            MountItem {
                id: output.id,
                index,
                component: component.clone(),
                content,
                host: host_id,
                flags: output.flags,
                node_info: output.node_info.clone(),
                view_node_info: output.view_node_info.clone(),
                bounds,
            },
        );
        stats.mounted += 1;
        Ok(())
    }

    /// Unmounts an item, unmounting a host's children first. Content goes back to its pool.
    fn unmount_item(&mut self, id: OutputId, stats: &mut MountStats) -> Result<()> {
        if id == OutputId::ROOT_HOST {
            return Ok(());
        }
        let children = match self.items.get(&id) {
            Some(item) => item
                .content
                .as_host()
                .map(ComponentHost::children)
                .unwrap_or_default(),
            None => return Ok(()),
        };
        for child in children.into_iter().rev() {
            self.unmount_item(child, stats)?;
        }

        let mut item = match self.items.remove(&id) {
            Some(item) => item,
            None => return Ok(()),
        };
        if let Some(host) = self.host_mut(item.host) {
            host.unmount(item.index, id);
        }

        item.component.spec().unbind(&mut item.content)?;
        item.component.spec().unmount(&mut item.content)?;
        if let Some(host) = item.content.as_host_mut() {
            host.reset();
        }
        self.context.pools().release_mount_content(
            &item.component,
            item.content,
            self.context.config().mount_pool_size,
        );
        stats.unmounted += 1;
        Ok(())
    }

    /// Refreshes a mounted item for a new output with the same id. Returns true if the content
    /// had to be remounted.
    fn update_item(&mut self, output: &LayoutOutput, index: usize) -> Result<bool> {
        let item = match self.items.get_mut(&output.id) {
            Some(item) => item,
            None => return Ok(false),
        };

        // the update state only holds against the component the previous pass produced
        let should_update = match output.update_state {
            UpdateState::Updated if output.is_diffed_against(&item.component) => false,
            UpdateState::Dirty if output.is_diffed_against(&item.component) => true,
            _ => Component::should_update(&item.component, &output.component),
        };
        let previous = std::mem::replace(&mut item.component, output.component.clone());
        if should_update {
            previous.spec().unbind(&mut item.content)?;
            previous.spec().unmount(&mut item.content)?;
            item.component.spec().mount(&mut item.content)?;
            item.component.spec().bind(&mut item.content)?;
        }

        item.index = index;
        item.flags = output.flags;
        item.bounds = output.mount_bounds();
        item.node_info = output.node_info.clone();
        item.view_node_info = output.view_node_info.clone();
        item.content.set_bounds(item.bounds);
        item.content
            .apply_info(output.node_info.as_ref(), output.view_node_info.as_ref());
        Ok(should_update)
    }

    /// Unmounts everything but the root host and fires invisible events for everything visible.
    pub fn unmount_all_items(&mut self) -> Result<()> {
        let mut stats = MountStats::default();
        let children = self.root_host.children();
        for child in children.into_iter().rev() {
            self.unmount_item(child, &mut stats)?;
        }
        self.visibility.clear();
        self.layout_state = None;
        self.previous_rect = None;
        self.is_dirty = true;
        log::debug!("unmounted all items: {:?}", stats);
        Ok(())
    }

    /// Sets the pressed state of a host and passes it on to children that duplicate it.
    pub fn set_pressed(&mut self, host: OutputId, pressed: bool) {
        let children = match self.host_mut(host) {
            Some(host) => {
                host.set_pressed_state(pressed);
                host.duplicating_children()
            }
            None => return,
        };
        for child in children {
            let is_host = self
                .items
                .get(&child)
                .map_or(false, |item| item.content.as_host().is_some());
            if is_host {
                self.set_pressed(child, pressed);
            } else if let Some(item) = self.items.get_mut(&child) {
                item.content.set_pressed(pressed);
            }
        }
    }

    /// Clicks a host. Returns false if it has no click handler.
    pub fn perform_click(&self, host: OutputId) -> bool {
        self.host(host).map_or(false, ComponentHost::perform_click)
    }

    /// Finds the child of `host` whose expanded touch area contains `point` (host coordinates).
    pub fn touch_target_at(&self, host: OutputId, point: Point2<i32>) -> Option<OutputId> {
        self.host(host).and_then(|host| host.touch_target_at(point))
    }

    /// The host everything is mounted into. It lives as long as the mount state.
    pub fn root_host(&self) -> &ComponentHost {
        &self.root_host
    }

    pub fn host(&self, id: OutputId) -> Option<&ComponentHost> {
        if id == OutputId::ROOT_HOST {
            return Some(&self.root_host);
        }
        self.items.get(&id).and_then(|item| item.content.as_host())
    }

    /// The mounted item for `id`. The root host is not an item.
    pub fn item(&self, id: OutputId) -> Option<&MountItem> {
        self.items.get(&id)
    }

    pub fn content(&self, id: OutputId) -> Option<&MountContent> {
        self.items.get(&id).map(|item| &item.content)
    }

    pub fn is_mounted(&self, id: OutputId) -> bool {
        id == OutputId::ROOT_HOST || self.items.contains_key(&id)
    }

    /// Number of mounted items, not counting the root host.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Ids of mounted items, not counting the root host, in no particular order.
    pub fn mounted_ids(&self) -> Vec<OutputId> {
        self.items.keys().copied().collect()
    }

    pub fn last_stats(&self) -> MountStats {
        self.last_stats
    }

    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }
}

/// Number of outputs entirely above the rectangle (by bottom edge) and number of outputs
/// starting above its bottom edge (by top edge).
fn sweep_indices(layout_state: &LayoutState, visible_rect: Rect) -> (usize, usize) {
    let outputs = layout_state.outputs();
    let tops_index = layout_state
        .tops()
        .partition_point(|&index| outputs[index].bounds.top() < visible_rect.bottom());
    let bottoms_index = layout_state
        .bottoms()
        .partition_point(|&index| outputs[index].bounds.bottom() <= visible_rect.top());
    (tops_index, bottoms_index)
}
