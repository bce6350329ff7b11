use crate::component::MountType;
use crate::events::{Click, Touch};
use crate::node::NodeInfo;
use crate::output::{OutputId, ViewNodeInfo};
use crate::rect::{Edges, Rect};
use cgmath::Point2;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An item attached to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostedItem {
    pub id: OutputId,
    pub mount_type: MountType,
    /// Copies the host's pressed state.
    pub duplicate_parent_state: bool,
}

/// A view group standing in for one host output.
///
/// Hosts keep track of which outputs are attached to them, keyed by their position in the layout
/// state; the contents themselves are owned by the mount state. Attaching, detaching and moving
/// drawables invalidates the host.
#[derive(Debug, Default)]
pub struct ComponentHost {
    id: Option<OutputId>,
    items: BTreeMap<usize, HostedItem>,
    /// Items displaced by a move, waiting to be moved themselves.
    scrap: Option<BTreeMap<usize, HostedItem>>,
    node_info: Option<Arc<NodeInfo>>,
    view_node_info: Option<Arc<ViewNodeInfo>>,
    bounds: Rect,
    pressed: bool,
    touch_expansions: BTreeMap<usize, (OutputId, Rect)>,
    invalidations: usize,
}

impl ComponentHost {
    pub fn new() -> ComponentHost {
        ComponentHost::default()
    }

    /// The output this host is mounted for.
    pub fn id(&self) -> Option<OutputId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: Option<OutputId>) {
        self.id = id;
    }

    pub(crate) fn mount(&mut self, index: usize, item: HostedItem, touch_area: Option<Rect>) {
        if item.mount_type == MountType::Drawable {
            self.invalidate();
        }
        if let Some(area) = touch_area {
            self.touch_expansions.insert(index, (item.id, area));
        }
        self.items.insert(index, item);
    }

    pub(crate) fn unmount(&mut self, index: usize, id: OutputId) {
        let removed = match self.scrap.as_mut() {
            Some(scrap) if scrap.get(&index).map(|item| item.id) == Some(id) => {
                scrap.remove(&index)
            }
            _ => match self.items.get(&index) {
                Some(item) if item.id == id => self.items.remove(&index),
                _ => None,
            },
        };
        if let Some(item) = removed {
            if item.mount_type == MountType::Drawable {
                self.invalidate();
            }
        }
        if self.touch_expansions.get(&index).map(|(item, _)| *item) == Some(id) {
            self.touch_expansions.remove(&index);
        }
        self.release_scrap_if_empty();
    }

    /// Moves an item to a new index. An item already at the new index is set aside until it is
    /// moved or unmounted itself.
    pub(crate) fn move_item(&mut self, id: OutputId, old_index: usize, new_index: usize) {
        let item = match self.scrap.as_mut() {
            Some(scrap) if scrap.get(&old_index).map(|item| item.id) == Some(id) => {
                scrap.remove(&old_index)
            }
            _ => match self.items.get(&old_index) {
                Some(item) if item.id == id => self.items.remove(&old_index),
                _ => None,
            },
        };
        let item = match item {
            Some(item) => item,
            None => return,
        };

        if let Some(displaced) = self.items.remove(&new_index) {
            self.scrap
                .get_or_insert_with(BTreeMap::new)
                .insert(new_index, displaced);
        }
        if item.mount_type == MountType::Drawable {
            self.invalidate();
        }
        if self.touch_expansions.get(&old_index).map(|(item, _)| *item) == Some(id) {
            if let Some((_, area)) = self.touch_expansions.remove(&old_index) {
                self.touch_expansions.insert(new_index, (id, area));
            }
        }
        self.items.insert(new_index, item);
        self.release_scrap_if_empty();
    }

    fn release_scrap_if_empty(&mut self) {
        if self.scrap.as_ref().map_or(false, BTreeMap::is_empty) {
            self.scrap = None;
        }
    }

    /// Attached items in mount order, including displaced ones.
    pub fn children(&self) -> Vec<OutputId> {
        let mut items: Vec<_> = self.items.iter().collect();
        if let Some(scrap) = &self.scrap {
            items.extend(scrap.iter());
        }
        items.sort_by_key(|(index, _)| **index);
        items.into_iter().map(|(_, item)| item.id).collect()
    }

    pub fn child_count(&self) -> usize {
        self.items.len() + self.scrap.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn drawable_ids(&self) -> Vec<OutputId> {
        self.ids_of(MountType::Drawable)
    }

    pub fn view_ids(&self) -> Vec<OutputId> {
        self.ids_of(MountType::View)
    }

    fn ids_of(&self, mount_type: MountType) -> Vec<OutputId> {
        self.items
            .values()
            .filter(|item| item.mount_type == mount_type)
            .map(|item| item.id)
            .collect()
    }

    pub fn has_scrap(&self) -> bool {
        self.scrap.is_some()
    }

    pub fn node_info(&self) -> Option<&NodeInfo> {
        self.node_info.as_deref()
    }

    pub(crate) fn set_node_info(&mut self, info: Option<Arc<NodeInfo>>) {
        self.node_info = info;
    }

    pub fn view_node_info(&self) -> Option<&ViewNodeInfo> {
        self.view_node_info.as_deref()
    }

    pub(crate) fn set_view_node_info(&mut self, info: Option<Arc<ViewNodeInfo>>) {
        self.view_node_info = info;
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub(crate) fn set_bounds(&mut self, bounds: Rect) {
        if self.bounds != bounds {
            self.bounds = bounds;
            self.invalidate();
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub(crate) fn set_pressed_state(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    /// Items that copy this host's pressed state.
    pub(crate) fn duplicating_children(&self) -> Vec<OutputId> {
        self.items
            .values()
            .filter(|item| item.duplicate_parent_state)
            .map(|item| item.id)
            .collect()
    }

    pub fn invalidate(&mut self) {
        self.invalidations += 1;
    }

    /// How often the host had to redraw.
    pub fn invalidation_count(&self) -> usize {
        self.invalidations
    }

    /// Finds the child whose expanded touch area contains `point` (in host coordinates). Later
    /// children are on top.
    pub fn touch_target_at(&self, point: Point2<i32>) -> Option<OutputId> {
        self.touch_expansions
            .values()
            .rev()
            .find(|(_, area)| area.contains(point))
            .map(|(id, _)| *id)
    }

    /// Dispatches a click to this host's handler. Returns false if there is none.
    pub fn perform_click(&self) -> bool {
        match (&self.node_info, self.id) {
            (Some(info), Some(output)) => match &info.click {
                Some(handler) => {
                    handler.dispatch(Click { output });
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Dispatches a touch at `location` (in host coordinates) to this host's handler.
    pub fn perform_touch(&self, location: Point2<i32>) -> bool {
        match (&self.node_info, self.id) {
            (Some(info), Some(output)) => match &info.touch {
                Some(handler) => {
                    handler.dispatch(Touch { output, location });
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Clears all state so the host can go back to its pool.
    pub(crate) fn reset(&mut self) {
        let invalidations = self.invalidations;
        *self = ComponentHost {
            invalidations,
            ..ComponentHost::default()
        };
    }
}

/// Expanded touch area of a child, in host coordinates.
pub(crate) fn touch_area(bounds: Rect, expansion: Option<Edges>) -> Option<Rect> {
    expansion
        .filter(|expansion| !expansion.is_zero())
        .map(|expansion| bounds.outset(expansion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHandler;
    use parking_lot::Mutex;

    fn id(raw: u64) -> OutputId {
        OutputId::from_raw(raw)
    }

    fn drawable(raw: u64) -> HostedItem {
        HostedItem {
            id: id(raw),
            mount_type: MountType::Drawable,
            duplicate_parent_state: false,
        }
    }

    #[test]
    fn drawables_invalidate() {
        let mut host = ComponentHost::new();
        host.mount(1, drawable(1), None);
        host.mount(
            2,
            HostedItem {
                id: id(2),
                mount_type: MountType::View,
                duplicate_parent_state: true,
            },
            None,
        );
        assert_eq!(host.invalidation_count(), 1);
        assert_eq!(host.drawable_ids(), vec![id(1)]);
        assert_eq!(host.view_ids(), vec![id(2)]);
        assert_eq!(host.duplicating_children(), vec![id(2)]);

        host.unmount(1, id(1));
        assert_eq!(host.invalidation_count(), 2);
        assert_eq!(host.children(), vec![id(2)]);
    }

    #[test]
    fn swapping_items_goes_through_scrap() {
        let mut host = ComponentHost::new();
        host.mount(1, drawable(10), None);
        host.mount(2, drawable(20), None);

        host.move_item(id(10), 1, 2);
        assert!(host.has_scrap());
        assert_eq!(host.child_count(), 2);

        host.move_item(id(20), 2, 1);
        assert!(!host.has_scrap());
        assert_eq!(host.children(), vec![id(20), id(10)]);
    }

    #[test]
    fn touch_expansion_picks_topmost() {
        let mut host = ComponentHost::new();
        let area = touch_area(Rect::from_ltrb(10, 10, 20, 20), Some(Edges::all(5)));
        assert_eq!(area, Some(Rect::from_ltrb(5, 5, 25, 25)));
        assert_eq!(touch_area(Rect::zero(), Some(Edges::default())), None);

        host.mount(1, drawable(1), area);
        host.mount(2, drawable(2), Some(Rect::from_ltrb(0, 0, 8, 8)));
        assert_eq!(host.touch_target_at(Point2::new(6, 6)), Some(id(2)));
        assert_eq!(host.touch_target_at(Point2::new(22, 22)), Some(id(1)));
        assert_eq!(host.touch_target_at(Point2::new(40, 40)), None);
    }

    #[test]
    fn click_goes_to_node_info() {
        let clicks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&clicks);
        let mut host = ComponentHost::new();
        assert!(!host.perform_click());

        host.set_id(Some(id(7)));
        host.set_node_info(Some(Arc::new(NodeInfo {
            click: Some(EventHandler::new(move |click: Click| sink.lock().push(click.output))),
            ..NodeInfo::default()
        })));
        assert!(host.perform_click());
        assert_eq!(*clicks.lock(), vec![id(7)]);
    }
}
