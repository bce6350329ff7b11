//! Visibility event dispatch.
//!
//! Each visibility output that intersects the visible rectangle has an item tracking
//! which events it has already fired, so processing the same rectangle twice fires nothing.
//!
//! An output is *focused* when it covers at least half of the viewport, or, if the output is
//! smaller than half the viewport, when it is fully visible. Half the viewport is rounded down.

use crate::events::{Focused, FullImpression, Invisible, Unfocused, Visible};
use crate::layout_state::LayoutState;
use crate::node::VisibilityHandlers;
use crate::output::OutputId;
use crate::rect::Rect;
use bitflags::bitflags;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

bitflags! {
    /// Edges of an output that have been visible.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct SeenEdges: u8 {
        const LEFT = 1 << 0;
        const TOP = 1 << 1;
        const RIGHT = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

#[derive(Debug)]
struct VisibilityItem {
    handlers: Arc<VisibilityHandlers>,
    focused: bool,
    seen_edges: SeenEdges,
    full_impression_fired: bool,
}

impl VisibilityItem {
    fn leave(self, output: OutputId) {
        if self.focused {
            if let Some(handler) = &self.handlers.unfocused {
                handler.dispatch(Unfocused { output });
            }
        }
        if let Some(handler) = &self.handlers.invisible {
            handler.dispatch(Invisible { output });
        }
    }
}

/// Whether an output with `bounds`, of which `visible` is visible, counts as focused.
pub fn is_in_focused_range(viewport: Rect, bounds: Rect, visible: Rect) -> bool {
    let half_viewport = viewport.area() / 2;
    if bounds.area() >= half_viewport {
        visible.area() >= half_viewport
    } else {
        visible == bounds
    }
}

#[derive(Debug, Default)]
pub struct VisibilityTracker {
    items: HashMap<OutputId, VisibilityItem>,
}

impl VisibilityTracker {
    pub fn new() -> VisibilityTracker {
        VisibilityTracker::default()
    }

    /// Number of outputs currently considered visible.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_visible(&self, id: OutputId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn is_focused(&self, id: OutputId) -> bool {
        self.items.get(&id).map_or(false, |item| item.focused)
    }

    /// Fires visibility events for `layout_state` seen through `visible_rect`.
    pub fn process(&mut self, layout_state: &LayoutState, visible_rect: Rect) {
        let mut present = HashSet::with_capacity(layout_state.visibility_outputs().len());

        for output in layout_state.visibility_outputs() {
            let id = output.id();
            present.insert(id);
            let bounds = output.bounds();
            let visible = match bounds.intersect(visible_rect) {
                Some(visible) => visible,
                None => {
                    if let Some(item) = self.items.remove(&id) {
                        item.leave(id);
                    }
                    continue;
                }
            };

            let item = self.items.entry(id).or_insert_with(|| {
                if let Some(handler) = &output.handlers.visible {
                    handler.dispatch(Visible {
                        output: id,
                        visible_bounds: visible,
                    });
                }
                VisibilityItem {
                    handlers: Arc::clone(&output.handlers),
                    focused: false,
                    seen_edges: SeenEdges::empty(),
                    full_impression_fired: false,
                }
            });
            item.handlers = Arc::clone(&output.handlers);

            if item.handlers.focused.is_some() || item.handlers.unfocused.is_some() {
                let focused = is_in_focused_range(visible_rect, bounds, visible);
                if focused && !item.focused {
                    if let Some(handler) = &item.handlers.focused {
                        handler.dispatch(Focused { output: id });
                    }
                } else if !focused && item.focused {
                    if let Some(handler) = &item.handlers.unfocused {
                        handler.dispatch(Unfocused { output: id });
                    }
                }
                item.focused = focused;
            }

            if !item.full_impression_fired && item.handlers.full_impression.is_some() {
                let edges = [
                    (SeenEdges::LEFT, visible.left() == bounds.left()),
                    (SeenEdges::TOP, visible.top() == bounds.top()),
                    (SeenEdges::RIGHT, visible.right() == bounds.right()),
                    (SeenEdges::BOTTOM, visible.bottom() == bounds.bottom()),
                ];
                for (edge, seen) in edges {
                    if seen {
                        item.seen_edges.insert(edge);
                    }
                }
                if item.seen_edges.is_all() {
                    item.full_impression_fired = true;
                    if let Some(handler) = &item.handlers.full_impression {
                        handler.dispatch(FullImpression { output: id });
                    }
                }
            }
        }

        let gone: Vec<_> = self
            .items
            .keys()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        for id in gone {
            if let Some(item) = self.items.remove(&id) {
                item.leave(id);
            }
        }
    }

    /// Fires invisible events for everything still visible.
    pub fn clear(&mut self) {
        for (id, item) in self.items.drain() {
            item.leave(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_threshold_rounds_down() {
        // 10x5 viewport: half is 25
        let viewport = Rect::from_ltrb(0, 0, 10, 5);
        let big = Rect::from_ltrb(0, 0, 10, 8);
        assert!(is_in_focused_range(viewport, big, Rect::from_ltrb(0, 0, 10, 3)));
        assert!(!is_in_focused_range(viewport, big, Rect::from_ltrb(0, 0, 8, 3)));

        // 5x5 viewport: half of 25 rounds down to 12
        let viewport = Rect::from_ltrb(0, 0, 5, 5);
        let output = Rect::from_ltrb(0, 0, 4, 3);
        assert!(is_in_focused_range(viewport, output, Rect::from_ltrb(0, 0, 4, 3)));
        assert!(!is_in_focused_range(viewport, output, Rect::from_ltrb(0, 0, 4, 2)));
        let small = Rect::from_ltrb(0, 0, 3, 3);
        assert!(!is_in_focused_range(viewport, small, Rect::from_ltrb(0, 0, 3, 2)));
        assert!(is_in_focused_range(viewport, small, small));
    }
}
