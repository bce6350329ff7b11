//! Layout descriptions returned from `on_create_layout`.
//!
//! A [`Node`] is a builder: setters record the property and flip its bit in [`StyleBits`], so
//! later stages can tell an explicit value from a default one. Conflicting setters are recorded
//! and reported when the tree is built.

use crate::color::{Color, Drawable};
use crate::component::Component;
use crate::events::{
    Click, EventHandler, FocusChange, Focused, FullImpression, Invisible, LongClick, Touch,
    Unfocused, Visible,
};
use crate::rect::Edges;
use bitflags::bitflags;
use cgmath::Point2;

bitflags! {
    /// Which style properties have been set explicitly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleBits: u32 {
        const WIDTH = 1 << 0;
        const HEIGHT = 1 << 1;
        const WIDTH_PERCENT = 1 << 2;
        const HEIGHT_PERCENT = 1 << 3;
        const PADDING = 1 << 4;
        const MARGIN = 1 << 5;
        const POSITION = 1 << 6;
        const FLEX_GROW = 1 << 7;
        const BACKGROUND = 1 << 8;
        const FOREGROUND = 1 << 9;
        const BORDER = 1 << 10;
        const LAYOUT_DIRECTION = 1 << 11;
        const WRAP_IN_VIEW = 1 << 12;
        const DUPLICATE_PARENT_STATE = 1 << 13;
        const DUPLICATE_CHILDREN_STATES = 1 << 14;
        const TRANSITION_KEY = 1 << 15;
        const TOUCH_EXPANSION = 1 << 16;
        const ACCESSIBILITY = 1 << 17;

        /// Properties that may only be set on the root of a tree.
        const ROOT_ONLY = Self::LAYOUT_DIRECTION.bits();
    }
}

/// Main axis of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlexDirection {
    #[default]
    Column,
    Row,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutDirection {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accessibility {
    #[default]
    Auto,
    Yes,
    No,
    NoHideDescendants,
}

/// Resolved style properties of a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub direction: FlexDirection,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub width_percent: Option<f32>,
    pub height_percent: Option<f32>,
    pub padding: Edges,
    pub margin: Edges,
    /// Absolute position inside the parent's padding box.
    pub position: Option<Point2<i32>>,
    pub flex_grow: f32,
    pub background: Option<Drawable>,
    pub foreground: Option<Drawable>,
    pub border: Option<Drawable>,
    pub layout_direction: Option<LayoutDirection>,
    pub wrap_in_view: bool,
    pub duplicate_parent_state: bool,
    pub duplicate_children_states: bool,
    pub transition_key: Option<String>,
    pub touch_expansion: Edges,
    pub accessibility: Accessibility,
}

impl Style {
    /// Copies every property set in `bits` from `other`.
    pub(crate) fn merge_from(&mut self, other: &Style, bits: StyleBits) {
        macro_rules! copy_if_set {
            ($($bit:ident => $($field:ident),+;)+) => {
                $(
                    if bits.contains(StyleBits::$bit) {
                        $(self.$field = other.$field.clone();)+
                    }
                )+
            };
        }
        copy_if_set! {
            WIDTH => width;
            HEIGHT => height;
            WIDTH_PERCENT => width_percent;
            HEIGHT_PERCENT => height_percent;
            PADDING => padding;
            MARGIN => margin;
            POSITION => position;
            FLEX_GROW => flex_grow;
            BACKGROUND => background;
            FOREGROUND => foreground;
            BORDER => border;
            LAYOUT_DIRECTION => layout_direction;
            WRAP_IN_VIEW => wrap_in_view;
            DUPLICATE_PARENT_STATE => duplicate_parent_state;
            DUPLICATE_CHILDREN_STATES => duplicate_children_states;
            TRANSITION_KEY => transition_key;
            TOUCH_EXPANSION => touch_expansion;
            ACCESSIBILITY => accessibility;
        }
    }

    /// Compares only the properties that affect measurement.
    pub(crate) fn measures_like(&self, other: &Style) -> bool {
        self.direction == other.direction
            && self.width == other.width
            && self.height == other.height
            && self.width_percent == other.width_percent
            && self.height_percent == other.height_percent
            && self.padding == other.padding
            && self.margin == other.margin
            && self.position == other.position
            && self.flex_grow == other.flex_grow
            && self.layout_direction == other.layout_direction
    }
}

/// Interaction handlers and accessibility data of a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInfo {
    pub click: Option<EventHandler<Click>>,
    pub long_click: Option<EventHandler<LongClick>>,
    pub touch: Option<EventHandler<Touch>>,
    pub focus_change: Option<EventHandler<FocusChange>>,
    pub content_description: Option<String>,
    pub focusable: bool,
}

impl NodeInfo {
    pub fn is_empty(&self) -> bool {
        *self == NodeInfo::default()
    }

    /// Whether this info needs a view to receive input.
    pub fn needs_view(&self) -> bool {
        self.click.is_some()
            || self.long_click.is_some()
            || self.touch.is_some()
            || self.focus_change.is_some()
            || self.content_description.is_some()
            || self.focusable
    }

    /// Fills in everything `other` sets.
    pub(crate) fn merge_from(&mut self, other: &NodeInfo) {
        macro_rules! take_some {
            ($($field:ident),+) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )+
            };
        }
        take_some!(click, long_click, touch, focus_change, content_description);
        self.focusable |= other.focusable;
    }
}

/// Visibility callbacks of a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityHandlers {
    pub visible: Option<EventHandler<Visible>>,
    pub invisible: Option<EventHandler<Invisible>>,
    pub focused: Option<EventHandler<Focused>>,
    pub unfocused: Option<EventHandler<Unfocused>>,
    pub full_impression: Option<EventHandler<FullImpression>>,
}

impl VisibilityHandlers {
    pub fn is_empty(&self) -> bool {
        *self == VisibilityHandlers::default()
    }

    pub(crate) fn merge_from(&mut self, other: &VisibilityHandlers) {
        macro_rules! take_some {
            ($($field:ident),+) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )+
            };
        }
        take_some!(visible, invisible, focused, unfocused, full_impression);
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeSource {
    /// A container laying out its children along a main axis.
    Container,
    /// Resolved by asking the component for its own layout.
    Component(Component),
}

/// A description of one layout node and its children.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) source: NodeSource,
    pub(crate) style: Style,
    pub(crate) bits: StyleBits,
    pub(crate) node_info: NodeInfo,
    pub(crate) visibility: VisibilityHandlers,
    pub(crate) children: Vec<Node>,
    pub(crate) conflict: Option<(&'static str, &'static str)>,
}

impl Node {
    fn with_source(source: NodeSource, direction: FlexDirection) -> Node {
        Node {
            source,
            style: Style {
                direction,
                ..Style::default()
            },
            bits: StyleBits::empty(),
            node_info: NodeInfo::default(),
            visibility: VisibilityHandlers::default(),
            children: Vec::new(),
            conflict: None,
        }
    }

    /// A container stacking its children vertically.
    pub fn column() -> Node {
        Node::with_source(NodeSource::Container, FlexDirection::Column)
    }

    /// A container stacking its children horizontally.
    pub fn row() -> Node {
        Node::with_source(NodeSource::Container, FlexDirection::Row)
    }

    /// A node resolved from a component. Style set on this node overrides the component's own.
    pub fn component(component: impl Into<Component>) -> Node {
        Node::with_source(NodeSource::Component(component.into()), FlexDirection::Column)
    }

    pub fn child(mut self, child: impl Into<Node>) -> Node {
        if let NodeSource::Component(_) = self.source {
            self.record_conflict("child", "component");
        }
        self.children.push(child.into());
        self
    }

    pub fn children<I: IntoIterator<Item = Node>>(mut self, children: I) -> Node {
        for child in children {
            self = self.child(child);
        }
        self
    }

    fn set(&mut self, bit: StyleBits) {
        self.bits.insert(bit);
    }

    fn record_conflict(&mut self, property: &'static str, conflicts_with: &'static str) {
        if self.conflict.is_none() {
            self.conflict = Some((property, conflicts_with));
        }
    }

    pub fn width(mut self, width: i32) -> Node {
        if self.bits.contains(StyleBits::WIDTH_PERCENT) {
            self.record_conflict("width", "width_percent");
        }
        self.style.width = Some(width);
        self.set(StyleBits::WIDTH);
        self
    }

    pub fn height(mut self, height: i32) -> Node {
        if self.bits.contains(StyleBits::HEIGHT_PERCENT) {
            self.record_conflict("height", "height_percent");
        }
        self.style.height = Some(height);
        self.set(StyleBits::HEIGHT);
        self
    }

    pub fn width_percent(mut self, percent: f32) -> Node {
        if self.bits.contains(StyleBits::WIDTH) {
            self.record_conflict("width_percent", "width");
        }
        self.style.width_percent = Some(percent);
        self.set(StyleBits::WIDTH_PERCENT);
        self
    }

    pub fn height_percent(mut self, percent: f32) -> Node {
        if self.bits.contains(StyleBits::HEIGHT) {
            self.record_conflict("height_percent", "height");
        }
        self.style.height_percent = Some(percent);
        self.set(StyleBits::HEIGHT_PERCENT);
        self
    }

    pub fn size(self, width: i32, height: i32) -> Node {
        self.width(width).height(height)
    }

    pub fn padding(mut self, padding: Edges) -> Node {
        self.style.padding = padding;
        self.set(StyleBits::PADDING);
        self
    }

    pub fn margin(mut self, margin: Edges) -> Node {
        self.style.margin = margin;
        self.set(StyleBits::MARGIN);
        self
    }

    /// Takes the node out of the flow and places it at `(x, y)` in the parent's padding box.
    pub fn position(mut self, x: i32, y: i32) -> Node {
        if self.style.flex_grow != 0. {
            self.record_conflict("position", "flex_grow");
        }
        self.style.position = Some(Point2::new(x, y));
        self.set(StyleBits::POSITION);
        self
    }

    pub fn flex_grow(mut self, grow: f32) -> Node {
        if self.bits.contains(StyleBits::POSITION) {
            self.record_conflict("flex_grow", "position");
        }
        self.style.flex_grow = grow;
        self.set(StyleBits::FLEX_GROW);
        self
    }

    pub fn background(mut self, background: impl Into<Drawable>) -> Node {
        self.style.background = Some(background.into());
        self.set(StyleBits::BACKGROUND);
        self
    }

    pub fn foreground(mut self, foreground: impl Into<Drawable>) -> Node {
        self.style.foreground = Some(foreground.into());
        self.set(StyleBits::FOREGROUND);
        self
    }

    pub fn border(mut self, widths: Edges, color: Color) -> Node {
        self.style.border = Some(Drawable::Border { widths, color });
        self.set(StyleBits::BORDER);
        self
    }

    /// Only valid on the root node of a tree.
    pub fn layout_direction(mut self, direction: LayoutDirection) -> Node {
        self.style.layout_direction = Some(direction);
        self.set(StyleBits::LAYOUT_DIRECTION);
        self
    }

    /// Forces this node into its own host view.
    pub fn wrap_in_view(mut self) -> Node {
        self.style.wrap_in_view = true;
        self.set(StyleBits::WRAP_IN_VIEW);
        self
    }

    pub fn duplicate_parent_state(mut self, duplicate: bool) -> Node {
        self.style.duplicate_parent_state = duplicate;
        self.set(StyleBits::DUPLICATE_PARENT_STATE);
        self
    }

    pub fn duplicate_children_states(mut self, duplicate: bool) -> Node {
        self.style.duplicate_children_states = duplicate;
        self.set(StyleBits::DUPLICATE_CHILDREN_STATES);
        self
    }

    pub fn transition_key(mut self, key: impl Into<String>) -> Node {
        self.style.transition_key = Some(key.into());
        self.set(StyleBits::TRANSITION_KEY);
        self
    }

    /// Grows the touchable area of this node inside its host.
    pub fn touch_expansion(mut self, expansion: Edges) -> Node {
        self.style.touch_expansion = expansion;
        self.set(StyleBits::TOUCH_EXPANSION);
        self
    }

    pub fn important_for_accessibility(mut self, accessibility: Accessibility) -> Node {
        self.style.accessibility = accessibility;
        self.set(StyleBits::ACCESSIBILITY);
        self
    }

    pub fn click_handler(mut self, handler: EventHandler<Click>) -> Node {
        self.node_info.click = Some(handler);
        self
    }

    pub fn long_click_handler(mut self, handler: EventHandler<LongClick>) -> Node {
        self.node_info.long_click = Some(handler);
        self
    }

    pub fn touch_handler(mut self, handler: EventHandler<Touch>) -> Node {
        self.node_info.touch = Some(handler);
        self
    }

    pub fn focus_change_handler(mut self, handler: EventHandler<FocusChange>) -> Node {
        self.node_info.focus_change = Some(handler);
        self
    }

    pub fn focusable(mut self, focusable: bool) -> Node {
        self.node_info.focusable = focusable;
        self
    }

    pub fn content_description(mut self, description: impl Into<String>) -> Node {
        self.node_info.content_description = Some(description.into());
        self
    }

    pub fn visible_handler(mut self, handler: EventHandler<Visible>) -> Node {
        self.visibility.visible = Some(handler);
        self
    }

    pub fn invisible_handler(mut self, handler: EventHandler<Invisible>) -> Node {
        self.visibility.invisible = Some(handler);
        self
    }

    pub fn focused_handler(mut self, handler: EventHandler<Focused>) -> Node {
        self.visibility.focused = Some(handler);
        self
    }

    pub fn unfocused_handler(mut self, handler: EventHandler<Unfocused>) -> Node {
        self.visibility.unfocused = Some(handler);
        self
    }

    pub fn full_impression_handler(mut self, handler: EventHandler<FullImpression>) -> Node {
        self.visibility.full_impression = Some(handler);
        self
    }
}

impl From<Component> for Node {
    fn from(component: Component) -> Node {
        Node::component(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_flip_bits() {
        let node = Node::column().width(10).padding(Edges::all(2));
        assert!(node.bits.contains(StyleBits::WIDTH | StyleBits::PADDING));
        assert!(!node.bits.contains(StyleBits::HEIGHT));
        assert_eq!(node.conflict, None);
    }

    #[test]
    fn conflicts_are_recorded_once() {
        let node = Node::row().width(10).width_percent(50.).height_percent(10.).height(3);
        assert_eq!(node.conflict, Some(("width_percent", "width")));
    }

    #[test]
    fn merge_only_copies_set_properties() {
        let mut base = Style {
            width: Some(10),
            padding: Edges::all(1),
            ..Style::default()
        };
        let overrides = Node::column().padding(Edges::all(4));
        base.merge_from(&overrides.style, overrides.bits);
        assert_eq!(base.width, Some(10));
        assert_eq!(base.padding, Edges::all(4));
    }

    #[test]
    fn measure_relevance() {
        let a = Style::default();
        let mut b = a.clone();
        b.background = Some(Color::BLACK.into());
        assert!(a.measures_like(&b), "backgrounds don't change measurement");
        b.padding = Edges::all(1);
        assert!(!a.measures_like(&b));
    }
}
