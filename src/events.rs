//! Events.
//!
//! Interaction events (clicks, touches, focus changes) are dispatched by component hosts and
//! views; visibility events are dispatched by the mount state as outputs enter and leave the
//! visible rectangle.

use crate::output::OutputId;
use crate::rect::Rect;
use cgmath::Point2;
use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;

/// List of event types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventTypeId {
    Click = 0,
    LongClick = 1,
    Touch = 2,
    FocusChange = 3,
    Visible = 4,
    Invisible = 5,
    Focused = 6,
    Unfocused = 7,
    FullImpression = 8,
}

pub trait EventType: fmt::Debug {
    fn type_id() -> EventTypeId;
}

macro_rules! impl_event_type {
    ($($t:tt),+) => {
        $(
            impl EventType for $t {
                fn type_id() -> EventTypeId {
                    EventTypeId::$t
                }
            }
        )+
    }
}

/// A click on a host or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Click {
    /// The output that was clicked.
    pub output: OutputId,
}

/// A long press on a host or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongClick {
    pub output: OutputId,
}

/// A touch, in the coordinate system of the host that received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touch {
    pub output: OutputId,
    pub location: Point2<i32>,
}

/// Focus gained or lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    pub output: OutputId,
    pub has_focus: bool,
}

/// An output started intersecting the visible rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible {
    pub output: OutputId,
    /// The part of the output that is visible.
    pub visible_bounds: Rect,
}

/// An output stopped intersecting the visible rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invisible {
    pub output: OutputId,
}

/// An output entered the focused range (see [`crate::visibility`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focused {
    pub output: OutputId,
}

/// An output left the focused range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unfocused {
    pub output: OutputId,
}

/// Every edge of an output has been visible at some point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullImpression {
    pub output: OutputId,
}

impl_event_type!(
    Click,
    LongClick,
    Touch,
    FocusChange,
    Visible,
    Invisible,
    Focused,
    Unfocused,
    FullImpression
);

/// A shared event callback.
///
/// Cloning a handler shares the callback. Two handlers are equal if they share the same callback.
pub struct EventHandler<Type>(Arc<Mutex<dyn FnMut(Type) + Send>>);

impl<T> Clone for EventHandler<T> {
    fn clone(&self) -> Self {
        EventHandler(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for EventHandler<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: EventType> EventHandler<T> {
    pub fn new<F: 'static + FnMut(T) + Send>(handler: F) -> Self {
        EventHandler(Arc::new(Mutex::new(handler)))
    }

    /// Calls the handler.
    pub fn dispatch(&self, event: T) {
        log::trace!("dispatching {:?}", event);
        let mut handler = self.0.lock();
        (&mut *handler)(event)
    }
}

impl<T: EventType> fmt::Debug for EventHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EventHandler<{:?}>", T::type_id())
    }
}
