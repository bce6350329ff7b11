//! Mount content and mounted items.

use crate::color::Drawable;
use crate::component::{Component, MountType};
use crate::host::ComponentHost;
use crate::node::NodeInfo;
use crate::output::{OutputFlags, OutputId, ViewNodeInfo};
use crate::rect::Rect;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Native content a mount component renders into.
///
/// Implementations stand in for whatever the hosting layer draws with. The default methods
/// ignore everything, so simple content only has to implement the downcasting pair.
pub trait Content: Any + Send + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Bounds relative to the host the content is mounted in.
    fn set_bounds(&mut self, bounds: Rect) {
        let _ = bounds;
    }

    /// Pressed state copied from the host (duplicate parent state).
    fn set_pressed(&mut self, pressed: bool) {
        let _ = pressed;
    }

    /// Background, foreground and padding for view content.
    fn apply_view_node_info(&mut self, info: Option<&ViewNodeInfo>) {
        let _ = info;
    }

    /// Handlers for view content that receives input without a host.
    fn apply_node_info(&mut self, info: Option<&NodeInfo>) {
        let _ = info;
    }
}

/// Content acquired from a component's pool.
#[derive(Debug)]
pub enum MountContent {
    Drawable(Box<dyn Content>),
    View(Box<dyn Content>),
    Host(ComponentHost),
}

impl MountContent {
    pub fn mount_type(&self) -> MountType {
        match self {
            MountContent::Drawable(_) => MountType::Drawable,
            MountContent::View(_) | MountContent::Host(_) => MountType::View,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            MountContent::Drawable(content) | MountContent::View(content) => {
                content.as_any().downcast_ref()
            }
            MountContent::Host(host) => (host as &dyn Any).downcast_ref(),
        }
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            MountContent::Drawable(content) | MountContent::View(content) => {
                content.as_any_mut().downcast_mut()
            }
            MountContent::Host(host) => (host as &mut dyn Any).downcast_mut(),
        }
    }

    pub fn as_host(&self) -> Option<&ComponentHost> {
        match self {
            MountContent::Host(host) => Some(host),
            _ => None,
        }
    }

    pub fn as_host_mut(&mut self) -> Option<&mut ComponentHost> {
        match self {
            MountContent::Host(host) => Some(host),
            _ => None,
        }
    }

    pub(crate) fn set_bounds(&mut self, bounds: Rect) {
        match self {
            MountContent::Drawable(content) | MountContent::View(content) => {
                content.set_bounds(bounds)
            }
            MountContent::Host(host) => host.set_bounds(bounds),
        }
    }

    pub(crate) fn set_pressed(&mut self, pressed: bool) {
        match self {
            MountContent::Drawable(content) | MountContent::View(content) => {
                content.set_pressed(pressed)
            }
            MountContent::Host(host) => host.set_pressed_state(pressed),
        }
    }

    pub(crate) fn apply_info(
        &mut self,
        node_info: Option<&Arc<NodeInfo>>,
        view_node_info: Option<&Arc<ViewNodeInfo>>,
    ) {
        match self {
            MountContent::Drawable(_) => (),
            MountContent::View(content) => {
                content.apply_node_info(node_info.map(|info| &**info));
                content.apply_view_node_info(view_node_info.map(|info| &**info));
            }
            MountContent::Host(host) => {
                host.set_node_info(node_info.cloned());
                host.set_view_node_info(view_node_info.cloned());
            }
        }
    }
}

/// Content for [`DrawableComponent`](crate::component::DrawableComponent).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawableContent {
    pub drawable: Option<Drawable>,
    pub bounds: Rect,
    pub pressed: bool,
}

impl Content for DrawableContent {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }
}

/// One mounted output.
#[derive(Debug)]
pub struct MountItem {
    pub(crate) id: OutputId,
    pub(crate) index: usize,
    pub(crate) component: Component,
    pub(crate) content: MountContent,
    pub(crate) host: OutputId,
    pub(crate) flags: OutputFlags,
    pub(crate) node_info: Option<Arc<NodeInfo>>,
    pub(crate) view_node_info: Option<Arc<ViewNodeInfo>>,
    pub(crate) bounds: Rect,
}

impl MountItem {
    pub fn id(&self) -> OutputId {
        self.id
    }

    /// Position of the output in the layout state it was last mounted from.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn content(&self) -> &MountContent {
        &self.content
    }

    pub fn host(&self) -> OutputId {
        self.host
    }

    pub fn flags(&self) -> OutputFlags {
        self.flags
    }

    /// Bounds relative to the host.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}
