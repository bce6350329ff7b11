//! Mountable outputs and their stable ids.
//!
//! An output id is a 64-bit value laid out as follows (most significant bits first):
//!
//! ```text
//! | key digest (22) | lifecycle id (16) | level (8) | output type (2) | sequence (16) |
//! ```
//!
//! The component field (key digest and lifecycle id) only depends on the component's type and
//! explicit key, and the level and sequence only on the tree's shape, so two trees that differ
//! only in props flatten to the same ids.

use crate::color::Drawable;
use crate::component::{Component, LifecycleId};
use crate::error::{Result, StructuralError};
use crate::node::{LayoutDirection, NodeInfo, VisibilityHandlers};
use crate::rect::{Edges, Rect};
use bitflags::bitflags;
use cgmath::Vector2;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const SEQUENCE_BITS: u32 = 16;
const TYPE_BITS: u32 = 2;
const LEVEL_BITS: u32 = 8;
const LIFECYCLE_BITS: u32 = 16;
const KEY_BITS: u32 = 22;

const TYPE_SHIFT: u32 = SEQUENCE_BITS;
const LEVEL_SHIFT: u32 = TYPE_SHIFT + TYPE_BITS;
const LIFECYCLE_SHIFT: u32 = LEVEL_SHIFT + LEVEL_BITS;
const KEY_SHIFT: u32 = LIFECYCLE_SHIFT + LIFECYCLE_BITS;

/// Deepest level an output may be emitted at.
pub const MAX_LEVEL: usize = (1 << LEVEL_BITS) - 1;
/// Highest sequence number per level, output type and component type.
pub const MAX_SEQUENCE: usize = (1 << SEQUENCE_BITS) - 1;
const MAX_LIFECYCLE: u32 = (1 << LIFECYCLE_BITS) - 1;

/// What an output renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputType {
    Content = 0,
    Background = 1,
    /// Foregrounds and borders.
    Foreground = 2,
    Host = 3,
}

impl OutputType {
    fn from_bits(bits: u64) -> OutputType {
        match bits & 0b11 {
            0 => OutputType::Content,
            1 => OutputType::Background,
            2 => OutputType::Foreground,
            _ => OutputType::Host,
        }
    }
}

/// Stable identity of a mountable output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputId(u64);

impl OutputId {
    /// The root host. Always mounted.
    pub const ROOT_HOST: OutputId = OutputId(0);

    pub const fn from_raw(raw: u64) -> OutputId {
        OutputId(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn level(self) -> usize {
        ((self.0 >> LEVEL_SHIFT) & MAX_LEVEL as u64) as usize
    }

    pub fn output_type(self) -> OutputType {
        OutputType::from_bits(self.0 >> TYPE_SHIFT)
    }

    pub fn sequence(self) -> usize {
        (self.0 & MAX_SEQUENCE as u64) as usize
    }

    pub fn lifecycle_bits(self) -> u32 {
        ((self.0 >> LIFECYCLE_SHIFT) & u64::from(MAX_LIFECYCLE)) as u32
    }

    pub fn key_digest(self) -> u32 {
        (self.0 >> KEY_SHIFT) as u32
    }

    /// The id without its sequence number.
    fn base(self) -> u64 {
        self.0 & !(MAX_SEQUENCE as u64)
    }
}

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if *self == OutputId::ROOT_HOST {
            return write!(f, "OutputId(root)");
        }
        write!(
            f,
            "OutputId({:x}/{:?}@{}#{})",
            self.0 >> LIFECYCLE_SHIFT,
            self.output_type(),
            self.level(),
            self.sequence()
        )
    }
}

/// FNV-1a, folded to the key field's width.
fn key_digest(key: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let folded = (hash ^ (hash >> KEY_BITS) ^ (hash >> (2 * KEY_BITS))) & ((1 << KEY_BITS) - 1);
    // zero is reserved for unkeyed components
    folded.max(1)
}

/// Hands out output ids during one flattening pass.
///
/// Sequence numbers count up per base id (component field, level and output type). An id from
/// the previous pass is reused when its sequence number hasn't been handed out yet.
#[derive(Debug, Default)]
pub(crate) struct IdCalculator {
    sequences: HashMap<u64, usize>,
}

impl IdCalculator {
    pub fn new() -> IdCalculator {
        IdCalculator::default()
    }

    pub fn calculate(
        &mut self,
        lifecycle: LifecycleId,
        key: Option<&str>,
        describe: impl Fn() -> String,
        level: usize,
        ty: OutputType,
        previous: Option<OutputId>,
    ) -> Result<OutputId> {
        if lifecycle.get() > MAX_LIFECYCLE {
            return Err(StructuralError::TooManyLifecycles {
                component: describe(),
                lifecycle: lifecycle.get(),
                max: MAX_LIFECYCLE,
            }
            .into());
        }
        if level > MAX_LEVEL {
            return Err(StructuralError::LevelOverflow {
                component: describe(),
                level,
                max: MAX_LEVEL,
            }
            .into());
        }

        let digest = key.map_or(0, key_digest);
        let base = (digest << KEY_SHIFT)
            | (u64::from(lifecycle.get()) << LIFECYCLE_SHIFT)
            | ((level as u64) << LEVEL_SHIFT)
            | ((ty as u64) << TYPE_SHIFT);

        let next = self.sequences.entry(base).or_insert(0);
        let sequence = match previous {
            Some(previous) if previous.base() == base && previous.sequence() >= *next => {
                previous.sequence()
            }
            _ => *next,
        };
        if sequence > MAX_SEQUENCE {
            return Err(StructuralError::SequenceOverflow {
                component: describe(),
                sequence,
                max: MAX_SEQUENCE,
            }
            .into());
        }
        *next = sequence + 1;

        Ok(OutputId(base | sequence as u64))
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OutputFlags: u8 {
        const DUPLICATE_PARENT_STATE = 1 << 0;
        const IS_HOST = 1 << 1;
        const IMPORTANT_FOR_ACCESSIBILITY = 1 << 2;
        const DUPLICATE_CHILDREN_STATES = 1 << 3;
    }
}

/// How an output relates to the output with the same id in the previous layout state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    /// No matching output was found, or nothing is known about it.
    #[default]
    Unknown,
    /// Same id and the component says nothing changed.
    Updated,
    /// Same id, but the mounted content has to be refreshed.
    Dirty,
}

/// Background, foreground and padding of an output that is mounted as a real view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewNodeInfo {
    pub background: Option<Drawable>,
    pub foreground: Option<Drawable>,
    pub padding: Edges,
    pub layout_direction: Option<LayoutDirection>,
}

impl ViewNodeInfo {
    pub fn is_empty(&self) -> bool {
        *self == ViewNodeInfo::default()
    }
}

/// One positioned, mountable unit of a layout state.
#[derive(Debug, Clone)]
pub struct LayoutOutput {
    pub(crate) id: OutputId,
    pub(crate) component: Component,
    pub(crate) bounds: Rect,
    pub(crate) host_translation: Vector2<i32>,
    pub(crate) host_marker: OutputId,
    pub(crate) flags: OutputFlags,
    pub(crate) node_info: Option<Arc<NodeInfo>>,
    pub(crate) view_node_info: Option<Arc<ViewNodeInfo>>,
    pub(crate) update_state: UpdateState,
    /// The previous pass's component `update_state` was computed against.
    pub(crate) diff_component: Option<Component>,
    pub(crate) touch_expansion: Option<Edges>,
}

impl LayoutOutput {
    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Absolute bounds in the root host's coordinate space.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Bounds relative to the output's host.
    pub fn mount_bounds(&self) -> Rect {
        self.bounds - self.host_translation
    }

    /// The host this output is mounted into.
    pub fn host_marker(&self) -> OutputId {
        self.host_marker
    }

    pub fn flags(&self) -> OutputFlags {
        self.flags
    }

    pub fn is_host(&self) -> bool {
        self.flags.contains(OutputFlags::IS_HOST)
    }

    pub fn node_info(&self) -> Option<&NodeInfo> {
        self.node_info.as_deref()
    }

    pub fn view_node_info(&self) -> Option<&ViewNodeInfo> {
        self.view_node_info.as_deref()
    }

    pub fn update_state(&self) -> UpdateState {
        self.update_state
    }

    /// Whether `update_state` describes a change from `mounted`. It does only if `mounted` is
    /// the very component the previous pass produced.
    pub fn is_diffed_against(&self, mounted: &Component) -> bool {
        self.diff_component
            .as_ref()
            .map_or(false, |previous| previous.ptr_eq(mounted))
    }

    pub fn touch_expansion(&self) -> Option<Edges> {
        self.touch_expansion
    }
}

/// A region that fires visibility events.
#[derive(Debug, Clone)]
pub struct VisibilityOutput {
    pub(crate) id: OutputId,
    pub(crate) component: Option<Component>,
    pub(crate) bounds: Rect,
    pub(crate) handlers: Arc<VisibilityHandlers>,
}

impl VisibilityOutput {
    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn component(&self) -> Option<&Component> {
        self.component.as_ref()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn handlers(&self) -> &VisibilityHandlers {
        &self.handlers
    }
}
