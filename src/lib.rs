//! Declarative component trees, flattened into positioned outputs and mounted incrementally.
//!
//! # Conceptual overview
//!
//! ## Components
//! Components are immutable descriptions of what to render. Layout components compose other
//! components into a [`Node`] tree; mount components render into native content of their own
//! (a drawable or a view); nested tree components describe their children only once their exact
//! size is known. Components should be cheap to create and do nothing on their own beyond storing
//! their props.
//!
//! ## Layout
//! A layout pass resolves the root component into a node tree, carries over measurements from
//! the previous pass where nothing changed (the diff tree), hands the tree to a
//! [`LayoutEngine`] and flattens the result into a [`LayoutState`]: a list of
//! [`LayoutOutput`]s in mount order, each with an id that stays the same across passes as long
//! as the component stays at the same place in the tree.
//!
//! Outputs that need to receive input or carry view-only properties get a host, a view group
//! the outputs below them are mounted into.
//!
//! ## Mounting
//! A [`MountState`] keeps mounted content in sync with a layout state and a visible rectangle.
//! Only outputs that intersect the rectangle are mounted; scrolling vertically only visits the
//! outputs that crossed an edge. Content is taken from and returned to per-type pools, and
//! visibility events fire as outputs enter and leave the rectangle.
//!
//! [`ComponentTree`] puts the pieces together and can compute layout states on a background
//! thread.

pub mod arena;
pub mod builder;
pub mod color;
pub mod component;
pub mod component_tree;
pub mod context;
pub mod diff;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod layout_state;
pub mod logger;
pub mod mount_item;
pub mod mount_state;
pub mod node;
pub mod output;
pub mod pools;
pub mod rect;
pub mod size_spec;
#[doc(hidden)]
pub mod testing;
pub mod tree;
pub mod visibility;

pub use component::{Component, ComponentKind, ComponentSpec, MountType};
pub use component_tree::ComponentTree;
pub use context::{ComponentContext, ComponentsConfiguration, TreeProps};
pub use engine::{LayoutEngine, StackLayoutEngine};
pub use error::{Error, Result};
pub use layout_state::LayoutState;
pub use mount_state::MountState;
pub use node::Node;
pub use output::{LayoutOutput, OutputId};
pub use rect::Rect;
pub use size_spec::{Size, SizeSpec};
