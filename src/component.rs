use crate::color::Drawable;
use crate::context::ComponentContext;
use crate::error::{Result, StructuralError};
use crate::host::ComponentHost;
use crate::mount_item::{DrawableContent, MountContent};
use crate::node::Node;
use crate::size_spec::{Size, SizeSpec};
use crate::tree::NodeTree;
use core::any::{Any, TypeId};
use core::fmt;
use parking_lot::{const_mutex, Mutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies a component type.
///
/// Ids are handed out process-wide in the order types are first seen, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LifecycleId(u32);

static LIFECYCLES: Mutex<Option<HashMap<TypeId, LifecycleId>>> = const_mutex(None);

impl LifecycleId {
    /// Returns the id for a component type, registering it if needed.
    pub fn of<T: Any>() -> LifecycleId {
        let mut registry = LIFECYCLES.lock();
        let registry = registry.get_or_insert_with(HashMap::new);
        let next = LifecycleId(registry.len() as u32 + 1);
        *registry.entry(TypeId::of::<T>()).or_insert(next)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// How a component contributes to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Composes other components in `on_create_layout`.
    Layout,
    /// A layout component whose children depend on its exact measured size; resolved lazily
    /// during measurement through `on_create_layout_with_size_spec`.
    NestedTree,
    /// Renders mount content of its own.
    Mount(MountType),
}

/// What kind of mount content a mount component renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountType {
    /// Drawn by its host; cannot receive input on its own.
    Drawable,
    /// A native view; receives input and applies its own background and padding.
    View,
}

/// Implements the boilerplate parts of [`ComponentSpec`] for a given struct.
///
/// Assumes that `PartialEq` is implemented; it is used as the default `should_update`.
///
/// Syntax:
///
/// ```text
/// impl_component! {
///     StructName;
///     (put the rest of the ComponentSpec methods here, using normal rust syntax)
/// }
/// ```
#[macro_export]
macro_rules! impl_component {
    (
        $(#[$attr:meta])*
        $struct:ty;
        $($extra:tt)*
    ) => {
        $(#[$attr])*
        impl $crate::ComponentSpec for $struct {
            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn name(&self) -> &'static str {
                stringify!($struct)
            }

            fn eq(&self, other: &dyn $crate::ComponentSpec) -> bool {
                if let Some(other) = other.as_any().downcast_ref::<$struct>() {
                    self == other
                } else {
                    false
                }
            }

            $($extra)*
        }
    };
}

/// Components are immutable descriptions of what to render.
///
/// They should be cheap to create: constructing one should do nothing beyond storing its props.
/// The framework asks a component for its layout (or its mount content) when a tree is resolved.
///
/// This trait should probably be implemented using the [`impl_component`] macro.
pub trait ComponentSpec: Any + fmt::Debug + Send + Sync {
    /// For downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Type name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Compares props with another component.
    fn eq(&self, other: &dyn ComponentSpec) -> bool;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Layout
    }

    /// Describes this component's subtree. `None` is a valid, empty subtree.
    fn on_create_layout(&self, c: &ComponentContext) -> Result<Option<Node>> {
        let _ = c;
        Err(self.missing_callback("on_create_layout"))
    }

    /// Describes the subtree of a [`ComponentKind::NestedTree`] component for known constraints.
    fn on_create_layout_with_size_spec(
        &self,
        c: &ComponentContext,
        width: SizeSpec,
        height: SizeSpec,
    ) -> Result<Option<Node>> {
        let _ = (c, width, height);
        Err(self.missing_callback("on_create_layout_with_size_spec"))
    }

    /// Whether a mount component measures its own content.
    fn can_measure(&self) -> bool {
        false
    }

    fn on_measure(&self, c: &ComponentContext, width: SizeSpec, height: SizeSpec) -> Result<Size> {
        let _ = (c, width, height);
        Err(self.missing_callback("on_measure"))
    }

    /// Creates fresh mount content when the pool for this type is empty.
    fn create_mount_content(&self) -> Result<MountContent> {
        Err(self.missing_callback("create_mount_content"))
    }

    /// Applies props to mount content.
    fn mount(&self, content: &mut MountContent) -> Result<()> {
        let _ = content;
        Ok(())
    }

    /// Called after `mount`, once the content is attached to its host.
    fn bind(&self, content: &mut MountContent) -> Result<()> {
        let _ = content;
        Ok(())
    }

    /// Reverses `bind`.
    fn unbind(&self, content: &mut MountContent) -> Result<()> {
        let _ = content;
        Ok(())
    }

    /// Reverses `mount`; content should be ready for reuse by another instance afterwards.
    fn unmount(&self, content: &mut MountContent) -> Result<()> {
        let _ = content;
        Ok(())
    }

    /// Whether mounted content must be refreshed when `self` replaces `previous`.
    fn should_update(&self, previous: &dyn ComponentSpec) -> bool {
        !self.eq(previous)
    }

    /// How many unmounted contents of this type to keep around. `None` uses the configured
    /// default.
    fn pool_size(&self) -> Option<usize> {
        None
    }

    #[doc(hidden)]
    fn missing_callback(&self, callback: &'static str) -> crate::error::Error {
        StructuralError::MissingCallback {
            component: self.name().to_owned(),
            callback,
        }
        .into()
    }
}

/// A nested tree resolved for one pair of size specs.
struct CachedNestedTree {
    width: SizeSpec,
    height: SizeSpec,
    tree: Arc<NodeTree>,
}

struct ComponentInner {
    spec: Box<dyn ComponentSpec>,
    lifecycle: LifecycleId,
    key: Option<String>,
    nested_tree: Mutex<Option<CachedNestedTree>>,
}

/// A shared handle to a component and its identity (type and key).
#[derive(Clone)]
pub struct Component(Arc<ComponentInner>);

impl Component {
    pub fn new<S: ComponentSpec>(spec: S) -> Component {
        Component::build(spec, None)
    }

    /// Creates a component with an explicit key; keys take part in output identity.
    pub fn keyed<S: ComponentSpec>(spec: S, key: impl Into<String>) -> Component {
        Component::build(spec, Some(key.into()))
    }

    fn build<S: ComponentSpec>(spec: S, key: Option<String>) -> Component {
        Component(Arc::new(ComponentInner {
            lifecycle: LifecycleId::of::<S>(),
            spec: Box::new(spec),
            key,
            nested_tree: Mutex::new(None),
        }))
    }

    pub fn spec(&self) -> &dyn ComponentSpec {
        &*self.0.spec
    }

    pub fn downcast_ref<S: ComponentSpec>(&self) -> Option<&S> {
        self.0.spec.as_any().downcast_ref::<S>()
    }

    pub fn lifecycle(&self) -> LifecycleId {
        self.0.lifecycle
    }

    pub fn key(&self) -> Option<&str> {
        self.0.key.as_deref()
    }

    pub fn kind(&self) -> ComponentKind {
        self.0.spec.kind()
    }

    pub fn mount_type(&self) -> Option<MountType> {
        match self.kind() {
            ComponentKind::Mount(ty) => Some(ty),
            _ => None,
        }
    }

    /// Type name and key, for diagnostics.
    pub fn describe(&self) -> String {
        match &self.0.key {
            Some(key) => format!("{}(key={:?})", self.0.spec.name(), key),
            None => self.0.spec.name().to_owned(),
        }
    }

    pub fn is_same_type(&self, other: &Component) -> bool {
        self.0.lifecycle == other.0.lifecycle
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether mounted content rendered for `previous` must be refreshed to show `next`.
    pub fn should_update(previous: &Component, next: &Component) -> bool {
        if previous.ptr_eq(next) {
            return false;
        }
        next.0.spec.should_update(&*previous.0.spec)
    }

    pub(crate) fn cached_nested_tree(
        &self,
        width: SizeSpec,
        height: SizeSpec,
    ) -> Option<Arc<NodeTree>> {
        let cached = self.0.nested_tree.lock();
        match &*cached {
            Some(cached) if cached.width == width && cached.height == height => {
                Some(Arc::clone(&cached.tree))
            }
            _ => None,
        }
    }

    pub(crate) fn set_cached_nested_tree(
        &self,
        width: SizeSpec,
        height: SizeSpec,
        tree: Arc<NodeTree>,
    ) {
        *self.0.nested_tree.lock() = Some(CachedNestedTree {
            width,
            height,
            tree,
        });
    }

    /// Drops the nested tree cached on this component, if any.
    pub fn invalidate_cached_layout(&self) {
        self.0.nested_tree.lock().take();
    }

    pub fn has_cached_layout(&self) -> bool {
        self.0.nested_tree.lock().is_some()
    }
}

impl<S: ComponentSpec> From<S> for Component {
    fn from(spec: S) -> Component {
        Component::new(spec)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Component")
            .field("lifecycle", &self.0.lifecycle)
            .field("key", &self.0.key)
            .field("spec", &self.0.spec)
            .finish()
    }
}

/// Mounts backgrounds, foregrounds and borders.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawableComponent {
    pub drawable: Drawable,
}

impl DrawableComponent {
    pub fn new(drawable: Drawable) -> DrawableComponent {
        DrawableComponent { drawable }
    }
}

impl_component! {
    DrawableComponent;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mount(MountType::Drawable)
    }

    fn create_mount_content(&self) -> Result<MountContent> {
        Ok(MountContent::Drawable(Box::new(DrawableContent::default())))
    }

    fn mount(&self, content: &mut MountContent) -> Result<()> {
        if let Some(drawable) = content.downcast_mut::<DrawableContent>() {
            drawable.drawable = Some(self.drawable.clone());
        }
        Ok(())
    }

    fn unmount(&self, content: &mut MountContent) -> Result<()> {
        if let Some(drawable) = content.downcast_mut::<DrawableContent>() {
            drawable.drawable = None;
        }
        Ok(())
    }
}

/// Mounts component hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostComponent;

impl_component! {
    HostComponent;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mount(MountType::View)
    }

    fn create_mount_content(&self) -> Result<MountContent> {
        Ok(MountContent::Host(ComponentHost::new()))
    }

    // hosts carry no props of their own; node info is applied by the mount state
    fn should_update(&self, _previous: &dyn ComponentSpec) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[derive(Debug, PartialEq)]
    struct Label(&'static str);
    impl_component! {
        Label;
        fn on_create_layout(&self, _c: &ComponentContext) -> Result<Option<Node>> {
            Ok(None)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Other;
    impl_component! { Other; }

    #[test]
    fn lifecycle_ids_are_per_type() {
        let a = Component::new(Label("a"));
        let b = Component::keyed(Label("b"), "b");
        let other = Component::new(Other);
        assert_eq!(a.lifecycle(), b.lifecycle());
        assert_ne!(a.lifecycle(), other.lifecycle());
        assert!(a.is_same_type(&b));
        assert_eq!(b.describe(), "Label(key=\"b\")");
        assert_eq!(LifecycleId::of::<Label>(), a.lifecycle());
    }

    #[test]
    fn should_update_compares_props() {
        let a = Component::new(Label("a"));
        assert!(!Component::should_update(&a, &a));
        assert!(!Component::should_update(&a, &Component::new(Label("a"))));
        assert!(Component::should_update(&a, &Component::new(Label("b"))));
        assert!(Component::should_update(&a, &Component::new(Other)));
    }

    #[test]
    fn missing_callbacks_are_structural_errors() {
        let err = Other
            .on_create_layout(&ComponentContext::new())
            .expect_err("Other has no layout");
        assert!(matches!(
            err,
            crate::Error::Structural(StructuralError::MissingCallback {
                callback: "on_create_layout",
                ..
            })
        ));
        let unspecified = SizeSpec::unspecified();
        assert!(Other
            .on_measure(&ComponentContext::new(), unspecified, unspecified)
            .is_err());
    }

    #[test]
    fn drawable_component_mounts_its_drawable() {
        let component = DrawableComponent::new(Color::WHITE.into());
        let mut content = component.create_mount_content().unwrap();
        component.mount(&mut content).unwrap();
        assert_eq!(
            content.downcast_ref::<DrawableContent>().unwrap().drawable,
            Some(Drawable::Color(Color::WHITE))
        );
        component.unmount(&mut content).unwrap();
        assert_eq!(content.downcast_ref::<DrawableContent>().unwrap().drawable, None);
    }
}
