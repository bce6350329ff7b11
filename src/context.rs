//! The ambient environment threaded through layout calculation and mounting.

use crate::logger::{ComponentsLogger, PerfEvent};
use crate::pools::Pools;
use crate::size_spec::SizeSpec;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Behavior switches. Passed explicitly; there is no global configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentsConfiguration {
    /// Only mount outputs that intersect the visible rectangle.
    pub incremental_mount: bool,
    /// Dispatch visibility events after mounting.
    pub process_visibility_outputs: bool,
    /// Reuse measurements from the previous layout state's diff tree.
    pub use_diff_tree: bool,
    /// Hand backgrounds and foregrounds to the node's host view instead of emitting drawable
    /// outputs for them. Nodes with either get a host.
    pub drawables_in_host_view: bool,
    /// Mount contents kept per component type when a component doesn't set its own pool size.
    pub mount_pool_size: usize,
    /// Released layout nodes kept for reuse.
    pub layout_node_pool_size: usize,
}

impl Default for ComponentsConfiguration {
    fn default() -> Self {
        ComponentsConfiguration {
            incremental_mount: true,
            process_visibility_outputs: true,
            use_diff_tree: true,
            drawables_in_host_view: false,
            mount_pool_size: 3,
            layout_node_pool_size: 256,
        }
    }
}

/// Values propagated down the tree without passing them through every component's props.
#[derive(Clone, Default)]
pub struct TreeProps {
    props: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TreeProps {
    pub fn new() -> TreeProps {
        TreeProps::default()
    }

    pub fn put<T: Any + Send + Sync>(&mut self, value: T) {
        self.props.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.props
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

impl fmt::Debug for TreeProps {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TreeProps({} entries)", self.props.len())
    }
}

/// A component's view of its environment.
///
/// Cheap to clone; everything shared is behind an `Arc`.
#[derive(Clone)]
pub struct ComponentContext {
    config: ComponentsConfiguration,
    logger: Option<Arc<dyn ComponentsLogger>>,
    log_tag: Option<String>,
    tree_props: TreeProps,
    pools: Arc<Pools>,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
}

impl Default for ComponentContext {
    fn default() -> Self {
        ComponentContext::new()
    }
}

impl ComponentContext {
    /// Creates a context with the default configuration and the process-wide pools.
    pub fn new() -> ComponentContext {
        ComponentContext {
            config: ComponentsConfiguration::default(),
            logger: None,
            log_tag: None,
            tree_props: TreeProps::new(),
            pools: Pools::global(),
            width_spec: SizeSpec::unspecified(),
            height_spec: SizeSpec::unspecified(),
        }
    }

    pub fn with_config(mut self, config: ComponentsConfiguration) -> Self {
        self.config = config;
        self
    }

    pub fn with_logger(
        mut self,
        logger: Arc<dyn ComponentsLogger>,
        log_tag: Option<String>,
    ) -> Self {
        self.logger = Some(logger);
        self.log_tag = log_tag;
        self
    }

    pub fn with_tree_props(mut self, tree_props: TreeProps) -> Self {
        self.tree_props = tree_props;
        self
    }

    /// Uses a private set of pools instead of the process-wide ones.
    pub fn with_pools(mut self, pools: Arc<Pools>) -> Self {
        self.pools = pools;
        self
    }

    /// Returns a copy of this context for a tree measured under the given constraints.
    pub fn with_size_specs(&self, width_spec: SizeSpec, height_spec: SizeSpec) -> Self {
        let mut context = self.clone();
        context.width_spec = width_spec;
        context.height_spec = height_spec;
        context
    }

    pub fn config(&self) -> &ComponentsConfiguration {
        &self.config
    }

    pub fn logger(&self) -> Option<&Arc<dyn ComponentsLogger>> {
        self.logger.as_ref()
    }

    pub fn log_tag(&self) -> Option<&str> {
        self.log_tag.as_deref()
    }

    pub fn tree_props(&self) -> &TreeProps {
        &self.tree_props
    }

    pub fn tree_prop<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.tree_props.get::<T>()
    }

    pub fn pools(&self) -> &Arc<Pools> {
        &self.pools
    }

    pub fn width_spec(&self) -> SizeSpec {
        self.width_spec
    }

    pub fn height_spec(&self) -> SizeSpec {
        self.height_spec
    }

    /// Sends an event to the logger, if there is one and it wants this event.
    pub(crate) fn log(&self, name: &'static str, event: impl FnOnce() -> PerfEvent) {
        if let Some(logger) = &self.logger {
            if logger.is_tracing(name) {
                let mut event = event();
                if let Some(tag) = &self.log_tag {
                    event = event.with_text(crate::logger::PARAM_LOG_TAG, tag.clone());
                }
                logger.log(event);
            }
        }
    }
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("config", &self.config)
            .field("has_logger", &self.logger.is_some())
            .field("log_tag", &self.log_tag)
            .field("tree_props", &self.tree_props)
            .field("width_spec", &self.width_spec)
            .field("height_spec", &self.height_spec)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Theme(&'static str);

    #[test]
    fn tree_props_are_typed() {
        let mut props = TreeProps::new();
        props.put(Theme("dark"));
        props.put(42u32);
        let context = ComponentContext::new().with_tree_props(props);
        assert_eq!(context.tree_prop::<Theme>(), Some(&Theme("dark")));
        assert_eq!(context.tree_prop::<u32>(), Some(&42));
        assert_eq!(context.tree_prop::<i64>(), None);
    }

    #[test]
    fn size_specs_are_per_copy() {
        let context = ComponentContext::new();
        let sized = context.with_size_specs(SizeSpec::exactly(10), SizeSpec::at_most(20));
        assert_eq!(sized.width_spec(), SizeSpec::exactly(10));
        assert_eq!(context.width_spec(), SizeSpec::unspecified());
    }
}
