//! Components, contents and a logger for exercising layout and mounting in tests.

use crate::component::{ComponentKind, MountType};
use crate::context::ComponentContext;
use crate::error::{Error, Result};
use crate::logger::{ComponentsLogger, PerfEvent, EVENT_MOUNT};
use crate::mount_item::{Content, MountContent};
use crate::node::Node;
use crate::rect::Rect;
use crate::size_spec::{Size, SizeSpec};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A shared call counter. Always compares equal, so it never makes two components differ.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> CallCounter {
        CallCounter::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl PartialEq for CallCounter {
    fn eq(&self, _: &CallCounter) -> bool {
        true
    }
}

impl fmt::Debug for CallCounter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CallCounter({})", self.get())
    }
}

/// Mount content that records what happened to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestContent {
    pub label: Option<String>,
    pub mount_count: usize,
    pub bind_count: usize,
    pub unbind_count: usize,
    pub unmount_count: usize,
    pub bounds: Rect,
    pub pressed: bool,
}

impl Content for TestContent {
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

fn mount_test_content(content: &mut MountContent, label: &str) {
    if let Some(content) = content.downcast_mut::<TestContent>() {
        content.label = Some(label.to_owned());
        content.mount_count += 1;
    }
}

fn unmount_test_content(content: &mut MountContent) {
    if let Some(content) = content.downcast_mut::<TestContent>() {
        content.label = None;
        content.unmount_count += 1;
    }
}

fn bind_test_content(content: &mut MountContent, bind: bool) {
    if let Some(content) = content.downcast_mut::<TestContent>() {
        if bind {
            content.bind_count += 1;
        } else {
            content.unbind_count += 1;
        }
    }
}

/// A drawable leaf that measures to a fixed size.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDrawableComponent {
    pub label: String,
    pub size: Size,
    /// Counts `on_measure` calls.
    pub measures: CallCounter,
}

impl TestDrawableComponent {
    pub fn new(label: impl Into<String>, width: i32, height: i32) -> TestDrawableComponent {
        TestDrawableComponent {
            label: label.into(),
            size: Size::new(width, height),
            measures: CallCounter::new(),
        }
    }

    pub fn with_counter(mut self, measures: CallCounter) -> TestDrawableComponent {
        self.measures = measures;
        self
    }
}

crate::impl_component! {
    TestDrawableComponent;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mount(MountType::Drawable)
    }

    fn can_measure(&self) -> bool {
        true
    }

    fn on_measure(&self, _c: &ComponentContext, width: SizeSpec, height: SizeSpec) -> Result<Size> {
        self.measures.increment();
        Ok(Size::new(width.resolve(self.size.x), height.resolve(self.size.y)))
    }

    fn create_mount_content(&self) -> Result<MountContent> {
        Ok(MountContent::Drawable(Box::new(TestContent::default())))
    }

    fn mount(&self, content: &mut MountContent) -> Result<()> {
        mount_test_content(content, &self.label);
        Ok(())
    }

    fn bind(&self, content: &mut MountContent) -> Result<()> {
        bind_test_content(content, true);
        Ok(())
    }

    fn unbind(&self, content: &mut MountContent) -> Result<()> {
        bind_test_content(content, false);
        Ok(())
    }

    fn unmount(&self, content: &mut MountContent) -> Result<()> {
        unmount_test_content(content);
        Ok(())
    }
}

/// A view leaf that measures to a fixed size and mounts [`TestContent`].
#[derive(Debug, Clone, PartialEq)]
pub struct TestViewComponent {
    pub label: String,
    pub size: Size,
}

impl TestViewComponent {
    pub fn new(label: impl Into<String>, width: i32, height: i32) -> TestViewComponent {
        TestViewComponent {
            label: label.into(),
            size: Size::new(width, height),
        }
    }
}

crate::impl_component! {
    TestViewComponent;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mount(MountType::View)
    }

    fn can_measure(&self) -> bool {
        true
    }

    fn on_measure(&self, _c: &ComponentContext, width: SizeSpec, height: SizeSpec) -> Result<Size> {
        Ok(Size::new(width.resolve(self.size.x), height.resolve(self.size.y)))
    }

    fn create_mount_content(&self) -> Result<MountContent> {
        Ok(MountContent::View(Box::new(TestContent::default())))
    }

    fn mount(&self, content: &mut MountContent) -> Result<()> {
        mount_test_content(content, &self.label);
        Ok(())
    }

    fn bind(&self, content: &mut MountContent) -> Result<()> {
        bind_test_content(content, true);
        Ok(())
    }

    fn unbind(&self, content: &mut MountContent) -> Result<()> {
        bind_test_content(content, false);
        Ok(())
    }

    fn unmount(&self, content: &mut MountContent) -> Result<()> {
        unmount_test_content(content);
        Ok(())
    }
}

type LayoutFn = dyn Fn(&ComponentContext) -> Result<Option<Node>> + Send + Sync;

/// A layout component built from a closure. Two instances are equal if their labels are.
#[derive(Clone)]
pub struct TestLayoutComponent {
    pub label: String,
    layout: Arc<LayoutFn>,
}

impl TestLayoutComponent {
    pub fn new<F>(label: impl Into<String>, layout: F) -> TestLayoutComponent
    where
        F: Fn(&ComponentContext) -> Result<Option<Node>> + Send + Sync + 'static,
    {
        TestLayoutComponent {
            label: label.into(),
            layout: Arc::new(layout),
        }
    }
}

impl PartialEq for TestLayoutComponent {
    fn eq(&self, other: &TestLayoutComponent) -> bool {
        self.label == other.label
    }
}

impl fmt::Debug for TestLayoutComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("TestLayoutComponent").field(&self.label).finish()
    }
}

crate::impl_component! {
    TestLayoutComponent;

    fn on_create_layout(&self, c: &ComponentContext) -> Result<Option<Node>> {
        (self.layout)(c)
    }
}

/// A nested tree component: a column with one drawable as wide as the width it is given and
/// `height` tall.
#[derive(Debug, Clone, PartialEq)]
pub struct TestNestedComponent {
    pub height: i32,
    /// Counts `on_create_layout_with_size_spec` calls.
    pub resolutions: CallCounter,
}

impl TestNestedComponent {
    pub fn new(height: i32) -> TestNestedComponent {
        TestNestedComponent {
            height,
            resolutions: CallCounter::new(),
        }
    }
}

crate::impl_component! {
    TestNestedComponent;

    fn kind(&self) -> ComponentKind {
        ComponentKind::NestedTree
    }

    fn on_create_layout_with_size_spec(
        &self,
        _c: &ComponentContext,
        width: SizeSpec,
        _height: SizeSpec,
    ) -> Result<Option<Node>> {
        self.resolutions.increment();
        Ok(Some(Node::column().child(
            Node::component(TestDrawableComponent::new("nested", width.resolve(0), self.height)),
        )))
    }
}

/// Which callback a [`FailingComponent`] fails in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailIn {
    Measure,
    Mount,
    Bind,
}

/// A drawable leaf whose callback returns an error.
#[derive(Debug, Clone, PartialEq)]
pub struct FailingComponent(pub FailIn);

impl FailingComponent {
    fn fail(&self, callback: &'static str) -> Error {
        Error::component("FailingComponent", callback, format!("{} failed on purpose", callback))
    }
}

crate::impl_component! {
    FailingComponent;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mount(MountType::Drawable)
    }

    fn can_measure(&self) -> bool {
        true
    }

    fn on_measure(&self, _c: &ComponentContext, width: SizeSpec, height: SizeSpec) -> Result<Size> {
        match self.0 {
            FailIn::Measure => Err(self.fail("on_measure")),
            _ => Ok(Size::new(width.resolve(1), height.resolve(1))),
        }
    }

    fn create_mount_content(&self) -> Result<MountContent> {
        Ok(MountContent::Drawable(Box::new(TestContent::default())))
    }

    fn mount(&self, _content: &mut MountContent) -> Result<()> {
        match self.0 {
            FailIn::Mount => Err(self.fail("mount")),
            _ => Ok(()),
        }
    }

    fn bind(&self, _content: &mut MountContent) -> Result<()> {
        match self.0 {
            FailIn::Bind => Err(self.fail("bind")),
            _ => Ok(()),
        }
    }
}

/// Records every event it receives.
#[derive(Debug, Default)]
pub struct SpyLogger {
    events: Mutex<Vec<PerfEvent>>,
}

impl SpyLogger {
    pub fn new() -> Arc<SpyLogger> {
        Arc::new(SpyLogger::default())
    }

    pub fn events(&self) -> Vec<PerfEvent> {
        self.events.lock().clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<PerfEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .cloned()
            .collect()
    }

    pub fn mount_events(&self) -> Vec<PerfEvent> {
        self.events_named(EVENT_MOUNT)
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ComponentsLogger for SpyLogger {
    fn log(&self, event: PerfEvent) {
        self.events.lock().push(event);
    }
}
