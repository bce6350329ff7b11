use parking_lot::Mutex;
use roost::component::LifecycleId;
use roost::events::{EventHandler, Focused, FullImpression, Invisible, Unfocused, Visible};
use roost::logger::{PARAM_MOUNTED_COUNT, PARAM_UNMOUNTED_COUNT};
use roost::pools::Pools;
use roost::testing::{
    FailIn, FailingComponent, SpyLogger, TestContent, TestDrawableComponent, TestLayoutComponent,
    TestViewComponent,
};
use roost::{
    Component, ComponentContext, Error, LayoutState, MountState, Node, Rect, SizeSpec,
    StackLayoutEngine,
};
use std::sync::Arc;

type Log = Arc<Mutex<Vec<String>>>;

fn calculate(c: &ComponentContext, component: &Component) -> LayoutState {
    LayoutState::calculate(
        c,
        component,
        SizeSpec::exactly(10),
        SizeSpec::unspecified(),
        None,
        &StackLayoutEngine,
    )
    .unwrap()
}

/// A 10x10 drawable that records its visibility events as "<name> <event>".
fn watched(name: &'static str, log: &Log) -> Node {
    let record = |event: &'static str| {
        let log = Arc::clone(log);
        move || log.lock().push(format!("{} {}", name, event))
    };
    let (visible, invisible, focused, unfocused, full) = (
        record("visible"),
        record("invisible"),
        record("focused"),
        record("unfocused"),
        record("full_impression"),
    );
    Node::component(TestDrawableComponent::new(name, 10, 10))
        .visible_handler(EventHandler::new(move |_: Visible| visible()))
        .invisible_handler(EventHandler::new(move |_: Invisible| invisible()))
        .focused_handler(EventHandler::new(move |_: Focused| focused()))
        .unfocused_handler(EventHandler::new(move |_: Unfocused| unfocused()))
        .full_impression_handler(EventHandler::new(move |_: FullImpression| full()))
}

fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock())
}

#[test]
fn visibility_events_follow_the_visible_rect() {
    let log: Log = Arc::default();
    let component = {
        let log = Arc::clone(&log);
        Component::new(TestLayoutComponent::new("watched", move |_| {
            Ok(Some(Node::column().child(watched("a", &log)).child(watched("b", &log))))
        }))
    };
    let c = ComponentContext::new().with_pools(Arc::new(Pools::new()));
    let state = calculate(&c, &component);
    assert_eq!(state.visibility_outputs().len(), 2);
    let mut mount = MountState::new(c);

    mount.mount(&state, Rect::from_ltrb(0, 0, 10, 10)).unwrap();
    assert_eq!(drain(&log), vec!["a visible", "a focused", "a full_impression"]);

    // processing the same rectangle again fires nothing
    mount.mount(&state, Rect::from_ltrb(0, 0, 10, 10)).unwrap();
    assert!(drain(&log).is_empty());

    // half of each: both cover half the viewport
    mount.mount(&state, Rect::from_ltrb(0, 5, 10, 15)).unwrap();
    assert_eq!(drain(&log), vec!["b visible", "b focused"]);

    mount.mount(&state, Rect::from_ltrb(0, 8, 10, 18)).unwrap();
    assert_eq!(drain(&log), vec!["a unfocused"]);

    // b's bottom edge finally shows up; its top edge was seen before
    mount.mount(&state, Rect::from_ltrb(0, 12, 10, 22)).unwrap();
    assert_eq!(drain(&log), vec!["a invisible", "b full_impression"]);
    assert_eq!(mount.visibility().len(), 1);

    mount.unmount_all_items().unwrap();
    assert_eq!(drain(&log), vec!["b unfocused", "b invisible"]);
    assert!(mount.visibility().is_empty());
}

#[test]
fn incremental_sweep_counts() {
    let spy = SpyLogger::new();
    let c = ComponentContext::new()
        .with_pools(Arc::new(Pools::new()))
        .with_logger(spy.clone(), Some("sweep".to_owned()));
    let component = Component::new(TestLayoutComponent::new("list", |_| {
        Ok(Some(Node::column().children((0..5).map(|i| {
            Node::component(TestDrawableComponent::new(format!("item{}", i), 10, 10))
        }))))
    }));
    let state = calculate(&c, &component);
    let mut mount = MountState::new(c);

    // one item tall window scrolled down over 50 pixels of content
    for top in (0..=40).step_by(5) {
        mount.mount(&state, Rect::from_ltrb(0, top, 10, top + 10)).unwrap();
        assert!(mount.item_count() <= 2, "at most two items intersect a 10px window");
    }
    let events = spy.mount_events();
    let total = |param| -> usize { events.iter().filter_map(|event| event.count(param)).sum() };
    let (mounted, unmounted) = (total(PARAM_MOUNTED_COUNT), total(PARAM_UNMOUNTED_COUNT));
    assert_eq!(mounted, 5, "every item is mounted exactly once");
    assert_eq!(unmounted, 4, "every item but the last scrolls out");
    assert_eq!(mount.item_count(), 1);
    assert!(events
        .iter()
        .all(|event| event.param(roost::logger::PARAM_LOG_TAG).is_some()));
}

#[test]
fn scrolling_views_in_and_out_reports_each_pass() {
    let spy = SpyLogger::new();
    let c = ComponentContext::new()
        .with_pools(Arc::new(Pools::new()))
        .with_logger(spy.clone(), None);
    let component = Component::new(TestLayoutComponent::new("views", |_| {
        Ok(Some(
            Node::column()
                .child(Node::component(TestViewComponent::new("first", 10, 10)))
                .child(Node::component(TestViewComponent::new("second", 10, 10))),
        ))
    }));
    let state = calculate(&c, &component);
    let mut mount = MountState::new(c);
    mount.mount(&state, Rect::from_ltrb(0, 0, 10, 20)).unwrap();
    assert_eq!(mount.item_count(), 2);
    spy.clear();

    let steps = [
        (Rect::from_ltrb(0, -10, 10, -5), (0, 2)),
        (Rect::from_ltrb(0, 0, 10, 5), (1, 0)),
        (Rect::from_ltrb(0, 5, 10, 15), (1, 0)),
        (Rect::from_ltrb(0, 15, 10, 25), (0, 1)),
        (Rect::from_ltrb(0, 20, 10, 30), (0, 1)),
    ];
    for (rect, _) in &steps {
        mount.mount(&state, *rect).unwrap();
    }

    let events = spy.mount_events();
    assert_eq!(events.len(), steps.len());
    for (event, (rect, (mounted, unmounted))) in events.iter().zip(&steps) {
        assert_eq!(event.count(PARAM_MOUNTED_COUNT), Some(*mounted), "mounted in {:?}", rect);
        assert_eq!(
            event.count(PARAM_UNMOUNTED_COUNT),
            Some(*unmounted),
            "unmounted in {:?}",
            rect
        );
    }
    assert_eq!(mount.item_count(), 0);
}

#[test]
fn view_content_gets_its_view_info() {
    let c = ComponentContext::new().with_pools(Arc::new(Pools::new()));
    let component = Component::new(TestLayoutComponent::new("view", |_| {
        Ok(Some(Node::column().child(
            Node::component(TestViewComponent::new("v", 10, 10))
                .background(roost::color::Color::WHITE)
                .padding(roost::rect::Edges::all(2)),
        )))
    }));
    let state = calculate(&c, &component);
    // the view draws its own background
    assert_eq!(state.output_count(), 2);
    let view = &state.outputs()[1];
    assert_eq!(view.view_node_info().unwrap().padding, roost::rect::Edges::all(2));

    let mut mount = MountState::new(c);
    mount.mount(&state, Rect::from_ltrb(0, 0, 10, 10)).unwrap();
    let content = mount.content(view.id()).unwrap();
    assert_eq!(content.mount_type(), roost::MountType::View);
    let content = content.downcast_ref::<TestContent>().unwrap();
    assert_eq!(content.bounds, Rect::from_ltrb(0, 0, 10, 10));
    assert_eq!((content.mount_count, content.bind_count), (1, 1));
}

#[test]
fn unmounted_content_returns_to_its_pool() {
    let pools = Arc::new(Pools::new());
    let c = ComponentContext::new().with_pools(Arc::clone(&pools));
    let component = Component::new(TestLayoutComponent::new("pair", |_| {
        Ok(Some(
            Node::column()
                .child(Node::component(TestDrawableComponent::new("a", 10, 10)))
                .child(Node::component(TestDrawableComponent::new("b", 10, 10))),
        ))
    }));
    let state = calculate(&c, &component);
    let lifecycle = LifecycleId::of::<TestDrawableComponent>();

    let mut mount = MountState::new(c);
    mount.mount(&state, Rect::from_ltrb(0, 0, 10, 20)).unwrap();
    assert_eq!(pools.mount_content_pool_len(lifecycle), 0);
    mount.unmount_all_items().unwrap();
    assert_eq!(pools.mount_content_pool_len(lifecycle), 2);

    mount.mount(&state, Rect::from_ltrb(0, 0, 10, 20)).unwrap();
    assert_eq!(pools.mount_content_pool_len(lifecycle), 0);
}

#[test]
fn mount_errors_are_returned() {
    for (fail_in, callback) in [(FailIn::Mount, "mount"), (FailIn::Bind, "bind")] {
        let c = ComponentContext::new().with_pools(Arc::new(Pools::new()));
        let component = Component::new(TestLayoutComponent::new("failing", move |_| {
            Ok(Some(Node::column().child(Node::component(FailingComponent(fail_in)))))
        }));
        let state = calculate(&c, &component);
        let mut mount = MountState::new(c);
        let err = mount.mount(&state, Rect::from_ltrb(0, 0, 10, 10)).expect_err("callback fails");
        match err {
            Error::Component { component, callback: failed_in, .. } => {
                assert_eq!(component, "FailingComponent");
                assert_eq!(failed_in, callback);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
