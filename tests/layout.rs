use roost::color::{Color, Drawable};
use roost::error::{PoolError, StructuralError};
use roost::events::{Click, EventHandler};
use roost::output::{OutputType, UpdateState};
use roost::pools::Pools;
use roost::testing::{
    CallCounter, FailIn, FailingComponent, TestDrawableComponent, TestLayoutComponent,
    TestNestedComponent,
};
use roost::tree::NodeTree;
use roost::{
    Component, ComponentContext, ComponentsConfiguration, Error, LayoutState, Node, OutputId, Rect,
    SizeSpec, StackLayoutEngine,
};
use std::sync::Arc;

fn context() -> ComponentContext {
    ComponentContext::new().with_pools(Arc::new(Pools::new()))
}

fn calculate(
    c: &ComponentContext,
    component: &Component,
    previous: Option<&LayoutState>,
) -> roost::Result<LayoutState> {
    LayoutState::calculate(
        c,
        component,
        SizeSpec::exactly(10),
        SizeSpec::unspecified(),
        previous.and_then(|state| state.diff_tree().cloned()),
        &StackLayoutEngine,
    )
}

fn ids(state: &LayoutState) -> Vec<OutputId> {
    state.outputs().iter().map(|output| output.id()).collect()
}

/// A column of `count` drawables, sharing one measure counter.
fn rows(count: usize, measures: &CallCounter) -> Component {
    let measures = measures.clone();
    Component::new(TestLayoutComponent::new(format!("rows{}", count), move |_| {
        Ok(Some(Node::column().children((0..count).map(|i| {
            let row = TestDrawableComponent::new(format!("row{}", i), 10, 10);
            Node::component(row.with_counter(measures.clone()))
        }))))
    }))
}

#[test]
fn ids_are_deterministic() {
    let counter = CallCounter::new();
    let first = calculate(&context(), &rows(3, &counter), None).unwrap();
    let second = calculate(&context(), &rows(3, &counter), None).unwrap();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.outputs()[0].id(), OutputId::ROOT_HOST);

    // same type at the same level: sequence numbers tell siblings apart
    let sequences: Vec<_> = first.outputs()[1..]
        .iter()
        .map(|output| output.id().sequence())
        .collect();
    assert_eq!(sequences, vec![0, 1, 2]);
    assert!(first.outputs()[1..].iter().all(|output| {
        output.id().level() == 1 && output.id().output_type() == OutputType::Content
    }));
}

#[test]
fn keys_change_ids() {
    let keyed = |key: &'static str| {
        Component::new(TestLayoutComponent::new(key, move |_| {
            Ok(Some(
                Node::column()
                    .child(Component::keyed(TestDrawableComponent::new("a", 10, 10), key))
                    .child(Node::component(TestDrawableComponent::new("b", 10, 10))),
            ))
        }))
    };
    let first = calculate(&context(), &keyed("one"), None).unwrap();
    let second = calculate(&context(), &keyed("two"), None).unwrap();
    let again = calculate(&context(), &keyed("one"), None).unwrap();

    assert_ne!(first.outputs()[1].id(), second.outputs()[1].id());
    assert_eq!(first.outputs()[1].id(), again.outputs()[1].id());
    assert_ne!(first.outputs()[1].id().key_digest(), 0);
    assert_eq!(first.outputs()[2].id().key_digest(), 0);
    // the keyed sibling has its own sequence space
    assert_eq!(first.outputs()[2].id().sequence(), 0);
    assert_eq!(first.outputs()[2].id(), second.outputs()[2].id());
}

fn card() -> Component {
    Component::new(TestLayoutComponent::new("card", |_| {
        Ok(Some(
            Node::column().background(Color::WHITE).foreground(Color::BLACK).child(
                Node::column()
                    .click_handler(EventHandler::new(|_: Click| ()))
                    .child(Node::component(TestDrawableComponent::new("icon", 4, 4))),
            ),
        ))
    }))
}

#[test]
fn clickable_container_flattens_to_three_outputs() {
    let c = context().with_config(ComponentsConfiguration {
        drawables_in_host_view: true,
        ..Default::default()
    });
    let state = calculate(&c, &card(), None).unwrap();
    let types: Vec<_> = state.outputs().iter().map(|output| output.id().output_type()).collect();
    assert_eq!(types, vec![OutputType::Host, OutputType::Host, OutputType::Content]);

    let root = &state.outputs()[0];
    let info = root.view_node_info().expect("root host carries the drawables");
    assert_eq!(info.background, Some(Drawable::Color(Color::WHITE)));
    assert_eq!(info.foreground, Some(Drawable::Color(Color::BLACK)));
    assert!(state.outputs()[1].node_info().unwrap().click.is_some());
    assert_eq!(state.outputs()[2].host_marker(), state.outputs()[1].id());
}

#[test]
fn drawables_become_outputs_by_default() {
    let state = calculate(&context(), &card(), None).unwrap();
    let types: Vec<_> = state.outputs().iter().map(|output| output.id().output_type()).collect();
    assert_eq!(
        types,
        vec![
            OutputType::Host,
            OutputType::Background,
            OutputType::Host,
            OutputType::Content,
            OutputType::Foreground,
        ]
    );
    assert!(state.outputs()[0].view_node_info().map_or(true, |info| info.background.is_none()));
}

#[test]
fn appended_sibling_keeps_existing_ids() {
    let counter = CallCounter::new();
    let c = context();
    let two = calculate(&c, &rows(2, &counter), None).unwrap();
    let three = calculate(&c, &rows(3, &counter), Some(&two)).unwrap();

    assert_eq!(three.output_count(), two.output_count() + 1);
    assert_eq!(&ids(&three)[..3], &ids(&two)[..]);
    assert_eq!(three.outputs()[1].update_state(), UpdateState::Updated);
    assert_eq!(three.outputs()[2].update_state(), UpdateState::Updated);
    assert_eq!(three.outputs()[3].update_state(), UpdateState::Unknown);
}

#[test]
fn unchanged_leaves_are_not_measured_again() {
    let counter = CallCounter::new();
    let c = context();
    let first = calculate(&c, &rows(3, &counter), None).unwrap();
    let measured = counter.get();
    assert!(measured >= 3);

    let second = calculate(&c, &rows(3, &counter), Some(&first)).unwrap();
    assert_eq!(counter.get(), measured, "diffed leaves reuse their measurements");
    assert_eq!(second.size(), first.size());

    let no_diff = context().with_config(ComponentsConfiguration {
        use_diff_tree: false,
        ..Default::default()
    });
    let third = calculate(&no_diff, &rows(3, &counter), Some(&second)).unwrap();
    assert_eq!(counter.get(), measured * 2);
    assert!(third.diff_tree().is_none());
}

#[test]
fn nested_trees_are_cached_per_size_spec() {
    let nested = Component::new(TestNestedComponent::new(6));
    let resolutions = nested.downcast_ref::<TestNestedComponent>().unwrap().resolutions.clone();
    let holder = {
        let nested = nested.clone();
        Component::new(TestLayoutComponent::new("holder", move |_| {
            Ok(Some(Node::column().child(nested.clone())))
        }))
    };

    let c = context();
    let first = calculate(&c, &holder, None).unwrap();
    assert_eq!(resolutions.get(), 1);
    assert_eq!(first.output_count(), 2);
    assert_eq!(first.outputs()[1].bounds(), Rect::from_ltrb(0, 0, 10, 6));
    assert!(nested.has_cached_layout());

    let second = calculate(&c, &holder, Some(&first)).unwrap();
    assert_eq!(resolutions.get(), 1);
    assert_eq!(ids(&second), ids(&first));

    let wider = LayoutState::calculate(
        &c,
        &holder,
        SizeSpec::exactly(20),
        SizeSpec::unspecified(),
        None,
        &StackLayoutEngine,
    )
    .unwrap();
    assert_eq!(resolutions.get(), 2);
    assert_eq!(wider.outputs()[1].bounds(), Rect::from_ltrb(0, 0, 20, 6));
}

#[test]
fn callback_errors_are_returned() {
    let failing = Component::new(TestLayoutComponent::new("failing", |_| {
        Ok(Some(Node::column().child(Node::component(FailingComponent(FailIn::Measure)))))
    }));
    let err = calculate(&context(), &failing, None).err().expect("measure fails");
    assert!(matches!(err, Error::Component { callback: "on_measure", .. }), "{}", err);

    #[derive(Debug, PartialEq)]
    struct NoLayout;
    roost::impl_component! { NoLayout; }
    let err = calculate(&context(), &Component::new(NoLayout), None).err().expect("no layout");
    assert!(matches!(
        err,
        Error::Structural(StructuralError::MissingCallback { callback: "on_create_layout", .. })
    ));
}

#[test]
fn node_pool_invariants() {
    let pools = Arc::new(Pools::new());
    let mut tree = NodeTree::new(Arc::clone(&pools), 8);
    let parent = tree.create_node();
    let child = tree.create_node();
    tree.append_child(parent, child).unwrap();

    assert!(matches!(
        tree.append_child(parent, child),
        Err(Error::Pool(PoolError::AlreadyAttached(_)))
    ));
    assert!(matches!(
        tree.release(child),
        Err(Error::Pool(PoolError::ReleasedAttachedNode(_)))
    ));
    assert!(matches!(
        tree.release(parent),
        Err(Error::Pool(PoolError::ReleasedNodeWithChildren(_)))
    ));

    assert_eq!(tree.remove_child(parent, 0).unwrap(), child);
    tree.release(child).unwrap();
    assert_eq!(pools.layout_node_pool_len(), 1);
    assert!(matches!(tree.release(child), Err(Error::Pool(PoolError::StaleHandle(_)))));
    assert!(matches!(tree.node(child), Err(Error::Pool(PoolError::StaleHandle(_)))));

    tree.release_tree();
    assert_eq!(pools.layout_node_pool_len(), 2);
}

#[test]
fn layout_passes_return_nodes_to_the_pools() {
    let pools = Arc::new(Pools::new());
    let c = ComponentContext::new().with_pools(Arc::clone(&pools));
    let state = calculate(&c, &rows(3, &CallCounter::new()), None).unwrap();
    assert_eq!(pools.layout_node_pool_len(), 4);
    assert_eq!(pools.diff_node_pool_len(), 0);

    drop(state);
    assert_eq!(pools.diff_node_pool_len(), 4);
}
