//! Ties a root component, its size specs, layout calculation and mounting together.
//!
//! Layout states can be computed on the calling thread or on a background worker. Results from
//! the worker are only applied by [`ComponentTree::poll`] or [`ComponentTree::wait`], and only if
//! they were computed for the current root component and size specs; anything else is dropped.

use crate::component::Component;
use crate::context::ComponentContext;
use crate::diff::DiffTree;
use crate::engine::LayoutEngine;
use crate::error::{Error, Result};
use crate::layout_state::LayoutState;
use crate::mount_state::MountState;
use crate::rect::Rect;
use crate::size_spec::SizeSpec;
use crossbeam::channel::{self, Receiver, RecvError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct LayoutRequest {
    seq: u64,
    component: Component,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    previous_diff: Option<Arc<DiffTree>>,
    context: ComponentContext,
    engine: Arc<dyn LayoutEngine>,
}

struct LayoutResult {
    seq: u64,
    component: Component,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    result: Result<LayoutState>,
}

struct Worker {
    requests: Sender<LayoutRequest>,
    results: Receiver<LayoutResult>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn() -> Result<Worker> {
        let (requests, request_recv) = channel::unbounded::<LayoutRequest>();
        let (result_sender, results) = channel::unbounded();

        let handle = thread::Builder::new()
            .name("roost-layout".to_owned())
            .spawn(move || {
                for request in request_recv.iter() {
                    let result = LayoutState::calculate(
                        &request.context,
                        &request.component,
                        request.width_spec,
                        request.height_spec,
                        request.previous_diff,
                        &*request.engine,
                    );
                    let result = LayoutResult {
                        seq: request.seq,
                        component: request.component,
                        width_spec: request.width_spec,
                        height_spec: request.height_spec,
                        result,
                    };
                    if result_sender.send(result).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| Error::Layout(format!("could not start the layout thread: {}", err)))?;

        Ok(Worker {
            requests,
            results,
            handle,
        })
    }
}

/// Owns a root component, its current layout state and the mount state it is mounted into.
pub struct ComponentTree {
    context: ComponentContext,
    engine: Arc<dyn LayoutEngine>,
    root: Option<Component>,
    specs: Option<(SizeSpec, SizeSpec)>,
    main: Option<Arc<LayoutState>>,
    next_seq: u64,
    committed_seq: Option<u64>,
    pending: usize,
    worker: Option<Worker>,
    mount_state: MountState,
}

impl ComponentTree {
    pub fn new(context: ComponentContext, engine: Arc<dyn LayoutEngine>) -> ComponentTree {
        ComponentTree {
            mount_state: MountState::new(context.clone()),
            context,
            engine,
            root: None,
            specs: None,
            main: None,
            next_seq: 0,
            committed_seq: None,
            pending: 0,
            worker: None,
        }
    }

    /// Replaces the root component. Computes a layout state right away if size specs are known.
    pub fn set_root(&mut self, root: Component) -> Result<()> {
        self.root = Some(root);
        self.compute_sync()
    }

    /// Sets the size specs and computes a layout state on this thread.
    pub fn set_size_spec(&mut self, width_spec: SizeSpec, height_spec: SizeSpec) -> Result<()> {
        self.specs = Some((width_spec, height_spec));
        self.compute_sync()
    }

    /// Sets the size specs and queues layout calculation on the background worker. The result
    /// is applied by [`poll`](Self::poll) or [`wait`](Self::wait).
    pub fn set_size_spec_async(
        &mut self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Result<()> {
        self.specs = Some((width_spec, height_spec));
        self.compute_async()
    }

    /// Replaces the root component and queues layout calculation on the background worker.
    pub fn set_root_async(&mut self, root: Component) -> Result<()> {
        self.root = Some(root);
        self.compute_async()
    }

    fn needs_layout(&self) -> Option<(Component, SizeSpec, SizeSpec)> {
        let (root, (width_spec, height_spec)) = match (&self.root, self.specs) {
            (Some(root), Some(specs)) => (root, specs),
            _ => return None,
        };
        if let Some(main) = &self.main {
            if main.is_compatible(root, width_spec, height_spec) {
                log::trace!("layout state for {} is still valid", root.describe());
                return None;
            }
        }
        Some((root.clone(), width_spec, height_spec))
    }

    fn previous_diff(&self) -> Option<Arc<DiffTree>> {
        self.main.as_ref().and_then(|main| main.diff_tree().cloned())
    }

    fn compute_sync(&mut self) -> Result<()> {
        let (root, width_spec, height_spec) = match self.needs_layout() {
            Some(request) => request,
            None => return Ok(()),
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        let state = LayoutState::calculate(
            &self.context,
            &root,
            width_spec,
            height_spec,
            self.previous_diff(),
            &*self.engine,
        )?;
        self.commit(seq, state);
        Ok(())
    }

    fn compute_async(&mut self) -> Result<()> {
        let (component, width_spec, height_spec) = match self.needs_layout() {
            Some(request) => request,
            None => return Ok(()),
        };
        if self.worker.is_none() {
            self.worker = Some(Worker::spawn()?);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let request = LayoutRequest {
            seq,
            component,
            width_spec,
            height_spec,
            previous_diff: self.previous_diff(),
            context: self.context.clone(),
            engine: Arc::clone(&self.engine),
        };
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| Error::Layout("the layout thread is not running".to_owned()))?;
        worker
            .requests
            .send(request)
            .map_err(|_| Error::Layout("the layout thread has stopped".to_owned()))?;
        self.pending += 1;
        Ok(())
    }

    fn commit(&mut self, seq: u64, state: LayoutState) {
        log::debug!("committing layout state {:?} (request {})", state.id(), seq);
        self.committed_seq = Some(seq);
        self.main = Some(Arc::new(state));
    }

    fn is_current(&self, result: &LayoutResult) -> bool {
        let newer_committed = self.committed_seq.map_or(false, |committed| result.seq < committed);
        let same_root = self
            .root
            .as_ref()
            .map_or(false, |root| root.ptr_eq(&result.component));
        let same_specs = self.specs == Some((result.width_spec, result.height_spec));
        !newer_committed && same_root && same_specs
    }

    fn receive(&mut self, result: LayoutResult) -> Result<bool> {
        self.pending = self.pending.saturating_sub(1);
        if !self.is_current(&result) {
            log::debug!(
                "discarding stale layout of {} for {:?} x {:?} (request {})",
                result.component.describe(),
                result.width_spec,
                result.height_spec,
                result.seq
            );
            return Ok(false);
        }
        let state = result.result?;
        self.commit(result.seq, state);
        Ok(true)
    }

    /// Applies every finished background layout. Returns true if the main layout state changed.
    pub fn poll(&mut self) -> Result<bool> {
        let mut committed = false;
        loop {
            let received = match &self.worker {
                Some(worker) => worker.results.try_recv(),
                None => return Ok(committed),
            };
            match received {
                Ok(result) => committed |= self.receive(result)?,
                Err(TryRecvError::Empty) => return Ok(committed),
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::Layout("the layout thread has stopped".to_owned()))
                }
            }
        }
    }

    /// Blocks until every queued background layout has finished, applying the current one.
    /// Returns true if the main layout state changed.
    pub fn wait(&mut self) -> Result<bool> {
        let mut committed = false;
        while self.pending > 0 {
            let received = match &self.worker {
                Some(worker) => worker.results.recv(),
                None => break,
            };
            match received {
                Ok(result) => committed |= self.receive(result)?,
                Err(RecvError) => {
                    return Err(Error::Layout("the layout thread has stopped".to_owned()))
                }
            }
        }
        Ok(committed)
    }

    /// Mounts the main layout state. Does nothing before the first layout state exists.
    pub fn mount_component(&mut self, visible_rect: Rect) -> Result<()> {
        match &self.main {
            Some(main) => self.mount_state.mount(main, visible_rect),
            None => Ok(()),
        }
    }

    /// Unmounts everything.
    pub fn release(&mut self) -> Result<()> {
        self.mount_state.unmount_all_items()
    }

    pub fn root(&self) -> Option<&Component> {
        self.root.as_ref()
    }

    pub fn main_layout_state(&self) -> Option<&Arc<LayoutState>> {
        self.main.as_ref()
    }

    /// Number of background layouts queued and not yet received.
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    pub fn mount_state(&self) -> &MountState {
        &self.mount_state
    }

    pub fn mount_state_mut(&mut self) -> &mut MountState {
        &mut self.mount_state
    }

    pub fn context(&self) -> &ComponentContext {
        &self.context
    }
}

impl Drop for ComponentTree {
    fn drop(&mut self) {
        if let Some(Worker {
            requests,
            results,
            handle,
        }) = self.worker.take()
        {
            drop(requests);
            drop(results);
            if handle.join().is_err() {
                log::warn!("the layout thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StackLayoutEngine;
    use crate::node::Node;
    use crate::pools::Pools;
    use crate::testing::{TestDrawableComponent, TestLayoutComponent};

    fn tree() -> ComponentTree {
        let context = ComponentContext::new().with_pools(Arc::new(Pools::new()));
        ComponentTree::new(context, Arc::new(StackLayoutEngine))
    }

    fn root() -> Component {
        Component::new(TestLayoutComponent::new("root", |_| {
            Ok(Some(Node::column().child(Node::component(TestDrawableComponent::new("a", 10, 10)))))
        }))
    }

    #[test]
    fn layout_waits_for_size_specs() {
        let mut tree = tree();
        tree.set_root(root()).unwrap();
        assert!(tree.main_layout_state().is_none());
        tree.set_size_spec(SizeSpec::exactly(10), SizeSpec::unspecified()).unwrap();
        let first = tree.main_layout_state().unwrap().id();

        // compatible specs keep the layout state
        tree.set_size_spec(SizeSpec::exactly(10), SizeSpec::unspecified()).unwrap();
        assert_eq!(tree.main_layout_state().unwrap().id(), first);

        tree.mount_component(Rect::from_ltrb(0, 0, 10, 10)).unwrap();
        assert_eq!(tree.mount_state().item_count(), 1);
    }

    #[test]
    fn async_results_apply_on_wait() {
        let mut tree = tree();
        tree.set_root(root()).unwrap();
        tree.set_size_spec_async(SizeSpec::exactly(20), SizeSpec::unspecified()).unwrap();
        assert_eq!(tree.pending_count(), 1);
        assert!(tree.wait().unwrap());
        assert_eq!(tree.pending_count(), 0);
        assert_eq!(tree.main_layout_state().unwrap().width_spec(), SizeSpec::exactly(20));
    }
}
