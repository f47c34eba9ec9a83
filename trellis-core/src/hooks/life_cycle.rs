//! Life Cycle Hook
//!
//! A [`LifeCycleHook`] is the hook store of one component instance. It holds
//! the instance's hook slots across renders and is told by the layout when
//! the component starts rendering, finishes rendering, has been committed
//! and is about to be unmounted.
//!
//! # Slots
//!
//! Hooks are keyed by call order. Each render resets a cursor to zero and
//! every hook call takes the next slot, creating it on first use. Once a
//! render has completed, every later render must access exactly the same
//! number of slots or it fails with [`HookError::SlotCountMismatch`].
//!
//! # Render scheduling
//!
//! `schedule_render` calls the layout's callback at most once between two
//! renders; further requests coalesce until the next render begins.
//!
//! # Liveness
//!
//! Dispatch capabilities handed out by hooks hold a [`WeakHook`], never a
//! strong reference, and check the liveness flag before acting. After
//! `affect_component_will_unmount` they become no-ops.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::context::HookContext;
use super::effect::EffectTask;
use super::provider::ContextId;
use crate::error::HookError;

type Slot = Arc<dyn Any + Send + Sync>;

/// Unique identifier of a component instance's hook store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl HookId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Per-component hook store.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Clone)]
pub struct LifeCycleHook {
    inner: Arc<HookInner>,
}

struct HookInner {
    id: HookId,
    schedule_render_callback: Box<dyn Fn() + Send + Sync>,
    render_scheduled: AtomicBool,
    alive: AtomicBool,
    parent: Option<Weak<HookInner>>,
    state: Mutex<HookState>,
}

#[derive(Default)]
struct HookState {
    slots: Vec<Slot>,
    cursor: usize,
    rendering: bool,
    /// A slot initializer is running.
    initializing: bool,
    /// A hook was called while `initializing` was set.
    init_violated: bool,
    render_count: usize,
    pending_effects: Vec<EffectTask>,
    effect_stops: Vec<CancellationToken>,
    effect_tasks: Vec<JoinHandle<()>>,
    /// First failure of an effect task reaped before unmount.
    first_failure: Option<HookError>,
    context_providers: HashMap<ContextId, Slot>,
}

impl LifeCycleHook {
    /// Create the hook store of a root component.
    ///
    /// `schedule_render` is called when the component asks to be re-rendered.
    pub fn new<F>(schedule_render: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(None, schedule_render)
    }

    /// Create the hook store of a component rendered inside `parent`.
    ///
    /// Context lookups that miss in this store continue in the parent.
    pub fn child<F>(parent: &LifeCycleHook, schedule_render: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(Some(Arc::downgrade(&parent.inner)), schedule_render)
    }

    fn build<F>(parent: Option<Weak<HookInner>>, schedule_render: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(HookInner {
                id: HookId::new(),
                schedule_render_callback: Box::new(schedule_render),
                render_scheduled: AtomicBool::new(false),
                alive: AtomicBool::new(true),
                parent,
                state: Mutex::new(HookState::default()),
            }),
        }
    }

    pub fn id(&self) -> HookId {
        self.inner.id
    }

    /// Whether the component is still mounted.
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> usize {
        self.inner.state.lock().render_count
    }

    /// Number of hook slots in use.
    pub fn slot_count(&self) -> usize {
        self.inner.state.lock().slots.len()
    }

    /// A handle that does not keep the component alive.
    pub fn downgrade(&self) -> WeakHook {
        WeakHook {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Ask the layout to re-render this component.
    ///
    /// Returns `true` if a new request was issued and `false` if one is
    /// already pending or the component is unmounted.
    pub fn schedule_render(&self) -> bool {
        if !self.is_alive() {
            trace!(hook = self.id().raw(), "ignoring render request for unmounted component");
            return false;
        }
        if self.inner.render_scheduled.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!(hook = self.id().raw(), "render scheduled");
        (self.inner.schedule_render_callback)();
        true
    }

    /// Whether a render request is pending.
    pub fn is_render_scheduled(&self) -> bool {
        self.inner.render_scheduled.load(Ordering::SeqCst)
    }

    /// Run one render of the component.
    ///
    /// `render` runs with this hook as the current hook, so hook functions
    /// called inside it resolve to this component's slots.
    pub fn render<R>(&self, render: impl FnOnce() -> Result<R, HookError>) -> Result<R, HookError> {
        self.affect_component_will_render()?;
        let result = {
            let _ctx = HookContext::enter(self.clone());
            render()
        };
        let finished = self.affect_component_did_render();
        let value = result?;
        finished?;
        Ok(value)
    }

    /// The component is about to render.
    pub fn affect_component_will_render(&self) -> Result<(), HookError> {
        if !self.is_alive() {
            return Err(HookError::Unmounted);
        }
        let mut state = self.inner.state.lock();
        if state.rendering {
            return Err(HookError::AlreadyRendering);
        }
        state.rendering = true;
        state.cursor = 0;
        state.initializing = false;
        state.init_violated = false;
        state.context_providers.clear();
        // Requests made from here on belong to the next render.
        self.inner.render_scheduled.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// The component finished rendering.
    pub fn affect_component_did_render(&self) -> Result<(), HookError> {
        let mut state = self.inner.state.lock();
        state.rendering = false;
        let found = std::mem::take(&mut state.cursor);
        let expected = state.slots.len();
        if found != expected {
            return Err(HookError::SlotCountMismatch { expected, found });
        }
        state.render_count += 1;
        Ok(())
    }

    /// The layout committed the render: start the effects it registered.
    ///
    /// Must be called from within a tokio runtime.
    pub fn affect_layout_did_render(&self) -> Result<(), HookError> {
        let runtime = Handle::try_current().map_err(|_| HookError::NoRuntime)?;
        let mut state = self.inner.state.lock();

        self.reap_finished_effects(&mut state);
        state.effect_stops.retain(|stop| !stop.is_cancelled());

        let pending = std::mem::take(&mut state.pending_effects);
        if !pending.is_empty() {
            debug!(hook = self.id().raw(), count = pending.len(), "starting effects");
        }
        for effect in pending {
            state.effect_stops.push(effect.stop);
            state.effect_tasks.push(runtime.spawn(effect.run));
        }
        Ok(())
    }

    fn reap_finished_effects(&self, state: &mut HookState) {
        let (finished, running) = std::mem::take(&mut state.effect_tasks)
            .into_iter()
            .partition::<Vec<_>, _>(JoinHandle::is_finished);
        state.effect_tasks = running;
        for task in finished {
            if let Some(Err(err)) = task.now_or_never() {
                error!(hook = self.id().raw(), error = %err, "effect failed");
                state
                    .first_failure
                    .get_or_insert(HookError::EffectFailed(err.to_string()));
            }
        }
    }

    /// The component is being removed: stop every effect and wait for
    /// their cleanups to finish.
    ///
    /// Returns the first effect failure, after all effects have finished.
    pub async fn affect_component_will_unmount(&self) -> Result<(), HookError> {
        self.inner.alive.store(false, Ordering::SeqCst);

        let (tasks, mut first_failure) = {
            let mut state = self.inner.state.lock();
            state.pending_effects.clear();
            for stop in state.effect_stops.drain(..) {
                stop.cancel();
            }
            (
                std::mem::take(&mut state.effect_tasks),
                state.first_failure.take(),
            )
        };

        for task in tasks {
            if let Err(err) = task.await {
                error!(hook = self.id().raw(), error = %err, "effect failed");
                first_failure.get_or_insert(HookError::EffectFailed(err.to_string()));
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Take the next slot, creating it with `init` if this position is new.
    pub(crate) fn use_slot<T>(&self, init: impl FnOnce() -> T) -> Result<Arc<T>, HookError>
    where
        T: Any + Send + Sync,
    {
        let (index, existing) = {
            let mut state = self.inner.state.lock();
            if state.initializing {
                state.init_violated = true;
                return Err(HookError::HookInInitializer {
                    index: state.cursor.saturating_sub(1),
                });
            }
            let index = state.cursor;
            state.cursor += 1;
            let existing = state.slots.get(index).cloned();
            if existing.is_none() && state.render_count > 0 {
                return Err(HookError::SlotCountMismatch {
                    expected: state.slots.len(),
                    found: index + 1,
                });
            }
            state.initializing = existing.is_none();
            (index, existing)
        };

        match existing {
            Some(slot) => slot.downcast::<T>().map_err(|_| HookError::SlotTypeMismatch {
                index,
                expected: type_name::<T>(),
            }),
            None => {
                // `init` runs unlocked: it is user code.
                let value = Arc::new(init());
                let mut state = self.inner.state.lock();
                state.initializing = false;
                if std::mem::take(&mut state.init_violated) {
                    return Err(HookError::HookInInitializer { index });
                }
                state.slots.push(value.clone());
                Ok(value)
            }
        }
    }

    pub(crate) fn add_effect(&self, effect: EffectTask) {
        self.inner.state.lock().pending_effects.push(effect);
    }

    /// Number of effects registered by the last render and not yet started.
    pub fn pending_effect_count(&self) -> usize {
        self.inner.state.lock().pending_effects.len()
    }

    pub(crate) fn set_context_provider(&self, id: ContextId, value: Slot) {
        self.inner.state.lock().context_providers.insert(id, value);
    }

    /// The nearest provided value for a context, searching this component
    /// and then its ancestors.
    pub(crate) fn get_context_provider(&self, id: ContextId) -> Option<Slot> {
        if let Some(value) = self.inner.state.lock().context_providers.get(&id) {
            return Some(value.clone());
        }
        let mut parent = self.inner.parent.as_ref().and_then(Weak::upgrade);
        while let Some(hook) = parent {
            if let Some(value) = hook.state.lock().context_providers.get(&id) {
                return Some(value.clone());
            }
            parent = hook.parent.as_ref().and_then(Weak::upgrade);
        }
        None
    }
}

impl fmt::Debug for LifeCycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LifeCycleHook")
            .field("id", &self.inner.id)
            .field("alive", &self.is_alive())
            .field("slots", &state.slots.len())
            .field("render_count", &state.render_count)
            .field("running_effects", &state.effect_tasks.len())
            .finish()
    }
}

/// Non-owning handle to a [`LifeCycleHook`].
#[derive(Clone)]
pub struct WeakHook {
    inner: Weak<HookInner>,
}

impl WeakHook {
    /// The hook, if the component still exists and is mounted.
    pub fn upgrade(&self) -> Option<LifeCycleHook> {
        self.inner
            .upgrade()
            .map(|inner| LifeCycleHook { inner })
            .filter(LifeCycleHook::is_alive)
    }
}

impl fmt::Debug for WeakHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHook")
            .field("alive", &self.upgrade().is_some())
            .finish()
    }
}
