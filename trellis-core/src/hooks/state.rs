//! State Hooks
//!
//! `use_state` gives a component a value that survives re-renders together
//! with a [`SetState`] capability for changing it. Changing the value to
//! something unequal to the stored value asks the layout to re-render the
//! component; setting an equal value does nothing.
//!
//! The setter only holds a weak handle to the component, so it can be moved
//! into event handlers and background tasks freely. Once the component is
//! unmounted the setter becomes a no-op.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::context::current_hook;
use super::life_cycle::WeakHook;
use crate::error::HookError;

struct StateCell<T> {
    value: Mutex<T>,
    hook: WeakHook,
}

/// Update capability for a value created by [`use_state`].
pub struct SetState<T> {
    cell: Arc<StateCell<T>>,
}

impl<T> SetState<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Replace the value. Returns whether it was accepted as a change.
    pub fn set(&self, value: T) -> bool {
        self.update(|_| value)
    }

    /// Compute the next value from the current one. Returns whether the
    /// result was accepted as a change.
    ///
    /// `next` runs on a snapshot with no lock held, so it may call other
    /// setters, including this one.
    pub fn update(&self, next: impl FnOnce(&T) -> T) -> bool {
        let Some(hook) = self.cell.hook.upgrade() else {
            trace!("discarding state update for unmounted component");
            return false;
        };

        let snapshot = self.cell.value.lock().clone();
        let next = next(&snapshot);
        let changed = {
            let mut current = self.cell.value.lock();
            if next == *current {
                false
            } else {
                *current = next;
                true
            }
        };

        if changed {
            hook.schedule_render();
        }
        changed
    }
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("hook", &self.cell.hook)
            .finish()
    }
}

/// Local state of the rendering component.
///
/// `initial` is only used on the first render.
pub fn use_state<T>(initial: T) -> Result<(T, SetState<T>), HookError>
where
    T: Clone + PartialEq + Send + 'static,
{
    use_state_with(|| initial)
}

/// Like [`use_state`], but builds the initial value lazily.
pub fn use_state_with<T>(init: impl FnOnce() -> T) -> Result<(T, SetState<T>), HookError>
where
    T: Clone + PartialEq + Send + 'static,
{
    let hook = current_hook()?;
    let weak = hook.downgrade();
    let cell = hook.use_slot(|| StateCell {
        value: Mutex::new(init()),
        hook: weak,
    })?;
    let value = cell.value.lock().clone();
    Ok((value, SetState { cell }))
}

/// Dispatch capability returned by [`use_reducer`].
pub struct Dispatch<T, A> {
    set_state: SetState<T>,
    reducer: Arc<dyn Fn(&T, A) -> T + Send + Sync>,
}

impl<T, A> Dispatch<T, A>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Apply an action to the current state.
    pub fn dispatch(&self, action: A) -> bool {
        let reducer = &self.reducer;
        self.set_state.update(|state| reducer(state, action))
    }
}

impl<T, A> Clone for Dispatch<T, A> {
    fn clone(&self) -> Self {
        Self {
            set_state: self.set_state.clone(),
            reducer: Arc::clone(&self.reducer),
        }
    }
}

/// State driven by a reducer.
///
/// The reducer given on the first render is the one every later dispatch
/// uses.
pub fn use_reducer<T, A, R>(reducer: R, initial: T) -> Result<(T, Dispatch<T, A>), HookError>
where
    T: Clone + PartialEq + Send + 'static,
    A: 'static,
    R: Fn(&T, A) -> T + Send + Sync + 'static,
{
    let (state, set_state) = use_state(initial)?;
    let hook = current_hook()?;
    let dispatch = hook.use_slot(|| Dispatch {
        set_state,
        reducer: Arc::new(reducer),
    })?;
    Ok((state, Dispatch::clone(&dispatch)))
}

/// A mutable box that persists across renders without triggering them.
pub struct Ref<T> {
    current: Arc<Mutex<T>>,
}

impl<T> Ref<T> {
    pub fn set_current(&self, value: T) -> T {
        std::mem::replace(&mut *self.current.lock(), value)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.current.lock())
    }

    pub fn take(&self) -> T
    where
        T: Default,
    {
        std::mem::take(&mut *self.current.lock())
    }
}

impl<T: Clone> Ref<T> {
    pub fn current(&self) -> T {
        self.current.lock().clone()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref").field("current", &*self.current.lock()).finish()
    }
}

/// A [`Ref`] owned by the rendering component.
pub fn use_ref<T>(initial: T) -> Result<Ref<T>, HookError>
where
    T: Send + 'static,
{
    let hook = current_hook()?;
    let current = hook.use_slot(|| Mutex::new(initial))?;
    Ok(Ref { current })
}

/// Handle that re-renders a component on demand.
#[derive(Clone, Debug)]
pub struct ForceRender {
    hook: WeakHook,
}

impl ForceRender {
    pub fn call(&self) -> bool {
        self.hook
            .upgrade()
            .is_some_and(|hook| hook.schedule_render())
    }
}

/// A capability to re-render the current component without changing state.
pub fn use_force_render() -> Result<ForceRender, HookError> {
    let hook = current_hook()?;
    Ok(ForceRender {
        hook: hook.downgrade(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::LifeCycleHook;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook() -> (LifeCycleHook, Arc<AtomicUsize>) {
        let renders = Arc::new(AtomicUsize::new(0));
        let renders_clone = renders.clone();
        let hook = LifeCycleHook::new(move || {
            renders_clone.fetch_add(1, Ordering::SeqCst);
        });
        (hook, renders)
    }

    #[test]
    fn use_state_outside_render_fails() {
        assert_eq!(use_state(0).unwrap_err(), HookError::OutsideRender);
    }

    #[test]
    fn state_persists_and_updates() {
        let (hook, requests) = counting_hook();

        let (value, set) = hook.render(|| use_state(1)).unwrap();
        assert_eq!(value, 1);

        assert!(set.set(5));
        assert_eq!(requests.load(Ordering::SeqCst), 1);

        let (value, _) = hook.render(|| use_state(1)).unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn equal_values_do_not_schedule_renders() {
        let (hook, requests) = counting_hook();
        let (_, set) = hook.render(|| use_state(String::from("a"))).unwrap();

        assert!(!set.set(String::from("a")));
        assert_eq!(requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn one_request_per_accepted_change() {
        let (hook, requests) = counting_hook();
        let dispatches = [1, 1, 2, 2, 2, 3, 1];
        let mut expected_requests = 0;
        let mut last = 0;

        for next in dispatches {
            let (value, set) = hook.render(|| use_state(0)).unwrap();
            assert_eq!(value, last);
            if set.set(next) {
                expected_requests += 1;
            }
            if next != last {
                last = next;
            }
            assert_eq!(requests.load(Ordering::SeqCst), expected_requests);
        }

        assert_eq!(expected_requests, 4);
        let (value, _) = hook.render(|| use_state(0)).unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn setters_may_be_called_from_update() {
        let (hook, requests) = counting_hook();
        let (_, set) = hook.render(|| use_state(0)).unwrap();

        let inner = set.clone();
        assert!(set.update(|v| {
            assert!(inner.set(10));
            v + 1
        }));
        assert_eq!(requests.load(Ordering::SeqCst), 1);

        let (value, _) = hook.render(|| use_state(0)).unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn update_sees_current_value() {
        let (hook, _) = counting_hook();
        let (_, set) = hook.render(|| use_state(10)).unwrap();

        set.update(|v| v + 1);
        set.update(|v| v * 2);

        let (value, _) = hook.render(|| use_state(0)).unwrap();
        assert_eq!(value, 22);
    }

    #[test]
    fn lazy_initializer_runs_once() {
        let (hook, _) = counting_hook();
        let inits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let inits = inits.clone();
            hook.render(|| {
                use_state_with(move || {
                    inits.fetch_add(1, Ordering::SeqCst);
                    0
                })
            })
            .unwrap();
        }

        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn setter_is_inert_after_unmount() {
        let (hook, requests) = counting_hook();
        let (_, set) = hook.render(|| use_state(0)).unwrap();

        hook.affect_component_will_unmount().await.unwrap();

        assert!(!set.set(1));
        assert_eq!(requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reducer_applies_actions() {
        enum Action {
            Add(i32),
            Reset,
        }

        let reducer = |state: &i32, action: Action| match action {
            Action::Add(n) => state + n,
            Action::Reset => 0,
        };

        let (hook, _) = counting_hook();
        let (state, dispatch) = hook.render(|| use_reducer(reducer, 0)).unwrap();
        assert_eq!(state, 0);

        dispatch.dispatch(Action::Add(3));
        dispatch.dispatch(Action::Add(4));
        let (state, dispatch) = hook.render(|| use_reducer(reducer, 0)).unwrap();
        assert_eq!(state, 7);

        dispatch.dispatch(Action::Reset);
        let (state, _) = hook.render(|| use_reducer(reducer, 0)).unwrap();
        assert_eq!(state, 0);
    }

    #[test]
    fn refs_do_not_trigger_renders() {
        let (hook, requests) = counting_hook();
        let r = hook.render(|| use_ref(Vec::<i32>::new())).unwrap();
        r.with(|v| v.push(1));

        let r = hook.render(|| use_ref(Vec::<i32>::new())).unwrap();
        assert_eq!(r.current(), vec![1]);
        assert_eq!(requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn force_render_schedules() {
        let (hook, requests) = counting_hook();
        let force = hook.render(use_force_render).unwrap();
        assert!(force.call());
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }
}
