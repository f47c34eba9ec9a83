//! Memoization Hooks
//!
//! A memo cell stores a value together with the dependency list it was
//! computed from. On each render the new list is compared against the
//! stored one (see [`strictly_equal`](super::strictly_equal)); the value is
//! recomputed only when the lists differ, on the first render, or when the
//! dependencies are [`Dependencies::always`].

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::context::current_hook;
use super::deps::{DepList, Dependencies};
use crate::config::RuntimeConfig;
use crate::error::HookError;

struct MemoCell<T> {
    value: Option<T>,
    deps: DepList,
}

/// Shared by every memoizing hook: returns the memoized value and whether
/// it was recomputed during this render.
pub(crate) fn memoize<T, F>(deps: Dependencies, compute: F) -> Result<(T, bool), HookError>
where
    T: Clone + Send + 'static,
    F: FnOnce() -> T,
{
    let hook = current_hook()?;
    let cell = hook.use_slot(|| {
        Mutex::new(MemoCell::<T> {
            value: None,
            deps: DepList::new(),
        })
    })?;

    {
        let cell = cell.lock();
        if let Some(value) = &cell.value {
            if !deps.changed_from(&cell.deps) {
                return Ok((value.clone(), false));
            }
        }
    }

    // `compute` runs unlocked: it is user code.
    let value = compute();
    let mut cell = cell.lock();
    cell.value = Some(value.clone());
    cell.deps = deps.into_stored();
    Ok((value, true))
}

/// A value that is only recomputed when `deps` change.
pub fn use_memo<T, F>(deps: Dependencies, compute: F) -> Result<T, HookError>
where
    T: Clone + Send + 'static,
    F: FnOnce() -> T,
{
    memoize(deps, compute).map(|(value, _)| value)
}

/// A function whose identity is kept stable while `deps` are unchanged.
///
/// The returned `Arc` is the same allocation on every render until the
/// dependencies change, so it can itself be used as a [`Dep::identity`]
/// dependency.
///
/// [`Dep::identity`]: super::Dep::identity
pub fn use_callback<F>(deps: Dependencies, function: F) -> Result<Arc<F>, HookError>
where
    F: Send + Sync + 'static,
{
    use_memo(deps, || Arc::new(function))
}

/// Log a value at debug level whenever it changes.
///
/// Only active when [`RuntimeConfig::debug`] is set. The message is
/// memoized on `deps`; a change is detected with `!=`.
pub fn use_debug_value<M, F>(deps: Dependencies, message: F) -> Result<(), HookError>
where
    M: Debug + PartialEq + Clone + Send + 'static,
    F: FnOnce() -> M,
{
    let hook = current_hook()?;
    let last = hook.use_slot(|| Mutex::new(None::<M>))?;
    let new = use_memo(deps, message)?;

    if RuntimeConfig::current().debug {
        let mut last = last.lock();
        if last.as_ref() != Some(&new) {
            debug!(hook = hook.id().raw(), value = ?new, "debug value changed");
            *last = Some(new);
        }
    }
    Ok(())
}
