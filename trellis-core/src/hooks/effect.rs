//! Effect Hooks
//!
//! An effect is a side-effecting function tied to the render lifecycle of a
//! component. It is registered during a render when its dependencies changed
//! and started once the layout commits that render
//! ([`LifeCycleHook::affect_layout_did_render`]).
//!
//! # Lifecycle
//!
//! Every registration moves through the same phases:
//!
//! 1. **pending**: registered by a render, not yet started.
//! 2. **running**: the registration it supersedes (the previous effect at
//!    the same hook position) is told to stop and awaited, then the body
//!    runs and may hand back a [`Cleanup`].
//! 3. **awaiting-stop**: parked until it is superseded or the component is
//!    unmounted.
//! 4. **cleaning-up**: the stored cleanup runs, unless it already ran.
//! 5. **done**.
//!
//! Cleanups live in a one-shot cell per registration, so each runs at most
//! once, and a registration never starts its body before its predecessor
//! has finished cleaning up.
//!
//! # Async Effects
//!
//! [`use_async_effect`] runs the body as its own task. When told to stop,
//! the registration gives the body `shutdown_timeout` to finish. A body
//! that finishes in time contributes its cleanup; one that does not is
//! aborted and no cleanup runs for it.
//!
//! [`LifeCycleHook::affect_layout_did_render`]: super::LifeCycleHook::affect_layout_did_render

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::context::current_hook;
use super::deps::Dependencies;
use super::memo::memoize;
use crate::config::RuntimeConfig;
use crate::error::HookError;

/// Function returned by an effect body to release what the body acquired.
pub struct Cleanup(Box<dyn FnOnce() + Send>);

impl Cleanup {
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(cleanup))
    }

    fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect body may return.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EffectPhase {
    Pending,
    Running,
    AwaitingStop,
    CleaningUp,
    Done,
}

/// A registered effect waiting for the layout to start it.
pub(crate) struct EffectTask {
    pub(crate) stop: CancellationToken,
    pub(crate) run: BoxFuture<'static, ()>,
}

/// State shared between a registration's task and its successor.
struct Registration {
    stop: CancellationToken,
    finished: CancellationToken,
    cleanup: Mutex<Option<Cleanup>>,
    phase: Mutex<EffectPhase>,
}

impl Registration {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            stop: CancellationToken::new(),
            finished: CancellationToken::new(),
            cleanup: Mutex::new(None),
            phase: Mutex::new(EffectPhase::Pending),
        })
    }

    fn phase(&self) -> EffectPhase {
        *self.phase.lock()
    }

    fn enter(&self, phase: EffectPhase) {
        trace!(?phase, "effect phase");
        *self.phase.lock() = phase;
    }

    fn store_cleanup(&self, cleanup: Option<Cleanup>) {
        *self.cleanup.lock() = cleanup;
    }

    /// Run the stored cleanup if nobody has yet.
    fn run_cleanup(&self) {
        // Taken under the lock, run outside it: cleanups are user code.
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }
    }

    /// Stop this registration and wait until it has cleaned up.
    async fn supersede(&self) {
        self.stop.cancel();
        // `finished` fires even when the task panicked or was dropped.
        self.finished.cancelled().await;
        self.run_cleanup();
    }
}

/// Per hook position: the most recent registration.
#[derive(Default)]
struct EffectSlot {
    latest: Mutex<Option<Arc<Registration>>>,
}

impl EffectSlot {
    /// Register a new effect that supersedes the current one.
    fn register<F, Fut>(&self, activate: F) -> EffectTask
    where
        F: FnOnce(Arc<Registration>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let registration = Registration::new();
        let previous = self.latest.lock().replace(registration.clone());
        let stop = registration.stop.clone();
        // Created outside the future so it also fires if the future is
        // dropped before its first poll.
        let finished = registration.finished.clone().drop_guard();

        let run = async move {
            let _finished = finished;
            if let Some(previous) = previous {
                previous.supersede().await;
            }
            registration.enter(EffectPhase::Running);
            activate(registration.clone()).await;
            registration.enter(EffectPhase::Done);
        };

        EffectTask {
            stop,
            run: run.boxed(),
        }
    }
}

/// Register a synchronous side effect.
///
/// The body runs after the render is committed whenever `deps` changed. It
/// may return a [`Cleanup`], which runs before the next body and when the
/// component unmounts.
pub fn use_effect<F, C>(deps: Dependencies, effect: F) -> Result<(), HookError>
where
    F: FnOnce() -> C + Send + 'static,
    C: IntoCleanup,
{
    let hook = current_hook()?;
    let slot = hook.use_slot(EffectSlot::default)?;
    let (_, changed) = memoize(deps, || ())?;

    if changed {
        hook.add_effect(slot.register(move |registration| async move {
            registration.store_cleanup(effect().into_cleanup());

            registration.enter(EffectPhase::AwaitingStop);
            registration.stop.cancelled().await;

            registration.enter(EffectPhase::CleaningUp);
            registration.run_cleanup();
        }));
    }
    Ok(())
}

/// Register an asynchronous side effect with the default shutdown timeout
/// from [`RuntimeConfig::current`].
pub fn use_async_effect<F, Fut, C>(deps: Dependencies, effect: F) -> Result<(), HookError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = C> + Send + 'static,
    C: IntoCleanup + 'static,
{
    let timeout = RuntimeConfig::current().async_effect_shutdown_timeout();
    use_async_effect_with_timeout(deps, timeout, effect)
}

/// Register an asynchronous side effect.
///
/// The body runs as its own task. Once stopped, the body gets
/// `shutdown_timeout` to finish; its cleanup is used only if it did.
pub fn use_async_effect_with_timeout<F, Fut, C>(
    deps: Dependencies,
    shutdown_timeout: Duration,
    effect: F,
) -> Result<(), HookError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = C> + Send + 'static,
    C: IntoCleanup + 'static,
{
    let hook = current_hook()?;
    let slot = hook.use_slot(EffectSlot::default)?;
    let (_, changed) = memoize(deps, || ())?;

    if changed {
        hook.add_effect(slot.register(move |registration| async move {
            let mut body = tokio::spawn(async move { effect().await.into_cleanup() });

            registration.enter(EffectPhase::AwaitingStop);
            registration.stop.cancelled().await;

            registration.enter(EffectPhase::CleaningUp);
            match tokio::time::timeout(shutdown_timeout, &mut body).await {
                Ok(Ok(cleanup)) => registration.store_cleanup(cleanup),
                Ok(Err(err)) => warn!(error = %err, "async effect body failed"),
                Err(_) => debug!(?shutdown_timeout, "async effect did not finish before shutdown"),
            }
            registration.run_cleanup();
            body.abort();
        }));
    }
    Ok(())
}
