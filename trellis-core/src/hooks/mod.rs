//! Hooks
//!
//! This module implements per-component state for the component runtime:
//! state cells, memoized values, effects and context providers. These are
//! the building blocks component render functions use to remember things
//! between renders.
//!
//! # Concepts
//!
//! ## Hook Store
//!
//! Every component instance owns a [`LifeCycleHook`]. While the component
//! renders, the hook is bound to the current thread and every hook call
//! takes the next slot of that store. Hooks must therefore be called in
//! the same order, and the same number of times, on every render.
//!
//! ## State
//!
//! [`use_state`] returns the current value and a setter. Setting a value
//! that differs from the stored one schedules a re-render of the owning
//! component.
//!
//! ## Memoization
//!
//! [`use_memo`] and [`use_callback`] cache a value until their
//! [`Dependencies`] change. Dependencies are listed explicitly with
//! [`deps!`](crate::deps).
//!
//! ## Effects
//!
//! [`use_effect`] and [`use_async_effect`] run side effects after the layout
//! has committed a render. An effect may return a [`Cleanup`] which runs
//! before the effect is replaced and when the component unmounts.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::deps;
//! use trellis_core::hooks::{use_effect, use_state, Cleanup};
//!
//! let (count, set_count) = use_state(0)?;
//! use_effect(deps![count], move || {
//!     tracing::info!(count, "count changed");
//!     Cleanup::new(|| tracing::info!("cleaning up"))
//! })?;
//! ```

mod context;
mod deps;
mod effect;
mod life_cycle;
mod memo;
mod provider;
mod state;

pub use context::{current_hook, HookContext};
pub use deps::{strictly_equal, Dep, Dependencies};
pub use effect::{use_async_effect, use_async_effect_with_timeout, use_effect, Cleanup, IntoCleanup};
pub use life_cycle::{HookId, LifeCycleHook, WeakHook};
pub use memo::{use_callback, use_debug_value, use_memo};
pub use provider::{create_context, use_context, Context, ContextId, ContextProvider};
pub use state::{
    use_force_render, use_reducer, use_ref, use_state, use_state_with, Dispatch, ForceRender, Ref,
    SetState,
};
