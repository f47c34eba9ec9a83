//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis component framework.
//! It implements:
//!
//! - Hooks for per-component state, memoization, effects and context
//! - The virtual DOM model, its construction rules and schema validation
//! - Renderers that drive a layout for one client or many
//! - The wire protocol spoken with clients
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `hooks`: hook stores, the current-render context and every `use_*` hook
//! - `vdom`: nodes, constructors, components and validation
//! - `render`: the layout contract, renderers and their transports
//! - `protocol`: JSON and MessagePack framing
//! - `config`: runtime switches read from the environment
//! - `error`: error types for each of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::hooks::{use_state, LifeCycleHook};
//! use trellis_core::vdom::{EventHandler, VdomNode};
//!
//! let hook = LifeCycleHook::new(|| println!("render requested"));
//!
//! let node = hook.render(|| {
//!     let (count, set_count) = use_state(0)?;
//!     Ok(VdomNode::new("button")
//!         .with_event_handler(
//!             "onClick",
//!             EventHandler::new(move |_| {
//!                 set_count.update(|c| c + 1);
//!             }),
//!         )
//!         .with_child(format!("Clicked {count} times")))
//! })?;
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod protocol;
pub mod render;
pub mod vdom;

pub use config::RuntimeConfig;
pub use error::{
    HookError, LayoutError, ProtocolError, RenderError, TransportError, ValidationError, VdomError,
};
