//! Components
//!
//! A component is anything a layout can render into a [`VdomNode`]. The
//! layout renders each component inside its own
//! [`LifeCycleHook`](crate::hooks::LifeCycleHook), which is what gives hook
//! calls in `render` their per-component state.

use std::fmt;
use std::sync::Arc;

use super::node::{Key, VdomNode};
use crate::error::HookError;

pub trait Component: Send + Sync {
    /// Identity among siblings. Components rendered from a list should have
    /// one.
    fn key(&self) -> Option<&Key> {
        None
    }

    /// Name used in diagnostics.
    fn type_name(&self) -> &str;

    fn render(&self) -> Result<VdomNode, HookError>;
}

pub type ComponentRef = Arc<dyn Component>;

/// A component defined by a render function.
pub struct FnComponent<F> {
    name: &'static str,
    key: Option<Key>,
    render: F,
}

impl<F> FnComponent<F>
where
    F: Fn() -> Result<VdomNode, HookError> + Send + Sync + 'static,
{
    pub fn new(name: &'static str, render: F) -> Self {
        Self {
            name,
            key: None,
            render,
        }
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn into_ref(self) -> ComponentRef {
        Arc::new(self)
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn() -> Result<VdomNode, HookError> + Send + Sync + 'static,
{
    fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    fn type_name(&self) -> &str {
        self.name
    }

    fn render(&self) -> Result<VdomNode, HookError> {
        (self.render)()
    }
}

impl<F> fmt::Debug for FnComponent<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComponent")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}
