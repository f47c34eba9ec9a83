//! Context Providers
//!
//! A [`Context`] carries a value down the component tree without threading
//! it through every component in between. A component provides a value
//! while it renders; every descendant created with
//! [`LifeCycleHook::child`](super::LifeCycleHook::child) sees the nearest
//! provided value through [`use_context`], or the context's default when no
//! ancestor provides one.
//!
//! Provided values are rebound on every render of the providing component,
//! so descendants always read what the provider rendered last.

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::context::current_hook;
use crate::error::HookError;
use crate::vdom::{Child, Component, Key, VdomNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    fn new() -> Self {
        static CONTEXT_COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A typed channel from providers to consumers.
pub struct Context<T> {
    id: ContextId,
    default: Arc<T>,
}

/// Create a context whose consumers see `default` unless a provider is
/// rendering above them.
pub fn create_context<T>(default: T) -> Context<T>
where
    T: Send + Sync + 'static,
{
    Context {
        id: ContextId::new(),
        default: Arc::new(default),
    }
}

impl<T> Context<T>
where
    T: Send + Sync + 'static,
{
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Bind `value` for the descendants of the rendering component.
    pub fn provide(&self, value: T) -> Result<(), HookError> {
        let hook = current_hook()?;
        hook.set_context_provider(self.id, Arc::new(value));
        Ok(())
    }

    /// A component that provides `value` and renders `children` as a
    /// fragment.
    pub fn provider(&self, value: T, children: Vec<Child>) -> ContextProvider<T>
    where
        T: Clone,
    {
        ContextProvider {
            context: self.clone(),
            value,
            children,
            key: None,
        }
    }
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Arc::clone(&self.default),
        }
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("type", &type_name::<T>())
            .finish()
    }
}

/// The value of `context` visible to the rendering component.
pub fn use_context<T>(context: &Context<T>) -> Result<T, HookError>
where
    T: Clone + Send + Sync + 'static,
{
    let hook = current_hook()?;
    let provided = hook
        .get_context_provider(context.id)
        .and_then(|value| value.downcast::<T>().ok());
    Ok(match provided {
        Some(value) => T::clone(&value),
        None => T::clone(&context.default),
    })
}

/// Component form of [`Context::provide`].
pub struct ContextProvider<T> {
    context: Context<T>,
    value: T,
    children: Vec<Child>,
    key: Option<Key>,
}

impl<T> ContextProvider<T> {
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl<T> Component for ContextProvider<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    fn type_name(&self) -> &str {
        "ContextProvider"
    }

    fn render(&self) -> Result<VdomNode, HookError> {
        self.context.provide(self.value.clone())?;
        Ok(VdomNode::fragment(self.children.clone()))
    }
}
