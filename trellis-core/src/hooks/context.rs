//! Hook Context
//!
//! The hook context tracks which component is currently rendering so that
//! hook calls can find the component's [`LifeCycleHook`].
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering a render pushes the component's
//! hook; the returned guard pops it again. Component renders are synchronous
//! (they never await), so a render can neither migrate to another thread nor
//! interleave with another render on the same thread while its entry is on
//! top of the stack. Nested renders (a component rendering a child inline)
//! simply push another entry.

use std::cell::RefCell;

use super::life_cycle::{HookId, LifeCycleHook};
use crate::error::HookError;

thread_local! {
    static HOOK_STACK: RefCell<Vec<LifeCycleHook>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the hook context when dropped.
///
/// This keeps the stack balanced even if the render panics.
pub struct HookContext {
    hook_id: HookId,
}

impl HookContext {
    /// Make `hook` the current hook until the returned guard is dropped.
    pub(crate) fn enter(hook: LifeCycleHook) -> Self {
        let hook_id = hook.id();
        HOOK_STACK.with(|stack| stack.borrow_mut().push(hook));
        Self { hook_id }
    }

    /// Check if a component is rendering on this thread.
    pub fn is_active() -> bool {
        HOOK_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The hook of the innermost rendering component, if any.
    pub fn current() -> Option<LifeCycleHook> {
        HOOK_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Number of nested renders active on this thread.
    pub fn depth() -> usize {
        HOOK_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for HookContext {
    fn drop(&mut self) {
        HOOK_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(hook) = popped {
                debug_assert_eq!(
                    hook.id(),
                    self.hook_id,
                    "HookContext mismatch: expected {:?}, got {:?}",
                    self.hook_id,
                    hook.id()
                );
            }
        });
    }
}

/// The hook store of the component currently rendering on this thread.
pub fn current_hook() -> Result<LifeCycleHook, HookError> {
    HookContext::current().ok_or(HookError::OutsideRender)
}
