//! Error Types
//!
//! Each concern of the runtime gets its own error enum. Errors that must be
//! handed to several waiters at once (a coalesced `join()`) are `Clone`, so
//! their payloads are kept as owned strings rather than boxed sources.

use thiserror::Error;

/// Misuse of the hook runtime.
///
/// These are fatal to the render that produced them and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A hook was called while no component was rendering on this thread.
    #[error("hook called outside of a component render")]
    OutsideRender,

    /// A render accessed a different number of hook slots than the
    /// previous render of the same component instance.
    #[error("render accessed {found} hook slots but the previous render accessed {expected}")]
    SlotCountMismatch { expected: usize, found: usize },

    /// The slot at this position was created by a different hook.
    #[error("hook slot {index} does not hold a {expected}; hooks must be called in the same order every render")]
    SlotTypeMismatch { index: usize, expected: &'static str },

    /// `render` was re-entered for a component that is already rendering.
    #[error("component is already rendering")]
    AlreadyRendering,

    /// The component was unmounted and can no longer render.
    #[error("component has been unmounted")]
    Unmounted,

    /// Effects can only be started from inside a tokio runtime.
    #[error("no tokio runtime available to run effects")]
    NoRuntime,

    /// A hook was called from inside another hook's initializer.
    #[error("hook slot {index} was initialized by code that called another hook")]
    HookInInitializer { index: usize },

    /// An effect task panicked or was cancelled unexpectedly.
    #[error("effect failed: {0}")]
    EffectFailed(String),
}

/// Failure while constructing a VDOM node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VdomError {
    #[error("'{tag}' nodes cannot have children")]
    ChildrenNotAllowed { tag: String },

    #[error("attribute '{name}' is not JSON serializable: {reason}")]
    AttributeNotJson { name: String, reason: String },

    #[error("nested components can only be accessed on web module components, '{tag}' has no import source")]
    NotAWebModule { tag: String },

    /// Attributes may only be given as the first argument.
    #[error("attributes for '{tag}' must be the first argument, found them at position {position}")]
    MisplacedAttributes { tag: String, position: usize },
}

/// Serialized VDOM did not match the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid VDOM at {path}: {message}")]
pub struct ValidationError {
    /// JSON path of the offending value, e.g. `$.children[2].tagName`.
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Failure reported by a [`Layout`](crate::render::Layout) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout render failed: {0}")]
    Render(String),

    #[error("no event handler for target '{0}'")]
    UnknownTarget(String),

    #[error("event handler failed: {0}")]
    Handler(String),

    #[error(transparent)]
    Hook(#[from] HookError),

    /// The layout asks the session driving it to end gracefully.
    #[error("layout requested to stop rendering")]
    Stop,
}

/// Failure of the send/receive channels a renderer is driven by.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer went away. A renderer treats this as the end of a session.
    #[error("transport closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Recv(String),
}

/// Failure of a renderer session or of the shared renderer's scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Layout(LayoutError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Raised from inside a session to end it gracefully.
    #[error("rendering stopped")]
    Stop,

    #[error("a client with context '{0}' is already connected")]
    DuplicateContext(String),

    #[error("renderer has not been started")]
    NotStarted,

    #[error("renderer is already running")]
    AlreadyStarted,

    #[error("renderer has already been joined")]
    Joined,

    #[error("renderer task failed: {0}")]
    TaskFailed(String),
}

impl From<LayoutError> for RenderError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::Stop => RenderError::Stop,
            other => RenderError::Layout(other),
        }
    }
}

impl RenderError {
    /// Whether this error ends a session without being a failure.
    pub fn is_graceful(&self) -> bool {
        matches!(self, RenderError::Stop | RenderError::Transport(TransportError::Closed))
    }
}

/// Failure encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("messagepack encode error: {0}")]
    MessagePackEncode(#[from] rmp_serde::encode::Error),

    #[error("messagepack decode error: {0}")]
    MessagePackDecode(#[from] rmp_serde::decode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_reports_path() {
        let err = ValidationError::new("$.children[0]", "expected string or object");
        assert_eq!(
            err.to_string(),
            "invalid VDOM at $.children[0]: expected string or object"
        );
    }

    #[test]
    fn layout_errors_convert_into_render_errors() {
        let err: RenderError = LayoutError::UnknownTarget("abc".into()).into();
        assert_eq!(err, RenderError::Layout(LayoutError::UnknownTarget("abc".into())));
    }

    #[test]
    fn stop_requests_are_graceful() {
        let err: RenderError = LayoutError::Stop.into();
        assert_eq!(err, RenderError::Stop);
        assert!(err.is_graceful());
        assert!(RenderError::from(TransportError::Closed).is_graceful());
        assert!(!RenderError::from(TransportError::Send("x".into())).is_graceful());
    }
}
