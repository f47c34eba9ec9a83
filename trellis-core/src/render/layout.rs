//! Layout Contract
//!
//! A layout owns the component tree. Renderers only ever ask it for the
//! next update and hand it events; how it diffs and which components it
//! re-renders is its own business.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LayoutError;
use crate::vdom::VdomNode;

/// The result of one layout render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutUpdate {
    /// Id of the node the update was rendered from.
    pub src: String,
    /// Nodes created or changed, by id.
    pub new: IndexMap<String, VdomNode>,
    /// Ids of nodes that no longer exist.
    pub old: Vec<String>,
    /// A render failure the layout chose to report instead of raising.
    pub error: Option<String>,
}

impl LayoutUpdate {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    pub fn with_new(mut self, id: impl Into<String>, node: VdomNode) -> Self {
        self.new.insert(id.into(), node);
        self
    }

    pub fn with_old(mut self, id: impl Into<String>) -> Self {
        self.old.push(id.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// An event sent by a client to the handler registered under `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEvent {
    pub target: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl LayoutEvent {
    pub fn new(target: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            data,
        }
    }
}

/// The message a renderer sends to a client for each update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RendererMessage {
    pub root: String,
    pub src: String,
    pub new: IndexMap<String, VdomNode>,
    pub old: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RendererMessage {
    pub fn from_update(root: impl Into<String>, update: LayoutUpdate) -> Self {
        Self {
            root: root.into(),
            src: update.src,
            new: update.new,
            old: update.old,
            error: update.error,
        }
    }
}

/// A component tree that can be rendered and receive events.
///
/// Both methods take `&self`: a shared renderer renders from one task while
/// events arrive from many.
#[async_trait]
pub trait Layout: Send + Sync {
    /// Id of the root node.
    fn root(&self) -> &str;

    /// Wait for the next update. Returning [`LayoutError::Stop`] ends the
    /// session gracefully.
    async fn render(&self) -> Result<LayoutUpdate, LayoutError>;

    async fn trigger(&self, event: LayoutEvent) -> Result<(), LayoutError>;
}
