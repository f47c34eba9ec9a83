use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use super::layout::{Layout, LayoutEvent, LayoutUpdate};
use crate::error::LayoutError;

/// A layout that renders whatever a test pushes into it.
pub(crate) struct ScriptedLayout {
    root: String,
    updates_tx: mpsc::UnboundedSender<Result<LayoutUpdate, LayoutError>>,
    updates_rx: AsyncMutex<mpsc::UnboundedReceiver<Result<LayoutUpdate, LayoutError>>>,
    events: Mutex<Vec<LayoutEvent>>,
}

impl ScriptedLayout {
    pub(crate) const FAILING_TARGET: &'static str = "missing-handler";

    pub(crate) fn new(root: &str) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            root: root.to_string(),
            updates_tx,
            updates_rx: AsyncMutex::new(updates_rx),
            events: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, update: LayoutUpdate) {
        let _ = self.updates_tx.send(Ok(update));
    }

    pub(crate) fn fail_render(&self, err: LayoutError) {
        let _ = self.updates_tx.send(Err(err));
    }

    pub(crate) fn events(&self) -> Vec<LayoutEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Layout for ScriptedLayout {
    fn root(&self) -> &str {
        &self.root
    }

    async fn render(&self) -> Result<LayoutUpdate, LayoutError> {
        let mut updates = self.updates_rx.lock().await;
        match updates.recv().await {
            Some(update) => update,
            None => Err(LayoutError::Stop),
        }
    }

    async fn trigger(&self, event: LayoutEvent) -> Result<(), LayoutError> {
        if event.target == Self::FAILING_TARGET {
            return Err(LayoutError::UnknownTarget(event.target));
        }
        self.events.lock().push(event);
        Ok(())
    }
}
