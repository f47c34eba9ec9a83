//! Transport Seams
//!
//! Renderers talk to clients through an [`Outbox`] and an [`Inbox`]. Wire
//! adapters (WebSocket, HTTP streaming, ...) implement these; the crate
//! ships implementations for tokio channels, which is what tests and
//! in-process clients use.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::layout::{LayoutEvent, RendererMessage};
use crate::error::TransportError;

#[async_trait]
pub trait Outbox: Send {
    async fn send(&mut self, message: RendererMessage) -> Result<(), TransportError>;
}

#[async_trait]
pub trait Inbox: Send {
    /// The next event. [`TransportError::Closed`] once the client is gone.
    async fn recv(&mut self) -> Result<LayoutEvent, TransportError>;
}

#[async_trait]
impl Outbox for mpsc::Sender<RendererMessage> {
    async fn send(&mut self, message: RendererMessage) -> Result<(), TransportError> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Outbox for mpsc::UnboundedSender<RendererMessage> {
    async fn send(&mut self, message: RendererMessage) -> Result<(), TransportError> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Inbox for mpsc::Receiver<LayoutEvent> {
    async fn recv(&mut self) -> Result<LayoutEvent, TransportError> {
        mpsc::Receiver::recv(self).await.ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl Inbox for mpsc::UnboundedReceiver<LayoutEvent> {
    async fn recv(&mut self) -> Result<LayoutEvent, TransportError> {
        mpsc::UnboundedReceiver::recv(self)
            .await
            .ok_or(TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::LayoutUpdate;

    #[tokio::test]
    async fn channels_report_closed_peers() {
        let (mut tx, rx) = mpsc::channel::<RendererMessage>(1);
        drop(rx);
        let message = RendererMessage::from_update("root", LayoutUpdate::new("root"));
        assert_eq!(Outbox::send(&mut tx, message).await, Err(TransportError::Closed));

        let (tx, mut rx) = mpsc::unbounded_channel::<LayoutEvent>();
        tx.send(LayoutEvent::new("t", vec![])).unwrap();
        drop(tx);
        assert_eq!(Inbox::recv(&mut rx).await.unwrap().target, "t");
        assert_eq!(Inbox::recv(&mut rx).await, Err(TransportError::Closed));
    }
}
