//! Rendering
//!
//! Renderers drive a [`Layout`] for connected clients. Every client session
//! is a pair of loops running side by side:
//!
//! - the outgoing loop waits for the next message and sends it through the
//!   client's [`Outbox`];
//! - the incoming loop receives events from the client's [`Inbox`] and hands
//!   them to the layout.
//!
//! The first loop to fail ends the session and the other loop is dropped
//! with it. A [`RenderError::Stop`] or a closed transport ends the session
//! without an error.
//!
//! [`SingleStateRenderer`] gives one client its own layout.
//! [`SharedStateRenderer`] renders one layout once and fans every update
//! out to many clients.

mod layout;
mod scope;
mod shared;
mod single;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::error::RenderError;

pub use layout::{Layout, LayoutEvent, LayoutUpdate, RendererMessage};
pub use scope::TaskScope;
pub use shared::SharedStateRenderer;
pub use single::SingleStateRenderer;
pub use transport::{Inbox, Outbox};

/// The two halves of a client session.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// The next message for the client identified by `context`.
    async fn outgoing(&self, context: &str) -> Result<RendererMessage, RenderError>;

    /// Handle an event sent by the client identified by `context`.
    async fn incoming(&self, context: &str, event: LayoutEvent) -> Result<(), RenderError>;
}

async fn outgoing_loop<R, O>(renderer: &R, outbox: &mut O, context: &str) -> Result<(), RenderError>
where
    R: Renderer + ?Sized,
    O: Outbox,
{
    loop {
        let message = renderer.outgoing(context).await?;
        outbox.send(message).await?;
    }
}

async fn incoming_loop<R, I>(renderer: &R, inbox: &mut I, context: &str) -> Result<(), RenderError>
where
    R: Renderer + ?Sized,
    I: Inbox,
{
    loop {
        let event = inbox.recv().await?;
        debug!(context, target = %event.target, "dispatching event");
        renderer.incoming(context, event).await?;
    }
}

/// Run one client session until it ends.
pub async fn serve_session<R, O, I>(
    renderer: &R,
    mut outbox: O,
    mut inbox: I,
    context: &str,
) -> Result<(), RenderError>
where
    R: Renderer + ?Sized,
    O: Outbox,
    I: Inbox,
{
    info!(context, "session started");
    let result = tokio::select! {
        result = outgoing_loop(renderer, &mut outbox, context) => result,
        result = incoming_loop(renderer, &mut inbox, context) => result,
    };

    match result {
        Err(err) if !err.is_graceful() => {
            error!(context, error = %err, "session failed");
            Err(err)
        }
        _ => {
            info!(context, "session ended");
            Ok(())
        }
    }
}
