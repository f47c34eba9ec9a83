//! Single State Renderer
//!
//! One layout, one client. Every update the layout produces is sent to the
//! client as is.

use std::sync::Arc;

use async_trait::async_trait;

use super::layout::{Layout, LayoutEvent, RendererMessage};
use super::transport::{Inbox, Outbox};
use super::{serve_session, Renderer};
use crate::error::RenderError;

pub struct SingleStateRenderer<L: ?Sized> {
    layout: Arc<L>,
}

impl<L> SingleStateRenderer<L>
where
    L: Layout + ?Sized,
{
    pub fn new(layout: Arc<L>) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Arc<L> {
        &self.layout
    }

    /// Drive the layout for one client until the session ends.
    pub async fn run<O, I>(&self, outbox: O, inbox: I) -> Result<(), RenderError>
    where
        O: Outbox,
        I: Inbox,
    {
        serve_session(self, outbox, inbox, self.layout.root()).await
    }
}

#[async_trait]
impl<L> Renderer for SingleStateRenderer<L>
where
    L: Layout + ?Sized,
{
    async fn outgoing(&self, _context: &str) -> Result<RendererMessage, RenderError> {
        let update = self.layout.render().await?;
        Ok(RendererMessage::from_update(self.layout.root(), update))
    }

    async fn incoming(&self, _context: &str, event: LayoutEvent) -> Result<(), RenderError> {
        self.layout.trigger(event).await?;
        Ok(())
    }
}
