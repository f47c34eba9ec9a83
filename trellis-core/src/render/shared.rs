//! Shared State Renderer
//!
//! One layout rendered once for many clients. A dedicated render loop
//! merges every update into a shared model and appends it to the queue of
//! each connected client. A client that joins late first receives a
//! snapshot of the whole model and then every update rendered after it
//! joined.
//!
//! # Ordering
//!
//! The render loop merges an update and fans it out while holding the model
//! write lock. A joining client registers its queue and enqueues the
//! snapshot while holding the read lock. An update is therefore either part
//! of a client's snapshot or delivered through its queue, never both and
//! never neither.
//!
//! # Lifecycle
//!
//! `start` → any number of `run` → `join` (or `shutdown`). `join` waits for
//! every client session, stops the render loop and tears the renderer down
//! once; concurrent callers all observe the outcome of that teardown.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::layout::{Layout, LayoutEvent, LayoutUpdate, RendererMessage};
use super::scope::TaskScope;
use super::transport::{Inbox, Outbox};
use super::{serve_session, Renderer};
use crate::error::RenderError;
use crate::vdom::VdomNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Joining,
    Joined,
}

struct ClientQueue {
    sender: mpsc::UnboundedSender<LayoutUpdate>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<LayoutUpdate>>>,
}

struct SharedInner<L: ?Sized> {
    layout: Arc<L>,
    model: RwLock<IndexMap<String, VdomNode>>,
    clients: DashMap<String, ClientQueue>,
    scope: TaskScope,
    phase: Mutex<Phase>,
    render_task: Mutex<Option<JoinHandle<()>>>,
    outcome: watch::Sender<Option<Result<(), RenderError>>>,
    #[cfg(test)]
    teardowns: std::sync::atomic::AtomicUsize,
}

impl<L> SharedInner<L>
where
    L: Layout + ?Sized,
{
    async fn render_loop(&self) {
        loop {
            let update = match self.layout.render().await {
                Ok(update) => update,
                Err(err) => {
                    let err = RenderError::from(err);
                    if err.is_graceful() {
                        info!("layout stopped rendering, closing sessions");
                        self.scope.cancel();
                    } else {
                        error!(error = %err, "render loop failed");
                        self.scope.fail(err);
                    }
                    return;
                }
            };
            self.publish(update);
        }
    }

    fn publish(&self, update: LayoutUpdate) {
        let mut model = self.model.write();
        for (id, node) in &update.new {
            model.insert(id.clone(), node.clone());
        }
        for id in &update.old {
            model.shift_remove(id);
        }
        for client in self.clients.iter() {
            // A failed send means the session is already being torn down.
            let _ = client.sender.send(update.clone());
        }
        debug!(src = %update.src, clients = self.clients.len(), "published update");
    }

    fn register(&self, context: &str) -> Result<(), RenderError> {
        let model = self.model.read();
        match self.clients.entry(context.to_string()) {
            Entry::Occupied(_) => Err(RenderError::DuplicateContext(context.to_string())),
            Entry::Vacant(vacant) => {
                let (sender, receiver) = mpsc::unbounded_channel();
                let root = self.layout.root();
                if model.contains_key(root) {
                    let snapshot = LayoutUpdate {
                        src: root.to_string(),
                        new: model.clone(),
                        old: Vec::new(),
                        error: None,
                    };
                    let _ = sender.send(snapshot);
                }
                vacant.insert(ClientQueue {
                    sender,
                    receiver: Arc::new(AsyncMutex::new(receiver)),
                });
                Ok(())
            }
        }
    }

    async fn teardown(&self) -> Result<(), RenderError> {
        #[cfg(test)]
        self.teardowns
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let outcome = self.scope.wait().await;
        if let Some(task) = self.render_task.lock().take() {
            task.abort();
        }
        self.clients.clear();
        *self.phase.lock() = Phase::Joined;
        info!(ok = outcome.is_ok(), "shared renderer joined");
        outcome
    }
}

#[async_trait]
impl<L> Renderer for SharedInner<L>
where
    L: Layout + ?Sized,
{
    async fn outgoing(&self, context: &str) -> Result<RendererMessage, RenderError> {
        let receiver = match self.clients.get(context) {
            Some(client) => Arc::clone(&client.receiver),
            None => return Err(RenderError::Stop),
        };
        let update = receiver.lock().await.recv().await.ok_or(RenderError::Stop)?;
        Ok(RendererMessage::from_update(self.layout.root(), update))
    }

    async fn incoming(&self, _context: &str, event: LayoutEvent) -> Result<(), RenderError> {
        self.layout.trigger(event).await?;
        Ok(())
    }
}

/// Removes a client's queue when its session ends, however it ends.
struct Registration<L: Layout + ?Sized + 'static> {
    inner: Arc<SharedInner<L>>,
    context: String,
}

impl<L: Layout + ?Sized + 'static> Drop for Registration<L> {
    fn drop(&mut self) {
        self.inner.clients.remove(&self.context);
    }
}

pub struct SharedStateRenderer<L: ?Sized> {
    inner: Arc<SharedInner<L>>,
}

impl<L> SharedStateRenderer<L>
where
    L: Layout + ?Sized + 'static,
{
    pub fn new(layout: Arc<L>) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(SharedInner {
                layout,
                model: RwLock::new(IndexMap::new()),
                clients: DashMap::new(),
                scope: TaskScope::new(),
                phase: Mutex::new(Phase::Idle),
                render_task: Mutex::new(None),
                outcome,
                #[cfg(test)]
                teardowns: Default::default(),
            }),
        }
    }

    pub fn layout(&self) -> &Arc<L> {
        &self.inner.layout
    }

    /// Start the render loop. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), RenderError> {
        {
            let mut phase = self.inner.phase.lock();
            match *phase {
                Phase::Idle => *phase = Phase::Running,
                Phase::Running | Phase::Joining => return Err(RenderError::AlreadyStarted),
                Phase::Joined => return Err(RenderError::Joined),
            }
        }
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.render_loop().await });
        *self.inner.render_task.lock() = Some(task);
        info!(root = self.inner.layout.root(), "shared renderer started");
        Ok(())
    }

    /// Connect a client. The session runs in the background until the client
    /// disconnects, the layout stops or the renderer shuts down.
    pub fn run<O, I>(&self, outbox: O, inbox: I, context: impl Into<String>) -> Result<(), RenderError>
    where
        O: Outbox + 'static,
        I: Inbox + 'static,
    {
        // Held until the session is in the scope, so a concurrent `join`
        // either waits for it or refuses it.
        let phase = self.inner.phase.lock();
        match *phase {
            Phase::Running => {}
            Phase::Idle => return Err(RenderError::NotStarted),
            Phase::Joining | Phase::Joined => return Err(RenderError::Joined),
        }

        let context = context.into();
        self.inner.register(&context)?;
        let registration = Registration {
            inner: Arc::clone(&self.inner),
            context: context.clone(),
        };
        self.inner.scope.spawn(format!("session {context}"), async move {
            let result = serve_session(&*registration.inner, outbox, inbox, &registration.context).await;
            drop(registration);
            result
        });
        drop(phase);
        Ok(())
    }

    /// Connect a client and then wait for the renderer to be joined.
    pub async fn run_and_join<O, I>(
        &self,
        outbox: O,
        inbox: I,
        context: impl Into<String>,
    ) -> Result<(), RenderError>
    where
        O: Outbox + 'static,
        I: Inbox + 'static,
    {
        self.run(outbox, inbox, context)?;
        self.join().await
    }

    /// Wait for every client session to end, then stop the render loop.
    ///
    /// Teardown happens once; every caller, including ones arriving after
    /// it finished, receives the same outcome.
    pub async fn join(&self) -> Result<(), RenderError> {
        let mut outcome = self.inner.outcome.subscribe();
        let leader = {
            let mut phase = self.inner.phase.lock();
            match *phase {
                Phase::Idle => return Err(RenderError::NotStarted),
                Phase::Running => {
                    *phase = Phase::Joining;
                    true
                }
                Phase::Joining | Phase::Joined => false,
            }
        };

        if leader {
            // Teardown runs in its own task so a cancelled caller cannot
            // leave the other callers waiting.
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                let result = inner.teardown().await;
                inner.outcome.send_replace(Some(result));
            });
        }

        let result = outcome.wait_for(Option::is_some).await;
        match result {
            Ok(done) => done.clone().unwrap_or(Ok(())),
            Err(_) => Err(RenderError::Joined),
        }
    }

    /// Cancel every session and join.
    pub async fn shutdown(&self) -> Result<(), RenderError> {
        self.inner.scope.cancel();
        self.join().await
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.len()
    }

    pub fn is_connected(&self, context: &str) -> bool {
        self.inner.clients.contains_key(context)
    }

    /// A copy of the merged model.
    pub fn model(&self) -> IndexMap<String, VdomNode> {
        self.inner.model.read().clone()
    }
}
