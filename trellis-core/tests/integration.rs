//! Integration Tests for the Component Runtime
//!
//! These tests drive a small hook-backed layout through both renderers and
//! check that state, effects, events and the wire format work together.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use trellis_core::deps;
use trellis_core::hooks::{use_effect, use_state, Cleanup, LifeCycleHook};
use trellis_core::protocol::encode_json;
use trellis_core::render::{
    Layout, LayoutEvent, LayoutUpdate, RendererMessage, SharedStateRenderer, SingleStateRenderer,
};
use trellis_core::vdom::{validate_vdom_json, Child, Component, EventHandler, FnComponent, VdomNode};
use trellis_core::LayoutError;

/// A layout with a single component at its root.
struct CounterLayout {
    hook: LifeCycleHook,
    component: Arc<dyn Component>,
    dirty: Arc<Notify>,
    first_render: AtomicBool,
    handlers: Mutex<HashMap<String, EventHandler>>,
}

impl CounterLayout {
    fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        let dirty = Arc::new(Notify::new());
        let notify = dirty.clone();
        let hook = LifeCycleHook::new(move || notify.notify_one());

        let component = FnComponent::new("Counter", move || {
            let (count, set_count) = use_state(0)?;
            let log = log.clone();
            use_effect(deps![count], move || {
                log.lock().push(format!("effect {count}"));
                Cleanup::new(move || log.lock().push(format!("cleanup {count}")))
            })?;
            let increment = EventHandler::new(move |_| {
                set_count.update(|c| c + 1);
            });
            Ok(VdomNode::new("button")
                .with_event_handler("onClick", increment)
                .with_child(count.to_string()))
        });

        Self {
            hook,
            component: Arc::new(component),
            dirty,
            first_render: AtomicBool::new(true),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    fn collect_handlers(&self, node: &VdomNode) {
        let mut handlers = self.handlers.lock();
        handlers.clear();
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            for handler in node.event_handlers().values() {
                handlers.insert(handler.target().to_string(), handler.clone());
            }
            stack.extend(node.children().iter().filter_map(Child::as_node));
        }
    }
}

#[async_trait]
impl Layout for CounterLayout {
    fn root(&self) -> &str {
        "root"
    }

    async fn render(&self) -> Result<LayoutUpdate, LayoutError> {
        if !self.first_render.swap(false, Ordering::SeqCst) {
            self.dirty.notified().await;
        }
        let node = self.hook.render(|| self.component.render())?;
        self.hook.affect_layout_did_render()?;
        self.collect_handlers(&node);
        Ok(LayoutUpdate::new("root").with_new("root", node))
    }

    async fn trigger(&self, event: LayoutEvent) -> Result<(), LayoutError> {
        let handler = self.handlers.lock().get(&event.target).cloned();
        match handler {
            Some(handler) => {
                handler.call(event.data).await;
                Ok(())
            }
            None => Err(LayoutError::UnknownTarget(event.target)),
        }
    }
}

fn count_of(message: &RendererMessage) -> String {
    message.new["root"].children()[0]
        .as_text()
        .expect("counter renders its count as text")
        .to_string()
}

fn click_target(message: &RendererMessage) -> String {
    message.new["root"].event_handlers()["onClick"].target().to_string()
}

async fn next(messages: &mut mpsc::UnboundedReceiver<RendererMessage>) -> RendererMessage {
    timeout(Duration::from_secs(5), messages.recv())
        .await
        .expect("timed out waiting for a render")
        .expect("session ended")
}

async fn wait_for_log(log: &Mutex<Vec<String>>, expected: &[&str]) {
    timeout(Duration::from_secs(5), async {
        while log.lock().as_slice() != expected {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("log {:?} never became {expected:?}", log.lock()));
}

#[tokio::test]
async fn single_client_counter_session() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let layout = Arc::new(CounterLayout::new(log.clone()));
    let renderer = SingleStateRenderer::new(layout.clone());
    let (out_tx, mut messages) = mpsc::unbounded_channel();
    let (events, in_rx) = mpsc::unbounded_channel();
    let session = tokio::spawn(async move { renderer.run(out_tx, in_rx).await });

    let first = next(&mut messages).await;
    assert_eq!(count_of(&first), "0");
    wait_for_log(&log, &["effect 0"]).await;

    events.send(LayoutEvent::new(click_target(&first), vec![])).unwrap();
    let second = next(&mut messages).await;
    assert_eq!(count_of(&second), "1");
    wait_for_log(&log, &["effect 0", "cleanup 0", "effect 1"]).await;

    events.send(LayoutEvent::new(click_target(&second), vec![])).unwrap();
    assert_eq!(count_of(&next(&mut messages).await), "2");

    drop(events);
    session.await.unwrap().unwrap();

    layout.hook.affect_component_will_unmount().await.unwrap();
    wait_for_log(
        &log,
        &["effect 0", "cleanup 0", "effect 1", "cleanup 1", "effect 2", "cleanup 2"],
    )
    .await;
}

#[tokio::test]
async fn unknown_targets_fail_the_session() {
    let layout = Arc::new(CounterLayout::new(Arc::new(Mutex::new(Vec::new()))));
    let renderer = SingleStateRenderer::new(layout);
    let (out_tx, _messages) = mpsc::unbounded_channel();
    let (events, in_rx) = mpsc::unbounded_channel();

    events.send(LayoutEvent::new("nobody", vec![])).unwrap();
    let err = renderer.run(out_tx, in_rx).await.unwrap_err();
    assert_eq!(err.to_string(), "no event handler for target 'nobody'");
}

#[tokio::test]
async fn shared_counter_across_clients() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let renderer = SharedStateRenderer::new(Arc::new(CounterLayout::new(log)));
    renderer.start().unwrap();

    let (a_out, mut a_messages) = mpsc::unbounded_channel();
    let (a_events, a_in) = mpsc::unbounded_channel();
    renderer.run(a_out, a_in, "a").unwrap();
    let first = next(&mut a_messages).await;
    assert_eq!(count_of(&first), "0");

    a_events.send(LayoutEvent::new(click_target(&first), vec![])).unwrap();
    assert_eq!(count_of(&next(&mut a_messages).await), "1");

    // A client joining now sees the current count as a snapshot.
    let (b_out, mut b_messages) = mpsc::unbounded_channel();
    let (b_events, b_in) = mpsc::unbounded_channel();
    renderer.run(b_out, b_in, "b").unwrap();
    let snapshot = next(&mut b_messages).await;
    assert_eq!(count_of(&snapshot), "1");

    b_events.send(LayoutEvent::new(click_target(&snapshot), vec![])).unwrap();
    assert_eq!(count_of(&next(&mut a_messages).await), "2");
    assert_eq!(count_of(&next(&mut b_messages).await), "2");

    drop((a_events, b_events));
    renderer.join().await.unwrap();
}

#[tokio::test]
async fn rendered_messages_are_valid_wire_vdom() {
    let layout = Arc::new(CounterLayout::new(Arc::new(Mutex::new(Vec::new()))));
    let renderer = SingleStateRenderer::new(layout);
    let (out_tx, mut messages) = mpsc::unbounded_channel();
    let (events, in_rx) = mpsc::unbounded_channel::<LayoutEvent>();
    let session = tokio::spawn(async move { renderer.run(out_tx, in_rx).await });

    let message = next(&mut messages).await;
    let frame: Value = serde_json::from_str(&encode_json(&message).unwrap()).unwrap();
    assert_eq!(frame["root"], "root");
    validate_vdom_json(&frame["new"]["root"]).unwrap();

    drop(events);
    session.await.unwrap().unwrap();
}
