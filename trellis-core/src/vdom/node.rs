//! VDOM Nodes
//!
//! The immutable tree handed from components to the layout and from the
//! layout to clients. Serializing a node yields the wire JSON:
//!
//! ```json
//! {"tagName": "div", "key": "a", "attributes": {...}, "children": [...],
//!  "eventHandlers": {...}, "inlineJavaScript": {...}, "importSource": {...}}
//! ```
//!
//! Empty collections and absent optionals are omitted.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::component::ComponentRef;

/// Identity of a node among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Text(String),
    Number(serde_json::Number),
}

impl Key {
    /// Interpret a JSON value as a key. Only strings and numbers qualify.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Key::Text(text.clone())),
            Value::Number(number) => Some(Key::Number(number.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Text(text) => f.write_str(text),
            Key::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Number(value.into())
    }
}

impl From<u64> for Key {
    fn from(value: u64) -> Self {
        Key::Number(value.into())
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Number(value.into())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Number((value as u64).into())
    }
}

type HandlerFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, ()> + Send + Sync>;

fn next_target() -> String {
    static TARGET_COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{:016x}", TARGET_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// A function a client can invoke through an event.
///
/// Only the target and flags are serialized; the function stays on the
/// server and is looked up by target when an event arrives.
#[derive(Clone)]
pub struct EventHandler {
    function: HandlerFn,
    target: String,
    prevent_default: bool,
    stop_propagation: bool,
}

impl EventHandler {
    /// Wrap a synchronous handler.
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        Self::from_fn(Arc::new(move |data| {
            function(data);
            futures_util::future::ready(()).boxed()
        }))
    }

    /// Wrap an asynchronous handler.
    pub fn new_async<F, Fut>(function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::from_fn(Arc::new(move |data| function(data).boxed()))
    }

    fn from_fn(function: HandlerFn) -> Self {
        Self {
            function,
            target: next_target(),
            prevent_default: false,
            stop_propagation: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn prevent_default(mut self) -> Self {
        self.prevent_default = true;
        self
    }

    pub fn stop_propagation(mut self) -> Self {
        self.stop_propagation = true;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn call(&self, data: Vec<Value>) {
        (self.function)(data).await
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.function, &other.function)
            && self.target == other.target
            && self.prevent_default == other.prevent_default
            && self.stop_propagation == other.stop_propagation
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("target", &self.target)
            .field("prevent_default", &self.prevent_default)
            .field("stop_propagation", &self.stop_propagation)
            .finish()
    }
}

impl Serialize for EventHandler {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EventHandler", 3)?;
        state.serialize_field("target", &self.target)?;
        state.serialize_field("preventDefault", &self.prevent_default)?;
        state.serialize_field("stopPropagation", &self.stop_propagation)?;
        state.end()
    }
}

/// JavaScript source attached to an `on*` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InlineJavaScript(pub String);

impl From<&str> for InlineJavaScript {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SourceType {
    #[serde(rename = "URL")]
    Url,
    #[default]
    #[serde(rename = "NAME")]
    Name,
}

/// Where a client loads a custom component implementation from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSource {
    pub source: String,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Box<Child>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmount_before_update: Option<bool>,
}

impl ImportSource {
    pub fn new(source: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            source: source.into(),
            source_type,
            fallback: None,
            unmount_before_update: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<Child>) -> Self {
        self.fallback = Some(Box::new(fallback.into()));
        self
    }

    pub fn unmount_before_update(mut self, unmount: bool) -> Self {
        self.unmount_before_update = Some(unmount);
        self
    }
}

/// A child of a node.
#[derive(Clone)]
pub enum Child {
    Text(String),
    Node(VdomNode),
    /// A component the layout has yet to render. Cannot be serialized.
    Component(ComponentRef),
}

impl Child {
    pub fn as_node(&self) -> Option<&VdomNode> {
        match self {
            Child::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Child::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl PartialEq for Child {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Child::Text(a), Child::Text(b)) => a == b,
            (Child::Node(a), Child::Node(b)) => a == b,
            (Child::Component(a), Child::Component(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Text(text) => write!(f, "{text:?}"),
            Child::Node(node) => node.fmt(f),
            Child::Component(component) => write!(f, "<{}>", component.type_name()),
        }
    }
}

impl Serialize for Child {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Child::Text(text) => serializer.serialize_str(text),
            Child::Node(node) => node.serialize(serializer),
            Child::Component(component) => Err(S::Error::custom(format!(
                "component '{}' must be rendered before serialization",
                component.type_name()
            ))),
        }
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value)
    }
}

impl From<VdomNode> for Child {
    fn from(value: VdomNode) -> Self {
        Child::Node(value)
    }
}

impl From<ComponentRef> for Child {
    fn from(value: ComponentRef) -> Self {
        Child::Component(value)
    }
}

/// An immutable element of the UI tree.
///
/// Nodes are built by [`VdomConstructor`](super::VdomConstructor) or with
/// the consuming `with_*` methods. A node either describes an element
/// (non-empty tag name) or, when `error` is set, a failed render with an
/// empty tag name.
#[derive(Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VdomNode {
    tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<Key>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    attributes: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Child>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    event_handlers: IndexMap<String, EventHandler>,
    #[serde(rename = "inlineJavaScript", skip_serializing_if = "IndexMap::is_empty")]
    inline_javascript: IndexMap<String, InlineJavaScript>,
    #[serde(skip_serializing_if = "Option::is_none")]
    import_source: Option<ImportSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl VdomNode {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    /// A node without a tag that only groups its children.
    pub fn fragment(children: Vec<Child>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    /// The node a layout substitutes for a component that failed to render.
    pub fn error_node(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub(crate) fn from_parts(
        tag_name: String,
        key: Option<Key>,
        attributes: IndexMap<String, Value>,
        children: Vec<Child>,
        event_handlers: IndexMap<String, EventHandler>,
        inline_javascript: IndexMap<String, InlineJavaScript>,
        import_source: Option<ImportSource>,
    ) -> Self {
        Self {
            tag_name,
            key,
            attributes,
            children,
            event_handlers,
            inline_javascript,
            import_source,
            error: None,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn event_handlers(&self) -> &IndexMap<String, EventHandler> {
        &self.event_handlers
    }

    pub fn inline_javascript(&self) -> &IndexMap<String, InlineJavaScript> {
        &self.inline_javascript
    }

    pub fn import_source(&self) -> Option<&ImportSource> {
        self.import_source.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_event_handler(mut self, name: impl Into<String>, handler: EventHandler) -> Self {
        self.event_handlers.insert(name.into(), handler);
        self
    }

    pub fn with_import_source(mut self, import_source: ImportSource) -> Self {
        self.import_source = Some(import_source);
        self
    }

    /// Depth-first search for the handler registered under `target`.
    pub fn find_event_handler(&self, target: &str) -> Option<&EventHandler> {
        self.event_handlers
            .values()
            .find(|handler| handler.target() == target)
            .or_else(|| {
                self.children
                    .iter()
                    .filter_map(Child::as_node)
                    .find_map(|child| child.find_event_handler(target))
            })
    }

    /// The wire JSON of this node.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl fmt::Debug for VdomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("VdomNode");
        debug.field("tag_name", &self.tag_name);
        if let Some(key) = &self.key {
            debug.field("key", key);
        }
        if !self.attributes.is_empty() {
            debug.field("attributes", &self.attributes);
        }
        if !self.children.is_empty() {
            debug.field("children", &self.children);
        }
        if !self.event_handlers.is_empty() {
            debug.field("event_handlers", &self.event_handlers);
        }
        if !self.inline_javascript.is_empty() {
            debug.field("inline_javascript", &self.inline_javascript);
        }
        if let Some(import_source) = &self.import_source {
            debug.field("import_source", import_source);
        }
        if let Some(error) = &self.error {
            debug.field("error", error);
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_fields_are_omitted() {
        let node = VdomNode::new("div");
        assert_eq!(node.to_json().unwrap(), json!({"tagName": "div"}));
    }

    #[test]
    fn serializes_wire_shape() {
        let handler = EventHandler::new(|_| {}).with_target("t1").prevent_default();
        let node = VdomNode::new("button")
            .with_key("k")
            .with_attribute("id", "b")
            .with_child("Click")
            .with_event_handler("onClick", handler)
            .with_import_source(
                ImportSource::new("https://example.com/x.js", SourceType::Url)
                    .with_fallback("loading"),
            );

        assert_eq!(
            node.to_json().unwrap(),
            json!({
                "tagName": "button",
                "key": "k",
                "attributes": {"id": "b"},
                "children": ["Click"],
                "eventHandlers": {
                    "onClick": {"target": "t1", "preventDefault": true, "stopPropagation": false}
                },
                "importSource": {
                    "source": "https://example.com/x.js",
                    "sourceType": "URL",
                    "fallback": "loading"
                }
            })
        );
    }

    #[test]
    fn error_nodes_have_empty_tags() {
        let node = VdomNode::error_node("render failed");
        assert_eq!(node.tag_name(), "");
        assert_eq!(
            node.to_json().unwrap(),
            json!({"tagName": "", "error": "render failed"})
        );
    }

    #[test]
    fn handler_targets_are_unique() {
        let a = EventHandler::new(|_| {});
        let b = EventHandler::new(|_| {});
        assert_ne!(a.target(), b.target());
    }

    #[test]
    fn finds_nested_handlers() {
        let handler = EventHandler::new(|_| {}).with_target("deep");
        let node = VdomNode::new("div").with_child(
            VdomNode::new("p").with_child(VdomNode::new("button").with_event_handler("onClick", handler)),
        );
        assert!(node.find_event_handler("deep").is_some());
        assert!(node.find_event_handler("missing").is_none());
    }

    #[tokio::test]
    async fn handlers_receive_event_data() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handler = EventHandler::new(move |data| seen_clone.lock().extend(data));

        handler.call(vec![json!(1), json!("x")]).await;
        assert_eq!(*seen.lock(), vec![json!(1), json!("x")]);
    }

    #[test]
    fn keys_accept_strings_and_numbers() {
        assert_eq!(Key::from_json(&json!("a")), Some(Key::from("a")));
        assert_eq!(Key::from_json(&json!(3)), Some(Key::from(3i64)));
        assert_eq!(Key::from_json(&json!(null)), None);
        assert_eq!(Key::from(7i64).to_string(), "7");
    }
}
