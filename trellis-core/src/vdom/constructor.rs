//! Node Construction
//!
//! [`VdomConstructor`] turns a loose argument list into a [`VdomNode`]:
//!
//! - a leading [`VdomArg::Attributes`] supplies the attributes;
//! - every other argument is a child, and nested lists or iterators of
//!   children are flattened in order;
//! - handler attributes become event handlers, `on*` attributes with text
//!   values become inline JavaScript and `key` becomes the node key.
//!
//! In debug mode the children of every list are checked for keys, since
//! siblings produced from data cannot be told apart without one.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::component::ComponentRef;
use super::node::{Child, EventHandler, ImportSource, InlineJavaScript, Key, VdomNode};
use crate::config::RuntimeConfig;
use crate::error::VdomError;

fn event_attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^on[A-Z]\w+").expect("event attribute pattern is valid"))
}

#[derive(Clone)]
enum AttributeValue {
    Json(Value),
    NotJson(String),
    Handler(EventHandler),
    Script(InlineJavaScript),
}

/// Attributes given to a constructor, before they are sorted into plain
/// attributes, event handlers and inline JavaScript.
#[derive(Clone, Default)]
pub struct Attributes {
    entries: IndexMap<String, AttributeValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute to any serializable value.
    ///
    /// A value that cannot be represented as JSON is remembered as such and
    /// reported when the node is constructed.
    pub fn set(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let value = match serde_json::to_value(value) {
            Ok(json) => AttributeValue::Json(json),
            Err(err) => AttributeValue::NotJson(err.to_string()),
        };
        self.entries.insert(name.into(), value);
        self
    }

    pub fn key(self, key: impl Into<Key>) -> Self {
        self.set("key", key.into())
    }

    pub fn handler(mut self, name: impl Into<String>, handler: EventHandler) -> Self {
        self.entries.insert(name.into(), AttributeValue::Handler(handler));
        self
    }

    /// Shorthand for a synchronous [`EventHandler`].
    pub fn on<F>(self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        self.handler(name, EventHandler::new(function))
    }

    pub fn script(mut self, name: impl Into<String>, script: impl Into<InlineJavaScript>) -> Self {
        self.entries.insert(name.into(), AttributeValue::Script(script.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// A child argument, possibly a collection of children to be flattened.
pub enum VdomChild {
    Text(String),
    Node(VdomNode),
    Component(ComponentRef),
    /// A finite list. Its items are checked for keys in debug mode.
    List(Vec<VdomChild>),
    /// A one-shot sequence whose keys cannot be checked ahead of time.
    Iter(Box<dyn Iterator<Item = VdomChild> + Send>),
}

impl VdomChild {
    pub fn iter<I>(children: I) -> Self
    where
        I: IntoIterator<Item = VdomChild>,
        I::IntoIter: Send + 'static,
    {
        VdomChild::Iter(Box::new(children.into_iter()))
    }

    fn missing_key(&self) -> Option<String> {
        match self {
            VdomChild::Node(node) if node.key().is_none() => Some(format!("<{}>", node.tag_name())),
            VdomChild::Component(component) if component.key().is_none() => {
                Some(format!("<{}>", component.type_name()))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for VdomChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VdomChild::Text(text) => write!(f, "{text:?}"),
            VdomChild::Node(node) => node.fmt(f),
            VdomChild::Component(component) => write!(f, "<{}>", component.type_name()),
            VdomChild::List(items) => f.debug_list().entries(items).finish(),
            VdomChild::Iter(_) => f.write_str("<iterator>"),
        }
    }
}

impl From<&str> for VdomChild {
    fn from(value: &str) -> Self {
        VdomChild::Text(value.to_string())
    }
}

impl From<String> for VdomChild {
    fn from(value: String) -> Self {
        VdomChild::Text(value)
    }
}

impl From<VdomNode> for VdomChild {
    fn from(value: VdomNode) -> Self {
        VdomChild::Node(value)
    }
}

impl From<ComponentRef> for VdomChild {
    fn from(value: ComponentRef) -> Self {
        VdomChild::Component(value)
    }
}

impl<T: Into<VdomChild>> From<Vec<T>> for VdomChild {
    fn from(value: Vec<T>) -> Self {
        VdomChild::List(value.into_iter().map(Into::into).collect())
    }
}

/// One argument to [`VdomConstructor::call`].
#[derive(Debug)]
pub enum VdomArg {
    Attributes(Attributes),
    Child(VdomChild),
}

impl From<Attributes> for VdomArg {
    fn from(value: Attributes) -> Self {
        VdomArg::Attributes(value)
    }
}

impl From<VdomChild> for VdomArg {
    fn from(value: VdomChild) -> Self {
        VdomArg::Child(value)
    }
}

impl From<&str> for VdomArg {
    fn from(value: &str) -> Self {
        VdomArg::Child(value.into())
    }
}

impl From<String> for VdomArg {
    fn from(value: String) -> Self {
        VdomArg::Child(value.into())
    }
}

impl From<VdomNode> for VdomArg {
    fn from(value: VdomNode) -> Self {
        VdomArg::Child(value.into())
    }
}

impl From<ComponentRef> for VdomArg {
    fn from(value: ComponentRef) -> Self {
        VdomArg::Child(value.into())
    }
}

impl<T: Into<VdomChild>> From<Vec<T>> for VdomArg {
    fn from(value: Vec<T>) -> Self {
        VdomArg::Child(value.into())
    }
}

/// Build a `Vec<VdomArg>` converting each element with `VdomArg::from`.
///
/// ```rust,ignore
/// let div = VdomConstructor::new("div");
/// div.call(vdom_args![Attributes::new().key("a"), "x", vec!["y", "z"]])?;
/// ```
#[macro_export]
macro_rules! vdom_args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::vdom::VdomArg::from($arg)),*]
    };
}

/// Problems with the children of a list found while flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildDiagnostic {
    MissingKey { child: String },
    UnverifiedIterator,
}

impl fmt::Display for ChildDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildDiagnostic::MissingKey { child } => {
                write!(f, "key not specified for child in list {child}")
            }
            ChildDiagnostic::UnverifiedIterator => f.write_str(
                "did not verify key integrity of children in iterator; pass a list to verify",
            ),
        }
    }
}

/// Flatten `children` in order. Key diagnostics are only collected when
/// `check_keys` is set.
pub fn flatten_children(
    children: Vec<VdomChild>,
    check_keys: bool,
) -> (Vec<Child>, Vec<ChildDiagnostic>) {
    let mut flat = Vec::with_capacity(children.len());
    let mut diagnostics = Vec::new();
    flatten_into(children, check_keys, &mut flat, &mut diagnostics);
    (flat, diagnostics)
}

fn flatten_into(
    children: impl IntoIterator<Item = VdomChild>,
    check_keys: bool,
    flat: &mut Vec<Child>,
    diagnostics: &mut Vec<ChildDiagnostic>,
) {
    for child in children {
        match child {
            VdomChild::Text(text) => flat.push(Child::Text(text)),
            VdomChild::Node(node) => flat.push(Child::Node(node)),
            VdomChild::Component(component) => flat.push(Child::Component(component)),
            VdomChild::List(items) => {
                if check_keys {
                    diagnostics.extend(
                        items
                            .iter()
                            .filter_map(VdomChild::missing_key)
                            .map(|child| ChildDiagnostic::MissingKey { child }),
                    );
                }
                flatten_into(items, check_keys, flat, diagnostics);
            }
            VdomChild::Iter(items) => {
                if check_keys {
                    diagnostics.push(ChildDiagnostic::UnverifiedIterator);
                }
                flatten_into(items, check_keys, flat, diagnostics);
            }
        }
    }
}

/// Builds nodes of one tag.
#[derive(Debug, Clone)]
pub struct VdomConstructor {
    tag_name: String,
    allow_children: bool,
    import_source: Option<ImportSource>,
}

impl VdomConstructor {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            allow_children: true,
            import_source: None,
        }
    }

    /// A constructor for void elements such as `img` or `input`.
    pub fn childless(tag_name: impl Into<String>) -> Self {
        Self {
            allow_children: false,
            ..Self::new(tag_name)
        }
    }

    pub fn with_import_source(mut self, import_source: ImportSource) -> Self {
        self.import_source = Some(import_source);
        self
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// A constructor for a component exported under this one, for example
    /// `Chart.Legend`. Only web module constructors have members.
    pub fn member(&self, name: &str) -> Result<Self, VdomError> {
        let Some(import_source) = &self.import_source else {
            return Err(VdomError::NotAWebModule {
                tag: self.tag_name.clone(),
            });
        };
        Ok(Self {
            tag_name: format!("{}.{}", self.tag_name, name),
            allow_children: self.allow_children,
            import_source: Some(import_source.clone()),
        })
    }

    /// Build a node using the process-wide [`RuntimeConfig`].
    pub fn call(&self, args: Vec<VdomArg>) -> Result<VdomNode, VdomError> {
        self.call_with(&RuntimeConfig::current(), args)
    }

    pub fn call_with(&self, config: &RuntimeConfig, args: Vec<VdomArg>) -> Result<VdomNode, VdomError> {
        let mut args = args.into_iter().enumerate().peekable();
        let attributes = match args.next_if(|(_, arg)| matches!(arg, VdomArg::Attributes(_))) {
            Some((_, VdomArg::Attributes(attributes))) => attributes,
            _ => Attributes::default(),
        };

        let mut children = Vec::new();
        for (position, arg) in args {
            match arg {
                VdomArg::Child(child) => children.push(child),
                VdomArg::Attributes(_) => {
                    return Err(VdomError::MisplacedAttributes {
                        tag: self.tag_name.clone(),
                        position,
                    })
                }
            }
        }

        let (children, diagnostics) = flatten_children(children, config.debug);
        for diagnostic in &diagnostics {
            warn!(tag = %self.tag_name, "{diagnostic}");
        }
        if !children.is_empty() && !self.allow_children {
            return Err(VdomError::ChildrenNotAllowed {
                tag: self.tag_name.clone(),
            });
        }

        let mut key = None;
        let mut plain = IndexMap::new();
        let mut event_handlers = IndexMap::new();
        let mut inline_javascript = IndexMap::new();
        for (name, value) in attributes.entries {
            match value {
                AttributeValue::Handler(handler) => {
                    event_handlers.insert(name, handler);
                }
                AttributeValue::Script(script) => {
                    inline_javascript.insert(name, script);
                }
                AttributeValue::Json(Value::String(text))
                    if event_attribute_pattern().is_match(&name) =>
                {
                    inline_javascript.insert(name, InlineJavaScript(text));
                }
                AttributeValue::Json(value) if name == "key" => {
                    key = Key::from_json(&value);
                    if key.is_none() && !value.is_null() {
                        warn!(tag = %self.tag_name, ?value, "ignoring key that is neither text nor a number");
                    }
                }
                AttributeValue::Json(value) => {
                    plain.insert(name, value);
                }
                AttributeValue::NotJson(reason) => {
                    if config.check_json_attrs {
                        return Err(VdomError::AttributeNotJson { name, reason });
                    }
                    warn!(tag = %self.tag_name, attribute = %name, %reason, "dropping attribute that is not JSON serializable");
                }
            }
        }

        Ok(VdomNode::from_parts(
            self.tag_name.clone(),
            key,
            plain,
            children,
            event_handlers,
            inline_javascript,
            self.import_source.clone(),
        ))
    }
}

/// Build a node for `tag_name` in one call.
pub fn vdom(tag_name: &str, args: Vec<VdomArg>) -> Result<VdomNode, VdomError> {
    VdomConstructor::new(tag_name).call(args)
}
