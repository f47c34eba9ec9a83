//! Virtual DOM
//!
//! The immutable, serializable description of UI state that components
//! produce and renderers send to clients.
//!
//! - [`VdomNode`] and its parts model the tree.
//! - [`VdomConstructor`] builds nodes from loose arguments, flattening
//!   child lists and sorting attributes into handlers and scripts.
//! - [`validate_vdom_json`] checks serialized trees.
//! - [`Component`] is the seam between the tree and the hook runtime.

mod component;
mod constructor;
mod node;
mod schema;

pub use component::{Component, ComponentRef, FnComponent};
pub use constructor::{
    flatten_children, vdom, Attributes, ChildDiagnostic, VdomArg, VdomChild, VdomConstructor,
};
pub use node::{Child, EventHandler, ImportSource, InlineJavaScript, Key, SourceType, VdomNode};
pub use schema::{validate_vdom_json, vdom_json_schema};
