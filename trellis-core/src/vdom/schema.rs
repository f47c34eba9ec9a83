//! Schema Validation
//!
//! Checks that a JSON value is well-formed serialized VDOM against the
//! VDOM JSON schema shared with clients. The schema is compiled once on
//! first use.
//!
//! Unknown properties are allowed. Errors carry the JSON path of the first
//! offending value, e.g. `$.children[1].key`.

use std::sync::OnceLock;

use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};

use crate::error::ValidationError;

/// The VDOM JSON schema (draft 7).
pub fn vdom_json_schema() -> Value {
    json!({
        "$ref": "#/definitions/element",
        "definitions": {
            "element": {
                "type": "object",
                "properties": {
                    "tagName": {"type": "string"},
                    "key": {"type": ["string", "number", "null"]},
                    "error": {"type": "string"},
                    "children": {"$ref": "#/definitions/elementChildren"},
                    "attributes": {"type": "object"},
                    "eventHandlers": {"$ref": "#/definitions/elementEventHandlers"},
                    "inlineJavaScript": {"$ref": "#/definitions/elementInlineJavaScripts"},
                    "importSource": {"$ref": "#/definitions/importSource"}
                },
                "required": ["tagName"],
                // An error node has an empty tag name.
                "dependencies": {
                    "error": {"properties": {"tagName": {"maxLength": 0}}}
                }
            },
            "elementChildren": {
                "type": "array",
                "items": {"$ref": "#/definitions/elementOrString"}
            },
            "elementEventHandlers": {
                "type": "object",
                "patternProperties": {
                    ".*": {"$ref": "#/definitions/eventHandler"}
                }
            },
            "eventHandler": {
                "type": "object",
                "properties": {
                    "target": {"type": "string"},
                    "preventDefault": {"type": "boolean"},
                    "stopPropagation": {"type": "boolean"}
                },
                "required": ["target"]
            },
            "elementInlineJavaScripts": {
                "type": "object",
                "patternProperties": {
                    ".*": {"type": "string"}
                }
            },
            "importSource": {
                "type": "object",
                "properties": {
                    "source": {"type": "string"},
                    "sourceType": {"enum": ["URL", "NAME"]},
                    "fallback": {
                        "type": ["object", "string", "null"],
                        "if": {"not": {"type": "null"}},
                        "then": {"$ref": "#/definitions/elementOrString"}
                    },
                    "unmountBeforeUpdate": {"type": "boolean"}
                },
                "required": ["source"]
            },
            "elementOrString": {
                "type": ["object", "string"],
                "if": {"type": "object"},
                "then": {"$ref": "#/definitions/element"}
            }
        }
    })
}

fn validator() -> &'static JSONSchema {
    static VALIDATOR: OnceLock<JSONSchema> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&vdom_json_schema())
            .expect("VDOM schema compiles")
    })
}

/// Validate serialized VDOM, returning the first violation found.
pub fn validate_vdom_json(value: &Value) -> Result<(), ValidationError> {
    let Err(mut errors) = validator().validate(value) else {
        return Ok(());
    };
    match errors.next() {
        Some(error) => {
            let message = error.to_string();
            let path = json_path(value, error.instance_path.into_vec());
            Err(ValidationError::new(&path, message))
        }
        None => Ok(()),
    }
}

/// Render a pointer into `root` as `$.name[index]`. Segments that land on an
/// array are written as indices.
fn json_path(root: &Value, segments: Vec<String>) -> String {
    let mut path = String::from("$");
    let mut current = Some(root);
    for segment in segments {
        current = match current {
            Some(Value::Array(items)) => {
                path.push_str(&format!("[{segment}]"));
                segment.parse::<usize>().ok().and_then(|index| items.get(index))
            }
            Some(Value::Object(fields)) => {
                path.push('.');
                path.push_str(&segment);
                fields.get(&segment)
            }
            _ => {
                path.push('.');
                path.push_str(&segment);
                None
            }
        };
    }
    path
}
