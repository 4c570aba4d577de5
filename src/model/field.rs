use serde_json::Value;

/// One position in a localized field value: either a leaf string or a
/// sequence of further positions. Any other JSON shape (link objects,
/// numbers, rich text documents) is neither and yields `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Leaf(&'a str),
    Seq(&'a [Value]),
}

impl<'a> Node<'a> {
    pub fn of(value: &'a Value) -> Option<Node<'a>> {
        match value {
            Value::String(s) => Some(Node::Leaf(s.as_str())),
            Value::Array(items) => Some(Node::Seq(items.as_slice())),
            _ => None,
        }
    }
}

/// An English leaf value and the French value found at the same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPair {
    pub english: String,
    pub french: Option<String>,
}

/// A leaf pair located inside a specific entry field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub content_type_id: String,
    pub entry_id: String,
    pub field: String,
    pub english: String,
    pub french: Option<String>,
}

/// Reads a French leaf, treating empty strings and non-string shapes as absent.
pub(crate) fn french_leaf(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
