//! Partial updates applied to a single document by identity.
//!
//! ```ignore
//! use docbase::update::Update;
//!
//! let update = Update::new()
//!     .set("name", "Bob")
//!     .inc("logins", 1)
//!     .unset("nickname");
//! ```

use bson::{Bson, Document as BsonDocument};

/// One field-level modification.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Replaces the field's value, creating the field if missing.
    Set(String, Bson),
    /// Removes the field.
    Unset(String),
    /// Adds a numeric amount to the field, treating a missing field as zero.
    Inc(String, Bson),
}

impl UpdateOp {
    /// Returns the name of the field this operation touches.
    pub fn field(&self) -> &str {
        match self {
            UpdateOp::Set(field, _) | UpdateOp::Unset(field) | UpdateOp::Inc(field, _) => field,
        }
    }
}

/// An ordered list of [`UpdateOp`]s.
///
/// An empty update leaves the document untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Inc(field.into(), amount.into()));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns `true` if any operation touches the given field.
    pub fn touches(&self, field: &str) -> bool {
        self.ops.iter().any(|op| op.field() == field)
    }
}

/// Sets every field of the document.
impl From<BsonDocument> for Update {
    fn from(document: BsonDocument) -> Self {
        Self {
            ops: document
                .into_iter()
                .map(|(field, value)| UpdateOp::Set(field, value))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn document_becomes_set_operations() {
        let update = Update::from(doc! { "name": "Bob", "age": 42 });

        assert_eq!(
            update.ops(),
            &[
                UpdateOp::Set("name".into(), Bson::from("Bob")),
                UpdateOp::Set("age".into(), Bson::Int32(42)),
            ]
        );
        assert!(update.touches("age"));
        assert!(!update.touches("id"));
    }

    #[test]
    fn new_update_is_empty() {
        assert!(Update::new().is_empty());
        assert!(!Update::new().unset("x").is_empty());
    }
}
