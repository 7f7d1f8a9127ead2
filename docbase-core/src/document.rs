//! Core traits for document representation and serialization.
//!
//! Every type managed by a repository implements [`Document`]. The trait binds the
//! type to a collection, exposes its identity and names the DTO accepted at creation
//! time.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{DriverResult, HttpError, HttpResult};

/// Name of the field holding a document's identity.
pub const ID_FIELD: &str = "id";

/// Core trait that all documents stored through a repository must implement.
///
/// The identity is assigned by the backend on creation and serialized under
/// [`ID_FIELD`]. Creation payloads are a separate type ([`Document::Create`]) so
/// that callers can never supply database-managed fields.
///
/// # Example
///
/// ```ignore
/// use docbase::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: Uuid,
///     pub name: String,
///     pub email: String,
/// }
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct NewUser {
///     pub name: String,
///     pub email: String,
/// }
///
/// impl Document for User {
///     type Create = NewUser;
///
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// The fields a caller supplies when creating a document.
    ///
    /// Must not serialize an identity field.
    type Create: Serialize + Send + Sync + 'static;

    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// The creation DTO of a document type.
pub type CreateDto<T> = <T as Document>::Create;

/// Extension trait providing serialization utilities for documents.
///
/// Automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DriverResult<Bson>;

    /// Creates a document from a BSON value read from storage.
    fn from_bson(bson: Bson) -> DriverResult<Self>;

    /// Converts this document to a JSON value, e.g. for a response body.
    fn to_json(&self) -> DriverResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DriverResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DriverResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DriverResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DriverResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DriverResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Parses an identity received as text, e.g. from a request path.
///
/// Malformed identities are reported as a validation error on the `id` field.
pub fn parse_id(id: &str) -> HttpResult<Uuid> {
    uuid::Uuid::parse_str(id)
        .map(Uuid::from)
        .map_err(|_| HttpError::validation(ID_FIELD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        id: Uuid,
        label: String,
    }

    impl Document for Tag {
        type Create = ();

        fn id(&self) -> &Uuid {
            &self.id
        }

        fn collection_name() -> &'static str {
            "tags"
        }
    }

    #[test]
    fn documents_convert_to_and_from_bson() {
        let tag = Tag { id: Uuid::new(), label: "rust".into() };

        let bson = tag.to_bson().unwrap();
        let stored = bson.as_document().unwrap();

        assert_eq!(stored.get(ID_FIELD), Some(&Bson::from(tag.id)));
        assert_eq!(stored.get_str("label").unwrap(), "rust");
        assert_eq!(Tag::from_bson(bson).unwrap(), tag);
    }

    #[test]
    fn documents_convert_to_and_from_json() {
        let tag = Tag { id: Uuid::new(), label: "rust".into() };

        let json = tag.to_json().unwrap();

        assert_eq!(json["label"], "rust");
        assert!(json.get(ID_FIELD).is_some());
        assert_eq!(Tag::from_json(json).unwrap(), tag);
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = Tag::from_json(serde_json::json!({ "label": 3 })).unwrap_err();

        assert!(matches!(err, crate::error::DriverError::Serialization(_)));
    }

    #[test]
    fn parse_id_accepts_hyphenated_uuids() {
        let id = Uuid::new();

        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn parse_id_rejects_garbage_as_validation_error() {
        let err = parse_id("not-an-id").unwrap_err();

        assert_eq!(err, HttpError::validation("id"));
        assert_eq!(err.status_code(), 400);
    }
}
