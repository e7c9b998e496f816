//! Domain models stored in the durable store.
//!
//! Field names serialize in camelCase to match the stored document schema.
//! Permission predicates live on the models; services enforce them and map
//! refusals to [`EngineError::Forbidden`](crate::error::EngineError).

pub mod item;
pub mod list;
pub mod user;

pub use item::ShoppingItem;
pub use list::{ListRules, ShoppingList};
pub use user::User;

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::store::Document;

/// Encode a model value for a field write.
pub(crate) fn to_wire<T: Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value)
        .map_err(|e| EngineError::DataCorruption(format!("field encode failed: {e}")))
}

/// Decode a document into a model, injecting the document id under `id`.
pub(crate) fn decode_with_id<T: serde::de::DeserializeOwned>(
    doc: &Document,
    kind: &str,
) -> Result<T, EngineError> {
    let mut fields = doc.fields.clone();
    fields.insert("id".to_owned(), Value::String(doc.id.clone()));
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| EngineError::DataCorruption(format!("invalid {kind} document {}: {e}", doc.id)))
}
