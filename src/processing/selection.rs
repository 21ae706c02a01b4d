//! Ownership-checked selection of a document set.

use serde_json::Value;

use super::types::{FieldErrors, SelectionError};
use super::upload::REQUIRED;
use crate::store::{DocumentSet, DocumentStore};

/// Rejection shown for any id that is unknown or belongs to someone else.
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

const FIELD: &str = "document_set";

/// Interpret a submitted choice. Accepts integers and numeric strings.
pub fn parse_choice(raw: Option<&Value>) -> Result<i64, FieldErrors> {
    match raw {
        None | Some(Value::Null) => Err(FieldErrors::single(FIELD, REQUIRED)),
        Some(Value::String(text)) if text.trim().is_empty() => {
            Err(FieldErrors::single(FIELD, REQUIRED))
        }
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or_else(|| FieldErrors::single(FIELD, INVALID_CHOICE)),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map_err(|_| FieldErrors::single(FIELD, INVALID_CHOICE)),
        Some(_) => Err(FieldErrors::single(FIELD, INVALID_CHOICE)),
    }
}

/// Resolve `raw` to a set owned by `owner_id`.
///
/// Unknown ids and ids owned by other users produce the same rejection.
pub async fn select_document_set(
    store: &DocumentStore,
    owner_id: i64,
    raw: Option<&Value>,
) -> Result<DocumentSet, SelectionError> {
    let set_id = parse_choice(raw).map_err(SelectionError::Invalid)?;
    match store.find_owned(owner_id, set_id).await? {
        Some(set) => Ok(set),
        None => {
            tracing::info!(owner_id, set_id, "Rejected document set selection");
            Err(SelectionError::Invalid(FieldErrors::single(
                FIELD,
                INVALID_CHOICE,
            )))
        }
    }
}
