//! Input validation for confirmations and guestbook messages.
//!
//! Both validators take the raw JSON body and return a normalized draft or the
//! first rule it breaks. Strings are trimmed before their length is checked and
//! lengths count Unicode scalar values.

use serde_json::{Map, Value};
use thiserror::Error;

pub const NAME_MAX: usize = 100;
pub const NOTE_MAX: usize = 500;
pub const CONTENT_MAX: usize = 500;
pub const QUANTITY_MIN: i64 = 1;
pub const QUANTITY_MAX: i64 = 10;

/// The first rule a payload failed. `Display` is the message shown to guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Dados inválidos")]
    Malformed,
    #[error("Nome é obrigatório")]
    NameRequired,
    #[error("Nome muito longo")]
    NameTooLong,
    #[error("Quantidade inválida")]
    QuantityInvalid,
    #[error("Mínimo 1 pessoa")]
    QuantityTooLow,
    #[error("Máximo 10 pessoas")]
    QuantityTooHigh,
    #[error("Observação inválida")]
    NoteInvalid,
    #[error("Observação muito longa")]
    NoteTooLong,
    #[error("Mensagem é obrigatória")]
    ContentRequired,
    #[error("Mensagem muito longa")]
    ContentTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationDraft {
    pub name: String,
    pub quantity: u32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub name: String,
    pub content: String,
}

trait GetField {
    /// `Ok(None)` when the field is absent or `null`, `Err(())` when it holds
    /// something other than a string.
    fn get_str_field(&self, field: &str) -> Result<Option<&str>, ()>;
}

impl GetField for Map<String, Value> {
    fn get_str_field(&self, field: &str) -> Result<Option<&str>, ()> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(()),
        }
    }
}

pub fn validate_confirmation(input: &Value) -> Result<ConfirmationDraft, ValidationError> {
    let fields = input.as_object().ok_or(ValidationError::Malformed)?;

    let name = required_name(fields)?;

    let quantity = match fields.get("quantity") {
        None | Some(Value::Null) => QUANTITY_MIN,
        Some(v) => whole_number(v).ok_or(ValidationError::QuantityInvalid)?,
    };
    if quantity < QUANTITY_MIN {
        return Err(ValidationError::QuantityTooLow);
    }
    if quantity > QUANTITY_MAX {
        return Err(ValidationError::QuantityTooHigh);
    }

    let note = fields
        .get_str_field("note")
        .map_err(|()| ValidationError::NoteInvalid)?
        .map(str::trim)
        .filter(|note| !note.is_empty());
    if note.is_some_and(|note| note.chars().count() > NOTE_MAX) {
        return Err(ValidationError::NoteTooLong);
    }

    Ok(ConfirmationDraft {
        name,
        quantity: quantity as u32,
        note: note.map(str::to_owned),
    })
}

/// The body may arrive as `content` or, from the older guestbook widget, as
/// `message`. `content` wins when both are sent.
pub fn validate_message(input: &Value) -> Result<MessageDraft, ValidationError> {
    let fields = input.as_object().ok_or(ValidationError::Malformed)?;

    let name = required_name(fields)?;

    let raw = match fields.get_str_field("content") {
        Ok(Some(content)) => Some(content),
        Ok(None) => fields.get_str_field("message").ok().flatten(),
        Err(()) => None,
    };
    let content = raw
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .ok_or(ValidationError::ContentRequired)?;
    if content.chars().count() > CONTENT_MAX {
        return Err(ValidationError::ContentTooLong);
    }

    Ok(MessageDraft {
        name,
        content: content.to_owned(),
    })
}

/// Integers, and floats with no fractional part (`2.0`, `1e3`). Out-of-range
/// floats saturate so the range checks still name the right bound.
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn required_name(fields: &Map<String, Value>) -> Result<String, ValidationError> {
    let name = fields
        .get_str_field("name")
        .ok()
        .flatten()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ValidationError::NameRequired)?;

    if name.chars().count() > NAME_MAX {
        return Err(ValidationError::NameTooLong);
    }

    Ok(name.to_owned())
}
