//! Identity keys.
//!
//! A guest may submit the form several times; all of those submissions should land on the same
//! record. The key is the first non-empty field out of phone, email and name, in that order.

use super::RsvpRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("record has no phone, email or name to identify it by")]
    MissingIdentity,
}

pub fn resolve(record: &RsvpRecord) -> Result<String, KeyError> {
    [
        record.phone.as_deref(),
        record.email.as_deref(),
        Some(record.name.as_str()),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|candidate| !candidate.is_empty())
    .map(str::to_string)
    .ok_or(KeyError::MissingIdentity)
}
