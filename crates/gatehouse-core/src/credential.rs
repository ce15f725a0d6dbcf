//! Normalisation of presented card identifiers and free-text notes.

use crate::{Error, Result};

/// Longest card identifier accepted at a reader.
pub const MAX_CREDENTIAL_LEN: usize = 80;

/// Longest note accepted on a badge event.
pub const MAX_NOTE_LEN: usize = 160;

/// Trim a presented card identifier and check that it is a plausible card
/// number: non-empty, digits only, bounded length.
pub fn normalize_credential(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidInput("card identifier is required".into()));
  }
  if trimmed.chars().count() > MAX_CREDENTIAL_LEN {
    return Err(Error::InvalidInput(format!(
      "card identifier must be at most {MAX_CREDENTIAL_LEN} characters"
    )));
  }
  if !trimmed.chars().all(|c| c.is_ascii_digit()) {
    return Err(Error::InvalidInput("card identifier must contain only digits".into()));
  }
  Ok(trimmed.to_owned())
}

/// Blank notes collapse to `None`.
pub fn normalize_note(raw: Option<String>) -> Result<Option<String>> {
  let Some(note) = raw else { return Ok(None) };
  let trimmed = note.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }
  if trimmed.chars().count() > MAX_NOTE_LEN {
    return Err(Error::InvalidInput(format!(
      "notes must be at most {MAX_NOTE_LEN} characters"
    )));
  }
  Ok(Some(trimmed.to_owned()))
}
