//! Edit-in-place controller for list views.
//!
//! # Design
//! The controller owns the view's mirror of a collection and at most one
//! `EditSession`. While a session is open, `sync` refuses to overwrite the
//! mirror so a background refetch cannot clobber unsaved input.
//!
//! A commit sends only the fields whose draft differs from the snapshot
//! taken when editing started. On success the row is replaced by the record
//! the server returned, because the server also stamps `updated_at`, `user`
//! and `status`. On failure the session stays open with the user's draft.

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::add::{FieldKind, FieldValue, NUMBER_MESSAGE};
use crate::client::PowerGuardClient;
use crate::error::{ApiError, FieldErrors};
use crate::resource::{sort_for_display, RecordId, Resource};
use crate::ticket::{Completion, Sequence, Ticket};

/// A record with fields that can be edited inline.
pub trait Editable: Resource {
    /// Fields captured in the draft, in column order.
    const EDITABLE_FIELDS: &'static [&'static str];

    /// Editable fields the server stores as numbers.
    const NUMERIC_FIELDS: &'static [&'static str] = &[];

    /// Current value of `field` as the text an input box would show.
    fn field_text(&self, field: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct EditSession<R> {
    index: usize,
    snapshot: IndexMap<String, String>,
    draft: IndexMap<String, String>,
    current: R,
}

impl<R: Editable> EditSession<R> {
    fn open(index: usize, current: R) -> Self {
        let snapshot: IndexMap<String, String> = R::EDITABLE_FIELDS
            .iter()
            .map(|field| {
                let text = current.field_text(field).unwrap_or_default();
                (field.to_string(), text)
            })
            .collect();
        Self {
            index,
            draft: snapshot.clone(),
            snapshot,
            current,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.draft.get(field).map(String::as_str)
    }

    /// Draft fields that differ from the snapshot.
    pub fn changes(&self) -> IndexMap<String, String> {
        self.draft
            .iter()
            .filter(|(field, value)| self.snapshot.get(*field) != Some(*value))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    /// `changes` with numeric drafts trimmed, or an error for every numeric
    /// draft that is not a finite number.
    fn checked_changes(&self) -> Result<IndexMap<String, String>, FieldErrors> {
        let mut errors = FieldErrors::new();
        let changes = self
            .changes()
            .into_iter()
            .map(|(field, value)| {
                if !R::NUMERIC_FIELDS.contains(&field.as_str()) {
                    return (field, value);
                }
                if FieldValue::parse(FieldKind::Number, &value).is_empty() {
                    errors.insert(field.clone(), NUMBER_MESSAGE.to_string());
                }
                (field, value.trim().to_string())
            })
            .collect();
        if errors.is_empty() {
            Ok(changes)
        } else {
            Err(errors)
        }
    }
}

/// A PATCH handed to the host. Pass it back to `complete_save`.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub record_id: RecordId,
    pub ticket: Ticket,
}

#[derive(Debug)]
pub struct EditController<R: Editable> {
    rows: Vec<R>,
    session: Option<EditSession<R>>,
    error: Option<ApiError>,
    seq: Sequence,
}

impl<R: Editable> Default for EditController<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Editable> EditController<R> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            session: None,
            error: None,
            seq: Sequence::default(),
        }
    }

    /// Mirror the fetched collection in display order. Skipped while a row
    /// is being edited; returns whether the mirror was replaced.
    pub fn sync(&mut self, data: &[R]) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.rows = data.to_vec();
        sort_for_display(&mut self.rows);
        true
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn session(&self) -> Option<&EditSession<R>> {
        self.session.as_ref()
    }

    pub fn editing_index(&self) -> Option<usize> {
        self.session.as_ref().map(EditSession::index)
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Start editing row `index`. Any draft open on another row is dropped.
    pub fn handle_edit(&mut self, index: usize) -> Result<(), ApiError> {
        let row = self.rows.get(index).cloned().ok_or_else(|| {
            ApiError::invalid("index", &format!("row {index} is out of range"))
        })?;
        self.session = Some(EditSession::open(index, row));
        self.error = None;
        Ok(())
    }

    /// Update one draft field. Returns `false` when no row is being edited.
    pub fn handle_input_change(&mut self, field: &str, value: &str) -> Result<bool, ApiError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        match session.draft.get_mut(field) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(true)
            }
            None => Err(ApiError::invalid(field, "field is not editable")),
        }
    }

    /// Update the draft of a single-field editor.
    pub fn set_value(&mut self, value: &str) -> bool {
        let Some(field) = R::EDITABLE_FIELDS.first() else {
            return false;
        };
        matches!(self.handle_input_change(field, value), Ok(true))
    }

    /// Close the session without saving.
    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// Build the PATCH for the open session.
    ///
    /// Returns `Ok(None)` when idle, or when nothing changed (the session is
    /// closed in that case). A numeric draft that does not parse is a
    /// `Validation` error; nothing is sent and the session stays open.
    pub fn handle_save(&mut self, client: &PowerGuardClient) -> Result<Option<PendingSave>, ApiError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        if session.changes().is_empty() {
            self.session = None;
            return Ok(None);
        }
        let record_id = session.current.id();
        let changes = match session.checked_changes() {
            Ok(changes) => changes,
            Err(errors) => {
                warn!(record_id, ?errors, "rejected non-numeric draft");
                let err = ApiError::Validation(errors);
                self.error = Some(err.clone());
                return Err(err);
            }
        };
        let request = match client.build_patch::<R, _>(record_id, &changes) {
            Ok(request) => request,
            Err(err) => {
                self.error = Some(err.clone());
                return Err(err);
            }
        };
        Ok(Some(PendingSave {
            record_id,
            ticket: self.seq.issue(request),
        }))
    }

    /// Apply the host's result for a PATCH built by `handle_save`.
    pub fn complete_save(
        &mut self,
        client: &PowerGuardClient,
        pending: &PendingSave,
        completion: Completion,
    ) -> Result<R, ApiError> {
        let updated = match completion.and_then(|response| client.parse_record::<R>(response)) {
            Ok(updated) => updated,
            Err(err) => {
                warn!(endpoint = %R::ENDPOINT, id = pending.record_id, error = %err, "error updating data");
                self.error = Some(err.clone());
                return Err(err);
            }
        };

        if let Some(row) = self.rows.iter_mut().find(|row| row.id() == pending.record_id) {
            *row = updated.clone();
        }
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.current.id() == pending.record_id)
        {
            self.session = None;
        }
        self.error = None;
        info!(endpoint = %R::ENDPOINT, id = pending.record_id, "record updated");
        Ok(updated)
    }
}
