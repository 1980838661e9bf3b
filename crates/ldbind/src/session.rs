//! Edit sessions: a single field's in-progress edit.
//!
//! A session holds the last committed value (`initial`) and the value being
//! typed (`current`), both in field-text form. It is dirty when the two
//! differ. Commits are driven from outside:
//!
//! ```text
//! Idle --input--> Editing --begin_commit (not dirty)--> Idle
//!                         --begin_commit (dirty)------> Saving --finish_commit--> Idle
//! ```

use tracing::debug;

use crate::codec::{parse_field_text, to_field_text, FieldText};
use crate::config::HostCapabilities;
use crate::model::{DataType, TypedValue};
use crate::util::datetime::{join_local, split_local};
use crate::validate::validate_input;

/// Where a session is in its edit/commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Editing,
    Saving,
}

/// Why a commit did not go ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The current value equals the last committed value.
    NotDirty,
    /// The input failed its type's constraint validation.
    InvalidInput,
    /// A save for this session is already in flight.
    InFlight,
}

/// Result of asking a session to commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitDecision {
    /// Nothing to persist.
    Skip(SkipReason),
    /// Persist this value (`None` clears the property).
    Save(Option<TypedValue>),
}

/// In-progress edit state for one field.
#[derive(Debug, Clone)]
pub struct EditSession {
    data_type: DataType,
    host: HostCapabilities,
    initial: FieldText,
    current: FieldText,
    /// Date and time sub-fields, when the host lacks a combined input.
    parts: Option<(String, String)>,
    committing: Option<FieldText>,
    state: SessionState,
}

impl EditSession {
    /// Starts a session seeded from a resolved value.
    pub fn new(data_type: DataType, value: Option<&TypedValue>, host: HostCapabilities) -> Self {
        let initial = to_field_text(data_type, value, &host);
        let parts = split_parts(data_type, &host, &initial);
        Self {
            data_type,
            host,
            current: initial.clone(),
            initial,
            parts,
            committing: None,
            state: SessionState::Idle,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The last committed value.
    pub fn initial(&self) -> &FieldText {
        &self.initial
    }

    /// The value as currently typed.
    pub fn current(&self) -> &FieldText {
        &self.current
    }

    /// Whether the current value differs from the last committed one.
    pub fn is_dirty(&self) -> bool {
        self.current != self.initial
    }

    /// The date sub-field, when datetimes are edited in two parts.
    pub fn date_part(&self) -> Option<&str> {
        self.parts.as_ref().map(|(d, _)| d.as_str())
    }

    /// The time sub-field, when datetimes are edited in two parts.
    pub fn time_part(&self) -> Option<&str> {
        self.parts.as_ref().map(|(_, t)| t.as_str())
    }

    /// Records raw input. Never persists.
    ///
    /// For boolean fields, `"true"` checks the toggle and anything else clears it.
    pub fn input(&mut self, raw: impl Into<String>) {
        let raw = raw.into();
        self.current = match self.data_type {
            DataType::Boolean => FieldText::Checked(raw == "true"),
            _ => FieldText::Text(raw),
        };
        self.parts = split_parts(self.data_type, &self.host, &self.current);
        self.mark_editing();
    }

    /// Sets the checked state of a boolean field.
    pub fn set_checked(&mut self, checked: bool) {
        self.current = FieldText::Checked(checked);
        self.mark_editing();
    }

    /// Updates the date sub-field and recombines the datetime.
    pub fn input_date_part(&mut self, date: impl Into<String>) {
        let time = self.time_part().unwrap_or_default().to_string();
        self.set_parts(date.into(), time);
    }

    /// Updates the time sub-field and recombines the datetime.
    ///
    /// While the date part is empty the combined value stays empty, so the
    /// field is not dirty. The time is kept in [`time_part`](Self::time_part)
    /// and joins the date once one is entered.
    pub fn input_time_part(&mut self, time: impl Into<String>) {
        let date = self.date_part().unwrap_or_default().to_string();
        self.set_parts(date, time.into());
    }

    fn set_parts(&mut self, date: String, time: String) {
        self.current = FieldText::Text(join_local(&date, &time));
        self.parts = Some((date, time));
        self.mark_editing();
    }

    fn mark_editing(&mut self) {
        if self.state != SessionState::Saving {
            self.state = SessionState::Editing;
        }
    }

    /// Blur-equivalent: decides whether the current value should be persisted.
    ///
    /// Invalid input is skipped silently. A `Save` decision moves the session
    /// to [`SessionState::Saving`] until [`finish_commit`](Self::finish_commit).
    pub fn begin_commit(&mut self) -> CommitDecision {
        if self.state == SessionState::Saving {
            return CommitDecision::Skip(SkipReason::InFlight);
        }
        if self.data_type.is_constrained() && !validate_input(self.data_type, &self.current) {
            debug!(data_type = %self.data_type, input = self.current.as_text(), "input failed validation, skipping commit");
            self.state = SessionState::Idle;
            return CommitDecision::Skip(SkipReason::InvalidInput);
        }
        if !self.is_dirty() {
            self.state = SessionState::Idle;
            return CommitDecision::Skip(SkipReason::NotDirty);
        }
        match parse_field_text(self.data_type, &self.current, &self.host) {
            Ok(value) => {
                self.committing = Some(self.current.clone());
                self.state = SessionState::Saving;
                CommitDecision::Save(value)
            }
            Err(e) => {
                debug!(error = %e, "unparseable input, skipping commit");
                self.state = SessionState::Idle;
                CommitDecision::Skip(SkipReason::InvalidInput)
            }
        }
    }

    /// Completes a commit started by [`begin_commit`](Self::begin_commit).
    ///
    /// On success the committed value becomes `initial`; on failure the typed
    /// value is kept as it is.
    pub fn finish_commit(&mut self, saved: bool) {
        let committed = self.committing.take();
        if saved {
            if let Some(committed) = committed {
                self.initial = committed;
            }
        }
        self.state = SessionState::Idle;
    }

    /// Completes a commit that did not need to persist (local-only edits).
    pub fn accept_local(&mut self) {
        self.initial = self.current.clone();
        self.committing = None;
        self.state = SessionState::Idle;
    }

    /// Re-seeds the session after the value changed upstream.
    ///
    /// Ignored while a save is in flight.
    pub fn reseed(&mut self, value: Option<&TypedValue>) {
        if self.state == SessionState::Saving {
            return;
        }
        let text = to_field_text(self.data_type, value, &self.host);
        self.parts = split_parts(self.data_type, &self.host, &text);
        self.initial = text.clone();
        self.current = text;
        self.state = SessionState::Idle;
    }
}

fn split_parts(data_type: DataType, host: &HostCapabilities, text: &FieldText) -> Option<(String, String)> {
    if data_type != DataType::Datetime || host.datetime_local {
        return None;
    }
    Some(split_local(text.as_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Datetime;

    fn host() -> HostCapabilities {
        HostCapabilities::default()
    }

    fn split_host() -> HostCapabilities {
        HostCapabilities { datetime_local: false, utc_offset_min: 0 }
    }

    #[test]
    fn test_clean_commit_is_noop() {
        let value = TypedValue::String("Alice".into());
        let mut s = EditSession::new(DataType::String, Some(&value), host());
        assert_eq!(s.begin_commit(), CommitDecision::Skip(SkipReason::NotDirty));

        s.input("Alice");
        assert_eq!(s.state(), SessionState::Editing);
        assert_eq!(s.begin_commit(), CommitDecision::Skip(SkipReason::NotDirty));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn test_successful_commit_updates_initial() {
        let value = TypedValue::String("Alice".into());
        let mut s = EditSession::new(DataType::String, Some(&value), host());
        s.input("Bob");
        assert!(s.is_dirty());
        assert_eq!(s.begin_commit(), CommitDecision::Save(Some(TypedValue::String("Bob".into()))));
        assert_eq!(s.state(), SessionState::Saving);
        assert_eq!(s.begin_commit(), CommitDecision::Skip(SkipReason::InFlight));

        s.finish_commit(true);
        assert_eq!(s.initial(), &FieldText::Text("Bob".into()));
        assert!(!s.is_dirty());
        assert_eq!(s.begin_commit(), CommitDecision::Skip(SkipReason::NotDirty));
    }

    #[test]
    fn test_failed_commit_keeps_typed_value() {
        let mut s = EditSession::new(DataType::Integer, Some(&TypedValue::Integer(1)), host());
        s.input("2");
        assert_eq!(s.begin_commit(), CommitDecision::Save(Some(TypedValue::Integer(2))));
        s.finish_commit(false);
        assert_eq!(s.current(), &FieldText::Text("2".into()));
        assert_eq!(s.initial(), &FieldText::Text("1".into()));
        assert!(s.is_dirty());
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn test_invalid_numeric_input_skips_silently() {
        let mut s = EditSession::new(DataType::Decimal, Some(&TypedValue::Decimal(1.5)), host());
        s.input("one and a half");
        assert_eq!(s.begin_commit(), CommitDecision::Skip(SkipReason::InvalidInput));
        assert!(s.is_dirty());
    }

    #[test]
    fn test_boolean_dirtiness_is_boolean() {
        let mut s = EditSession::new(DataType::Boolean, Some(&TypedValue::Boolean(false)), host());
        s.set_checked(false);
        assert!(!s.is_dirty());
        s.set_checked(true);
        assert_eq!(s.begin_commit(), CommitDecision::Save(Some(TypedValue::Boolean(true))));
    }

    #[test]
    fn test_missing_value_seeds_empty_field() {
        let s = EditSession::new(DataType::Url, None, host());
        assert_eq!(s.current(), &FieldText::Text(String::new()));
        let s = EditSession::new(DataType::Boolean, None, host());
        assert_eq!(s.current(), &FieldText::Checked(false));
    }

    #[test]
    fn test_split_datetime_parts_recombine() {
        let dt = Datetime::parse("2024-03-15T14:30:00Z").unwrap();
        let mut s = EditSession::new(DataType::Datetime, Some(&TypedValue::Datetime(dt)), split_host());
        assert_eq!(s.date_part(), Some("2024-03-15"));
        assert_eq!(s.time_part(), Some("14:30"));

        s.input_time_part("09:05");
        assert_eq!(s.current().as_text(), "2024-03-15T09:05");
        s.input_date_part("2024-04-01");
        assert_eq!(s.current().as_text(), "2024-04-01T09:05");

        let expected = Datetime::parse("2024-04-01T09:05:00Z").unwrap();
        assert_eq!(s.begin_commit(), CommitDecision::Save(Some(TypedValue::Datetime(expected))));
    }

    #[test]
    fn test_time_without_date_is_held_until_date_arrives() {
        let mut s = EditSession::new(DataType::Datetime, None, split_host());
        s.input_time_part("09:05");
        assert_eq!(s.time_part(), Some("09:05"));
        assert_eq!(s.current().as_text(), "");
        assert!(!s.is_dirty());
        assert_eq!(s.begin_commit(), CommitDecision::Skip(SkipReason::NotDirty));

        s.input_date_part("2024-04-01");
        assert_eq!(s.current().as_text(), "2024-04-01T09:05");
        assert!(s.is_dirty());
    }

    #[test]
    fn test_combined_datetime_has_no_parts() {
        let s = EditSession::new(DataType::Datetime, None, host());
        assert_eq!(s.date_part(), None);
    }

    #[test]
    fn test_reseed_ignored_while_saving() {
        let mut s = EditSession::new(DataType::String, None, host());
        s.input("draft");
        assert!(matches!(s.begin_commit(), CommitDecision::Save(_)));
        s.reseed(Some(&TypedValue::String("server".into())));
        assert_eq!(s.current().as_text(), "draft");

        s.finish_commit(true);
        s.reseed(Some(&TypedValue::String("server".into())));
        assert_eq!(s.current().as_text(), "server");
        assert!(!s.is_dirty());
    }
}
