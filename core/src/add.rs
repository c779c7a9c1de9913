//! Add-record form controller.
//!
//! # Design
//! Each creatable record declares an ordered form schema. The controller
//! holds one `FieldValue` per schema field, validates required fields
//! before anything is sent, and builds the POST from the full draft.
//!
//! Select inputs draw their options from reference collections (resource
//! choices, plant groups) that load independently of the form. A failure
//! there is kept in `reference_error`, separate from submission errors, so
//! the view can tell "cannot load the form" apart from "cannot save".

use std::collections::HashMap;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::client::PowerGuardClient;
use crate::error::{ApiError, FieldErrors};
use crate::http::HttpRequest;
use crate::query::ListQuery;
use crate::resource::Resource;
use crate::ticket::{Completion, RequestId, Sequence, Ticket};
use crate::types::LoggerPlantGroup;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_CHOICE_MESSAGE: &str = "Select a valid option";
pub const NUMBER_MESSAGE: &str = "A valid number is required";

/// Where a select input gets its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChoiceSource {
    ResourceChoices,
    PlantGroups,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Choice(ChoiceSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
        }
    }
}

/// A record that can be created from a form.
pub trait Creatable: Resource {
    const FORM: &'static [FieldSpec];

    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FORM.iter().find(|spec| spec.name == name)
    }
}

/// One form input. Serializes to `""`, a JSON string, or a JSON number.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Number(f64),
}

impl FieldValue {
    /// Parse raw input for a field of `kind`. Numeric input that is empty or
    /// not a finite number becomes `Empty`.
    pub fn parse(kind: FieldKind, raw: &str) -> Self {
        match kind {
            FieldKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map_or(FieldValue::Empty, FieldValue::Number),
            FieldKind::Text | FieldKind::Choice(_) if raw.is_empty() => FieldValue::Empty,
            FieldKind::Text | FieldKind::Choice(_) => FieldValue::Text(raw.to_string()),
        }
    }

    /// Blank text counts as empty; zero is a value.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Empty => serializer.serialize_str(""),
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// A reference-data request handed to the host.
#[derive(Debug, Clone)]
pub struct ReferenceTicket {
    pub source: ChoiceSource,
    pub ticket: Ticket,
}

#[derive(Debug)]
pub struct AddRecord<R: Creatable> {
    values: IndexMap<&'static str, FieldValue>,
    field_errors: FieldErrors,
    general_error: Option<ApiError>,
    reference_error: Option<ApiError>,
    options: HashMap<ChoiceSource, Vec<SelectOption>>,
    awaiting: HashMap<ChoiceSource, RequestId>,
    submitting: bool,
    seq: Sequence,
    _record: PhantomData<R>,
}

impl<R: Creatable> Default for AddRecord<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Creatable> AddRecord<R> {
    pub fn new() -> Self {
        Self {
            values: R::FORM.iter().map(|spec| (spec.name, FieldValue::Empty)).collect(),
            field_errors: FieldErrors::new(),
            general_error: None,
            reference_error: None,
            options: HashMap::new(),
            awaiting: HashMap::new(),
            submitting: false,
            seq: Sequence::default(),
            _record: PhantomData,
        }
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        R::FORM
    }

    // -----------------------------------------------------------------------
    // Reference data
    // -----------------------------------------------------------------------

    /// Requests for every option source the form uses.
    pub fn reference_requests(&mut self, client: &PowerGuardClient) -> Vec<ReferenceTicket> {
        let mut sources: Vec<ChoiceSource> = Vec::new();
        for spec in R::FORM {
            if let FieldKind::Choice(source) = spec.kind {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }

        self.reference_error = None;
        sources
            .into_iter()
            .map(|source| {
                let request = reference_request(client, source);
                let ticket = self.seq.issue(request);
                self.awaiting.insert(source, ticket.id);
                ReferenceTicket { source, ticket }
            })
            .collect()
    }

    pub fn complete_reference(
        &mut self,
        client: &PowerGuardClient,
        source: ChoiceSource,
        id: RequestId,
        completion: Completion,
    ) -> Result<(), ApiError> {
        if self.awaiting.get(&source) != Some(&id) {
            return Ok(());
        }
        self.awaiting.remove(&source);

        let parsed = completion.and_then(|response| match source {
            ChoiceSource::ResourceChoices => client.parse_resource_choices(response).map(|c| {
                c.resource_choices
                    .into_iter()
                    .map(|(value, label)| SelectOption { value, label })
                    .collect::<Vec<_>>()
            }),
            ChoiceSource::PlantGroups => {
                client.parse_list::<LoggerPlantGroup>(response).map(|groups| {
                    groups
                        .into_iter()
                        .map(|g| SelectOption {
                            value: g.id.to_string(),
                            label: g.group_name,
                        })
                        .collect::<Vec<_>>()
                })
            }
        });

        match parsed {
            Ok(options) => {
                self.options.insert(source, options);
                Ok(())
            }
            Err(err) => {
                warn!(?source, error = %err, "error loading form options");
                self.reference_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn references_loading(&self) -> bool {
        !self.awaiting.is_empty()
    }

    /// Options for a select field, in server order. Empty until loaded.
    pub fn options(&self, field: &str) -> &[SelectOption] {
        match R::field(field).map(|spec| spec.kind) {
            Some(FieldKind::Choice(source)) => {
                self.options.get(&source).map(Vec::as_slice).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    // -----------------------------------------------------------------------
    // Draft
    // -----------------------------------------------------------------------

    /// Store raw input for `name`, clearing its error and the general error.
    pub fn set_field(&mut self, name: &str, raw: &str) -> Result<(), ApiError> {
        let spec = R::field(name).ok_or_else(|| ApiError::invalid(name, "unknown field"))?;
        self.values.insert(spec.name, FieldValue::parse(spec.kind, raw));
        self.field_errors.shift_remove(name);
        self.general_error = None;
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn general_error(&self) -> Option<&ApiError> {
        self.general_error.as_ref()
    }

    pub fn reference_error(&self) -> Option<&ApiError> {
        self.reference_error.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Check required fields and, once options are loaded, select values.
    pub fn validate(&mut self) -> Result<(), ApiError> {
        let empty = FieldValue::Empty;
        let mut errors = FieldErrors::new();
        for spec in R::FORM {
            let value = self.values.get(spec.name).unwrap_or(&empty);
            if value.is_empty() {
                if spec.required {
                    errors.insert(spec.name.to_string(), REQUIRED_MESSAGE.to_string());
                }
                continue;
            }
            if let FieldKind::Choice(source) = spec.kind {
                if let Some(options) = self.options.get(&source) {
                    let chosen = value.as_text();
                    if !options.iter().any(|o| o.value == chosen) {
                        errors.insert(spec.name.to_string(), INVALID_CHOICE_MESSAGE.to_string());
                    }
                }
            }
        }

        self.field_errors = errors.clone();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }

    /// Validate and build the POST. Nothing is built when validation fails.
    pub fn submit(&mut self, client: &PowerGuardClient) -> Result<HttpRequest, ApiError> {
        if self.submitting {
            return Err(ApiError::invalid("form", "a save is already in progress"));
        }
        self.validate()?;
        let request = match client.build_create::<R, _>(&self.values) {
            Ok(request) => request,
            Err(err) => {
                self.general_error = Some(err.clone());
                return Err(err);
            }
        };
        self.general_error = None;
        self.submitting = true;
        Ok(request)
    }

    /// Apply the host's result for the POST built by `submit`.
    ///
    /// A 400 carrying per-field messages is folded into `field_errors`.
    pub fn complete_submit(
        &mut self,
        client: &PowerGuardClient,
        completion: Completion,
    ) -> Result<R, ApiError> {
        self.submitting = false;
        match completion.and_then(|response| client.parse_created::<R>(response)) {
            Ok(created) => {
                info!(endpoint = %R::ENDPOINT, id = created.id(), "record created");
                Ok(created)
            }
            Err(err) => {
                warn!(endpoint = %R::ENDPOINT, error = %err, "error saving record");
                if let ApiError::Http { status: 400, body } = &err {
                    self.absorb_server_errors(body);
                }
                self.general_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn absorb_server_errors(&mut self, body: &str) {
        let Ok(messages) = serde_json::from_str::<IndexMap<String, Vec<String>>>(body) else {
            return;
        };
        for (field, list) in messages {
            if R::field(&field).is_some() {
                if let Some(first) = list.into_iter().next() {
                    self.field_errors.insert(field, first);
                }
            }
        }
    }
}

fn reference_request(client: &PowerGuardClient, source: ChoiceSource) -> HttpRequest {
    match source {
        ChoiceSource::ResourceChoices => client.build_resource_choices(),
        ChoiceSource::PlantGroups => client.build_list::<LoggerPlantGroup>(&ListQuery::new()),
    }
}
