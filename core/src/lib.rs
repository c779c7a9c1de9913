//! Client core for the PowerGuard admin API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). On top of the request
//! builder sit three controllers the views drive:
//!
//! - `ResourceFetch` loads a collection and tracks loading/error state.
//! - `EditController` edits one row in place and commits it with PATCH.
//! - `AddRecord` validates a draft form and creates it with POST.
//!
//! # Design
//! - `PowerGuardClient` holds only `base_url` and the token.
//! - Controllers hand out `Ticket`s and take completions back; stale
//!   completions are discarded by request id.
//! - Every failure is stored as an `ApiError` in the controller that saw it.

pub mod add;
pub mod client;
pub mod edit;
pub mod error;
pub mod fetch;
pub mod http;
pub mod query;
pub mod resource;
pub mod ticket;
pub mod types;

pub use add::{AddRecord, ChoiceSource, Creatable, FieldKind, FieldSpec, FieldValue, SelectOption};
pub use client::PowerGuardClient;
pub use edit::{EditController, EditSession, Editable, PendingSave};
pub use error::{ApiError, FieldErrors};
pub use fetch::{FetchOutcome, ResourceFetch};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::{ListQuery, PowerGenFilter, ProductionFilter};
pub use resource::{Endpoint, RecordId, Resource};
pub use ticket::{Completion, RequestId, Ticket};
pub use types::{
    LoggerCategory, LoggerPlantGroup, LoggerPowerGen, PowerPlantDetail, ResourceChoices, UserRef,
    UtilityDailyProduction, UtilityPlant,
};
