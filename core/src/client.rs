//! Authenticated request builder and response parser for the admin API.
//!
//! # Design
//! `PowerGuardClient` holds the base URL and token it was constructed with
//! and carries no other state. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`. The host executes the round-trip in between.
//!
//! The token is injected at construction rather than read from an ambient
//! store, so two clients with different credentials never interfere.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::ListQuery;
use crate::resource::{Endpoint, RecordId, Resource};
use crate::types::ResourceChoices;

#[derive(Debug, Clone)]
pub struct PowerGuardClient {
    base_url: String,
    token: String,
}

impl PowerGuardClient {
    /// Fails with `ApiError::Configuration` when either value is blank.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::Configuration("missing base URL".to_string()));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::Configuration("missing API token".to_string()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn collection_url(&self, endpoint: Endpoint) -> String {
        format!("{}/core/{}/", self.base_url, endpoint)
    }

    pub fn record_url(&self, endpoint: Endpoint, id: RecordId) -> String {
        format!("{}/core/{}/{id}/", self.base_url, endpoint)
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn build_list<R: Resource>(&self, query: &ListQuery) -> HttpRequest {
        let mut url = self.collection_url(R::ENDPOINT);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.to_query_string());
        }
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_get<R: Resource>(&self, id: RecordId) -> HttpRequest {
        self.request(HttpMethod::Get, self.record_url(R::ENDPOINT, id), None)
    }

    /// Partial update. `changes` holds only the fields being written.
    pub fn build_patch<R: Resource, B: Serialize>(
        &self,
        id: RecordId,
        changes: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(changes)?;
        Ok(self.request(HttpMethod::Patch, self.record_url(R::ENDPOINT, id), Some(body)))
    }

    pub fn build_create<R: Resource, B: Serialize>(&self, draft: &B) -> Result<HttpRequest, ApiError> {
        let body = to_json(draft)?;
        Ok(self.request(HttpMethod::Post, self.collection_url(R::ENDPOINT), Some(body)))
    }

    pub fn build_resource_choices(&self) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            self.collection_url(Endpoint::PowerPlantResourceChoices),
            None,
        )
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        let mut headers = vec![("authorization".to_string(), format!("Token {}", self.token))];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        debug!(method = method.as_str(), %url, "built request");
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    // -----------------------------------------------------------------------
    // Parsers
    // -----------------------------------------------------------------------

    pub fn parse_list<R: Resource>(&self, response: HttpResponse) -> Result<Vec<R>, ApiError> {
        check_status(&response, &[200])?;
        from_json(&response.body)
    }

    /// Parses a single record from a GET or PATCH response.
    pub fn parse_record<R: Resource>(&self, response: HttpResponse) -> Result<R, ApiError> {
        check_status(&response, &[200])?;
        from_json(&response.body)
    }

    pub fn parse_created<R: Resource>(&self, response: HttpResponse) -> Result<R, ApiError> {
        check_status(&response, &[201, 200])?;
        from_json(&response.body)
    }

    pub fn parse_resource_choices(&self, response: HttpResponse) -> Result<ResourceChoices, ApiError> {
        check_status(&response, &[200])?;
        from_json(&response.body)
    }
}

fn to_json<B: Serialize>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Format(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: &[u16]) -> Result<(), ApiError> {
    if expected.contains(&response.status) {
        return Ok(());
    }
    match response.status {
        401 | 403 => Err(ApiError::Unauthorized(response.body.clone())),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::Http {
            status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LoggerPowerGen, PowerPlantDetail};
    use indexmap::IndexMap;

    fn client() -> PowerGuardClient {
        PowerGuardClient::new("http://localhost:8000", "abc123").unwrap()
    }

    #[test]
    fn blank_configuration_is_rejected() {
        assert!(matches!(
            PowerGuardClient::new("", "abc"),
            Err(ApiError::Configuration(_))
        ));
        assert!(matches!(
            PowerGuardClient::new("http://x", "  "),
            Err(ApiError::Configuration(_))
        ));
    }

    #[test]
    fn build_list_attaches_token_and_no_body() {
        let req = client().build_list::<PowerPlantDetail>(&ListQuery::new());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/core/power-plant-detail/");
        assert_eq!(req.header("Authorization"), Some("Token abc123"));
        assert!(req.header("content-type").is_none());
        assert!(req.body.is_none());
    }

    #[test]
    fn build_get_targets_record_url() {
        let req = client().build_get::<LoggerPowerGen>(42);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/core/logger-power-gen/42/");
        assert_eq!(req.header("authorization"), Some("Token abc123"));
        assert!(req.header("content-type").is_none());
        assert!(req.body.is_none());
    }

    #[test]
    fn build_list_appends_query() {
        let query = ListQuery::new().with("date", "2024-05-01");
        let req = client().build_list::<LoggerPowerGen>(&query);
        assert_eq!(
            req.url,
            "http://localhost:8000/core/logger-power-gen/?date=2024-05-01"
        );
    }

    #[test]
    fn build_patch_targets_record_url() {
        let mut changes = IndexMap::new();
        changes.insert("power_gen", "150");
        let req = client().build_patch::<LoggerPowerGen, _>(42, &changes).unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.url, "http://localhost:8000/core/logger-power-gen/42/");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(r#"{"power_gen":"150"}"#));
    }

    #[test]
    fn build_create_posts_to_collection() {
        let draft = serde_json::json!({"group_name": "East"});
        let req = client()
            .build_create::<crate::types::LoggerPlantGroup, _>(&draft)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/core/loggers-plants-group/");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = PowerGuardClient::new("http://localhost:8000/", "t").unwrap();
        assert_eq!(
            client.build_resource_choices().url,
            "http://localhost:8000/core/power-plant-resource-choices/"
        );
    }

    #[test]
    fn status_mapping() {
        let c = client();
        let err = c.parse_list::<PowerPlantDetail>(HttpResponse::new(401, "nope")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        let err = c.parse_record::<PowerPlantDetail>(HttpResponse::new(404, "")).unwrap_err();
        assert_eq!(err, ApiError::NotFound);
        let err = c.parse_created::<PowerPlantDetail>(HttpResponse::new(400, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 400, .. }));
    }

    #[test]
    fn resource_choices_without_key_is_format_error() {
        let err = client()
            .parse_resource_choices(HttpResponse::new(200, r#"{"choices":{}}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Format(_)));
    }

    #[test]
    fn parse_list_bad_json() {
        let err = client()
            .parse_list::<PowerPlantDetail>(HttpResponse::new(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Format(_)));
    }
}
