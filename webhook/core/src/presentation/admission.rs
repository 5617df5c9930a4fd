// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Admission webhook endpoints (`admission.k8s.io/v1`)
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/mutate--v1-persistentvolume` | `ProvenanceDefaulter` |
//! | POST | `/validate--v1-persistentvolume` | `ProvenanceValidator` |
//! | GET | `/healthz`, `/readyz` | liveness / readiness |

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::application::defaulter::{DefaultingError, ProvenanceDefaulter};
use crate::application::validator::ProvenanceValidator;
use crate::domain::provenance::Violation;
use crate::domain::volume::{Volume, ORIGIN_ANNOTATION};

pub const MUTATE_PATH: &str = "/mutate--v1-persistentvolume";
pub const VALIDATE_PATH: &str = "/validate--v1-persistentvolume";

const REVIEW_API_VERSION: &str = "admission.k8s.io/v1";
const REVIEW_KIND: &str = "AdmissionReview";
const EXPECTED_KIND: &str = "PersistentVolume";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default = "default_review_api_version")]
    pub api_version: String,

    #[serde(default = "default_review_kind")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

fn default_review_api_version() -> String {
    REVIEW_API_VERSION.to_string()
}

fn default_review_kind() -> String {
    REVIEW_KIND.to_string()
}

impl AdmissionReview {
    pub fn from_response(response: AdmissionResponse) -> Self {
        Self {
            api_version: default_review_api_version(),
            kind: default_review_kind(),
            request: None,
            response: Some(response),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,

    pub kind: GroupVersionKind,

    pub operation: Operation,

    #[serde(default)]
    pub name: String,

    /// New state; absent on DELETE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,

    /// Previous state; present on UPDATE and DELETE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,

    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionStatus {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,

    pub allowed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,

    /// Base64-encoded JSON patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

impl AdmissionResponse {
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            status: None,
            patch: None,
            patch_type: None,
        }
    }

    pub fn deny(uid: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            status: Some(AdmissionStatus {
                code,
                message: message.into(),
            }),
            patch: None,
            patch_type: None,
        }
    }

    pub fn with_patch(mut self, patch: &Value) -> Self {
        self.patch = Some(base64::engine::general_purpose::STANDARD.encode(patch.to_string()));
        self.patch_type = Some("JSONPatch".to_string());
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("expected a PersistentVolume object but got {0}")]
    UnexpectedKind(String),

    #[error("expected a PersistentVolume object for the {0} but got nil")]
    MissingObject(&'static str),

    #[error("failed to decode {field} as a PersistentVolume: {source}")]
    InvalidObject {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Defaulting(#[from] DefaultingError),

    #[error(transparent)]
    Violation(#[from] Violation),
}

impl AdmissionError {
    /// HTTP-style code placed in the AdmissionResponse status
    pub fn code(&self) -> u16 {
        match self {
            Self::UnexpectedKind(_) | Self::MissingObject(_) | Self::InvalidObject { .. } => 400,
            Self::Defaulting(_) => 500,
            Self::Violation(_) => 403,
        }
    }
}

// ============================================================================
// Request handling
// ============================================================================

fn ensure_volume_kind(kind: &GroupVersionKind) -> Result<(), AdmissionError> {
    if kind.group.is_empty() && kind.kind == EXPECTED_KIND {
        return Ok(());
    }
    let got = if kind.group.is_empty() {
        format!("{}/{}", kind.version, kind.kind)
    } else {
        format!("{}/{}/{}", kind.group, kind.version, kind.kind)
    };
    Err(AdmissionError::UnexpectedKind(got))
}

fn decode(value: Option<&Value>, field: &'static str) -> Result<Volume, AdmissionError> {
    let value = value.ok_or(AdmissionError::MissingObject(field))?;
    Volume::deserialize(value).map_err(|source| AdmissionError::InvalidObject { field, source })
}

/// Escape a key for use as a JSON pointer segment (RFC 6901)
fn pointer_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// JSON patch adding `origin` to `original`
pub fn origin_patch(original: &Volume, namespace: &str) -> Value {
    if original.metadata.annotations.is_none() {
        json!([{
            "op": "add",
            "path": "/metadata/annotations",
            "value": { ORIGIN_ANNOTATION: namespace },
        }])
    } else {
        json!([{
            "op": "add",
            "path": format!("/metadata/annotations/{}", pointer_segment(ORIGIN_ANNOTATION)),
            "value": namespace,
        }])
    }
}

/// Run the defaulter for one request and build its response
pub async fn default_request(
    defaulter: &ProvenanceDefaulter,
    request: &AdmissionRequest,
) -> Result<AdmissionResponse, AdmissionError> {
    ensure_volume_kind(&request.kind)?;
    if !matches!(request.operation, Operation::Create | Operation::Update) {
        return Ok(AdmissionResponse::allow(&request.uid));
    }

    let original = decode(request.object.as_ref(), "object")?;
    let mut volume = original.clone();
    let outcome = defaulter.apply_default(&mut volume).await?;

    match volume.origin() {
        Some(namespace) if outcome.mutated() => {
            Ok(AdmissionResponse::allow(&request.uid).with_patch(&origin_patch(&original, namespace)))
        }
        _ => Ok(AdmissionResponse::allow(&request.uid)),
    }
}

/// Run the validator for one request and build its response
pub fn validate_request(
    validator: &ProvenanceValidator,
    request: &AdmissionRequest,
) -> Result<AdmissionResponse, AdmissionError> {
    ensure_volume_kind(&request.kind)?;

    match request.operation {
        Operation::Create => {
            let volume = decode(request.object.as_ref(), "object")?;
            validator.validate_create(&volume)?;
        }
        Operation::Update => {
            let new = decode(request.object.as_ref(), "newObj")?;
            let old = decode(request.old_object.as_ref(), "oldObj")?;
            validator.validate_update(&old, &new)?;
        }
        Operation::Delete => {
            let volume = decode(request.old_object.as_ref(), "oldObj")?;
            validator.validate_delete(&volume)?;
        }
        Operation::Connect => {}
    }

    Ok(AdmissionResponse::allow(&request.uid))
}

// ============================================================================
// Router
// ============================================================================

pub struct AppState {
    pub defaulter: ProvenanceDefaulter,
    pub validator: ProvenanceValidator,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(MUTATE_PATH, post(mutate))
        .route(VALIDATE_PATH, post(validate))
        .route("/healthz", get(healthz))
        .route("/readyz", get(healthz))
        .with_state(state)
}

type HandlerResult = Result<Json<AdmissionReview>, (StatusCode, String)>;

fn take_request(review: AdmissionReview) -> Result<AdmissionRequest, (StatusCode, String)> {
    review
        .request
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "AdmissionReview carries no request".to_string()))
}

fn into_response(uid: &str, result: Result<AdmissionResponse, AdmissionError>) -> AdmissionResponse {
    result.unwrap_or_else(|e| {
        warn!(uid, code = e.code(), error = %e, "Admission denied");
        AdmissionResponse::deny(uid, e.code(), e.to_string())
    })
}

#[instrument(skip_all, fields(uid = tracing::field::Empty, operation = tracing::field::Empty))]
async fn mutate(State(state): State<Arc<AppState>>, Json(review): Json<AdmissionReview>) -> HandlerResult {
    let request = take_request(review)?;
    tracing::Span::current()
        .record("uid", request.uid.as_str())
        .record("operation", tracing::field::debug(request.operation));
    info!(name = %request.name, dry_run = request.dry_run, "Defaulting for PersistentVolume");

    let result = default_request(&state.defaulter, &request).await;
    Ok(Json(AdmissionReview::from_response(into_response(&request.uid, result))))
}

#[instrument(skip_all, fields(uid = tracing::field::Empty, operation = tracing::field::Empty))]
async fn validate(State(state): State<Arc<AppState>>, Json(review): Json<AdmissionReview>) -> HandlerResult {
    let request = take_request(review)?;
    tracing::Span::current()
        .record("uid", request.uid.as_str())
        .record("operation", tracing::field::debug(request.operation));

    let result = validate_request(&state.validator, &request);
    Ok(Json(AdmissionReview::from_response(into_response(&request.uid, result))))
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_creates_annotation_map() {
        let patch = origin_patch(&Volume::new("pv-1"), "tenant1");
        assert_eq!(
            patch,
            json!([{ "op": "add", "path": "/metadata/annotations", "value": { "origin": "tenant1" } }])
        );
    }

    #[test]
    fn test_patch_adds_key_to_existing_map() {
        let volume = Volume::new("pv-1").with_annotation("team", "storage");
        let patch = origin_patch(&volume, "tenant1");
        assert_eq!(
            patch,
            json!([{ "op": "add", "path": "/metadata/annotations/origin", "value": "tenant1" }])
        );
    }

    #[test]
    fn test_pointer_segment_escaping() {
        assert_eq!(pointer_segment("example.com/owner"), "example.com~1owner");
        assert_eq!(pointer_segment("a~b"), "a~0b");
    }

    #[test]
    fn test_kind_check() {
        let pv = GroupVersionKind {
            group: String::new(),
            version: "v1".to_string(),
            kind: "PersistentVolume".to_string(),
        };
        assert!(ensure_volume_kind(&pv).is_ok());

        let pvc = GroupVersionKind { kind: "PersistentVolumeClaim".to_string(), ..pv.clone() };
        let err = ensure_volume_kind(&pvc).unwrap_err();
        assert_eq!(err.to_string(), "expected a PersistentVolume object but got v1/PersistentVolumeClaim");
        assert_eq!(err.code(), 400);

        let crd = GroupVersionKind { group: "storage.example.com".to_string(), ..pv };
        assert!(ensure_volume_kind(&crd).is_err());
    }

    #[test]
    fn test_response_patch_encoding() {
        let patch = json!([{ "op": "add", "path": "/metadata/annotations/origin", "value": "t" }]);
        let response = AdmissionResponse::allow("uid-1").with_patch(&patch);

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(response.patch.unwrap())
            .unwrap();
        let roundtrip: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(roundtrip, patch);
        assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));
    }
}
