//! Domain DTOs for the ClinicCare EMR API.
//!
//! # Design
//! These mirror the backend's JSON schema but are defined independently of
//! the mock-server crate; integration tests catch schema drift. Records
//! returned by the backend are passed through untouched, so `Consultation`
//! keeps unknown fields in `extra` instead of dropping them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A patient consultation as returned by the backend. The `id` is assigned
/// by the backend and never fabricated client-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consultation {
    pub id: i64,
    pub patient_name: String,
    pub diagnosis_codes: Vec<String>,
    pub treatment_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request payload for creating a consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewConsultation {
    pub patient_name: String,
    pub diagnosis_codes: Vec<String>,
    pub treatment_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_date: Option<String>,
}

impl NewConsultation {
    pub fn new(
        patient_name: impl Into<String>,
        diagnosis_codes: impl IntoIterator<Item = impl Into<String>>,
        treatment_notes: impl Into<String>,
    ) -> Self {
        Self {
            patient_name: patient_name.into(),
            diagnosis_codes: diagnosis_codes.into_iter().map(Into::into).collect(),
            treatment_notes: treatment_notes.into(),
            consultation_date: None,
        }
    }
}

/// An ICD-10 reference entry owned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosisCode {
    pub id: i64,
    pub code: String,
    pub description: String,
}

/// One page of consultations plus the total number stored on the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationPage {
    pub consultations: Vec<Consultation>,
    pub total: u64,
}

/// Pagination window for `get_consultations`. Values are forwarded as-is;
/// the backend rejects out-of-range windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// The backend's JSON error body, kept verbatim.
///
/// The backend answers with `{"detail": "..."}` for domain errors and
/// `{"detail": [...]}` for schema validation errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ErrorPayload(pub Value);

impl ErrorPayload {
    pub fn detail(&self) -> Option<&Value> {
        self.0.get("detail")
    }

    /// The `detail` field when it is a plain string.
    pub fn detail_message(&self) -> Option<&str> {
        self.detail().and_then(Value::as_str)
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
