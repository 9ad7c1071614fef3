//! In-memory stand-in for the ClinicCare EMR backend.
//!
//! Serves the same routes and JSON shapes as the real service: ICD-10 search,
//! consultation create/list/get/delete, and `{"detail": ...}` error bodies.
//! State lives in a `RwLock` and is lost when the process exits.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::{net::TcpListener, sync::RwLock};

pub const SEARCH_LIMIT: usize = 20;
pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;
pub const MAX_PATIENT_NAME: usize = 255;

const ICD10_CODES: &[(&str, &str)] = &[
    ("E11.9", "Type 2 diabetes mellitus without complications"),
    ("E11.65", "Type 2 diabetes mellitus with hyperglycemia"),
    ("E11.21", "Type 2 diabetes mellitus with diabetic nephropathy"),
    ("E10.9", "Type 1 diabetes mellitus without complications"),
    ("E03.9", "Hypothyroidism, unspecified"),
    ("E78.5", "Hyperlipidemia, unspecified"),
    ("E66.9", "Obesity, unspecified"),
    ("I10", "Essential (primary) hypertension"),
    ("I48.91", "Unspecified atrial fibrillation"),
    ("I50.9", "Heart failure, unspecified"),
    ("J45.909", "Unspecified asthma, uncomplicated"),
    ("J44.9", "Chronic obstructive pulmonary disease, unspecified"),
    ("J06.9", "Acute upper respiratory infection, unspecified"),
    ("J18.9", "Pneumonia, unspecified organism"),
    ("K21.9", "Gastro-esophageal reflux disease without esophagitis"),
    ("K30", "Functional dyspepsia"),
    ("M54.5", "Low back pain"),
    ("M17.9", "Osteoarthritis of knee, unspecified"),
    ("F32.9", "Major depressive disorder, single episode, unspecified"),
    ("F41.1", "Generalized anxiety disorder"),
    ("N39.0", "Urinary tract infection, site not specified"),
    ("L20.9", "Atopic dermatitis, unspecified"),
    ("G43.909", "Migraine, unspecified, not intractable, without status migrainosus"),
    ("R51.9", "Headache, unspecified"),
    ("Z00.00", "Encounter for general adult medical examination without abnormal findings"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisCode {
    pub id: i64,
    pub code: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: i64,
    pub patient_name: String,
    pub diagnosis_codes: Vec<String>,
    pub treatment_notes: String,
    pub consultation_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateConsultation {
    pub patient_name: String,
    pub diagnosis_codes: Vec<String>,
    pub treatment_notes: String,
    #[serde(default, deserialize_with = "deserialize_consultation_date")]
    pub consultation_date: Option<NaiveDateTime>,
}

/// Offset-aware timestamps are stored as naive UTC, naive ones as given.
#[derive(Deserialize)]
#[serde(untagged)]
enum DateInput {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

fn deserialize_consultation_date<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let input = Option::<DateInput>::deserialize(deserializer)?;
    Ok(input.map(|date| match date {
        DateInput::Aware(aware) => aware.naive_utc(),
        DateInput::Naive(naive) => naive,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultationList {
    pub consultations: Vec<Consultation>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Debug)]
pub struct Store {
    codes: Vec<DiagnosisCode>,
    consultations: BTreeMap<i64, Consultation>,
    next_id: i64,
}

impl Store {
    pub fn seeded() -> Self {
        let codes = ICD10_CODES
            .iter()
            .zip(1..)
            .map(|((code, description), id)| DiagnosisCode {
                id,
                code: code.to_string(),
                description: description.to_string(),
            })
            .collect();
        Self {
            codes,
            consultations: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn has_code(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c.code == code)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Backend failures, rendered as `{"detail": ...}` like the real service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Rendered as a 422 with a one-entry `detail` list; `loc` names where
    /// the bad input sits, e.g. `["body", "patient_name"]`.
    #[error("{message}")]
    Validation {
        loc: &'static [&'static str],
        message: String,
    },
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            loc: &["body"],
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation {
            loc: &["query"],
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation {
            loc: &["path", "consultation_id"],
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Value::from(msg.as_str())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Value::from(msg.as_str())),
            AppError::Validation { loc, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!([{ "loc": loc, "msg": message, "type": "value_error" }]),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub fn app() -> Router {
    app_with(Arc::new(RwLock::new(Store::seeded())))
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/diagnosis", get(search_diagnosis_codes))
        .route("/api/consultation", post(create_consultation))
        .route("/api/consultations", get(list_consultations))
        .route(
            "/api/consultation/{id}",
            get(get_consultation).delete(delete_consultation),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "ClinicCare Mini EMR API",
        "version": "1.0.0"
    }))
}

async fn search_diagnosis_codes(
    State(db): State<Db>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<DiagnosisCode>> {
    let term = params
        .search
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_lowercase();
    let store = db.read().await;
    let mut codes: Vec<DiagnosisCode> = store
        .codes
        .iter()
        .filter(|c| {
            term.is_empty()
                || c.code.to_lowercase().contains(&term)
                || c.description.to_lowercase().contains(&term)
        })
        .cloned()
        .collect();
    codes.sort_by(|a, b| a.code.cmp(&b.code));
    codes.truncate(SEARCH_LIMIT);
    Json(codes)
}

async fn create_consultation(
    State(db): State<Db>,
    input: Result<Json<CreateConsultation>, JsonRejection>,
) -> Result<(StatusCode, Json<Consultation>), AppError> {
    let Json(input) = input?;
    // Length limits apply to the raw value, before trimming.
    if input.patient_name.chars().count() > MAX_PATIENT_NAME {
        return Err(validation(
            &["body", "patient_name"],
            "ensure this value has at most 255 characters",
        ));
    }
    let patient_name = input.patient_name.trim();
    if patient_name.is_empty() {
        return Err(validation(&["body", "patient_name"], "Patient name is required"));
    }
    let treatment_notes = input.treatment_notes.trim();
    if treatment_notes.is_empty() {
        return Err(validation(&["body", "treatment_notes"], "Treatment notes are required"));
    }
    if input.diagnosis_codes.is_empty() {
        return Err(validation(
            &["body", "diagnosis_codes"],
            "At least one diagnosis code is required",
        ));
    }
    let diagnosis_codes: Vec<String> = input
        .diagnosis_codes
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect();

    let mut store = db.write().await;
    if let Some(unknown) = diagnosis_codes.iter().find(|code| !store.has_code(code)) {
        return Err(AppError::BadRequest(format!(
            "Invalid diagnosis code: {unknown}"
        )));
    }

    let now = Utc::now().naive_utc();
    let consultation = Consultation {
        id: store.next_id,
        patient_name: patient_name.to_string(),
        diagnosis_codes,
        treatment_notes: treatment_notes.to_string(),
        consultation_date: input.consultation_date.unwrap_or(now),
        created_at: now,
    };
    store.next_id += 1;
    store
        .consultations
        .insert(consultation.id, consultation.clone());
    tracing::info!(id = consultation.id, "created consultation");
    Ok((StatusCode::CREATED, Json(consultation)))
}

async fn list_consultations(
    State(db): State<Db>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ConsultationList>, AppError> {
    let Query(params) = params?;
    if params.skip < 0 {
        return Err(validation(
            &["query", "skip"],
            "ensure this value is greater than or equal to 0",
        ));
    }
    if !(1..=MAX_LIMIT).contains(&params.limit) {
        return Err(AppError::Validation {
            loc: &["query", "limit"],
            message: format!("limit must be between 1 and {MAX_LIMIT}"),
        });
    }
    let store = db.read().await;
    let mut all: Vec<&Consultation> = store.consultations.values().collect();
    all.sort_by(|a, b| {
        b.consultation_date
            .cmp(&a.consultation_date)
            .then(b.id.cmp(&a.id))
    });
    let consultations = all
        .into_iter()
        .skip(usize::try_from(params.skip).unwrap_or(usize::MAX))
        .take(usize::try_from(params.limit).unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Ok(Json(ConsultationList {
        consultations,
        total: store.consultations.len(),
    }))
}

async fn get_consultation(
    State(db): State<Db>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Consultation>, AppError> {
    let Path(id) = id?;
    let store = db.read().await;
    store
        .consultations
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn delete_consultation(
    State(db): State<Db>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    let mut store = db.write().await;
    if store.consultations.remove(&id).is_some() {
        tracing::info!(id, "deleted consultation");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Consultation with ID {id} not found"))
}

fn validation(loc: &'static [&'static str], message: &str) -> AppError {
    AppError::Validation {
        loc,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_seeded_with_sequential_ids() {
        let store = Store::seeded();
        assert_eq!(store.codes.len(), ICD10_CODES.len());
        assert_eq!(store.codes[0].id, 1);
        assert_eq!(store.codes[0].code, "E11.9");
        assert!(store.has_code("I10"));
        assert!(!store.has_code("Z99.99"));
        assert_eq!(store.next_id, 1);
    }

    #[test]
    fn consultation_serializes_to_json() {
        let date = NaiveDateTime::parse_from_str("2024-05-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let consultation = Consultation {
            id: 1,
            patient_name: "Jane Doe".to_string(),
            diagnosis_codes: vec!["E11.9".to_string()],
            treatment_notes: "Follow-up".to_string(),
            consultation_date: date,
            created_at: date,
        };
        let json = serde_json::to_value(&consultation).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["diagnosis_codes"][0], "E11.9");
        assert_eq!(json["consultation_date"], "2024-05-01T10:00:00");
    }

    #[test]
    fn create_consultation_date_is_optional() {
        let input: CreateConsultation = serde_json::from_str(
            r#"{"patient_name":"A","diagnosis_codes":["I10"],"treatment_notes":"B"}"#,
        )
        .unwrap();
        assert!(input.consultation_date.is_none());
    }

    #[test]
    fn create_consultation_rejects_missing_notes() {
        let result: Result<CreateConsultation, _> =
            serde_json::from_str(r#"{"patient_name":"A","diagnosis_codes":["I10"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn create_consultation_accepts_offset_dates() {
        let input: CreateConsultation = serde_json::from_str(
            r#"{"patient_name":"A","diagnosis_codes":["I10"],"treatment_notes":"B","consultation_date":"2024-01-01T09:00:00+02:00"}"#,
        )
        .unwrap();
        let expected =
            NaiveDateTime::parse_from_str("2024-01-01 07:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(input.consultation_date, Some(expected));
    }

    #[test]
    fn create_consultation_accepts_naive_dates() {
        let input: CreateConsultation = serde_json::from_str(
            r#"{"patient_name":"A","diagnosis_codes":["I10"],"treatment_notes":"B","consultation_date":"2024-01-01T09:00:00"}"#,
        )
        .unwrap();
        let expected =
            NaiveDateTime::parse_from_str("2024-01-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(input.consultation_date, Some(expected));
    }

    #[test]
    fn list_params_default_window() {
        let params: ListParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.skip, 0);
        assert_eq!(params.limit, DEFAULT_LIMIT);
    }
}
