//! Stateless request builder and response parser for the EMR API.
//!
//! # Design
//! `ConsultationClient` holds only a `base_url`. Each operation is split into
//! a `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. No input is validated here; the backend
//! owns validation and its error body is passed back verbatim.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Consultation, ConsultationPage, DiagnosisCode, ErrorPayload, NewConsultation, PageRequest,
};

pub const CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// The five API operations, used to label log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SearchDiagnosisCodes,
    CreateConsultation,
    GetConsultations,
    GetConsultation,
    DeleteConsultation,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::SearchDiagnosisCodes => "search_diagnosis_codes",
            Operation::CreateConsultation => "create_consultation",
            Operation::GetConsultations => "get_consultations",
            Operation::GetConsultation => "get_consultation",
            Operation::DeleteConsultation => "delete_consultation",
        }
    }

    /// Human-readable activity, e.g. "fetching consultations".
    pub fn activity(self) -> &'static str {
        match self {
            Operation::SearchDiagnosisCodes => "searching diagnosis codes",
            Operation::CreateConsultation => "creating consultation",
            Operation::GetConsultations => "fetching consultations",
            Operation::GetConsultation => "fetching consultation",
            Operation::DeleteConsultation => "deleting consultation",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless client for the EMR API.
#[derive(Debug, Clone)]
pub struct ConsultationClient {
    base_url: String,
}

impl ConsultationClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `None` searches with an empty term, which the backend treats as "all".
    pub fn build_search_diagnosis_codes(&self, term: Option<&str>) -> HttpRequest {
        let term = urlencoding::encode(term.unwrap_or(""));
        self.request(HttpMethod::Get, format!("/api/diagnosis?search={term}"), None)
    }

    pub fn build_create_consultation(&self, input: &NewConsultation) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(HttpMethod::Post, "/api/consultation".to_string(), Some(body)))
    }

    pub fn build_get_consultations(&self, page: PageRequest) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            format!("/api/consultations?skip={}&limit={}", page.skip, page.limit),
            None,
        )
    }

    pub fn build_get_consultation(&self, id: i64) -> HttpRequest {
        self.request(HttpMethod::Get, format!("/api/consultation/{id}"), None)
    }

    pub fn build_delete_consultation(&self, id: i64) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/api/consultation/{id}"), None)
    }

    pub fn parse_search_diagnosis_codes(&self, response: HttpResponse) -> Result<Vec<DiagnosisCode>, ApiError> {
        decode(&response)
    }

    pub fn parse_create_consultation(&self, response: HttpResponse) -> Result<Consultation, ApiError> {
        decode(&response)
    }

    pub fn parse_get_consultations(&self, response: HttpResponse) -> Result<ConsultationPage, ApiError> {
        decode(&response)
    }

    pub fn parse_get_consultation(&self, response: HttpResponse) -> Result<Consultation, ApiError> {
        decode(&response)
    }

    pub fn parse_delete_consultation(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            path,
            headers: vec![(CONTENT_TYPE.0.to_string(), CONTENT_TYPE.1.to_string())],
            body,
        }
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-2xx responses to `ApiError::Backend`, keeping the JSON payload
/// when the body parses as JSON.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Backend {
        status: response.status,
        payload: serde_json::from_str(&response.body).ok().map(ErrorPayload),
        body: response.body.clone(),
    })
}
