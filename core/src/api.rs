//! Async executor for the EMR API.
//!
//! # Design
//! `ApiClient` is the network host for `ConsultationClient`: it builds a
//! request with the pure core, sends it over a shared `reqwest::Client`, and
//! hands the response back to the core for parsing. Every request is logged
//! before it is sent; every failed operation is logged once and returned to
//! the caller unchanged. There are no retries.

use std::sync::{Arc, OnceLock};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::client::{ConsultationClient, Operation};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::logging::{ApiLogger, TracingLogger};
use crate::types::{Consultation, ConsultationPage, DiagnosisCode, NewConsultation, PageRequest};

static SHARED: OnceLock<ApiClient> = OnceLock::new();

/// Configured HTTP client for the EMR backend. Cheap to clone; clones share
/// the connection pool and logger.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    core: ConsultationClient,
    config: ClientConfig,
    logger: Arc<dyn ApiLogger>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig, logger: Arc<dyn ApiLogger>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            core: ConsultationClient::new(&config.base_url),
            config,
            logger,
        })
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        Self::new(config, Arc::new(TracingLogger))
    }

    /// The process-wide client, configured from the environment on first use
    /// and never reconfigured afterwards.
    pub fn shared() -> Result<&'static ApiClient, ApiError> {
        if let Some(client) = SHARED.get() {
            return Ok(client);
        }
        let client = Self::from_config(ClientConfig::from_env())?;
        Ok(SHARED.get_or_init(|| client))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn core(&self) -> &ConsultationClient {
        &self.core
    }

    pub async fn search_diagnosis_codes(&self, term: Option<&str>) -> Result<Vec<DiagnosisCode>, ApiError> {
        let request = self.core.build_search_diagnosis_codes(term);
        self.run(
            Operation::SearchDiagnosisCodes,
            Ok(request),
            ConsultationClient::parse_search_diagnosis_codes,
        )
        .await
    }

    pub async fn create_consultation(&self, input: &NewConsultation) -> Result<Consultation, ApiError> {
        let request = self.core.build_create_consultation(input);
        self.run(
            Operation::CreateConsultation,
            request,
            ConsultationClient::parse_create_consultation,
        )
        .await
    }

    pub async fn get_consultations(&self, page: PageRequest) -> Result<ConsultationPage, ApiError> {
        let request = self.core.build_get_consultations(page);
        self.run(
            Operation::GetConsultations,
            Ok(request),
            ConsultationClient::parse_get_consultations,
        )
        .await
    }

    pub async fn get_consultation(&self, id: i64) -> Result<Consultation, ApiError> {
        let request = self.core.build_get_consultation(id);
        self.run(
            Operation::GetConsultation,
            Ok(request),
            ConsultationClient::parse_get_consultation,
        )
        .await
    }

    pub async fn delete_consultation(&self, id: i64) -> Result<(), ApiError> {
        let request = self.core.build_delete_consultation(id);
        self.run(
            Operation::DeleteConsultation,
            Ok(request),
            ConsultationClient::parse_delete_consultation,
        )
        .await
    }

    /// Perform one raw round-trip. The request is logged; a failure is only
    /// returned; operation-level failure logging happens in the typed calls.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.logger.request(request.method, &request.path);

        let builder = match request.method {
            HttpMethod::Get => self.http.get(&request.url),
            HttpMethod::Post => self.http.post(&request.url),
            HttpMethod::Delete => self.http.delete(&request.url),
        };
        let builder = request
            .headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        let builder = match request.body {
            Some(body) => builder.body(body),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn run<T>(
        &self,
        operation: Operation,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&ConsultationClient, HttpResponse) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let result = match request {
            Ok(request) => match self.execute(request).await {
                Ok(response) => parse(&self.core, response),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        result.inspect_err(|err| self.logger.failure(operation, err))
    }
}
