//! Routing and HTTP-access layer for the ClinicCare EMR front end.
//!
//! # Overview
//! `ConsultationClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network (host-does-IO pattern). `ApiClient`
//! is the async host that executes those requests with reqwest, logs every
//! request and failure through an injectable `ApiLogger`, and hands errors
//! back as a typed `ApiError`. `Router` maps the two front-end paths to views
//! and keeps the page title in sync with navigation.
//!
//! # Design
//! - No local input validation: the backend owns it and its error payload
//!   reaches the caller intact.
//! - No retries, no caching, no state beyond the shared configured client.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod router;
pub mod types;

pub use api::ApiClient;
pub use client::{ConsultationClient, Operation};
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use logging::{init_tracing, ApiLogger, LogEvent, MemoryLogger, TracingLogger};
pub use router::{DocumentTitle, RecordedTitle, Route, RouteError, Router, View};
pub use types::{
    Consultation, ConsultationPage, DiagnosisCode, ErrorPayload, NewConsultation, PageRequest,
};
