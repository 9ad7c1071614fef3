//! End-to-end tests for `ApiClient` against the live mock backend.
//!
//! Each test starts `mock-server` on a random port, drives the async client
//! over real HTTP, and checks both the results and the captured log events.

use std::sync::Arc;
use std::time::Duration;

use cliniccare_core::{
    ApiClient, ApiError, ClientConfig, ErrorPayload, HttpMethod, MemoryLogger, NewConsultation,
    Operation, PageRequest,
};

async fn spawn_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

fn client_for(config: ClientConfig) -> (ApiClient, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    let client = ApiClient::new(config, logger.clone()).unwrap();
    (client, logger)
}

async fn connect() -> (ApiClient, Arc<MemoryLogger>) {
    let base_url = spawn_backend().await;
    client_for(ClientConfig::default().with_base_url(base_url))
}

#[tokio::test]
async fn consultation_lifecycle() {
    let (client, logger) = connect().await;

    // Step 1: search with no term returns the backend's capped list.
    let all = client.search_diagnosis_codes(None).await.unwrap();
    assert_eq!(all.len(), mock_server::SEARCH_LIMIT);

    let hypertension = client.search_diagnosis_codes(Some("hypertension")).await.unwrap();
    assert_eq!(hypertension.len(), 1);
    assert_eq!(hypertension[0].code, "I10");

    // Step 2: create.
    let input = NewConsultation::new("Jane Doe", ["E11.9"], "Follow-up");
    let created = client.create_consultation(&input).await.unwrap();
    assert_eq!(created.patient_name, "Jane Doe");
    assert_eq!(created.diagnosis_codes, vec!["E11.9"]);
    assert_eq!(created.treatment_notes, "Follow-up");
    assert!(created.consultation_date.is_some());
    let id = created.id;

    // Step 3: list with default window.
    let page = client.get_consultations(PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.consultations, vec![created.clone()]);

    // Step 4: get.
    let fetched = client.get_consultation(id).await.unwrap();
    assert_eq!(fetched, created);

    // Step 5: delete.
    client.delete_consultation(id).await.unwrap();

    // Step 6: get after delete — backend 404 with payload.
    let err = client.get_consultation(id).await.unwrap_err();
    assert!(err.is_not_found());

    // Step 7: delete again — still 404, nothing considered deleted.
    let err = client.delete_consultation(id).await.unwrap_err();
    assert!(err.is_not_found());

    let requests = logger.requests();
    assert_eq!(
        requests,
        vec![
            (HttpMethod::Get, "/api/diagnosis?search=".to_string()),
            (HttpMethod::Get, "/api/diagnosis?search=hypertension".to_string()),
            (HttpMethod::Post, "/api/consultation".to_string()),
            (HttpMethod::Get, "/api/consultations?skip=0&limit=100".to_string()),
            (HttpMethod::Get, format!("/api/consultation/{id}")),
            (HttpMethod::Delete, format!("/api/consultation/{id}")),
            (HttpMethod::Get, format!("/api/consultation/{id}")),
            (HttpMethod::Delete, format!("/api/consultation/{id}")),
        ]
    );
    let failures = logger.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].0, Operation::GetConsultation);
    assert_eq!(failures[1].0, Operation::DeleteConsultation);
}

#[tokio::test]
async fn missing_consultation_returns_backend_payload() {
    let (client, logger) = connect().await;

    let err = client.get_consultation(42).await.unwrap_err();
    match &err {
        ApiError::Backend { status, payload, .. } => {
            assert_eq!(*status, 404);
            assert_eq!(
                payload.as_ref().and_then(ErrorPayload::detail_message),
                Some("Consultation with ID 42 not found")
            );
        }
        other => panic!("expected backend error, got {other:?}"),
    }

    assert_eq!(
        logger.requests(),
        vec![(HttpMethod::Get, "/api/consultation/42".to_string())]
    );
    assert_eq!(
        logger.failures(),
        vec![(
            Operation::GetConsultation,
            r#"{"detail":"Consultation with ID 42 not found"}"#.to_string()
        )]
    );
}

#[tokio::test]
async fn backend_validation_errors_pass_through() {
    let (client, _logger) = connect().await;

    let err = client
        .create_consultation(&NewConsultation::new("Jane Doe", ["Z99.99"], "x"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(
        err.payload().and_then(ErrorPayload::detail_message),
        Some("Invalid diagnosis code: Z99.99")
    );

    let err = client
        .create_consultation(&NewConsultation::new("   ", ["I10"], "x"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    let detail = err.payload().and_then(ErrorPayload::detail).unwrap();
    assert_eq!(detail[0]["msg"], "Patient name is required");

    // The page window is not checked locally either.
    let err = client
        .get_consultations(PageRequest::new(0, 0))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.payload().is_some());

    let err = client
        .get_consultations(PageRequest::new(-1, 100))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    let detail = err.payload().and_then(ErrorPayload::detail).unwrap();
    assert_eq!(detail[0]["loc"][1], "skip");
}

#[tokio::test]
async fn schema_rejections_carry_detail_payload() {
    let (client, _logger) = connect().await;

    // A body missing a required field can only be sent through the raw path.
    let mut request = client
        .core()
        .build_create_consultation(&NewConsultation::new("Jane Doe", ["I10"], "x"))
        .unwrap();
    request.body = Some(r#"{"patient_name":"Jane Doe","diagnosis_codes":["I10"]}"#.to_string());
    let response = client.execute(request).await.unwrap();
    let err = client.core().parse_create_consultation(response).unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.payload().is_some());
    assert!(err.payload().and_then(ErrorPayload::detail).unwrap().is_array());

    let mut request = client.core().build_get_consultation(1);
    request.url = request.url.replace("/api/consultation/1", "/api/consultation/abc");
    let response = client.execute(request).await.unwrap();
    let err = client.core().parse_get_consultation(response).unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.payload().is_some());
}

#[tokio::test]
async fn concurrent_creates_get_distinct_ids() {
    let (client, logger) = connect().await;

    let a = NewConsultation::new("Patient A", ["I10"], "Notes A");
    let b = NewConsultation::new("Patient B", ["J45.909"], "Notes B");
    let c = NewConsultation::new("Patient C", ["M54.5"], "Notes C");
    let (ra, rb, rc) = tokio::join!(
        client.create_consultation(&a),
        client.create_consultation(&b),
        client.create_consultation(&c),
    );

    let mut ids = vec![ra.unwrap().id, rb.unwrap().id, rc.unwrap().id];
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    let page = client.get_consultations(PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(logger.failures().is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let (client, logger) = client_for(ClientConfig::default().with_base_url(format!("http://{addr}")));

    let err = client.search_diagnosis_codes(None).await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, ApiError::Transport { timed_out: false, .. }));

    let failures = logger.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, Operation::SearchDiagnosisCodes);
    assert_eq!(failures[0].1, err.log_detail());
}

#[tokio::test]
async fn silent_backend_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = ClientConfig::default()
        .with_base_url(format!("http://{addr}"))
        .with_timeout(Duration::from_millis(200));
    let (client, logger) = client_for(config);

    let err = client.get_consultations(PageRequest::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { timed_out: true, .. }));
    assert_eq!(logger.failures().len(), 1);
}
