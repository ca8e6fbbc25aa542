use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use embedder::config::FunctionsConfig;
use embedder::invoker::{EmbeddingInvoker, FunctionInvoker, InvokeOutcome};
use embedder::models::EntityType;
use embedder::payload::{EmbeddingRequest, JobData};

fn functions(base_url: String) -> FunctionsConfig {
    FunctionsConfig {
        base_url,
        service_key: "service-key".to_string(),
        candidate_function: "generate-candidate-embedding".to_string(),
        job_function: "generate-job-embedding".to_string(),
    }
}

fn job_request(id: Uuid) -> EmbeddingRequest {
    EmbeddingRequest::JobPosting {
        job_posting_id: id,
        job_data: JobData {
            title: "Platform Engineer".to_string(),
            categories: vec!["infrastructure".to_string()],
            location: Some("Berlin".to_string()),
            requirements: Some("Postgres".to_string()),
            description_ref: Some("jobs/platform.md".to_string()),
        },
    }
}

fn invoker(server: &MockServer) -> FunctionInvoker {
    FunctionInvoker::new(functions(server.uri()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn posts_job_payload_to_job_function() {
    let server = MockServer::start().await;
    let id = Uuid::now_v7();

    Mock::given(method("POST"))
        .and(path("/generate-job-embedding"))
        .and(header("authorization", "Bearer service-key"))
        .and(body_partial_json(json!({
            "job_posting_id": id,
            "job_data": { "title": "Platform Engineer", "categories": ["infrastructure"] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = invoker(&server).invoke(&job_request(id)).await;
    assert_eq!(outcome, InvokeOutcome::success());
}

#[tokio::test]
async fn candidate_requests_use_candidate_function() {
    let server = MockServer::start().await;
    let invoker = invoker(&server);

    assert_eq!(
        invoker.url_for(EntityType::Candidate),
        format!("{}/generate-candidate-embedding", server.uri())
    );
    assert_eq!(
        invoker.url_for(EntityType::JobPosting),
        format!("{}/generate-job-embedding", server.uri())
    );
}

#[tokio::test]
async fn non_success_status_is_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let outcome = invoker(&server).invoke(&job_request(Uuid::now_v7())).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("HTTP 503: overloaded"));
}

#[tokio::test]
async fn reported_failure_in_ok_response_is_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "embedding model unavailable" })),
        )
        .mount(&server)
        .await;

    let outcome = invoker(&server).invoke(&job_request(Uuid::now_v7())).await;
    assert_eq!(outcome, InvokeOutcome::failure("embedding model unavailable"));
}

#[tokio::test]
async fn transport_error_is_failure() {
    // Nothing listens on port 1.
    let invoker =
        FunctionInvoker::new(functions("http://127.0.0.1:1".to_string()), Duration::from_secs(2))
            .unwrap();

    let outcome = invoker.invoke(&job_request(Uuid::now_v7())).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("failed"));
}

#[tokio::test]
async fn client_timeout_is_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let invoker = FunctionInvoker::new(functions(server.uri()), Duration::from_millis(100)).unwrap();
    let outcome = invoker.invoke(&job_request(Uuid::now_v7())).await;
    assert!(!outcome.success);
}

#[tokio::test]
async fn long_reported_failure_is_not_mistaken_for_success() {
    let server = MockServer::start().await;
    let trace = "x".repeat(2000);

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": trace })),
        )
        .mount(&server)
        .await;

    let outcome = invoker(&server).invoke(&job_request(Uuid::now_v7())).await;
    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert!(error.starts_with("xxx"));
    assert_eq!(error.len(), 1024);
}

#[tokio::test]
async fn long_success_body_is_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "embedding": vec![0.25_f32; 1536] })),
        )
        .mount(&server)
        .await;

    let outcome = invoker(&server).invoke(&job_request(Uuid::now_v7())).await;
    assert_eq!(outcome, InvokeOutcome::success());
}
