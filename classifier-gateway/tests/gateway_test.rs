//! Integration tests for the predict pipeline against a mock model backend.

use std::sync::Arc;
use std::time::Duration;

use classifier_common::HealthStatus;
use classifier_gateway::error::{Error, ErrorKind, Result, Stage};
use classifier_gateway::transport::REQUEST_ID_HEADER;
use classifier_gateway::{
    Gateway, HealthProbe, ImageTensor, LabelTable, Preprocessor, RequestBuilder, RetryPolicy,
    RetryingTransport,
};
use reqwest::Client;
use serde_json::json;
use tokio::time::Instant;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREDICT_PATH: &str = "/v1/models/image_classifier:predict";
const STATUS_PATH: &str = "/v1/models/image_classifier";
const INPUT_SIZE: usize = 2;

/// Produces a constant tensor regardless of input.
struct StubPreprocessor {
    size: usize,
}

impl Preprocessor for StubPreprocessor {
    fn preprocess(&self, image: &[u8]) -> Result<ImageTensor> {
        if image.is_empty() {
            return Err(Error::InvalidImage("empty upload".to_string()));
        }
        Ok(ImageTensor::filled(self.size, self.size, 0.5))
    }
}

/// Fails hard, as a buggy decoder would.
struct PanickingPreprocessor;

impl Preprocessor for PanickingPreprocessor {
    fn preprocess(&self, _image: &[u8]) -> Result<ImageTensor> {
        panic!("decoder blew up");
    }
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts).with_backoff(Duration::from_millis(5), Duration::from_millis(20))
}

fn build_gateway(
    server: &MockServer,
    labels: &[&str],
    policy: RetryPolicy,
    attempt_timeout: Duration,
    tensor_size: usize,
) -> Gateway {
    let labels = Arc::new(LabelTable::new(labels.iter().copied()).unwrap());
    let transport = RetryingTransport::new(
        Client::new(),
        format!("{}{}", server.uri(), PREDICT_PATH),
        attempt_timeout,
        policy,
    );
    let health = HealthProbe::new(
        Client::new(),
        format!("{}{}", server.uri(), STATUS_PATH),
        Duration::from_millis(200),
    );

    Gateway::new(
        labels,
        Arc::new(StubPreprocessor { size: tensor_size }),
        RequestBuilder::new(INPUT_SIZE, INPUT_SIZE),
        Arc::new(transport),
        health,
    )
}

fn cat_dog_gateway(server: &MockServer) -> Gateway {
    build_gateway(
        server,
        &["cat", "dog"],
        fast_policy(3),
        Duration::from_secs(2),
        INPUT_SIZE,
    )
}

async fn mount_predictions(server: &MockServer, predictions: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "predictions": predictions })))
        .mount(server)
        .await;
}

async fn predict_requests(server: &MockServer) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == PREDICT_PATH)
        .collect()
}

#[tokio::test]
async fn test_predict_returns_best_class() {
    let server = MockServer::start().await;
    mount_predictions(&server, json!([[0.3, 0.7]])).await;

    let gateway = cat_dog_gateway(&server);
    let result = gateway.predict(b"image", 1).await.unwrap();

    assert_eq!(result.pairs(), vec![("dog", 0.7)]);
}

#[tokio::test]
async fn test_predict_sends_instances_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .and(header_exists(REQUEST_ID_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": [[0.3, 0.7]]})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = cat_dog_gateway(&server);
    gateway.predict(b"image", 2).await.unwrap();

    let requests = predict_requests(&server).await;
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        json!({"instances": [[[[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]], [[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]]]]})
    );
}

#[tokio::test]
async fn test_retries_transient_failures_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_predictions(&server, json!([[0.3, 0.7]])).await;

    let gateway = cat_dog_gateway(&server);
    let result = gateway.predict(b"image", 1).await.unwrap();

    assert_eq!(result.pairs(), vec![("dog", 0.7)]);
    let requests = predict_requests(&server).await;
    assert_eq!(requests.len(), 3);

    // All attempts of one call share the correlation id.
    let ids: Vec<String> = requests
        .iter()
        .map(|r| {
            r.headers
                .get(REQUEST_ID_HEADER)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert!(ids.iter().all(|id| id == &ids[0]));
}

#[tokio::test]
async fn test_persistent_503_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let gateway = cat_dog_gateway(&server);
    let err = gateway.predict(b"image", 1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert_eq!(err.stage, Stage::Transport);
    assert!(err.correlation_id.is_some());
    match err.source {
        Error::BackendUnavailable { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.to_string(), "backend returned HTTP 503");
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
    assert_eq!(predict_requests(&server).await.len(), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad instances"))
        .mount(&server)
        .await;

    let gateway = cat_dog_gateway(&server);
    let err = gateway.predict(b"image", 1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackendRejected);
    assert!(err.to_string().contains("bad instances"));
    assert_eq!(predict_requests(&server).await.len(), 1);
}

#[tokio::test]
async fn test_slow_backend_times_out_each_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"predictions": [[0.3, 0.7]]}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let gateway = build_gateway(
        &server,
        &["cat", "dog"],
        fast_policy(2),
        Duration::from_millis(50),
        INPUT_SIZE,
    );
    let err = gateway.predict(b"image", 1).await.unwrap_err();

    match err.source {
        Error::BackendUnavailable { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(last, classifier_gateway::TransientCause::Timeout(_)));
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_deadline_stops_before_second_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let gateway = build_gateway(
        &server,
        &["cat", "dog"],
        fast_policy(3),
        Duration::from_millis(100),
        INPUT_SIZE,
    );
    let deadline = Instant::now() + Duration::from_millis(50);
    let err = gateway
        .predict_with_deadline(b"image", 1, deadline)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert!(predict_requests(&server).await.len() <= 1);
}

#[tokio::test]
async fn test_deadline_stops_backoff_that_would_overrun() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = RetryPolicy::new(3)
        .with_backoff(Duration::from_millis(500), Duration::from_secs(5))
        .with_jitter(false);
    let gateway = build_gateway(&server, &["cat", "dog"], policy, Duration::from_secs(2), INPUT_SIZE);
    let deadline = Instant::now() + Duration::from_millis(50);
    let err = gateway
        .predict_with_deadline(b"image", 1, deadline)
        .await
        .unwrap_err();

    assert!(
        matches!(err.source, Error::DeadlineExceeded { attempts: 1 }),
        "got {:?}",
        err.source
    );
    assert_eq!(predict_requests(&server).await.len(), 1);
}

#[tokio::test]
async fn test_expired_deadline_sends_nothing() {
    let server = MockServer::start().await;
    mount_predictions(&server, json!([[0.3, 0.7]])).await;

    let gateway = cat_dog_gateway(&server);
    let deadline = Instant::now() - Duration::from_millis(1);
    let err = gateway
        .predict_with_deadline(b"image", 1, deadline)
        .await
        .unwrap_err();

    assert!(matches!(err.source, Error::DeadlineExceeded { attempts: 0 }));
    assert!(predict_requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_missing_predictions_is_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"outputs": [[0.3, 0.7]]})))
        .mount(&server)
        .await;

    let gateway = cat_dog_gateway(&server);
    let err = gateway.predict(b"image", 1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(err.stage, Stage::Validate);
    assert_eq!(predict_requests(&server).await.len(), 1);
}

#[tokio::test]
async fn test_label_count_mismatch() {
    let server = MockServer::start().await;
    mount_predictions(&server, json!([[0.1, 0.2]])).await;

    let labels = LabelTable::cifar10();
    let names: Vec<&str> = labels.as_slice().iter().map(String::as_str).collect();
    let gateway = build_gateway(&server, &names, fast_policy(3), Duration::from_secs(2), INPUT_SIZE);
    let err = gateway.predict(b"image", 1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LabelMismatch);
}

#[tokio::test]
async fn test_wrong_tensor_shape_never_reaches_backend() {
    let server = MockServer::start().await;
    mount_predictions(&server, json!([[0.3, 0.7]])).await;

    let gateway = build_gateway(&server, &["cat", "dog"], fast_policy(3), Duration::from_secs(2), 3);
    let err = gateway.predict(b"image", 1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Shape);
    assert_eq!(err.stage, Stage::BuildRequest);
    assert!(err.correlation_id.is_none());
    assert!(predict_requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_invalid_input_is_reported_from_preprocess() {
    let server = MockServer::start().await;
    let gateway = cat_dog_gateway(&server);

    let err = gateway.predict(b"", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(err.stage, Stage::Preprocess);
}

#[tokio::test]
async fn test_preprocessor_panic_is_contained() {
    let server = MockServer::start().await;
    mount_predictions(&server, json!([[0.3, 0.7]])).await;

    let transport = RetryingTransport::new(
        Client::new(),
        format!("{}{}", server.uri(), PREDICT_PATH),
        Duration::from_secs(2),
        fast_policy(3),
    );
    let health = HealthProbe::new(
        Client::new(),
        format!("{}{}", server.uri(), STATUS_PATH),
        Duration::from_millis(200),
    );
    let gateway = Gateway::new(
        Arc::new(LabelTable::new(["cat", "dog"]).unwrap()),
        Arc::new(PanickingPreprocessor),
        RequestBuilder::new(INPUT_SIZE, INPUT_SIZE),
        Arc::new(transport),
        health,
    );

    let err = gateway.predict(b"image", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.stage, Stage::Preprocess);
    assert!(predict_requests(&server).await.is_empty());

    // The gateway stays usable afterwards.
    let err = gateway.predict(b"image", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn test_concurrent_predictions_share_gateway() {
    let server = MockServer::start().await;
    mount_predictions(&server, json!([[0.3, 0.7]])).await;

    let gateway = Arc::new(cat_dog_gateway(&server));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.predict(b"image", 2).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.pairs(), vec![("dog", 0.7), ("cat", 0.3)]);
    }
    assert_eq!(predict_requests(&server).await.len(), 8);
}

#[tokio::test]
async fn test_check_health_tracks_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version_status": [{"version": "1", "state": "AVAILABLE"}]
        })))
        .mount(&server)
        .await;

    let gateway = cat_dog_gateway(&server);
    assert_eq!(gateway.last_known_health(), HealthStatus::Unknown);
    assert_eq!(gateway.check_health().await, HealthStatus::Healthy);
    assert_eq!(gateway.last_known_health(), HealthStatus::Healthy);

    server.reset().await;
    assert_eq!(gateway.check_health().await, HealthStatus::Unavailable);
}
