//! Prediction pipeline orchestration.

use std::sync::Arc;
use std::time::Duration;

use classifier_common::{HealthStatus, TopKResult};
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{Error, PredictError, Stage};
use crate::health::HealthProbe;
use crate::labels::LabelTable;
use crate::preprocess::{ImagePreprocessor, Preprocessor};
use crate::rank::TopKRanker;
use crate::request::RequestBuilder;
use crate::transport::{RetryingTransport, Transport};
use crate::validate::ResponseValidator;

/// Front door to the model backend.
///
/// Runs image → preprocess → request → transport → validation → ranking for
/// each predict call, and probes backend health on demand. Holds no per-call
/// state; share it behind an `Arc`.
pub struct Gateway {
    labels: Arc<LabelTable>,
    preprocessor: Arc<dyn Preprocessor>,
    request_builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    validator: ResponseValidator,
    ranker: TopKRanker,
    health: HealthProbe,
    default_deadline: Option<Duration>,
}

impl Gateway {
    pub fn new(
        labels: Arc<LabelTable>,
        preprocessor: Arc<dyn Preprocessor>,
        request_builder: RequestBuilder,
        transport: Arc<dyn Transport>,
        health: HealthProbe,
    ) -> Self {
        let validator = ResponseValidator::new(labels.len());
        Self {
            labels,
            preprocessor,
            request_builder,
            transport,
            validator,
            ranker: TopKRanker,
            health,
            default_deadline: None,
        }
    }

    /// Apply `deadline` to every [`Gateway::predict`] call.
    pub fn with_default_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.default_deadline = deadline;
        self
    }

    /// Wire up the production pipeline from configuration.
    pub fn from_config(config: &Config, labels: Arc<LabelTable>) -> Result<Self, Error> {
        let input_size = config.model.input_size;
        let transport = RetryingTransport::from_config(&config.backend, config.retry.policy())?;

        let probe_client = Client::builder()
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        let health = HealthProbe::new(
            probe_client,
            config.backend.status_url(),
            config.backend.health_timeout(),
        );

        Ok(Self::new(
            labels,
            Arc::new(ImagePreprocessor::new(input_size)),
            RequestBuilder::square(input_size),
            Arc::new(transport),
            health,
        )
        .with_default_deadline(config.backend.request_deadline()))
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Classify an image and return its `k` best classes.
    pub async fn predict(&self, image: &[u8], k: usize) -> Result<TopKResult, PredictError> {
        let deadline = self.default_deadline.map(|d| Instant::now() + d);
        self.run(image, k, deadline).await
    }

    /// Like [`Gateway::predict`], giving up once `deadline` has passed.
    pub async fn predict_with_deadline(
        &self,
        image: &[u8],
        k: usize,
        deadline: Instant,
    ) -> Result<TopKResult, PredictError> {
        self.run(image, k, Some(deadline)).await
    }

    /// Probe the backend once.
    pub async fn check_health(&self) -> HealthStatus {
        self.health.probe().await
    }

    /// Result of the most recent health probe.
    pub fn last_known_health(&self) -> HealthStatus {
        self.health.last_known()
    }

    /// Probe the backend every `every` until the task is aborted.
    pub fn spawn_health_poller(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                gateway.check_health().await;
            }
        })
    }

    async fn run(
        &self,
        image: &[u8],
        k: usize,
        deadline: Option<Instant>,
    ) -> Result<TopKResult, PredictError> {
        let result = self.pipeline(image, k, deadline).await;
        if let Err(e) = &result {
            tracing::warn!(
                stage = %e.stage,
                correlation_id = ?e.correlation_id,
                kind = ?e.kind(),
                "Prediction failed: {}",
                e.source
            );
        }
        result
    }

    async fn pipeline(
        &self,
        image: &[u8],
        k: usize,
        deadline: Option<Instant>,
    ) -> Result<TopKResult, PredictError> {
        let started = Instant::now();

        if k == 0 {
            return Err(PredictError::new(
                Stage::Rank,
                None,
                Error::InvalidRequest("top_k must be at least 1".to_string()),
            ));
        }

        // Decoding and resizing are CPU bound; keep them off the async workers.
        let preprocessor = Arc::clone(&self.preprocessor);
        let upload = image.to_vec();
        let tensor = tokio::task::spawn_blocking(move || preprocessor.preprocess(&upload))
            .await
            .map_err(|e| Error::Internal(format!("preprocessing task failed: {}", e)))
            .and_then(|result| result)
            .map_err(|e| PredictError::new(Stage::Preprocess, None, e))?;

        let request = self
            .request_builder
            .build(&tensor)
            .map_err(|e| PredictError::new(Stage::BuildRequest, None, e))?;
        let correlation_id = request.correlation_id;
        drop(tensor);

        tracing::debug!(
            correlation_id = %correlation_id,
            payload_bytes = request.body.len(),
            top_k = k,
            "Dispatching predict request"
        );

        let fail = |stage: Stage| move |e: Error| PredictError::new(stage, Some(correlation_id), e);

        let body = self
            .transport
            .send(&request, deadline)
            .await
            .map_err(fail(Stage::Transport))?;

        let response = self
            .validator
            .validate(&body)
            .map_err(fail(Stage::Validate))?;

        let result = self
            .ranker
            .rank(&response, &self.labels, k)
            .map_err(fail(Stage::Rank))?;

        if let Some(best) = result.best() {
            tracing::info!(
                correlation_id = %correlation_id,
                class = %best.label,
                confidence = best.score,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Prediction complete"
            );
        }

        Ok(result)
    }
}
