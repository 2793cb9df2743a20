use super::{JobBudget, RequestPacer, RetryPolicy, TextRecognizer};
use crate::config::{Credentials, OcrConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// Lifecycle state reported by the read API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadOperation {
    status: JobStatus,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    read_results: Vec<ReadResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadResult {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadLine {
    text: String,
}

impl ReadOperation {
    fn into_lines(self) -> Vec<String> {
        self.analyze_result
            .map(|result| {
                result
                    .read_results
                    .into_iter()
                    .flat_map(|page| page.lines.into_iter().map(|line| line.text))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One submitted recognition job
#[derive(Debug, Clone)]
pub struct RecognitionJob {
    pub operation_location: Url,
    pub status: JobStatus,
    pub lines: Vec<String>,
}

/// Client for the asynchronous read API
pub struct OcrClient {
    client: Client,
    endpoint: Url,
    subscription_key: String,
    policy: RetryPolicy,
    pacer: Option<RequestPacer>,
}

impl OcrClient {
    pub fn new(config: &OcrConfig, credentials: &Credentials) -> Result<Self> {
        let endpoint = Url::parse(&credentials.ocr_endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create OCR HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            subscription_key: credentials.ocr_subscription_key.clone(),
            policy: RetryPolicy::from_config(config),
            pacer: config.requests_per_minute.map(RequestPacer::per_minute),
        })
    }

    /// Send a request, sleeping through 429 responses within the job budget
    async fn send_honoring_rate_limit(
        &self,
        request: RequestBuilder,
        budget: &mut JobBudget<'_>,
    ) -> Result<Response> {
        loop {
            budget.check_deadline()?;
            if let Some(pacer) = &self.pacer {
                pacer.ready().await;
            }

            let attempt = request.try_clone().ok_or_else(|| {
                Error::Recognition("Failed to clone OCR request".to_string())
            })?;
            let response = attempt.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = self
                    .policy
                    .rate_limit_wait(response.headers().get(RETRY_AFTER));
                budget.record_rate_limit(wait)?;
                warn!("HTTP 429, waiting {} seconds", wait.as_secs());
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Recognition(format!(
                    "API returned status code: {}, {}",
                    status.as_u16(),
                    body
                )));
            }

            return Ok(response);
        }
    }

    /// Submit raw image bytes and return the job to poll
    pub async fn submit(&self, image: Vec<u8>, budget: &mut JobBudget<'_>) -> Result<RecognitionJob> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image);

        let response = self.send_honoring_rate_limit(request, budget).await?;
        let location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                Error::Recognition(format!(
                    "response {} carried no {} header",
                    response.status(),
                    OPERATION_LOCATION_HEADER
                ))
            })?;
        let operation_location = self.endpoint.join(location)?;

        debug!("Submitted recognition job: {}", operation_location);
        Ok(RecognitionJob {
            operation_location,
            status: JobStatus::NotStarted,
            lines: Vec::new(),
        })
    }

    /// Poll a submitted job until it reaches a terminal status
    pub async fn poll(&self, job: &mut RecognitionJob, budget: &mut JobBudget<'_>) -> Result<()> {
        let mut first = true;
        while !job.status.is_terminal() {
            if !first {
                tokio::time::sleep(self.policy.poll_interval).await;
            }
            first = false;

            let request = self
                .client
                .get(job.operation_location.clone())
                .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key);
            let response = self.send_honoring_rate_limit(request, budget).await?;
            let body = response.text().await?;
            let operation: ReadOperation = serde_json::from_str(&body).map_err(|e| {
                Error::Recognition(format!("Malformed job status ({}): {}", e, body))
            })?;

            debug!("Recognition job status: {:?}", operation.status);
            job.status = operation.status;
            match operation.status {
                JobStatus::Succeeded => job.lines = operation.into_lines(),
                JobStatus::Failed => {
                    return Err(Error::Recognition(format!("Response: {}", body)));
                }
                JobStatus::NotStarted | JobStatus::Running => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TextRecognizer for OcrClient {
    async fn recognize(&self, image: Vec<u8>) -> Result<Vec<String>> {
        let mut budget = JobBudget::start(&self.policy);
        let mut job = self.submit(image, &mut budget).await?;
        self.poll(&mut job, &mut budget).await?;
        if budget.rate_limited() > 0 {
            debug!("Recognition finished after {} rate-limited attempts", budget.rate_limited());
        }
        Ok(job.lines)
    }
}
