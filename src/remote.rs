//! Remote classification collaborator
//!
//! An external service may be consulted between the date detector and the
//! similarity matcher. The call is bounded by a time budget and fail-open:
//! timeouts, transport errors, unknown keys and low-confidence answers are
//! logged and treated as "no match" so the pipeline moves on.

use crate::context::FieldContext;
use crate::error::RemoteError;
use crate::pipeline::{FieldInput, MatchMethod, MatchResult, MatchStrategy, PassState};
use crate::profile::ProfileKey;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Answer of the remote classifier
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RemoteClassification {
    /// Profile key name, or absent when the service has no opinion
    #[serde(rename = "fieldType", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// Lower-ranked candidate from the remote classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Alternative {
    #[serde(rename = "fieldType")]
    pub key: String,
    #[serde(default)]
    pub confidence: f64,
}

/// External field classifier
pub trait RemoteClassifier {
    /// Classify one field; implementations should give up after `timeout`
    fn classify(
        &self,
        context: &FieldContext,
        timeout: Duration,
    ) -> std::result::Result<RemoteClassification, RemoteError>;
}

/// Pipeline step wrapping a remote classifier
pub struct RemoteStrategy {
    classifier: Box<dyn RemoteClassifier>,
    min_confidence: f64,
    timeout: Duration,
}

impl RemoteStrategy {
    pub fn new(classifier: Box<dyn RemoteClassifier>, min_confidence: f64, timeout: Duration) -> Self {
        Self {
            classifier,
            min_confidence,
            timeout,
        }
    }

    fn call(&self, context: &FieldContext) -> std::result::Result<RemoteClassification, RemoteError> {
        let started = Instant::now();
        let timed_out = |elapsed: Duration| RemoteError::Timeout {
            elapsed_ms: elapsed.as_millis(),
            budget_ms: self.timeout.as_millis(),
        };
        // Client-side timeouts carry no timing of their own
        let answer = self
            .classifier
            .classify(context, self.timeout)
            .map_err(|e| match e {
                RemoteError::Timeout { .. } => timed_out(started.elapsed()),
                other => other,
            })?;
        let elapsed = started.elapsed();
        if elapsed > self.timeout {
            return Err(timed_out(elapsed));
        }
        Ok(answer)
    }

    /// Accepted key of a remote answer, if any
    pub fn accept(&self, answer: &RemoteClassification) -> Option<MatchResult> {
        let name = answer.key.as_deref()?;
        let key = match name.parse::<ProfileKey>() {
            Ok(key) => key,
            Err(_) => {
                debug!(key = name, "remote classifier returned unknown key");
                return None;
            }
        };
        if answer.confidence.is_nan() || answer.confidence < self.min_confidence {
            debug!(
                key = name,
                confidence = answer.confidence,
                "remote classification below threshold"
            );
            return None;
        }
        Some(MatchResult::matched(key, answer.confidence, MatchMethod::Remote))
    }
}

impl std::fmt::Debug for RemoteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStrategy")
            .field("min_confidence", &self.min_confidence)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl MatchStrategy for RemoteStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Remote
    }

    fn attempt(&mut self, input: &FieldInput<'_>, _pass: &mut PassState) -> Option<MatchResult> {
        match self.call(input.context) {
            Ok(answer) => self.accept(&answer),
            Err(e) => {
                warn!(error = %e, text = %input.context.combined_text, "remote classification failed");
                None
            }
        }
    }
}

#[cfg(feature = "remote")]
pub use http::HttpClassifier;

#[cfg(feature = "remote")]
mod http {
    use super::*;

    const SERVICE_NAME: &str = "fieldmatch";

    #[derive(Debug, Serialize)]
    struct ClassifyRequest<'a> {
        text: &'a str,
        features: RequestFeatures<'a>,
        service: &'a str,
    }

    #[derive(Debug, Serialize)]
    struct RequestFeatures<'a> {
        label: &'a str,
        placeholder: &'a str,
        #[serde(rename = "type")]
        input_type: &'a str,
        name: &'a str,
        id: &'a str,
    }

    /// Blocking HTTP client for a `/classify` endpoint
    #[derive(Debug, Clone)]
    pub struct HttpClassifier {
        client: reqwest::blocking::Client,
        endpoint: String,
        api_key: Option<String>,
    }

    impl HttpClassifier {
        pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
            Self {
                client: reqwest::blocking::Client::new(),
                endpoint: endpoint.into().trim_end_matches('/').to_string(),
                api_key,
            }
        }
    }

    impl RemoteClassifier for HttpClassifier {
        fn classify(
            &self,
            context: &FieldContext,
            timeout: Duration,
        ) -> std::result::Result<RemoteClassification, RemoteError> {
            let body = ClassifyRequest {
                text: &context.combined_text,
                features: RequestFeatures {
                    label: &context.label,
                    placeholder: &context.placeholder,
                    input_type: &context.input_type,
                    name: &context.name,
                    id: &context.id,
                },
                service: SERVICE_NAME,
            };

            let mut request = self
                .client
                .post(format!("{}/classify", self.endpoint))
                .timeout(timeout)
                .json(&body);
            if let Some(key) = &self.api_key {
                request = request.header("X-API-Key", key);
            }

            let response = request.send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(RemoteError::Transport(format!("HTTP {}", status)));
            }
            Ok(response.json::<RemoteClassification>()?)
        }
    }
}
