// Client for the external machine-learning graders.

use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::ScoringConfig;
use crate::models::QuizKind;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Scoring request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Scoring service answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    file: &'a str,
    label: &'a str,
}

/// The graders answer `{"checkk": true|false}`.
#[derive(Debug, Deserialize)]
struct ScoreResponse {
    #[serde(rename = "checkk")]
    correct: bool,
}

pub struct ScoringClient {
    http: reqwest::Client,
    spelling_url: String,
    pronunciation_url: String,
}

impl ScoringClient {
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            spelling_url: config.spelling_url.clone(),
            pronunciation_url: config.pronunciation_url.clone(),
        })
    }

    /// Asks the grader of `kind` whether the artifact at `file_url` matches
    /// `label`. The spelling grader takes JSON, the pronunciation grader a
    /// multipart form with the same two fields.
    pub async fn check(&self, kind: QuizKind, file_url: &str, label: &str) -> Result<bool, ScoringError> {
        let request = match kind {
            QuizKind::Spelling => self
                .http
                .post(&self.spelling_url)
                .json(&ScoreRequest { file: file_url, label }),
            QuizKind::Pronunciation => self
                .http
                .post(&self.pronunciation_url)
                .multipart(Form::new().text("file", file_url.to_string()).text("label", label.to_string())),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Rejected { status: status.as_u16(), body });
        }

        let verdict: ScoreResponse = response.json().await?;
        info!("{} grader verdict for '{}': {}", kind, label, verdict.correct);
        Ok(verdict.correct)
    }
}
