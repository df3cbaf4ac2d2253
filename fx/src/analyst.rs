//! Market commentary from a generative model, with templated fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fxbrief_common::{constants, CurrencyPair, DurationExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::commentary::synthesize;
use crate::error::{FxError, FxResult};

/// Base URL of the Gemini REST API.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the Gemini API key.
pub const GEMINI_API_KEY_HEADER: &str = "x-goog-api-key";

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Generative text model that turns a prompt into a completion.
#[async_trait]
pub trait CommentaryModel: Send + Sync {
    /// Model name for logs.
    fn name(&self) -> &str;

    /// Produce a completion for a single text prompt.
    async fn generate(&self, prompt: &str) -> FxResult<String>;
}

/// Prompt sent to the commentary model for a pair at a rate.
pub fn build_prompt(pair: &CurrencyPair, rate: Decimal) -> String {
    format!(
        "As a senior FX strategist, write a 60-80 word professional market analysis of \
         {base}/{target} trading at {rate}. Cover the key economic drivers, the impact of \
         central bank policy on both currencies, and the short-term technical outlook. \
         Respond with a single paragraph of plain text.",
        base = pair.base,
        target = pair.target,
        rate = rate,
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Join the text parts of the first candidate.
fn completion_text(response: GenerateResponse) -> FxResult<String> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(FxError::CommentaryUnavailable("empty completion".to_string()));
    }

    Ok(text.to_string())
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiModel {
    /// Create a client for the default model.
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            timeout: constants::upstream_timeout().as_std(),
        }
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl CommentaryModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> FxResult<String> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(GEMINI_API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                FxError::CommentaryUnavailable(format!("request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::CommentaryUnavailable(format!(
                "model returned status {}",
                status
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                FxError::CommentaryUnavailable(format!("malformed response: {}", e.without_url()))
            })?;

        completion_text(body)
    }
}

/// Commentary usage counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystStats {
    pub generated: u64,
    pub fallbacks: u64,
}

/// Produces commentary for a quote.
///
/// Asks the model once; any failure is logged and answered with the
/// templated commentary instead. Never returns an error.
pub struct MarketAnalyst {
    model: Option<Arc<dyn CommentaryModel>>,
    generated: AtomicU64,
    fallbacks: AtomicU64,
}

impl MarketAnalyst {
    /// Analyst backed by a generative model.
    pub fn new(model: Arc<dyn CommentaryModel>) -> Self {
        Self {
            model: Some(model),
            generated: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Analyst that always uses templated commentary.
    pub fn fallback_only() -> Self {
        Self {
            model: None,
            generated: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Commentary for `pair` at `rate`.
    pub async fn analyze(&self, pair: &CurrencyPair, rate: Decimal) -> String {
        match self.generate(pair, rate).await {
            Ok(text) => {
                self.generated.fetch_add(1, Ordering::Relaxed);
                text
            }
            Err(e) => {
                warn!(pair = %pair, error = %e, "Commentary model failed, using templated analysis");
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                synthesize(pair, rate)
            }
        }
    }

    async fn generate(&self, pair: &CurrencyPair, rate: Decimal) -> FxResult<String> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| FxError::CommentaryUnavailable("no model configured".to_string()))?;

        let text = model.generate(&build_prompt(pair, rate)).await?;
        debug!(model = model.name(), pair = %pair, "Generated commentary");
        Ok(text)
    }

    /// Get usage counters.
    pub fn stats(&self) -> AnalystStats {
        AnalystStats {
            generated: self.generated.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Mock commentary model for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockCommentaryModel {
    reply: Option<String>,
    prompts: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockCommentaryModel {
    /// Model that always answers `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Model that always fails.
    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Number of prompts received.
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Prompt received on the given call.
    pub fn prompt(&self, call: usize) -> Option<String> {
        self.prompts.lock().get(call).cloned()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl CommentaryModel for MockCommentaryModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> FxResult<String> {
        self.prompts.lock().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| FxError::CommentaryUnavailable("quota exceeded".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use axum::http::{header, HeaderMap, StatusCode, Uri};
    use axum::Router;
    use fxbrief_common::Currency;
    use rust_decimal_macros::dec;

    fn usd_eur() -> CurrencyPair {
        CurrencyPair::new(Currency::usd(), Currency::eur())
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt(&usd_eur(), dec!(0.92));

        assert!(prompt.contains("USD/EUR"));
        assert!(prompt.contains("0.92"));
        assert!(prompt.contains("60-80 word"));
        assert!(prompt.contains("central bank"));
        assert!(prompt.contains("technical outlook"));
    }

    #[test]
    fn test_completion_text() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "The dollar " }, { "text": "holds firm. " }] }
            }]
        }))
        .unwrap();

        assert_eq!(completion_text(response).unwrap(), "The dollar holds firm.");
    }

    #[test]
    fn test_completion_text_empty() {
        let response: GenerateResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(completion_text(response).is_err());

        let blocked: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(completion_text(blocked).is_err());
    }

    #[test]
    fn test_gemini_endpoint() {
        let model = GeminiModel::new(reqwest::Client::new(), "key")
            .with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(
            model.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_analyst_uses_model() {
        let model = Arc::new(MockCommentaryModel::replying("Generated view."));
        let analyst = MarketAnalyst::new(model.clone());

        let text = analyst.analyze(&usd_eur(), dec!(0.92)).await;

        assert_eq!(text, "Generated view.");
        assert_eq!(model.calls(), 1);
        assert!(model.prompt(0).unwrap().contains("USD/EUR"));
        assert_eq!(analyst.stats(), AnalystStats { generated: 1, fallbacks: 0 });
    }

    #[tokio::test]
    async fn test_mock_records_concurrent_prompts() {
        let model = Arc::new(MockCommentaryModel::replying("ok"));
        let analyst = MarketAnalyst::new(model.clone());
        let gbp_usd = CurrencyPair::new(Currency::gbp(), Currency::usd());
        let usd_eur = usd_eur();

        tokio::join!(
            analyst.analyze(&usd_eur, dec!(0.92)),
            analyst.analyze(&gbp_usd, dec!(1.27)),
        );

        assert_eq!(model.calls(), 2);
        let prompts: Vec<String> = (0..2).filter_map(|i| model.prompt(i)).collect();
        assert!(prompts.iter().any(|p| p.contains("USD/EUR")));
        assert!(prompts.iter().any(|p| p.contains("GBP/USD")));
    }

    #[tokio::test]
    async fn test_analyst_falls_back_on_failure() {
        let model = Arc::new(MockCommentaryModel::failing());
        let analyst = MarketAnalyst::new(model.clone());

        let text = analyst.analyze(&usd_eur(), dec!(0.92)).await;

        assert_eq!(text, synthesize(&usd_eur(), dec!(0.92)));
        assert!(text.contains("USD"));
        assert!(text.contains("EUR"));
        assert!(text.contains("weakening"));
        // No retry of the model call
        assert_eq!(model.calls(), 1);
        assert_eq!(analyst.stats(), AnalystStats { generated: 0, fallbacks: 1 });
    }

    #[tokio::test]
    async fn test_fallback_only_analyst() {
        let analyst = MarketAnalyst::fallback_only();
        let pair = CurrencyPair::new(Currency::gbp(), Currency::usd());

        let text = analyst.analyze(&pair, dec!(1.27)).await;

        assert!(text.contains("strengthening"));
        assert_eq!(analyst.stats().fallbacks, 1);
    }

    async fn model_answering(status: StatusCode, body: &'static str) -> GeminiModel {
        let app = Router::new().fallback(move || async move {
            (status, [(header::CONTENT_TYPE, "application/json")], body)
        });
        let url = testing::serve(app).await;
        GeminiModel::new(reqwest::Client::new(), "test-key").with_base_url(format!("{}/v1beta", url))
    }

    #[tokio::test]
    async fn test_gemini_sends_key_in_header() {
        let app = Router::new().fallback(|headers: HeaderMap, uri: Uri| async move {
            let authorized = headers
                .get(GEMINI_API_KEY_HEADER)
                .map_or(false, |key| key == "test-key");
            let expected_path = uri.path() == "/v1beta/models/gemini-1.5-flash:generateContent";

            if authorized && expected_path && uri.query().is_none() {
                (
                    StatusCode::OK,
                    r#"{"candidates":[{"content":{"parts":[{"text":"Euro steady."}]}}]}"#,
                )
            } else {
                (StatusCode::UNAUTHORIZED, "{}")
            }
        });
        let url = testing::serve(app).await;
        let model = GeminiModel::new(reqwest::Client::new(), "test-key")
            .with_base_url(format!("{}/v1beta", url));

        assert_eq!(model.generate("prompt").await.unwrap(), "Euro steady.");
    }

    #[tokio::test]
    async fn test_gemini_error_status() {
        let model = model_answering(StatusCode::TOO_MANY_REQUESTS, "{}").await;

        let err = model.generate("prompt").await.unwrap_err();

        assert!(matches!(err, FxError::CommentaryUnavailable(ref msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn test_gemini_empty_completion() {
        let model = model_answering(StatusCode::OK, r#"{"candidates":[]}"#).await;

        let err = model.generate("prompt").await.unwrap_err();

        assert!(matches!(err, FxError::CommentaryUnavailable(ref msg) if msg.contains("empty")));
    }

    #[tokio::test]
    async fn test_gemini_malformed_response() {
        let model = model_answering(StatusCode::OK, "<html>").await;

        assert!(matches!(
            model.generate("prompt").await,
            Err(FxError::CommentaryUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_gemini_failure_does_not_expose_key() {
        let model = GeminiModel::new(reqwest::Client::new(), "SUPERSECRETKEY")
            .with_base_url(format!("{}/v1beta", testing::CLOSED_URL));

        let err = model.generate("prompt").await.unwrap_err();

        assert!(matches!(err, FxError::CommentaryUnavailable(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));

        let analyst = MarketAnalyst::new(Arc::new(model));
        let text = analyst.analyze(&usd_eur(), dec!(0.92)).await;
        assert!(!text.contains("SUPERSECRETKEY"));
        assert_eq!(analyst.stats().fallbacks, 1);
    }
}
