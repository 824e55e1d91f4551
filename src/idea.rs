//! Promotion-idea suggestions from the Gemini `generateContent` API.
//!
//! Blocking HTTP client (called from a worker thread in the GUI and directly
//! from the CLI). Request building and response parsing are pure functions so
//! they can be tested without the network.

use std::sync::Arc;
use std::time::Duration;

use crate::settings::AppSettings;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header line placed above every appended suggestion.
pub const IDEA_HEADER: &str = "[AI 추천 아이디어💡]";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdeaError {
    /// The environment variable holding the API key is unset or empty.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The response parsed but carried no suggestion text.
    #[error("no response text from the API")]
    EmptyResponse,
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdeaTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeaConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeouts: IdeaTimeouts,
}

impl IdeaConfig {
    /// Build config from settings, reading the key from the process environment.
    pub fn from_env(settings: &AppSettings) -> Result<Self, IdeaError> {
        Self::from_lookup(settings, |var| std::env::var(var).ok())
    }

    /// Build config from settings, resolving the key variable through `lookup`.
    pub fn from_lookup(settings: &AppSettings, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IdeaError> {
        let var = if settings.api_key_env.trim().is_empty() {
            DEFAULT_API_KEY_ENV.to_string()
        } else {
            settings.api_key_env.trim().to_string()
        };
        let api_key = lookup(&var)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| IdeaError::MissingApiKey { var: var.clone() })?;

        let model = if settings.idea_model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            settings.idea_model.trim().to_string()
        };

        Ok(Self {
            api_key,
            model,
            base_url: API_BASE_URL.to_string(),
            timeouts: IdeaTimeouts {
                request_secs: settings.request_timeout_secs,
                connect_secs: settings.connect_timeout_secs,
            },
        })
    }
}

// =============================================================================
// GENERATORS
// =============================================================================

/// Anything that can suggest a promotion idea for a heritage site.
pub trait IdeaGenerator: Send + Sync {
    fn generate(&self, heritage_name: &str) -> Result<String, IdeaError>;
}

/// Generator used when no credential is configured; every request fails with
/// the configuration error it was built from.
pub struct Unconfigured {
    var: String,
}

impl Unconfigured {
    pub fn for_variable(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl IdeaGenerator for Unconfigured {
    fn generate(&self, _heritage_name: &str) -> Result<String, IdeaError> {
        Err(IdeaError::MissingApiKey { var: self.var.clone() })
    }
}

/// Build the generator for the current settings.  Missing credentials are
/// not fatal: the returned generator reports them when used.
pub fn connect(settings: &AppSettings) -> Arc<dyn IdeaGenerator> {
    let built = IdeaConfig::from_env(settings).and_then(GeminiClient::new);
    match built {
        Ok(client) => {
            log_info!("Idea: using model {}", client.config.model);
            Arc::new(client)
        }
        Err(IdeaError::MissingApiKey { var }) => {
            log_warn!("Idea: env var {} not set, suggestions disabled", var);
            Arc::new(Unconfigured::for_variable(var))
        }
        Err(e) => {
            log_err!("Idea: client setup failed: {}", e);
            Arc::new(Unconfigured::for_variable(settings.api_key_env.clone()))
        }
    }
}

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    config: IdeaConfig,
}

impl GeminiClient {
    pub fn new(config: IdeaConfig) -> Result<Self, IdeaError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| IdeaError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.config.base_url, self.config.model)
    }
}

impl IdeaGenerator for GeminiClient {
    fn generate(&self, heritage_name: &str) -> Result<String, IdeaError> {
        let prompt = build_prompt(heritage_name);
        let body = GenerateRequest::new(&prompt);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| IdeaError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response.text().map_err(|e| IdeaError::ApiRequest(e.to_string()))?;

        if status != 200 {
            return Err(IdeaError::ApiResponse { status, body: text });
        }

        parse_response(&text)
    }
}

// =============================================================================
// PROMPT & WIRE TYPES
// =============================================================================

/// Fixed prompt asking for one short, child-friendly promotion idea.
pub fn build_prompt(heritage_name: &str) -> String {
    format!(
        "저는 한국의 초등학교 4학년 학생입니다. 우리나라의 소중한 국가유산인 '{heritage_name}'을 \
         친구들에게 쉽고 재미있게 알리고 싶어요. 초등학생 눈높이에 맞는 홍보 아이디어 한 가지를 \
         100자 이내로 간단하게 제안해주세요."
    )
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [RequestContent { parts: [RequestPart { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: 0.8,
                top_p: 1.0,
                top_k: 32,
                max_output_tokens: 200,
                thinking_config: ThinkingConfig { thinking_budget: 100 },
            },
        }
    }
}

#[derive(serde::Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(serde::Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    thinking_config: ThinkingConfig,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

/// Concatenate the non-thought text parts of the first candidate.
pub fn parse_response(json: &str) -> Result<String, IdeaError> {
    let api: GenerateResponse = serde_json::from_str(json).map_err(|e| IdeaError::ApiParse(e.to_string()))?;

    let text: String = api
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(IdeaError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Append a suggestion under the idea header, separated from existing
/// content by a blank line.
pub fn append_idea(content: &str, idea: &str) -> String {
    if content.is_empty() {
        format!("{IDEA_HEADER}\n{idea}")
    } else {
        format!("{content}\n\n{IDEA_HEADER}\n{idea}")
    }
}
