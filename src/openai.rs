//! LLM-backed PR description generation

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";

/// Client for the chat completions API
pub struct OpenAiClient {
    client: Client,
    api_url: String,
    token: String,
}

impl OpenAiClient {
    /// Create a client against the default endpoint
    pub fn new(token: &str) -> Result<Self> {
        Self::with_url(DEFAULT_API_URL, token)
    }

    /// Create a client against an explicit endpoint (tests use this)
    pub fn with_url(api_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("pr-pilot")
            .build()
            .map_err(|e| Error::OpenAi(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            token: token.to_string(),
        })
    }

    /// Draft a PR description from the title and repository context
    pub async fn draft_description(
        &self,
        title: &str,
        repo: &str,
        repo_description: Option<&str>,
    ) -> Result<String> {
        debug!(title, repo, "drafting PR description");

        let context = repo_description
            .map(|d| format!(" The repository is described as: {d}."))
            .unwrap_or_default();
        let prompt = format!(
            "Write a concise pull request description (2-4 sentences, markdown) \
             for a change titled \"{title}\" in the repository {repo}.{context} \
             Describe intent, not implementation. Do not repeat the title."
        );

        #[derive(Deserialize)]
        struct Completion {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }

        #[derive(Deserialize)]
        struct Message {
            content: String,
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&serde_json::json!({
                "model": MODEL,
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": 300,
            }))
            .send()
            .await
            .map_err(|e| Error::OpenAi(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::OpenAi(format!("returned {}", response.status())));
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| Error::OpenAi(format!("failed to parse response: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| Error::OpenAi("no completion returned".to_string()))
    }
}
