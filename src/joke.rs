use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const JOKE_API_URL: &str = "http://api.icndb.com/jokes/random";

/// Anything that can produce a one-line joke.
#[async_trait]
pub trait JokeSource: Send + Sync {
    async fn random_joke(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct JokeResponse {
    value: JokeValue,
}

#[derive(Debug, Deserialize)]
struct JokeValue {
    joke: String,
}

/// Client for the public ICNDb joke API. One GET per joke, no retry.
pub struct JokeClient {
    client: reqwest::Client,
    url: String,
}

impl JokeClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: JOKE_API_URL.to_string(),
        }
    }
}

impl Default for JokeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JokeSource for JokeClient {
    async fn random_joke(&self) -> Result<String> {
        debug!("Fetching a joke from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to reach the joke API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Joke API error ({}): {}", status, error_body);
        }

        let body: JokeResponse = response
            .json()
            .await
            .context("Failed to parse the joke API response")?;

        Ok(body.value.joke)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_joke_field_from_the_api_body() {
        let body = r#"{
            "type": "success",
            "value": {
                "id": 268,
                "joke": "Time waits for no man. Unless that man is Chuck Norris.",
                "categories": []
            }
        }"#;

        let parsed: JokeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.value.joke,
            "Time waits for no man. Unless that man is Chuck Norris."
        );
    }

    #[test]
    fn rejects_a_body_without_a_joke() {
        let body = r#"{ "type": "success", "value": { "id": 268 } }"#;
        assert!(serde_json::from_str::<JokeResponse>(body).is_err());
    }
}
