//! OpenAI-compatible generation client
//!
//! Talks to `/chat/completions`, `/images/generations` and `/audio/speech`
//! on the configured base URL, so a local mock or any compatible provider
//! can stand in for OpenAI.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ContentGenerator, GeneratedContent, GeneratedFileType};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};

const SYSTEM_PROMPT: &str =
    "You are an autocompletion tool that produces text files given constraints.";

const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageGeneration {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

/// Generator backed by an OpenAI-compatible HTTP API
pub struct OpenAiGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl OpenAiGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build generation HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn chat_request(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.text_model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.config.max_tokens,
            "n": 1,
        })
    }

    fn image_request(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.image_model,
            "prompt": prompt,
            "size": IMAGE_SIZE,
            "quality": IMAGE_QUALITY,
            "n": 1,
        })
    }

    fn speech_request(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.speech_model,
            "voice": self.config.voice,
            "input": prompt,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response> {
        let url = self.endpoint(path);
        tracing::debug!("Calling generation provider at {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "{} returned HTTP {}: {}",
                path, status, detail
            )));
        }
        Ok(response)
    }

    async fn generate_text(&self, prompt: &str) -> Result<Bytes> {
        let completion: ChatCompletion = self
            .post("chat/completions", &self.chat_request(prompt))
            .await?
            .json()
            .await
            .map_err(|e| Error::Generation(format!("malformed chat completion: {}", e)))?;

        Ok(Bytes::from(first_completion_text(completion)))
    }

    async fn generate_image(&self, prompt: &str) -> Result<Bytes> {
        let generation: ImageGeneration = self
            .post("images/generations", &self.image_request(prompt))
            .await?
            .json()
            .await
            .map_err(|e| Error::Generation(format!("malformed image response: {}", e)))?;
        let url = first_image_url(generation)?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("failed to download generated image: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::Generation(format!(
                "image download returned HTTP {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::Generation(format!("failed to read generated image: {}", e)))
    }

    async fn generate_speech(&self, prompt: &str) -> Result<Bytes> {
        self.post("audio/speech", &self.speech_request(prompt))
            .await?
            .bytes()
            .await
            .map_err(|e| Error::Generation(format!("failed to read generated audio: {}", e)))
    }
}

fn first_completion_text(completion: ChatCompletion) -> String {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default()
}

fn first_image_url(generation: ImageGeneration) -> Result<String> {
    generation
        .data
        .into_iter()
        .next()
        .and_then(|d| d.url)
        .ok_or_else(|| Error::Generation("image response did not contain a URL".into()))
}

/// Content type the generated bytes are stored with
pub fn content_type_for(file_type: GeneratedFileType) -> &'static str {
    match file_type {
        GeneratedFileType::Text => "text/plain",
        GeneratedFileType::Image => "image/png",
        GeneratedFileType::Audio => "audio/mpeg",
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, file_type: GeneratedFileType) -> Result<GeneratedContent> {
        let data = match file_type {
            GeneratedFileType::Text => self.generate_text(prompt).await?,
            GeneratedFileType::Image => self.generate_image(prompt).await?,
            GeneratedFileType::Audio => self.generate_speech(prompt).await?,
        };

        tracing::info!("Generated {} content ({} bytes)", file_type, data.len());

        Ok(GeneratedContent {
            data,
            content_type: content_type_for(file_type).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> OpenAiGenerator {
        OpenAiGenerator::new(GenerationConfig {
            base_url: "http://localhost:1080/v1/".into(),
            api_key: "mocked_key".into(),
            ..GenerationConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        assert_eq!(
            generator().endpoint("chat/completions"),
            "http://localhost:1080/v1/chat/completions"
        );
    }

    #[test]
    fn test_chat_request_shape() {
        let body = generator().chat_request("a toml file for a python package");
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["content"], "a toml file for a python package");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["n"], 1);
    }

    #[test]
    fn test_image_and_speech_request_shape() {
        let g = generator();
        let image = g.image_request("a wolf");
        assert_eq!(image["model"], "dall-e-3");
        assert_eq!(image["size"], IMAGE_SIZE);

        let speech = g.speech_request("hello");
        assert_eq!(speech["model"], "tts-1");
        assert_eq!(speech["voice"], "echo");
        assert_eq!(speech["input"], "hello");
    }

    #[test]
    fn test_response_extraction() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "[project]"}}]
        }))
        .unwrap();
        assert_eq!(first_completion_text(completion), "[project]");

        let empty: ChatCompletion = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(first_completion_text(empty), "");

        let image: ImageGeneration =
            serde_json::from_value(json!({"data": [{"url": "http://img/1.png"}]})).unwrap();
        assert_eq!(first_image_url(image).unwrap(), "http://img/1.png");

        let no_url: ImageGeneration = serde_json::from_value(json!({"data": [{}]})).unwrap();
        assert!(first_image_url(no_url).is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(GeneratedFileType::Text), "text/plain");
        assert_eq!(content_type_for(GeneratedFileType::Image), "image/png");
        assert_eq!(content_type_for(GeneratedFileType::Audio), "audio/mpeg");
    }
}
