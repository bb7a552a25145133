/// Ollama-backed chat model.
///
/// Calls `POST /api/chat` with `stream: false` and temperature 0 so identical
/// prompts produce stable answers. Transient failures are retried with
/// exponential backoff.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{ChatError, ChatModel, ChatTurn, Role};
use crate::config::OllamaConfig;

pub struct OllamaChat {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaChat {
    pub fn new(config: &OllamaConfig) -> Result<Self, ChatError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Unreachable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
            max_retries: config.max_retries,
        })
    }
}

impl ChatModel for OllamaChat {
    fn complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(WireMessage {
            role: Role::System.as_str(),
            content: system,
        });
        for turn in turns {
            messages.push(WireMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            });
        }

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": { "temperature": 0.0 },
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!("Retrying chat request after {delay:?}");
                std::thread::sleep(delay);
            }

            match self.client.post(&url).json(&body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: ChatResponse = resp
                            .json()
                            .map_err(|e| ChatError::BadResponse(format!("invalid JSON: {e}")))?;
                        return Ok(parsed.message.content.trim().to_string());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err =
                            Some(ChatError::Unreachable(format!("chat API returned {status}")));
                        continue;
                    }

                    let detail = resp.text().unwrap_or_default();
                    return Err(ChatError::BadResponse(format!(
                        "chat API returned {status}: {detail}"
                    )));
                }
                Err(e) => {
                    last_err = Some(ChatError::Unreachable(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ChatError::Unreachable("chat failed after retries".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_backend_is_an_error() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            max_retries: 0,
            ..OllamaConfig::default()
        };
        let chat = OllamaChat::new(&config).unwrap();
        let err = chat
            .complete("system", &[ChatTurn::user("hello")])
            .unwrap_err();
        assert!(matches!(err, ChatError::Unreachable(_)));
    }
}
