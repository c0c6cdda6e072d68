//! Hosted OCR through the Mistral chat-completions API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::decode::DecodedImage;
use crate::extractor::TextExtractor;
use crate::OcrError;

pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";
pub const DEFAULT_MODEL: &str = "mistral-large-latest";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Key value shipped in example env files; treated as "no key".
pub const PLACEHOLDER_KEY: &str = "your_mistral_api_key_here";

/// Reply the model is told to give for non-property documents.
pub const INVALID_SENTINEL: &str = "DOCUMENT_INVALID";
/// Portuguese spelling some prompts and models use for the same reply.
const INVALID_SENTINEL_PT: &str = "DOCUMENTO_INVALIDO";

const MAX_TOKENS: u32 = 1000;

const SYSTEM_PROMPT: &str = "Extraia o texto da imagem. Se não for documento de \
    propriedade/terra, responda apenas: DOCUMENT_INVALID";

pub struct MistralExtractor {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

impl MistralExtractor {
    /// Returns `None` when no usable key is configured.
    pub fn from_key(api_key: Option<String>) -> Option<Self> {
        let key = api_key?.trim().to_string();
        if key.is_empty() || key == PLACEHOLDER_KEY {
            return None;
        }
        info!("hosted OCR enabled");
        Some(Self {
            client: reqwest::Client::new(),
            api_key: key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// `base_url` should be like `https://api.mistral.ai` (no trailing slash).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(&self, image: &DecodedImage) -> Result<Option<String>, OcrError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let data_url = format!(
            "data:{};base64,{}",
            image.mime_type(),
            STANDARD.encode(image.bytes())
        );
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Extraia o texto:" },
                        { "type": "image_url", "image_url": data_url }
                    ]
                }
            ]
        });

        debug!(url = %url, model = %self.model, bytes = image.bytes().len(), "calling hosted OCR");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = serde_json::from_slice(&resp.bytes().await?)?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(clean_reply(&content))
    }
}

#[async_trait]
impl TextExtractor for MistralExtractor {
    fn method(&self) -> &'static str {
        "mistral"
    }

    async fn extract(&self, image: &DecodedImage) -> Result<Option<String>, OcrError> {
        tokio::time::timeout(self.timeout, self.request(image))
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))?
    }
}

/// Trimmed reply text; the invalid-document sentinel and empty replies
/// count as no text.
pub fn clean_reply(content: &str) -> Option<String> {
    let text = content.trim();
    if text.is_empty() || text.starts_with(INVALID_SENTINEL) || text.starts_with(INVALID_SENTINEL_PT)
    {
        return None;
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::Router;
    use axum::routing::post;

    use super::*;
    use crate::decode::fixtures::png_bytes;

    #[test]
    fn placeholder_and_blank_keys_disable_hosted_ocr() {
        assert!(MistralExtractor::from_key(None).is_none());
        assert!(MistralExtractor::from_key(Some("  ".into())).is_none());
        assert!(MistralExtractor::from_key(Some(PLACEHOLDER_KEY.into())).is_none());
        assert!(MistralExtractor::from_key(Some("sk-real".into())).is_some());
    }

    #[test]
    fn base_url_trims_trailing_slash() {
        let ex = MistralExtractor::from_key(Some("k".into()))
            .unwrap()
            .with_base_url("http://localhost:9000/");
        assert_eq!(ex.base_url, "http://localhost:9000");
    }

    #[test]
    fn sentinel_and_empty_replies_are_no_text() {
        assert_eq!(clean_reply("DOCUMENT_INVALID"), None);
        assert_eq!(clean_reply("  DOCUMENTO_INVALIDO: recibo"), None);
        assert_eq!(clean_reply(" \n "), None);
        assert_eq!(
            clean_reply("  ESCRITURA PÚBLICA\n"),
            Some("ESCRITURA PÚBLICA".to_string())
        );
    }

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn reply(content: &'static str) -> Router {
        Router::new().route(
            "/v1/chat/completions",
            post(move || async move {
                axum::Json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": content } }]
                }))
            }),
        )
    }

    fn extractor(addr: SocketAddr) -> MistralExtractor {
        MistralExtractor::from_key(Some("test-key".into()))
            .unwrap()
            .with_base_url(&format!("http://{addr}"))
    }

    #[tokio::test]
    async fn returns_reply_text() {
        let addr = serve(reply("Matrícula nº 123 Cartório")).await;
        let image = DecodedImage::decode(&png_bytes()).unwrap();
        let text = extractor(addr).extract(&image).await.unwrap();
        assert_eq!(text.as_deref(), Some("Matrícula nº 123 Cartório"));
    }

    #[tokio::test]
    async fn sentinel_reply_is_none() {
        let addr = serve(reply("DOCUMENT_INVALID")).await;
        let image = DecodedImage::decode(&png_bytes()).unwrap();
        assert_eq!(extractor(addr).extract(&image).await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let addr = serve(router).await;
        let image = DecodedImage::decode(&png_bytes()).unwrap();
        let err = extractor(addr).extract(&image).await.unwrap_err();
        assert!(matches!(err, OcrError::Server { status: 401, .. }));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = serve(router).await;
        let image = DecodedImage::decode(&png_bytes()).unwrap();
        let err = extractor(addr)
            .with_timeout(Duration::from_millis(100))
            .extract(&image)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
    }
}
