pub mod gemini;
pub mod openai_compat;

use std::rc::Rc;
use gloo_net::http::Response;

use archive_core::ports::ModelPort;
use archive_types::{ArchiveError, config::ModelConfig};

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;

/// Pick the transport for the configured provider.
pub fn model_for(config: &ModelConfig) -> Rc<dyn ModelPort> {
    if config.provider.is_openai_compatible() {
        Rc::new(OpenAiCompatProvider::new(config.clone()))
    } else {
        Rc::new(GeminiProvider::new(config.clone()))
    }
}

pub(crate) fn transport_error(e: gloo_net::Error) -> ArchiveError {
    ArchiveError::Transport(e.to_string())
}

/// Turn a non-2xx response into an error carrying the body text.
pub(crate) async fn http_error(response: Response) -> ArchiveError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    ArchiveError::Remote(format!("HTTP {}: {}", status, text))
}
