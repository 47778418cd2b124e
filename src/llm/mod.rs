pub mod prompts;

mod gemini;

use tracing::warn;

use crate::error::ProviderError;
use crate::requests::FarmingRequest;

pub use gemini::GeminiClient;

/// Seam between the helpdesk and the generative-text provider.
///
/// `advise` reports failures as a [`ProviderError`] so callers can log and
/// decide about caching; turning them into farmer-facing text is done with
/// [`ProviderError::user_message`].
#[async_trait::async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Human-readable name of this provider (e.g. "Gemini API").
    fn name(&self) -> &str;

    /// Ask for advice on one stored request.
    async fn advise(&self, request: &FarmingRequest) -> Result<String, ProviderError>;

    /// Ask for advice and return the reply text, or an apology when anything
    /// goes wrong.  Never fails.
    async fn request_advice(&self, request: &FarmingRequest) -> String {
        match self.advise(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(id = %request.id, provider = self.name(), err = %e, "advice request failed");
                e.user_message()
            }
        }
    }
}

#[async_trait::async_trait]
impl AdviceProvider for GeminiClient {
    fn name(&self) -> &str {
        "Gemini API"
    }

    async fn advise(&self, request: &FarmingRequest) -> Result<String, ProviderError> {
        self.generate(request).await
    }
}
