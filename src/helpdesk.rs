use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{RaghuError, Result};
use crate::llm::AdviceProvider;
use crate::requests::{FarmingRequest, NewRequest, Rating, RequestStore};

/// Drives a farming request through its lifecycle: submit, answer, rate.
///
/// This is the only reader and writer of the request store.  Provider
/// failures never escape [`Helpdesk::generate_answer`]; the farmer gets an
/// apology as the answer instead.
pub struct Helpdesk {
    store: RequestStore,
    provider: Arc<dyn AdviceProvider>,
    cache_answers: bool,
}

impl Helpdesk {
    pub fn new(store: RequestStore, provider: Arc<dyn AdviceProvider>, cache_answers: bool) -> Self {
        info!(
            provider = provider.name(),
            cache_answers, "helpdesk initialized"
        );
        Self {
            store,
            provider,
            cache_answers,
        }
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    /// Validate and persist a new request, returning its id.
    pub async fn submit_request(&self, fields: &NewRequest) -> Result<String> {
        fields.validate()?;
        let record = self.store.insert(fields).await?;
        info!(
            id = %record.id,
            crop = %record.crop,
            language = record.language.as_str(),
            "farming request submitted"
        );
        Ok(record.id)
    }

    pub async fn get_request(&self, id: &str) -> Result<FarmingRequest> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| RaghuError::NotFound(format!("request {id}")))
    }

    /// Produce advice for a stored request.
    ///
    /// With caching on, a previously stored answer is served unless
    /// `regenerate` is set.  Only real provider text is cached.
    pub async fn generate_answer(&self, id: &str, regenerate: bool) -> Result<String> {
        let record = self.get_request(id).await?;

        if !self.cache_answers {
            return Ok(self.provider.request_advice(&record).await);
        }

        if !regenerate {
            if let Some(answer) = record.answer {
                info!(id = %id, "serving cached answer");
                return Ok(answer);
            }
        }

        match self.provider.advise(&record).await {
            Ok(text) => {
                // the farmer still gets the advice if the cache write fails
                if let Err(e) = self.store.set_answer(id, &text).await {
                    warn!(id = %id, err = %e, "failed to cache answer");
                }
                info!(id = %id, answer_len = text.len(), "answer generated");
                Ok(text)
            }
            Err(e) => {
                warn!(id = %id, provider = self.provider.name(), err = %e, "provider failed");
                Ok(e.user_message())
            }
        }
    }

    /// Record (or overwrite) the farmer's rating.
    pub async fn submit_rating(&self, id: &str, rating: &str) -> Result<()> {
        let rating: Rating = rating.parse()?;
        self.store.set_rating(id, rating).await?;
        info!(id = %id, rating = %rating, "rating saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::db;
    use crate::error::{ProviderError, TRANSPORT_APOLOGY};
    use crate::requests::Language;

    /// Deterministic provider: replies with a fixed text, counting calls.
    struct FixedProvider {
        reply: std::result::Result<String, fn() -> ProviderError>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(make: fn() -> ProviderError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(make),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl AdviceProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn advise(
            &self,
            _request: &FarmingRequest,
        ) -> std::result::Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn helpdesk(provider: Arc<FixedProvider>, cache_answers: bool) -> Helpdesk {
        Helpdesk::new(RequestStore::new(db::test_db()), provider, cache_answers)
    }

    fn ravi() -> NewRequest {
        NewRequest {
            name: "Ravi".into(),
            crop: "wheat".into(),
            issue_type: "yellow leaves".into(),
            language: "hindi".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn submit_preserves_fields() {
        let desk = helpdesk(FixedProvider::ok("x"), true);
        let fields = NewRequest {
            phone: "98765 43210".into(),
            location: "Karnal".into(),
            soil_type: "alluvial".into(),
            description: "spots on leaves".into(),
            ..ravi()
        };
        let id = desk.submit_request(&fields).await.unwrap();
        let r = desk.get_request(&id).await.unwrap();
        assert_eq!(r.id, id);
        assert_eq!(r.name, "Ravi");
        assert_eq!(r.phone, "98765 43210");
        assert_eq!(r.location, "Karnal");
        assert_eq!(r.soil_type, "alluvial");
        assert_eq!(r.crop, "wheat");
        assert_eq!(r.issue_type, "yellow leaves");
        assert_eq!(r.description, "spots on leaves");
        assert_eq!(r.language, Language::Hindi);
    }

    #[tokio::test]
    async fn submit_rejects_invalid_fields() {
        let desk = helpdesk(FixedProvider::ok("x"), true);
        let fields = NewRequest {
            name: String::new(),
            ..ravi()
        };
        let err = desk.submit_request(&fields).await.unwrap_err();
        assert!(matches!(err, RaghuError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_and_skips_provider() {
        let provider = FixedProvider::ok("x");
        let desk = helpdesk(provider.clone(), true);
        let err = desk.generate_answer("does-not-exist", false).await.unwrap_err();
        assert!(matches!(err, RaghuError::NotFound(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_becomes_answer_text() {
        let provider = FixedProvider::failing(|| ProviderError::Transport("refused".into()));
        let desk = helpdesk(provider.clone(), true);
        let id = desk.submit_request(&ravi()).await.unwrap();

        let answer = desk.generate_answer(&id, false).await.unwrap();
        assert_eq!(answer, TRANSPORT_APOLOGY);

        // apologies are not cached; the next load asks again
        desk.generate_answer(&id, false).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert!(desk.get_request(&id).await.unwrap().answer.is_none());
    }

    #[tokio::test]
    async fn generate_is_idempotent_without_cache() {
        let provider = FixedProvider::ok("use less urea");
        let desk = helpdesk(provider.clone(), false);
        let id = desk.submit_request(&ravi()).await.unwrap();

        let first = desk.generate_answer(&id, false).await.unwrap();
        let second = desk.generate_answer(&id, false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.calls(), 2);
        assert!(desk.get_request(&id).await.unwrap().answer.is_none());
    }

    #[tokio::test]
    async fn cached_answer_served_until_regenerate() {
        let provider = FixedProvider::ok("use less urea");
        let desk = helpdesk(provider.clone(), true);
        let id = desk.submit_request(&ravi()).await.unwrap();

        let first = desk.generate_answer(&id, false).await.unwrap();
        let second = desk.generate_answer(&id, false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);

        desk.generate_answer(&id, true).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn answer_survives_cache_write_failure() {
        let conn = db::test_db();
        conn.lock()
            .await
            .execute_batch(
                "CREATE TRIGGER reject_answer BEFORE UPDATE OF answer ON farming_requests
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let provider = FixedProvider::ok("use less urea");
        let desk = Helpdesk::new(RequestStore::new(conn), provider.clone(), true);
        let id = desk.submit_request(&ravi()).await.unwrap();

        let answer = desk.generate_answer(&id, false).await.unwrap();
        assert_eq!(answer, "use less urea");
        assert_eq!(provider.calls(), 1);
        assert!(desk.get_request(&id).await.unwrap().answer.is_none());
    }

    #[tokio::test]
    async fn rating_overwrites() {
        let desk = helpdesk(FixedProvider::ok("x"), true);
        let id = desk.submit_request(&ravi()).await.unwrap();

        desk.submit_rating(&id, "excellent").await.unwrap();
        assert_eq!(desk.get_request(&id).await.unwrap().rating, Some(Rating::Excellent));

        desk.submit_rating(&id, "poor").await.unwrap();
        assert_eq!(desk.get_request(&id).await.unwrap().rating, Some(Rating::Poor));
    }

    #[tokio::test]
    async fn rating_validation_and_missing_id() {
        let desk = helpdesk(FixedProvider::ok("x"), true);
        let id = desk.submit_request(&ravi()).await.unwrap();

        let err = desk.submit_rating(&id, "amazing").await.unwrap_err();
        assert!(matches!(err, RaghuError::Validation(_)));
        assert!(desk.get_request(&id).await.unwrap().rating.is_none());

        let err = desk.submit_rating("missing", "good").await.unwrap_err();
        assert!(matches!(err, RaghuError::NotFound(_)));
    }

    #[tokio::test]
    async fn end_to_end_hindi_request() {
        let provider = FixedProvider::ok("सलाह: पानी कम करें");
        let desk = helpdesk(provider.clone(), true);

        let id = desk.submit_request(&ravi()).await.unwrap();
        let answer = desk.generate_answer(&id, false).await.unwrap();
        assert_eq!(answer, "सलाह: पानी कम करें");

        desk.submit_rating(&id, "good").await.unwrap();
        let r = desk.get_request(&id).await.unwrap();
        assert_eq!(r.rating, Some(Rating::Good));
        assert_eq!(r.language, Language::Hindi);
        assert_eq!(provider.calls(), 1);
    }
}
