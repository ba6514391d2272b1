//! Resume Generation Pipeline: keyword extraction, prompt assembly, and the
//! streaming relay from the generation backend to a caller.
//!
//! Flow: extract top keywords → build prompt → open backend stream →
//!       forward each event in order until the final one.
//!
//! Fail-fast: the first error of any kind ends the relay and drops the backend
//! connection. Events already delivered are not retracted; a caller that sees
//! an error must treat the whole output as unusable. No retries here.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::{ready, Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::generation::prompt_builder::build_prompt;
use crate::keywords::extractor::KeywordExtractor;
use crate::llm_client::{EventStream, GenerationBackend, GenerationEvent, LlmError};
use crate::models::profile::ProfileSnapshot;
use crate::profiles::ProfileLookup;

/// Top-ranked terms placed in a prompt unless configured otherwise.
pub const DEFAULT_PROMPT_KEYWORDS: usize = 10;

/// Failure reported by a caller-supplied sink.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Profile {0} not found")]
    ProfileNotFound(Uuid),

    #[error("Profile lookup failed: {0}")]
    CollaboratorUnavailable(String),

    #[error("Generation backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Generation backend sent a malformed event: {0}")]
    BackendProtocol(String),

    #[error("Event sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Generation cancelled")]
    Cancelled,
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(e) => GenerationError::BackendProtocol(e.to_string()),
            other => GenerationError::BackendUnavailable(other.to_string()),
        }
    }
}

/// Receives relay events one at a time, in order, on the pipeline's own task.
/// Returning an error aborts the relay.
#[async_trait]
pub trait EventSink: Send {
    async fn deliver(&mut self, event: GenerationEvent) -> Result<(), SinkError>;
}

#[async_trait]
impl<F> EventSink for F
where
    F: FnMut(GenerationEvent) -> Result<(), SinkError> + Send,
{
    async fn deliver(&mut self, event: GenerationEvent) -> Result<(), SinkError> {
        (*self)(event)
    }
}

/// Lazy, finite, non-restartable sequence of generation events.
///
/// Ends right after the final event. A backend stream that ends without one
/// yields `BackendUnavailable`. Nothing is yielded after the first error, and
/// the backend connection is released as soon as the relay finishes.
pub struct Relay {
    events: Option<EventStream>,
}

impl Relay {
    pub fn new(events: EventStream) -> Self {
        Self {
            events: Some(events),
        }
    }
}

impl Stream for Relay {
    type Item = Result<GenerationEvent, GenerationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(events) = self.events.as_mut() else {
            return Poll::Ready(None);
        };

        let item = match ready!(events.poll_next_unpin(cx)) {
            Some(Ok(event)) => {
                if event.is_final {
                    self.events = None;
                }
                Ok(event)
            }
            Some(Err(e)) => {
                self.events = None;
                Err(e.into())
            }
            None => {
                self.events = None;
                Err(GenerationError::BackendUnavailable(
                    "backend stream ended before the final event".to_string(),
                ))
            }
        };
        Poll::Ready(Some(item))
    }
}

#[derive(Clone)]
pub struct ResumePipeline {
    backend: Arc<dyn GenerationBackend>,
    extractor: KeywordExtractor,
    prompt_keywords: usize,
}

impl ResumePipeline {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        extractor: KeywordExtractor,
        prompt_keywords: usize,
    ) -> Self {
        Self {
            backend,
            extractor,
            prompt_keywords,
        }
    }

    pub fn backend(&self) -> &dyn GenerationBackend {
        self.backend.as_ref()
    }

    /// Validates input and builds the prompt a relay or completion would send.
    pub fn prepare_prompt(
        &self,
        profile: Option<&ProfileSnapshot>,
        job_text: &str,
    ) -> Result<String, GenerationError> {
        if job_text.trim().is_empty() {
            return Err(GenerationError::Validation(
                "job description cannot be empty".to_string(),
            ));
        }

        let keywords = self.extractor.top_terms(job_text, self.prompt_keywords);
        let prompt = build_prompt(profile, job_text, &keywords);

        info!(
            keywords = keywords.len(),
            with_profile = profile.is_some(),
            prompt_chars = prompt.len(),
            "Built generation prompt"
        );
        Ok(prompt)
    }

    /// Opens the backend stream and returns it as a `Relay` for the caller to drain.
    pub async fn open_relay(
        &self,
        profile: Option<&ProfileSnapshot>,
        job_text: &str,
    ) -> Result<Relay, GenerationError> {
        let prompt = self.prepare_prompt(profile, job_text)?;
        let events = self.backend.generate_stream(&prompt).await?;
        Ok(Relay::new(events))
    }

    /// Relays every backend event to `sink` until the final one.
    pub async fn generate<S>(
        &self,
        profile: Option<&ProfileSnapshot>,
        job_text: &str,
        sink: &mut S,
    ) -> Result<(), GenerationError>
    where
        S: EventSink + ?Sized,
    {
        self.generate_until(profile, job_text, sink, std::future::pending())
            .await
    }

    /// Like `generate`, but stops with `Cancelled` as soon as `cancel` resolves.
    /// Cancellation drops the backend connection; no event is delivered after it.
    pub async fn generate_until<S, C>(
        &self,
        profile: Option<&ProfileSnapshot>,
        job_text: &str,
        sink: &mut S,
        cancel: C,
    ) -> Result<(), GenerationError>
    where
        S: EventSink + ?Sized,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        let mut relay = tokio::select! {
            biased;
            _ = &mut cancel => return Err(GenerationError::Cancelled),
            relay = self.open_relay(profile, job_text) => relay?,
        };

        let mut delivered = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut cancel => {
                    warn!(delivered, "Generation cancelled mid-stream");
                    return Err(GenerationError::Cancelled);
                }
                next = relay.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    warn!(delivered, "Generation relay aborted: {e}");
                    return Err(e);
                }
                None => {
                    return Err(GenerationError::BackendUnavailable(
                        "relay ended without a final event".to_string(),
                    ))
                }
            };

            let is_final = event.is_final;
            debug!(
                delivered,
                is_final,
                fragment_chars = event.fragment.len(),
                "Delivering generation event"
            );

            if let Err(e) = sink.deliver(event).await {
                warn!(delivered, "Event sink failed, aborting relay: {e}");
                return Err(GenerationError::Sink(e));
            }
            delivered += 1;

            if is_final {
                info!(delivered, "Generation relay completed");
                return Ok(());
            }
        }
    }

    /// Non-streaming variant: same prompt, one backend call, full text back.
    pub async fn complete(
        &self,
        profile: Option<&ProfileSnapshot>,
        job_text: &str,
    ) -> Result<String, GenerationError> {
        let prompt = self.prepare_prompt(profile, job_text)?;
        let content = self.backend.generate(&prompt).await?;
        info!(content_chars = content.len(), "Generation completed");
        Ok(content)
    }
}

/// Resolves an optional user id to a profile snapshot through the lookup collaborator.
pub async fn load_profile(
    lookup: &dyn ProfileLookup,
    user_id: Option<Uuid>,
) -> Result<Option<ProfileSnapshot>, GenerationError> {
    let Some(user_id) = user_id else {
        return Ok(None);
    };

    match lookup.get_profile_with_details(user_id).await {
        Ok(Some(profile)) => Ok(Some(profile)),
        Ok(None) => Err(GenerationError::ProfileNotFound(user_id)),
        Err(e) => {
            warn!("Profile lookup for {user_id} failed: {e:#}");
            Err(GenerationError::CollaboratorUnavailable(e.to_string()))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::llm_client::testing::{fragment, last, ScriptedBackend};
    use crate::models::profile::fixtures::sample_snapshot;
    use crate::profiles::testing::InMemoryProfiles;

    const JOB: &str =
        "Senior Software Engineer needed. Experience with RESTful APIs and Docker required.";

    fn pipeline(backend: &Arc<ScriptedBackend>) -> ResumePipeline {
        ResumePipeline::new(
            backend.clone(),
            KeywordExtractor::default(),
            DEFAULT_PROMPT_KEYWORDS,
        )
    }

    /// Records events; fails on the given (1-based) delivery.
    #[derive(Default)]
    struct RecordingSink {
        events: Vec<GenerationEvent>,
        calls: usize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn deliver(&mut self, event: GenerationEvent) -> Result<(), SinkError> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                return Err(SinkError("client went away".to_string()));
            }
            self.events.push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_relays_fragments_then_final_in_order() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            fragment("# Jane"),
            fragment(" Doe"),
            fragment("\n## Summary"),
            last(""),
        ]));
        let mut sink = RecordingSink::default();

        pipeline(&backend)
            .generate(None, JOB, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.calls, 4);
        let fragments: Vec<&str> = sink.events.iter().map(|e| e.fragment.as_str()).collect();
        assert_eq!(fragments, vec!["# Jane", " Doe", "\n## Summary", ""]);
        assert!(sink.events[..3].iter().all(|e| !e.is_final));
        assert!(sink.events[3].is_final);
    }

    #[tokio::test]
    async fn test_sink_error_stops_reading_backend() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            fragment("a"),
            fragment("b"),
            fragment("c"),
            last(""),
        ]));
        let mut sink = RecordingSink {
            fail_on: Some(2),
            ..Default::default()
        };

        let err = pipeline(&backend)
            .generate(None, JOB, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Sink(_)));
        assert_eq!(sink.calls, 2);
        assert_eq!(backend.events_read.load(Ordering::SeqCst), 2);
        assert!(backend.stream_dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stream_without_final_is_backend_unavailable() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            fragment("a"),
            fragment("b"),
        ]));
        let mut sink = RecordingSink::default();

        let err = pipeline(&backend)
            .generate(None, JOB, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::BackendUnavailable(_)));
        assert_eq!(sink.events.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_event_is_protocol_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            fragment("a"),
            Err(LlmError::Parse(parse_err)),
            last(""),
        ]));
        let mut sink = RecordingSink::default();

        let err = pipeline(&backend)
            .generate(None, JOB, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::BackendProtocol(_)));
        assert_eq!(sink.calls, 1);
    }

    #[tokio::test]
    async fn test_backend_refusal_delivers_nothing() {
        let backend = Arc::new(ScriptedBackend::refusing(503, "model is loading"));
        let mut sink = RecordingSink::default();

        let err = pipeline(&backend)
            .generate(None, JOB, &mut sink)
            .await
            .unwrap_err();

        match err {
            GenerationError::BackendUnavailable(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink.calls, 0);
    }

    #[tokio::test]
    async fn test_nothing_delivered_after_final() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            fragment("a"),
            last("b"),
            fragment("late"),
        ]));
        let mut sink = RecordingSink::default();

        pipeline(&backend)
            .generate(None, JOB, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.calls, 2);
        assert_eq!(sink.events[1].fragment, "b");
        assert_eq!(backend.events_read.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_closes_stalled_stream() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![fragment("a")]).stalling());
        let mut sink = RecordingSink::default();

        let err = pipeline(&backend)
            .generate_until(
                None,
                JOB,
                &mut sink,
                tokio::time::sleep(Duration::from_secs(30)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Cancelled));
        assert_eq!(sink.calls, 1);
        assert!(backend.stream_dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_job_text_is_rejected_before_backend() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![last("")]));
        let mut sink = RecordingSink::default();

        let err = pipeline(&backend)
            .generate(None, "   \n", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Validation(_)));
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_top_keywords_and_profile() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![last("")]));
        let profile = sample_snapshot();
        let mut sink = RecordingSink::default();

        pipeline(&backend)
            .generate(Some(&profile), JOB, &mut sink)
            .await
            .unwrap();

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- software engineer\n- restful apis"));
        assert!(prompts[0].contains("Name: Jane Q. Doe"));
        assert!(prompts[0].contains(JOB));
    }

    #[test]
    fn test_prompt_keyword_count_is_respected() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![last("")]));
        let pipeline = ResumePipeline::new(backend.clone(), KeywordExtractor::default(), 1);

        let prompt = pipeline.prepare_prompt(None, JOB).unwrap();
        assert!(prompt.contains("- software engineer"));
        assert!(!prompt.contains("- restful apis"));
    }

    #[tokio::test]
    async fn test_closure_sink() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![fragment("x"), last("y")]));
        let mut text = String::new();
        let mut sink = |event: GenerationEvent| -> Result<(), SinkError> {
            text.push_str(&event.fragment);
            Ok(())
        };

        pipeline(&backend)
            .generate(None, JOB, &mut sink)
            .await
            .unwrap();
        assert_eq!(text, "xy");
    }

    #[tokio::test]
    async fn test_relay_is_a_finite_stream() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            fragment("a"),
            last(""),
            fragment("ignored"),
        ]));

        let mut relay = pipeline(&backend).open_relay(None, JOB).await.unwrap();
        assert_eq!(relay.next().await.unwrap().unwrap().fragment, "a");
        assert!(relay.next().await.unwrap().unwrap().is_final);
        assert!(relay.next().await.is_none());
        assert!(relay.next().await.is_none());
        assert!(backend.stream_dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_relay_yields_nothing_after_error() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            Err(LlmError::Truncated),
            last(""),
        ]));

        let items: Vec<_> = pipeline(&backend)
            .open_relay(None, JOB)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GenerationError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_complete_returns_full_text() {
        let backend = Arc::new(ScriptedBackend::completing("# Jane Doe\n## Summary"));
        let profile = sample_snapshot();

        let content = pipeline(&backend)
            .complete(Some(&profile), JOB)
            .await
            .unwrap();

        assert_eq!(content, "# Jane Doe\n## Summary");
        assert!(backend.prompts()[0].contains("Acme Cloud"));
    }

    #[tokio::test]
    async fn test_load_profile_outcomes() {
        let profile = sample_snapshot();
        let id = profile.user.id;
        let lookup = InMemoryProfiles::with(vec![profile]);

        assert!(load_profile(&lookup, None).await.unwrap().is_none());
        assert_eq!(
            load_profile(&lookup, Some(id)).await.unwrap().unwrap().user.id,
            id
        );

        let missing = Uuid::new_v4();
        assert!(matches!(
            load_profile(&lookup, Some(missing)).await,
            Err(GenerationError::ProfileNotFound(m)) if m == missing
        ));

        let broken = InMemoryProfiles::failing();
        assert!(matches!(
            load_profile(&broken, Some(id)).await,
            Err(GenerationError::CollaboratorUnavailable(_))
        ));
    }
}
