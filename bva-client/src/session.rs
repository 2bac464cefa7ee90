//! Session orchestrator
//!
//! Top-level state machine of one recognition cycle:
//!
//! ```text
//! Idle ──begin_acquisition──► Acquiring ──abandon──► Idle
//! Idle | Acquiring | Success | Failed | Submitting ──accept_candidate──► Submitting
//! Submitting ──resolve(Ok)──► Success ──clear──► Idle
//! Submitting ──resolve(Err)─► Failed  ──clear──► Idle
//! ```
//!
//! Every accepted candidate gets a fresh [`RequestToken`]. A resolution whose
//! token is not the current one is discarded, so a slow call that was
//! superseded can never overwrite newer state. In-flight calls are never
//! aborted; only their results are ignored.
//!
//! The orchestrator owns the preview handle of the candidate being shown and
//! the audio feedback controller. State is published on a watch channel and
//! every transition is mirrored as a [`SessionEvent`].
//!
//! Locks guard plain data and are never held across an await point. When both
//! are needed, the session lock is taken before the audio lock.

use bva_common::api::PredictionResult;
use bva_common::events::{EventBus, SessionEvent, SessionPhase};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::api::Recognizer;
use crate::error::{ErrorInfo, PredictionError, SessionError};
use crate::media::{CandidateImage, PreviewRef, PreviewRegistry};
use crate::playback::{AudioFeedbackController, AudioPlaybackState, ElementEvent, MediaElement};

/// Identifies one submission; strictly increasing per orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Acquiring,
    Submitting { request: RequestToken },
    Success(PredictionResult),
    Failed(ErrorInfo),
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Acquiring => SessionPhase::Acquiring,
            SessionState::Submitting { .. } => SessionPhase::Submitting,
            SessionState::Success(_) => SessionPhase::Success,
            SessionState::Failed(_) => SessionPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Success(_) | SessionState::Failed(_))
    }
}

/// Outcome of handing a prediction resolution to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Resolution belonged to the current request and was applied
    Applied,
    /// A newer request superseded this one; the resolution was dropped
    Stale,
}

struct SessionInner {
    state: SessionState,
    /// Token of the request that owns the session (0 = none yet)
    current: u64,
    preview: Option<PreviewRef>,
}

pub struct SessionOrchestrator {
    recognizer: Arc<dyn Recognizer>,
    previews: PreviewRegistry,
    inner: Mutex<SessionInner>,
    audio: Mutex<AudioFeedbackController<Box<dyn MediaElement>>>,
    state_tx: watch::Sender<SessionState>,
    events: EventBus,
}

impl SessionOrchestrator {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        previews: PreviewRegistry,
        element: Box<dyn MediaElement>,
        autoplay: bool,
        events: EventBus,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let audio = AudioFeedbackController::new(element, autoplay).with_events(events.clone());

        Self {
            recognizer,
            previews,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                current: 0,
                preview: None,
            }),
            audio: Mutex::new(audio),
            state_tx,
            events,
        }
    }

    // ========================================
    // Acquisition
    // ========================================

    /// Enter `Acquiring` (capture surface opened or picker shown)
    ///
    /// Only valid from `Idle`; a displayed result or error stays visible until
    /// the next candidate actually arrives. Returns true if the state changed.
    pub fn begin_acquisition(&self) -> bool {
        let mut inner = self.lock_inner();
        if inner.state != SessionState::Idle {
            tracing::debug!(phase = %inner.state.phase(), "Acquisition started without state change");
            return false;
        }
        self.transition(&mut inner, SessionState::Acquiring);
        true
    }

    /// Acquisition abandoned (camera cancelled, picker dismissed, validation
    /// failure); `Acquiring` falls back to `Idle`
    pub fn abandon_acquisition(&self) -> bool {
        let mut inner = self.lock_inner();
        if inner.state != SessionState::Acquiring {
            return false;
        }
        self.transition(&mut inner, SessionState::Idle);
        true
    }

    /// Take ownership of a freshly acquired image and enter `Submitting`
    ///
    /// Valid from every state. Any previous result, error and preview are
    /// dropped first; a call still in flight loses its claim on the session.
    pub fn accept_candidate(&self, candidate: &CandidateImage) -> RequestToken {
        let mut inner = self.lock_inner();

        if let Some(previous) = inner.preview.take() {
            self.previews.revoke(previous);
        }
        inner.preview = Some(self.previews.create(candidate.data().clone()));

        if let SessionState::Submitting { request } = inner.state {
            tracing::info!(superseded = %request, "New candidate supersedes in-flight request");
        }

        inner.current += 1;
        let request = RequestToken(inner.current);
        tracing::info!(
            %request,
            source = %candidate.source(),
            file_name = candidate.file_name(),
            bytes = candidate.len(),
            "Candidate accepted"
        );
        self.transition(&mut inner, SessionState::Submitting { request });
        request
    }

    // ========================================
    // Prediction
    // ========================================

    /// Accept a candidate, submit it, and apply the outcome
    pub async fn submit(&self, candidate: CandidateImage) -> Resolution {
        let request = self.accept_candidate(&candidate);
        let outcome = self.recognizer.submit(&candidate).await;
        self.resolve(request, outcome)
    }

    /// Apply a prediction outcome for `request`
    ///
    /// Outcomes for anything but the current request are dropped. The audio
    /// source is assigned before the session lock is released, so the source
    /// always belongs to the result on display.
    pub fn resolve(
        &self,
        request: RequestToken,
        outcome: Result<PredictionResult, PredictionError>,
    ) -> Resolution {
        let mut inner = self.lock_inner();
        let is_current = request.0 == inner.current
            && matches!(inner.state, SessionState::Submitting { request: r } if r == request);

        if !is_current {
            tracing::warn!(
                %request,
                current = inner.current,
                ok = outcome.is_ok(),
                "Discarding stale prediction result"
            );
            self.events.emit_lossy(SessionEvent::StaleResultDiscarded {
                request: request.0,
                current: inner.current,
                timestamp: chrono::Utc::now(),
            });
            return Resolution::Stale;
        }

        match outcome {
            Ok(result) => {
                tracing::info!(
                    %request,
                    detections = result.detections.len(),
                    total_amount = result.total_amount,
                    "Prediction succeeded"
                );
                let audio_url = result.has_audio().then(|| result.audio_url.clone());
                self.transition(&mut inner, SessionState::Success(result));
                if let Some(url) = audio_url {
                    self.lock_audio().assign_source(&url);
                }
            }
            Err(e) => {
                let info = ErrorInfo::from(&e);
                tracing::error!(%request, kind = %info.kind, error = %e, "Prediction failed");
                self.transition(&mut inner, SessionState::Failed(info));
            }
        }

        Resolution::Applied
    }

    /// Return to `Idle` from a displayed result or error
    ///
    /// Releases the held preview. Rejected in any other state.
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut inner = self.lock_inner();
        if !inner.state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                action: "clear",
                phase: inner.state.phase(),
            });
        }

        if let Some(preview) = inner.preview.take() {
            self.previews.revoke(preview);
        }
        self.transition(&mut inner, SessionState::Idle);
        Ok(())
    }

    // ========================================
    // Observation
    // ========================================

    pub fn state(&self) -> SessionState {
        self.lock_inner().state.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_inner().state.phase()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Token of the request that currently owns the session, if any
    pub fn current_request(&self) -> Option<RequestToken> {
        let current = self.lock_inner().current;
        (current > 0).then_some(RequestToken(current))
    }

    /// Preview URI of the held candidate
    pub fn preview_uri(&self) -> Option<String> {
        self.lock_inner().preview.as_ref().map(PreviewRef::uri)
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    // ========================================
    // Audio feedback
    // ========================================

    pub fn audio_snapshot(&self) -> AudioPlaybackState {
        self.lock_audio().snapshot()
    }

    /// Play/pause toggle; no-op until the current source has loaded
    pub fn toggle_audio(&self) -> bool {
        self.lock_audio().toggle()
    }

    /// Feed a media element lifecycle event into the audio controller
    ///
    /// Events raised for a source that has since been replaced are ignored.
    pub fn handle_media_event(&self, event: ElementEvent) {
        self.lock_audio().handle_event(event);
    }

    fn transition(&self, inner: &mut SessionInner, next: SessionState) {
        let old_phase = inner.state.phase();
        let new_phase = next.phase();
        let request = (inner.current > 0).then_some(inner.current);

        inner.state = next.clone();
        self.state_tx.send_replace(next);

        tracing::debug!(%old_phase, %new_phase, ?request, "Session state changed");
        self.events.emit_lossy(SessionEvent::SessionStateChanged {
            old_phase,
            new_phase,
            request,
            timestamp: chrono::Utc::now(),
        });
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_audio(&self) -> MutexGuard<'_, AudioFeedbackController<Box<dyn MediaElement>>> {
        self.audio.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(preview) = inner.preview.take() {
            self.previews.revoke(preview);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::media::ImageSource;
    use crate::playback::HeadlessElement;
    use async_trait::async_trait;
    use bva_common::api::Detection;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{mpsc, oneshot};

    type Outcome = Result<PredictionResult, PredictionError>;

    /// Recognizer whose calls resolve when the test says so, in call order
    #[derive(Default)]
    struct GatedRecognizer {
        gates: Mutex<VecDeque<oneshot::Receiver<Outcome>>>,
        calls: AtomicUsize,
    }

    impl GatedRecognizer {
        fn gate(&self) -> oneshot::Sender<Outcome> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Recognizer for GatedRecognizer {
        async fn submit(&self, _image: &CandidateImage) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().unwrap().pop_front().expect("no gate queued");
            gate.await
                .unwrap_or_else(|_| Err(PredictionError::Connection("gate dropped".into())))
        }
    }

    fn result(text: &str, audio_url: &str) -> PredictionResult {
        PredictionResult {
            ok: true,
            text: text.to_string(),
            audio_url: audio_url.to_string(),
            audio_base64: None,
            detections: vec![Detection {
                class: "S20".into(),
                confidence: 0.97,
                bbox: [1.0, 2.0, 3.0, 4.0],
                original_pred: None,
            }],
            total_amount: 20.0,
        }
    }

    fn candidate(name: &str) -> CandidateImage {
        CandidateImage::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg", name, ImageSource::Upload)
    }

    fn session_with(
        recognizer: Arc<GatedRecognizer>,
    ) -> (Arc<SessionOrchestrator>, mpsc::UnboundedReceiver<ElementEvent>) {
        let (element, media_rx) = HeadlessElement::new();
        let session = SessionOrchestrator::new(
            recognizer,
            PreviewRegistry::new(),
            Box::new(element),
            true,
            EventBus::new(100),
        );
        (Arc::new(session), media_rx)
    }

    fn session() -> (Arc<SessionOrchestrator>, mpsc::UnboundedReceiver<ElementEvent>) {
        session_with(Arc::new(GatedRecognizer::default()))
    }

    async fn wait_for_calls(recognizer: &GatedRecognizer, n: usize) {
        while recognizer.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_acquisition_transitions() {
        let (session, _media) = session();
        assert_eq!(session.phase(), SessionPhase::Idle);

        assert!(session.begin_acquisition());
        assert_eq!(session.phase(), SessionPhase::Acquiring);
        assert!(!session.begin_acquisition());

        assert!(session.abandon_acquisition());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.abandon_acquisition());
    }

    #[test]
    fn test_candidate_enters_submitting_with_preview() {
        let (session, _media) = session();
        session.begin_acquisition();
        let request = session.accept_candidate(&candidate("a.jpg"));

        assert_eq!(session.state(), SessionState::Submitting { request });
        assert_eq!(session.current_request(), Some(request));

        let uri = session.preview_uri().unwrap();
        assert_eq!(session.previews().resolve(&uri).unwrap().as_ref(), &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_new_candidate_releases_previous_preview() {
        let (session, _media) = session();
        session.accept_candidate(&candidate("a.jpg"));
        let first = session.preview_uri().unwrap();

        session.accept_candidate(&candidate("b.jpg"));
        let second = session.preview_uri().unwrap();

        assert_ne!(first, second);
        assert!(session.previews().resolve(&first).is_none());
        assert_eq!(session.previews().live_count(), 1);
    }

    #[test]
    fn test_stale_resolution_is_discarded() {
        let (session, _media) = session();
        let mut events = session.events.subscribe();

        let a = session.accept_candidate(&candidate("a.jpg"));
        let b = session.accept_candidate(&candidate("b.jpg"));
        assert!(b > a);

        assert_eq!(session.resolve(a, Ok(result("A", ""))), Resolution::Stale);
        assert_eq!(session.state(), SessionState::Submitting { request: b });

        assert_eq!(session.resolve(b, Ok(result("B", ""))), Resolution::Applied);
        match session.state() {
            SessionState::Success(r) => assert_eq!(r.text, "B"),
            other => panic!("expected success, got {:?}", other),
        }

        // Late A after B applied is still stale
        assert_eq!(
            session.resolve(a, Err(PredictionError::Connection("late".into()))),
            Resolution::Stale
        );
        assert_eq!(session.phase(), SessionPhase::Success);

        let mut stale = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::StaleResultDiscarded { .. }) {
                stale += 1;
            }
        }
        assert_eq!(stale, 2);
    }

    #[test]
    fn test_double_resolution_is_stale() {
        let (session, _media) = session();
        let request = session.accept_candidate(&candidate("a.jpg"));
        assert_eq!(session.resolve(request, Ok(result("A", ""))), Resolution::Applied);
        assert_eq!(
            session.resolve(request, Err(PredictionError::Connection("x".into()))),
            Resolution::Stale
        );
        assert_eq!(session.phase(), SessionPhase::Success);
    }

    #[tokio::test]
    async fn test_superseded_call_never_overwrites_newer_state() {
        let recognizer = Arc::new(GatedRecognizer::default());
        let gate_a = recognizer.gate();
        let gate_b = recognizer.gate();
        let (session, _media) = session_with(Arc::clone(&recognizer));

        let call_a = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.submit(candidate("a.jpg")).await }
        });
        wait_for_calls(&recognizer, 1).await;

        let call_b = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.submit(candidate("b.jpg")).await }
        });
        wait_for_calls(&recognizer, 2).await;

        gate_b.send(Ok(result("B", ""))).unwrap();
        assert_eq!(call_b.await.unwrap(), Resolution::Applied);

        gate_a.send(Ok(result("A", ""))).unwrap();
        assert_eq!(call_a.await.unwrap(), Resolution::Stale);

        match session.state() {
            SessionState::Success(r) => assert_eq!(r.text, "B"),
            other => panic!("expected success for B, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failures_map_to_failed_with_kind() {
        let cases = vec![
            (PredictionError::Auth("invalid token".into()), ErrorKind::Auth, "invalid token"),
            (
                PredictionError::Server {
                    status: Some(500),
                    message: "Model not loaded".into(),
                },
                ErrorKind::Server,
                "Model not loaded",
            ),
            (
                PredictionError::Connection("Could not connect to the server".into()),
                ErrorKind::Connection,
                "Could not connect to the server",
            ),
        ];

        for (error, kind, message) in cases {
            let recognizer = Arc::new(GatedRecognizer::default());
            let gate = recognizer.gate();
            let (session, _media) = session_with(recognizer);

            gate.send(Err(error)).unwrap();
            assert_eq!(session.submit(candidate("a.jpg")).await, Resolution::Applied);

            assert_eq!(
                session.state(),
                SessionState::Failed(ErrorInfo {
                    kind,
                    message: message.to_string()
                })
            );
            // No partial result, no audio
            assert_eq!(session.audio_snapshot(), AudioPlaybackState::default());
        }
    }

    #[tokio::test]
    async fn test_submitting_always_reaches_terminal_state() {
        let recognizer = Arc::new(GatedRecognizer::default());
        let ok_gate = recognizer.gate();
        let err_gate = recognizer.gate();
        let (session, _media) = session_with(Arc::clone(&recognizer));
        let mut states = session.subscribe();

        ok_gate.send(Ok(result("A", ""))).unwrap();
        session.submit(candidate("a.jpg")).await;
        assert!(states.borrow_and_update().is_terminal());

        // Dropped sender resolves as a connection failure
        drop(err_gate);
        session.submit(candidate("b.jpg")).await;
        assert_eq!(states.borrow_and_update().phase(), SessionPhase::Failed);
    }

    #[test]
    fn test_clear_rules() {
        let (session, _media) = session();

        let err = session.clear().unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                action: "clear",
                phase: SessionPhase::Idle
            }
        );

        let request = session.accept_candidate(&candidate("a.jpg"));
        assert!(session.clear().is_err());
        assert_eq!(session.phase(), SessionPhase::Submitting);
        assert!(session.preview_uri().is_some());

        session.resolve(request, Ok(result("A", "")));
        let uri = session.preview_uri().unwrap();
        session.clear().unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.preview_uri().is_none());
        assert!(session.previews().resolve(&uri).is_none());
        assert_eq!(session.previews().live_count(), 0);
    }

    #[test]
    fn test_clear_from_failed() {
        let (session, _media) = session();
        let request = session.accept_candidate(&candidate("a.jpg"));
        session.resolve(request, Err(PredictionError::Connection("x".into())));
        session.clear().unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_success_assigns_audio_source() {
        let (session, mut media) = session();
        let request = session.accept_candidate(&candidate("a.jpg"));
        session.resolve(request, Ok(result("A", "https://x/a.mp3")));

        let snapshot = session.audio_snapshot();
        assert_eq!(snapshot.source_url.as_deref(), Some("https://x/a.mp3"));
        assert!(snapshot.is_loading);
        assert!(!session.toggle_audio());

        while let Ok(event) = media.try_recv() {
            session.handle_media_event(event);
        }
        let snapshot = session.audio_snapshot();
        assert!(!snapshot.is_loading);
        assert!(session.toggle_audio());
    }

    #[test]
    fn test_success_without_audio_keeps_previous_source() {
        let (session, _media) = session();
        let request = session.accept_candidate(&candidate("a.jpg"));
        session.resolve(request, Ok(result("A", "https://x/a.mp3")));

        let request = session.accept_candidate(&candidate("b.jpg"));
        session.resolve(request, Ok(result("B", "")));
        assert_eq!(
            session.audio_snapshot().source_url.as_deref(),
            Some("https://x/a.mp3")
        );
    }

    #[test]
    fn test_queued_events_of_replaced_source_are_ignored() {
        let (session, mut media) = session();
        let request = session.accept_candidate(&candidate("a.jpg"));
        session.resolve(request, Ok(result("A", "https://x/a.mp3")));
        let request = session.accept_candidate(&candidate("b.jpg"));
        session.resolve(request, Ok(result("B", "https://x/b.mp3")));

        // A's LoadStart and LoadedData are still queued ahead of B's
        for _ in 0..2 {
            session.handle_media_event(media.try_recv().unwrap());
        }
        let snapshot = session.audio_snapshot();
        assert_eq!(snapshot.source_url.as_deref(), Some("https://x/b.mp3"));
        assert!(snapshot.is_loading);
        assert!(!session.toggle_audio());

        // B's own events complete loading and start autoplay
        let mut saw_playing = false;
        while let Ok(event) = media.try_recv() {
            session.handle_media_event(event);
            saw_playing |= session.audio_snapshot().is_playing;
        }
        assert!(saw_playing);
        let snapshot = session.audio_snapshot();
        assert_eq!(snapshot.source_url.as_deref(), Some("https://x/b.mp3"));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_audio_source_matches_displayed_result_under_contention() {
        let (session, _media) = session();

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    let request = session.accept_candidate(&candidate("c.jpg"));
                    tokio::task::yield_now().await;
                    let url = format!("https://x/{}.mp3", i);
                    session.resolve(request, Ok(result(&i.to_string(), &url)))
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        match session.state() {
            SessionState::Success(r) => {
                assert_eq!(
                    session.audio_snapshot().source_url.as_deref(),
                    Some(r.audio_url.as_str())
                );
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_transitions_are_published() {
        let (session, _media) = session();
        let mut events = session.events.subscribe();
        let mut states = session.subscribe();

        let request = session.accept_candidate(&candidate("a.jpg"));
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), SessionState::Submitting { request });

        match events.try_recv().unwrap() {
            SessionEvent::SessionStateChanged {
                old_phase,
                new_phase,
                request: Some(1),
                ..
            } => {
                assert_eq!(old_phase, SessionPhase::Idle);
                assert_eq!(new_phase, SessionPhase::Submitting);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_drop_releases_preview() {
        let (session, _media) = session();
        let previews = session.previews().clone();
        session.accept_candidate(&candidate("a.jpg"));
        assert_eq!(previews.live_count(), 1);

        drop(session);
        assert_eq!(previews.live_count(), 0);
    }
}
