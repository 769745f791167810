//! Runtime Slot
//!
//! One long-lived conversation session bound to one agent. A slot owns its
//! transport handle, its threads with their transcripts, and the model
//! context bound to it. Slots are never torn down when they become
//! invisible.
//!
//! Thread presence: the first activation of a slot with no threads creates
//! exactly one. The `creating` flag guards against a second request while
//! creation is still in flight. It is cleared when the creating call ends,
//! whether it succeeds, fails, or is dropped before completion, so a failed
//! or abandoned creation leaves the slot [`SlotPhase::Uninitialized`] and a
//! later activation can retry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::context::ModelContext;
use crate::error::{Error, Result};
use crate::threads::ThreadProvider;
use crate::transcript::{MessagePart, MessageStatus, Transcript, TranscriptMessage};
use crate::transport::{AgentTransport, ChatTransport};

/// Lifecycle phase of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotPhase {
    /// No thread and no creation in flight
    Uninitialized,
    /// Creating the first thread
    Prewarming,
    /// At least one thread exists
    Ready,
}

/// What an activation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A thread was created
    Created(String),
    /// The slot already had a thread
    AlreadyReady,
    /// Another activation is creating the thread
    InFlight,
    /// Creation failed; the slot stays uninitialized
    Failed(String),
}

/// Result of one user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnSummary {
    /// Thread the turn ran on
    pub thread_id: String,
    /// Assistant snapshots received
    pub snapshots: usize,
    /// Transport failure shown inline, if any
    pub error: Option<String>,
}

#[derive(Debug)]
struct SlotState {
    threads: Vec<String>,
    transcripts: HashMap<String, Vec<TranscriptMessage>>,
    current: Option<String>,
    context: Option<ModelContext>,
}

impl SlotState {
    fn visible(&self) -> Transcript {
        match &self.current {
            Some(thread_id) => Transcript {
                thread_id: thread_id.clone(),
                messages: self.transcripts.get(thread_id).cloned().unwrap_or_default(),
            },
            None => Transcript::default(),
        }
    }
}

/// Clears the in-flight marker when the creating call finishes or is dropped
struct CreationGuard<'a>(&'a AtomicBool);

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Session state of one agent
pub struct RuntimeSlot {
    agent_id: String,
    transport: AgentTransport,
    threads: Arc<dyn ThreadProvider>,
    state: RwLock<SlotState>,
    creating: AtomicBool,
    tx: watch::Sender<Transcript>,
}

impl RuntimeSlot {
    /// Create an uninitialized slot
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
        threads: Arc<dyn ThreadProvider>,
    ) -> Self {
        let agent_id = agent_id.into();
        let (tx, _) = watch::channel(Transcript::default());
        Self {
            transport: AgentTransport::new(agent_id.clone(), transport),
            agent_id,
            threads,
            state: RwLock::new(SlotState {
                threads: Vec::new(),
                transcripts: HashMap::new(),
                current: None,
                context: None,
            }),
            creating: AtomicBool::new(false),
            tx,
        }
    }

    /// Agent this slot belongs to
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Current phase
    pub async fn phase(&self) -> SlotPhase {
        let state = self.state.read().await;
        if !state.threads.is_empty() {
            SlotPhase::Ready
        } else if self.creating.load(Ordering::Acquire) {
            SlotPhase::Prewarming
        } else {
            SlotPhase::Uninitialized
        }
    }

    /// Thread ids in creation order
    pub async fn thread_ids(&self) -> Vec<String> {
        self.state.read().await.threads.clone()
    }

    /// Thread shown for this slot
    pub async fn current_thread(&self) -> Option<String> {
        self.state.read().await.current.clone()
    }

    /// Snapshot of the current thread's transcript
    #[must_use]
    pub fn transcript(&self) -> Transcript {
        self.tx.borrow().clone()
    }

    /// Watch the current thread's transcript
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.tx.subscribe()
    }

    fn publish(&self, state: &SlotState) {
        self.tx.send_replace(state.visible());
    }

    /// Make sure the slot has a thread.
    ///
    /// Never returns an error: a creation failure is logged and reported as
    /// [`Activation::Failed`].
    pub async fn activate(&self) -> Activation {
        let _guard = {
            let state = self.state.write().await;
            if !state.threads.is_empty() {
                return Activation::AlreadyReady;
            }
            if self.creating.swap(true, Ordering::AcqRel) {
                return Activation::InFlight;
            }
            CreationGuard(&self.creating)
        };

        info!(agent_id = %self.agent_id, "Prewarming runtime slot");
        let created = self.threads.create_thread(&self.agent_id).await;

        let mut state = self.state.write().await;
        match created {
            Ok(thread_id) => {
                state.threads.push(thread_id.clone());
                state.transcripts.insert(thread_id.clone(), Vec::new());
                state.current = Some(thread_id.clone());
                self.publish(&state);
                info!(agent_id = %self.agent_id, thread_id = %thread_id, "Runtime slot ready");
                Activation::Created(thread_id)
            }
            Err(e) => {
                warn!(agent_id = %self.agent_id, error = %e, "Thread creation failed");
                Activation::Failed(e.to_string())
            }
        }
    }

    /// Create an additional thread and make it current
    pub async fn new_thread(&self) -> Result<String> {
        let thread_id = self
            .threads
            .create_thread(&self.agent_id)
            .await
            .map_err(|e| Error::thread_creation(&self.agent_id, e.to_string()))?;

        let mut state = self.state.write().await;
        state.threads.push(thread_id.clone());
        state.transcripts.insert(thread_id.clone(), Vec::new());
        state.current = Some(thread_id.clone());
        self.publish(&state);
        debug!(agent_id = %self.agent_id, thread_id = %thread_id, "Thread created");
        Ok(thread_id)
    }

    /// Show another of this slot's threads
    pub async fn switch_thread(&self, thread_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.threads.iter().any(|t| t == thread_id) {
            return Err(Error::UnknownThread(thread_id.to_string()));
        }
        state.current = Some(thread_id.to_string());
        self.publish(&state);
        Ok(())
    }

    /// Bind the model context, replacing and returning the previous binding
    pub async fn bind_context(&self, context: ModelContext) -> Option<ModelContext> {
        self.state.write().await.context.replace(context)
    }

    /// Currently bound context
    pub async fn context(&self) -> Option<ModelContext> {
        self.state.read().await.context.clone()
    }

    /// Run one user turn on the current thread.
    ///
    /// Transport failures do not fail the turn: they are recorded inline in
    /// the assistant reply and reported in [`TurnSummary::error`].
    pub async fn send(&self, text: &str) -> Result<TurnSummary> {
        let (thread_id, history, system) = {
            let mut state = self.state.write().await;
            let thread_id = state
                .current
                .clone()
                .ok_or_else(|| Error::ThreadNotReady(self.agent_id.clone()))?;
            let history = state.transcripts.entry(thread_id.clone()).or_default();
            history.push(TranscriptMessage::user(text));
            let history = history.clone();
            let system = state.context.as_ref().and_then(ModelContext::compose);
            self.publish(&state);
            (thread_id, history, system)
        };

        let mut summary = TurnSummary {
            thread_id: thread_id.clone(),
            snapshots: 0,
            error: None,
        };
        let mut reply_id = None;

        let failure = match self.transport.send(&thread_id, history, system).await {
            Ok(mut stream) => {
                let mut failure = None;
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(message) => {
                            summary.snapshots += 1;
                            reply_id = Some(message.id.clone());
                            self.record(&thread_id, message).await;
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                failure
            }
            Err(e) => Some(e),
        };

        match failure {
            Some(e) => {
                warn!(
                    agent_id = %self.agent_id,
                    thread_id = %thread_id,
                    error = %e,
                    "Chat turn failed"
                );
                self.fail_reply(&thread_id, reply_id.as_deref(), e.to_string())
                    .await;
                summary.error = Some(e.to_string());
            }
            None => self.settle_reply(&thread_id, reply_id.as_deref()).await,
        }

        Ok(summary)
    }

    async fn record(&self, thread_id: &str, message: TranscriptMessage) {
        let mut state = self.state.write().await;
        let mut transcript = Transcript {
            thread_id: thread_id.to_string(),
            messages: state.transcripts.remove(thread_id).unwrap_or_default(),
        };
        transcript.upsert(message);
        state
            .transcripts
            .insert(thread_id.to_string(), transcript.messages);
        if state.current.as_deref() == Some(thread_id) {
            self.publish(&state);
        }
    }

    async fn update_reply<F>(&self, thread_id: &str, reply_id: &str, update: F)
    where
        F: FnOnce(&mut TranscriptMessage),
    {
        let mut state = self.state.write().await;
        let Some(reply) = state
            .transcripts
            .get_mut(thread_id)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == reply_id))
        else {
            return;
        };
        update(reply);
        if state.current.as_deref() == Some(thread_id) {
            self.publish(&state);
        }
    }

    /// Mark a reply that ended without a final status as complete
    async fn settle_reply(&self, thread_id: &str, reply_id: Option<&str>) {
        if let Some(reply_id) = reply_id {
            self.update_reply(thread_id, reply_id, |reply| {
                if reply.status == MessageStatus::Running {
                    reply.status = MessageStatus::Complete;
                }
            })
            .await;
        }
    }

    async fn fail_reply(&self, thread_id: &str, reply_id: Option<&str>, message: String) {
        match reply_id {
            Some(reply_id) => {
                self.update_reply(thread_id, reply_id, |reply| {
                    reply.parts.push(MessagePart::Error { message });
                    reply.status = MessageStatus::Incomplete;
                })
                .await;
            }
            None => {
                self.record(thread_id, TranscriptMessage::assistant_error(message))
                    .await;
            }
        }
    }
}

impl std::fmt::Debug for RuntimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeSlot")
            .field("agent_id", &self.agent_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threads::MockThreadProvider;
    use crate::transcript::MessageRole;
    use crate::transport::{ChatRequest, MessageStream, MockChatTransport, OfflineTransport};
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_pending, assert_ready};

    /// Provider that blocks until released and counts calls
    #[derive(Default)]
    struct GatedProvider {
        calls: AtomicUsize,
        gate: Notify,
    }

    #[async_trait]
    impl ThreadProvider for GatedProvider {
        async fn create_thread(&self, agent_id: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(format!("{agent_id}-thread-{n}"))
        }
    }

    fn offline() -> Arc<dyn ChatTransport> {
        Arc::new(OfflineTransport)
    }

    fn sequential_provider() -> Arc<dyn ThreadProvider> {
        let counter = AtomicUsize::new(0);
        let mut provider = MockThreadProvider::new();
        provider.expect_create_thread().returning(move |agent_id| {
            Ok(format!("{agent_id}-{}", counter.fetch_add(1, Ordering::SeqCst)))
        });
        Arc::new(provider)
    }

    #[tokio::test]
    async fn test_prewarm_requests_exactly_one_thread() {
        let provider = Arc::new(GatedProvider::default());
        let slot = RuntimeSlot::new("salesAgent", offline(), provider.clone());

        let mut first = tokio_test::task::spawn(slot.activate());
        assert_pending!(first.poll());
        assert_eq!(slot.phase().await, SlotPhase::Prewarming);

        assert_eq!(slot.activate().await, Activation::InFlight);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        provider.gate.notify_one();
        let activation = assert_ready!(first.poll());
        assert_eq!(activation, Activation::Created("salesAgent-thread-0".into()));
        drop(first);

        assert_eq!(slot.activate().await, Activation::AlreadyReady);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(slot.phase().await, SlotPhase::Ready);
        assert_eq!(slot.transcript().thread_id, "salesAgent-thread-0");
    }

    #[tokio::test]
    async fn test_dropped_activation_allows_retry() {
        let provider = Arc::new(GatedProvider::default());
        let slot = RuntimeSlot::new("salesAgent", offline(), provider.clone());

        let mut abandoned = tokio_test::task::spawn(slot.activate());
        assert_pending!(abandoned.poll());
        assert_eq!(slot.phase().await, SlotPhase::Prewarming);
        drop(abandoned);

        assert_eq!(slot.phase().await, SlotPhase::Uninitialized);

        // permit is stored for the next waiter
        provider.gate.notify_one();
        let activation = tokio::time::timeout(Duration::from_secs(1), slot.activate())
            .await
            .unwrap();
        assert_eq!(activation, Activation::Created("salesAgent-thread-1".into()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(slot.phase().await, SlotPhase::Ready);
        assert!(slot.send("hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_creation_allows_retry() {
        let attempts = AtomicUsize::new(0);
        let mut provider = MockThreadProvider::new();
        provider
            .expect_create_thread()
            .times(2)
            .returning(move |_| match attempts.fetch_add(1, Ordering::SeqCst) {
                0 => Err(Error::transport("backend down")),
                _ => Ok("t1".to_string()),
            });
        let slot = RuntimeSlot::new("doctorAgent", offline(), Arc::new(provider));

        assert!(matches!(slot.activate().await, Activation::Failed(_)));
        assert_eq!(slot.phase().await, SlotPhase::Uninitialized);
        assert!(slot.thread_ids().await.is_empty());

        assert_eq!(slot.activate().await, Activation::Created("t1".into()));
        assert_eq!(slot.phase().await, SlotPhase::Ready);
    }

    #[tokio::test]
    async fn test_send_before_thread_is_rejected() {
        let slot = RuntimeSlot::new("a", offline(), sequential_provider());
        assert!(matches!(
            slot.send("hello").await,
            Err(Error::ThreadNotReady(id)) if id == "a"
        ));
    }

    #[tokio::test]
    async fn test_send_streams_reply_and_uses_context() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send()
            .withf(|req: &ChatRequest| {
                req.agent_id == "salesAgent"
                    && req.system.as_deref() == Some("Book visits.\n\nBoard: empty")
                    && req.messages.len() == 1
            })
            .times(1)
            .returning(|_| {
                let partial = TranscriptMessage::assistant(vec![MessagePart::text("Bo")])
                    .with_id("r1")
                    .with_status(MessageStatus::Running);
                let more = TranscriptMessage::assistant(vec![MessagePart::text("Booked")])
                    .with_id("r1")
                    .with_status(MessageStatus::Running);
                let stream: MessageStream = stream::iter(vec![Ok(partial), Ok(more)]).boxed();
                Ok(stream)
            });

        let slot = RuntimeSlot::new("salesAgent", Arc::new(transport), sequential_provider());
        slot.activate().await;
        slot.bind_context(
            ModelContext::new("Book visits.").with_instructions(Some("Board: empty".into())),
        )
        .await;

        let summary = slot.send("book Anna").await.unwrap();
        assert_eq!(summary.snapshots, 2);
        assert!(summary.error.is_none());

        let transcript = slot.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages[0].role, MessageRole::User);
        assert_eq!(transcript.messages[1].text(), "Booked");
        assert_eq!(transcript.messages[1].status, MessageStatus::Complete);
    }

    #[tokio::test]
    async fn test_transport_failure_is_inline() {
        let slot = RuntimeSlot::new("a", offline(), sequential_provider());
        slot.activate().await;

        let summary = slot.send("hello").await.unwrap();
        assert_eq!(summary.error.as_deref(), Some("transport error: no chat backend configured"));

        let transcript = slot.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages[1].status, MessageStatus::Incomplete);
        assert!(matches!(transcript.messages[1].parts[0], MessagePart::Error { .. }));

        // still usable
        assert!(slot.send("again").await.is_ok());
    }

    #[tokio::test]
    async fn test_stream_failure_marks_partial_reply() {
        let mut transport = MockChatTransport::new();
        transport.expect_send().returning(|_| {
            let partial = TranscriptMessage::assistant(vec![MessagePart::text("Che")])
                .with_id("r1")
                .with_status(MessageStatus::Running);
            let stream: MessageStream =
                stream::iter(vec![Ok(partial), Err(Error::transport("reset"))]).boxed();
            Ok(stream)
        });
        let slot = RuntimeSlot::new("a", Arc::new(transport), sequential_provider());
        slot.activate().await;

        let summary = slot.send("hi").await.unwrap();
        assert_eq!(summary.error.as_deref(), Some("transport error: reset"));

        let reply = &slot.transcript().messages[1];
        assert_eq!(reply.id, "r1");
        assert_eq!(reply.status, MessageStatus::Incomplete);
        assert_eq!(reply.parts.len(), 2);
    }

    #[tokio::test]
    async fn test_threads_switch() {
        let slot = RuntimeSlot::new("a", offline(), sequential_provider());
        slot.activate().await;
        slot.send("first").await.unwrap();
        let first = slot.current_thread().await.unwrap();

        let second = slot.new_thread().await.unwrap();
        assert_ne!(first, second);
        assert!(slot.transcript().is_empty());

        slot.switch_thread(&first).await.unwrap();
        assert_eq!(slot.transcript().thread_id, first);
        assert!(!slot.transcript().is_empty());

        assert!(matches!(
            slot.switch_thread("nope").await,
            Err(Error::UnknownThread(_))
        ));
    }

    #[tokio::test]
    async fn test_bind_context_replaces() {
        let slot = RuntimeSlot::new("a", offline(), sequential_provider());
        assert!(slot.bind_context(ModelContext::new("one")).await.is_none());
        let previous = slot.bind_context(ModelContext::new("two")).await;
        assert_eq!(previous, Some(ModelContext::new("one")));
        assert_eq!(slot.context().await, Some(ModelContext::new("two")));
    }
}
