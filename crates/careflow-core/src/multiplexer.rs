//! Runtime Multiplexer
//!
//! Registry of runtime slots keyed by agent id with a single active pointer.
//! Slots are created lazily on first selection and then kept for the life of
//! the multiplexer, so switching agents only changes which slot is visible.
//! The visible slot's transcript is republished on one channel that the
//! board feed follows.
//!
//! Selections may overlap while a slot is prewarming. Only the selection that
//! is still active once its slot is ready gets to bind context and become
//! visible; the check and the attach happen under one lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::ModelContext;
use crate::directory::{fallback_agents, AgentDescriptor, AgentDirectory};
use crate::error::{Error, Result};
use crate::slot::{Activation, RuntimeSlot, TurnSummary};
use crate::threads::ThreadProvider;
use crate::transcript::Transcript;
use crate::transport::ChatTransport;

/// Multiplexer settings
#[derive(Debug, Clone, Default)]
pub struct MultiplexerConfig {
    /// Initially selected agent; falls back to the first selectable one
    pub default_agent: Option<String>,
    /// Restrict selection to these ids (selector `agentIds`)
    pub selectable: Option<Vec<String>>,
}

#[derive(Debug)]
struct Roster {
    agents: Vec<AgentDescriptor>,
    active_id: String,
}

impl Roster {
    fn selectable<'a>(&'a self, filter: Option<&'a [String]>) -> impl Iterator<Item = &'a AgentDescriptor> {
        self.agents
            .iter()
            .filter(move |a| filter.map_or(true, |ids| ids.iter().any(|id| *id == a.id)))
    }

    /// Keep `preferred` if selectable, else the first selectable agent
    fn reconcile(&self, preferred: &str, filter: Option<&[String]>) -> String {
        if self.selectable(filter).any(|a| a.id == preferred) {
            return preferred.to_string();
        }
        self.selectable(filter)
            .next()
            .or_else(|| self.agents.first())
            .map_or_else(|| preferred.to_string(), |a| a.id.clone())
    }
}

/// One slot per agent, one visible at a time
pub struct RuntimeMultiplexer {
    transport: Arc<dyn ChatTransport>,
    threads: Arc<dyn ThreadProvider>,
    selectable: Option<Vec<String>>,
    roster: RwLock<Roster>,
    slots: RwLock<HashMap<String, Arc<RuntimeSlot>>>,
    instructions: RwLock<Option<String>>,
    visible: Arc<watch::Sender<Transcript>>,
    visibility: AsyncMutex<()>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl RuntimeMultiplexer {
    /// Create a multiplexer over the built-in agent list
    #[must_use]
    pub fn new(
        config: MultiplexerConfig,
        transport: Arc<dyn ChatTransport>,
        threads: Arc<dyn ThreadProvider>,
    ) -> Self {
        let mut roster = Roster {
            agents: fallback_agents(),
            active_id: String::new(),
        };
        let preferred = config.default_agent.unwrap_or_default();
        roster.active_id = roster.reconcile(&preferred, config.selectable.as_deref());

        let (visible, _) = watch::channel(Transcript::default());
        Self {
            transport,
            threads,
            selectable: config.selectable,
            roster: RwLock::new(roster),
            slots: RwLock::new(HashMap::new()),
            instructions: RwLock::new(None),
            visible: Arc::new(visible),
            visibility: AsyncMutex::new(()),
            forwarder: Mutex::new(None),
        }
    }

    /// Agents offered by the selector
    pub async fn agents(&self) -> Vec<AgentDescriptor> {
        let roster = self.roster.read().await;
        roster.selectable(self.selectable.as_deref()).cloned().collect()
    }

    /// Active agent id
    pub async fn active_id(&self) -> String {
        self.roster.read().await.active_id.clone()
    }

    /// Active agent descriptor
    pub async fn active_agent(&self) -> Option<AgentDescriptor> {
        let roster = self.roster.read().await;
        roster
            .agents
            .iter()
            .find(|a| a.id == roster.active_id)
            .cloned()
    }

    /// Slot of an agent, if it was ever selected
    pub async fn slot(&self, agent_id: &str) -> Option<Arc<RuntimeSlot>> {
        self.slots.read().await.get(agent_id).cloned()
    }

    /// Ids of all instantiated slots, sorted
    pub async fn slot_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.slots.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Watch the visible slot's transcript
    #[must_use]
    pub fn subscribe_visible(&self) -> watch::Receiver<Transcript> {
        self.visible.subscribe()
    }

    /// Snapshot of the visible transcript
    #[must_use]
    pub fn visible(&self) -> Transcript {
        self.visible.borrow().clone()
    }

    /// Make `agent_id` the visible slot, creating and prewarming it on first
    /// use.
    ///
    /// If another selection became active while this slot was prewarming,
    /// the slot is returned prewarmed but stays hidden.
    pub async fn select(&self, agent_id: &str) -> Result<Arc<RuntimeSlot>> {
        {
            let mut roster = self.roster.write().await;
            if !roster
                .selectable(self.selectable.as_deref())
                .any(|a| a.id == agent_id)
            {
                return Err(Error::UnknownAgent(agent_id.to_string()));
            }
            if roster.active_id != agent_id {
                info!(from = %roster.active_id, to = %agent_id, "Switching active agent");
                roster.active_id = agent_id.to_string();
            }
        }

        let slot = self.ensure_slot(agent_id).await;
        if let Activation::Failed(message) = slot.activate().await {
            debug!(agent_id = %agent_id, error = %message, "Slot left uninitialized");
        }

        let _visibility = self.visibility.lock().await;
        if self.active_id().await != agent_id {
            debug!(agent_id = %agent_id, "Selection superseded, slot stays hidden");
            return Ok(slot);
        }
        self.bind_active_context(&slot).await;
        self.attach(&slot);
        Ok(slot)
    }

    /// Select the current active agent, prewarming its slot
    pub async fn activate_current(&self) -> Result<Arc<RuntimeSlot>> {
        let active = self.active_id().await;
        self.select(&active).await
    }

    /// Replace the agent list from `directory`.
    ///
    /// An unreachable directory or an empty answer keeps the current list.
    /// If the active agent disappeared, the first selectable agent becomes
    /// active. Returns whether the list was replaced.
    pub async fn refresh(&self, directory: &dyn AgentDirectory) -> bool {
        let agents = match directory.list_agents().await {
            Ok(agents) if !agents.is_empty() => agents,
            Ok(_) => {
                warn!("Agent directory returned no agents, keeping current list");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load agent directory, keeping current list");
                return false;
            }
        };

        let (previous, active) = {
            let mut roster = self.roster.write().await;
            roster.agents = agents;
            let previous = roster.active_id.clone();
            roster.active_id = roster.reconcile(&previous, self.selectable.as_deref());
            (previous, roster.active_id.clone())
        };
        info!(active = %active, "Agent directory loaded");

        if previous != active {
            info!(from = %previous, to = %active, "Active agent no longer listed");
            if let Err(e) = self.select(&active).await {
                warn!(error = %e, "Failed to activate reconciled agent");
            }
        } else if let Some(slot) = self.slot(&active).await {
            self.bind_active_context(&slot).await;
        }
        true
    }

    /// Set the board instructions attached to the active slot's context
    pub async fn set_board_instructions(&self, instructions: Option<String>) {
        *self.instructions.write().await = instructions;
        let active = self.active_id().await;
        if let Some(slot) = self.slot(&active).await {
            self.bind_active_context(&slot).await;
        }
    }

    /// Send a user turn through the active slot
    pub async fn send(&self, text: &str) -> Result<TurnSummary> {
        let active = self.active_id().await;
        let slot = match self.slot(&active).await {
            Some(slot) => slot,
            None => self.select(&active).await?,
        };
        match slot.activate().await {
            Activation::Failed(message) => {
                return Err(Error::thread_creation(&active, message));
            }
            Activation::InFlight => return Err(Error::ThreadNotReady(active)),
            Activation::Created(_) | Activation::AlreadyReady => {}
        }
        self.bind_active_context(&slot).await;
        slot.send(text).await
    }

    async fn ensure_slot(&self, agent_id: &str) -> Arc<RuntimeSlot> {
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(agent_id.to_string()).or_insert_with(|| {
            debug!(agent_id = %agent_id, "Creating runtime slot");
            Arc::new(RuntimeSlot::new(
                agent_id,
                Arc::clone(&self.transport),
                Arc::clone(&self.threads),
            ))
        }))
    }

    async fn bind_active_context(&self, slot: &RuntimeSlot) {
        let system = {
            let roster = self.roster.read().await;
            roster
                .agents
                .iter()
                .find(|a| a.id == slot.agent_id())
                .map(|a| a.system.clone())
                .unwrap_or_default()
        };
        let instructions = self.instructions.read().await.clone();
        let context = ModelContext::new(system).with_instructions(instructions);
        let previous = slot.bind_context(context.clone()).await;
        if previous.as_ref() != Some(&context) {
            debug!(agent_id = %slot.agent_id(), "Model context rebound");
        }
    }

    /// Forward `slot`'s transcript to the visible channel, replacing the
    /// previous forwarder.
    fn attach(&self, slot: &RuntimeSlot) {
        let mut forwarder = self
            .forwarder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = forwarder.take() {
            handle.abort();
        }

        let mut source = slot.subscribe();
        let visible = Arc::clone(&self.visible);
        visible.send_replace(source.borrow_and_update().clone());
        *forwarder = Some(tokio::spawn(async move {
            while source.changed().await.is_ok() {
                let transcript = source.borrow_and_update().clone();
                visible.send_replace(transcript);
            }
        }));
    }
}

impl Drop for RuntimeMultiplexer {
    fn drop(&mut self) {
        let forwarder = self
            .forwarder
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = forwarder.take() {
            handle.abort();
        }
    }
}
