use crate::config::CallConfig;
use crate::error::NegotiationError;
use crate::negotiator::{
    Collaborators, ConnectionState, LocalAction, NegotiationEvent, NegotiationState, Negotiator,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

const ACTION_QUEUE: usize = 16;

/// Cloneable front end of a running call.
#[derive(Clone)]
pub struct CallHandle {
    actions: mpsc::Sender<LocalAction>,
    events: broadcast::Sender<NegotiationEvent>,
    state: watch::Receiver<NegotiationState>,
}

impl CallHandle {
    pub async fn send_action(&self, action: LocalAction) -> Result<(), NegotiationError> {
        self.actions
            .send(action)
            .await
            .map_err(|_| NegotiationError::CallEnded)
    }

    pub async fn end_call(&self) -> Result<(), NegotiationError> {
        self.send_action(LocalAction::EndCall).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NegotiationEvent> {
        self.events.subscribe()
    }

    /// Latest published snapshot. Still readable after the call ended.
    pub fn state(&self) -> NegotiationState {
        self.state.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().connection_state
    }

    /// Resolves once the call reaches `target`.
    pub async fn wait_for(
        &self,
        target: ConnectionState,
    ) -> Result<NegotiationState, NegotiationError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| s.connection_state == target)
            .await
            .map(|s| (*s).clone())
            .map_err(|_| NegotiationError::CallEnded)
    }
}

pub struct Call;

impl Call {
    /// Runs an already joined negotiator on its own task.
    pub fn spawn(negotiator: Negotiator) -> (CallHandle, JoinHandle<()>) {
        let (actions, actions_rx) = mpsc::channel(ACTION_QUEUE);
        let handle = CallHandle {
            actions,
            events: negotiator.event_sender(),
            state: negotiator.watch_state(),
        };
        let task = tokio::spawn(negotiator.run(actions_rx));
        (handle, task)
    }

    /// Validates, joins and spawns in one step.
    pub async fn join(
        config: CallConfig,
        collaborators: Collaborators,
    ) -> Result<(CallHandle, JoinHandle<()>), NegotiationError> {
        let mut negotiator = Negotiator::new(config, collaborators)?;
        negotiator.join().await?;
        Ok(Self::spawn(negotiator))
    }
}
