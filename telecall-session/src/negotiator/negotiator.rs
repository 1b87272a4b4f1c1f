use crate::channel::{ChannelRefusal, SignalingChannel, Subscription};
use crate::config::CallConfig;
use crate::error::NegotiationError;
use crate::media::{LocalMedia, MediaSource, TrackKind};
use crate::negotiator::{
    CandidateDisposition, CandidateQueue, ConnectionState, LocalAction, NegotiationEvent,
    NegotiationState,
};
use crate::transport::{MediaTransport, TransportEvent, TransportFactory, TransportState};
use bytes::Bytes;
use std::sync::Arc;
use telecall_core::{
    IceCandidateData, IceServerConfig, Role, RoomId, SessionDescription, SignalMessage,
    SignalPayload,
};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, trace, warn};

/// The pluggable capabilities one call runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub media: Arc<dyn MediaSource>,
    pub transports: Arc<dyn TransportFactory>,
    pub channel: Arc<dyn SignalingChannel>,
}

/// Per-call offer/answer state machine.
///
/// Every input (signaling message, transport event, local action) is
/// handled to completion before the next one; [`Negotiator::run`] is the
/// loop that feeds them in. The methods are public so a call can also be
/// stepped by hand.
pub struct Negotiator {
    config: CallConfig,
    collaborators: Collaborators,
    state: NegotiationState,

    media: Option<LocalMedia>,
    transport: Option<Arc<dyn MediaTransport>>,
    transport_rx: Option<mpsc::Receiver<TransportEvent>>,
    subscription: Option<Subscription>,
    subscribed: bool,

    candidates: CandidateQueue,
    local_offer: Option<SessionDescription>,
    local_answer: Option<SessionDescription>,
    answer_applied: bool,
    remote_joined: bool,

    events: broadcast::Sender<NegotiationEvent>,
    state_tx: watch::Sender<NegotiationState>,
}

impl Negotiator {
    /// Validates the room. Nothing is acquired until [`Negotiator::join`].
    pub fn new(config: CallConfig, collaborators: Collaborators) -> Result<Self, NegotiationError> {
        let room_id = RoomId::resolve(&config.room)?;
        let state = NegotiationState::new(config.role, room_id);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (state_tx, _) = watch::channel(state.clone());

        Ok(Self {
            config,
            collaborators,
            state,
            media: None,
            transport: None,
            transport_rx: None,
            subscription: None,
            subscribed: false,
            candidates: CandidateQueue::default(),
            local_offer: None,
            local_answer: None,
            answer_applied: false,
            remote_joined: false,
            events,
            state_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NegotiationEvent> {
        self.events.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<NegotiationState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<NegotiationEvent> {
        self.events.clone()
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection_state
    }

    fn role(&self) -> Role {
        self.state.role
    }

    fn room_id(&self) -> &RoomId {
        &self.state.room_id
    }

    /// Acquires local media, subscribes to the room and builds the
    /// transport with whatever ICE servers the channel advertised, then
    /// announces itself with `Join`.
    ///
    /// On error every resource acquired so far is released and the
    /// negotiator stays `Idle`.
    pub async fn join(&mut self) -> Result<(), NegotiationError> {
        if self.state.connection_state != ConnectionState::Idle {
            return Err(NegotiationError::InvalidState(self.state.connection_state));
        }

        let media = self
            .collaborators
            .media
            .acquire(self.config.constraints)
            .await?;

        let subscription = match self.collaborators.channel.subscribe(self.room_id()).await {
            Ok(subscription) => subscription,
            Err(e) => {
                media.stop_all();
                return Err(match e.downcast::<ChannelRefusal>() {
                    Ok(refusal) => NegotiationError::Refused(refusal),
                    Err(e) => NegotiationError::Channel(e),
                });
            }
        };

        let advertised = self.collaborators.channel.ice_servers(self.room_id());
        let (transport_tx, transport_rx) =
            mpsc::channel(self.config.transport_event_capacity.max(1));
        let transport = match self.build_transport(&media, transport_tx, advertised).await {
            Ok(transport) => transport,
            Err(e) => {
                self.collaborators.channel.unsubscribe(self.room_id()).await;
                media.stop_all();
                return Err(e);
            }
        };

        info!("Joined {} as {}", self.room_id(), self.role());

        self.state.local_stream = Some(media.stream().clone());
        self.media = Some(media);
        self.transport = Some(transport);
        self.transport_rx = Some(transport_rx);
        self.subscription = Some(subscription);
        self.subscribed = true;
        self.set_connection_state(ConnectionState::AwaitingRemote);

        if let Err(e) = self.send_signal(SignalPayload::Join).await {
            warn!("Failed to announce join: {}", e);
        }

        Ok(())
    }

    async fn build_transport(
        &self,
        media: &LocalMedia,
        events: mpsc::Sender<TransportEvent>,
        advertised: Option<Vec<IceServerConfig>>,
    ) -> Result<Arc<dyn MediaTransport>, NegotiationError> {
        let transport = self
            .collaborators
            .transports
            .create(events, advertised)
            .await
            .map_err(NegotiationError::Transport)?;

        let attached = async {
            for track in media.tracks() {
                transport.add_track(track.clone(), media.stream()).await?;
            }
            if self.role() == Role::Initiator {
                transport
                    .create_data_channel(&self.config.data_channel_label)
                    .await?;
            }
            anyhow::Ok(())
        }
        .await;

        if let Err(e) = attached {
            if let Err(close_err) = transport.close().await {
                warn!("Failed to close transport after aborted join: {:#}", close_err);
            }
            return Err(NegotiationError::Transport(e));
        }

        Ok(transport)
    }

    /// Applies one inbound signaling message.
    ///
    /// Own messages (same sender role), messages for another room and
    /// unknown kinds are ignored, as is everything before `join` and
    /// after `Closed`. The first other message from the remote role
    /// raises `RemoteJoined`, whatever its kind.
    pub async fn handle_message(&mut self, message: SignalMessage) {
        match self.state.connection_state {
            ConnectionState::Idle | ConnectionState::Closed => {
                trace!("Dropping {} while {}", message.kind(), self.state.connection_state);
                return;
            }
            _ => {}
        }

        if message.sender == self.role() {
            debug!("Ignoring own {} echo", message.kind());
            return;
        }

        if &message.room_id != self.room_id() {
            warn!("Ignoring {} for foreign room {}", message.kind(), message.room_id);
            return;
        }

        if !matches!(message.payload, SignalPayload::Leave | SignalPayload::Unknown) {
            self.note_remote();
        }

        match message.payload {
            SignalPayload::Join => self.on_remote_join().await,
            SignalPayload::Offer { sdp } => self.on_offer(sdp).await,
            SignalPayload::Answer { sdp } => self.on_answer(sdp).await,
            SignalPayload::IceCandidate { candidate } => self.on_remote_candidate(candidate).await,
            SignalPayload::Leave => {
                info!("Remote {} left {}", message.sender, self.room_id());
                self.close(true).await;
            }
            SignalPayload::Unknown => debug!("Ignoring unknown signaling message"),
        }
    }

    fn note_remote(&mut self) {
        if !self.remote_joined {
            self.remote_joined = true;
            self.emit(NegotiationEvent::RemoteJoined);
        }
    }

    async fn on_remote_join(&mut self) {
        match self.role() {
            Role::Initiator => {
                if self.answer_applied {
                    debug!("Join after answer, negotiation already complete");
                    return;
                }

                let offer = match self.local_offer.clone() {
                    Some(offer) => {
                        debug!("Resending stored offer");
                        offer
                    }
                    None => match self.create_offer().await {
                        Ok(offer) => offer,
                        Err(e) => {
                            error!("Failed to create offer: {:#}", e);
                            return;
                        }
                    },
                };

                if let Err(e) = self.send_signal(SignalPayload::Offer { sdp: offer }).await {
                    warn!("Failed to send offer: {}", e);
                }
            }
            Role::Responder => {
                // The initiator joined after us and never saw our Join.
                if self.local_answer.is_none() && !self.candidates.is_remote_ready() {
                    if let Err(e) = self.send_signal(SignalPayload::Join).await {
                        warn!("Failed to answer join: {}", e);
                    }
                }
            }
        }
    }

    async fn create_offer(&mut self) -> anyhow::Result<SessionDescription> {
        let transport = self.live_transport()?;
        let offer = transport.create_offer().await?;
        transport.set_local_description(offer.clone()).await?;
        self.local_offer = Some(offer.clone());
        Ok(offer)
    }

    async fn on_offer(&mut self, sdp: SessionDescription) {
        if self.role() != Role::Responder {
            warn!("Initiator received an offer, ignoring");
            return;
        }

        if let Some(answer) = self.local_answer.clone() {
            debug!("Duplicate offer, resending stored answer");
            if let Err(e) = self.send_signal(SignalPayload::Answer { sdp: answer }).await {
                warn!("Failed to resend answer: {}", e);
            }
            return;
        }

        let answer = match self.apply_offer(sdp).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Failed to answer offer: {:#}", e);
                return;
            }
        };

        if let Err(e) = self.send_signal(SignalPayload::Answer { sdp: answer }).await {
            warn!("Failed to send answer: {}", e);
        }
    }

    async fn apply_offer(&mut self, sdp: SessionDescription) -> anyhow::Result<SessionDescription> {
        let transport = self.live_transport()?;
        transport.set_remote_description(sdp).await?;
        self.flush_candidates().await;

        let answer = transport.create_answer().await?;
        transport.set_local_description(answer.clone()).await?;
        self.local_answer = Some(answer.clone());
        Ok(answer)
    }

    async fn on_answer(&mut self, sdp: SessionDescription) {
        if self.role() != Role::Initiator {
            warn!("Responder received an answer, ignoring");
            return;
        }
        if self.answer_applied {
            debug!("Duplicate answer ignored");
            return;
        }
        if self.local_offer.is_none() {
            warn!("Answer arrived before any offer was made, ignoring");
            return;
        }

        let transport = match self.live_transport() {
            Ok(transport) => transport,
            Err(e) => {
                error!("{:#}", e);
                return;
            }
        };
        if let Err(e) = transport.set_remote_description(sdp).await {
            error!("Failed to apply answer: {:#}", e);
            return;
        }

        self.answer_applied = true;
        self.flush_candidates().await;
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidateData) {
        match self.candidates.accept(candidate) {
            CandidateDisposition::Duplicate => trace!("Duplicate candidate ignored"),
            CandidateDisposition::Queued => {
                debug!("Queued candidate until the remote description is set")
            }
            CandidateDisposition::Ready(candidate) => self.apply_candidate(candidate).await,
        }
    }

    async fn flush_candidates(&mut self) {
        let pending = self.candidates.mark_remote_ready();
        if !pending.is_empty() {
            debug!("Flushing {} queued candidates", pending.len());
        }
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidateData) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        if let Err(e) = transport.add_ice_candidate(candidate).await {
            warn!("Failed to add remote candidate: {:#}", e);
        }
    }

    /// Applies one notification from the call's transport.
    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        if matches!(
            self.state.connection_state,
            ConnectionState::Idle | ConnectionState::Closed
        ) {
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                if let Err(e) = self
                    .send_signal(SignalPayload::IceCandidate { candidate })
                    .await
                {
                    warn!("Failed to send local candidate: {}", e);
                }
            }

            TransportEvent::StateChanged(TransportState::Closed) => {
                info!("Transport closed underneath the call");
                self.close(false).await;
            }

            TransportEvent::StateChanged(transport_state) => {
                use ConnectionState::*;
                let next = match (self.state.connection_state, transport_state) {
                    (AwaitingRemote | Disconnected, TransportState::Connected) => Some(Connected),
                    (Connected, TransportState::Disconnected | TransportState::Failed) => {
                        Some(Disconnected)
                    }
                    (AwaitingRemote, TransportState::Failed) => Some(Disconnected),
                    _ => None,
                };
                if let Some(next) = next {
                    self.set_connection_state(next);
                }
            }

            TransportEvent::RemoteTrack(stream) => {
                if self.state.remote_stream.as_ref() != Some(&stream) {
                    info!("Remote stream {} attached", stream);
                    self.state.remote_stream = Some(stream.clone());
                    self.emit(NegotiationEvent::RemoteTrackAdded(stream));
                }
            }

            TransportEvent::DataChannelReady(handle) => {
                self.state.data_channel = Some(handle.clone());
                self.emit(NegotiationEvent::DataChannelOpened(handle));
            }

            TransportEvent::Message(data) => {
                let decoded = std::str::from_utf8(&data)
                    .map_err(|e| e.to_string())
                    .and_then(|text| SignalMessage::decode(text).map_err(|e| e.to_string()));
                match decoded {
                    Ok(message) => self.handle_message(message).await,
                    Err(e) => debug!("Ignoring non-signaling data channel message: {}", e),
                }
            }
        }
    }

    /// Applies a local user action. `EndCall` is always accepted; the
    /// toggles need joined media.
    pub async fn send_local_action(&mut self, action: LocalAction) -> Result<(), NegotiationError> {
        if action == LocalAction::EndCall {
            self.end_call().await;
            return Ok(());
        }

        match self.state.connection_state {
            ConnectionState::Closed => return Err(NegotiationError::CallEnded),
            ConnectionState::Idle => return Err(NegotiationError::InvalidState(ConnectionState::Idle)),
            _ => {}
        }

        let Some(media) = self.media.as_ref() else {
            return Ok(());
        };

        let (kind, enabled) = match action {
            LocalAction::Mute => (TrackKind::Audio, false),
            LocalAction::Unmute => (TrackKind::Audio, true),
            LocalAction::VideoOff => (TrackKind::Video, false),
            LocalAction::VideoOn => (TrackKind::Video, true),
            LocalAction::EndCall => return Ok(()),
        };

        if !media.set_enabled(kind, enabled) {
            debug!("No local {:?} track to toggle", kind);
            return Ok(());
        }

        match kind {
            TrackKind::Audio => self.state.audio_muted = !enabled,
            TrackKind::Video => self.state.video_off = !enabled,
        }
        self.emit(NegotiationEvent::LocalMediaChanged {
            audio_muted: self.state.audio_muted,
            video_off: self.state.video_off,
        });

        Ok(())
    }

    /// Tells the remote side and closes. Idempotent.
    pub async fn end_call(&mut self) {
        match self.state.connection_state {
            ConnectionState::Closed => return,
            ConnectionState::Idle => {
                self.set_connection_state(ConnectionState::Closed);
                return;
            }
            _ => {}
        }

        let leave = SignalMessage::leave(self.role(), self.room_id().clone());

        if self.state.data_channel.is_some() {
            if let Some(transport) = self.transport.as_ref() {
                match leave.encode() {
                    Ok(json) => {
                        if let Err(e) = transport.send_data(Bytes::from(json)).await {
                            debug!("Leave over data channel failed: {:#}", e);
                        }
                    }
                    Err(e) => error!("Failed to serialize leave: {}", e),
                }
            }
        }

        if let Err(e) = self
            .collaborators
            .channel
            .send(self.room_id(), &leave)
            .await
        {
            warn!("Failed to send leave: {:#}", e);
        }

        self.close(false).await;
    }

    /// Releases transport, media and subscription, then enters `Closed`.
    async fn close(&mut self, remote_left: bool) {
        if self.state.connection_state.is_closed() {
            return;
        }

        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("Failed to close transport: {:#}", e);
            }
        }
        if let Some(media) = self.media.take() {
            media.stop_all();
        }
        if self.subscribed {
            self.collaborators.channel.unsubscribe(self.room_id()).await;
            self.subscribed = false;
        }

        self.subscription = None;
        self.transport_rx = None;
        self.candidates.clear();
        self.local_offer = None;
        self.local_answer = None;
        self.state.local_stream = None;
        self.state.remote_stream = None;
        self.state.data_channel = None;

        if remote_left {
            self.emit(NegotiationEvent::RemoteLeft);
        }
        self.set_connection_state(ConnectionState::Closed);
        info!("Call in {} closed", self.room_id());
    }

    /// Handles every inbound message and transport event already queued,
    /// without waiting for more. Returns how many were handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;

        while !self.state.connection_state.is_closed() {
            let message = self.subscription.as_mut().and_then(|rx| rx.try_recv().ok());
            if let Some(message) = message {
                self.handle_message(message).await;
                handled += 1;
                continue;
            }

            let event = self.transport_rx.as_mut().and_then(|rx| rx.try_recv().ok());
            if let Some(event) = event {
                self.handle_transport_event(event).await;
                handled += 1;
                continue;
            }

            break;
        }

        self.publish_state();
        handled
    }

    /// Drives the call until it is `Closed`.
    ///
    /// The call ends when `actions` is dropped or the signaling
    /// subscription ends.
    pub async fn run(mut self, mut actions: mpsc::Receiver<LocalAction>) {
        let mut subscription = self.subscription.take();
        let mut transport_rx = self.transport_rx.take();
        info!("Call loop started in {} as {}", self.room_id(), self.role());
        self.publish_state();

        while !self.state.connection_state.is_closed() {
            tokio::select! {
                msg = next_message(&mut subscription) => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            subscription = None;
                            self.on_subscription_end().await;
                        }
                    }
                }

                evt = next_transport_event(&mut transport_rx) => {
                    match evt {
                        Some(event) => self.handle_transport_event(event).await,
                        None => {
                            warn!("Transport event channel closed");
                            transport_rx = None;
                        }
                    }
                }

                action = actions.recv() => {
                    match action {
                        Some(action) => {
                            if let Err(e) = self.send_local_action(action).await {
                                warn!("Rejected {:?}: {}", action, e);
                            }
                        }
                        None => {
                            info!("Call handle dropped, ending call");
                            self.end_call().await;
                        }
                    }
                }
            }

            self.publish_state();
        }

        info!("Call loop finished");
    }

    async fn on_subscription_end(&mut self) {
        match self.collaborators.channel.take_refusal(self.room_id()) {
            Some(refusal) => {
                error!("Signaling channel refused the call: {}", refusal);
                self.state.refusal = Some(refusal);
                self.emit(NegotiationEvent::Refused(refusal));
            }
            None => info!("Signaling subscription ended"),
        }
        self.close(false).await;
    }

    async fn send_signal(&self, payload: SignalPayload) -> Result<(), NegotiationError> {
        let message = SignalMessage::new(payload, self.role(), self.room_id().clone());
        trace!("Sending {}", message.kind());
        self.collaborators
            .channel
            .send(self.room_id(), &message)
            .await
            .map_err(NegotiationError::Channel)
    }

    fn live_transport(&self) -> anyhow::Result<Arc<dyn MediaTransport>> {
        self.transport
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no transport while {}", self.state.connection_state))
    }

    fn set_connection_state(&mut self, next: ConnectionState) {
        if self.state.connection_state == next {
            return;
        }
        info!("{} -> {}", self.state.connection_state, next);
        self.state.connection_state = next;
        self.emit(NegotiationEvent::ConnectionStateChanged(next));
    }

    fn emit(&self, event: NegotiationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

async fn next_message(rx: &mut Option<Subscription>) -> Option<SignalMessage> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_transport_event(
    rx: &mut Option<mpsc::Receiver<TransportEvent>>,
) -> Option<TransportEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl Drop for Negotiator {
    fn drop(&mut self) {
        if self.state.connection_state.is_closed() {
            return;
        }

        if let Some(media) = self.media.take() {
            media.stop_all();
        }

        let transport = self.transport.take();
        let channel = self.subscribed.then(|| self.collaborators.channel.clone());
        if transport.is_none() && channel.is_none() {
            return;
        }

        let room = self.state.room_id.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(transport) = transport {
                        let _ = transport.close().await;
                    }
                    if let Some(channel) = channel {
                        channel.unsubscribe(&room).await;
                    }
                });
            }
            Err(_) => warn!("Call in {} dropped outside a runtime, transport left open", room),
        }
    }
}
