use bytes::Bytes;
use telecall_core::{Role, SignalMessage};
use telecall_session::{
    ConnectionState, NegotiationEvent, StreamHandle, TransportEvent, TransportState,
};

use crate::integration::init_tracing;
use crate::utils::{Harness, eventually, room};

async fn raise(h: &mut Harness, state: TransportState) {
    h.negotiator
        .handle_transport_event(TransportEvent::StateChanged(state))
        .await;
}

#[tokio::test]
async fn test_connection_state_follows_transport() {
    init_tracing();

    let mut h = Harness::joined(Role::Responder).await;

    raise(&mut h, TransportState::Connecting).await;
    assert_eq!(
        h.negotiator.connection_state(),
        ConnectionState::AwaitingRemote
    );

    let steps = [
        (TransportState::Connected, ConnectionState::Connected),
        (TransportState::Disconnected, ConnectionState::Disconnected),
        (TransportState::Connected, ConnectionState::Connected),
        (TransportState::Failed, ConnectionState::Disconnected),
    ];
    for (transport_state, expected) in steps {
        raise(&mut h, transport_state).await;
        assert_eq!(h.negotiator.connection_state(), expected);
    }

    assert_eq!(
        h.negotiator.connection_state().status_text(),
        "Connection lost"
    );
}

#[tokio::test]
async fn test_failure_before_connecting_is_reported_not_fatal() {
    init_tracing();

    let mut h = Harness::joined(Role::Initiator).await;
    raise(&mut h, TransportState::Failed).await;

    assert_eq!(
        h.negotiator.connection_state(),
        ConnectionState::Disconnected
    );
    assert!(!h.transport().await.is_closed().await);
}

#[tokio::test]
async fn test_transport_closing_by_itself_closes_call() {
    init_tracing();

    let mut h = Harness::joined(Role::Initiator).await;
    h.drain_events();
    raise(&mut h, TransportState::Closed).await;

    assert_eq!(h.negotiator.connection_state(), ConnectionState::Closed);
    assert!(h.media.all_stopped().await);
    assert!(h.channel.is_unsubscribed().await);
    assert_eq!(
        h.drain_events(),
        vec![NegotiationEvent::ConnectionStateChanged(
            ConnectionState::Closed
        )]
    );
}

#[tokio::test]
async fn test_remote_track_reported_once() {
    init_tracing();

    let mut h = Harness::joined(Role::Responder).await;
    h.drain_events();
    let stream = StreamHandle("remote".into());

    for _ in 0..2 {
        h.negotiator
            .handle_transport_event(TransportEvent::RemoteTrack(stream.clone()))
            .await;
    }

    assert_eq!(
        h.drain_events(),
        vec![NegotiationEvent::RemoteTrackAdded(stream.clone())]
    );
    assert_eq!(h.negotiator.state().remote_stream, Some(stream));
}

#[tokio::test]
async fn test_leave_over_data_channel_closes_call() {
    init_tracing();

    let mut h = Harness::joined(Role::Responder).await;

    h.negotiator
        .handle_transport_event(TransportEvent::Message(Bytes::from_static(b"\xff not json")))
        .await;
    assert_eq!(
        h.negotiator.connection_state(),
        ConnectionState::AwaitingRemote
    );

    let leave = SignalMessage::leave(Role::Initiator, room())
        .encode()
        .expect("encode");
    h.negotiator
        .handle_transport_event(TransportEvent::Message(Bytes::from(leave)))
        .await;

    assert_eq!(h.negotiator.connection_state(), ConnectionState::Closed);
    assert!(h.drain_events().contains(&NegotiationEvent::RemoteLeft));
}

#[tokio::test]
async fn test_drop_without_close_releases_resources() {
    init_tracing();

    let h = Harness::joined(Role::Initiator).await;
    let transport = h.transport().await;
    let media = h.media.clone();
    let channel = h.channel.clone();

    drop(h);

    assert!(media.all_stopped().await);
    let released = eventually(2000, || {
        let transport = transport.clone();
        let channel = channel.clone();
        async move { transport.is_closed().await && channel.is_unsubscribed().await }
    })
    .await;
    assert!(released, "transport and subscription should be released on drop");
}
