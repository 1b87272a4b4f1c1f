use std::sync::Arc;

use telecall_core::{IceServerConfig, Role, RoomIdError};
use telecall_session::{
    CallConfig, ChannelRefusal, Collaborators, ConnectionState, NegotiationError, Negotiator,
};

use crate::integration::init_tracing;
use crate::utils::{
    ChannelCall, Harness, MockChannel, MockMediaSource, MockTransportFactory, room,
};

#[tokio::test]
async fn test_invalid_room_rejected_before_any_resource() {
    init_tracing();

    let media = MockMediaSource::new();
    let transports = MockTransportFactory::new();
    let channel = MockChannel::new();

    for secret in ["529.982.247-26", "111.111.111-11", "telemedicina_123", "abc"] {
        let collaborators = Collaborators {
            media: Arc::new(media.clone()),
            transports: Arc::new(transports.clone()),
            channel: Arc::new(channel.clone()),
        };
        let result = Negotiator::new(CallConfig::new(Role::Initiator, secret), collaborators);
        assert!(
            matches!(result, Err(NegotiationError::InvalidRoomId(_))),
            "{secret} should be rejected"
        );
    }

    assert_eq!(media.acquisitions().await, 0);
    assert_eq!(transports.created().await, 0);
    assert_eq!(channel.call_count().await, 0);
}

#[tokio::test]
async fn test_invalid_room_error_names_the_secret() {
    init_tracing();

    let collaborators = Collaborators {
        media: Arc::new(MockMediaSource::new()),
        transports: Arc::new(MockTransportFactory::new()),
        channel: Arc::new(MockChannel::new()),
    };
    let Err(NegotiationError::InvalidRoomId(err)) =
        Negotiator::new(CallConfig::new(Role::Responder, "000.000.000-00"), collaborators)
    else {
        panic!("expected an invalid room");
    };
    assert_eq!(err, RoomIdError::InvalidSecret("000.000.000-00".into()));
}

#[tokio::test]
async fn test_media_denied_leaves_no_partial_state() {
    init_tracing();

    let mut h = Harness::with(
        Role::Responder,
        MockMediaSource::denied("permission denied"),
        MockTransportFactory::new(),
        MockChannel::new(),
    );

    let err = h.negotiator.join().await.unwrap_err();
    let NegotiationError::MediaAccess(access) = &err else {
        panic!("expected a media access error, got {err:?}");
    };
    assert_eq!(access.reason, "permission denied");

    assert_eq!(h.negotiator.connection_state(), ConnectionState::Idle);
    assert_eq!(h.negotiator.state().local_stream, None);
    assert_eq!(h.transports.created().await, 0);
    assert_eq!(h.channel.call_count().await, 0);
    assert!(h.drain_events().is_empty());
}

#[tokio::test]
async fn test_transport_failure_releases_media() {
    init_tracing();

    let mut h = Harness::with(
        Role::Initiator,
        MockMediaSource::new(),
        MockTransportFactory::failing_create(),
        MockChannel::new(),
    );

    let err = h.negotiator.join().await.unwrap_err();
    assert!(matches!(err, NegotiationError::Transport(_)));
    assert!(h.media.all_stopped().await);
    assert_eq!(h.negotiator.connection_state(), ConnectionState::Idle);

    // The room was entered first, so it is left again without a Join.
    assert_eq!(
        h.channel.calls().await,
        vec![ChannelCall::Subscribe(room()), ChannelCall::Unsubscribe(room())]
    );
}

#[tokio::test]
async fn test_track_attach_failure_closes_transport() {
    init_tracing();

    let mut h = Harness::with(
        Role::Initiator,
        MockMediaSource::new(),
        MockTransportFactory::failing_tracks(),
        MockChannel::new(),
    );

    let err = h.negotiator.join().await.unwrap_err();
    assert!(matches!(err, NegotiationError::Transport(_)));
    assert!(h.transport().await.is_closed().await);
    assert!(h.media.all_stopped().await);
    assert!(h.channel.sent().await.is_empty());
    assert!(h.channel.is_unsubscribed().await);
}

#[tokio::test]
async fn test_subscribe_failure_unwinds_join() {
    init_tracing();

    let mut h = Harness::with(
        Role::Responder,
        MockMediaSource::new(),
        MockTransportFactory::new(),
        MockChannel::failing_subscribe(),
    );

    let err = h.negotiator.join().await.unwrap_err();
    assert!(matches!(err, NegotiationError::Channel(_)));
    assert_eq!(h.negotiator.connection_state(), ConnectionState::Idle);
    assert_eq!(h.transports.created().await, 0);
    assert!(h.media.all_stopped().await);

    // Only the failed subscribe, no Join and no unsubscribe.
    assert_eq!(h.channel.calls().await, vec![ChannelCall::Subscribe(room())]);
}

#[tokio::test]
async fn test_full_room_is_reported_as_refusal() {
    init_tracing();

    let mut h = Harness::with(
        Role::Responder,
        MockMediaSource::new(),
        MockTransportFactory::new(),
        MockChannel::refusing_subscribe(ChannelRefusal::RoomFull),
    );

    let err = h.negotiator.join().await.unwrap_err();
    assert!(
        matches!(err, NegotiationError::Refused(ChannelRefusal::RoomFull)),
        "got {err:?}"
    );
    assert_eq!(err.to_string(), "refused by the signaling channel: room is full");
    assert_eq!(h.negotiator.connection_state(), ConnectionState::Idle);
    assert_eq!(h.transports.created().await, 0);
    assert!(h.media.all_stopped().await);
}

#[tokio::test]
async fn test_channel_ice_servers_reach_the_transport() {
    init_tracing();

    let turn = IceServerConfig {
        urls: vec!["turn:turn.example.org:3478".into()],
        username: Some("clinic".into()),
        credential: Some("secret".into()),
    };
    let mut h = Harness::with(
        Role::Initiator,
        MockMediaSource::new(),
        MockTransportFactory::new(),
        MockChannel::advertising(vec![turn.clone()]),
    );
    h.negotiator.join().await.expect("join succeeds");

    assert_eq!(h.transports.advertised().await, vec![Some(vec![turn])]);
}

#[tokio::test]
async fn test_silent_channel_leaves_ice_servers_to_the_factory() {
    init_tracing();

    let h = Harness::joined(Role::Responder).await;
    assert_eq!(h.transports.advertised().await, vec![None]);
}
