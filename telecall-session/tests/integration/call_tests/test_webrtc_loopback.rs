use std::sync::Arc;
use std::time::Duration;

use telecall_core::Role;
use telecall_session::{
    Call, CallConfig, Collaborators, ConnectionState, MemoryRelay, SilentMediaSource,
    TransportConfig, WebRtcTransportFactory,
};

use crate::integration::init_tracing;
use crate::utils::CPF;

#[tokio::test]
#[ignore = "needs a non-loopback network interface for host candidates"]
async fn test_two_webrtc_peers_connect_in_process() {
    init_tracing();

    let relay = MemoryRelay::new();
    let transports = Arc::new(WebRtcTransportFactory::new(TransportConfig::local_only()));

    let mut handles = Vec::new();
    for role in [Role::Initiator, Role::Responder] {
        let collaborators = Collaborators {
            media: Arc::new(SilentMediaSource),
            transports: transports.clone(),
            channel: Arc::new(relay.endpoint()),
        };
        let (handle, _task) = Call::join(CallConfig::new(role, CPF), collaborators)
            .await
            .expect("join failed");
        handles.push(handle);
    }

    for handle in &handles {
        tokio::time::timeout(
            Duration::from_secs(20),
            handle.wait_for(ConnectionState::Connected),
        )
        .await
        .expect("peers did not connect in time")
        .expect("call ended before connecting");
    }

    handles[0].end_call().await.expect("end call");
    for handle in &handles {
        tokio::time::timeout(
            Duration::from_secs(5),
            handle.wait_for(ConnectionState::Closed),
        )
        .await
        .expect("call did not close in time")
        .expect("state channel closed early");
    }
}
