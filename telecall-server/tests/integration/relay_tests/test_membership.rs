use telecall_core::{RelayNotice, Role, SignalMessage, SignalPayload};

use crate::integration::init_tracing;
use crate::utils::{
    connect, connect_welcomed, is_closed, next_text, room, send_signal, spawn_relay,
    stays_silent,
};

#[tokio::test]
async fn test_second_claimant_of_a_role_is_refused() {
    init_tracing();

    let (addr, service) = spawn_relay().await;
    let (mut a, _) = connect_welcomed(addr, room().as_str()).await;
    let (mut b, _) = connect_welcomed(addr, room().as_str()).await;

    send_signal(&mut a, &SignalMessage::join(Role::Initiator, room())).await;
    assert!(next_text(&mut b).await.is_some());

    send_signal(&mut b, &SignalMessage::join(Role::Initiator, room())).await;
    let text = next_text(&mut b).await.expect("no refusal notice");
    assert_eq!(
        serde_json::from_str::<RelayNotice>(&text).unwrap(),
        RelayNotice::RoleTaken {
            role: Role::Initiator
        }
    );
    assert!(is_closed(&mut b).await);

    // The refused frame never reached the holder, and it keeps its seat.
    assert!(stays_silent(&mut a, 200).await);
    assert_eq!(service.member_count(&room()), 1);

    let (mut c, _) = connect_welcomed(addr, room().as_str()).await;
    let sent = send_signal(&mut c, &SignalMessage::join(Role::Responder, room())).await;
    assert_eq!(next_text(&mut a).await, Some(sent));
}

#[tokio::test]
async fn test_switching_role_is_refused() {
    init_tracing();

    let (addr, _service) = spawn_relay().await;
    let (mut a, _) = connect_welcomed(addr, room().as_str()).await;

    send_signal(&mut a, &SignalMessage::join(Role::Responder, room())).await;
    send_signal(&mut a, &SignalMessage::join(Role::Initiator, room())).await;

    let text = next_text(&mut a).await.expect("no refusal notice");
    assert_eq!(
        serde_json::from_str::<RelayNotice>(&text).unwrap(),
        RelayNotice::RoleSwitch {
            held: Role::Responder,
            claimed: Role::Initiator
        }
    );
    assert!(is_closed(&mut a).await);
}

#[tokio::test]
async fn test_third_connection_gets_room_full() {
    init_tracing();

    let (addr, service) = spawn_relay().await;
    let (_a, _) = connect_welcomed(addr, room().as_str()).await;
    let (_b, _) = connect_welcomed(addr, room().as_str()).await;

    let mut c = connect(addr, room().as_str()).await;
    let text = next_text(&mut c).await.expect("no room-full notice");
    assert_eq!(
        serde_json::from_str::<RelayNotice>(&text).unwrap(),
        RelayNotice::RoomFull
    );
    assert!(is_closed(&mut c).await);
    assert_eq!(service.member_count(&room()), 2);
}

#[tokio::test]
async fn test_dropped_role_holder_produces_leave() {
    init_tracing();

    let (addr, service) = spawn_relay().await;
    let (mut a, _) = connect_welcomed(addr, room().as_str()).await;
    let (mut b, _) = connect_welcomed(addr, room().as_str()).await;

    send_signal(&mut a, &SignalMessage::join(Role::Initiator, room())).await;
    assert!(next_text(&mut b).await.is_some());

    drop(a);

    let text = next_text(&mut b).await.expect("no synthesized leave");
    let leave = SignalMessage::decode(&text).expect("leave should parse");
    assert_eq!(leave.payload, SignalPayload::Leave);
    assert_eq!(leave.sender, Role::Initiator);
    assert_eq!(leave.room_id, room());

    drop(b);
    let mut pruned = false;
    for _ in 0..100 {
        if service.room_count() == 0 {
            pruned = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(pruned, "empty room should be removed");
}

#[tokio::test]
async fn test_silent_peer_leaving_sends_nothing() {
    init_tracing();

    let (addr, _service) = spawn_relay().await;
    let (a, _) = connect_welcomed(addr, room().as_str()).await;
    let (mut b, _) = connect_welcomed(addr, room().as_str()).await;

    drop(a);

    assert!(stays_silent(&mut b, 300).await);
}
