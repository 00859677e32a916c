use convene_session::{SessionEvent, SignalingStatus};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, collect_until, wait_all_connected, wait_for_event};

fn is_presence(event: &SessionEvent) -> bool {
    matches!(
        event,
        SessionEvent::ParticipantJoined(_) | SessionEvent::ParticipantLeft(_)
    )
}

#[tokio::test(start_paused = true)]
async fn test_signaling_outage_keeps_roster() {
    init_tracing();

    let room = TestRoom::new("R4");
    let mut a = room.join("a").await;
    let mut b = room.join("b").await;

    wait_all_connected(&a.session, 1).await;
    wait_all_connected(&b.session, 1).await;
    while a.session.try_next_event().is_some() {}
    while b.session.try_next_event().is_some() {}

    room.relay.set_online(false);
    assert!(room.relay.disconnect(&room.room_id, &a.user_id));

    wait_for_event(&mut a.session, |e| {
        matches!(e, SessionEvent::SignalingDisconnected)
    })
    .await;
    assert_eq!(a.session.status().signaling, SignalingStatus::Reconnecting);

    tokio::time::sleep(Duration::from_secs(5)).await;
    room.relay.set_online(true);

    let during = collect_until(&mut a.session, |e| {
        matches!(e, SessionEvent::SignalingReconnected)
    })
    .await;
    assert!(!during.iter().any(is_presence));

    // Let the fresh roster arrive and settle.
    tokio::time::sleep(Duration::from_secs(2)).await;

    while let Some(event) = a.session.try_next_event() {
        assert!(!is_presence(&event), "spurious {:?} for a", event);
    }
    while let Some(event) = b.session.try_next_event() {
        assert!(!is_presence(&event), "spurious {:?} for b", event);
    }

    assert_eq!(a.session.status().signaling, SignalingStatus::Connected);
    assert_eq!(a.session.peer_links().len(), 1);
    assert_eq!(room.factory.created_between("a", "b"), 1);
    assert_eq!(room.relay.hub().members(&room.room_id).len(), 2);

    a.session.leave_session().await.unwrap();
    b.session.leave_session().await.unwrap();
}
