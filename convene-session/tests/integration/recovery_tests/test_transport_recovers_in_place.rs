use convene_session::{ConnectionState, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, collect_until, wait_all_connected, wait_for_link_state};

#[tokio::test(start_paused = true)]
async fn test_transport_recovers_in_place() {
    init_tracing();

    let room = TestRoom::new("R10");
    let mut a = room.join("a").await;
    let b = room.join("b").await;

    wait_all_connected(&a.session, 1).await;
    wait_all_connected(&b.session, 1).await;

    let transport = room.factory.transport("a", "b").unwrap();
    transport.disconnect().await;
    wait_for_link_state(&a.session, "b", ConnectionState::Reconnecting).await;

    transport.recover().await;
    wait_for_link_state(&a.session, "b", ConnectionState::Connected).await;

    let events = collect_until(&mut a.session, |e| {
        matches!(
            e,
            SessionEvent::ConnectionStateChanged {
                state: ConnectionState::Reconnecting,
                ..
            }
        )
    })
    .await;
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::ParticipantLeft(_))));

    assert_eq!(room.factory.created_between("a", "b"), 1);
    assert_eq!(a.session.peer_link(&b.user_id).unwrap().restart_attempts, 0);

    a.session.leave_session().await.unwrap();
    b.session.leave_session().await.unwrap();
}
