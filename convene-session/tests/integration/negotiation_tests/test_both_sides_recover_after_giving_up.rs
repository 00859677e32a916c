use convene_session::{ConnectionState, SessionError, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_event, wait_for_link_state};

fn is_unreachable(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::SessionError(SessionError::PeerUnreachable(_)))
}

#[tokio::test(start_paused = true)]
async fn test_both_sides_recover_after_giving_up() {
    init_tracing();

    let room = TestRoom::new("R16");
    room.factory.set_unreachable("a", true);
    room.factory.set_unreachable("b", true);

    let mut a = room.join("a").await;
    let mut b = room.join("b").await;

    wait_for_event(&mut a.session, is_unreachable).await;
    wait_for_event(&mut b.session, is_unreachable).await;
    wait_for_link_state(&a.session, "b", ConnectionState::Closed).await;
    wait_for_link_state(&b.session, "a", ConnectionState::Closed).await;

    room.factory.set_unreachable("a", false);
    room.factory.set_unreachable("b", false);

    // Only the initiator asks; the responder rebuilds its side when the new offer lands.
    assert!(a.session.reconnect_peer(&b.user_id).await.unwrap());
    wait_for_link_state(&a.session, "b", ConnectionState::Connected).await;
    wait_for_link_state(&b.session, "a", ConnectionState::Connected).await;

    assert_eq!(room.factory.created_between("a", "b"), 2);
    assert!(room.factory.created_between("b", "a") >= 2);
    assert_eq!(b.session.peer_links().len(), 1);

    a.session.leave_session().await.unwrap();
    b.session.leave_session().await.unwrap();
}
