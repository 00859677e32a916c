use convene_core::UserId;
use convene_session::SessionEvent;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_all_connected, wait_for_event};

#[tokio::test(start_paused = true)]
async fn test_two_participants_connect_and_leave() {
    init_tracing();

    let room = TestRoom::new("R1");
    let a = room.join("a").await;
    let mut b = room.join("b").await;

    wait_all_connected(&a.session, 1).await;
    wait_all_connected(&b.session, 1).await;
    assert_eq!(b.session.peer_links().len(), 1);

    a.session.leave_session().await.unwrap();

    let left = wait_for_event(&mut b.session, |e| {
        matches!(e, SessionEvent::ParticipantLeft(_))
    })
    .await;
    assert_eq!(left, SessionEvent::ParticipantLeft(UserId::from("a")));
    assert!(b.session.peer_links().is_empty());
    assert_eq!(b.session.status().peer_count, 0);

    b.session.leave_session().await.unwrap();
}
