use convene_session::{ConnectionState, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_all_connected, wait_until};

#[tokio::test(start_paused = true)]
async fn test_screen_share_round_trip() {
    init_tracing();

    let room = TestRoom::new("R7");
    let mut a = room.join("a").await;
    let b = room.join("b").await;

    wait_all_connected(&a.session, 1).await;
    wait_all_connected(&b.session, 1).await;
    while a.session.try_next_event().is_some() {}

    let outgoing = |session: &convene_session::SessionHandle| {
        session
            .peer_link(&b.user_id)
            .and_then(|link| link.outgoing_video)
    };
    let camera = outgoing(&a.session).unwrap();
    assert!(camera.starts_with("cam-"));

    let transport = room.factory.transport("a", "b").unwrap();
    let offers = transport.offers();

    a.session.start_screen_share().await.unwrap();
    wait_until(|| outgoing(&a.session).is_some_and(|id| id.starts_with("screen-"))).await;
    assert!(a.session.media_state().screen_sharing);
    assert!(transport.video_track().unwrap().starts_with("screen-"));
    assert_eq!(
        a.session.peer_link(&b.user_id).unwrap().state,
        ConnectionState::Connected
    );

    wait_until(|| {
        b.session
            .peer_link(&a.user_id)
            .and_then(|link| link.last_remote_media)
            .is_some_and(|media| media.screen_sharing)
    })
    .await;

    a.session.stop_screen_share().await.unwrap();
    wait_until(|| outgoing(&a.session) == Some(camera.clone())).await;
    assert!(!a.session.media_state().screen_sharing);
    assert_eq!(transport.video_track(), Some(camera.clone()));
    assert!(a.devices.released().iter().any(|id| id.starts_with("screen-")));

    // The swap never renegotiated nor dropped the link.
    assert_eq!(transport.offers(), offers);
    assert_eq!(
        a.session.peer_link(&b.user_id).unwrap().state,
        ConnectionState::Connected
    );
    while let Some(event) = a.session.try_next_event() {
        assert!(
            !matches!(event, SessionEvent::ConnectionStateChanged { .. }),
            "unexpected {:?}",
            event
        );
    }

    a.session.leave_session().await.unwrap();
    b.session.leave_session().await.unwrap();
}
