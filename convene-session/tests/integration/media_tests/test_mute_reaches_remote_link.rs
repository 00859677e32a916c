use convene_core::MediaState;
use convene_session::SessionEvent;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_all_connected, wait_for_event, wait_until};

#[tokio::test(start_paused = true)]
async fn test_mute_reaches_remote_link() {
    init_tracing();

    let room = TestRoom::new("R2");
    let a = room.join("a").await;
    let mut b = room.join("b").await;

    wait_all_connected(&a.session, 1).await;
    wait_all_connected(&b.session, 1).await;

    a.session.set_audio_enabled(false).await.unwrap();
    assert!(!a.session.media_state().audio_enabled);

    let muted = MediaState {
        audio_enabled: false,
        video_enabled: true,
        screen_sharing: false,
    };
    let event = wait_for_event(&mut b.session, |e| {
        matches!(e, SessionEvent::RemoteMediaChanged { state, .. } if !state.audio_enabled)
    })
    .await;
    assert_eq!(
        event,
        SessionEvent::RemoteMediaChanged {
            user_id: a.user_id.clone(),
            state: muted,
        }
    );

    wait_until(|| {
        b.session
            .peer_link(&a.user_id)
            .and_then(|link| link.last_remote_media)
            == Some(muted)
    })
    .await;

    // Muting does not touch the connection.
    assert_eq!(room.factory.transport("a", "b").unwrap().offers(), 1);

    a.session.leave_session().await.unwrap();
    b.session.leave_session().await.unwrap();
}
