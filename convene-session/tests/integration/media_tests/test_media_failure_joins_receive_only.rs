use convene_core::MediaState;
use convene_session::{MediaAccessError, SampleTrackDevices, SessionError, SessionEvent};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_all_connected};

#[tokio::test(start_paused = true)]
async fn test_media_failure_joins_receive_only() {
    init_tracing();

    let room = TestRoom::new("R9");
    let devices = Arc::new(SampleTrackDevices::new());
    devices.set_camera_available(false);

    let mut a = room.join_with("a", devices).await;

    let first = a.session.next_event().await.unwrap();
    assert_eq!(
        first,
        SessionEvent::SessionError(SessionError::MediaAccess(MediaAccessError::NotFound(
            "camera".into()
        )))
    );
    assert_eq!(
        a.session.media_state(),
        MediaState {
            audio_enabled: false,
            video_enabled: false,
            screen_sharing: false,
        }
    );

    let b = room.join("b").await;
    wait_all_connected(&a.session, 1).await;
    wait_all_connected(&b.session, 1).await;

    let link = a.session.peer_link(&b.user_id).unwrap();
    assert_eq!(link.outgoing_video, None);

    a.session.leave_session().await.unwrap();
    b.session.leave_session().await.unwrap();
}
