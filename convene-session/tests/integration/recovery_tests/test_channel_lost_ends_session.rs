use convene_session::{SessionError, SessionEvent, SignalingStatus};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, collect_until, wait_until};

#[tokio::test(start_paused = true)]
async fn test_channel_lost_ends_session() {
    init_tracing();

    let room = TestRoom::new("R12");
    let mut a = room.join("a").await;
    wait_until(|| room.relay.hub().is_connected(&room.room_id, &a.user_id)).await;

    room.relay.set_online(false);
    assert!(room.relay.disconnect(&room.room_id, &a.user_id));

    let events = collect_until(&mut a.session, |e| matches!(e, SessionEvent::SessionEnded)).await;
    assert!(events.contains(&SessionEvent::SignalingDisconnected));
    assert!(events.contains(&SessionEvent::SessionError(SessionError::ChannelLost {
        attempts: 6
    })));

    wait_until(|| !a.session.is_active()).await;
    assert_eq!(
        a.session.set_audio_enabled(false).await,
        Err(SessionError::SessionClosed)
    );
    assert_eq!(
        a.session.start_screen_share().await,
        Err(SessionError::SessionClosed)
    );
    assert_eq!(a.session.status().signaling, SignalingStatus::Lost);
    assert!(a.session.leave_session().await.is_ok());

    // Local media was given back when the session ended.
    assert_eq!(a.devices.released().len(), 2);
}
