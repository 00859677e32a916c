use convene_core::Participant;
use convene_session::{SampleTrackDevices, SessionError};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::TestRoom;

#[tokio::test(start_paused = true)]
async fn test_relay_unreachable_at_join() {
    init_tracing();

    let room = TestRoom::new("R13");
    room.relay.set_online(false);

    let devices = Arc::new(SampleTrackDevices::new());
    let joined = room
        .coordinator(devices.clone())
        .join_session(room.room_id.clone(), Participant::new("a", "A"))
        .await;

    let Err(err) = joined else {
        panic!("join should fail while the relay is offline");
    };
    assert_eq!(err, SessionError::ChannelLost { attempts: 6 });
    assert!(err.is_fatal());
    assert_eq!(devices.released().len(), 2);
    assert!(room.relay.hub().members(&room.room_id).is_empty());
}
