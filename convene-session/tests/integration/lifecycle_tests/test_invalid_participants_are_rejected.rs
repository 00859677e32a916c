use convene_core::{Participant, RELAY_USER_ID};
use convene_session::{SampleTrackDevices, SessionError};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::TestRoom;

#[tokio::test]
async fn test_invalid_participants_are_rejected() {
    init_tracing();

    let room = TestRoom::new("R14");
    let devices = Arc::new(SampleTrackDevices::new());
    let coordinator = room.coordinator(devices.clone());

    let empty = coordinator
        .join_session(room.room_id.clone(), Participant::new("", "Nobody"))
        .await;
    assert!(matches!(empty, Err(SessionError::InvalidParticipant(_))));

    let relay = coordinator
        .join_session(room.room_id.clone(), Participant::new(RELAY_USER_ID, "Relay"))
        .await;
    assert!(matches!(relay, Err(SessionError::InvalidParticipant(_))));

    // Rejected before any device was touched or the relay contacted.
    assert!(devices.released().is_empty());
    assert_eq!(room.relay.hub().room_count(), 0);
}
