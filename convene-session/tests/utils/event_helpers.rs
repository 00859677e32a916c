use convene_core::UserId;
use convene_session::{ConnectionState, SessionEvent, SessionHandle};
use std::time::Duration;

const WAIT_LIMIT: Duration = Duration::from_secs(60);

/// Reads events until one matches, returning the match. Panics after `WAIT_LIMIT`.
pub async fn wait_for_event<F>(session: &mut SessionHandle, mut predicate: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    let waited = tokio::time::timeout(WAIT_LIMIT, async {
        while let Some(event) = session.next_event().await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    })
    .await;

    match waited {
        Ok(Some(event)) => event,
        Ok(None) => panic!("Event stream ended before the expected event"),
        Err(_) => panic!("Timed out waiting for event"),
    }
}

/// Collects events until `predicate` matches, returning everything read including the match.
pub async fn collect_until<F>(session: &mut SessionHandle, mut predicate: F) -> Vec<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let mut seen = Vec::new();
    wait_for_event(session, |event| {
        seen.push(event.clone());
        predicate(event)
    })
    .await;
    seen
}

/// Polls `condition` until it holds. Panics after `WAIT_LIMIT`.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(WAIT_LIMIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "Timed out waiting for condition");
}

pub async fn wait_for_link_state(session: &SessionHandle, peer: &str, state: ConnectionState) {
    let peer = UserId::from(peer);
    wait_until(|| session.peer_link(&peer).map(|link| link.state) == Some(state)).await;
}

pub async fn wait_all_connected(session: &SessionHandle, peers: usize) {
    wait_until(|| {
        let status = session.status();
        status.peer_count == peers && status.connected_peers == peers
    })
    .await;
}
