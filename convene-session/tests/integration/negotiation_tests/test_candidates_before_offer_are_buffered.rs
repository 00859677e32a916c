use convene_core::{
    Envelope, IceCandidate, NegotiationId, Participant, SignalBody, SignalingTransport, UserId,
};
use uuid::Uuid;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_until};

fn candidate(port: u16) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{} 1 udp 2130706431 10.0.0.1 {} typ host", port, port),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    }
}

#[tokio::test]
async fn test_candidates_before_offer_are_buffered() {
    init_tracing();

    let room = TestRoom::new("R5");
    let b = room.join("b").await;

    // "a" sorts first and therefore initiates; it is driven by hand here.
    let a = Participant::new("a", "A");
    let mut fake = room.relay.connect(&room.room_id, &a).await.unwrap();
    fake.outbound
        .send(Envelope::broadcast(
            room.room_id.clone(),
            a.user_id.clone(),
            SignalBody::Join {
                participant: a.clone(),
            },
        ))
        .unwrap();
    let roster = fake.inbound.recv().await.unwrap();
    assert_eq!(roster.body.kind(), "roster");

    let negotiation = NegotiationId::first(Uuid::new_v4());
    let direct = |body: SignalBody| {
        Envelope::direct(room.room_id.clone(), a.user_id.clone(), UserId::from("b"), body)
    };
    let offer = SignalBody::Offer {
        sdp: "offer a -> b".into(),
        negotiation,
    };

    let early = vec![candidate(50001), candidate(50002)];
    for c in &early {
        fake.outbound
            .send(direct(SignalBody::IceCandidate {
                candidate: c.clone(),
                negotiation,
            }))
            .unwrap();
    }
    fake.outbound.send(direct(offer.clone())).unwrap();

    let answered = loop {
        let envelope = fake.inbound.recv().await.unwrap();
        if let SignalBody::Answer { negotiation, .. } = envelope.body {
            break negotiation;
        }
    };
    assert_eq!(answered, negotiation);

    let transport = room.factory.transport("b", "a").unwrap();
    wait_until(|| transport.applied_candidates().len() == 2).await;
    assert_eq!(transport.applied_candidates(), early);
    assert!(!transport.applied_early());

    // A replayed offer is ignored; a later candidate goes straight to the transport.
    fake.outbound.send(direct(offer)).unwrap();
    fake.outbound
        .send(direct(SignalBody::IceCandidate {
            candidate: candidate(50003),
            negotiation,
        }))
        .unwrap();
    wait_until(|| transport.applied_candidates().len() == 3).await;
    assert_eq!(transport.answers(), 1);
    assert_eq!(room.factory.created_between("b", "a"), 1);

    b.session.leave_session().await.unwrap();
}
