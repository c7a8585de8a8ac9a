//! End-to-end behaviour of the coordinator across join, relay, and leave.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use duet_common::{ConnectionId, RoomId};
use serde_json::{json, Value};

use super::*;
use crate::error::JoinError;
use crate::playback::{PlaybackControl, PlaybackSnapshot};
use crate::relay::RelayEvent;

/// Clock that only moves when told to.
fn manual_clock(start_ms: i64) -> (Clock, Arc<AtomicI64>) {
    let now = Arc::new(AtomicI64::new(start_ms));
    let handle = now.clone();
    let clock: Clock = Arc::new(move || {
        Utc.timestamp_millis_opt(handle.load(Ordering::SeqCst))
            .single()
            .unwrap_or_else(Utc::now)
    });
    (clock, now)
}

fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

fn conn(id: &str) -> ConnectionId {
    ConnectionId::from(id)
}

fn join_event(room: &str, name: &str) -> ClientEvent {
    serde_json::from_value(json!({
        "type": "join-room",
        "roomId": room,
        "userName": name,
        "avatar": format!("{name}-avatar"),
    }))
    .unwrap()
}

fn to<'a>(out: &'a [Delivery], who: &ConnectionId) -> Vec<&'a ServerEvent> {
    out.iter().filter(|d| &d.to == who).map(|d| &d.event).collect()
}

fn control(track_index: u32, playing: bool, position: f64) -> RelayEvent {
    RelayEvent::Playback(PlaybackControl {
        track_index,
        playing,
        position,
    })
}

#[tokio::test]
async fn two_joins_fill_room_with_partner_identities() {
    let coord = Coordinator::new(RoomPolicy::default());
    let (x, y) = (conn("x"), conn("y"));

    coord.dispatch(&x, "1.1.1.1", join_event("fresh", "Alice")).await;
    let out = coord.dispatch(&y, "2.2.2.2", join_event("fresh", "Bob")).await;

    assert_eq!(
        coord.room_members(&RoomId::from("fresh")).await,
        Some(vec![x.clone(), y.clone()])
    );
    assert_eq!(
        to(&out, &x),
        vec![&ServerEvent::PartnerJoined {
            name: "Bob".into(),
            avatar: "Bob-avatar".into(),
            user_count: 2
        }]
    );
    assert!(to(&out, &y).contains(&&ServerEvent::PartnerAlreadyHere {
        name: "Alice".into(),
        avatar: "Alice-avatar".into()
    }));
}

#[tokio::test]
async fn third_join_is_room_full_and_membership_unchanged() {
    let coord = Coordinator::new(RoomPolicy::default());
    let (x, y, z) = (conn("x"), conn("y"), conn("z"));
    coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
    coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;

    let out = coord.dispatch(&z, "3.3.3.3", join_event("abcd", "Carol")).await;

    assert_eq!(out, vec![Delivery::new(z.clone(), ServerEvent::RoomFull)]);
    assert_eq!(
        coord.room_members(&RoomId::from("abcd")).await,
        Some(vec![x, y])
    );
    assert!(coord.session(&z).await.is_none());
}

#[tokio::test]
async fn duplicate_origin_rejected_when_deduping() {
    let coord = Coordinator::new(RoomPolicy {
        dedupe_origins: true,
        ..RoomPolicy::default()
    });
    let (x, y) = (conn("x"), conn("y"));
    coord.dispatch(&x, "10.0.0.7", join_event("abcd", "Alice")).await;

    let out = coord.dispatch(&y, "10.0.0.7", join_event("abcd", "Mallory")).await;

    assert_eq!(
        out,
        vec![Delivery::new(y.clone(), ServerEvent::OriginAlreadyConnected)]
    );
    assert_eq!(coord.room_members(&RoomId::from("abcd")).await, Some(vec![x]));
    assert!(coord.session(&y).await.is_none());
}

#[tokio::test]
async fn origin_check_precedes_capacity_check() {
    let coord = Coordinator::new(RoomPolicy {
        dedupe_origins: true,
        ..RoomPolicy::default()
    });
    coord.dispatch(&conn("x"), "1.1.1.1", join_event("abcd", "Alice")).await;
    coord.dispatch(&conn("y"), "2.2.2.2", join_event("abcd", "Bob")).await;

    let request = JoinRequest {
        room_id: RoomId::from("abcd"),
        display_name: "Eve".into(),
        avatar: String::new(),
        origin: "1.1.1.1".into(),
    };
    let err = coord.join(&conn("z"), request).await.unwrap_err();
    assert_eq!(err, JoinError::OriginAlreadyPresent);
}

#[tokio::test]
async fn room_absent_after_both_leave_in_either_order() {
    for first_out in ["x", "y"] {
        let coord = Coordinator::new(RoomPolicy::default());
        let (x, y) = (conn("x"), conn("y"));
        coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
        coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;

        let (a, b) = if first_out == "x" { (&x, &y) } else { (&y, &x) };
        coord.leave(a).await;
        coord.leave(b).await;

        assert!(coord.room_members(&RoomId::from("abcd")).await.is_none());
        assert_eq!(coord.stats().await, CoordinatorStats { rooms: 0, sessions: 0 });

        // Playback control from a departed member is dropped silently.
        let out = coord
            .dispatch(
                &x,
                "1.1.1.1",
                serde_json::from_value(json!({
                    "type": "music-control", "trackIndex": 1, "playing": true, "position": 3.0
                }))
                .unwrap(),
            )
            .await;
        assert!(out.is_empty());
        assert!(coord.playback(&RoomId::from("abcd")).await.is_none());
    }
}

#[tokio::test]
async fn playback_is_last_writer_wins() {
    let (clock, now) = manual_clock(1_000_000);
    let coord = Coordinator::with_clock(RoomPolicy::default(), clock);
    let (x, y) = (conn("x"), conn("y"));
    coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
    coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;

    now.store(1_005_000, Ordering::SeqCst);
    coord.relay(&x, control(2, true, 30.0)).await.unwrap();
    now.store(1_009_000, Ordering::SeqCst);
    let out = coord.relay(&y, control(5, false, 12.5)).await.unwrap();

    let state = coord.playback(&RoomId::from("abcd")).await.unwrap();
    assert_eq!(state.track_index, 5);
    assert!(!state.playing);
    assert_eq!(state.position, 12.5);
    assert_eq!(state.last_updated, at(1_009_000));

    // Live updates carry no elapsed time.
    assert_eq!(
        out,
        vec![Delivery::new(
            x,
            ServerEvent::MusicSync(PlaybackSnapshot {
                track_index: 5,
                playing: false,
                position: 12.5,
                last_updated: 1_009_000,
                elapsed: None,
            })
        )]
    );
}

#[tokio::test]
async fn joiner_receives_elapsed_since_last_update() {
    let (clock, now) = manual_clock(2_000_000);
    let coord = Coordinator::with_clock(RoomPolicy::default(), clock);
    let (x, y) = (conn("x"), conn("y"));
    coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
    coord.relay(&x, control(1, true, 10.0)).await.unwrap();

    now.store(2_007_500, Ordering::SeqCst);
    let out = coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;

    match to(&out, &y)[0] {
        ServerEvent::JoinedRoom { music_state, .. } => {
            assert_eq!(music_state.track_index, 1);
            assert!(music_state.playing);
            assert_eq!(music_state.position, 10.0);
            assert_eq!(music_state.elapsed, Some(7.5));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn relay_never_echoes_to_sender() {
    let coord = Coordinator::new(RoomPolicy::default());
    let (x, y) = (conn("x"), conn("y"));
    coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
    coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;

    let out = coord
        .dispatch(
            &x,
            "1.1.1.1",
            serde_json::from_value(json!({"type": "send-message", "message": "hi", "msgId": "m1"}))
                .unwrap(),
        )
        .await;

    assert_eq!(to(&out, &y).len(), 1);
    assert!(to(&out, &x).is_empty());
}

#[tokio::test]
async fn alice_and_bob_scenario() {
    let coord = Coordinator::new(RoomPolicy::default());
    let (x, y) = (conn("x"), conn("y"));
    let room = RoomId::from("abcd");

    // X joins alone.
    let out = coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
    assert!(matches!(
        to(&out, &x)[..],
        [ServerEvent::JoinedRoom { is_alone: true, user_count: 1, .. }]
    ));

    // Y joins and learns about Alice; X learns about Bob.
    let out = coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;
    let for_y = to(&out, &y);
    assert_eq!(for_y.len(), 2);
    match for_y[0] {
        ServerEvent::JoinedRoom {
            is_alone,
            music_state,
            ..
        } => {
            assert!(!is_alone);
            let json = serde_json::to_value(music_state).unwrap();
            assert_eq!(json["trackIndex"], 0);
            assert_eq!(json["playing"], false);
            assert_eq!(json["position"], 0.0);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        for_y[1],
        ServerEvent::PartnerAlreadyHere { name, .. } if name == "Alice"
    ));
    assert!(matches!(
        to(&out, &x)[..],
        [ServerEvent::PartnerJoined { name, user_count: 2, .. }] if name == "Bob"
    ));

    // X says hi.
    let out = coord
        .dispatch(
            &x,
            "1.1.1.1",
            serde_json::from_value(json!({
                "type": "send-message", "message": "hi", "timestamp": "20:14", "msgId": "m1"
            }))
            .unwrap(),
        )
        .await;
    assert_eq!(
        out,
        vec![Delivery::new(
            y.clone(),
            ServerEvent::ReceiveMessage {
                from: "Alice".into(),
                avatar: "Alice-avatar".into(),
                message: "hi".into(),
                timestamp: Value::from("20:14"),
                msg_id: "m1".into(),
                socket_id: x.clone(),
            }
        )]
    );

    // Y disconnects.
    let out = coord.leave(&y).await;
    assert!(to(&out, &x).contains(&&ServerEvent::PartnerLeft { name: "Bob".into() }));
    assert_eq!(coord.room_members(&room).await.map(|m| m.len()), Some(1));

    // X disconnects; the room is gone.
    coord.leave(&x).await;
    assert!(coord.room_members(&room).await.is_none());
}

#[tokio::test]
async fn explicit_leaving_event_departs() {
    let coord = Coordinator::new(RoomPolicy::default());
    let (x, y) = (conn("x"), conn("y"));
    coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
    coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;

    let out = coord
        .dispatch(&y, "2.2.2.2", serde_json::from_value(json!({"type": "leaving"})).unwrap())
        .await;
    assert_eq!(to(&out, &x)[0], &ServerEvent::PartnerLeft { name: "Bob".into() });
    assert!(coord.session(&y).await.is_none());
}

#[tokio::test]
async fn create_room_allocates_id_without_state() {
    let coord = Coordinator::new(RoomPolicy::default());
    let x = conn("x");
    let out = coord
        .dispatch(&x, "1.1.1.1", serde_json::from_value(json!({"type": "create-room"})).unwrap())
        .await;

    match &out[..] {
        [Delivery {
            to,
            event: ServerEvent::RoomCreated { room_id, link },
        }] => {
            assert_eq!(to, &x);
            assert_eq!(room_id.len(), 16);
            assert_eq!(link, &format!("/room/{room_id}"));
        }
        other => panic!("unexpected deliveries: {other:?}"),
    }
    assert_eq!(coord.stats().await.rooms, 0);
}

#[tokio::test]
async fn oversized_message_returns_error_to_sender_only() {
    let coord = Coordinator::new(RoomPolicy {
        limits: PayloadLimits {
            max_message_len: 4,
            ..PayloadLimits::default()
        },
        ..RoomPolicy::default()
    });
    let (x, y) = (conn("x"), conn("y"));
    coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await;
    coord.dispatch(&y, "2.2.2.2", join_event("abcd", "Bob")).await;

    let out = coord
        .dispatch(
            &x,
            "1.1.1.1",
            serde_json::from_value(json!({"type": "send-message", "message": "hello", "msgId": "m1"}))
                .unwrap(),
        )
        .await;
    assert!(matches!(&out[..], [Delivery { to, event: ServerEvent::Error { .. } }] if to == &x));
}

#[tokio::test]
async fn concurrent_joins_admit_exactly_two() {
    let coord = Coordinator::new(RoomPolicy::default());
    let mut tasks = Vec::new();
    for i in 0..16 {
        let coord = coord.clone();
        tasks.push(tokio::spawn(async move {
            let id = conn(&format!("c{i}"));
            let out = coord
                .dispatch(&id, &format!("10.0.0.{i}"), join_event("race", "Racer"))
                .await;
            matches!(out.first(), Some(Delivery { event: ServerEvent::JoinedRoom { .. }, .. }))
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 2);
    assert_eq!(
        coord.room_members(&RoomId::from("race")).await.map(|m| m.len()),
        Some(2)
    );
    assert_eq!(coord.stats().await.sessions, 2);
}

#[tokio::test]
async fn churn_never_leaves_empty_rooms() {
    let coord = Coordinator::new(RoomPolicy::default());
    let mut tasks = Vec::new();
    for i in 0..32 {
        let coord = coord.clone();
        tasks.push(tokio::spawn(async move {
            let id = conn(&format!("c{i}"));
            let room = format!("room{}", i % 4);
            coord.dispatch(&id, "10.0.0.1", join_event(&room, "Churn")).await;
            tokio::task::yield_now().await;
            coord.leave(&id).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(coord.stats().await, CoordinatorStats { rooms: 0, sessions: 0 });
}

#[tokio::test]
async fn unrelated_rooms_are_independent() {
    let coord = Coordinator::new(RoomPolicy::default());
    coord.dispatch(&conn("a1"), "1.1.1.1", join_event("one", "A1")).await;
    coord.dispatch(&conn("a2"), "1.1.1.2", join_event("one", "A2")).await;
    let out = coord.dispatch(&conn("b1"), "2.2.2.1", join_event("two", "B1")).await;

    assert!(matches!(
        to(&out, &conn("b1"))[..],
        [ServerEvent::JoinedRoom { is_alone: true, .. }]
    ));
    assert_eq!(coord.stats().await, CoordinatorStats { rooms: 2, sessions: 3 });
}

#[tokio::test]
async fn queued_double_join_admits_once() {
    let coord = Coordinator::new(RoomPolicy::default());
    let x = conn("x");
    let handle = coord
        .directory
        .get_or_create(&RoomId::from("abcd"), coord.now())
        .await;
    let guard = handle.lock().await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let coord = coord.clone();
        let x = x.clone();
        tasks.push(tokio::spawn(async move {
            coord.dispatch(&x, "1.1.1.1", join_event("abcd", "Alice")).await
        }));
    }
    // Both joins get past the registry lookup and wait on the room.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    drop(guard);

    let mut joined = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap().as_slice() {
            [Delivery { event: ServerEvent::JoinedRoom { user_count: 1, .. }, .. }] => joined += 1,
            [Delivery { event: ServerEvent::Error { .. }, .. }] => rejected += 1,
            other => panic!("unexpected deliveries: {other:?}"),
        }
    }
    assert_eq!((joined, rejected), (1, 1));
    assert_eq!(coord.room_members(&RoomId::from("abcd")).await, Some(vec![x.clone()]));

    coord.leave(&x).await;
    assert_eq!(coord.room_members(&RoomId::from("abcd")).await, None);
    assert_eq!(coord.stats().await, CoordinatorStats { rooms: 0, sessions: 0 });
}

#[tokio::test]
async fn queued_joins_into_two_rooms_claim_one_session() {
    let coord = Coordinator::new(RoomPolicy::default());
    let x = conn("x");
    let first = coord
        .directory
        .get_or_create(&RoomId::from("one"), coord.now())
        .await;
    let second = coord
        .directory
        .get_or_create(&RoomId::from("two"), coord.now())
        .await;
    let first_guard = first.lock().await;
    let second_guard = second.lock().await;

    let spawn_join = |room: &'static str| {
        let coord = coord.clone();
        let x = x.clone();
        tokio::spawn(async move { coord.dispatch(&x, "1.1.1.1", join_event(room, "Alice")).await })
    };
    let into_one = spawn_join("one");
    let into_two = spawn_join("two");
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    drop(second_guard);
    let out = into_two.await.unwrap();
    assert!(matches!(out[..], [Delivery { event: ServerEvent::JoinedRoom { .. }, .. }]));

    drop(first_guard);
    let out = into_one.await.unwrap();
    assert!(matches!(out[..], [Delivery { event: ServerEvent::Error { .. }, .. }]));

    assert_eq!(coord.room_members(&RoomId::from("one")).await, None);
    assert_eq!(coord.room_members(&RoomId::from("two")).await, Some(vec![x.clone()]));
    assert_eq!(coord.session(&x).await.map(|s| s.room_id), Some(RoomId::from("two")));
}
