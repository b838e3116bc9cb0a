//! Call session lifecycle over the in-memory store

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use eresponde_audio_core::{AudioSink, TestAudioSink};
use eresponde_call_core::{
    CallConfig, CallError, CallEvent, CallManager, CallState, ConnectionState, MediaError,
    MediaSource, PeerTransportFactory,
};
use eresponde_call_core::testing::{MockMediaSource, MockTransportFactory};
use eresponde_store_core::{
    path, MemoryStore, Participant, SessionDescription, SharedStore, StorePath,
};

struct Rig {
    store: Arc<dyn SharedStore>,
    media: Arc<MockMediaSource>,
    transports: Arc<MockTransportFactory>,
    sink: Arc<TestAudioSink>,
    manager: CallManager,
}

fn operator() -> Participant {
    Participant {
        user_id: "dispatcher-1".into(),
        user_type: "dispatcher".into(),
        name: "Operations Desk".into(),
    }
}

async fn rig() -> Rig {
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    store
        .write(
            &path::civilian_account("civ-9"),
            json!({"firstName": "Juan", "lastName": "Cruz"}),
        )
        .await
        .unwrap();

    let media = Arc::new(MockMediaSource::new());
    let transports = Arc::new(MockTransportFactory::new());
    let sink = Arc::new(TestAudioSink::new());
    let manager = CallManager::new(
        Arc::clone(&store),
        Arc::clone(&media) as Arc<dyn MediaSource>,
        Arc::clone(&transports) as Arc<dyn PeerTransportFactory>,
        Arc::clone(&sink) as Arc<dyn AudioSink>,
        CallConfig::new(operator()),
    );
    Rig {
        store,
        media,
        transports,
        sink,
        manager,
    }
}

/// Let session tasks drain pending store notifications.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

async fn read(store: &Arc<dyn SharedStore>, path: &StorePath) -> Option<Value> {
    store.read(path).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn dialing_publishes_the_offer_and_rings() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    assert_eq!(rig.manager.state(), CallState::Ringing);
    assert_eq!(rig.manager.active_call_id(), Some(call_id));

    let offer = read(&rig.store, &path::signaling_offer(&call_id.to_string()))
        .await
        .expect("offer must be published");
    assert_eq!(offer["type"], "offer");

    let record = read(&rig.store, &path::voip_call(&call_id.to_string()))
        .await
        .expect("call record must exist");
    assert_eq!(record["status"], "ringing");
    assert_eq!(record["caller"]["userId"], "dispatcher-1");
    assert_eq!(record["callee"]["userId"], "civ-9");
    assert_eq!(record["callee"]["name"], "Juan Cruz");
    assert!(record["createdAt"].as_str().unwrap().ends_with('Z'));

    assert!(rig.sink.is_playing("ring") || rig.sink.started_count("ring") >= 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_target_acquires_nothing() {
    let rig = rig().await;
    let result = rig.manager.start("ghost").await;

    assert!(matches!(result, Err(CallError::UnknownTarget { .. })));
    assert_eq!(rig.media.acquired_count(), 0);
    assert_eq!(rig.transports.created(), 0);
    assert_eq!(rig.manager.state(), CallState::Idle);
    assert_eq!(rig.store.subscription_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn media_failure_surfaces_and_leaves_no_session() {
    let rig = rig().await;
    rig.media.fail_with(MediaError::PermissionDenied);

    let result = rig.manager.start("civ-9").await;
    assert!(matches!(
        result,
        Err(CallError::Media(MediaError::PermissionDenied))
    ));
    assert_eq!(rig.transports.created(), 0);
    assert_eq!(rig.manager.state(), CallState::Idle);
    assert_eq!(rig.store.subscription_count(), 0);

    // The failure is not sticky once the operator grants permission.
    rig.media.succeed();
    rig.manager.start("civ-9").await.unwrap();
    assert_eq!(rig.manager.state(), CallState::Ringing);
}

#[tokio::test(start_paused = true)]
async fn second_start_while_ringing_is_rejected() {
    let rig = rig().await;
    rig.manager.start("civ-9").await.unwrap();

    let result = rig.manager.start("civ-9").await;
    assert!(matches!(result, Err(CallError::AlreadyInProgress { .. })));
    assert_eq!(rig.media.acquired_count(), 1, "nothing new acquired");
}

#[tokio::test(start_paused = true)]
async fn a_new_call_can_start_after_end() {
    let rig = rig().await;
    let first = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    rig.manager.end().await;
    settle().await;
    assert_eq!(rig.manager.state(), CallState::Ended);

    let second = rig.manager.start("civ-9").await.unwrap();
    settle().await;
    assert_ne!(first, second);
    assert_eq!(rig.manager.state(), CallState::Ringing);
    assert_eq!(rig.transports.created(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_answer_connects_the_call() {
    let rig = rig().await;
    let mut events = rig.manager.subscribe_events();
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    rig.store
        .write(
            &path::signaling_answer(&call_id.to_string()),
            serde_json::to_value(SessionDescription::answer("v=0 answer")).unwrap(),
        )
        .await
        .unwrap();
    settle().await;

    assert_eq!(rig.manager.state(), CallState::Connected);
    let transport = rig.transports.last().unwrap();
    assert_eq!(transport.remote_descriptions().len(), 1);

    // Ring scheduling halts, the in-flight burst self-disposes after its
    // guard window, connect plays, answeredAt lands on the record.
    let rings = rig.sink.started_count("ring");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(rig.sink.started_count("ring"), rings);
    assert!(!rig.sink.is_playing("ring"));
    assert_eq!(rig.sink.started_count("connect"), 1);
    let record = read(&rig.store, &path::voip_call(&call_id.to_string()))
        .await
        .unwrap();
    assert!(record["answeredAt"].as_str().unwrap().ends_with('Z'));
    assert_eq!(record["status"], "ringing", "callee owns the status field");

    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CallEvent::StateChanged { state, .. } = event {
            states.push(state);
        }
    }
    assert_eq!(
        states,
        vec![CallState::Dialing, CallState::Ringing, CallState::Connected]
    );
}

#[tokio::test(start_paused = true)]
async fn store_status_answered_also_connects() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    let mut fields = serde_json::Map::new();
    fields.insert("status".to_string(), json!("answered"));
    rig.store
        .update(&path::voip_call(&call_id.to_string()), fields)
        .await
        .unwrap();
    settle().await;

    assert_eq!(rig.manager.state(), CallState::Connected);
}

#[tokio::test(start_paused = true)]
async fn remote_rejection_tears_down_automatically() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    let mut fields = serde_json::Map::new();
    fields.insert("status".to_string(), json!("rejected"));
    rig.store
        .update(&path::voip_call(&call_id.to_string()), fields)
        .await
        .unwrap();
    settle().await;

    assert_eq!(rig.manager.state(), CallState::Ended);
    let rings = rig.sink.started_count("ring");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(rig.sink.started_count("ring"), rings);
    assert!(!rig.sink.is_playing("ring"));
    assert_eq!(rig.sink.started_count("end"), 1);
    assert_eq!(rig.media.released_count(), 1);
    assert!(rig.transports.last().unwrap().is_closed());
    assert_eq!(rig.store.subscription_count(), 0);

    // The rejection the remote side wrote survives teardown.
    let record = read(&rig.store, &path::voip_call(&call_id.to_string()))
        .await
        .unwrap();
    assert_eq!(record["status"], "rejected");
    assert!(record["endedAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test(start_paused = true)]
async fn end_releases_every_listener_and_resource() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;
    assert_eq!(rig.store.subscription_count(), 3);

    rig.manager.end().await;
    settle().await;

    assert_eq!(rig.manager.state(), CallState::Ended);
    assert_eq!(rig.store.subscription_count(), 0);
    assert_eq!(rig.media.live_tracks(), 0);
    assert!(rig.transports.last().unwrap().is_closed());
    assert_eq!(rig.sink.started_count("end"), 1);

    let record = read(&rig.store, &path::voip_call(&call_id.to_string()))
        .await
        .unwrap();
    assert_eq!(record["status"], "ended");
    assert!(record["endedAt"].as_str().unwrap().ends_with('Z'));

    // Mailboxes are gone.
    let offer = read(&rig.store, &path::signaling_offer(&call_id.to_string())).await;
    assert!(offer.is_none());
}

#[tokio::test(start_paused = true)]
async fn end_is_idempotent() {
    let rig = rig().await;
    rig.manager.start("civ-9").await.unwrap();
    settle().await;

    rig.manager.end().await;
    rig.manager.end().await;
    settle().await;

    assert_eq!(rig.sink.started_count("end"), 1);
    assert_eq!(rig.media.released_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn local_candidates_are_relayed_to_the_caller_mailbox() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    let transport = rig.transports.last().unwrap();
    transport.emit_local_candidate("candidate:1 1 udp 1 192.0.2.1 50000 typ host");
    transport.emit_local_candidate("candidate:2 1 udp 2 192.0.2.2 50001 typ srflx");
    settle().await;

    let mailbox = read(
        &rig.store,
        &path::signaling_candidates(&call_id.to_string(), "caller"),
    )
    .await
    .expect("caller mailbox must exist");
    assert_eq!(mailbox.as_object().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_candidates_reach_the_transport_and_bad_ones_are_skipped() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    let mailbox = path::signaling_candidates(&call_id.to_string(), "callee");
    rig.store.push(&mailbox, json!("garbage")).await.unwrap();
    rig.store
        .push(
            &mailbox,
            json!({"candidate": "candidate:7", "sdpMLineIndex": 0, "sdpMid": "0"}),
        )
        .await
        .unwrap();
    settle().await;

    let transport = rig.transports.last().unwrap();
    let candidates = transport.candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].candidate, "candidate:7");
    assert_eq!(rig.manager.state(), CallState::Ringing, "session unaffected");
}

#[tokio::test(start_paused = true)]
async fn connection_drop_triggers_one_ice_restart() {
    let rig = rig().await;
    rig.manager.start("civ-9").await.unwrap();
    settle().await;

    let transport = rig.transports.last().unwrap();
    transport.emit_connection_state(ConnectionState::Failed);
    transport.emit_connection_state(ConnectionState::Disconnected);
    transport.emit_connection_state(ConnectionState::Failed);
    settle().await;

    assert_eq!(transport.restart_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn safety_timeout_detaches_signaling_listeners_only() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    rig.store
        .write(
            &path::signaling_answer(&call_id.to_string()),
            serde_json::to_value(SessionDescription::answer("v=0")).unwrap(),
        )
        .await
        .unwrap();
    settle().await;
    assert_eq!(rig.manager.state(), CallState::Connected);
    assert_eq!(rig.store.subscription_count(), 3);

    tokio::time::sleep(Duration::from_secs(31)).await;

    // The answer and candidate listeners are gone; the status listener
    // stays so a remote hangup still ends the call.
    assert_eq!(rig.store.subscription_count(), 1);
    assert_eq!(rig.manager.state(), CallState::Connected);

    let mut fields = serde_json::Map::new();
    fields.insert("status".to_string(), json!("ended"));
    rig.store
        .update(&path::voip_call(&call_id.to_string()), fields)
        .await
        .unwrap();
    settle().await;
    assert_eq!(rig.manager.state(), CallState::Ended);
    assert_eq!(rig.store.subscription_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn remote_missed_status_ends_the_call() {
    let rig = rig().await;
    let call_id = rig.manager.start("civ-9").await.unwrap();
    settle().await;

    let mut fields = serde_json::Map::new();
    fields.insert("status".to_string(), json!("missed"));
    rig.store
        .update(&path::voip_call(&call_id.to_string()), fields)
        .await
        .unwrap();
    settle().await;

    assert_eq!(rig.manager.state(), CallState::Ended);
    let record = read(&rig.store, &path::voip_call(&call_id.to_string()))
        .await
        .unwrap();
    assert_eq!(record["status"], "missed");
}
