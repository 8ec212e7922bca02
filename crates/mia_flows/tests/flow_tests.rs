//! End-to-end flow tests against the in-process mock backend.

use mia_client::mock::{MockFailure, Operation};
use mia_client::{ChatExchange, ChatReply, InactivityReport, MockBackend};
use mia_core::{
    Companion, MemoryIdentityStore, Mood, PersonalityMode, Role, SessionStore, Stats,
};
use mia_flows::{
    Bootstrap, BootstrapOutcome, ChatFlow, CreationError, CreationFlow, CreationForm,
    ExchangeOutcome, ExchangeState, PersonalityChoice, ValidationError, APOLOGY,
    MESSAGE_MAX_CHARS,
};
use std::sync::Arc;
use std::time::Duration;

fn momo() -> Companion {
    Companion {
        id: "pet-7".into(),
        user_id: Some("default_user".into()),
        name: "Momo".into(),
        personality_type: PersonalityMode::Predefined,
        personality_id: Some("cheerful".into()),
        custom_personality: None,
        color: "#87CEEB".into(),
        level: 1,
        created_at: None,
        last_interaction: None,
    }
}

fn momo_stats() -> Stats {
    Stats {
        pet_id: "pet-7".into(),
        affection: 50,
        hunger: 50,
        energy: 50,
        mood: Mood::Content,
        updated_at: None,
    }
}

fn store(saved: Option<&str>) -> Arc<SessionStore> {
    let identity = match saved {
        Some(id) => MemoryIdentityStore::with_id(id),
        None => MemoryIdentityStore::new(),
    };
    Arc::new(SessionStore::new(Arc::new(identity)))
}

/// A session already holding Momo and her stats.
fn ready_store() -> Arc<SessionStore> {
    let session = store(None);
    session.set_companion(momo());
    session.set_stats(momo_stats()).unwrap();
    session
}

fn momo_form() -> CreationForm {
    CreationForm {
        name: "Momo".into(),
        personality: PersonalityChoice::Predefined(Some("p1".into())),
        color: "#87CEEB".into(),
    }
}

// --- Bootstrap ---

#[tokio::test]
async fn test_bootstrap_fresh_install() {
    let mock = Arc::new(MockBackend::new());
    let session = store(None);

    let outcome = Bootstrap::new(mock.clone(), session.clone()).run().await;

    assert_eq!(outcome, BootstrapOutcome::NoCompanion);
    assert!(mock.calls().await.is_empty());
    let snapshot = session.get();
    assert!(snapshot.companion.is_none());
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_bootstrap_resumes_saved_companion() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    let session = store(Some("pet-7"));

    let outcome = Bootstrap::new(mock.clone(), session.clone()).run().await;

    assert_eq!(outcome, BootstrapOutcome::Resumed(momo()));
    let snapshot = session.get();
    assert!(snapshot.is_ready());
    assert_eq!(snapshot.stats.as_ref().unwrap().affection, 50);
    assert_eq!(mock.call_count(Operation::FetchStats).await, 0);
}

#[tokio::test]
async fn test_bootstrap_stale_id() {
    let mock = Arc::new(MockBackend::new());
    let session = store(Some("gone"));

    let outcome = Bootstrap::new(mock.clone(), session.clone()).run().await;

    assert_eq!(outcome, BootstrapOutcome::NoCompanion);
    assert_eq!(mock.call_count(Operation::FetchCompanion).await, 1);
    assert!(session.get().companion.is_none());
    assert!(!session.get().is_loading);
}

#[tokio::test]
async fn test_bootstrap_backend_down() {
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), Some(momo_stats()))
            .failing(Operation::FetchCompanion, MockFailure::Unreachable),
    );
    let session = store(Some("pet-7"));

    let outcome = Bootstrap::new(mock, session.clone()).run().await;

    assert_eq!(outcome, BootstrapOutcome::NoCompanion);
    assert!(session.get().companion.is_none());
}

#[tokio::test]
async fn test_bootstrap_fetches_missing_stats() {
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), Some(momo_stats()))
            .without_bundled_stats("pet-7"),
    );
    let session = store(Some("pet-7"));

    let outcome = Bootstrap::new(mock.clone(), session.clone()).run().await;

    assert!(matches!(outcome, BootstrapOutcome::Resumed(_)));
    assert_eq!(mock.call_count(Operation::FetchStats).await, 1);
    assert!(session.get().is_ready());
}

#[tokio::test]
async fn test_bootstrap_gives_up_without_stats() {
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), None)
            .without_bundled_stats("pet-7"),
    );
    let session = store(Some("pet-7"));

    let outcome = Bootstrap::new(mock, session.clone()).run().await;

    assert_eq!(outcome, BootstrapOutcome::NoCompanion);
    let snapshot = session.get();
    assert!(snapshot.companion.is_none());
    assert!(snapshot.stats.is_none());
}

// --- Creation ---

#[tokio::test]
async fn test_creation_stores_companion_then_stats() {
    let mock = Arc::new(MockBackend::new());
    let session = store(None);
    let flow = CreationFlow::new(mock.clone(), session.clone(), "default_user");

    let created = flow.submit(&momo_form()).await.unwrap();

    assert_eq!(created.name, "Momo");
    assert_eq!(created.color, "#87CEEB");
    assert_eq!(created.personality_id.as_deref(), Some("p1"));

    let ops: Vec<Operation> = mock.calls().await.into_iter().map(|c| c.op).collect();
    assert_eq!(ops, vec![Operation::CreateCompanion, Operation::FetchStats]);

    let snapshot = session.get();
    assert!(snapshot.is_ready());
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.stats.as_ref().unwrap().pet_id, created.id);
    assert_eq!(
        session.persisted_id().unwrap().as_deref(),
        Some(created.id.as_str())
    );
}

#[tokio::test]
async fn test_creation_validation_makes_no_call() {
    let mock = Arc::new(MockBackend::new());
    let session = store(None);
    let flow = CreationFlow::new(mock.clone(), session.clone(), "default_user");

    let form = CreationForm {
        name: "   ".into(),
        ..momo_form()
    };
    let err = flow.submit(&form).await.unwrap_err();

    assert!(matches!(
        err,
        CreationError::Invalid(ValidationError::EmptyName)
    ));
    assert!(mock.calls().await.is_empty());
    assert!(session.get().companion.is_none());
}

#[tokio::test]
async fn test_creation_failure_keeps_input() {
    let mock = Arc::new(
        MockBackend::new().failing(Operation::CreateCompanion, MockFailure::Status(500)),
    );
    let session = store(None);
    let flow = CreationFlow::new(mock.clone(), session.clone(), "default_user");
    let form = momo_form();

    let err = flow.submit(&form).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(
        err.to_string(),
        "Failed to create your AI friend. Please try again."
    );
    assert_eq!(form, momo_form());
    let snapshot = session.get();
    assert!(snapshot.companion.is_none());
    assert!(!snapshot.is_loading);

    // Same form goes through once the backend recovers
    mock.recover(Operation::CreateCompanion).await;
    assert!(flow.submit(&form).await.is_ok());
}

#[tokio::test]
async fn test_creation_stats_failure_is_resumable() {
    let mock = Arc::new(
        MockBackend::new().failing(Operation::FetchStats, MockFailure::Status(500)),
    );
    let session = store(None);
    let flow = CreationFlow::new(mock.clone(), session.clone(), "default_user");

    let companion_id = match flow.submit(&momo_form()).await {
        Err(CreationError::StatsUnavailable { companion_id, .. }) => companion_id,
        other => panic!("expected StatsUnavailable, got {:?}", other),
    };
    assert_eq!(session.persisted_id().unwrap(), Some(companion_id.clone()));
    assert!(session.get().stats.is_none());

    mock.recover(Operation::FetchStats).await;
    let outcome = Bootstrap::new(mock.clone(), session.clone()).run().await;
    match outcome {
        BootstrapOutcome::Resumed(c) => assert_eq!(c.id, companion_id),
        other => panic!("expected resume, got {:?}", other),
    }
    assert!(session.get().is_ready());
}

#[tokio::test]
async fn test_personalities_degrade_to_empty() {
    let mock = Arc::new(MockBackend::demo());
    let flow = CreationFlow::new(mock.clone(), store(None), "default_user");
    assert_eq!(flow.load_personalities().await.len(), 4);

    mock.fail(Operation::ListPersonalities, MockFailure::Unreachable)
        .await;
    assert!(flow.load_personalities().await.is_empty());
}

// --- Chat ---

#[tokio::test]
async fn test_send_success_refreshes_stats() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    mock.push_reply(Ok(ChatReply::new("Hi there!", Mood::Happy)))
        .await;
    let session = ready_store();
    let flow = ChatFlow::new(mock.clone(), session.clone(), 10);

    let outcome = flow.send("  hello ").await.unwrap();

    let ExchangeOutcome::Settled { reply } = outcome else {
        panic!("expected a reply");
    };
    assert_eq!(reply.content, "Hi there!");

    let transcript = flow.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[0].content, "hello");
    assert_eq!(transcript[1].role, Role::Ai);
    assert_eq!(transcript[1].emotion, Some(Mood::Happy));

    assert_eq!(flow.state().await, ExchangeState::Settled);
    assert_eq!(flow.current_emotion().await, Mood::Happy);
    assert_eq!(session.get().stats.as_ref().unwrap().affection, 55);
}

#[tokio::test]
async fn test_send_while_unreachable() {
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), Some(momo_stats()))
            .failing(Operation::SendChat, MockFailure::Unreachable),
    );
    let session = ready_store();
    let flow = ChatFlow::new(mock.clone(), session.clone(), 10);

    let outcome = flow.send("hello").await.unwrap();

    assert_eq!(
        outcome,
        ExchangeOutcome::Failed {
            retry_text: "hello".into()
        }
    );
    let transcript = flow.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].content, APOLOGY);
    assert_eq!(transcript[1].emotion, Some(Mood::Sad));
    assert_eq!(flow.current_emotion().await, Mood::Sad);
    assert_eq!(flow.state().await, ExchangeState::Failed);

    assert_eq!(session.get().stats.as_ref(), Some(&momo_stats()));
    assert_eq!(mock.call_count(Operation::FetchStats).await, 0);
}

#[tokio::test]
async fn test_rejected_reply_gets_apology() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    mock.push_reply(Err(mia_client::ClientError::Rejected { operation: "chat" }))
        .await;
    let flow = ChatFlow::new(mock, ready_store(), 10);

    let outcome = flow.send("hello").await.unwrap();

    assert!(matches!(outcome, ExchangeOutcome::Failed { .. }));
    assert_eq!(flow.transcript().await[1].content, APOLOGY);
}

#[tokio::test]
async fn test_blank_input_sends_nothing() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    let flow = ChatFlow::new(mock.clone(), ready_store(), 10);

    assert!(flow.send("").await.is_none());
    assert!(flow.send("   \n").await.is_none());

    assert!(flow.transcript().await.is_empty());
    assert!(mock.calls().await.is_empty());
}

#[tokio::test]
async fn test_stats_refresh_failure_keeps_reply() {
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), Some(momo_stats()))
            .failing(Operation::FetchStats, MockFailure::Status(500)),
    );
    let session = ready_store();
    let flow = ChatFlow::new(mock, session.clone(), 10);

    let outcome = flow.send("hello").await.unwrap();

    assert!(matches!(outcome, ExchangeOutcome::Settled { .. }));
    assert_eq!(flow.transcript().await.len(), 2);
    assert_eq!(flow.state().await, ExchangeState::Settled);
    assert_eq!(session.get().stats.as_ref().unwrap().affection, 50);
}

#[tokio::test]
async fn test_concurrent_sends_stay_ordered() {
    let mut mock = MockBackend::new().with_companion(momo(), Some(momo_stats()));
    let gate = mock.gate_chat();
    let mock = Arc::new(mock);
    let session = ready_store();
    let flow = ChatFlow::new(mock.clone(), session.clone(), 10);

    let driver = async {
        while mock.call_count(Operation::SendChat).await < 1 {
            tokio::task::yield_now().await;
        }
        // First reply outstanding, second message still queued
        assert!(flow.is_typing().await);
        assert_eq!(flow.transcript().await.len(), 1);
        gate.add_permits(1);

        while mock.call_count(Operation::SendChat).await < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(flow.transcript().await.len(), 3);
        gate.add_permits(1);
    };
    let (first, second, ()) = tokio::join!(flow.send("first"), flow.send("second"), driver);

    assert!(matches!(first, Some(ExchangeOutcome::Settled { .. })));
    assert!(matches!(second, Some(ExchangeOutcome::Settled { .. })));

    let contents: Vec<String> = flow
        .transcript()
        .await
        .into_iter()
        .map(|t| t.content)
        .collect();
    assert_eq!(
        contents,
        vec![
            "first",
            "(Mock) You said: first",
            "second",
            "(Mock) You said: second",
        ]
    );
    assert!(!flow.is_typing().await);
    // Two exchanges, two refreshes, newest one wins
    assert_eq!(session.get().stats.as_ref().unwrap().affection, 60);
}

#[tokio::test]
async fn test_enter_hydrates_then_notifies_once() {
    let history = vec![
        ChatExchange::new("hi", "hello!", Mood::Happy),
        ChatExchange::new("how are you", "great", Mood::Content),
    ];
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), Some(momo_stats()))
            .with_history("pet-7", history)
            .with_inactivity(
                "pet-7",
                InactivityReport {
                    inactive: true,
                    message: Some("I missed you so much!".into()),
                    hours: Some(48),
                },
            ),
    );
    let flow = ChatFlow::new(mock.clone(), ready_store(), 10);

    flow.enter().await;

    let transcript = flow.transcript().await;
    assert_eq!(transcript.len(), 5);
    assert_eq!(transcript[0].content, "hi");
    assert_eq!(transcript[1].emotion, Some(Mood::Happy));
    assert_eq!(transcript[3].content, "great");
    assert_eq!(transcript[4].content, "I missed you so much!");
    assert_eq!(transcript[4].emotion, Some(Mood::Sad));

    flow.check_inactivity().await;
    assert_eq!(flow.transcript().await.len(), 5);
    assert_eq!(mock.call_count(Operation::CheckInactive).await, 1);
}

#[tokio::test]
async fn test_history_replaces_transcript() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    let flow = ChatFlow::new(mock.clone(), ready_store(), 10);

    flow.send("one").await;
    flow.send("two").await;
    assert_eq!(flow.transcript().await.len(), 4);

    flow.load_history(1).await;
    let transcript = flow.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].content, "two");
}

#[tokio::test]
async fn test_history_failure_leaves_transcript() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    let flow = ChatFlow::new(mock.clone(), ready_store(), 10);
    flow.send("one").await;

    mock.fail(Operation::FetchHistory, MockFailure::Unreachable)
        .await;
    flow.load_history(10).await;

    assert_eq!(flow.transcript().await.len(), 2);
}

#[tokio::test]
async fn test_feed_lowers_hunger() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    let session = ready_store();
    let flow = ChatFlow::new(mock.clone(), session.clone(), 10);

    flow.feed(20).await.unwrap();

    assert_eq!(session.get().stats.as_ref().unwrap().hunger, 30);
    assert_eq!(mock.stats_of("pet-7").await.unwrap().hunger, 30);
}

async fn wait_for_calls(mock: &MockBackend, op: Operation, n: usize) {
    while mock.call_count(op).await < n {
        tokio::task::yield_now().await;
    }
}

fn contents(transcript: &[mia_core::ChatTurn]) -> Vec<&str> {
    transcript.iter().map(|t| t.content.as_str()).collect()
}

#[tokio::test]
async fn test_history_waits_for_inflight_send() {
    let mut mock = MockBackend::new()
        .with_companion(momo(), Some(momo_stats()))
        .with_history(
            "pet-7",
            vec![ChatExchange::new("old", "old reply", Mood::Neutral)],
        );
    let gate = mock.gate_chat();
    let mock = Arc::new(mock);
    let flow = ChatFlow::new(mock.clone(), ready_store(), 10);

    let hydrate = async {
        wait_for_calls(&mock, Operation::SendChat, 1).await;
        flow.load_history(10).await;
    };
    let release = async {
        wait_for_calls(&mock, Operation::SendChat, 1).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // Hydration is queued behind the exchange
        assert_eq!(mock.call_count(Operation::FetchHistory).await, 0);
        assert_eq!(contents(&flow.transcript().await), vec!["hello"]);
        gate.add_permits(1);
    };
    let (outcome, (), ()) = tokio::join!(flow.send("hello"), hydrate, release);

    assert!(matches!(outcome, Some(ExchangeOutcome::Settled { .. })));
    let transcript = flow.transcript().await;
    assert_eq!(
        contents(&transcript),
        vec!["old", "old reply", "hello", "(Mock) You said: hello"]
    );
    for pair in transcript.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Ai);
    }
}

#[tokio::test]
async fn test_inactivity_notice_waits_for_inflight_send() {
    let mut mock = MockBackend::new()
        .with_companion(momo(), Some(momo_stats()))
        .with_inactivity(
            "pet-7",
            InactivityReport {
                inactive: true,
                message: Some("miss you".into()),
                hours: Some(26),
            },
        );
    let gate = mock.gate_chat();
    let mock = Arc::new(mock);
    let flow = ChatFlow::new(mock.clone(), ready_store(), 10);

    let notice = async {
        wait_for_calls(&mock, Operation::SendChat, 1).await;
        flow.check_inactivity().await;
    };
    let release = async {
        wait_for_calls(&mock, Operation::SendChat, 1).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(mock.call_count(Operation::CheckInactive).await, 0);
        gate.add_permits(1);
    };
    tokio::join!(flow.send("hello"), notice, release);

    assert_eq!(
        contents(&flow.transcript().await),
        vec!["hello", "(Mock) You said: hello", "miss you"]
    );
}

#[tokio::test]
async fn test_emotion_follows_refreshed_stats() {
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), Some(momo_stats()))
            .with_mood_after_chat(Mood::VerySad),
    );
    mock.push_reply(Ok(ChatReply::new("yay!", Mood::Happy)))
        .await;
    let session = ready_store();
    let flow = ChatFlow::new(mock, session.clone(), 10);

    let outcome = flow.send("hi").await.unwrap();

    // The turn keeps its own tag, the avatar follows the stored stats
    let ExchangeOutcome::Settled { reply } = outcome else {
        panic!("expected a reply");
    };
    assert_eq!(reply.emotion, Some(Mood::Happy));
    assert_eq!(session.get().stats.as_ref().unwrap().mood, Mood::VerySad);
    assert_eq!(flow.current_emotion().await, Mood::VerySad);
}

#[tokio::test]
async fn test_feed_updates_emotion_from_stats() {
    let backend_stats = Stats {
        mood: Mood::Sad,
        ..momo_stats()
    };
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(backend_stats)));
    let flow = ChatFlow::new(mock, ready_store(), 10);
    assert_eq!(flow.current_emotion().await, Mood::Content);

    flow.feed(10).await.unwrap();

    assert_eq!(flow.current_emotion().await, Mood::Sad);
}

#[tokio::test]
async fn test_long_message_is_cut() {
    let mock = Arc::new(MockBackend::new().with_companion(momo(), Some(momo_stats())));
    let flow = ChatFlow::new(mock.clone(), ready_store(), 10);

    flow.send(&"é".repeat(MESSAGE_MAX_CHARS + 100)).await.unwrap();

    let sent = flow.transcript().await[0].content.clone();
    assert_eq!(sent.chars().count(), MESSAGE_MAX_CHARS);
    let calls = mock.calls().await;
    assert_eq!(calls[0].arg.as_deref(), Some(sent.as_str()));
}

#[tokio::test(start_paused = true)]
async fn test_typing_while_reply_is_slow() {
    let mock = Arc::new(
        MockBackend::new()
            .with_companion(momo(), Some(momo_stats()))
            .with_latency(Duration::from_secs(2)),
    );
    let flow = ChatFlow::new(mock, ready_store(), 10);

    let watcher = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(flow.is_typing().await);
        assert_eq!(flow.transcript().await.len(), 1);
    };
    let (outcome, ()) = tokio::join!(flow.send("hello"), watcher);

    assert!(matches!(outcome, Some(ExchangeOutcome::Settled { .. })));
    assert!(!flow.is_typing().await);
    assert_eq!(flow.transcript().await.len(), 2);
}
