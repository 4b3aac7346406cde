use lingua_core::model::{
    CardStatus, CefrLevel, PhaseCompletion, PlacementOutcome, Quality, ReviewCard, SpellingTracker,
    StudyMode, TopicId, TopicPhase, TopicProgress,
};
use lingua_core::scheduler::Scheduler;
use lingua_core::time::fixed_now;
use storage::repository::{
    CardRepository, PlacementRepository, ProgressRepository, SESSION_LOG_CAP, SessionKind,
    SessionLogRecord, SessionLogRepository, StorageError,
};
use storage::repository::Storage;
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_card_roundtrip_preserves_scheduling_state() {
    let repo = connect("memdb_card_roundtrip").await;

    let mut card = ReviewCard::new("gehen", StudyMode::Receptive, fixed_now()).unwrap();
    let scheduler = Scheduler::new();
    scheduler.advance(&mut card, Quality::Good, fixed_now());
    scheduler.advance(&mut card, Quality::Good, fixed_now());
    assert_eq!(card.status(), CardStatus::Review);

    repo.upsert_card(&card).await.unwrap();

    let loaded = repo.get_card("gehen", StudyMode::Receptive).await.unwrap();
    assert_eq!(loaded, card);

    // The productive record for the same word is independent.
    assert!(matches!(
        repo.get_card("gehen", StudyMode::Productive).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_due_and_new_queries_respect_mode_and_order() {
    let repo = connect("memdb_due_new").await;
    let scheduler = Scheduler::new();
    let now = fixed_now();

    // Two overdue receptive cards with different due times.
    for (word, days_ago) in [("eins", 10), ("zwei", 6)] {
        let mut card = ReviewCard::new(word, StudyMode::Receptive, now).unwrap();
        scheduler.advance(&mut card, Quality::Easy, now - chrono::Duration::days(days_ago));
        repo.upsert_card(&card).await.unwrap();
    }
    // A new receptive card and a new productive card.
    repo.upsert_card(&ReviewCard::new("drei", StudyMode::Receptive, now).unwrap())
        .await
        .unwrap();
    repo.upsert_card(&ReviewCard::new("drei", StudyMode::Productive, now).unwrap())
        .await
        .unwrap();

    let due = repo.due_cards(StudyMode::Receptive, now, 10).await.unwrap();
    let words: Vec<&str> = due.iter().map(ReviewCard::word).collect();
    assert_eq!(words, vec!["eins", "zwei"]);

    let fresh = repo.new_cards(StudyMode::Receptive, 10).await.unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].word(), "drei");

    let productive_due = repo.due_cards(StudyMode::Productive, now, 10).await.unwrap();
    assert!(productive_due.is_empty());
}

#[tokio::test]
async fn sqlite_spelling_samples_roundtrip() {
    let repo = connect("memdb_spelling").await;

    assert!(repo.get_spelling("gehen").await.unwrap().is_empty());

    let mut tracker = SpellingTracker::new();
    tracker.record("gehen", "gehen");
    tracker.record("gehen", "gehn");
    tracker.record("gehen", "GEHEN");
    repo.save_spelling("gehen", &tracker).await.unwrap();

    let loaded = repo.get_spelling("gehen").await.unwrap();
    assert_eq!(loaded.samples(), vec![true, false, true]);
    assert_eq!(loaded.accuracy(), Some(2.0 / 3.0));
}

#[tokio::test]
async fn sqlite_topic_progress_roundtrip_with_submissions() {
    let repo = connect("memdb_progress").await;
    let topic_id = TopicId::new("dativ-prepositions").unwrap();

    assert!(repo.get_progress(&topic_id).await.unwrap().is_none());

    let mut progress = TopicProgress::start(topic_id.clone(), fixed_now());
    for completion in [
        PhaseCompletion::Discover,
        PhaseCompletion::Understand,
        PhaseCompletion::Notice,
        PhaseCompletion::Practice { score: 0.5 },
        PhaseCompletion::Practice { score: 0.9 },
        PhaseCompletion::Produce {
            text: "Ich fahre mit dem Bus.".into(),
        },
        PhaseCompletion::InputFlood,
    ] {
        progress.complete_phase(completion, fixed_now()).unwrap();
    }

    repo.upsert_progress(&progress).await.unwrap();
    let loaded = repo.get_progress(&topic_id).await.unwrap().unwrap();

    assert_eq!(loaded, progress);
    assert_eq!(loaded.current_phase(), TopicPhase::InputFlood);
    assert_eq!(loaded.practice().attempts, 2);
    assert_eq!(loaded.produce_submissions().len(), 1);

    // Upserting again after more phase work replaces the stored state.
    for _ in 0..4 {
        progress
            .complete_phase(PhaseCompletion::InputFlood, fixed_now())
            .unwrap();
    }
    progress
        .complete_phase(PhaseCompletion::Review { accuracy: 0.9 }, fixed_now())
        .unwrap();
    repo.upsert_progress(&progress).await.unwrap();

    let reloaded = repo.get_progress(&topic_id).await.unwrap().unwrap();
    assert!(reloaded.is_acquired());
    assert_eq!(reloaded.completed_at(), Some(fixed_now()));
}

#[tokio::test]
async fn sqlite_latest_placement_outcome_wins() {
    let repo = connect("memdb_placement").await;

    assert!(repo.latest_outcome().await.unwrap().is_none());

    let older = PlacementOutcome {
        grammar: CefrLevel::A2,
        vocabulary: CefrLevel::B1,
        reading: CefrLevel::A2,
        listening: CefrLevel::A2,
        overall: CefrLevel::A2,
        finished_at: fixed_now() - chrono::Duration::days(30),
    };
    let newer = PlacementOutcome {
        overall: CefrLevel::B1,
        finished_at: fixed_now(),
        ..older
    };
    repo.save_outcome(&older).await.unwrap();
    repo.save_outcome(&newer).await.unwrap();

    let latest = repo.latest_outcome().await.unwrap().unwrap();
    assert_eq!(latest.overall, CefrLevel::B1);
    assert_eq!(latest.finished_at, fixed_now());
}

#[tokio::test]
async fn storage_bundle_wires_all_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_bundle?mode=memory&cache=shared")
        .await
        .expect("bundle");

    let card = ReviewCard::new("gehen", StudyMode::Receptive, fixed_now()).unwrap();
    storage.cards.upsert_card(&card).await.unwrap();
    assert_eq!(
        storage
            .cards
            .get_card("gehen", StudyMode::Receptive)
            .await
            .unwrap(),
        card
    );

    let topic_id = TopicId::new("dativ-prepositions").unwrap();
    let progress = TopicProgress::start(topic_id.clone(), fixed_now());
    storage.progress.upsert_progress(&progress).await.unwrap();
    assert!(storage.progress.get_progress(&topic_id).await.unwrap().is_some());

    assert!(storage.placements.latest_outcome().await.unwrap().is_none());
    assert!(storage.session_logs.list_logs(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_session_log_append_caps_history() {
    let repo = connect("memdb_session_log").await;

    let record = SessionLogRecord {
        id: None,
        kind: SessionKind::VocabularyReview,
        mode: Some(StudyMode::Productive),
        total: 8,
        correct: 6,
        accuracy: 0.75,
        duration_secs: 300,
        recorded_at: fixed_now(),
    };

    for _ in 0..(SESSION_LOG_CAP + 5) {
        repo.append_log(&record).await.unwrap();
    }

    let logs = repo.list_logs(u32::MAX).await.unwrap();
    assert_eq!(logs.len(), SESSION_LOG_CAP);
    assert_eq!(logs[0].kind, SessionKind::VocabularyReview);
    assert_eq!(logs[0].mode, Some(StudyMode::Productive));
    // Newest first.
    assert!(logs[0].id > logs[logs.len() - 1].id);
}
