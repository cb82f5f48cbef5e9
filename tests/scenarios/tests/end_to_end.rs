//! The six concrete end-to-end scenarios from the spec's testable-properties
//! section, run against the real `recall-core` pipeline with the two
//! external collaborators (embeddings, local LLM) swapped for deterministic
//! test doubles.

use recall_core::{Config, EmbeddingProvider, IndexOptions, IndexOutcome, ProjectTag, Storage};
use recall_scenarios::harness::{make_record, seed_session};
use recall_scenarios::{CannedLlmClient, TestEmbeddingProvider};

fn test_config() -> Config {
    Config::new(":memory:")
}

/// Scenario 1: quoted-title single-dream lookup picks the most recent
/// title match and never blends in other dreams.
#[test]
fn quoted_title_single_dream_picks_most_recent_match() {
    let storage = Storage::open_in_memory().unwrap();

    let older = {
        let mut r = make_record("s-older", ProjectTag::Daas, "Red Door", "an older dream about a red door");
        r.indexed_at = chrono::Utc::now() - chrono::Duration::days(2);
        r
    };
    let newer = {
        let mut r = make_record(
            "s-newer",
            ProjectTag::Daas,
            "Red Door (revisited)",
            "a more recent dream revisiting the red door",
        );
        r.indexed_at = chrono::Utc::now();
        r
    };
    let unrelated = make_record("s-other", ProjectTag::Daas, "Flying Over Water", "flight dream");

    for record in [&older, &newer, &unrelated] {
        storage
            .upsert_session(&recall_core::Session::new(&record.session_id, &record.title, ProjectTag::Daas))
            .unwrap();
        storage.upsert_memory_record(record).unwrap();
    }

    let embeddings = TestEmbeddingProvider::new();
    let retrieval = recall_core::retrieval::daas::retrieve(
        &storage,
        &embeddings,
        r#"Tell me about "Red Door""#,
        5,
    )
    .unwrap();

    match retrieval {
        recall_core::Retrieval::SingleDream(record) => {
            assert_eq!(record.session_id, "s-newer");
        }
        other => panic!("expected SingleDream, got {other:?}"),
    }
}

/// Scenario 2: pattern-mode DAAS retrieval with a clamped k=3 returns
/// exactly 3 records ordered by non-increasing similarity.
#[test]
fn pattern_mode_retrieval_respects_k_and_ordering() {
    let storage = Storage::open_in_memory().unwrap();
    let embeddings = TestEmbeddingProvider::new();

    let topics = [
        "recurring symbol of water and loss",
        "water imagery returns again in this dream",
        "loss and grief surface as flooding water",
        "a calm afternoon with no particular symbolism",
        "flying over mountains at sunset",
        "a conversation with an old friend about nothing",
        "water again, this time a flood in the childhood home",
        "losing a set of keys in a crowded market",
        "an ordinary commute with no strong imagery",
        "water, water everywhere, and the loss of a boat",
    ];

    for (i, topic) in topics.iter().enumerate() {
        let session_id = format!("s{i}");
        let record = make_record(&session_id, ProjectTag::Daas, &format!("Dream {i}"), topic);
        storage
            .upsert_session(&recall_core::Session::new(&session_id, &record.title, ProjectTag::Daas))
            .unwrap();
        storage.upsert_memory_record(&record).unwrap();
        let vector = embeddings.embed(topic).unwrap();
        storage.set_memory_embedding(&session_id, &vector).unwrap();
    }

    let retrieval = recall_core::retrieval::daas::retrieve(
        &storage,
        &embeddings,
        "recurring symbol of water and loss",
        3,
    )
    .unwrap();

    match retrieval {
        recall_core::Retrieval::PatternDreams(hits) => {
            assert_eq!(hits.len(), 3);
            for pair in hits.windows(2) {
                assert!(pair[0].1 >= pair[1].1, "results must be non-increasing similarity");
            }
        }
        other => panic!("expected PatternDreams, got {other:?}"),
    }
}

/// Scenario 3: a THN session's own tag always wins over the organizer's
/// suggestion, and the session row is left untouched.
#[tokio::test]
async fn tag_reconciliation_overrides_llm_suggestion() {
    let storage = Storage::open_in_memory().unwrap();
    let config = test_config();
    seed_session(&storage, "s-thn", "debugging the build", ProjectTag::Thn, &[
        "user: the CI pipeline is red",
        "assistant: let's look at the failing step",
    ]);

    let llm = CannedLlmClient::responding(
        r#"{
          "title": "CI pipeline fix",
          "project": "DAAS",
          "tags": ["ci"],
          "summary_short": "Debugged a failing CI pipeline.",
          "summary_detailed": "Walked through the failing step and found the cause.",
          "key_entities": {"people": [], "domains": [], "assets": []},
          "key_topics": ["ci"],
          "memory_snippet": "Fixed the CI pipeline after tracing a failing step."
        }"#,
    );

    let outcome = recall_core::index_session(&storage, &llm, None, &config, "s-thn", IndexOptions::default())
        .await
        .unwrap();

    let IndexOutcome::Indexed(record) = outcome else {
        panic!("expected Indexed outcome");
    };
    assert_eq!(record.project_tag, ProjectTag::Thn);
    assert_eq!(storage.get_session("s-thn").unwrap().unwrap().project_tag, ProjectTag::Thn);
}

/// Scenario 4: a `general` session with no `preserve_project` promotes to
/// whatever valid tag the organizer proposes, and the session row updates
/// to match.
#[tokio::test]
async fn general_session_promotes_to_llm_tag() {
    let storage = Storage::open_in_memory().unwrap();
    let config = test_config();
    seed_session(&storage, "s-gen", "random chat", ProjectTag::General, &[
        "user: thoughts on the new FF character build",
        "assistant: here's a build that works well",
    ]);

    let llm = CannedLlmClient::responding(
        r#"{
          "title": "FF character build discussion",
          "project": "FF",
          "tags": ["build"],
          "summary_short": "Discussed a character build.",
          "summary_detailed": "Went over a strong build for the new character.",
          "key_entities": {"people": [], "domains": [], "assets": []},
          "key_topics": ["build"],
          "memory_snippet": "Settled on a strong build for the new character."
        }"#,
    );

    let outcome = recall_core::index_session(&storage, &llm, None, &config, "s-gen", IndexOptions::default())
        .await
        .unwrap();

    let IndexOutcome::Indexed(record) = outcome else {
        panic!("expected Indexed outcome");
    };
    assert_eq!(record.project_tag, ProjectTag::Ff);
    assert_eq!(storage.get_session("s-gen").unwrap().unwrap().project_tag, ProjectTag::Ff);
}

/// Scenario 5: noisy LLM output — fenced JSON, a leading preamble, a
/// trailing aside, and an inline `//` comment — still extracts cleanly.
#[tokio::test]
async fn noisy_fenced_json_with_comments_extracts_cleanly() {
    let storage = Storage::open_in_memory().unwrap();
    let config = test_config();
    seed_session(&storage, "s-noisy", "sprint retro", ProjectTag::Thn, &[
        "user: let's do the sprint retro",
        "assistant: sure, what went well?",
    ]);

    let raw = "Sure, here's the JSON you asked for:\n\n\
        ```json\n\
        {\n\
          \"title\": \"Sprint retro\", // short\n\
          \"project\": \"THN\",\n\
          \"tags\": [\"retro\"],\n\
          \"summary_short\": \"Held the sprint retro.\",\n\
          \"summary_detailed\": \"The team reviewed the sprint and flagged a few process gaps.\",\n\
          \"key_entities\": {\"people\": [], \"domains\": [], \"assets\": []},\n\
          \"key_topics\": [],\n\
          \"memory_snippet\": \"Sprint retro surfaced a few process gaps to address.\"\n\
        }\n\
        ```\n\
        Hope that helps!";

    let llm = CannedLlmClient::responding(raw);
    let outcome = recall_core::index_session(&storage, &llm, None, &config, "s-noisy", IndexOptions::default())
        .await
        .unwrap();

    let IndexOutcome::Indexed(record) = outcome else {
        panic!("expected Indexed outcome");
    };
    assert_eq!(record.title, "Sprint retro");
    assert_eq!(record.project_tag, ProjectTag::Thn);
}

/// Scenario 6: a total LLM failure degrades to the sentinel outcome. The
/// session and its messages remain intact and no `MemoryRecord` is written.
#[tokio::test]
async fn llm_unavailable_degrades_without_writing_a_record() {
    let storage = Storage::open_in_memory().unwrap();
    let config = test_config();
    seed_session(&storage, "s-down", "chat during an outage", ProjectTag::General, &[
        "user: hello?",
    ]);

    let llm = CannedLlmClient::unavailable();
    let outcome = recall_core::index_session(&storage, &llm, None, &config, "s-down", IndexOptions::default())
        .await
        .unwrap();

    match outcome {
        IndexOutcome::Failed { session_id, .. } => assert_eq!(session_id, "s-down"),
        IndexOutcome::Indexed(_) => panic!("expected Failed outcome"),
    }

    assert!(storage.get_memory_record("s-down").unwrap().is_none());
    assert!(storage.get_session("s-down").unwrap().is_some());
    assert_eq!(storage.load_messages("s-down").unwrap().len(), 1);
    assert!(storage.list_memory_records(Some(ProjectTag::General), 10).unwrap().is_empty());
}
