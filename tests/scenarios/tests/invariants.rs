//! Property-style invariants from the spec's testable-properties section
//! that need the full pipeline (storage + indexer) rather than a pure
//! function, so they live here instead of next to the unit they touch.

use recall_core::{IndexOptions, IndexOutcome, ProjectTag, Storage};
use recall_scenarios::harness::seed_session;
use recall_scenarios::CannedLlmClient;

const ORGANIZER_RESPONSE: &str = r#"{
  "title": "Weekly planning",
  "project": "general",
  "tags": ["planning"],
  "summary_short": "Planned the week ahead.",
  "summary_detailed": "Walked through priorities for the upcoming week and assigned owners.",
  "key_entities": {"people": [], "domains": [], "assets": []},
  "key_topics": ["planning"],
  "memory_snippet": "Set priorities and owners for the week."
}"#;

/// `index_session(s)` followed by `get_memory_record(s)` returns a record
/// whose `session_id == s`.
#[tokio::test]
async fn indexed_record_has_matching_session_id() {
    let storage = Storage::open_in_memory().unwrap();
    let config = recall_core::Config::new(":memory:");
    seed_session(&storage, "s1", "weekly sync", ProjectTag::General, &["user: let's plan the week"]);

    let llm = CannedLlmClient::responding(ORGANIZER_RESPONSE);
    recall_core::index_session(&storage, &llm, None, &config, "s1", IndexOptions::default())
        .await
        .unwrap();

    let record = storage.get_memory_record("s1").unwrap().unwrap();
    assert_eq!(record.session_id, "s1");
}

/// Re-indexing the same session is idempotent: the two resulting records
/// are equal modulo `indexed_at`, and there's still exactly one row.
#[tokio::test]
async fn reindexing_is_idempotent() {
    let storage = Storage::open_in_memory().unwrap();
    let config = recall_core::Config::new(":memory:");
    seed_session(&storage, "s1", "weekly sync", ProjectTag::General, &["user: let's plan the week"]);

    let llm = CannedLlmClient::responding(ORGANIZER_RESPONSE);

    let first = recall_core::index_session(&storage, &llm, None, &config, "s1", IndexOptions::default())
        .await
        .unwrap();
    let second = recall_core::index_session(&storage, &llm, None, &config, "s1", IndexOptions::default())
        .await
        .unwrap();

    let (IndexOutcome::Indexed(first), IndexOutcome::Indexed(second)) = (first, second) else {
        panic!("expected both passes to index successfully");
    };

    assert_eq!(first.session_id, second.session_id);
    assert_eq!(first.title, second.title);
    assert_eq!(first.summary_detailed, second.summary_detailed);
    assert_eq!(first.project_tag, second.project_tag);

    let all = storage.list_memory_records(Some(ProjectTag::General), 10).unwrap();
    assert_eq!(all.len(), 1, "idempotent upsert must never duplicate a record");
}

/// Every project tag that ends up on a stored record is a member of the
/// closed set, regardless of what nonsense the caller passes in.
#[test]
fn normalize_project_tag_is_always_in_the_closed_set() {
    for raw in ["thn", "DAAS", " ff ", "700b", "nonsense", "", "General", "ThN"] {
        let tag = recall_core::normalize_project_tag(raw);
        assert!(
            tag == ProjectTag::Thn
                || tag == ProjectTag::Daas
                || tag == ProjectTag::Ff
                || tag == ProjectTag::SevenHundredB
                || tag == ProjectTag::General
        );
    }
}
