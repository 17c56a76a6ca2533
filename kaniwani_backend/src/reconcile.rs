//! Bringing a stored vocabulary item up to date with its upstream snapshot.
//!
//! Readings and parts of speech are diffed by natural key into explicit add and remove
//! sets; the store applies the resulting plan in one go. Per-learner data (reviews,
//! synonyms, notes) lives elsewhere and is never part of a plan.

use super::*;
use crate::upstream::VocabularySnapshot;
use crate::vocabulary::{ReadingKey, StoredVocabulary};
use serde::{Deserialize, Serialize};

/// What to do with `alternate_meanings` when upstream disagrees with the stored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternateMeaningPolicy {
    KeepLocal,
    PreferUpstream,
    PreferUpstreamIfNonEmpty,
}

impl Default for AlternateMeaningPolicy {
    fn default() -> Self {
        AlternateMeaningPolicy::PreferUpstreamIfNonEmpty
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReconcilePlan {
    pub add_readings: Vec<ReadingKey>,
    /// IDs of the stored readings to delete.
    pub remove_readings: Vec<i32>,
    pub add_parts: Vec<String>,
    pub remove_parts: Vec<String>,
    /// New alternate meanings text, if it changes.
    pub alternate_meanings: Option<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.add_readings.is_empty()
            && self.remove_readings.is_empty()
            && self.add_parts.is_empty()
            && self.remove_parts.is_empty()
            && self.alternate_meanings.is_none()
    }
}

pub fn is_out_of_date(stored: &StoredVocabulary, upstream: &VocabularySnapshot) -> bool {
    stored.reading_keys() != upstream.reading_keys()
        || stored.part_set() != upstream.part_set()
        || stored.vocabulary.alternate_meanings != upstream.alternate_meanings
}

fn merge_alternate_meanings(stored: &str, upstream: &str, policy: AlternateMeaningPolicy) -> Option<String> {
    let wanted = match policy {
        AlternateMeaningPolicy::KeepLocal => stored,
        AlternateMeaningPolicy::PreferUpstream => upstream,
        AlternateMeaningPolicy::PreferUpstreamIfNonEmpty => {
            if upstream.trim().is_empty() { stored } else { upstream }
        }
    };
    if wanted == stored { None } else { Some(wanted.to_owned()) }
}

pub fn plan(stored: &StoredVocabulary,
            upstream: &VocabularySnapshot,
            policy: AlternateMeaningPolicy)
            -> Result<ReconcilePlan> {
    upstream.validate()?;

    let upstream_readings = upstream.reading_keys();
    let stored_readings = stored.reading_keys();

    let add_readings = upstream_readings.difference(&stored_readings).cloned().collect();
    let remove_readings = stored.readings.iter()
        .filter(|r| !upstream_readings.contains(&r.key()))
        .map(|r| r.id)
        .collect();

    let upstream_parts = upstream.part_set();
    let stored_parts = stored.part_set();

    let add_parts = upstream_parts.difference(&stored_parts).map(|p| p.to_string()).collect();
    let remove_parts = stored_parts.difference(&upstream_parts).map(|p| p.to_string()).collect();

    Ok(ReconcilePlan {
        add_readings,
        remove_readings,
        add_parts,
        remove_parts,
        alternate_meanings: merge_alternate_meanings(&stored.vocabulary.alternate_meanings,
                                                     &upstream.alternate_meanings,
                                                     policy),
    })
}

pub fn reconcile<S: VocabularyStore>(store: &S,
                                     stored: &StoredVocabulary,
                                     upstream: &VocabularySnapshot,
                                     policy: AlternateMeaningPolicy)
                                     -> Result<StoredVocabulary> {
    let plan = plan(stored, upstream, policy)?;
    if plan.is_empty() {
        debug!("Vocabulary {} is up to date.", stored.vocabulary.id);
        return Ok(stored.clone());
    }

    let updated = store.apply_reconciliation(&stored.vocabulary, &plan)?;
    info!("Reconciled vocabulary {}: +{} -{} readings, +{} -{} parts of speech.",
          stored.vocabulary.id,
          plan.add_readings.len(),
          plan.remove_readings.len(),
          plan.add_parts.len(),
          plan.remove_parts.len());
    Ok(updated)
}

fn sync_once<S: VocabularyStore>(store: &S,
                                 vocabulary_id: i32,
                                 upstream: &VocabularySnapshot,
                                 policy: AlternateMeaningPolicy)
                                 -> Result<StoredVocabulary> {
    let stored = store.stored_vocabulary(vocabulary_id)?;
    if !is_out_of_date(&stored, upstream) {
        return Ok(stored);
    }
    reconcile(store, &stored, upstream, policy)
}

/// Loads, diffs and applies; a concurrent reconciliation of the same item gets one
/// retry against fresh state before the conflict is reported.
pub fn sync_vocabulary<S: VocabularyStore>(store: &S,
                                           vocabulary_id: i32,
                                           upstream: &VocabularySnapshot,
                                           policy: AlternateMeaningPolicy)
                                           -> Result<StoredVocabulary> {
    match sync_once(store, vocabulary_id, upstream, policy) {
        Err(ref e) if e.is_transient() => {
            warn!("Vocabulary {} changed under us, retrying once.", vocabulary_id);
        }
        result => return result,
    }
    sync_once(store, vocabulary_id, upstream, policy)
}

#[cfg(test)]
fn key(kana: &str, character: &str) -> ReadingKey {
    ReadingKey { kana: kana.into(), character: character.into(), level: 1 }
}

#[cfg(test)]
fn outdated_vocabulary(store: &MemoryStore) -> StoredVocabulary {
    let vocab = store.create_vocabulary("cat", "out_of_date").unwrap();
    for &part in &["verb", "out_of_date"] {
        store.add_part_of_speech(vocab.id, part).unwrap();
    }
    for &(kana, character) in &[("current_kana", "current_character"),
                                ("outdated_kana", "outdated_character"),
                                ("outdated_kana2", "outdated_character2")] {
        store.add_reading(&NewReading::new(vocab.id, &key(kana, character)).unwrap()).unwrap();
    }
    store.stored_vocabulary(vocab.id).unwrap()
}

#[cfg(test)]
fn fresh_snapshot() -> VocabularySnapshot {
    VocabularySnapshot {
        meaning: "cat".into(),
        alternate_meanings: "secondary doesnt matter".into(),
        readings: vec![key("current_kana", "current_character"),
                       key("swanky new kana", "swanky new character")],
        parts_of_speech: vec!["verb".into(), "definitely a verb".into()],
    }
}

#[test]
fn test_vocabulary_should_be_updated() {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let upstream = fresh_snapshot();

    assert!(is_out_of_date(&stored, &upstream));
    let updated = reconcile(&store, &stored, &upstream, AlternateMeaningPolicy::default()).unwrap();

    assert_eq!(updated.reading_count(), 2);
    let kanas: std::collections::BTreeSet<&str> = updated.readings.iter().map(|r| r.kana.as_str()).collect();
    assert!(kanas.contains("swanky new kana"));
    assert!(kanas.contains("current_kana"));
    assert!(!kanas.contains("outdated_kana"));
    assert!(!kanas.contains("outdated_kana2"));

    assert_eq!(updated.parts_of_speech.len(), 2);
    assert!(updated.part_set().contains("verb"));
    assert!(updated.part_set().contains("definitely a verb"));
    assert!(!updated.part_set().contains("out_of_date"));

    // Reloading gives the same picture.
    assert_eq!(store.stored_vocabulary(stored.vocabulary.id).unwrap(), updated);
}

#[test]
fn test_kept_reading_keeps_its_identity() {
    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let current_id = stored.readings.iter().find(|r| r.kana == "current_kana").unwrap().id;

    let updated = reconcile(&store, &stored, &fresh_snapshot(), AlternateMeaningPolicy::KeepLocal).unwrap();
    let current = updated.readings.iter().find(|r| r.kana == "current_kana").unwrap();
    assert_eq!(current.id, current_id);
}

#[test]
fn test_plan_lists_explicit_adds_and_removes() {
    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let plan = plan(&stored, &fresh_snapshot(), AlternateMeaningPolicy::KeepLocal).unwrap();

    assert_eq!(plan.add_readings, vec![key("swanky new kana", "swanky new character")]);
    assert_eq!(plan.remove_readings.len(), 2);
    assert_eq!(plan.add_parts, vec!["definitely a verb".to_string()]);
    assert_eq!(plan.remove_parts, vec!["out_of_date".to_string()]);
    assert_eq!(plan.alternate_meanings, None);
}

#[test]
fn test_reconciled_vocabulary_is_up_to_date() {
    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let upstream = fresh_snapshot();
    let updated = sync_vocabulary(&store, stored.vocabulary.id, &upstream, AlternateMeaningPolicy::PreferUpstream).unwrap();

    assert!(!is_out_of_date(&updated, &upstream));
    assert!(plan(&updated, &upstream, AlternateMeaningPolicy::PreferUpstream).unwrap().is_empty());

    let again = sync_vocabulary(&store, stored.vocabulary.id, &upstream, AlternateMeaningPolicy::PreferUpstream).unwrap();
    assert_eq!(again, updated);
}

#[test]
fn test_reconcile_leaves_learner_data_alone() {
    use crate::{review, synonym};
    use chrono::Utc;

    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let now = Utc::now();
    let review = store.create_review(&review::new_review(1, stored.vocabulary.id, now)).unwrap();
    synonym::add_synonym(&store, review.id, "minou").unwrap();
    synonym::add_reading_synonym(&store, review.id, "shwoop", "fwoop").unwrap();
    let review = review::edit(&store, review.id, |r| Ok(review::set_notes(&review::toggle_hidden(r), Some("a note")))).unwrap();

    sync_vocabulary(&store, stored.vocabulary.id, &fresh_snapshot(), AlternateMeaningPolicy::default()).unwrap();

    assert_eq!(store.review(review.id).unwrap(), review);
    assert_eq!(synonym::all_synonyms_as_text(&store, review.id).unwrap(), vec!["minou".to_string()]);
    assert_eq!(store.reading_synonyms(review.id).unwrap().len(), 1);
}

#[test]
fn test_invalid_upstream_level_changes_nothing() {
    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let mut upstream = fresh_snapshot();
    upstream.readings.push(ReadingKey { kana: "ねこ".into(), character: "猫".into(), level: 0 });

    match sync_vocabulary(&store, stored.vocabulary.id, &upstream, AlternateMeaningPolicy::default()) {
        Err(Error(ErrorKind::InvalidReadingLevel(0), _)) => (),
        other => panic!("Expected InvalidReadingLevel, got {:?}", other),
    }
    assert_eq!(store.stored_vocabulary(stored.vocabulary.id).unwrap(), stored);
}

#[test]
fn test_alternate_meaning_policies() {
    assert_eq!(merge_alternate_meanings("old", "new", AlternateMeaningPolicy::KeepLocal), None);
    assert_eq!(merge_alternate_meanings("old", "new", AlternateMeaningPolicy::PreferUpstream), Some("new".into()));
    assert_eq!(merge_alternate_meanings("old", "", AlternateMeaningPolicy::PreferUpstream), Some("".into()));
    assert_eq!(merge_alternate_meanings("old", "new", AlternateMeaningPolicy::PreferUpstreamIfNonEmpty), Some("new".into()));
    assert_eq!(merge_alternate_meanings("old", "  ", AlternateMeaningPolicy::PreferUpstreamIfNonEmpty), None);
    assert_eq!(merge_alternate_meanings("same", "same", AlternateMeaningPolicy::PreferUpstream), None);
}

// Which side should win for alternate meanings is still undecided, so this only
// documents the candidate expectation instead of asserting it.
#[test]
#[ignore = "precedence of upstream alternate meanings is unresolved"]
fn test_alternate_meanings_follow_upstream() {
    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let updated = reconcile(&store, &stored, &fresh_snapshot(), AlternateMeaningPolicy::default()).unwrap();
    assert_eq!(updated.vocabulary.alternate_meanings, "secondary doesnt matter");
}

#[test]
fn test_stale_reconciliation_is_refused() {
    let store = MemoryStore::new();
    let stored = outdated_vocabulary(&store);
    let upstream = fresh_snapshot();

    reconcile(&store, &stored, &upstream, AlternateMeaningPolicy::default()).unwrap();

    let mut other = upstream.clone();
    other.parts_of_speech.push("noun".into());
    match reconcile(&store, &stored, &other, AlternateMeaningPolicy::default()) {
        Err(ref e) if e.is_transient() => (),
        result => panic!("Expected StaleWrite, got {:?}", result),
    }
}
