//! Learner-added meanings and readings, kept per review.

use super::*;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

fn normalize(text: &str) -> String {
    text.trim().nfc().collect()
}

fn normalize_new(text: &str) -> Result<String> {
    let text = normalize(text);
    if text.is_empty() {
        bail!(ErrorKind::BlankSynonym);
    }
    Ok(text)
}

pub fn add_synonym<S: SynonymStore>(store: &S, review_id: i32, text: &str) -> Result<MeaningSynonym> {
    let text = normalize_new(text)?;
    if let Some(existing) = store.meaning_synonyms(review_id)?.into_iter().find(|s| s.text == text) {
        return Ok(existing);
    }
    let synonym = store.create_meaning_synonym(review_id, &text)?;
    debug!("Added synonym {:?} to review {}.", synonym.text, review_id);
    Ok(synonym)
}

pub fn remove_synonym<S: SynonymStore>(store: &S, review_id: i32, text: &str) -> Result<()> {
    let text = normalize(text);
    let synonym = store.meaning_synonyms(review_id)?
        .into_iter()
        .find(|s| s.text == text)
        .ok_or_else(|| ErrorKind::NoSuchSynonym(text.clone()))?;
    store.delete_meaning_synonym(synonym.id)
}

/// Removes a synonym previously handed out by `add_synonym` or `meaning_synonyms`.
pub fn remove_synonym_by_handle<S: SynonymStore>(store: &S, synonym: &MeaningSynonym) -> Result<()> {
    store.delete_meaning_synonym(synonym.id)
}

pub fn all_synonyms_as_text<S: SynonymStore>(store: &S, review_id: i32) -> Result<Vec<String>> {
    Ok(store.meaning_synonyms(review_id)?.into_iter().map(|s| s.text).collect())
}

pub fn synonyms_string<S: SynonymStore>(store: &S, review_id: i32) -> Result<String> {
    Ok(all_synonyms_as_text(store, review_id)?.join(", "))
}

pub fn add_reading_synonym<S: SynonymStore>(store: &S,
                                            review_id: i32,
                                            kana: &str,
                                            character: &str)
                                            -> Result<ReadingSynonym> {
    let (kana, character) = (normalize_new(kana)?, normalize_new(character)?);
    if let Some(existing) = store.reading_synonyms(review_id)?
        .into_iter()
        .find(|s| s.kana == kana && s.character == character) {
        return Ok(existing);
    }
    store.create_reading_synonym(review_id, &kana, &character)
}

pub fn remove_reading_synonym<S: SynonymStore>(store: &S, review_id: i32, kana: &str, character: &str) -> Result<()> {
    let (kana, character) = (normalize(kana), normalize(character));
    let synonym = store.reading_synonyms(review_id)?
        .into_iter()
        .find(|s| s.kana == kana && s.character == character)
        .ok_or_else(|| ErrorKind::NoSuchSynonym(format!("{} ({})", character, kana)))?;
    store.delete_reading_synonym(synonym.id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedReading {
    pub kana: String,
    pub character: String,
    pub learner_added: bool,
}

/// The vocabulary's own readings first, then the ones the learner added.
pub fn all_readings<S>(store: &S, review_id: i32) -> Result<Vec<AcceptedReading>>
    where S: ReviewStore + SynonymStore + VocabularyStore
{
    let review = store.review(review_id)?;
    let vocabulary = store.stored_vocabulary(review.vocabulary_id)?;

    let own = vocabulary.readings.into_iter().map(|r| AcceptedReading {
        kana: r.kana,
        character: r.character,
        learner_added: false,
    });
    let added = store.reading_synonyms(review_id)?.into_iter().map(|s| AcceptedReading {
        kana: s.kana,
        character: s.character,
        learner_added: true,
    });
    Ok(own.chain(added).collect())
}


#[cfg(test)]
fn review_with_minou(store: &MemoryStore) -> Review {
    let vocab = store.create_vocabulary("cat", "").unwrap();
    let review = store.create_review(&review::new_review(1, vocab.id, chrono::Utc::now())).unwrap();
    add_synonym(store, review.id, "minou").unwrap();
    review
}

#[test]
fn test_adding_synonym_works() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    add_synonym(&store, review.id, "une petite chatte").unwrap();
    assert_eq!(all_synonyms_as_text(&store, review.id).unwrap().len(), 2);
}

#[test]
fn test_adding_synonym_is_idempotent() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    let first = add_synonym(&store, review.id, "kitty").unwrap();
    let second = add_synonym(&store, review.id, "  kitty ").unwrap();
    assert_eq!(first, second);
    assert_eq!(all_synonyms_as_text(&store, review.id).unwrap(), vec!["minou".to_string(), "kitty".to_string()]);
    assert_eq!(synonyms_string(&store, review.id).unwrap(), "minou, kitty");
}

#[test]
fn test_synonyms_are_compared_normalized() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    // "が" precomposed and as か + combining dakuten.
    add_synonym(&store, review.id, "\u{304C}").unwrap();
    add_synonym(&store, review.id, "\u{304B}\u{3099}").unwrap();
    assert_eq!(all_synonyms_as_text(&store, review.id).unwrap().len(), 2);
    remove_synonym(&store, review.id, "\u{304B}\u{3099}").unwrap();
    assert_eq!(all_synonyms_as_text(&store, review.id).unwrap(), vec!["minou".to_string()]);
}

#[test]
fn test_removing_synonym_by_lookup_works() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    remove_synonym(&store, review.id, "minou").unwrap();
    assert!(!all_synonyms_as_text(&store, review.id).unwrap().contains(&"minou".to_string()));
}

#[test]
fn test_removing_nonexistent_synonym_fails() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    let err = remove_synonym(&store, review.id, "un chien").unwrap_err();
    assert!(err.is_not_found());
    match *err.kind() {
        ErrorKind::NoSuchSynonym(ref text) => assert_eq!(text, "un chien"),
        ref other => panic!("Expected NoSuchSynonym, got {:?}", other),
    }
}

#[test]
fn test_removing_synonym_by_handle_works() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    let handle = add_synonym(&store, review.id, "minou").unwrap();
    remove_synonym_by_handle(&store, &handle).unwrap();
    assert!(all_synonyms_as_text(&store, review.id).unwrap().is_empty());
    assert!(remove_synonym_by_handle(&store, &handle).unwrap_err().is_not_found());
}

#[test]
fn test_synonyms_belong_to_their_review() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    let other = review_with_minou(&store);
    remove_synonym(&store, review.id, "minou").unwrap();
    assert_eq!(all_synonyms_as_text(&store, other.id).unwrap(), vec!["minou".to_string()]);
}

#[test]
fn test_blank_synonyms_are_rejected() {
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    for blank in &["", "   ", "\t\n"] {
        match add_synonym(&store, review.id, blank) {
            Err(Error(ErrorKind::BlankSynonym, _)) => (),
            other => panic!("Expected BlankSynonym, got {:?}", other),
        }
    }
    assert!(add_reading_synonym(&store, review.id, " ", "猫").is_err());
    assert!(add_reading_synonym(&store, review.id, "ねこ", "").is_err());
    assert_eq!(synonyms_string(&store, review.id).unwrap(), "minou");
    assert!(store.reading_synonyms(review.id).unwrap().is_empty());
}

#[test]
fn test_synonym_on_missing_review_fails() {
    let store = MemoryStore::new();
    assert!(add_synonym(&store, 404, "kitty").unwrap_err().is_not_found());
}

#[test]
fn test_get_all_readings_returns_original_and_added_readings() {
    use crate::vocabulary::ReadingKey;
    let store = MemoryStore::new();
    let review = review_with_minou(&store);
    let key = ReadingKey { kana: "what".into(), character: "ars".into(), level: 5 };
    store.add_reading(&NewReading::new(review.vocabulary_id, &key).unwrap()).unwrap();
    add_reading_synonym(&store, review.id, "shwoop", "fwoop").unwrap();
    add_reading_synonym(&store, review.id, "shwoop", "fwoop").unwrap();

    let readings = all_readings(&store, review.id).unwrap();
    assert_eq!(readings, vec![
        AcceptedReading { kana: "what".into(), character: "ars".into(), learner_added: false },
        AcceptedReading { kana: "shwoop".into(), character: "fwoop".into(), learner_added: true },
    ]);

    remove_reading_synonym(&store, review.id, "shwoop", "fwoop").unwrap();
    assert!(remove_reading_synonym(&store, review.id, "shwoop", "fwoop").unwrap_err().is_not_found());
    assert_eq!(all_readings(&store, review.id).unwrap().len(), 1);
}
