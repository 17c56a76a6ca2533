use super::*;
use crate::upstream::VocabularySnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MIN_READING_LEVEL: i32 = 1;
pub const MAX_READING_LEVEL: i32 = 60;

pub fn validate_level(level: i32) -> Result<()> {
    if level < MIN_READING_LEVEL || level > MAX_READING_LEVEL {
        warn!("Rejected a reading with level {}.", level);
        return Err(ErrorKind::InvalidReadingLevel(level).into());
    }
    Ok(())
}

/// Natural key of a reading; two readings with the same key are the same reading.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReadingKey {
    pub kana: String,
    pub character: String,
    pub level: i32,
}

impl ReadingKey {
    pub fn validate(&self) -> Result<()> {
        validate_level(self.level)
    }
}

impl Reading {
    pub fn key(&self) -> ReadingKey {
        ReadingKey {
            kana: self.kana.clone(),
            character: self.character.clone(),
            level: self.level,
        }
    }
}

impl NewReading {
    pub fn new(vocabulary_id: i32, key: &ReadingKey) -> Result<NewReading> {
        key.validate()?;
        Ok(NewReading {
            vocabulary_id,
            kana: key.kana.clone(),
            character: key.character.clone(),
            level: key.level,
        })
    }
}

/// A vocabulary row together with the rows it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredVocabulary {
    pub vocabulary: Vocabulary,
    pub readings: Vec<Reading>,
    pub parts_of_speech: Vec<String>,
}

impl StoredVocabulary {

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    pub fn reading_keys(&self) -> BTreeSet<ReadingKey> {
        self.readings.iter().map(Reading::key).collect()
    }

    pub fn part_set(&self) -> BTreeSet<&str> {
        self.parts_of_speech.iter().map(|p| p.as_str()).collect()
    }
}

/// Imports a vocabulary item the store doesn't know yet.
pub fn create_vocabulary<S: VocabularyStore>(store: &S, snapshot: &VocabularySnapshot) -> Result<StoredVocabulary> {
    snapshot.validate()?;

    let vocabulary = store.create_vocabulary(&snapshot.meaning, &snapshot.alternate_meanings)?;
    for key in snapshot.reading_keys() {
        store.add_reading(&NewReading::new(vocabulary.id, &key)?)?;
    }
    for part in snapshot.part_set() {
        store.add_part_of_speech(vocabulary.id, part)?;
    }

    info!("Imported vocabulary {} ({:?}).", vocabulary.id, vocabulary.meaning);
    store.stored_vocabulary(vocabulary.id)
}


#[test]
fn test_reading_level_bounds() {
    assert!(validate_level(1).is_ok());
    assert!(validate_level(60).is_ok());
    match validate_level(61) {
        Err(Error(ErrorKind::InvalidReadingLevel(61), _)) => (),
        other => panic!("Expected InvalidReadingLevel, got {:?}", other),
    }
    match validate_level(0) {
        Err(Error(ErrorKind::InvalidReadingLevel(0), _)) => (),
        other => panic!("Expected InvalidReadingLevel, got {:?}", other),
    }
}

#[test]
fn test_new_reading_rejects_invalid_level() {
    let key = ReadingKey { kana: "ねこ".into(), character: "ねこ".into(), level: 61 };
    assert!(NewReading::new(1, &key).is_err());
}

#[test]
fn test_vocab_number_readings_is_correct() {
    let store = MemoryStore::new();
    let cat = store.create_vocabulary("cat", "").unwrap();
    let nekos = [("ねこ", "ねこ", 2), ("ねこな", "猫", 1)];
    for &(kana, character, level) in &nekos {
        let key = ReadingKey { kana: kana.into(), character: character.into(), level };
        store.add_reading(&NewReading::new(cat.id, &key).unwrap()).unwrap();
    }
    assert_eq!(store.stored_vocabulary(cat.id).unwrap().reading_count(), 2);
}

#[test]
fn test_create_vocabulary_from_snapshot() {
    let store = MemoryStore::new();
    let snapshot = VocabularySnapshot {
        meaning: "one".into(),
        alternate_meanings: "1".into(),
        readings: vec![
            ReadingKey { kana: "いち".into(), character: "一".into(), level: 1 },
            ReadingKey { kana: "いち".into(), character: "一".into(), level: 1 },
        ],
        parts_of_speech: vec!["numeral".into(), "noun".into()],
    };
    let stored = create_vocabulary(&store, &snapshot).unwrap();
    assert_eq!(stored.reading_count(), 1);
    assert_eq!(stored.parts_of_speech, vec!["noun".to_string(), "numeral".to_string()]);
    assert_eq!(stored.vocabulary.alternate_meanings, "1");
}
