//! Snapshots of vocabulary as the upstream source describes it.
//!
//! Fetching is somebody else's job; this only decodes what was fetched. Both the plain
//! snapshot shape and a WaniKani v2 style vocabulary subject are accepted.

use super::*;
use crate::vocabulary::ReadingKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularySnapshot {
    pub meaning: String,
    #[serde(default)]
    pub alternate_meanings: String,
    pub readings: Vec<ReadingKey>,
    #[serde(default)]
    pub parts_of_speech: Vec<String>,
}

impl VocabularySnapshot {

    pub fn from_json(json: &str) -> Result<VocabularySnapshot> {
        let snapshot = match serde_json::from_str::<Payload>(json)? {
            Payload::Subject(subject) => from_subject(subject.data),
            Payload::Snapshot(snapshot) => snapshot,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Readings outside the level range are rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        for reading in &self.readings {
            reading.validate()?;
        }
        Ok(())
    }

    pub fn reading_keys(&self) -> BTreeSet<ReadingKey> {
        self.readings.iter().cloned().collect()
    }

    pub fn part_set(&self) -> BTreeSet<&str> {
        self.parts_of_speech.iter().map(|p| p.as_str()).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Subject(Subject),
    Snapshot(VocabularySnapshot),
}

#[derive(Deserialize)]
struct Subject {
    data: SubjectData,
}

#[derive(Deserialize)]
struct SubjectData {
    level: i32,
    characters: String,
    meanings: Vec<SubjectMeaning>,
    readings: Vec<SubjectReading>,
    #[serde(default)]
    parts_of_speech: Vec<String>,
}

#[derive(Deserialize)]
struct SubjectMeaning {
    meaning: String,
    #[serde(default)]
    primary: bool,
}

#[derive(Deserialize)]
struct SubjectReading {
    reading: String,
}

fn from_subject(data: SubjectData) -> VocabularySnapshot {
    let SubjectData { level, characters, meanings, readings, parts_of_speech } = data;

    let meaning = meanings.iter()
        .find(|m| m.primary)
        .or_else(|| meanings.first())
        .map(|m| m.meaning.clone())
        .unwrap_or_default();

    let alternate_meanings = meanings.iter()
        .filter(|m| m.meaning != meaning)
        .map(|m| m.meaning.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let readings = readings.into_iter()
        .map(|r| ReadingKey {
            kana: r.reading,
            character: characters.clone(),
            level,
        })
        .collect();

    VocabularySnapshot {
        meaning,
        alternate_meanings,
        readings,
        parts_of_speech,
    }
}


#[test]
fn test_decode_wanikani_subject() {
    let json = r#"{
        "id": 2467,
        "object": "vocabulary",
        "data": {
            "level": 1,
            "characters": "一",
            "meanings": [
                { "meaning": "One", "primary": true, "accepted_answer": true },
                { "meaning": "Uno", "primary": false, "accepted_answer": true },
                { "meaning": "Single", "primary": false, "accepted_answer": true }
            ],
            "readings": [
                { "primary": true, "reading": "いち", "accepted_answer": true }
            ],
            "parts_of_speech": ["numeral"]
        }
    }"#;
    let snapshot = VocabularySnapshot::from_json(json).unwrap();
    assert_eq!(snapshot.meaning, "One");
    assert_eq!(snapshot.alternate_meanings, "Uno, Single");
    assert_eq!(snapshot.readings, vec![ReadingKey { kana: "いち".into(), character: "一".into(), level: 1 }]);
    assert_eq!(snapshot.parts_of_speech, vec!["numeral".to_string()]);
}

#[test]
fn test_decode_plain_snapshot() {
    let json = r#"{
        "meaning": "cat",
        "readings": [{ "kana": "ねこ", "character": "猫", "level": 3 }]
    }"#;
    let snapshot = VocabularySnapshot::from_json(json).unwrap();
    assert_eq!(snapshot.alternate_meanings, "");
    assert!(snapshot.parts_of_speech.is_empty());
    assert_eq!(snapshot.reading_keys().len(), 1);
}

#[test]
fn test_decode_rejects_out_of_range_level() {
    let json = r#"{
        "meaning": "cat",
        "readings": [{ "kana": "ねこ", "character": "猫", "level": 61 }]
    }"#;
    match VocabularySnapshot::from_json(json) {
        Err(Error(ErrorKind::InvalidReadingLevel(61), _)) => (),
        other => panic!("Expected InvalidReadingLevel, got {:?}", other),
    }
}

#[test]
fn test_decode_garbage_fails() {
    assert!(VocabularySnapshot::from_json(r#"{ "nope": true }"#).is_err());
}
