use super::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    last_id: i32,
    vocabulary: BTreeMap<i32, Vocabulary>,
    readings: BTreeMap<i32, Reading>,
    parts_of_speech: BTreeSet<(i32, String)>,
    reviews: BTreeMap<i32, Review>,
    meaning_synonyms: BTreeMap<i32, MeaningSynonym>,
    reading_synonyms: BTreeMap<i32, ReadingSynonym>,
    tags: BTreeMap<i32, Tag>,
    tag_readings: BTreeSet<(i32, i32)>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn check_review(&self, id: i32) -> Result<()> {
        if self.reviews.contains_key(&id) {
            Ok(())
        } else {
            Err(ErrorKind::NoSuchRecord("review", id).into())
        }
    }

    fn stored_vocabulary(&self, id: i32) -> Result<StoredVocabulary> {
        let vocabulary = self.vocabulary.get(&id)
            .cloned()
            .ok_or_else(|| ErrorKind::NoSuchRecord("vocabulary", id))?;
        let readings = self.readings.values()
            .filter(|r| r.vocabulary_id == id)
            .cloned()
            .collect();
        let parts_of_speech = self.parts_of_speech.iter()
            .filter(|&&(v, _)| v == id)
            .map(|&(_, ref part)| part.clone())
            .collect();
        Ok(StoredVocabulary { vocabulary, readings, parts_of_speech })
    }

    fn insert_reading(&mut self, new: &NewReading) -> Result<Reading> {
        crate::vocabulary::validate_level(new.level)?;
        if !self.vocabulary.contains_key(&new.vocabulary_id) {
            bail!(ErrorKind::NoSuchRecord("vocabulary", new.vocabulary_id));
        }
        if let Some(existing) = self.readings.values().find(|r| {
            r.vocabulary_id == new.vocabulary_id
                && r.kana == new.kana
                && r.character == new.character
                && r.level == new.level
        }) {
            return Ok(existing.clone());
        }
        let reading = Reading {
            id: self.next_id(),
            vocabulary_id: new.vocabulary_id,
            kana: new.kana.clone(),
            character: new.character.clone(),
            level: new.level,
        };
        self.readings.insert(reading.id, reading.clone());
        Ok(reading)
    }
}

/// Keeps every table in process memory behind one lock.
///
/// Upholds the same uniqueness, cascade and version rules as the database schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {

    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<Tables>> {
        self.tables.read().map_err(|_| "Poisoned locks?".into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<Tables>> {
        self.tables.write().map_err(|_| "Poisoned locks?".into())
    }
}

impl ReviewStore for MemoryStore {

    fn review(&self, id: i32) -> Result<Review> {
        self.read()?
            .reviews
            .get(&id)
            .cloned()
            .ok_or_else(|| ErrorKind::NoSuchRecord("review", id).into())
    }

    fn create_review(&self, new: &NewReview) -> Result<Review> {
        let mut tables = self.write()?;
        if !tables.vocabulary.contains_key(&new.vocabulary_id) {
            bail!(ErrorKind::NoSuchRecord("vocabulary", new.vocabulary_id));
        }
        if tables.reviews.values().any(|r| r.user_id == new.user_id && r.vocabulary_id == new.vocabulary_id) {
            bail!(ErrorKind::DuplicateReview(new.user_id, new.vocabulary_id));
        }
        let review = Review {
            id: tables.next_id(),
            user_id: new.user_id,
            vocabulary_id: new.vocabulary_id,
            streak: 0,
            correct: 0,
            incorrect: 0,
            critical: false,
            burned: false,
            hidden: false,
            last_studied: None,
            next_review_date: new.next_review_date,
            notes: None,
            version: 0,
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn update_review(&self, review: &Review) -> Result<Review> {
        let mut tables = self.write()?;
        let stored_version = match tables.reviews.get(&review.id) {
            Some(stored) => stored.version,
            None => bail!(ErrorKind::NoSuchRecord("review", review.id)),
        };
        if stored_version != review.version {
            bail!(ErrorKind::StaleWrite("review", review.id));
        }
        let updated = Review { version: review.version + 1, ..review.clone() };
        tables.reviews.insert(updated.id, updated.clone());
        Ok(updated)
    }

    fn due_reviews(&self, user_id: i32, now: DateTime<Utc>) -> Result<Vec<Review>> {
        let mut due: Vec<Review> = self.read()?
            .reviews
            .values()
            .filter(|r| r.user_id == user_id && !r.burned && !r.hidden && r.next_review_date <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| (r.next_review_date, r.id));
        Ok(due)
    }
}

impl SynonymStore for MemoryStore {

    fn meaning_synonyms(&self, review_id: i32) -> Result<Vec<MeaningSynonym>> {
        Ok(self.read()?
            .meaning_synonyms
            .values()
            .filter(|s| s.review_id == review_id)
            .cloned()
            .collect())
    }

    fn create_meaning_synonym(&self, review_id: i32, text: &str) -> Result<MeaningSynonym> {
        let mut tables = self.write()?;
        tables.check_review(review_id)?;
        if let Some(existing) = tables.meaning_synonyms.values().find(|s| s.review_id == review_id && s.text == text) {
            return Ok(existing.clone());
        }
        let synonym = MeaningSynonym { id: tables.next_id(), review_id, text: text.to_owned() };
        tables.meaning_synonyms.insert(synonym.id, synonym.clone());
        Ok(synonym)
    }

    fn delete_meaning_synonym(&self, id: i32) -> Result<()> {
        match self.write()?.meaning_synonyms.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ErrorKind::NoSuchRecord("meaning synonym", id).into()),
        }
    }

    fn reading_synonyms(&self, review_id: i32) -> Result<Vec<ReadingSynonym>> {
        Ok(self.read()?
            .reading_synonyms
            .values()
            .filter(|s| s.review_id == review_id)
            .cloned()
            .collect())
    }

    fn create_reading_synonym(&self, review_id: i32, kana: &str, character: &str) -> Result<ReadingSynonym> {
        let mut tables = self.write()?;
        tables.check_review(review_id)?;
        if let Some(existing) = tables.reading_synonyms.values()
            .find(|s| s.review_id == review_id && s.kana == kana && s.character == character) {
            return Ok(existing.clone());
        }
        let synonym = ReadingSynonym {
            id: tables.next_id(),
            review_id,
            kana: kana.to_owned(),
            character: character.to_owned(),
        };
        tables.reading_synonyms.insert(synonym.id, synonym.clone());
        Ok(synonym)
    }

    fn delete_reading_synonym(&self, id: i32) -> Result<()> {
        match self.write()?.reading_synonyms.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ErrorKind::NoSuchRecord("reading synonym", id).into()),
        }
    }
}

impl VocabularyStore for MemoryStore {

    fn create_vocabulary(&self, meaning: &str, alternate_meanings: &str) -> Result<Vocabulary> {
        let mut tables = self.write()?;
        let vocabulary = Vocabulary {
            id: tables.next_id(),
            meaning: meaning.to_owned(),
            alternate_meanings: alternate_meanings.to_owned(),
            version: 0,
        };
        tables.vocabulary.insert(vocabulary.id, vocabulary.clone());
        Ok(vocabulary)
    }

    fn stored_vocabulary(&self, id: i32) -> Result<StoredVocabulary> {
        self.read()?.stored_vocabulary(id)
    }

    fn add_reading(&self, reading: &NewReading) -> Result<Reading> {
        self.write()?.insert_reading(reading)
    }

    fn add_part_of_speech(&self, vocabulary_id: i32, part: &str) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.vocabulary.contains_key(&vocabulary_id) {
            bail!(ErrorKind::NoSuchRecord("vocabulary", vocabulary_id));
        }
        tables.parts_of_speech.insert((vocabulary_id, part.to_owned()));
        Ok(())
    }

    fn apply_reconciliation(&self, vocabulary: &Vocabulary, plan: &ReconcilePlan) -> Result<StoredVocabulary> {
        let mut tables = self.write()?;
        let id = vocabulary.id;

        let mut stored = tables.vocabulary.get(&id)
            .cloned()
            .ok_or_else(|| ErrorKind::NoSuchRecord("vocabulary", id))?;
        if stored.version != vocabulary.version {
            bail!(ErrorKind::StaleWrite("vocabulary", id));
        }
        // Validate everything before touching anything.
        for key in &plan.add_readings {
            key.validate()?;
        }

        stored.version += 1;
        if let Some(ref alternate_meanings) = plan.alternate_meanings {
            stored.alternate_meanings = alternate_meanings.clone();
        }
        tables.vocabulary.insert(id, stored);

        for reading_id in &plan.remove_readings {
            if tables.readings.get(reading_id).map(|r| r.vocabulary_id) == Some(id) {
                tables.readings.remove(reading_id);
                tables.tag_readings.retain(|&(_, r)| r != *reading_id);
            }
        }
        for key in &plan.add_readings {
            tables.insert_reading(&NewReading::new(id, key)?)?;
        }
        for part in &plan.remove_parts {
            tables.parts_of_speech.remove(&(id, part.clone()));
        }
        for part in &plan.add_parts {
            tables.parts_of_speech.insert((id, part.clone()));
        }

        tables.stored_vocabulary(id)
    }
}

impl TagStore for MemoryStore {

    fn create_tag(&self, name: &str) -> Result<Tag> {
        let mut tables = self.write()?;
        if tables.tags.values().any(|t| t.name == name) {
            bail!(ErrorKind::DuplicateTag(name.to_owned()));
        }
        let tag = Tag { id: tables.next_id(), name: name.to_owned() };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    fn tag_by_name(&self, name: &str) -> Result<Tag> {
        self.read()?
            .tags
            .values()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| ErrorKind::NoSuchTag(name.to_owned()).into())
    }

    fn tag_reading(&self, tag_id: i32, reading_id: i32) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.tags.contains_key(&tag_id) {
            bail!(ErrorKind::NoSuchRecord("tag", tag_id));
        }
        if !tables.readings.contains_key(&reading_id) {
            bail!(ErrorKind::NoSuchRecord("reading", reading_id));
        }
        tables.tag_readings.insert((tag_id, reading_id));
        Ok(())
    }

    fn tagged_vocabulary(&self, tag_id: i32) -> Result<Vec<Vocabulary>> {
        let tables = self.read()?;
        let tagged = tables.tag_readings.iter()
            .filter(|&&(t, _)| t == tag_id)
            .filter_map(|&(_, r)| tables.readings.get(&r));
        Ok(crate::tag::distinct_vocabulary_ids(tagged)
            .into_iter()
            .filter_map(|id| tables.vocabulary.get(&id).cloned())
            .collect())
    }
}


#[test]
fn test_update_review_bumps_version_and_refuses_stale() {
    use chrono::TimeZone;
    let store = MemoryStore::new();
    let vocab = store.create_vocabulary("dog", "").unwrap();
    let date = Utc.with_ymd_and_hms(2017, 1, 1, 10, 0, 0).unwrap();
    let review = store.create_review(&NewReview { user_id: 1, vocabulary_id: vocab.id, next_review_date: date }).unwrap();
    assert_eq!(review.version, 0);

    let updated = store.update_review(&Review { streak: 1, ..review.clone() }).unwrap();
    assert_eq!(updated.version, 1);
    assert_eq!(updated.streak, 1);

    let err = store.update_review(&Review { streak: 5, ..review }).unwrap_err();
    assert!(err.is_transient());
    assert_eq!(store.review(updated.id).unwrap().streak, 1);
}

#[test]
fn test_review_is_unique_per_user_and_vocabulary() {
    use chrono::TimeZone;
    let store = MemoryStore::new();
    let vocab = store.create_vocabulary("dog", "").unwrap();
    let date = Utc.with_ymd_and_hms(2017, 1, 1, 10, 0, 0).unwrap();
    let new = NewReview { user_id: 1, vocabulary_id: vocab.id, next_review_date: date };
    store.create_review(&new).unwrap();
    assert!(store.create_review(&new).unwrap_err().is_conflict());
    assert!(store.create_review(&NewReview { vocabulary_id: 404, ..new }).unwrap_err().is_not_found());
}

#[test]
fn test_synonyms_need_an_existing_review() {
    let store = MemoryStore::new();
    assert!(store.create_meaning_synonym(404, "woof").unwrap_err().is_not_found());
    assert!(store.create_reading_synonym(404, "いぬ", "犬").unwrap_err().is_not_found());
    assert!(store.delete_reading_synonym(404).unwrap_err().is_not_found());
}
