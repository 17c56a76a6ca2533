//! The storage seam. Everything above it works on plain records; `PgStore` is the
//! production adapter and `MemoryStore` keeps the same contract in process memory.
//!
//! Callers wrap a read-modify-write in whatever transaction boundary they have.
//! Updates to reviews and vocabulary are conditional on the record's `version` and
//! fail with `StaleWrite` when somebody else got there first.

use super::*;
use chrono::{DateTime, Utc};
use crate::reconcile::ReconcilePlan;
use crate::vocabulary::StoredVocabulary;

mod memory;
mod pg;

pub use self::memory::MemoryStore;
pub use self::pg::PgStore;

pub trait ReviewStore {
    fn review(&self, id: i32) -> Result<Review>;
    fn create_review(&self, new: &NewReview) -> Result<Review>;
    /// Writes `review` if the stored version still equals `review.version`,
    /// returning the stored record with its version bumped.
    fn update_review(&self, review: &Review) -> Result<Review>;
    /// Unburned, unhidden reviews of the user due at `now`, earliest first.
    fn due_reviews(&self, user_id: i32, now: DateTime<Utc>) -> Result<Vec<Review>>;
}

pub trait SynonymStore {
    fn meaning_synonyms(&self, review_id: i32) -> Result<Vec<MeaningSynonym>>;
    /// Idempotent: returns the existing row if the text is already there.
    fn create_meaning_synonym(&self, review_id: i32, text: &str) -> Result<MeaningSynonym>;
    fn delete_meaning_synonym(&self, id: i32) -> Result<()>;
    fn reading_synonyms(&self, review_id: i32) -> Result<Vec<ReadingSynonym>>;
    fn create_reading_synonym(&self, review_id: i32, kana: &str, character: &str) -> Result<ReadingSynonym>;
    fn delete_reading_synonym(&self, id: i32) -> Result<()>;
}

pub trait VocabularyStore {
    fn create_vocabulary(&self, meaning: &str, alternate_meanings: &str) -> Result<Vocabulary>;
    fn stored_vocabulary(&self, id: i32) -> Result<StoredVocabulary>;
    fn add_reading(&self, reading: &NewReading) -> Result<Reading>;
    fn add_part_of_speech(&self, vocabulary_id: i32, part: &str) -> Result<()>;
    /// Applies the whole plan atomically, conditional on `vocabulary.version`.
    fn apply_reconciliation(&self, vocabulary: &Vocabulary, plan: &ReconcilePlan) -> Result<StoredVocabulary>;
}

pub trait TagStore {
    fn create_tag(&self, name: &str) -> Result<Tag>;
    fn tag_by_name(&self, name: &str) -> Result<Tag>;
    fn tag_reading(&self, tag_id: i32, reading_id: i32) -> Result<()>;
    /// Every vocabulary item that has at least one reading with the tag, once.
    fn tagged_vocabulary(&self, tag_id: i32) -> Result<Vec<Vocabulary>>;
}
