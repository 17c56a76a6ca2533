use super::schema::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Insertable, Debug, Clone)]
#[table_name="vocabulary"]
pub struct NewVocabulary<'a> {
    pub meaning: &'a str,
    pub alternate_meanings: &'a str,
}

#[derive(Identifiable, Queryable, Debug, Clone, PartialEq, Serialize)]
#[table_name="vocabulary"]
pub struct Vocabulary {
    pub id: i32,
    pub meaning: String,
    pub alternate_meanings: String,
    pub version: i32,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[table_name="readings"]
pub struct NewReading {
    pub vocabulary_id: i32,
    pub kana: String,
    pub character: String,
    pub level: i32,
}

#[derive(Identifiable, Queryable, Debug, Clone, PartialEq, Serialize)]
#[table_name="readings"]
pub struct Reading {
    pub id: i32,
    pub vocabulary_id: i32,
    pub kana: String,
    pub character: String,
    pub level: i32,
}

#[derive(Insertable, Queryable, Debug, Clone, PartialEq, Serialize)]
#[table_name="parts_of_speech"]
pub struct PartOfSpeech {
    pub vocabulary_id: i32,
    pub part: String,
}

/// One per learner and vocabulary item.
#[derive(Insertable, Debug, Clone)]
#[table_name="reviews"]
pub struct NewReview {
    pub user_id: i32,
    pub vocabulary_id: i32,
    pub next_review_date: DateTime<Utc>,
}

#[derive(Identifiable, Queryable, Debug, Clone, PartialEq, Serialize)]
#[table_name="reviews"]
pub struct Review {
    pub id: i32,
    pub user_id: i32,
    pub vocabulary_id: i32,
    pub streak: i32,
    pub correct: i32,
    pub incorrect: i32,
    pub critical: bool,
    pub burned: bool,
    pub hidden: bool,
    pub last_studied: Option<DateTime<Utc>>,
    pub next_review_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub version: i32,
}

// The version is bumped by the store, never by the state transitions.
#[derive(AsChangeset, Debug)]
#[table_name="reviews"]
#[changeset_options(treat_none_as_null = "true")]
pub struct ReviewUpdate<'a> {
    pub streak: i32,
    pub correct: i32,
    pub incorrect: i32,
    pub critical: bool,
    pub burned: bool,
    pub hidden: bool,
    pub last_studied: Option<DateTime<Utc>>,
    pub next_review_date: DateTime<Utc>,
    pub notes: Option<&'a str>,
    pub version: i32,
}

impl<'a> From<&'a Review> for ReviewUpdate<'a> {
    fn from(review: &'a Review) -> Self {
        ReviewUpdate {
            streak: review.streak,
            correct: review.correct,
            incorrect: review.incorrect,
            critical: review.critical,
            burned: review.burned,
            hidden: review.hidden,
            last_studied: review.last_studied,
            next_review_date: review.next_review_date,
            notes: review.notes.as_ref().map(|n| n.as_str()),
            version: review.version + 1,
        }
    }
}

#[derive(Insertable, Debug)]
#[table_name="meaning_synonyms"]
pub struct NewMeaningSynonym<'a> {
    pub review_id: i32,
    pub text: &'a str,
}

#[derive(Identifiable, Queryable, Debug, Clone, PartialEq, Serialize)]
#[table_name="meaning_synonyms"]
pub struct MeaningSynonym {
    pub id: i32,
    pub review_id: i32,
    pub text: String,
}

#[derive(Insertable, Debug)]
#[table_name="reading_synonyms"]
pub struct NewReadingSynonym<'a> {
    pub review_id: i32,
    pub kana: &'a str,
    pub character: &'a str,
}

#[derive(Identifiable, Queryable, Debug, Clone, PartialEq, Serialize)]
#[table_name="reading_synonyms"]
pub struct ReadingSynonym {
    pub id: i32,
    pub review_id: i32,
    pub kana: String,
    pub character: String,
}

#[derive(Insertable, Debug)]
#[table_name="tags"]
pub struct NewTag<'a> {
    pub name: &'a str,
}

#[derive(Identifiable, Queryable, Debug, Clone, PartialEq, Serialize)]
#[table_name="tags"]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable, Queryable, Debug, Clone, PartialEq)]
#[table_name="tag_readings"]
pub struct TagReading {
    pub tag_id: i32,
    pub reading_id: i32,
}
