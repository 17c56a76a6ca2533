//! The review state machine.
//!
//! Transitions are pure: they take a review and return the next state. The store-level
//! helpers at the bottom do the read-modify-write around them.

use super::*;
use crate::rounding::{round_to_hour, round_up};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Correct { first_try: bool, can_burn: bool },
    Incorrect,
}

/// Never-studied reviews are due right away; the due date isn't rounded.
pub fn new_review(user_id: i32, vocabulary_id: i32, now: DateTime<Utc>) -> NewReview {
    NewReview {
        user_id,
        vocabulary_id,
        next_review_date: now,
    }
}

pub fn level(review: &Review, config: &SrsConfig) -> SrsLevel {
    if review.burned {
        SrsLevel::Burned
    } else {
        config.level_for(review.streak)
    }
}

fn schedule_after_answer(review: &mut Review, now: DateTime<Utc>, config: &SrsConfig) {
    review.last_studied = Some(now);
    if let Some(delay) = config.next_review_delay(review.streak) {
        review.next_review_date = round_to_hour(now + delay);
    }
}

pub fn answer_correct(review: &Review,
                      first_try: bool,
                      can_burn: bool,
                      now: DateTime<Utc>,
                      config: &SrsConfig)
                      -> Result<Review> {
    ensure_not_burned(review)?;
    let mut review = review.clone();

    review.correct += 1;
    if first_try {
        review.streak += 1;
    }

    let burned_streak = config.burned_streak();
    if review.streak >= burned_streak {
        if can_burn {
            review.streak = burned_streak;
            review.burned = true;
            info!("Review {} burned.", review.id);
        } else {
            review.streak = burned_streak - 1;
        }
    }

    review.critical = false;
    schedule_after_answer(&mut review, now, config);
    Ok(review)
}

pub fn answer_incorrect(review: &Review, now: DateTime<Utc>, config: &SrsConfig) -> Result<Review> {
    ensure_not_burned(review)?;
    let mut review = review.clone();

    review.incorrect += 1;
    review.streak = (review.streak - 1).max(0);

    let critical = config.is_critical(review.correct, review.incorrect);
    if critical && !review.critical {
        debug!("Review {} became critical ({}/{} correct).",
               review.id, review.correct, review.correct + review.incorrect);
    }
    review.critical = critical;

    schedule_after_answer(&mut review, now, config);
    Ok(review)
}

pub fn apply_answer(review: &Review, answer: Answer, now: DateTime<Utc>, config: &SrsConfig) -> Result<Review> {
    match answer {
        Answer::Correct { first_try, can_burn } => answer_correct(review, first_try, can_burn, now, config),
        Answer::Incorrect => answer_incorrect(review, now, config),
    }
}

fn ensure_not_burned(review: &Review) -> Result<()> {
    if review.burned {
        return Err(ErrorKind::ReviewBurned(review.id).into());
    }
    Ok(())
}

/// Moves `last_studied` forward onto the review grid. Unstudied reviews are unchanged.
pub fn round_last_studied_up(review: &Review, config: &SrsConfig) -> Result<Review> {
    ensure_not_burned(review)?;
    let mut review = review.clone();
    review.last_studied = review.last_studied.map(|t| round_up(t, config.rounding_minutes));
    Ok(review)
}

/// `last_studied` plus the streak's delay, without any rounding of its own.
pub fn set_next_review_time_based_on_last_studied(review: &Review, config: &SrsConfig) -> Result<Review> {
    ensure_not_burned(review)?;
    let last_studied = match review.last_studied {
        Some(t) => t,
        None => return Err(ErrorKind::NeverStudied(review.id).into()),
    };
    let mut review = review.clone();
    if let Some(delay) = config.next_review_delay(review.streak) {
        review.next_review_date = last_studied + delay;
    }
    Ok(review)
}

/// A manual edit of when the item was last studied.
pub fn set_last_studied(review: &Review, studied: DateTime<Utc>, config: &SrsConfig) -> Result<Review> {
    ensure_not_burned(review)?;
    let mut review = review.clone();
    review.last_studied = Some(studied);
    let review = round_last_studied_up(&review, config)?;
    set_next_review_time_based_on_last_studied(&review, config)
}

/// Back to the state of a freshly added item.
pub fn reset(review: &Review, now: DateTime<Utc>) -> Review {
    Review {
        streak: 0,
        correct: 0,
        incorrect: 0,
        critical: false,
        burned: false,
        last_studied: None,
        next_review_date: now,
        ..review.clone()
    }
}

pub fn toggle_hidden(review: &Review) -> Review {
    Review {
        hidden: !review.hidden,
        ..review.clone()
    }
}

pub fn set_notes(review: &Review, notes: Option<&str>) -> Review {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_owned);
    Review {
        notes,
        ..review.clone()
    }
}

/* READ-MODIFY-WRITE */

/// Applies `change` to the stored review. If someone else wrote the review in
/// between, the change is applied once more on top of their version.
pub fn edit<S, F>(store: &S, review_id: i32, mut change: F) -> Result<Review>
    where S: ReviewStore,
          F: FnMut(&Review) -> Result<Review>
{
    let review = store.review(review_id)?;
    match store.update_review(&change(&review)?) {
        Err(ref e) if e.is_transient() => {
            warn!("Review {} changed under us, retrying once.", review_id);
        }
        result => return result,
    }
    let review = store.review(review_id)?;
    store.update_review(&change(&review)?)
}

pub fn record_answer<S: ReviewStore>(store: &S,
                                     review_id: i32,
                                     answer: Answer,
                                     now: DateTime<Utc>,
                                     config: &SrsConfig)
                                     -> Result<Review> {
    let review = edit(store, review_id, |r| apply_answer(r, answer, now, config))?;
    debug!("Answer {:?} on review {}: streak {}, next review at {}.",
           answer, review_id, review.streak, review.next_review_date);
    Ok(review)
}

pub fn due_reviews<S: ReviewStore>(store: &S, user_id: i32, now: DateTime<Utc>) -> Result<Vec<Review>> {
    store.due_reviews(user_id, now)
}


#[cfg(test)]
mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn ten_seventeen() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 27, 10, 17, 23).unwrap()
    }

    pub fn review(streak: i32, correct: i32, incorrect: i32) -> Review {
        Review {
            id: 1,
            user_id: 1,
            vocabulary_id: 1,
            streak,
            correct,
            incorrect,
            critical: false,
            burned: false,
            hidden: false,
            last_studied: None,
            next_review_date: ten_seventeen(),
            notes: None,
            version: 0,
        }
    }

    pub fn stored_review(store: &MemoryStore) -> Review {
        let vocab = store.create_vocabulary("cat", "").unwrap();
        store.create_review(&new_review(1, vocab.id, ten_seventeen())).unwrap()
    }
}

#[test]
fn test_correct_first_try_advances_and_rounds() {
    use chrono::{Duration, Timelike};
    let config = SrsConfig::default();
    let now = fixtures::ten_seventeen();

    let answered = answer_correct(&fixtures::review(0, 0, 0), true, true, now, &config).unwrap();
    assert_eq!(answered.streak, 1);
    assert_eq!(answered.correct, 1);
    assert_eq!(answered.last_studied, Some(now));
    assert_eq!(answered.next_review_date.minute(), 0);
    assert_eq!(answered.next_review_date.second(), 0);
    assert_eq!(answered.next_review_date.hour(), (now.hour() + 4) % 24);
    assert_eq!(answered.next_review_date, round_to_hour(now + Duration::hours(4)));
}

#[test]
fn test_correct_not_first_try_keeps_streak() {
    let config = SrsConfig::default();
    let answered = answer_correct(&fixtures::review(3, 2, 1), false, true, fixtures::ten_seventeen(), &config).unwrap();
    assert_eq!(answered.streak, 3);
    assert_eq!(answered.correct, 3);
    assert_eq!(answered.incorrect, 1);
}

#[test]
fn test_setting_criticality_of_review() {
    let config = SrsConfig::default();
    let review = fixtures::review(2, 1, 2);
    assert!(!review.critical);

    let answered = answer_incorrect(&review, fixtures::ten_seventeen(), &config).unwrap();
    assert_eq!((answered.correct, answered.incorrect), (1, 3));
    assert!(answered.critical);
}

#[test]
fn test_critical_not_set_when_below_attempt_threshold() {
    let config = SrsConfig::default();
    let review = fixtures::review(1, 0, 1);

    // Brings the attempt count to 2.
    let answered = answer_incorrect(&review, fixtures::ten_seventeen(), &config).unwrap();
    assert_eq!(answered.incorrect, 2);
    assert!(!answered.critical);
}

#[test]
fn test_review_correctly_comes_out_of_critical() {
    let config = SrsConfig::default();
    let mut review = fixtures::review(4, 1, 3);
    review.critical = true;

    let answered = answer_correct(&review, true, true, fixtures::ten_seventeen(), &config).unwrap();
    assert!(!answered.critical);
}

#[test]
fn test_answered_correctly_can_burn() {
    let config = SrsConfig::default();
    let enlightened = config.min_streak(SrsLevel::Enlightened).unwrap();
    let mut review = fixtures::review(enlightened, 10, 5);
    review.critical = true;

    let answered = answer_correct(&review, true, true, fixtures::ten_seventeen(), &config).unwrap();
    assert_eq!(answered.streak, config.min_streak(SrsLevel::Burned).unwrap());
    assert!(answered.burned);
    assert!(!answered.critical);
    assert_eq!(level(&answered, &config), SrsLevel::Burned);
}

#[test]
fn test_answered_correctly_cannot_burn() {
    let config = SrsConfig::default();
    let enlightened = config.min_streak(SrsLevel::Enlightened).unwrap();
    let review = fixtures::review(enlightened, 10, 5);

    let answered = answer_correct(&review, true, false, fixtures::ten_seventeen(), &config).unwrap();
    assert_eq!(answered.streak, enlightened);
    assert!(!answered.burned);
    assert_eq!(level(&answered, &config), SrsLevel::Enlightened);
}

#[test]
fn test_burned_reviews_cant_be_answered() {
    let config = SrsConfig::default();
    let mut review = fixtures::review(9, 20, 0);
    review.burned = true;

    for answer in &[Answer::Incorrect, Answer::Correct { first_try: true, can_burn: true }] {
        match apply_answer(&review, *answer, fixtures::ten_seventeen(), &config) {
            Err(Error(ErrorKind::ReviewBurned(1), _)) => (),
            other => panic!("Expected ReviewBurned, got {:?}", other),
        }
    }
}

#[test]
fn test_burned_reviews_cant_be_rescheduled_by_hand() {
    let config = SrsConfig::default();
    let mut review = fixtures::review(9, 20, 0);
    review.burned = true;
    review.last_studied = Some(fixtures::ten_seventeen());

    let edits = [
        set_last_studied(&review, fixtures::ten_seventeen(), &config),
        round_last_studied_up(&review, &config),
        set_next_review_time_based_on_last_studied(&review, &config),
    ];
    for edit in &edits {
        match *edit {
            Err(Error(ErrorKind::ReviewBurned(1), _)) => (),
            ref other => panic!("Expected ReviewBurned, got {:?}", other),
        }
    }
}

#[test]
fn test_manual_study_time_on_burned_review_leaves_store_untouched() {
    let config = SrsConfig::default();
    let store = MemoryStore::new();
    let review = fixtures::stored_review(&store);
    let burned = edit(&store, review.id, |r| Ok(Review { streak: 9, burned: true, ..r.clone() })).unwrap();

    let err = edit(&store, review.id, |r| set_last_studied(r, fixtures::ten_seventeen(), &config)).unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(store.review(review.id).unwrap(), burned);
}

#[test]
fn test_streak_direction_of_answers() {
    let config = SrsConfig::default();
    let now = fixtures::ten_seventeen();
    for streak in 0..config.burned_streak() {
        let review = fixtures::review(streak, 3, 3);
        for &can_burn in &[true, false] {
            let correct = answer_correct(&review, true, can_burn, now, &config).unwrap();
            assert!(correct.streak >= streak);
        }
        let incorrect = answer_incorrect(&review, now, &config).unwrap();
        assert!(incorrect.streak <= streak);
        assert!(incorrect.streak >= 0);
    }
}

#[test]
fn test_incorrect_answer_floors_at_apprentice() {
    let config = SrsConfig::default();
    let answered = answer_incorrect(&fixtures::review(0, 0, 0), fixtures::ten_seventeen(), &config).unwrap();
    assert_eq!(answered.streak, 0);
    assert_eq!(level(&answered, &config), SrsLevel::Apprentice);
}

#[test]
fn test_default_review_times_are_not_rounded() {
    use chrono::Timelike;
    let config = SrsConfig::default();
    let now = fixtures::ten_seventeen();

    let fresh = new_review(1, 1, now);
    assert_eq!(fresh.next_review_date, now);
    assert_eq!(fresh.next_review_date.minute(), 17);

    let answered = answer_correct(&fixtures::review(0, 0, 0), true, true, now, &config).unwrap();
    assert_ne!(answered.next_review_date, fresh.next_review_date);
}

#[test]
fn test_newly_created_review_has_null_last_studied_date() {
    let store = MemoryStore::new();
    let review = fixtures::stored_review(&store);
    assert_eq!(review.last_studied, None);
    assert_eq!(review.streak, 0);
    assert_eq!(review.next_review_date, fixtures::ten_seventeen());
}

#[test]
fn test_rounding_up_a_review_rounds_up_last_studied_date() {
    use chrono::Timelike;
    let config = SrsConfig::default();
    let mut review = fixtures::review(2, 1, 0);
    review.last_studied = Some(fixtures::ten_seventeen());

    let rounded = round_last_studied_up(&review, &config).unwrap();
    let last_studied = rounded.last_studied.unwrap();
    assert_eq!(i64::from(last_studied.minute()) % config.rounding_minutes, 0);
    assert!(last_studied >= fixtures::ten_seventeen());
}

#[test]
fn test_updating_next_review_date_based_on_last_studied_works() {
    use chrono::Duration;
    let config = SrsConfig::default();
    let mut review = fixtures::review(4, 3, 0);
    let studied = fixtures::ten_seventeen();
    review.last_studied = Some(studied);

    let updated = set_next_review_time_based_on_last_studied(&review, &config).unwrap();
    let expected = studied + Duration::hours(72);
    assert!(updated.next_review_date - expected < Duration::minutes(15));
    assert!(expected - updated.next_review_date < Duration::minutes(15));
}

#[test]
fn test_next_review_time_needs_last_studied() {
    let config = SrsConfig::default();
    match set_next_review_time_based_on_last_studied(&fixtures::review(4, 3, 0), &config) {
        Err(Error(ErrorKind::NeverStudied(1), _)) => (),
        other => panic!("Expected NeverStudied, got {:?}", other),
    }
}

#[test]
fn test_manual_last_studied_is_rounded_up_then_scheduled() {
    use chrono::{Duration, TimeZone};
    let config = SrsConfig::default();
    let updated = set_last_studied(&fixtures::review(2, 2, 0), fixtures::ten_seventeen(), &config).unwrap();
    let on_grid = Utc.with_ymd_and_hms(2018, 7, 27, 10, 30, 0).unwrap();
    assert_eq!(updated.last_studied, Some(on_grid));
    assert_eq!(updated.next_review_date, on_grid + Duration::hours(8));
}

#[test]
fn test_reset_and_learner_edits() {
    let config = SrsConfig::default();
    let now = fixtures::ten_seventeen();
    let mut review = fixtures::review(7, 12, 4);
    review.critical = true;
    review.last_studied = Some(now);

    let review = set_notes(&toggle_hidden(&review), Some("  This is a note for my review!  "));
    assert!(review.hidden);
    assert_eq!(review.notes.as_ref().map(|n| n.as_str()), Some("This is a note for my review!"));
    assert_eq!(set_notes(&review, Some("   ")).notes, None);
    assert!(!toggle_hidden(&review).hidden);

    let fresh = reset(&review, now);
    assert_eq!((fresh.streak, fresh.correct, fresh.incorrect), (0, 0, 0));
    assert!(!fresh.critical && !fresh.burned);
    assert_eq!(fresh.last_studied, None);
    assert_eq!(fresh.next_review_date, now);
    assert!(fresh.hidden);
    assert_eq!(level(&fresh, &config), SrsLevel::Apprentice);
}

#[test]
fn test_record_answer_persists() {
    let config = SrsConfig::default();
    let store = MemoryStore::new();
    let review = fixtures::stored_review(&store);
    let correct = Answer::Correct { first_try: true, can_burn: true };

    record_answer(&store, review.id, correct, fixtures::ten_seventeen(), &config).unwrap();
    let after = record_answer(&store, review.id, correct, fixtures::ten_seventeen(), &config).unwrap();
    assert_eq!(after.streak, 2);
    assert_eq!(after.version, review.version + 2);
    assert_eq!(store.review(review.id).unwrap(), after);
}

#[test]
fn test_record_answer_on_missing_review() {
    let store = MemoryStore::new();
    let result = record_answer(&store, 404, Answer::Incorrect, fixtures::ten_seventeen(), &SrsConfig::default());
    assert!(result.unwrap_err().is_not_found());
}

#[cfg(test)]
struct Interfering<'a> {
    inner: &'a MemoryStore,
    interferences: std::cell::Cell<u32>,
}

#[cfg(test)]
impl<'a> ReviewStore for Interfering<'a> {
    fn review(&self, id: i32) -> Result<Review> { self.inner.review(id) }
    fn create_review(&self, new: &NewReview) -> Result<Review> { self.inner.create_review(new) }
    fn due_reviews(&self, user_id: i32, now: DateTime<Utc>) -> Result<Vec<Review>> { self.inner.due_reviews(user_id, now) }

    fn update_review(&self, review: &Review) -> Result<Review> {
        if self.interferences.get() > 0 {
            self.interferences.set(self.interferences.get() - 1);
            // Another request answers first.
            let theirs = answer_incorrect(&self.inner.review(review.id)?, fixtures::ten_seventeen(), &SrsConfig::default())?;
            self.inner.update_review(&theirs)?;
        }
        self.inner.update_review(review)
    }
}

#[test]
fn test_stale_answer_is_retried_on_fresh_state() {
    let config = SrsConfig::default();
    let inner = MemoryStore::new();
    let review = fixtures::stored_review(&inner);
    let review = edit(&inner, review.id, |r| Ok(Review { streak: 3, ..r.clone() })).unwrap();
    let store = Interfering { inner: &inner, interferences: std::cell::Cell::new(1) };

    let answered = record_answer(&store, review.id, Answer::Correct { first_try: true, can_burn: true },
                                 fixtures::ten_seventeen(), &config).unwrap();
    // 3, then the other request's incorrect answer to 2, then ours to 3.
    assert_eq!(answered.streak, 3);
    assert_eq!(answered.incorrect, 1);
    assert_eq!(answered.correct, 1);
}

#[test]
fn test_repeated_conflicts_surface_as_transient() {
    let config = SrsConfig::default();
    let inner = MemoryStore::new();
    let review = fixtures::stored_review(&inner);
    let store = Interfering { inner: &inner, interferences: std::cell::Cell::new(2) };

    let err = record_answer(&store, review.id, Answer::Incorrect, fixtures::ten_seventeen(), &config).unwrap_err();
    assert!(err.is_transient());
}

#[test]
fn test_concurrent_answers_are_linearizable() {
    use std::sync::Arc;
    use std::thread;

    let config = Arc::new(SrsConfig::default());
    let store = Arc::new(MemoryStore::new());
    let review_id = fixtures::stored_review(&store).id;

    let handles: Vec<_> = (0..2).map(|_| {
        let (store, config) = (store.clone(), config.clone());
        thread::spawn(move || {
            record_answer(&*store, review_id, Answer::Correct { first_try: true, can_burn: true },
                          fixtures::ten_seventeen(), &config)
        })
    }).collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let after = store.review(review_id).unwrap();
    assert_eq!(after.streak, 2);
    assert_eq!(after.correct, 2);
}

#[test]
fn test_due_reviews() {
    use chrono::Duration;
    let config = SrsConfig::default();
    let store = MemoryStore::new();
    let now = fixtures::ten_seventeen();

    let due = fixtures::stored_review(&store);
    let answered = fixtures::stored_review(&store);
    let hidden = fixtures::stored_review(&store);
    record_answer(&store, answered.id, Answer::Correct { first_try: true, can_burn: true }, now, &config).unwrap();
    edit(&store, hidden.id, |r| Ok(toggle_hidden(r))).unwrap();

    let ids: Vec<i32> = due_reviews(&store, 1, now).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![due.id]);

    let later: Vec<i32> = due_reviews(&store, 1, now + Duration::hours(5)).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(later, vec![due.id, answered.id]);
    assert!(due_reviews(&store, 2, now).unwrap().is_empty());
}
