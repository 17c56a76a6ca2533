use super::*;
use crate::schema::{self, meaning_synonyms, parts_of_speech, reading_synonyms, readings, reviews, tag_readings, tags};
use diesel::result::DatabaseErrorKind::{ForeignKeyViolation, UniqueViolation};
use diesel::result::Error::{DatabaseError, NotFound};

pub struct PgStore<'a> {
    conn: &'a PgConnection,
}

impl<'a> PgStore<'a> {
    pub fn new(conn: &'a PgConnection) -> Self {
        PgStore { conn }
    }

    fn missing_or_stale(&self, kind: &'static str, id: i32, exists: bool) -> Error {
        if exists {
            ErrorKind::StaleWrite(kind, id).into()
        } else {
            ErrorKind::NoSuchRecord(kind, id).into()
        }
    }
}

fn not_found(kind: &'static str, id: i32) -> impl FnOnce(diesel::result::Error) -> Error {
    move |e| match e {
        e @ NotFound => Error::with_chain(e, ErrorKind::NoSuchRecord(kind, id)),
        e => Error::with_chain(e, "Error when trying to retrieve a record!"),
    }
}

impl<'a> ReviewStore for PgStore<'a> {

    fn review(&self, id: i32) -> Result<Review> {
        reviews::table
            .find(id)
            .first(self.conn)
            .map_err(not_found("review", id))
    }

    fn create_review(&self, new: &NewReview) -> Result<Review> {
        diesel::insert_into(reviews::table)
            .values(new)
            .get_result(self.conn)
            .map_err(|e| match e {
                e @ DatabaseError(UniqueViolation, _) =>
                    Error::with_chain(e, ErrorKind::DuplicateReview(new.user_id, new.vocabulary_id)),
                e @ DatabaseError(ForeignKeyViolation, _) =>
                    Error::with_chain(e, ErrorKind::NoSuchRecord("vocabulary", new.vocabulary_id)),
                e => e.into(),
            })
    }

    fn update_review(&self, review: &Review) -> Result<Review> {
        let updated = diesel::update(reviews::table
                .filter(reviews::id.eq(review.id))
                .filter(reviews::version.eq(review.version)))
            .set(&ReviewUpdate::from(review))
            .get_result(self.conn)
            .optional()?;

        match updated {
            Some(updated) => Ok(updated),
            None => {
                let exists = reviews::table.find(review.id).select(reviews::id).first::<i32>(self.conn).optional()?;
                Err(self.missing_or_stale("review", review.id, exists.is_some()))
            }
        }
    }

    fn due_reviews(&self, user_id: i32, now: DateTime<Utc>) -> Result<Vec<Review>> {
        Ok(reviews::table
            .filter(reviews::user_id.eq(user_id))
            .filter(reviews::burned.eq(false))
            .filter(reviews::hidden.eq(false))
            .filter(reviews::next_review_date.le(now))
            .order((reviews::next_review_date.asc(), reviews::id.asc()))
            .load(self.conn)?)
    }
}

impl<'a> SynonymStore for PgStore<'a> {

    fn meaning_synonyms(&self, review_id: i32) -> Result<Vec<MeaningSynonym>> {
        Ok(meaning_synonyms::table
            .filter(meaning_synonyms::review_id.eq(review_id))
            .order(meaning_synonyms::id)
            .load(self.conn)?)
    }

    fn create_meaning_synonym(&self, review_id: i32, text: &str) -> Result<MeaningSynonym> {
        self.review(review_id)?;
        diesel::insert_into(meaning_synonyms::table)
            .values(&NewMeaningSynonym { review_id, text })
            .on_conflict((meaning_synonyms::review_id, meaning_synonyms::text))
            .do_nothing()
            .execute(self.conn)?;

        Ok(meaning_synonyms::table
            .filter(meaning_synonyms::review_id.eq(review_id))
            .filter(meaning_synonyms::text.eq(text))
            .first(self.conn)?)
    }

    fn delete_meaning_synonym(&self, id: i32) -> Result<()> {
        let count = diesel::delete(meaning_synonyms::table.find(id)).execute(self.conn)?;
        if count == 0 {
            bail!(ErrorKind::NoSuchRecord("meaning synonym", id));
        }
        Ok(())
    }

    fn reading_synonyms(&self, review_id: i32) -> Result<Vec<ReadingSynonym>> {
        Ok(reading_synonyms::table
            .filter(reading_synonyms::review_id.eq(review_id))
            .order(reading_synonyms::id)
            .load(self.conn)?)
    }

    fn create_reading_synonym(&self, review_id: i32, kana: &str, character: &str) -> Result<ReadingSynonym> {
        self.review(review_id)?;
        diesel::insert_into(reading_synonyms::table)
            .values(&NewReadingSynonym { review_id, kana, character })
            .on_conflict((reading_synonyms::review_id, reading_synonyms::kana, reading_synonyms::character))
            .do_nothing()
            .execute(self.conn)?;

        Ok(reading_synonyms::table
            .filter(reading_synonyms::review_id.eq(review_id))
            .filter(reading_synonyms::kana.eq(kana))
            .filter(reading_synonyms::character.eq(character))
            .first(self.conn)?)
    }

    fn delete_reading_synonym(&self, id: i32) -> Result<()> {
        let count = diesel::delete(reading_synonyms::table.find(id)).execute(self.conn)?;
        if count == 0 {
            bail!(ErrorKind::NoSuchRecord("reading synonym", id));
        }
        Ok(())
    }
}

impl<'a> PgStore<'a> {

    fn insert_reading(&self, new: &NewReading) -> Result<Reading> {
        crate::vocabulary::validate_level(new.level)?;
        diesel::insert_into(readings::table)
            .values(new)
            .on_conflict((readings::vocabulary_id, readings::kana, readings::character, readings::level))
            .do_nothing()
            .execute(self.conn)
            .map_err(|e| match e {
                e @ DatabaseError(ForeignKeyViolation, _) =>
                    Error::with_chain(e, ErrorKind::NoSuchRecord("vocabulary", new.vocabulary_id)),
                e => e.into(),
            })?;

        Ok(readings::table
            .filter(readings::vocabulary_id.eq(new.vocabulary_id))
            .filter(readings::kana.eq(&new.kana))
            .filter(readings::character.eq(&new.character))
            .filter(readings::level.eq(new.level))
            .first(self.conn)?)
    }

    fn insert_parts(&self, vocabulary_id: i32, parts: &[String]) -> Result<()> {
        if parts.is_empty() {
            return Ok(());
        }
        let rows: Vec<PartOfSpeech> = parts.iter()
            .map(|part| PartOfSpeech { vocabulary_id, part: part.clone() })
            .collect();
        diesel::insert_into(parts_of_speech::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(self.conn)
            .map_err(|e| match e {
                e @ DatabaseError(ForeignKeyViolation, _) =>
                    Error::with_chain(e, ErrorKind::NoSuchRecord("vocabulary", vocabulary_id)),
                e => e.into(),
            })?;
        Ok(())
    }
}

impl<'a> VocabularyStore for PgStore<'a> {

    fn create_vocabulary(&self, meaning: &str, alternate_meanings: &str) -> Result<Vocabulary> {
        Ok(diesel::insert_into(schema::vocabulary::table)
            .values(&NewVocabulary { meaning, alternate_meanings })
            .get_result(self.conn)?)
    }

    fn stored_vocabulary(&self, id: i32) -> Result<StoredVocabulary> {
        let vocabulary = schema::vocabulary::table
            .find(id)
            .first(self.conn)
            .map_err(not_found("vocabulary", id))?;

        let readings = readings::table
            .filter(readings::vocabulary_id.eq(id))
            .order(readings::id)
            .load(self.conn)?;

        let parts_of_speech = parts_of_speech::table
            .filter(parts_of_speech::vocabulary_id.eq(id))
            .select(parts_of_speech::part)
            .order(parts_of_speech::part)
            .load(self.conn)?;

        Ok(StoredVocabulary { vocabulary, readings, parts_of_speech })
    }

    fn add_reading(&self, reading: &NewReading) -> Result<Reading> {
        self.insert_reading(reading)
    }

    fn add_part_of_speech(&self, vocabulary_id: i32, part: &str) -> Result<()> {
        self.insert_parts(vocabulary_id, &[part.to_owned()])
    }

    fn apply_reconciliation(&self, stored: &Vocabulary, plan: &ReconcilePlan) -> Result<StoredVocabulary> {
        use crate::schema::vocabulary;

        for key in &plan.add_readings {
            key.validate()?;
        }

        self.conn.transaction(|| {
            let current = vocabulary::table
                .filter(vocabulary::id.eq(stored.id))
                .filter(vocabulary::version.eq(stored.version));
            let bumped = vocabulary::version.eq(stored.version + 1);

            let count = match plan.alternate_meanings {
                Some(ref alternate_meanings) => diesel::update(current)
                    .set((bumped, vocabulary::alternate_meanings.eq(alternate_meanings)))
                    .execute(self.conn)?,
                None => diesel::update(current)
                    .set(bumped)
                    .execute(self.conn)?,
            };
            if count == 0 {
                let exists = vocabulary::table.find(stored.id).select(vocabulary::id).first::<i32>(self.conn).optional()?;
                return Err(self.missing_or_stale("vocabulary", stored.id, exists.is_some()));
            }

            // Tag links of removed readings go with them (ON DELETE CASCADE).
            diesel::delete(readings::table
                    .filter(readings::vocabulary_id.eq(stored.id))
                    .filter(readings::id.eq_any(&plan.remove_readings)))
                .execute(self.conn)?;
            for key in &plan.add_readings {
                self.insert_reading(&NewReading::new(stored.id, key)?)?;
            }

            diesel::delete(parts_of_speech::table
                    .filter(parts_of_speech::vocabulary_id.eq(stored.id))
                    .filter(parts_of_speech::part.eq_any(&plan.remove_parts)))
                .execute(self.conn)?;
            self.insert_parts(stored.id, &plan.add_parts)?;

            self.stored_vocabulary(stored.id)
        })
    }
}

impl<'a> TagStore for PgStore<'a> {

    fn create_tag(&self, name: &str) -> Result<Tag> {
        diesel::insert_into(tags::table)
            .values(&NewTag { name })
            .get_result(self.conn)
            .map_err(|e| match e {
                e @ DatabaseError(UniqueViolation, _) => Error::with_chain(e, ErrorKind::DuplicateTag(name.to_owned())),
                e => e.into(),
            })
    }

    fn tag_by_name(&self, name: &str) -> Result<Tag> {
        tags::table
            .filter(tags::name.eq(name))
            .first(self.conn)
            .map_err(|e| match e {
                e @ NotFound => Error::with_chain(e, ErrorKind::NoSuchTag(name.to_owned())),
                e => e.into(),
            })
    }

    fn tag_reading(&self, tag_id: i32, reading_id: i32) -> Result<()> {
        tags::table.find(tag_id).first::<Tag>(self.conn).map_err(not_found("tag", tag_id))?;
        diesel::insert_into(tag_readings::table)
            .values(&TagReading { tag_id, reading_id })
            .on_conflict_do_nothing()
            .execute(self.conn)
            .map_err(|e| match e {
                e @ DatabaseError(ForeignKeyViolation, _) =>
                    Error::with_chain(e, ErrorKind::NoSuchRecord("reading", reading_id)),
                e => e.into(),
            })?;
        Ok(())
    }

    fn tagged_vocabulary(&self, tag_id: i32) -> Result<Vec<Vocabulary>> {
        let tagged: Vec<Reading> = tag_readings::table
            .inner_join(readings::table)
            .filter(tag_readings::tag_id.eq(tag_id))
            .select(readings::all_columns)
            .load(self.conn)?;
        let ids: Vec<i32> = crate::tag::distinct_vocabulary_ids(&tagged).into_iter().collect();

        Ok(schema::vocabulary::table
            .filter(schema::vocabulary::id.eq_any(ids))
            .order(schema::vocabulary::id)
            .load(self.conn)?)
    }
}
