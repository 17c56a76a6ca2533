table! {
    meaning_synonyms (id) {
        id -> Int4,
        review_id -> Int4,
        text -> Varchar,
    }
}

table! {
    parts_of_speech (vocabulary_id, part) {
        vocabulary_id -> Int4,
        part -> Varchar,
    }
}

table! {
    reading_synonyms (id) {
        id -> Int4,
        review_id -> Int4,
        kana -> Varchar,
        character -> Varchar,
    }
}

table! {
    readings (id) {
        id -> Int4,
        vocabulary_id -> Int4,
        kana -> Varchar,
        character -> Varchar,
        level -> Int4,
    }
}

table! {
    reviews (id) {
        id -> Int4,
        user_id -> Int4,
        vocabulary_id -> Int4,
        streak -> Int4,
        correct -> Int4,
        incorrect -> Int4,
        critical -> Bool,
        burned -> Bool,
        hidden -> Bool,
        last_studied -> Nullable<Timestamptz>,
        next_review_date -> Timestamptz,
        notes -> Nullable<Text>,
        version -> Int4,
    }
}

table! {
    tag_readings (tag_id, reading_id) {
        tag_id -> Int4,
        reading_id -> Int4,
    }
}

table! {
    tags (id) {
        id -> Int4,
        name -> Varchar,
    }
}

table! {
    vocabulary (id) {
        id -> Int4,
        meaning -> Varchar,
        alternate_meanings -> Varchar,
        version -> Int4,
    }
}

joinable!(meaning_synonyms -> reviews (review_id));
joinable!(parts_of_speech -> vocabulary (vocabulary_id));
joinable!(reading_synonyms -> reviews (review_id));
joinable!(readings -> vocabulary (vocabulary_id));
joinable!(reviews -> vocabulary (vocabulary_id));
joinable!(tag_readings -> readings (reading_id));
joinable!(tag_readings -> tags (tag_id));

allow_tables_to_appear_in_same_query!(
    meaning_synonyms,
    parts_of_speech,
    reading_synonyms,
    readings,
    reviews,
    tag_readings,
    tags,
    vocabulary,
);
