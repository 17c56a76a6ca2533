use super::*;
use std::collections::BTreeSet;

pub fn create_tag<S: TagStore>(store: &S, name: &str) -> Result<Tag> {
    let tag = store.create_tag(name.trim())?;
    info!("Created tag {:?}.", tag.name);
    Ok(tag)
}

pub fn tag_reading<S: TagStore>(store: &S, tag: &Tag, reading: &Reading) -> Result<()> {
    store.tag_reading(tag.id, reading.id)
}

/// All vocabulary reachable through the tag's readings, each item once.
pub fn all_vocabulary<S: TagStore>(store: &S, tag_name: &str) -> Result<Vec<Vocabulary>> {
    let tag = store.tag_by_name(tag_name.trim())?;
    store.tagged_vocabulary(tag.id)
}

/// Projects tagged readings onto their vocabulary, collapsing readings that share one.
pub fn distinct_vocabulary_ids<'a, I>(tagged_readings: I) -> BTreeSet<i32>
    where I: IntoIterator<Item = &'a Reading>
{
    tagged_readings.into_iter().map(|r| r.vocabulary_id).collect()
}


#[cfg(test)]
fn spicy_reading(store: &MemoryStore, vocabulary_id: i32, kana: &str) -> Reading {
    use crate::vocabulary::ReadingKey;
    let key = ReadingKey { kana: kana.into(), character: "SOME_CHARACTER".into(), level: 5 };
    store.add_reading(&NewReading::new(vocabulary_id, &key).unwrap()).unwrap()
}

#[test]
fn test_tag_search_works() {
    let store = MemoryStore::new();
    let meatball = store.create_vocabulary("spicy meatball", "").unwrap();
    let pizza = store.create_vocabulary("spicy pizza", "").unwrap();
    let reading = spicy_reading(&store, meatball.id, "SOME_READING");
    let reading2 = spicy_reading(&store, pizza.id, "SOME_OTHER_READING");

    let spicy = create_tag(&store, "spicy").unwrap();
    tag_reading(&store, &spicy, &reading).unwrap();
    tag_reading(&store, &spicy, &reading2).unwrap();

    let vocab = all_vocabulary(&store, "spicy").unwrap();
    assert_eq!(vocab.len(), 2);
}

#[test]
fn test_vocabulary_with_multiple_tagged_readings_appears_only_once() {
    let store = MemoryStore::new();
    let meatball = store.create_vocabulary("spicy meatball", "").unwrap();
    let reading = spicy_reading(&store, meatball.id, "SOME_READING");
    let reading2 = spicy_reading(&store, meatball.id, "SOME_OTHER_READING");

    let spicy = create_tag(&store, "spicy").unwrap();
    tag_reading(&store, &spicy, &reading).unwrap();
    tag_reading(&store, &spicy, &reading2).unwrap();
    tag_reading(&store, &spicy, &reading2).unwrap();

    let vocab = all_vocabulary(&store, "spicy").unwrap();
    assert_eq!(vocab, vec![meatball]);
    assert_eq!(distinct_vocabulary_ids(&[reading, reading2]).len(), 1);
}

#[test]
fn test_tag_names_are_unique() {
    let store = MemoryStore::new();
    create_tag(&store, "S P I C Y").unwrap();
    let err = create_tag(&store, "S P I C Y").unwrap_err();
    assert!(err.is_conflict());
    match *err.kind() {
        ErrorKind::DuplicateTag(ref name) => assert_eq!(name, "S P I C Y"),
        ref other => panic!("Expected DuplicateTag, got {:?}", other),
    }
}

#[test]
fn test_unknown_tag_and_reading() {
    let store = MemoryStore::new();
    assert!(all_vocabulary(&store, "mild").unwrap_err().is_not_found());
    let spicy = create_tag(&store, "spicy").unwrap();
    assert!(store.tag_reading(spicy.id, 404).unwrap_err().is_not_found());
    assert!(all_vocabulary(&store, "spicy").unwrap().is_empty());
}

#[test]
fn test_removed_readings_drop_out_of_tags() {
    use crate::reconcile::{self, AlternateMeaningPolicy};
    use crate::upstream::VocabularySnapshot;

    let store = MemoryStore::new();
    let meatball = store.create_vocabulary("spicy meatball", "").unwrap();
    let reading = spicy_reading(&store, meatball.id, "SOME_READING");
    let spicy = create_tag(&store, "spicy").unwrap();
    tag_reading(&store, &spicy, &reading).unwrap();

    let upstream = VocabularySnapshot {
        meaning: "spicy meatball".into(),
        alternate_meanings: String::new(),
        readings: vec![],
        parts_of_speech: vec![],
    };
    reconcile::sync_vocabulary(&store, meatball.id, &upstream, AlternateMeaningPolicy::KeepLocal).unwrap();
    assert!(all_vocabulary(&store, "spicy").unwrap().is_empty());
}
