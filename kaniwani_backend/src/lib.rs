#![recursion_limit = "512"]

#[macro_use]
pub extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
pub extern crate chrono;

pub use diesel::pg::PgConnection;
pub use diesel::prelude::*;

pub mod schema;
pub mod models;
pub mod db;
pub mod srs;
pub mod rounding;
pub mod review;
pub mod synonym;
pub mod vocabulary;
pub mod upstream;
pub mod reconcile;
pub mod tag;
pub mod store;

pub use models::*;
pub use srs::{SrsConfig, SrsLevel};
pub use store::{MemoryStore, PgStore, ReviewStore, SynonymStore, TagStore, VocabularyStore};

pub mod errors {

    error_chain! {
        foreign_links {
            VarError(::std::env::VarError);
            ParseIntError(::std::num::ParseIntError);
            ParseFloatError(::std::num::ParseFloatError);
            StdIoError(::std::io::Error);
            JsonError(::serde_json::Error);
            DieselError(::diesel::result::Error);
            DieselConnectionError(::diesel::ConnectionError);
            DieselMigrationError(::diesel::migration::RunMigrationsError);
        }
        errors {
            NoSuchRecord(kind: &'static str, id: i32) {
                description("No such record")
                display("No {} with ID {} exists.", kind, id)
            }
            NoSuchSynonym(text: String) {
                description("No such synonym")
                display("The review has no synonym {:?}.", text)
            }
            NoSuchTag(name: String) {
                description("No such tag")
                display("No tag named {:?} exists.", name)
            }
            InvalidReadingLevel(level: i32) {
                description("Reading level out of range")
                display("A reading level must be between 1 and 60, got {}.", level)
            }
            DuplicateTag(name: String) {
                description("Tag name already taken")
                display("A tag named {:?} already exists.", name)
            }
            DuplicateReview(user_id: i32, vocabulary_id: i32) {
                description("Review already exists")
                display("User {} already has a review for vocabulary {}.", user_id, vocabulary_id)
            }
            StaleWrite(kind: &'static str, id: i32) {
                description("Concurrent modification")
                display("The {} with ID {} was modified concurrently. Try again.", kind, id)
            }
            ReviewBurned(id: i32) {
                description("Review is burned")
                display("Review {} is burned and can't be answered anymore.", id)
            }
            NeverStudied(id: i32) {
                description("Review never studied")
                display("Review {} hasn't been studied yet.", id)
            }
            BlankSynonym {
                description("Blank synonym")
                display("A synonym can't be empty or only whitespace.")
            }
            InvalidConfig(reason: String) {
                description("Invalid SRS configuration")
                display("Invalid SRS configuration: {}", reason)
            }
        }
    }

    impl Error {
        /// The request referred to something that doesn't exist. (A 404, in HTTP terms.)
        pub fn is_not_found(&self) -> bool {
            match *self.kind() {
                ErrorKind::NoSuchRecord(..) | ErrorKind::NoSuchSynonym(_) | ErrorKind::NoSuchTag(_) => true,
                _ => false,
            }
        }

        pub fn is_conflict(&self) -> bool {
            match *self.kind() {
                ErrorKind::DuplicateTag(_) | ErrorKind::DuplicateReview(..) => true,
                _ => false,
            }
        }

        /// Retrying the whole request with fresh state may succeed.
        pub fn is_transient(&self) -> bool {
            match *self.kind() {
                ErrorKind::StaleWrite(..) => true,
                _ => false,
            }
        }
    }
}

pub use errors::*;


#[test]
fn test_error_classification() {
    let not_found: Error = ErrorKind::NoSuchSynonym("un chien".into()).into();
    assert!(not_found.is_not_found());
    assert!(!not_found.is_transient());

    let conflict: Error = ErrorKind::DuplicateTag("spicy".into()).into();
    assert!(conflict.is_conflict());
    assert!(!conflict.is_not_found());

    let stale: Error = ErrorKind::StaleWrite("review", 3).into();
    assert!(stale.is_transient());
    assert_eq!(stale.to_string(), "The review with ID 3 was modified concurrently. Try again.");

    let invalid: Error = ErrorKind::InvalidReadingLevel(61).into();
    assert!(!invalid.is_not_found() && !invalid.is_conflict() && !invalid.is_transient());
}

#[test]
fn test_foreign_errors_convert() {
    fn parse(text: &str) -> Result<i32> {
        Ok(text.parse::<i32>()?)
    }
    match parse("many") {
        Err(Error(ErrorKind::ParseIntError(_), _)) => (),
        other => panic!("Expected ParseIntError, got {:?}", other),
    }
    let json: Error = serde_json::from_str::<i32>("{").unwrap_err().into();
    match *json.kind() {
        ErrorKind::JsonError(_) => (),
        ref other => panic!("Expected JsonError, got {:?}", other),
    }
}
