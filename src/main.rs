#[macro_use] extern crate clap;
#[macro_use] extern crate error_chain;
#[macro_use] extern crate lazy_static;
#[macro_use] extern crate log;

extern crate kaniwani_backend;

mod helpers;

use chrono::{DateTime, Utc};
use clap::{App, AppSettings, Arg, ArgGroup, ArgMatches, SubCommand};
use kaniwani_backend::errors::*;
use kaniwani_backend::review::{self, Answer};
use kaniwani_backend::upstream::VocabularySnapshot;
use kaniwani_backend::{db, reconcile, synonym, tag, vocabulary};
use kaniwani_backend::{PgStore, SrsConfig};
use serde::Serialize;
use std::fs;
use std::process;

fn int_arg(args: &ArgMatches, name: &str) -> Result<i32> {
    let value = args.value_of(name).unwrap_or_default();
    value.parse::<i32>().chain_err(|| format!("<{}> must be an integer, got {:?}", name, value))
}

fn text_arg<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.value_of(name).unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn snapshot_from_file(path: &str) -> Result<VocabularySnapshot> {
    let json = fs::read_to_string(path).chain_err(|| format!("Can't read {}", path))?;
    VocabularySnapshot::from_json(&json)
}

fn review_id_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("review_id").required(true)
}

fn cli<'a, 'b>() -> App<'a, 'b> {
    App::new("kw")
        .about("KaniWani review scheduler control")
        .setting(AppSettings::SubcommandRequired)
        .version(crate_version!())
        .subcommand(SubCommand::with_name("answer")
            .about("Record an answer to a review")
            .arg(review_id_arg())
            .arg(Arg::with_name("correct").long("correct"))
            .arg(Arg::with_name("incorrect").long("incorrect"))
            .group(ArgGroup::with_name("result").args(&["correct", "incorrect"]).required(true))
            .arg(Arg::with_name("retry").long("retry").help("The answer wasn't the first try"))
            .arg(Arg::with_name("no-burn").long("no-burn").help("Keep the review from burning")))
        .subcommand(SubCommand::with_name("add")
            .about("Start reviewing a vocabulary item")
            .arg(Arg::with_name("user_id").required(true))
            .arg(Arg::with_name("vocabulary_id").required(true)))
        .subcommand(SubCommand::with_name("due")
            .about("List the reviews that are due")
            .arg(Arg::with_name("user_id").required(true)))
        .subcommand(SubCommand::with_name("studied")
            .about("Set when a review was last studied and recompute its due date")
            .arg(review_id_arg())
            .arg(Arg::with_name("time").required(true).help("RFC 3339 timestamp")))
        .subcommand(SubCommand::with_name("reset")
            .about("Reset a review to a freshly added state")
            .arg(review_id_arg()))
        .subcommand(SubCommand::with_name("import")
            .about("Import a vocabulary item from an upstream snapshot")
            .arg(Arg::with_name("snapshot").required(true)))
        .subcommand(SubCommand::with_name("sync")
            .about("Reconcile a vocabulary item with an upstream snapshot")
            .arg(Arg::with_name("vocabulary_id").required(true))
            .arg(Arg::with_name("snapshot").required(true)))
        .subcommand(SubCommand::with_name("synonym")
            .about("Manage the meaning synonyms of a review")
            .setting(AppSettings::SubcommandRequired)
            .subcommand(SubCommand::with_name("add").arg(review_id_arg()).arg(Arg::with_name("text").required(true)))
            .subcommand(SubCommand::with_name("rm").arg(review_id_arg()).arg(Arg::with_name("text").required(true)))
            .subcommand(SubCommand::with_name("ls").arg(review_id_arg())))
        .subcommand(SubCommand::with_name("tag")
            .about("Manage tags")
            .setting(AppSettings::SubcommandRequired)
            .subcommand(SubCommand::with_name("add").arg(Arg::with_name("name").required(true)))
            .subcommand(SubCommand::with_name("reading")
                .arg(Arg::with_name("name").required(true))
                .arg(Arg::with_name("reading_id").required(true)))
            .subcommand(SubCommand::with_name("vocab").arg(Arg::with_name("name").required(true))))
}

fn run_synonym(store: &PgStore, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("add", Some(args)) => {
            let added = synonym::add_synonym(store, int_arg(args, "review_id")?, text_arg(args, "text"))?;
            print_json(&added)
        }
        ("rm", Some(args)) => {
            synonym::remove_synonym(store, int_arg(args, "review_id")?, text_arg(args, "text"))?;
            println!("Removed.");
            Ok(())
        }
        ("ls", Some(args)) => {
            let review_id = int_arg(args, "review_id")?;
            println!("Synonyms: {}", synonym::synonyms_string(store, review_id)?);
            print_json(&synonym::all_readings(store, review_id)?)
        }
        _ => unreachable!(), // SubcommandRequired
    }
}

fn run_tag(store: &PgStore, matches: &ArgMatches) -> Result<()> {
    use kaniwani_backend::{TagStore, VocabularyStore};

    match matches.subcommand() {
        ("add", Some(args)) => print_json(&tag::create_tag(store, text_arg(args, "name"))?),
        ("reading", Some(args)) => {
            let tag = store.tag_by_name(text_arg(args, "name"))?;
            let reading_id = int_arg(args, "reading_id")?;
            store.tag_reading(tag.id, reading_id)?;
            println!("Tagged reading {} with {:?}.", reading_id, tag.name);
            Ok(())
        }
        ("vocab", Some(args)) => {
            let tagged = tag::all_vocabulary(store, text_arg(args, "name"))?;
            let stored = tagged.iter()
                .map(|v| store.stored_vocabulary(v.id))
                .collect::<Result<Vec<_>>>()?;
            print_json(&stored)
        }
        _ => unreachable!(), // SubcommandRequired
    }
}

fn run(matches: ArgMatches) -> Result<()> {
    use kaniwani_backend::ReviewStore;

    let config: SrsConfig = helpers::load_config()?;
    let conn = db::connect(helpers::database_url()?)?;
    db::check(&conn)?;
    let store = PgStore::new(&conn);

    match matches.subcommand() {
        ("answer", Some(args)) => {
            let answer = if args.is_present("correct") {
                Answer::Correct { first_try: !args.is_present("retry"), can_burn: !args.is_present("no-burn") }
            } else {
                Answer::Incorrect
            };
            let review_id = int_arg(args, "review_id")?;
            let review = review::record_answer(&store, review_id, answer, Utc::now(), &config)?;
            info!("Review {} is now {}.", review.id, review::level(&review, &config));
            print_json(&review)
        }
        ("add", Some(args)) => {
            let new = review::new_review(int_arg(args, "user_id")?, int_arg(args, "vocabulary_id")?, Utc::now());
            print_json(&store.create_review(&new)?)
        }
        ("due", Some(args)) => {
            let due = review::due_reviews(&store, int_arg(args, "user_id")?, Utc::now())?;
            println!("{} reviews due.", due.len());
            print_json(&due)
        }
        ("studied", Some(args)) => {
            let time = text_arg(args, "time");
            let studied = DateTime::parse_from_rfc3339(time)
                .chain_err(|| format!("Not an RFC 3339 timestamp: {:?}", time))?
                .with_timezone(&Utc);
            let review = review::edit(&store, int_arg(args, "review_id")?, |r| {
                review::set_last_studied(r, studied, &config)
            })?;
            print_json(&review)
        }
        ("reset", Some(args)) => {
            let now = Utc::now();
            let review = review::edit(&store, int_arg(args, "review_id")?, |r| Ok(review::reset(r, now)))?;
            print_json(&review)
        }
        ("import", Some(args)) => {
            let snapshot = snapshot_from_file(text_arg(args, "snapshot"))?;
            print_json(&vocabulary::create_vocabulary(&store, &snapshot)?)
        }
        ("sync", Some(args)) => {
            let vocabulary_id = int_arg(args, "vocabulary_id")?;
            let snapshot = snapshot_from_file(text_arg(args, "snapshot"))?;
            let synced = reconcile::sync_vocabulary(&store, vocabulary_id, &snapshot, config.alternate_meanings)?;
            print_json(&synced)
        }
        ("synonym", Some(args)) => run_synonym(&store, args),
        ("tag", Some(args)) => run_tag(&store, args),
        _ => unreachable!(), // clap exits before reaching here if no subcommand is given.
    }
}

fn main() {
    pretty_env_logger::init();
    let matches = cli().get_matches();

    if let Err(e) = run(matches) {
        error!("{}", e);
        for cause in e.iter().skip(1) {
            error!("Caused by: {}", cause);
        }
        if e.is_not_found() || e.is_conflict() {
            process::exit(2);
        }
        process::exit(1);
    }
}


#[test]
fn test_cli_parses_answer() {
    let matches = cli().get_matches_from_safe(vec!["kw", "answer", "12", "--correct", "--retry"]).unwrap();
    let (name, args) = matches.subcommand();
    assert_eq!(name, "answer");
    let args = args.unwrap();
    assert_eq!(int_arg(args, "review_id").unwrap(), 12);
    assert!(args.is_present("correct"));
    assert!(args.is_present("retry"));
    assert!(!args.is_present("no-burn"));
}

#[test]
fn test_cli_requires_an_answer_result() {
    assert!(cli().get_matches_from_safe(vec!["kw", "answer", "12"]).is_err());
    assert!(cli().get_matches_from_safe(vec!["kw", "answer", "12", "--correct", "--incorrect"]).is_err());
}

#[test]
fn test_int_arg_rejects_garbage() {
    let matches = cli().get_matches_from_safe(vec!["kw", "due", "me"]).unwrap();
    let args = matches.subcommand_matches("due").unwrap();
    assert!(int_arg(args, "user_id").is_err());
}
