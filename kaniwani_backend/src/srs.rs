//! The level table: which mastery level a streak stands for, and how long to wait
//! before the next review at that streak.

use super::*;
use super::reconcile::AlternateMeaningPolicy;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SrsLevel {
    Apprentice,
    Guru,
    Master,
    Enlightened,
    Burned,
}

impl fmt::Display for SrsLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            SrsLevel::Apprentice => "APPRENTICE",
            SrsLevel::Guru => "GURU",
            SrsLevel::Master => "MASTER",
            SrsLevel::Enlightened => "ENLIGHTENED",
            SrsLevel::Burned => "BURNED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrsConfig {
    /// `(level, minimum streak)`, ascending. The last entry must be `Burned`.
    pub levels: Vec<(SrsLevel, i32)>,
    /// Hours until the next review, indexed by streak.
    pub review_hours: Vec<i64>,
    /// Grid that manually set study times are rounded up to.
    pub rounding_minutes: i64,
    pub critical_threshold: f64,
    pub critical_min_attempts: i32,
    pub alternate_meanings: AlternateMeaningPolicy,
}

impl Default for SrsConfig {
    fn default() -> Self {
        SrsConfig {
            levels: vec![
                (SrsLevel::Apprentice, 0),
                (SrsLevel::Guru, 5),
                (SrsLevel::Master, 7),
                (SrsLevel::Enlightened, 8),
                (SrsLevel::Burned, 9),
            ],
            review_hours: vec![0, 4, 8, 24, 72, 168, 336, 720, 2160],
            rounding_minutes: 15,
            critical_threshold: 0.75,
            critical_min_attempts: 3,
            alternate_meanings: AlternateMeaningPolicy::default(),
        }
    }
}

impl SrsConfig {

    pub fn from_json(json: &str) -> Result<SrsConfig> {
        let config: SrsConfig = serde_json::from_str(json)
            .chain_err(|| "Can't parse the SRS configuration!")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<SrsConfig> {
        let json = fs::read_to_string(path)?;
        info!("Loading SRS configuration from {:?}.", path);
        SrsConfig::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(ErrorKind::InvalidConfig(reason.into()).into())
        };

        match self.levels.first() {
            Some(&(_, 0)) => (),
            Some(_) => return invalid("the first level must start at streak 0"),
            None => return invalid("the level table is empty"),
        }
        if self.levels.last().map(|&(level, _)| level) != Some(SrsLevel::Burned) {
            return invalid("the last level must be BURNED");
        }
        for pair in self.levels.windows(2) {
            let ((lower, lower_streak), (higher, higher_streak)) = (pair[0], pair[1]);
            if lower >= higher || lower_streak >= higher_streak {
                return invalid("levels and their streaks must be strictly ascending");
            }
        }
        if self.review_hours.len() < self.burned_streak() as usize {
            return invalid("every streak below BURNED needs a review delay");
        }
        if self.review_hours.iter().any(|&h| h < 0) {
            return invalid("review delays can't be negative");
        }
        if self.review_hours.windows(2).any(|w| w[0] > w[1]) {
            return invalid("review delays must not decrease as the streak grows");
        }
        if self.rounding_minutes < 1 || 60 % self.rounding_minutes != 0 {
            return invalid("the rounding grid must divide an hour evenly");
        }
        if !(0.0..=1.0).contains(&self.critical_threshold) {
            return invalid("the critical threshold is a ratio between 0 and 1");
        }
        if self.critical_min_attempts < 1 {
            return invalid("criticality needs at least one attempt");
        }
        Ok(())
    }

    pub fn burned_streak(&self) -> i32 {
        self.min_streak(SrsLevel::Burned).unwrap_or(i32::max_value())
    }

    pub fn min_streak(&self, level: SrsLevel) -> Option<i32> {
        self.levels.iter()
            .find(|&&(l, _)| l == level)
            .map(|&(_, streak)| streak)
    }

    pub fn level_for(&self, streak: i32) -> SrsLevel {
        self.levels.iter()
            .rev()
            .find(|&&(_, min_streak)| min_streak <= streak)
            .or_else(|| self.levels.first())
            .map(|&(level, _)| level)
            .unwrap_or(SrsLevel::Apprentice)
    }

    /// `None` for burned streaks: they aren't scheduled anymore.
    pub fn next_review_delay(&self, streak: i32) -> Option<Duration> {
        if streak >= self.burned_streak() {
            return None;
        }
        let last = self.review_hours.len().checked_sub(1)?;
        let index = (streak.max(0) as usize).min(last);
        Some(Duration::hours(self.review_hours[index]))
    }

    pub fn is_critical(&self, correct: i32, incorrect: i32) -> bool {
        let attempts = correct + incorrect;
        if attempts < self.critical_min_attempts || attempts <= 0 {
            return false;
        }
        f64::from(correct) / f64::from(attempts) <= self.critical_threshold
    }
}


#[test]
fn test_default_config_is_valid() {
    SrsConfig::default().validate().expect("The default tables should be consistent!");
}

#[test]
fn test_level_for_streak() {
    let config = SrsConfig::default();
    assert_eq!(config.level_for(0), SrsLevel::Apprentice);
    assert_eq!(config.level_for(4), SrsLevel::Apprentice);
    assert_eq!(config.level_for(5), SrsLevel::Guru);
    assert_eq!(config.level_for(6), SrsLevel::Guru);
    assert_eq!(config.level_for(7), SrsLevel::Master);
    assert_eq!(config.level_for(8), SrsLevel::Enlightened);
    assert_eq!(config.level_for(9), SrsLevel::Burned);
    assert_eq!(config.level_for(50), SrsLevel::Burned);
}

#[test]
fn test_level_for_is_monotonic() {
    let config = SrsConfig::default();
    let levels: Vec<SrsLevel> = (0..30).map(|s| config.level_for(s)).collect();
    for pair in levels.windows(2) {
        assert!(pair[0] <= pair[1], "{} came after {}", pair[1], pair[0]);
    }
}

#[test]
fn test_next_review_delay() {
    let config = SrsConfig::default();
    assert_eq!(config.next_review_delay(1), Some(Duration::hours(4)));
    assert_eq!(config.next_review_delay(4), Some(Duration::hours(72)));
    assert_eq!(config.next_review_delay(8), Some(Duration::hours(2160)));
    assert_eq!(config.next_review_delay(9), None);
    assert_eq!(config.next_review_delay(-1), Some(Duration::hours(0)));

    let delays: Vec<Duration> = (0..9).filter_map(|s| config.next_review_delay(s)).collect();
    assert_eq!(delays.len(), 9);
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_criticality_thresholds() {
    let config = SrsConfig::default();
    assert!(!config.is_critical(0, 0));
    assert!(!config.is_critical(0, 2));
    assert!(config.is_critical(0, 3));
    assert!(config.is_critical(1, 3));
    assert!(config.is_critical(3, 1));
    assert!(!config.is_critical(4, 1));
}

#[test]
fn test_invalid_configs_are_rejected() {
    let mut unordered = SrsConfig::default();
    unordered.levels.swap(1, 2);
    assert!(unordered.validate().is_err());

    let mut decreasing = SrsConfig::default();
    decreasing.review_hours[3] = 1;
    assert!(decreasing.validate().is_err());

    let mut short = SrsConfig::default();
    short.review_hours.truncate(4);
    assert!(short.validate().is_err());

    let mut odd_grid = SrsConfig::default();
    odd_grid.rounding_minutes = 7;
    match odd_grid.validate() {
        Err(Error(ErrorKind::InvalidConfig(_), _)) => (),
        other => panic!("Expected InvalidConfig, got {:?}", other),
    }
}

#[test]
fn test_config_from_json_overrides_defaults() {
    let config = SrsConfig::from_json(r#"{ "rounding_minutes": 30, "critical_threshold": 0.5 }"#)
        .unwrap();
    assert_eq!(config.rounding_minutes, 30);
    assert_eq!(config.critical_threshold, 0.5);
    assert_eq!(config.levels, SrsConfig::default().levels);

    let custom = SrsConfig::from_json(r#"{
        "levels": [["APPRENTICE", 0], ["GURU", 2], ["BURNED", 3]],
        "review_hours": [1, 2, 3]
    }"#).unwrap();
    assert_eq!(custom.level_for(2), SrsLevel::Guru);
    assert_eq!(custom.burned_streak(), 3);

    assert!(SrsConfig::from_json(r#"{ "levels": [] }"#).is_err());
}
