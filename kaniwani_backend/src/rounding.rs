use chrono::{DateTime, Duration, Timelike, Utc};

fn since_top_of_hour(time: DateTime<Utc>) -> Duration {
    Duration::minutes(i64::from(time.minute()))
        + Duration::seconds(i64::from(time.second()))
        + Duration::nanoseconds(i64::from(time.nanosecond()))
}

/// Zeroes minutes, seconds and fractions, keeping the hour.
pub fn round_to_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    time - since_top_of_hour(time)
}

/// Rounds forward to the next multiple of `grid_minutes` past the hour.
/// A time that already sits on a boundary counts as rounded and comes back unchanged,
/// so the "next boundary" of 10:30:00 on a 15 minute grid is 10:30:00 itself.
/// `grid_minutes` has to divide an hour evenly; `SrsConfig::validate` checks that.
pub fn round_up(time: DateTime<Utc>, grid_minutes: i64) -> DateTime<Utc> {
    let grid = Duration::minutes(grid_minutes);
    let offset = Duration::minutes(i64::from(time.minute()) % grid_minutes)
        + Duration::seconds(i64::from(time.second()))
        + Duration::nanoseconds(i64::from(time.nanosecond()));

    if offset == Duration::zero() {
        time
    } else {
        time + (grid - offset)
    }
}


#[cfg(test)]
fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    use chrono::TimeZone;
    Utc.with_ymd_and_hms(2018, 7, 27, h, m, s).unwrap()
}

#[test]
fn test_round_to_hour_keeps_hour() {
    let rounded = round_to_hour(at(10, 17, 42) + Duration::milliseconds(250));
    assert_eq!(rounded, at(10, 0, 0));
    assert_eq!(rounded.minute(), 0);
    assert_eq!(rounded.hour(), 10);

    assert_eq!(round_to_hour(at(23, 59, 59)), at(23, 0, 0));
    assert_eq!(round_to_hour(at(7, 0, 0)), at(7, 0, 0));
}

#[test]
fn test_round_up_lands_on_grid() {
    let original = at(10, 17, 0);
    let rounded = round_up(original, 15);
    assert_eq!(rounded, at(10, 30, 0));
    assert_eq!(rounded.minute() % 15, 0);
    assert!(rounded >= original);

    assert_eq!(round_up(at(10, 15, 1), 15), at(10, 30, 0));
    assert_eq!(round_up(at(10, 46, 0), 15), at(11, 0, 0));
    assert_eq!(round_up(at(10, 17, 0), 30), at(10, 30, 0));
    assert_eq!(round_up(at(10, 17, 0), 60), at(11, 0, 0));
}

#[test]
fn test_round_up_keeps_aligned_times() {
    assert_eq!(round_up(at(10, 30, 0), 15), at(10, 30, 0));
    assert_eq!(round_up(at(11, 0, 0), 60), at(11, 0, 0));
    assert_eq!(round_up(at(10, 30, 0) + Duration::nanoseconds(1), 15), at(10, 45, 0));
}

#[test]
fn test_round_up_never_goes_backwards() {
    assert_eq!(round_up(at(10, 30, 0), 15), at(10, 30, 0));
    for minute in 0..60 {
        let original = at(13, minute, 5);
        let rounded = round_up(original, 15);
        assert!(rounded >= original);
        assert!(rounded - original < Duration::minutes(15));
        assert_eq!(rounded.minute() % 15, 0);
        assert_eq!(rounded.second(), 0);
    }
}

#[test]
fn test_round_up_crosses_midnight() {
    use chrono::TimeZone;
    let rounded = round_up(at(23, 50, 0), 15);
    assert_eq!(rounded, Utc.with_ymd_and_hms(2018, 7, 28, 0, 0, 0).unwrap());
}
