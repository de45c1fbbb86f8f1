//! Calendar rules: the timestamp window, weekends, holiday weeks and
//! the derived calendar fields the report views group by.

use crate::config::GeneratorConfig;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Classification used by the timestamp rejection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClass {
    Weekend,
    HolidayWeek,
    Regular,
}

#[derive(Debug, Clone)]
pub struct Calendar {
    window_start: NaiveDateTime,
    window_seconds: i64,
    /// Inclusive (monday, sunday) pairs.
    holiday_weeks: Vec<(NaiveDate, NaiveDate)>,
}

impl Calendar {
    pub fn new(window_start: NaiveDate, window_end: NaiveDate, holidays: &[NaiveDate]) -> Self {
        let start = window_start.and_time(NaiveTime::MIN);
        let end = window_end.and_time(NaiveTime::MIN);
        Self {
            window_start: start,
            window_seconds: (end - start).num_seconds().max(0),
            holiday_weeks: holidays.iter().map(|h| week_of(*h)).collect(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.window_start, config.window_end, &config.holidays)
    }

    /// Number of whole seconds between the window start and end.
    /// Candidate offsets are drawn from [0, window_seconds].
    pub fn window_seconds(&self) -> i64 {
        self.window_seconds
    }

    pub fn at_offset(&self, seconds: i64) -> NaiveDateTime {
        self.window_start + Duration::seconds(seconds)
    }

    pub fn is_holiday_week(&self, date: NaiveDate) -> bool {
        self.holiday_weeks
            .iter()
            .any(|(start, end)| *start <= date && date <= *end)
    }

    pub fn holiday_weeks(&self) -> &[(NaiveDate, NaiveDate)] {
        &self.holiday_weeks
    }

    /// Weekend takes precedence over holiday week, matching the
    /// order the rejection loop tests its branches in.
    pub fn classify(&self, ts: NaiveDateTime) -> DayClass {
        if is_weekend(ts.date()) {
            DayClass::Weekend
        } else if self.is_holiday_week(ts.date()) {
            DayClass::HolidayWeek
        } else {
            DayClass::Regular
        }
    }
}

/// The Monday..Sunday week containing `date`.
pub fn week_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Quarter-of-year season buckets: months 1–3 Winter, 4–6 Spring,
/// 7–9 Summer, 10–12 Fall.
pub fn season(month: u32) -> &'static str {
    match month {
        1..=3 => "Winter",
        4..=6 => "Spring",
        7..=9 => "Summer",
        _ => "Fall",
    }
}

/// `MM-DD` key used for fixed-date holiday matching.
pub fn month_day(date: NaiveDate) -> String {
    format!("{:02}-{:02}", date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn holiday_week_spans_monday_to_sunday() {
        // 2023-07-04 is a Tuesday.
        let (start, end) = week_of(d(2023, 7, 4));
        assert_eq!(start, d(2023, 7, 3));
        assert_eq!(end, d(2023, 7, 9));
        assert_eq!(start.weekday(), Weekday::Mon);

        // 2023-01-01 is a Sunday: its week starts on the prior Monday.
        let (start, end) = week_of(d(2023, 1, 1));
        assert_eq!(start, d(2022, 12, 26));
        assert_eq!(end, d(2023, 1, 1));
    }

    #[test]
    fn classify_prefers_weekend() {
        let cal = Calendar::from_config(&GeneratorConfig::default());
        let sat = d(2023, 7, 8).and_hms_opt(10, 0, 0).unwrap();
        let wed = d(2023, 7, 5).and_hms_opt(10, 0, 0).unwrap();
        let plain = d(2023, 3, 15).and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(cal.classify(sat), DayClass::Weekend);
        assert_eq!(cal.classify(wed), DayClass::HolidayWeek);
        assert_eq!(cal.classify(plain), DayClass::Regular);
    }

    #[test]
    fn window_covers_the_year() {
        let cal = Calendar::from_config(&GeneratorConfig::default());
        assert_eq!(cal.window_seconds(), 364 * 86_400);
        assert_eq!(cal.at_offset(0), d(2023, 1, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(
            cal.at_offset(cal.window_seconds()),
            d(2023, 12, 31).and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn seasons_and_month_days() {
        assert_eq!(season(1), "Winter");
        assert_eq!(season(6), "Spring");
        assert_eq!(season(9), "Summer");
        assert_eq!(season(12), "Fall");
        assert_eq!(month_day(d(2023, 7, 4)), "07-04");
    }
}
