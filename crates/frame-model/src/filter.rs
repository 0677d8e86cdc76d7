//! Time-of-day and weekday filters.
//!
//! Filters are evaluated against local wall-clock time derived from the
//! file modification time. Both parsers are pure functions so they can be
//! tested without touching the filesystem.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

/// Error returned when a time-of-day value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day '{input}': expected HH:MM or HH:MM:SS")]
pub struct TimeParseError {
    pub input: String,
}

/// Parse a 24-hour `HH:MM` (or `HH:MM:SS`) time of day.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, TimeParseError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| TimeParseError {
            input: input.to_string(),
        })
}

/// An optional time-of-day window with inclusive bounds.
///
/// When `start > end` the window wraps across midnight: a time is kept if it
/// is at or after `start` OR at or before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl TimeWindow {
    /// The window that keeps everything.
    pub const ANY: TimeWindow = TimeWindow {
        start: None,
        end: None,
    };

    pub fn new(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        Self { start, end }
    }

    /// Whether neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether both bounds are set and the window crosses midnight.
    pub fn wraps_midnight(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }

    /// Check a local time of day against the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        match (self.start, self.end) {
            (None, None) => true,
            (Some(start), None) => time >= start,
            (None, Some(end)) => time <= end,
            (Some(start), Some(end)) if start <= end => time >= start && time <= end,
            (Some(start), Some(end)) => time >= start || time <= end,
        }
    }
}

/// A set of weekdays stored as a bitmask (bit 0 = Monday).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    /// Build a set from weekdays.
    pub fn from_days(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut set = Self::EMPTY;
        for day in days {
            set.insert(day);
        }
        set
    }

    /// Inclusive range that wraps around the week (`Fri..=Mon` is four days).
    pub fn range(from: Weekday, to: Weekday) -> Self {
        let mut set = Self::EMPTY;
        let mut day = from;
        loop {
            set.insert(day);
            if day == to {
                return set;
            }
            day = day.succ();
        }
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn union(self, other: WeekdaySet) -> WeekdaySet {
        WeekdaySet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0u8..7)
            .filter_map(|i| Weekday::try_from(i).ok())
            .filter(move |day| self.contains(*day))
    }

    /// Parse a weekday expression; `None` means "no filtering".
    pub fn parse(spec: &str) -> Option<WeekdaySet> {
        parse_weekdays(spec).days
    }
}

impl std::fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl std::fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", names.join(","))
    }
}

/// Result of lenient weekday parsing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedWeekdays {
    /// Parsed set; `None` when nothing usable was found.
    pub days: Option<WeekdaySet>,

    /// Items that could not be parsed and were ignored.
    pub rejected: Vec<String>,
}

const LIST_SEPARATORS: [char; 3] = [',', '，', '、'];
const RANGE_SEPARATORS: [char; 3] = ['-', '~', '–'];
const CJK_PREFIXES: [&str; 5] = ["星期", "禮拜", "礼拜", "週", "周"];

/// Parse a weekday expression such as `mon-fri`, `1-5`, `fri-mon`,
/// `sat,sun` or `週一~週五`.
///
/// Digits are one-based (1 = Monday) unless the expression contains a `0`,
/// in which case every digit is zero-based (0 = Monday). Items that fail to
/// parse are reported in `rejected` and otherwise ignored.
pub fn parse_weekdays(spec: &str) -> ParsedWeekdays {
    let items = split_items(spec);
    if items.is_empty() {
        return ParsedWeekdays::default();
    }

    let zero_based = items
        .iter()
        .flat_map(|item| item.split(RANGE_SEPARATORS))
        .any(|token| token.trim() == "0");

    let mut set = WeekdaySet::EMPTY;
    let mut rejected = Vec::new();
    for item in items {
        match parse_item(&item, zero_based) {
            Some(days) => set = set.union(days),
            None => rejected.push(item),
        }
    }

    ParsedWeekdays {
        days: (!set.is_empty()).then_some(set),
        rejected,
    }
}

/// Split on list separators; within a chunk, whitespace separates items
/// unless the chunk is a range (so `mon - fri` stays one item).
fn split_items(spec: &str) -> Vec<String> {
    let mut items = Vec::new();
    for chunk in spec.split(LIST_SEPARATORS) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        if chunk.contains(RANGE_SEPARATORS) {
            items.push(chunk.split_whitespace().collect::<String>());
        } else {
            items.extend(chunk.split_whitespace().map(str::to_string));
        }
    }
    items
}

fn parse_item(item: &str, zero_based: bool) -> Option<WeekdaySet> {
    match item.split_once(RANGE_SEPARATORS) {
        Some((from, to)) => {
            let from = parse_day(from, zero_based)?;
            let to = parse_day(to, zero_based)?;
            Some(WeekdaySet::range(from, to))
        }
        None => parse_day(item, zero_based).map(|day| WeekdaySet::from_days([day])),
    }
}

fn parse_day(token: &str, zero_based: bool) -> Option<Weekday> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Ok(n) = token.parse::<u8>() {
        let index = if zero_based {
            n
        } else {
            n.checked_sub(1)?
        };
        return Weekday::try_from(index).ok();
    }

    if let Some(day) = parse_cjk_day(token) {
        return Some(day);
    }

    if token.chars().count() == 1 {
        return match token.to_ascii_uppercase().as_str() {
            "M" => Some(Weekday::Mon),
            "T" => Some(Weekday::Tue),
            "W" => Some(Weekday::Wed),
            "R" => Some(Weekday::Thu),
            "F" => Some(Weekday::Fri),
            "S" => Some(Weekday::Sat),
            "U" => Some(Weekday::Sun),
            _ => None,
        };
    }

    match token.to_ascii_lowercase().as_str() {
        "mo" | "mon" | "monday" => Some(Weekday::Mon),
        "tu" | "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "we" | "wed" | "weds" | "wednesday" => Some(Weekday::Wed),
        "th" | "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fr" | "fri" | "friday" => Some(Weekday::Fri),
        "sa" | "sat" | "saturday" => Some(Weekday::Sat),
        "su" | "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_cjk_day(token: &str) -> Option<Weekday> {
    let bare = CJK_PREFIXES
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix))
        .unwrap_or(token);
    match bare {
        "一" => Some(Weekday::Mon),
        "二" => Some(Weekday::Tue),
        "三" => Some(Weekday::Wed),
        "四" => Some(Weekday::Thu),
        "五" => Some(Weekday::Fri),
        "六" => Some(Weekday::Sat),
        "日" | "天" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Combined time-of-day and weekday predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFilter {
    pub time_window: TimeWindow,
    pub weekdays: Option<WeekdaySet>,
}

impl FrameFilter {
    /// A filter that keeps every frame.
    pub const NONE: FrameFilter = FrameFilter {
        time_window: TimeWindow::ANY,
        weekdays: None,
    };

    pub fn new(time_window: TimeWindow, weekdays: Option<WeekdaySet>) -> Self {
        Self {
            time_window,
            weekdays,
        }
    }

    /// Whether the filter keeps everything.
    pub fn is_noop(&self) -> bool {
        self.time_window.is_unbounded() && self.weekdays.is_none()
    }

    /// Check a local wall-clock timestamp.
    pub fn accepts(&self, local: NaiveDateTime) -> bool {
        self.time_window.contains(local.time())
            && self
                .weekdays
                .map_or(true, |set| set.contains(local.weekday()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn days(set: WeekdaySet) -> Vec<Weekday> {
        set.iter().collect()
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("22:00").unwrap(), t(22, 0));
        assert_eq!(parse_time_of_day("5:30").unwrap(), t(5, 30));
        assert_eq!(
            parse_time_of_day("05:30:15").unwrap(),
            NaiveTime::from_hms_opt(5, 30, 15).unwrap()
        );
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("noon").is_err());
    }

    #[test]
    fn test_plain_window_is_inclusive() {
        let window = TimeWindow::new(Some(t(8, 0)), Some(t(17, 0)));
        assert!(!window.wraps_midnight());
        assert!(window.contains(t(8, 0)));
        assert!(window.contains(t(12, 0)));
        assert!(window.contains(t(17, 0)));
        assert!(!window.contains(t(7, 59)));
        assert!(!window.contains(NaiveTime::from_hms_opt(17, 0, 1).unwrap()));
    }

    #[test]
    fn test_midnight_wrap_window() {
        let window = TimeWindow::new(Some(t(22, 0)), Some(t(5, 30)));
        assert!(window.wraps_midnight());
        assert!(window.contains(t(23, 0)));
        assert!(window.contains(t(2, 0)));
        assert!(!window.contains(t(12, 0)));
    }

    #[test]
    fn test_midnight_wrap_boundaries_are_inclusive() {
        let window = TimeWindow::new(Some(t(22, 0)), Some(t(5, 30)));
        assert!(window.contains(t(22, 0)));
        assert!(window.contains(t(5, 30)));
        assert!(window.contains(t(0, 0)));
        assert!(!window.contains(t(21, 59)));
        assert!(!window.contains(t(5, 31)));
    }

    #[test]
    fn test_half_open_windows() {
        let from = TimeWindow::new(Some(t(6, 0)), None);
        assert!(from.contains(t(6, 0)));
        assert!(from.contains(t(23, 59)));
        assert!(!from.contains(t(5, 59)));

        let until = TimeWindow::new(None, Some(t(6, 0)));
        assert!(until.contains(t(0, 0)));
        assert!(until.contains(t(6, 0)));
        assert!(!until.contains(t(6, 1)));

        assert!(TimeWindow::ANY.contains(t(13, 37)));
    }

    #[test]
    fn test_mon_fri() {
        let set = WeekdaySet::parse("mon-fri").unwrap();
        assert_eq!(
            days(set),
            vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri
            ]
        );
    }

    #[test]
    fn test_fri_mon_wraps() {
        let set = WeekdaySet::parse("fri-mon").unwrap();
        assert_eq!(
            days(set),
            vec![Weekday::Mon, Weekday::Fri, Weekday::Sat, Weekday::Sun]
        );
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_numeric_one_based_matches_names() {
        assert_eq!(WeekdaySet::parse("1-5"), WeekdaySet::parse("mon-fri"));
        assert_eq!(
            WeekdaySet::parse("7"),
            Some(WeekdaySet::from_days([Weekday::Sun]))
        );
    }

    #[test]
    fn test_numeric_zero_based() {
        assert_eq!(WeekdaySet::parse("0-4"), WeekdaySet::parse("mon-fri"));
        assert_eq!(
            WeekdaySet::parse("0,6"),
            Some(WeekdaySet::from_days([Weekday::Mon, Weekday::Sun]))
        );
    }

    #[test]
    fn test_names_are_case_insensitive_and_long_forms_work() {
        assert_eq!(
            WeekdaySet::parse("Saturday, SUN"),
            Some(WeekdaySet::from_days([Weekday::Sat, Weekday::Sun]))
        );
        assert_eq!(
            WeekdaySet::parse("Tues-Thurs"),
            Some(WeekdaySet::from_days([
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu
            ]))
        );
        assert_eq!(
            WeekdaySet::parse("sa-su"),
            Some(WeekdaySet::from_days([Weekday::Sat, Weekday::Sun]))
        );
        assert_eq!(
            WeekdaySet::parse("fr - mo"),
            Some(WeekdaySet::from_days([
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
                Weekday::Mon
            ]))
        );
        assert_eq!(
            WeekdaySet::parse("MO,WE,TH"),
            Some(WeekdaySet::from_days([
                Weekday::Mon,
                Weekday::Wed,
                Weekday::Thu
            ]))
        );
    }

    #[test]
    fn test_single_letters() {
        assert_eq!(
            WeekdaySet::parse("M,W,F"),
            Some(WeekdaySet::from_days([
                Weekday::Mon,
                Weekday::Wed,
                Weekday::Fri
            ]))
        );
        assert_eq!(
            WeekdaySet::parse("r-u"),
            Some(WeekdaySet::range(Weekday::Thu, Weekday::Sun))
        );
    }

    #[test]
    fn test_cjk_tokens() {
        assert_eq!(WeekdaySet::parse("一-五"), WeekdaySet::parse("mon-fri"));
        assert_eq!(WeekdaySet::parse("週一~週五"), WeekdaySet::parse("mon-fri"));
        assert_eq!(
            WeekdaySet::parse("六、日"),
            Some(WeekdaySet::from_days([Weekday::Sat, Weekday::Sun]))
        );
        assert_eq!(
            WeekdaySet::parse("星期天"),
            Some(WeekdaySet::from_days([Weekday::Sun]))
        );
    }

    #[test]
    fn test_spaced_range_and_whitespace_lists() {
        assert_eq!(WeekdaySet::parse("mon - fri"), WeekdaySet::parse("mon-fri"));
        assert_eq!(WeekdaySet::parse("sat sun"), WeekdaySet::parse("sat,sun"));
    }

    #[test]
    fn test_empty_or_garbage_means_no_filtering() {
        assert_eq!(WeekdaySet::parse(""), None);
        assert_eq!(WeekdaySet::parse("  , "), None);
        assert_eq!(WeekdaySet::parse("someday"), None);
        assert_eq!(WeekdaySet::parse("8-9"), None);
    }

    #[test]
    fn test_bad_items_are_reported_and_skipped() {
        let parsed = parse_weekdays("mon,funday,wed");
        assert_eq!(
            parsed.days,
            Some(WeekdaySet::from_days([Weekday::Mon, Weekday::Wed]))
        );
        assert_eq!(parsed.rejected, vec!["funday".to_string()]);
    }

    #[test]
    fn test_same_day_range_is_single_day() {
        assert_eq!(WeekdaySet::range(Weekday::Wed, Weekday::Wed).len(), 1);
    }

    #[test]
    fn test_frame_filter_combines_time_and_weekday() {
        // 2023-07-26 is a Wednesday.
        let wed_23h = NaiveDate::from_ymd_opt(2023, 7, 26)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let sat_23h = NaiveDate::from_ymd_opt(2023, 7, 29)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let wed_noon = NaiveDate::from_ymd_opt(2023, 7, 26)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let filter = FrameFilter::new(
            TimeWindow::new(Some(t(22, 0)), Some(t(5, 30))),
            WeekdaySet::parse("mon-fri"),
        );
        assert!(filter.accepts(wed_23h));
        assert!(!filter.accepts(sat_23h));
        assert!(!filter.accepts(wed_noon));

        assert!(FrameFilter::NONE.is_noop());
        assert!(FrameFilter::NONE.accepts(sat_23h));
    }
}
