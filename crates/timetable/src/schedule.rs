use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use rollcall_core::{DomainError, ValueObject};

/// Teaching day of the week.
///
/// Declaration order is calendar order; `Schedule` relies on it for key order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }

    /// Resolve a free-form day key ("Monday", "monday", "Mon", "MON").
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL.into_iter().find(|day| {
            let name = day.as_str();
            key.eq_ignore_ascii_case(name) || key.eq_ignore_ascii_case(&name[..3])
        })
    }
}

impl core::fmt::Display for Weekday {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time of day with minute precision, rendered as 24-hour `HH:MM`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, DomainError> {
        if hour > 23 || minute > 59 {
            return Err(DomainError::validation(format!(
                "time out of range: {hour:02}:{minute:02}"
            )));
        }
        Ok(Self {
            minutes: u16::from(hour) * 60 + u16::from(minute),
        })
    }

    pub fn hour(&self) -> u8 {
        (self.minutes / 60) as u8
    }

    pub fn minute(&self) -> u8 {
        (self.minutes % 60) as u8
    }

    /// Minutes since midnight.
    pub fn minutes_since_midnight(&self) -> u16 {
        self.minutes
    }
}

impl FromStr for ClockTime {
    type Err = DomainError;

    /// Accepts `HH:MM` and `H:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| DomainError::validation(format!("expected HH:MM, got {s:?}")))?;

        let well_formed = (1..=2).contains(&hour.len())
            && minute.len() == 2
            && hour.bytes().all(|b| b.is_ascii_digit())
            && minute.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(DomainError::validation(format!("expected HH:MM, got {s:?}")));
        }

        // Digits-only and at most two characters, so these cannot overflow a u8.
        let hour: u8 = hour
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid hour in {s:?}")))?;
        let minute: u8 = minute
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid minute in {s:?}")))?;

        Self::new(hour, minute)
    }
}

impl core::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One class in the weekly timetable.
///
/// A class spanning several periods is a single entry from its true start to
/// its true end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub subject: String,
    pub teacher: String,
    pub room: String,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl ValueObject for SessionEntry {}

impl SessionEntry {
    /// Build an entry, enforcing `start_time < end_time` and a non-empty subject.
    pub fn new(
        subject: impl Into<String>,
        teacher: impl Into<String>,
        room: impl Into<String>,
        start_time: ClockTime,
        end_time: ClockTime,
    ) -> Result<Self, DomainError> {
        let subject = subject.into().trim().to_string();
        if subject.is_empty() {
            return Err(DomainError::validation("subject must not be empty"));
        }
        if start_time >= end_time {
            return Err(DomainError::invariant(format!(
                "session must end after it starts ({start_time} >= {end_time})"
            )));
        }
        Ok(Self {
            subject,
            teacher: teacher.into().trim().to_string(),
            room: room.into().trim().to_string(),
            start_time,
            end_time,
        })
    }

    /// True when `next` is the same class continuing straight after this one.
    fn continues_into(&self, next: &SessionEntry) -> bool {
        self.subject == next.subject
            && self.teacher == next.teacher
            && self.room == next.room
            && self.end_time == next.start_time
    }
}

/// Weekly schedule: weekday → session entries ordered by start time.
///
/// Built through [`Schedule::empty`], every weekday is present (possibly with
/// an empty list), matching the wire shape clients expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule {
    days: BTreeMap<Weekday, Vec<SessionEntry>>,
}

impl Schedule {
    pub fn empty() -> Self {
        Self {
            days: Weekday::ALL.into_iter().map(|d| (d, Vec::new())).collect(),
        }
    }

    pub fn day(&self, day: Weekday) -> &[SessionEntry] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn days(&self) -> impl Iterator<Item = (Weekday, &[SessionEntry])> {
        self.days.iter().map(|(d, e)| (*d, e.as_slice()))
    }

    pub fn entry_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Append an entry and restore per-day ordering.
    pub fn insert(&mut self, day: Weekday, entry: SessionEntry) {
        let entries = self.days.entry(day).or_default();
        entries.push(entry);
        Self::tidy(entries);
    }

    /// Sort by start time (stable) and merge back-to-back periods of the same class.
    fn tidy(entries: &mut Vec<SessionEntry>) {
        entries.sort_by_key(|e| e.start_time);

        let mut merged: Vec<SessionEntry> = Vec::with_capacity(entries.len());
        for entry in entries.drain(..) {
            match merged.last_mut() {
                Some(last) if last.continues_into(&entry) => last.end_time = entry.end_time,
                _ => merged.push(entry),
            }
        }
        *entries = merged;
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn entry(subject: &str, start: &str, end: &str) -> SessionEntry {
        SessionEntry::new(subject, "Dr. A", "TG-202", t(start), t(end)).unwrap()
    }

    #[test]
    fn clock_time_parses_and_pads() {
        assert_eq!(t("9:05").to_string(), "09:05");
        assert_eq!(t("23:59").to_string(), "23:59");
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("12:60".parse::<ClockTime>().is_err());
        assert!("1200".parse::<ClockTime>().is_err());
        assert!("12:5".parse::<ClockTime>().is_err());
        assert!("ab:cd".parse::<ClockTime>().is_err());
    }

    #[test]
    fn weekday_keys_are_lenient() {
        assert_eq!(Weekday::from_key("monday"), Some(Weekday::Monday));
        assert_eq!(Weekday::from_key(" FRI "), Some(Weekday::Friday));
        assert_eq!(Weekday::from_key("Saturday"), None);
        assert_eq!(Weekday::from_key(""), None);
    }

    #[test]
    fn session_entry_rejects_inverted_times() {
        let err = SessionEntry::new("CS101", "", "", t("10:00"), t("09:00")).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(SessionEntry::new("CS101", "", "", t("10:00"), t("10:00")).is_err());
        assert!(SessionEntry::new("  ", "", "", t("09:00"), t("10:00")).is_err());
    }

    #[test]
    fn empty_schedule_serializes_every_weekday() {
        let json = serde_json::to_value(Schedule::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Monday": [], "Tuesday": [], "Wednesday": [], "Thursday": [], "Friday": []
            })
        );
    }

    #[test]
    fn insert_orders_by_start_time() {
        let mut schedule = Schedule::empty();
        schedule.insert(Weekday::Tuesday, entry("MA201", "11:00", "12:00"));
        schedule.insert(Weekday::Tuesday, entry("CS101", "09:00", "10:00"));

        let subjects: Vec<_> = schedule
            .day(Weekday::Tuesday)
            .iter()
            .map(|e| e.subject.as_str())
            .collect();
        assert_eq!(subjects, ["CS101", "MA201"]);
    }

    #[test]
    fn back_to_back_periods_of_same_class_merge() {
        let mut schedule = Schedule::empty();
        schedule.insert(Weekday::Monday, entry("LAB", "11:00", "12:00"));
        schedule.insert(Weekday::Monday, entry("LAB", "12:00", "13:00"));
        schedule.insert(Weekday::Monday, entry("LAB", "14:00", "15:00"));

        let monday = schedule.day(Weekday::Monday);
        assert_eq!(monday.len(), 2);
        assert_eq!(monday[0].start_time, t("11:00"));
        assert_eq!(monday[0].end_time, t("13:00"));
        assert_eq!(schedule.entry_count(), 2);
    }
}
