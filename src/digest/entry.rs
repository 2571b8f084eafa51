use chrono::NaiveDate;

/// Publication time as broken-down UTC fields.
///
/// Feeds carry all kinds of dates, so the fields are kept as-is and only
/// validated when converted with [`PublishedTime::to_epoch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl PublishedTime {
    /// Converts to Unix epoch seconds.
    ///
    /// Returns `None` when the fields do not describe a real calendar
    /// date/time (month 13, February 30th, hour 24, ...).
    pub fn to_epoch(&self) -> Option<i64> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hour, self.minute, self.second))
            .map(|dt| dt.and_utc().timestamp())
    }
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for PublishedTime {
    fn from(dt: chrono::DateTime<Tz>) -> Self {
        use chrono::{Datelike, Timelike};
        let utc = dt.naive_utc();
        Self {
            year: utc.year(),
            month: utc.month(),
            day: utc.day(),
            hour: utc.hour(),
            minute: utc.minute(),
            second: utc.second(),
        }
    }
}

/// A single feed item flowing through the digest pipeline.
///
/// `title` and `link` default to empty strings rather than being optional.
/// `summary` starts out as the raw feed summary and is replaced by the
/// extractive summary in [`crate::digest::summarize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub link: String,
    /// Publication date as display text.
    pub published: String,
    pub published_parsed: Option<PublishedTime>,
    /// Full body (HTML or text), preferred over `summary` as summarizer input.
    pub content: Option<String>,
    pub summary: String,
    pub thumbnail: Option<String>,
    /// Feed display name.
    pub source: String,
    /// Fetch time, Unix epoch seconds.
    pub timestamp: i64,
}

impl Entry {
    /// Timestamp used for chronological ordering: the parsed publication
    /// time when it converts cleanly, else the fetch timestamp.
    pub fn effective_timestamp(&self) -> i64 {
        self.published_parsed
            .as_ref()
            .and_then(PublishedTime::to_epoch)
            .unwrap_or(self.timestamp)
    }
}
