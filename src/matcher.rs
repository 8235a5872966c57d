use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::store::BirthdayRecord;

/// Calendar date today in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// The two renderings of a target date a stored `date` is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKeys {
    pub target: NaiveDate,
    pub month_day: String,
    pub day_month: String,
}

impl DateKeys {
    pub fn new(today: NaiveDate, days_ahead: u32) -> Self {
        let target = today
            .checked_add_days(Days::new(u64::from(days_ahead)))
            .unwrap_or(NaiveDate::MAX);
        Self {
            target,
            month_day: target.format("%m-%d").to_string(),
            day_month: target.format("%d-%m").to_string(),
        }
    }

    pub fn matches(&self, record: &BirthdayRecord) -> bool {
        record.is_valid() && (record.date == self.month_day || record.date == self.day_month)
    }
}

/// Records whose date equals either rendering of `today + days_ahead`,
/// in store order.
pub fn find_birthdays(
    records: &[BirthdayRecord],
    today: NaiveDate,
    days_ahead: u32,
) -> Vec<BirthdayRecord> {
    let keys = DateKeys::new(today, days_ahead);
    tracing::info!(
        "Checking for birthdays on {} (MM-DD) or {} (DD-MM)",
        keys.month_day,
        keys.day_month
    );

    let found: Vec<_> = records.iter().filter(|r| keys.matches(r)).cloned().collect();

    tracing::info!("Found {} birthday(s)", found.len());
    for (i, b) in found.iter().enumerate() {
        tracing::info!("  {}. {} ({})", i + 1, b.name, b.date);
    }
    found
}
