use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::config::Config;
use crate::matcher::{self, DateKeys};
use crate::message;
use crate::store::{self, BirthdayStore};
use crate::telegram::{MAX_ATTEMPTS, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    NoBirthdays,
    Sent(usize),
    Failed(usize),
}

/// The job actions: birthday checks, status and diagnostics.
pub struct Reminder {
    config: Config,
    store: BirthdayStore,
    notifier: Notifier,
}

impl Reminder {
    pub fn new(config: Config, store: BirthdayStore, notifier: Notifier) -> Self {
        Self {
            config,
            store,
            notifier,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &BirthdayStore {
        &self.store
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.config.timezone)
    }

    pub async fn check(&self, days_ahead: u32) -> CheckOutcome {
        self.check_on(matcher::today_in(self.config.timezone), days_ahead)
            .await
    }

    /// Find birthdays `days_ahead` of `today`, and notify the chat if any.
    pub async fn check_on(&self, today: NaiveDate, days_ahead: u32) -> CheckOutcome {
        if let Err(e) = self.store.ensure() {
            tracing::error!("{e:#}");
        }
        let records = self.store.read_all();
        let found = matcher::find_birthdays(&records, today, days_ahead);

        let Some(text) = message::compose(&self.config.username, &found, days_ahead) else {
            tracing::info!(days_ahead, "No birthdays, no reminder needed");
            return CheckOutcome::NoBirthdays;
        };

        tracing::info!("Message to send:\n{text}");
        if self.notifier.send(&text, MAX_ATTEMPTS).await {
            tracing::info!(days_ahead, count = found.len(), "Birthday reminder sent");
            CheckOutcome::Sent(found.len())
        } else {
            tracing::error!(days_ahead, count = found.len(), "Failed to send birthday reminder");
            CheckOutcome::Failed(found.len())
        }
    }

    pub async fn send_test(&self) -> bool {
        let text = message::test_message(&self.config.username, &self.config.bot_api, self.now());
        let sent = self.notifier.send(&text, MAX_ATTEMPTS).await;
        if sent {
            tracing::info!("Test reminder sent");
        } else {
            tracing::error!("Test reminder failed");
        }
        sent
    }

    pub fn log_status(&self) {
        for line in self.status_report(self.now()).lines() {
            tracing::info!("{line}");
        }
    }

    pub fn status_report(&self, now: DateTime<Tz>) -> String {
        let cfg = &self.config;
        let mut out = String::new();
        let _ = writeln!(out, "=== Birthday Reminder Status ===");
        let _ = writeln!(out, "Current time: {}", now.format("%Y-%m-%d %H:%M:%S %Z"));
        let _ = writeln!(out, "Username: {}", cfg.username);
        let _ = writeln!(out, "Data file: {}", self.store.path().display());
        let _ = writeln!(out, "Bot token: {}", cfg.masked_token());
        let _ = writeln!(out, "Chat ID: {}", cfg.chat_id);
        let _ = writeln!(out, "Bot API: {}", cfg.bot_api);
        match self.store.read_raw().and_then(|raw| store::parse_entries(&raw)) {
            Ok(entries) => {
                let total = entries.len();
                let readable = store::records_from(entries).len();
                let _ = writeln!(out, "Total birthdays in store: {total}");
                if readable != total {
                    let _ = writeln!(out, "Readable records: {readable} of {total}");
                }
            }
            Err(_) => {
                let _ = writeln!(out, "Could not read data file");
            }
        }
        out
    }

    /// Walk through tomorrow's check without sending anything.
    pub fn debug_report(&self, today: NaiveDate) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "DEBUG: checking birthday data");

        let raw = match self.store.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                let _ = writeln!(out, "Debug error: {e:#}");
                return out;
            }
        };
        let _ = writeln!(out, "Raw data from file: {raw}");

        let records = match store::parse_records(&raw) {
            Ok(records) => records,
            Err(e) => {
                let _ = writeln!(out, "Debug error: {e:#}");
                return out;
            }
        };
        let _ = writeln!(out, "Parsed records: {}", records.len());

        let keys = DateKeys::new(today, 1);
        let _ = writeln!(out, "Tomorrow's date: {}", keys.target.format("%a %b %d %Y"));
        let _ = writeln!(
            out,
            "Looking for: {} (MM-DD) or {} (DD-MM)",
            keys.month_day, keys.day_month
        );

        let mut found = Vec::new();
        for (i, entry) in records.iter().enumerate() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Entry {}:", i + 1);
            let _ = writeln!(out, "   Name: {:?}", entry.name);
            let _ = writeln!(out, "   Date: {:?}", entry.date);
            let _ = writeln!(out, "   Gender: {:?}", entry.gender);
            let _ = writeln!(out, "   Matches MM-DD: {}", entry.date == keys.month_day);
            let _ = writeln!(out, "   Matches DD-MM: {}", entry.date == keys.day_month);
            if !entry.is_valid() {
                let _ = writeln!(out, "   Invalid entry: name and date are required");
            } else if keys.matches(entry) {
                found.push(entry.clone());
            }
        }

        let _ = writeln!(out);
        let names: Vec<_> = found.iter().map(|r| r.name.as_str()).collect();
        let _ = writeln!(out, "Found birthdays: {names:?}");
        if let Some(text) = message::compose(&self.config.username, &found, 1) {
            let _ = writeln!(out);
            let _ = writeln!(out, "Generated message:\n{text}");
        }
        out
    }
}
