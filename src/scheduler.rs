use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use croner::Cron;
use tokio::task::JoinSet;

use crate::reminder::Reminder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    TomorrowCheck,
    TodayCheck,
    Snapshot,
    StatusLog,
}

impl Job {
    pub const ALL: [Job; 4] = [
        Job::TomorrowCheck,
        Job::TodayCheck,
        Job::Snapshot,
        Job::StatusLog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Job::TomorrowCheck => "tomorrow-check",
            Job::TodayCheck => "today-check",
            Job::Snapshot => "snapshot",
            Job::StatusLog => "status-log",
        }
    }

    pub fn cron(self) -> &'static str {
        match self {
            Job::TomorrowCheck => "50 23 * * *",
            Job::TodayCheck => "1 0 * * *",
            Job::Snapshot => "0 2 * * 0",
            Job::StatusLog => "0 */6 * * *",
        }
    }

    async fn run(self, reminder: &Reminder) {
        match self {
            Job::TomorrowCheck => {
                reminder.check(1).await;
            }
            Job::TodayCheck => {
                reminder.check(0).await;
            }
            Job::Snapshot => {
                reminder.store().snapshot();
            }
            Job::StatusLog => reminder.log_status(),
        }
    }
}

struct Entry {
    job: Job,
    cron: Cron,
}

/// Fires each [`Job`] on its cron schedule in the configured timezone.
pub struct Scheduler {
    reminder: Arc<Reminder>,
    timezone: Tz,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new(reminder: Arc<Reminder>) -> Result<Self> {
        let timezone = reminder.config().timezone;
        let entries = Job::ALL
            .into_iter()
            .map(|job| -> Result<Entry> {
                let cron: Cron = job.cron().parse().map_err(|e| {
                    anyhow::anyhow!("Failed to parse cron '{}' for {}: {}", job.cron(), job.name(), e)
                })?;
                Ok(Entry { job, cron })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            reminder,
            timezone,
            entries,
        })
    }

    /// Next fire time of every job strictly after `after`.
    pub fn next_runs(&self, after: &DateTime<Tz>) -> Result<Vec<(Job, DateTime<Tz>)>> {
        self.entries
            .iter()
            .map(|entry| -> Result<(Job, DateTime<Tz>)> {
                Ok((entry.job, next_after(&entry.cron, after)?))
            })
            .collect()
    }

    /// Run every job forever. Returns only if all job loops stop.
    pub async fn start(self) -> Result<()> {
        let now = Utc::now().with_timezone(&self.timezone);
        for (job, at) in self.next_runs(&now)? {
            tracing::info!(job = job.name(), "Next run at {}", at.format("%Y-%m-%d %H:%M %Z"));
        }

        let mut set = JoinSet::new();
        for entry in self.entries {
            set.spawn(job_loop(self.reminder.clone(), self.timezone, entry));
        }
        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                tracing::error!("Scheduler task ended: {e}");
            }
        }
        Ok(())
    }
}

fn next_after(cron: &Cron, after: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    cron.find_next_occurrence(after, false)
        .map_err(|e| anyhow::anyhow!("No next occurrence: {e}"))
}

async fn job_loop(reminder: Arc<Reminder>, timezone: Tz, entry: Entry) {
    let mut last: Option<DateTime<Tz>> = None;
    loop {
        let now = Utc::now().with_timezone(&timezone);
        let from = match last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        let next = match next_after(&entry.cron, &from) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(job = entry.job.name(), "{e:#}");
                return;
            }
        };

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        last = Some(next);

        tracing::info!(job = entry.job.name(), "Job triggered");
        let job = entry.job;
        let reminder = reminder.clone();
        contain(job, async move { job.run(&reminder).await }).await;
    }
}

/// Run one job invocation in its own task so a panic is logged rather than
/// ending the schedule. Returns whether it completed.
async fn contain<F>(job: Job, fut: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(job = job.name(), "Job failed, service continues: {e}");
            false
        }
    }
}
