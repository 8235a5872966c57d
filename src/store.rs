use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Decorative category; anything other than male/female is neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => Gender::Unspecified,
        }
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        match value {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unspecified => "",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayRecord {
    #[serde(default)]
    pub name: String,
    /// `MM-DD` or `DD-MM`; never parsed, only compared.
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_gender")]
    pub gender: Gender,
}

/// Null, non-string and unknown values all read as [`Gender::Unspecified`].
fn lenient_gender<'de, D>(deserializer: D) -> std::result::Result<Gender, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Gender::from(s),
        _ => Gender::Unspecified,
    })
}

impl BirthdayRecord {
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.date.trim().is_empty()
    }
}

/// The birthday list file plus the directory its snapshots go to.
pub struct BirthdayStore {
    path: PathBuf,
    backup_dir: PathBuf,
}

impl BirthdayStore {
    pub fn new(path: PathBuf, backup_dir: PathBuf) -> Self {
        Self { path, backup_dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the store holding an empty list if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, "[]")
            .with_context(|| format!("Failed to create store: {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), "Created new birthday store");
        Ok(())
    }

    pub fn ensure_backup_dir(&self) -> Result<()> {
        if !self.backup_dir.exists() {
            std::fs::create_dir_all(&self.backup_dir).with_context(|| {
                format!("Failed to create backup dir: {}", self.backup_dir.display())
            })?;
            tracing::info!(path = %self.backup_dir.display(), "Created backup directory");
        }
        Ok(())
    }

    pub fn read_raw(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store: {}", self.path.display()))
    }

    /// Parse the store. Elements that are not records are dropped with a
    /// warning; a file that is not a JSON array is an error.
    pub fn load(&self) -> Result<Vec<BirthdayRecord>> {
        let raw = self.read_raw()?;
        parse_records(&raw)
    }

    /// Like [`load`](Self::load), but every failure is logged and read as
    /// an empty list.
    pub fn read_all(&self) -> Vec<BirthdayRecord> {
        match self.load() {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Invalid birthday store, treating as empty: {e:#}");
                Vec::new()
            }
        }
    }

    /// Copy the store into the backup directory. Failures are logged and
    /// yield `None`.
    pub fn snapshot(&self) -> Option<PathBuf> {
        match self.try_snapshot(Utc::now()) {
            Ok(Some(path)) => {
                tracing::info!(path = %path.display(), "Data backed up");
                Some(path)
            }
            Ok(None) => {
                tracing::warn!(path = %self.path.display(), "No store file to back up");
                None
            }
            Err(e) => {
                tracing::error!("Backup failed: {e:#}");
                None
            }
        }
    }

    fn try_snapshot(&self, now: DateTime<Utc>) -> Result<Option<PathBuf>> {
        self.ensure_backup_dir()?;
        if !self.path.exists() {
            return Ok(None);
        }
        let target = self.backup_dir.join(backup_file_name(now));
        std::fs::copy(&self.path, &target).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                self.path.display(),
                target.display()
            )
        })?;
        Ok(Some(target))
    }
}

/// Top-level elements of the store, whatever their shape.
pub fn parse_entries(raw: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(raw).context("Store is not valid JSON")?;
    let Value::Array(items) = value else {
        anyhow::bail!("Store is not a JSON array");
    };
    Ok(items)
}

pub fn parse_records(raw: &str) -> Result<Vec<BirthdayRecord>> {
    Ok(records_from(parse_entries(raw)?))
}

pub fn records_from(items: Vec<Value>) -> Vec<BirthdayRecord> {
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<BirthdayRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(index, "Skipping malformed store entry: {e}"),
        }
    }
    records
}

/// `data_backup_<ISO-8601>.json` with `:` and `.` replaced by `-`.
pub fn backup_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("data_backup_{stamp}.json")
}
