use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Outcome of the most recent completed build, as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BuildStatus {
    Success,
    Failure,
    /// Any other feed value (e.g. "Exception", "Unknown"), passed through as-is.
    Other(String),
}

impl From<&str> for BuildStatus {
    fn from(value: &str) -> Self {
        match value {
            "Success" => Self::Success,
            "Failure" => Self::Failure,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::Failure => f.write_str("Failure"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// What the CI server is currently doing with a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Activity {
    /// CCTray calls this "Sleeping".
    Idle,
    Building,
    Other(String),
}

impl From<&str> for Activity {
    fn from(value: &str) -> Self {
        match value {
            "Sleeping" | "Idle" => Self::Idle,
            "Building" => Self::Building,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Building => f.write_str("Building"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// Last build label reported by the feed.
///
/// Only compared for equality between snapshots. The one exception is
/// [`BuildNumber::next`], used when a project starts building and the feed
/// still reports the previous build's label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildNumber(String);

impl BuildNumber {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The following build's number, if this label is an integer.
    pub fn next(&self) -> Option<Self> {
        self.0
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .map(|n| Self(n.to_string()))
    }
}

impl From<u64> for BuildNumber {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One project's last known build state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRecord {
    pub name: String,
    pub number: BuildNumber,
    pub status: BuildStatus,
    pub activity: Activity,
}

impl fmt::Display for BuildRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} - {}",
            self.name, self.number, self.status, self.activity
        )
    }
}

/// All builds known to the feed at one instant, keyed by project name.
///
/// Keeps feed order so notifications come out in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    builds: IndexMap<String, BuildRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any earlier record with the same name.
    pub fn insert(&mut self, record: BuildRecord) {
        self.builds.insert(record.name.clone(), record);
    }

    pub fn get(&self, name: &str) -> Option<&BuildRecord> {
        self.builds.get(name)
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildRecord> {
        self.builds.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut BuildRecord> {
        self.builds.values_mut()
    }
}

impl FromIterator<BuildRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = BuildRecord>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

#[cfg(test)]
pub(crate) fn record(name: &str, number: u64, status: &str, activity: &str) -> BuildRecord {
    BuildRecord {
        name: name.to_string(),
        number: BuildNumber::from(number),
        status: BuildStatus::from(status),
        activity: Activity::from(activity),
    }
}
