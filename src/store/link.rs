//! Link record and status definitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness status of a monitored share link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Never successfully resolved.
    Pending,
    /// The last resolution cycle succeeded.
    Active,
    /// The last resolution cycle exhausted its attempts.
    Failed,
}

impl LinkStatus {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LinkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid link status: {s}")),
        }
    }
}

/// One monitored share URL and the outcome of its last check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Share-page URL; the unique key.
    pub url: String,
    /// Current liveness status.
    pub status: LinkStatus,
    /// When the link was added. Never changes afterwards.
    pub added_at: DateTime<Utc>,
    /// When the last resolution cycle finished.
    pub last_check: Option<DateTime<Utc>>,
    /// Reason of the last failed cycle; cleared on success.
    pub error: Option<String>,
}

impl Link {
    /// Creates a never-checked link in `pending` state.
    #[must_use]
    pub fn new_pending(url: impl Into<String>, added_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            status: LinkStatus::Pending,
            added_at,
            last_check: None,
            error: None,
        }
    }

    /// Folds a successful resolution cycle into the record.
    pub fn record_success(&mut self, checked_at: DateTime<Utc>) {
        self.status = LinkStatus::Active;
        self.error = None;
        self.touch(checked_at);
    }

    /// Folds an exhausted resolution cycle into the record.
    pub fn record_failure(&mut self, reason: &str, attempts: u32, checked_at: DateTime<Utc>) {
        self.status = LinkStatus::Failed;
        self.error = Some(format!("failed after {attempts} attempts: {reason}"));
        self.touch(checked_at);
    }

    /// Returns true when the last cycle succeeded.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LinkStatus::Active
    }

    // last_check never moves backwards, even if the clock does.
    fn touch(&mut self, checked_at: DateTime<Utc>) {
        self.last_check = Some(match self.last_check {
            Some(previous) if previous > checked_at => previous,
            _ => checked_at,
        });
    }
}
