use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: Uuid,
    pub code: String,
    pub percentage: Decimal,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub redeemed_by: Option<Uuid>,
}

impl DiscountCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Why this code cannot be applied at `now`, if anything.
    pub fn issue_at(&self, now: DateTime<Utc>) -> Option<CodeIssue> {
        if self.is_used {
            Some(CodeIssue::AlreadyUsed)
        } else if self.is_expired(now) {
            Some(CodeIssue::Expired)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeIssue {
    NotFound,
    AlreadyUsed,
    Expired,
}

impl CodeIssue {
    pub fn label(self) -> &'static str {
        match self {
            CodeIssue::NotFound => "Invalid discount code",
            CodeIssue::AlreadyUsed => "Code already used",
            CodeIssue::Expired => "Code expired",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodeIssue::NotFound => "not_found",
            CodeIssue::AlreadyUsed => "already_used",
            CodeIssue::Expired => "expired",
        }
    }
}
