//! Domain model shared by the storage and engine crates
//!
//! Timestamps are unix seconds (`i64`) throughout; entity ids for players,
//! competitions and score rows are strings minted by the global ID dispenser.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Numeric key of a tenant row in the central directory store.
///
/// Tenant store and lock addressing are pure functions of this value, so it
/// doubles as the shard address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TenantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

static TENANT_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]{0,61}[a-z0-9]$").unwrap());

/// Validate a tenant slug against the fixed naming rule.
pub fn validate_tenant_name(name: &str) -> Result<()> {
    if TENANT_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid tenant name: {name}")))
    }
}

/// An isolated organization. Lives in the central directory store; immutable
/// after creation except for `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub display_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A participant owned exclusively by one tenant's store. Disqualification is
/// a one-way transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub tenant_id: TenantId,
    pub display_name: String,
    pub is_disqualified: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A competition within one tenant. `finished_at` is set at most once; score
/// uploads are accepted only while unfinished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competition {
    pub id: String,
    pub tenant_id: TenantId,
    pub title: String,
    pub finished_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Competition {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// One row of an uploaded score batch.
///
/// Many rows may exist per (player, competition) pair; the authoritative
/// current score is the row with the maximum `row_num` among them, not the
/// most recent timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerScore {
    pub id: String,
    pub tenant_id: TenantId,
    pub player_id: String,
    pub competition_id: String,
    pub score: i64,
    pub row_num: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One ranking view by one player. Lives in the central directory store and
/// feeds the billing aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitHistory {
    pub player_id: String,
    pub tenant_id: TenantId,
    pub competition_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Derived monetary summary for one competition. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingReport {
    pub competition_id: String,
    pub competition_title: String,
    pub player_count: i64,
    pub visitor_count: i64,
    pub billing_player_yen: i64,
    pub billing_visitor_yen: i64,
    pub billing_yen: i64,
}

/// One row of the SaaS-wide billing report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantBilling {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub billing_yen: i64,
}

/// Competition header returned with a ranking page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionSummary {
    pub id: String,
    pub title: String,
    pub is_finished: bool,
}

impl From<&Competition> for CompetitionSummary {
    fn from(c: &Competition) -> Self {
        Self {
            id: c.id.clone(),
            title: c.title.clone(),
            is_finished: c.is_finished(),
        }
    }
}

/// One leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionRank {
    pub rank: i64,
    pub score: i64,
    pub player_id: String,
    pub player_display_name: String,
}

/// One page of a competition leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingPage {
    pub competition: CompetitionSummary,
    pub ranks: Vec<CompetitionRank>,
}

/// One entry of a per-player score report: the player's authoritative score
/// in one competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScoreReport {
    pub competition_title: String,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_tenant_names() {
        for name in ["abc", "a-b", "a0", "x9", "aa"] {
            assert!(validate_tenant_name(name).is_ok(), "expected valid: {name}");
        }
        // 63 chars: leading letter, 61 middle, trailing alnum
        let long = format!("a{}b", "x".repeat(61));
        assert!(validate_tenant_name(&long).is_ok());
    }

    #[test]
    fn rejects_invalid_tenant_names() {
        for name in ["", "a", "A", "9abc", "-abc", "abc-", "ab_c", "ab.c", "日本"] {
            assert!(
                validate_tenant_name(name).is_err(),
                "expected invalid: {name}"
            );
        }
        // one char over the limit
        let too_long = format!("a{}b", "x".repeat(62));
        assert!(validate_tenant_name(&too_long).is_err());
    }

    #[test]
    fn competition_finish_state() {
        let mut c = Competition {
            id: "1".into(),
            tenant_id: TenantId(1),
            title: "spring open".into(),
            finished_at: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(!c.is_finished());
        c.finished_at = Some(100);
        assert!(c.is_finished());
    }

    #[test]
    fn not_found_classification() {
        assert!(Error::PlayerNotFound("p".into()).is_not_found());
        assert!(!Error::Validation("x".into()).is_not_found());
        assert!(!Error::LockTimeout("x".into()).is_not_found());
    }
}
