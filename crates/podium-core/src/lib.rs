//! Podium Core Types
//!
//! This crate provides the fundamental types used throughout Podium:
//! - Domain model (tenants, players, competitions, scores, visits)
//! - Derived report shapes (billing, ranking pages)
//! - Core error taxonomy

pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{
    BillingReport, Competition, CompetitionRank, CompetitionSummary, Player, PlayerScore,
    PlayerScoreReport, RankingPage, Tenant, TenantBilling, TenantId, VisitHistory,
    validate_tenant_name,
};
