//! Local prompt quality analysis.
//!
//! The router asks a [`QualityAnalyzer`] whether a request is good enough to
//! compile locally. A reliable request never reaches a backend.

use crate::PromptRequest;
use serde::Serialize;

/// Score at or above which a request is considered reliable.
pub const RELIABLE_SCORE: u32 = 75;

/// Verdict of a quality analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub score: u32,
    pub is_reliable: bool,
    pub issues: Vec<String>,
}

/// Scores a request without side effects.
pub trait QualityAnalyzer: Send + Sync {
    fn analyze(&self, request: &PromptRequest) -> Analysis;
}

/// Weighted heuristic over the four sections of a request.
///
/// | Section | Requirement | Weight |
/// |---|---|---|
/// | role | at least 5 chars | 20 |
/// | context | at least 10 chars | 20 |
/// | task | at least 50 chars | 40 |
/// | constraints | at least 2 entries | 20 |
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl QualityAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, request: &PromptRequest) -> Analysis {
        let mut score = 0;
        let mut issues = Vec::new();

        if request.role.trim().len() >= 5 {
            score += 20;
        } else {
            issues.push("missing role".to_string());
        }

        if request.context.trim().len() >= 10 {
            score += 20;
        } else {
            issues.push("missing context".to_string());
        }

        if request.task.trim().len() >= 50 {
            score += 40;
        } else {
            issues.push("weak task".to_string());
        }

        if request.constraints.len() >= 2 {
            score += 20;
        } else {
            issues.push("no constraints".to_string());
        }

        Analysis {
            score,
            is_reliable: score >= RELIABLE_SCORE,
            issues,
        }
    }
}
