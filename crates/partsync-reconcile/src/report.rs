//! Run summary: per-tier counts, sample errors and review lists.

use partsync_source::DroppedRow;
use serde::Serialize;

use crate::action::{Outcome, Tier};
use crate::executor::TierRun;
use crate::reconciler::SlugCollision;
use crate::suggest::Suggestion;

/// Most error lines kept in a report.
pub const MAX_SAMPLE_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub not_sent: usize,
    pub total: usize,
}

impl TierCounts {
    #[must_use]
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut counts = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Created { .. } => counts.created += 1,
                Outcome::Updated { .. } => counts.updated += 1,
                Outcome::Skipped { .. } => counts.skipped += 1,
                Outcome::Error { .. } => counts.errors += 1,
                Outcome::NotSent { .. } => counts.not_sent += 1,
            }
        }
        counts
    }

    fn plus(self, other: Self) -> Self {
        Self {
            created: self.created + other.created,
            updated: self.updated + other.updated,
            skipped: self.skipped + other.skipped,
            errors: self.errors + other.errors,
            not_sent: self.not_sent + other.not_sent,
            total: self.total + other.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierReport {
    pub tier: Tier,
    pub collection: String,
    #[serde(flatten)]
    pub counts: TierCounts,
    /// Why the tier stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub source: String,
    pub dry_run: bool,
    pub tiers: Vec<TierReport>,
    pub sample_errors: Vec<String>,
    pub dropped_rows: Vec<DroppedRow>,
    pub slug_collisions: Vec<SlugCollision>,
    pub suggestions: Vec<Suggestion>,
    /// Source rows merged away by drive-variant consolidation.
    pub consolidated: usize,
    /// Duplicate position entries dropped before reconciliation.
    pub deduplicated: usize,
}

impl RunReport {
    #[must_use]
    pub fn new(source: impl Into<String>, dry_run: bool) -> Self {
        Self {
            source: source.into(),
            dry_run,
            ..Self::default()
        }
    }

    /// Record the outcomes of one tier.
    pub fn record_tier(&mut self, tier: Tier, collection: impl Into<String>, run: &TierRun) {
        for outcome in &run.outcomes {
            if let Outcome::Error { label, message } = outcome {
                self.push_error(format!("{tier}: {label}: {message}"));
            }
        }
        let counts = TierCounts::from_outcomes(&run.outcomes);
        self.tiers.push(TierReport {
            tier,
            collection: collection.into(),
            counts,
            aborted: run
                .aborted
                .then(|| "first batch failed entirely; remaining writes not sent".to_owned()),
        });
    }

    /// Record a tier that never ran.
    pub fn abort_tier(&mut self, tier: Tier, collection: impl Into<String>, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(tier = %tier, reason = %reason, "tier aborted");
        self.push_error(format!("{tier}: aborted: {reason}"));
        self.tiers.push(TierReport {
            tier,
            collection: collection.into(),
            counts: TierCounts::default(),
            aborted: Some(reason),
        });
    }

    fn push_error(&mut self, line: String) {
        if self.sample_errors.len() < MAX_SAMPLE_ERRORS {
            self.sample_errors.push(line);
        }
    }

    #[must_use]
    pub fn is_aborted(&self, tier: Tier) -> bool {
        self.tiers.iter().any(|t| t.tier == tier && t.aborted.is_some())
    }

    /// `true` when any tier stopped early.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.tiers.iter().any(|t| t.aborted.is_some())
    }

    /// Sum of the counts across tiers.
    #[must_use]
    pub fn totals(&self) -> TierCounts {
        self.tiers
            .iter()
            .fold(TierCounts::default(), |acc, t| acc.plus(t.counts))
    }

    /// Counts for `tier`, summed over every collection it touched.
    #[must_use]
    pub fn counts(&self, tier: Tier) -> TierCounts {
        self.tiers
            .iter()
            .filter(|t| t.tier == tier)
            .fold(TierCounts::default(), |acc, t| acc.plus(t.counts))
    }

    /// Human-readable summary, one line per entry.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}{}",
            self.source,
            if self.dry_run { " (dry run)" } else { "" }
        )];
        for t in &self.tiers {
            let c = t.counts;
            let mut line = format!(
                "  {:<10} {:<18} created={} updated={} skipped={} errors={} total={}",
                t.tier.to_string(),
                t.collection,
                c.created,
                c.updated,
                c.skipped,
                c.errors,
                c.total
            );
            if c.not_sent > 0 {
                line.push_str(&format!(" not_sent={}", c.not_sent));
            }
            if let Some(reason) = &t.aborted {
                line.push_str(&format!(" ABORTED: {reason}"));
            }
            lines.push(line);
        }
        if !self.dropped_rows.is_empty() {
            lines.push(format!("  dropped source rows: {}", self.dropped_rows.len()));
        }
        if self.consolidated > 0 || self.deduplicated > 0 {
            lines.push(format!(
                "  consolidated variants: {}, duplicate positions: {}",
                self.consolidated, self.deduplicated
            ));
        }
        if !self.slug_collisions.is_empty() {
            lines.push(format!("  slug collisions: {}", self.slug_collisions.len()));
        }
        if !self.suggestions.is_empty() {
            lines.push(format!("  suggestions for review: {}", self.suggestions.len()));
        }
        if !self.sample_errors.is_empty() {
            lines.push("  errors:".to_owned());
            lines.extend(self.sample_errors.iter().map(|e| format!("    {e}")));
        }
        lines
    }
}
