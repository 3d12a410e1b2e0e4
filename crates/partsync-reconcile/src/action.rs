//! Staged actions and their outcomes.

use partsync_core::{Collection, ProductLine};
use serde::Serialize;
use serde_json::Value;

/// One level of the Brand → Model → Position → Product hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Brands,
    Models,
    Positions,
    Products,
}

impl Tier {
    /// Tiers whose entities this tier links to.
    #[must_use]
    pub fn depends_on(self) -> &'static [Tier] {
        match self {
            Tier::Brands | Tier::Positions => &[],
            Tier::Models => &[Tier::Brands],
            Tier::Products => &[Tier::Brands, Tier::Models, Tier::Positions],
        }
    }

    #[must_use]
    pub fn collection(self, line: ProductLine) -> Collection {
        match self {
            Tier::Brands => Collection::Brands,
            Tier::Models => Collection::Models,
            Tier::Positions => Collection::Positions,
            Tier::Products => Collection::Products(line),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Brands => write!(f, "brands"),
            Tier::Models => write!(f, "models"),
            Tier::Positions => write!(f, "positions"),
            Tier::Products => write!(f, "products"),
        }
    }
}

/// What the reconciler decided for one source record.
///
/// `label` is the record's `name [slug]` (or `name [ref]` for products).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create { label: String, payload: Value },
    Update { label: String, id: i64, changes: Value },
    Skip { label: String, reason: String },
    /// The record cannot be applied (unresolved parent, cross-brand slug).
    Reject { label: String, reason: String },
}

impl Action {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Action::Create { label, .. }
            | Action::Update { label, .. }
            | Action::Skip { label, .. }
            | Action::Reject { label, .. } => label,
        }
    }

    /// `true` when applying the action sends a request to the catalog.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Action::Create { .. } | Action::Update { .. })
    }
}

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created { label: String, entry: Value },
    Updated { label: String, id: i64, entry: Value },
    Skipped { label: String, reason: String },
    Error { label: String, message: String },
    /// Write that was never sent because its tier was aborted.
    NotSent { label: String },
}

impl Outcome {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Outcome::Created { label, .. }
            | Outcome::Updated { label, .. }
            | Outcome::Skipped { label, .. }
            | Outcome::Error { label, .. }
            | Outcome::NotSent { label } => label,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }
}
