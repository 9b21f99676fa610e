//! Canonical pipeline stage taxonomy and stage-label normalization.
//!
//! Upstream stage labels are free text and arrive in several historical
//! spellings ("Proposal", "Approach/Discovery", "won", ...). Everything the
//! board renders is keyed by the fixed [`Stage`] taxonomy, so raw labels are
//! folded into it through [`normalize`]. Labels the alias table does not
//! recognize are passed through untouched as [`NormalizedStage::Unrecognized`]
//! rather than coerced into a taxonomy key.

use std::fmt;

use serde::{Serialize, Serializer};

/// Canonical pipeline stages, in board column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Prospecting,
    Qualification,
    Discovery,
    PresentationPoc,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl Stage {
    /// All stages in column order. Every board render iterates this.
    pub const ALL: [Stage; 7] = [
        Stage::Prospecting,
        Stage::Qualification,
        Stage::Discovery,
        Stage::PresentationPoc,
        Stage::Negotiation,
        Stage::ClosedWon,
        Stage::ClosedLost,
    ];

    /// The canonical key, also used as the column header.
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Prospecting => "Prospecting",
            Stage::Qualification => "Qualification",
            Stage::Discovery => "Discovery",
            Stage::PresentationPoc => "Presentation/POC",
            Stage::Negotiation => "Negotiation",
            Stage::ClosedWon => "Closed Won",
            Stage::ClosedLost => "Closed Lost",
        }
    }

    /// Color tag for the column header dot.
    pub fn color_tag(&self) -> &'static str {
        match self {
            Stage::Prospecting => "blue",
            Stage::Qualification => "purple",
            Stage::Discovery => "indigo",
            Stage::PresentationPoc => "yellow",
            Stage::Negotiation => "orange",
            Stage::ClosedWon => "green",
            Stage::ClosedLost => "red",
        }
    }

    /// Static probability-of-close weight, display only. The persisted
    /// `probability` column may legitimately disagree with this.
    pub fn probability_weight(&self) -> f64 {
        match self {
            Stage::Prospecting => 0.10,
            Stage::Qualification => 0.20,
            Stage::Discovery => 0.40,
            Stage::PresentationPoc => 0.60,
            Stage::Negotiation => 0.80,
            Stage::ClosedWon => 1.0,
            Stage::ClosedLost => 0.0,
        }
    }

    /// Probability pill value: `round(weight × 100)`.
    pub fn display_probability(&self) -> u8 {
        (self.probability_weight() * 100.0).round() as u8
    }

    /// Position in [`Stage::ALL`], which is also the board column index.
    pub fn column_index(&self) -> usize {
        match self {
            Stage::Prospecting => 0,
            Stage::Qualification => 1,
            Stage::Discovery => 2,
            Stage::PresentationPoc => 3,
            Stage::Negotiation => 4,
            Stage::ClosedWon => 5,
            Stage::ClosedLost => 6,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

/// Outcome of stage normalization.
///
/// `Canonical` carries a taxonomy member; `Unrecognized` carries the trimmed
/// original label. Unrecognized stages join no board column (see
/// `board::group_by_stage`), so callers must treat normalization as
/// best-effort, not a guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedStage {
    Canonical(Stage),
    Unrecognized(String),
}

impl NormalizedStage {
    /// The label as rendered: canonical key or the original passthrough text.
    pub fn as_str(&self) -> &str {
        match self {
            NormalizedStage::Canonical(stage) => stage.display_name(),
            NormalizedStage::Unrecognized(raw) => raw,
        }
    }

    pub fn canonical(&self) -> Option<Stage> {
        match self {
            NormalizedStage::Canonical(stage) => Some(*stage),
            NormalizedStage::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for NormalizedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NormalizedStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Fold a raw stage label into the taxonomy.
///
/// Trims, then compares case-insensitively against the alias table. The
/// canonical display names themselves always normalize to their own stage,
/// so the function is idempotent on its output.
pub fn normalize(raw: &str) -> NormalizedStage {
    let trimmed = raw.trim();
    let stage = match trimmed.to_lowercase().as_str() {
        "prospecting" => Some(Stage::Prospecting),
        "qualification" => Some(Stage::Qualification),
        "approach/discovery" | "discovery" => Some(Stage::Discovery),
        "presentation/poc" | "presentation / poc" => Some(Stage::PresentationPoc),
        "negotiation" | "proposal" => Some(Stage::Negotiation),
        "closed won" | "won" => Some(Stage::ClosedWon),
        "closed lost" | "lost" => Some(Stage::ClosedLost),
        _ => None,
    };

    match stage {
        Some(stage) => NormalizedStage::Canonical(stage),
        None => NormalizedStage::Unrecognized(trimmed.to_string()),
    }
}
