//! Search strategies: how a name corpus and keyword tiers become phases.
//!
//! A [`Strategy`] is a tagged value selecting one of three generation
//! shapes. All of them produce the same output, an ordered list of
//! [`Phase`](crate::types::Phase)s, so the orchestrator has a single
//! control flow regardless of strategy.
//!
//! ```text
//! PriorityTiered   priority names × priority keywords  (high)
//!                  other names    × reduced keywords   (medium)
//!                  broad keywords alone                (low)
//!
//! FixedCaseSweep   names × keywords, lowercase         (high)
//!                  names × keywords, Title Case        (medium)
//!                  names × keywords, joined            (low)
//!
//! AdHoc            explicit terms                      (configured)
//! ```

pub mod generator;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::Priority;

pub use generator::{generate_phases, plan_summary, PhasePlan};

/// Keyword lists by precision tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTiers {
    /// Paired with priority names in the first phase.
    pub priority: Vec<String>,
    /// Paired with the remaining names in the second phase.
    pub reduced: Vec<String>,
    /// Issued alone in the final phase.
    pub broad: Vec<String>,
}

/// A term generation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Priority names first, then the rest of the corpus, then broad keywords.
    PriorityTiered {
        /// The full name corpus.
        #[serde(default)]
        names: Vec<String>,
        /// Seed list selecting priority names. Entries absent from the
        /// corpus are dropped.
        #[serde(default)]
        priority_names: Vec<String>,
        /// Keyword tiers.
        #[serde(default)]
        keywords: KeywordTiers,
    },
    /// Every name × keyword pairing, swept once per case variation.
    FixedCaseSweep {
        /// The full name corpus.
        #[serde(default)]
        names: Vec<String>,
        /// Keywords paired with every name.
        #[serde(default)]
        keywords: Vec<String>,
    },
    /// A single phase of explicit terms.
    AdHoc {
        /// Terms issued verbatim, in order.
        #[serde(default)]
        terms: Vec<String>,
        /// Priority used for every term.
        #[serde(default)]
        priority: Priority,
    },
}

impl Default for Strategy {
    fn default() -> Self {
        Self::PriorityTiered {
            names: vec!["ahmed".into(), "sara".into(), "omar".into(), "lina".into()],
            priority_names: vec!["ahmed".into()],
            keywords: KeywordTiers {
                priority: vec!["trainer".into(), "coach".into()],
                reduced: vec!["coach".into()],
                broad: vec!["personal trainer".into(), "fitness coach".into()],
            },
        }
    }
}

impl Strategy {
    /// Short name of the strategy variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PriorityTiered { .. } => "priority_tiered",
            Self::FixedCaseSweep { .. } => "fixed_case_sweep",
            Self::AdHoc { .. } => "ad_hoc",
        }
    }

    /// Append corpus entries loaded from elsewhere (e.g. a names file).
    ///
    /// Names for the paired strategies, terms for [`Strategy::AdHoc`].
    pub fn extend_corpus<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        match self {
            Self::PriorityTiered { names, .. } | Self::FixedCaseSweep { names, .. } => {
                names.extend(entries)
            }
            Self::AdHoc { terms, .. } => terms.extend(entries),
        }
    }

    /// Checks that the strategy yields at least one term.
    pub fn validate(&self) -> Result<(), SearchError> {
        generate_phases(self).map(|_| ())
    }
}
