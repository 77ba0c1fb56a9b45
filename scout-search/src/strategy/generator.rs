//! Phase and term generation.
//!
//! Terms are generated once at the start of a run and are read-only
//! afterwards. A term text appears at most once across all phases; when
//! two phases would produce the same text the earlier phase keeps it.

use std::collections::HashSet;
use std::fmt;

use crate::error::SearchError;
use crate::types::{Phase, Priority, Term};

use super::{KeywordTiers, Strategy};

/// Expand a strategy into its ordered phases.
///
/// Empty phases are kept so phase ids stay stable; the orchestrator skips
/// them.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the strategy yields no terms at all.
pub fn generate_phases(strategy: &Strategy) -> Result<Vec<Phase>, SearchError> {
    let mut builder = PhaseBuilder::default();

    match strategy {
        Strategy::PriorityTiered {
            names,
            priority_names,
            keywords,
        } => tiered(&mut builder, names, priority_names, keywords),
        Strategy::FixedCaseSweep { names, keywords } => sweep(&mut builder, names, keywords),
        Strategy::AdHoc { terms, priority } => {
            builder.begin("ad-hoc", *priority);
            for term in clean_list(terms) {
                builder.push(term.clone(), term);
            }
        }
    }

    let phases = builder.finish();
    if phases.iter().all(Phase::is_empty) {
        return Err(SearchError::Config(format!(
            "{} strategy produces no search terms",
            strategy.kind()
        )));
    }
    Ok(phases)
}

fn tiered(builder: &mut PhaseBuilder, names: &[String], seeds: &[String], keywords: &KeywordTiers) {
    let corpus = clean_list(names);
    let (priority, remaining) = partition_priority(&corpus, seeds);

    builder.begin("priority", Priority::High);
    for name in &priority {
        for keyword in clean_list(&keywords.priority) {
            builder.push(format!("{name} {keyword}"), format!("{name} + {keyword}"));
        }
    }

    builder.begin("remaining", Priority::Medium);
    for name in &remaining {
        for keyword in clean_list(&keywords.reduced) {
            builder.push(format!("{name} {keyword}"), format!("{name} + {keyword}"));
        }
    }

    builder.begin("broad", Priority::Low);
    for keyword in clean_list(&keywords.broad) {
        builder.push(keyword.clone(), keyword);
    }
}

fn sweep(builder: &mut PhaseBuilder, names: &[String], keywords: &[String]) {
    let names = clean_list(names);
    let keywords = clean_list(keywords);

    let variations: [(&str, Priority, fn(&str, &str) -> String); 3] = [
        ("lowercase", Priority::High, |n, k| {
            format!("{n} {k}").to_lowercase()
        }),
        ("title-case", Priority::Medium, |n, k| {
            format!("{} {}", title_case(n), title_case(k))
        }),
        ("joined", Priority::Low, |n, k| {
            format!("{n}{k}").replace(char::is_whitespace, "").to_lowercase()
        }),
    ];

    for (phase_name, priority, render) in variations {
        builder.begin(phase_name, priority);
        for name in &names {
            for keyword in &keywords {
                builder.push(render(name, keyword), format!("{name} + {keyword}"));
            }
        }
    }
}

/// Split the corpus into priority names (seed order) and the remainder
/// (corpus order). Seeds missing from the corpus are dropped silently.
fn partition_priority(corpus: &[String], seeds: &[String]) -> (Vec<String>, Vec<String>) {
    let mut priority: Vec<String> = Vec::new();
    for seed in clean_list(seeds) {
        let folded = seed.to_lowercase();
        match corpus.iter().find(|name| name.to_lowercase() == folded) {
            Some(name) if !priority.contains(name) => priority.push(name.clone()),
            Some(_) => {}
            None => tracing::debug!(seed = %seed, "priority seed not in corpus, dropped"),
        }
    }

    let remaining = corpus
        .iter()
        .filter(|name| !priority.contains(name))
        .cloned()
        .collect();
    (priority, remaining)
}

/// Trim entries, drop blanks, and drop case-insensitive repeats.
fn clean_list(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .map(str::to_owned)
        .collect()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accumulates phases while enforcing run-wide term uniqueness.
#[derive(Default)]
struct PhaseBuilder {
    phases: Vec<Phase>,
    issued: HashSet<String>,
}

impl PhaseBuilder {
    fn begin(&mut self, name: &str, priority: Priority) {
        let id = self.phases.len();
        self.phases.push(Phase {
            id,
            name: name.to_owned(),
            priority,
            terms: Vec::new(),
            expected_count: 0,
        });
    }

    fn push(&mut self, text: String, origin_label: String) {
        let Some(phase) = self.phases.last_mut() else {
            return;
        };
        if !self.issued.insert(text.clone()) {
            return;
        }
        phase.terms.push(Term {
            text,
            priority: phase.priority,
            phase_id: phase.id,
            origin_label,
        });
        phase.expected_count = phase.terms.len();
    }

    fn finish(self) -> Vec<Phase> {
        self.phases
    }
}

/// Dry-run view of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    /// Phase name.
    pub name: String,
    /// Phase priority.
    pub priority: Priority,
    /// Number of terms in the phase.
    pub term_count: usize,
}

impl fmt::Display for PhasePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} {:<7} {} terms",
            self.name,
            self.priority.label(),
            self.term_count
        )
    }
}

/// Summarise phases for a dry run.
pub fn plan_summary(phases: &[Phase]) -> Vec<PhasePlan> {
    phases
        .iter()
        .map(|phase| PhasePlan {
            name: phase.name.clone(),
            priority: phase.priority,
            term_count: phase.terms.len(),
        })
        .collect()
}
