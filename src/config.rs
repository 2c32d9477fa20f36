use serde::{Deserialize, Serialize};

/// Tunables for one substructure search.
///
/// The defaults enumerate every match with no step limit. Options can be
/// deserialized from any serde format, with missing fields falling back to the
/// defaults:
///
/// ```
/// use chemical_perception::SearchOptions;
///
/// let opts: SearchOptions = serde_json::from_str(r#"{ "step_budget": 10000 }"#).unwrap();
/// assert_eq!(opts.step_budget, Some(10_000));
/// assert_eq!(opts.max_matches, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchOptions {
    /// Maximum number of candidate extensions the matcher may try, recursive
    /// sub-patterns included. Exceeding it fails the search with
    /// [`SearchBudgetExceeded`](crate::PerceptionError::SearchBudgetExceeded).
    pub step_budget: Option<u64>,
    /// Stop after this many distinct results.
    pub max_matches: Option<usize>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_budget(mut self, budget: u64) -> Self {
        self.step_budget = Some(budget);
        self
    }

    pub fn with_max_matches(mut self, max: usize) -> Self {
        self.max_matches = Some(max);
        self
    }
}
