//! # Candidate Selection
//!
//! Capacity filtering and the uniform random tie-break used to spread load
//! across eligible operators. Sampling is always over the filtered set.

use crate::models::OperatorCandidate;
use parking_lot::Mutex;

/// Keep ACTIVE candidates below their limit that serve `jurisdiction`
pub fn filter_eligible(
    candidates: Vec<OperatorCandidate>,
    jurisdiction: &str,
) -> Vec<OperatorCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.is_eligible() && c.serves(jurisdiction))
        .collect()
}

/// Uniform random picker over eligible candidates
#[derive(Debug)]
pub struct CandidateSelector {
    rng: Mutex<fastrand::Rng>,
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSelector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Reproducible selection sequence
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map(Self::with_seed).unwrap_or_default()
    }

    /// Index of the chosen candidate, `None` for an empty set
    pub fn pick(&self, eligible: &[OperatorCandidate]) -> Option<usize> {
        if eligible.is_empty() {
            return None;
        }
        Some(self.rng.lock().usize(..eligible.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperatorStatus;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn candidate(jurisdiction: &str, workload: i32, limit: i32) -> OperatorCandidate {
        OperatorCandidate {
            id: Uuid::new_v4(),
            name: format!("op-{workload}"),
            jurisdiction: jurisdiction.to_string(),
            current_workload: workload,
            workload_limit: limit,
            status: OperatorStatus::Active,
        }
    }

    #[test]
    fn test_filter_drops_full_and_foreign_candidates() {
        let candidates = vec![
            candidate("dhanbad", 0, 5),
            candidate("Dhanbad", 5, 5),
            candidate("Ranchi", 0, 5),
            candidate("DHANBAD", 4, 5),
        ];
        let eligible = filter_eligible(candidates, "DHANBAD");
        assert_eq!(eligible.len(), 2);
        assert!(eligible.iter().all(|c| c.current_workload < c.workload_limit));
    }

    #[test]
    fn test_pick_on_empty_set() {
        assert_eq!(CandidateSelector::new().pick(&[]), None);
    }

    #[test]
    fn test_seeded_selectors_agree() {
        let eligible: Vec<_> = (0..7).map(|i| candidate("Ranchi", i, 10)).collect();
        let a = CandidateSelector::with_seed(42);
        let b = CandidateSelector::with_seed(42);
        for _ in 0..20 {
            assert_eq!(a.pick(&eligible), b.pick(&eligible));
        }
    }

    #[test]
    fn test_pick_reaches_every_candidate() {
        let eligible: Vec<_> = (0..4).map(|i| candidate("Ranchi", i, 10)).collect();
        let selector = CandidateSelector::with_seed(7);
        let mut hits: HashMap<usize, usize> = HashMap::new();
        for _ in 0..4_000 {
            *hits.entry(selector.pick(&eligible).unwrap()).or_default() += 1;
        }
        assert_eq!(hits.len(), 4);
        // Roughly uniform: each index near 1000
        assert!(hits.values().all(|&n| (800..1200).contains(&n)));
    }
}
