use tracing::debug;
use crate::core::config::ScanConfig;
use crate::query::matcher::{FuzzyMatchResult, QualifierMatcher};

/// Result of filtering an ordered run of candidate keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome<T> {
    pub accepted: Vec<T>,
    pub examined: usize,
    /// Set when a matcher reported the scan past its range, or the
    /// candidate limit was hit.
    pub stopped_early: bool,
}

/// Combines qualifier matchers over candidates read in ascending key order.
/// All matchers have to match; the first OutOfRange ends the scan.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    matchers: Vec<QualifierMatcher>,
    offset: usize,
    max_candidates: Option<usize>,
}

impl ScanFilter {
    pub fn new(matchers: Vec<QualifierMatcher>, offset: usize, config: &ScanConfig) -> Self {
        ScanFilter {
            matchers,
            offset,
            max_candidates: config.max_candidates,
        }
    }

    pub fn check(&self, candidate: &[u8]) -> FuzzyMatchResult {
        let mut result = FuzzyMatchResult::Match;
        for matcher in &self.matchers {
            match matcher.evaluate(candidate, self.offset) {
                FuzzyMatchResult::OutOfRange => return FuzzyMatchResult::OutOfRange,
                FuzzyMatchResult::NoMatch => result = FuzzyMatchResult::NoMatch,
                FuzzyMatchResult::Match => {}
            }
        }
        result
    }

    /// Key to seek to before scanning: the highest first-possible bytes
    /// over all matchers that know one.
    pub fn seek_key(&self) -> Option<&[u8]> {
        self.matchers.iter().filter_map(|m| m.first_possible()).max()
    }

    pub fn filter<T, I>(&self, candidates: I) -> ScanOutcome<T>
    where
        T: AsRef<[u8]>,
        I: IntoIterator<Item = T>,
    {
        let mut outcome = ScanOutcome {
            accepted: Vec::new(),
            examined: 0,
            stopped_early: false,
        };

        for candidate in candidates {
            if self.max_candidates.is_some_and(|max| outcome.examined >= max) {
                outcome.stopped_early = true;
                debug!(target: "scan", examined = outcome.examined, "candidate limit reached");
                break;
            }
            outcome.examined += 1;

            match self.check(candidate.as_ref()) {
                FuzzyMatchResult::Match => outcome.accepted.push(candidate),
                FuzzyMatchResult::NoMatch => {}
                FuzzyMatchResult::OutOfRange => {
                    outcome.stopped_early = true;
                    debug!(
                        target: "scan",
                        examined = outcome.examined,
                        accepted = outcome.accepted.len(),
                        "scan passed matcher range"
                    );
                    break;
                }
            }
        }

        outcome
    }
}
