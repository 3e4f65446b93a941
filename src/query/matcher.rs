use crate::query::fuzzy::QualifierFuzzyMatcher;
use crate::query::partial::{PartialBound, PartialSizeToMatch, PartialToBeOneOf, PartialToMatch, PartialToRegex};

/// Outcome of testing one candidate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyMatchResult {
    Match,
    /// Reject this candidate; later ones may still match.
    NoMatch,
    /// The scan passed the last possible match; stop this branch.
    OutOfRange,
}

/// Fully known qualifier bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierExactMatcher {
    pub bytes: Vec<u8>,
}

impl QualifierExactMatcher {
    pub fn new(bytes: Vec<u8>) -> Self {
        QualifierExactMatcher { bytes }
    }

    /// Compare the matcher bytes with `candidate[offset..offset + len]`.
    /// Zero on equality, otherwise matcher byte minus candidate byte at the
    /// first difference; a candidate that ends early sorts first.
    pub fn compare_to(&self, candidate: &[u8], offset: usize) -> i32 {
        for (i, &expected) in self.bytes.iter().enumerate() {
            match offset.checked_add(i).and_then(|position| candidate.get(position)) {
                None => return 1,
                Some(&actual) if actual != expected => return expected as i32 - actual as i32,
                Some(_) => {}
            }
        }
        0
    }
}

/// Every way a scan can test a qualifier without decoding the record.
#[derive(Debug, Clone)]
pub enum QualifierMatcher {
    Exact(QualifierExactMatcher),
    Fuzzy(QualifierFuzzyMatcher),
    PartialToMatch(PartialToMatch),
    PartialSizeToMatch(PartialSizeToMatch),
    PartialToRegex(PartialToRegex),
    PartialToBeBigger(PartialBound),
    PartialToBeSmaller(PartialBound),
    PartialToBeOneOf(PartialToBeOneOf),
}

impl QualifierMatcher {
    pub fn evaluate(&self, candidate: &[u8], offset: usize) -> FuzzyMatchResult {
        match self {
            QualifierMatcher::Exact(exact) => match exact.compare_to(candidate, offset) {
                0 => FuzzyMatchResult::Match,
                diff if diff < 0 => FuzzyMatchResult::OutOfRange,
                _ => FuzzyMatchResult::NoMatch,
            },
            QualifierMatcher::Fuzzy(fuzzy) => fuzzy.is_match(candidate, offset),
            QualifierMatcher::PartialToMatch(partial) => partial.is_match(candidate, offset),
            QualifierMatcher::PartialSizeToMatch(partial) => partial.is_match(candidate, offset),
            QualifierMatcher::PartialToRegex(partial) => partial.is_match(candidate, offset),
            QualifierMatcher::PartialToBeBigger(bound) => bound.is_bigger(candidate, offset),
            QualifierMatcher::PartialToBeSmaller(bound) => bound.is_smaller(candidate, offset),
            QualifierMatcher::PartialToBeOneOf(partial) => partial.is_match(candidate, offset),
        }
    }

    /// Lowest bytes a match can start with at the scan offset, when known.
    pub fn first_possible(&self) -> Option<&[u8]> {
        match self {
            QualifierMatcher::Exact(exact) => Some(&exact.bytes),
            QualifierMatcher::Fuzzy(fuzzy) => Some(fuzzy.first_possible()),
            QualifierMatcher::PartialToMatch(partial) if partial.offset.is_leading() => Some(&partial.bytes),
            QualifierMatcher::PartialToBeBigger(bound) if bound.offset.is_leading() => Some(&bound.bound),
            QualifierMatcher::PartialToBeOneOf(partial) if partial.offset.is_leading() => partial.first_possible(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fuzzy::FuzzyLength;
    use crate::query::partial::KeyOffset;

    #[test]
    fn exact_compare_reports_first_difference() {
        let matcher = QualifierExactMatcher::new(vec![0x01, 0x05]);
        assert_eq!(matcher.compare_to(&[0xFF, 0x01, 0x05, 0x09], 1), 0);
        assert_eq!(matcher.compare_to(&[0x01, 0x02], 0), 3);
        assert_eq!(matcher.compare_to(&[0x01, 0x08], 0), -3);
        assert_eq!(matcher.compare_to(&[0x01], 0), 1);
        assert_eq!(matcher.compare_to(&[0x01, 0x05], usize::MAX), 1);
    }

    #[test]
    fn exact_evaluation_is_tri_state() {
        let matcher = QualifierMatcher::Exact(QualifierExactMatcher::new(vec![0x10]));
        assert_eq!(matcher.evaluate(&[0x10], 0), FuzzyMatchResult::Match);
        assert_eq!(matcher.evaluate(&[0x0F], 0), FuzzyMatchResult::NoMatch);
        assert_eq!(matcher.evaluate(&[0x11], 0), FuzzyMatchResult::OutOfRange);
    }

    #[test]
    fn dispatches_to_fuzzy_and_partials() {
        let fuzzy = QualifierMatcher::Fuzzy(QualifierFuzzyMatcher::new(
            vec![vec![0xAA]],
            vec![FuzzyLength::Exact(1)],
        ));
        assert_eq!(fuzzy.evaluate(&[0xAA, 0x00], 0), FuzzyMatchResult::Match);
        assert_eq!(fuzzy.first_possible(), Some(&[0xAA][..]));

        let bigger = QualifierMatcher::PartialToBeBigger(PartialBound {
            offset: KeyOffset::Fixed(1),
            length: 1,
            bound: vec![0x05],
            inclusive: false,
        });
        assert_eq!(bigger.evaluate(&[0x00, 0x06], 0), FuzzyMatchResult::Match);
        assert_eq!(bigger.first_possible(), None);
    }
}
