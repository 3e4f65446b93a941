use crate::codec::varint::read_var_u64;
use crate::query::matcher::FuzzyMatchResult;

/// Unknown content following a literal segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyLength {
    /// Varint size prefix followed by that many bytes
    Dynamic,
    Exact(usize),
}

/// Matches qualifiers made of known literal segments separated by unknown
/// parts, such as map or list entries addressed by any key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierFuzzyMatcher {
    pub segments: Vec<Vec<u8>>,
    /// `lengths[i]` is skipped after `segments[i]`
    pub lengths: Vec<FuzzyLength>,
}

impl QualifierFuzzyMatcher {
    pub fn new(segments: Vec<Vec<u8>>, lengths: Vec<FuzzyLength>) -> Self {
        QualifierFuzzyMatcher { segments, lengths }
    }

    /// Bytes every match starts with; scans seek here first.
    pub fn first_possible(&self) -> &[u8] {
        self.segments.first().map(|s| s.as_slice()).unwrap_or(&[])
    }

    pub fn is_match(&self, candidate: &[u8], offset: usize) -> FuzzyMatchResult {
        let mut index = offset;

        for (segment_index, segment) in self.segments.iter().enumerate() {
            for &expected in segment {
                let Some(&actual) = candidate.get(index) else {
                    return FuzzyMatchResult::NoMatch;
                };
                if actual != expected {
                    // Past the leading literal in an ascending scan nothing can match anymore
                    return if segment_index == 0 && actual > expected {
                        FuzzyMatchResult::OutOfRange
                    } else {
                        FuzzyMatchResult::NoMatch
                    };
                }
                index += 1;
            }

            match self.lengths.get(segment_index) {
                Some(FuzzyLength::Exact(length)) => index = index.saturating_add(*length),
                Some(FuzzyLength::Dynamic) => {
                    let Some(mut rest) = candidate.get(index..) else {
                        return FuzzyMatchResult::NoMatch;
                    };
                    let before = rest.len();
                    let Ok(size) = read_var_u64(&mut rest) else {
                        return FuzzyMatchResult::NoMatch;
                    };
                    index += before - rest.len();
                    index = index.saturating_add(size as usize);
                }
                None => {}
            }

            if index > candidate.len() {
                return FuzzyMatchResult::NoMatch;
            }
        }

        FuzzyMatchResult::Match
    }
}
