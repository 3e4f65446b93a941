use std::cmp::Ordering;
use regex::Regex;
use crate::codec::varint::read_var_u64;
use crate::query::matcher::FuzzyMatchResult;

/// Where a sub-range of a composite key starts, relative to the scan offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOffset {
    Fixed(usize),
    /// Starts right after a variable segment whose varint size prefix sits
    /// at the given position.
    AfterSized(usize),
}

impl KeyOffset {
    pub fn resolve(&self, candidate: &[u8], base: usize) -> Option<usize> {
        match *self {
            KeyOffset::Fixed(position) => base.checked_add(position),
            KeyOffset::AfterSized(position) => {
                let start = base.checked_add(position)?;
                let (size, prefix) = read_size(candidate, start)?;
                start.checked_add(prefix)?.checked_add(size)
            }
        }
    }

    /// Leading segments sort the whole key, so passing their bound in an
    /// ascending scan ends the range.
    pub fn is_leading(&self) -> bool {
        matches!(self, KeyOffset::Fixed(0))
    }
}

/// Varint size at `position` and the number of bytes it took.
fn read_size(candidate: &[u8], position: usize) -> Option<(usize, usize)> {
    let mut rest = candidate.get(position..)?;
    let before = rest.len();
    let size = read_var_u64(&mut rest).ok()?;
    Some((usize::try_from(size).ok()?, before - rest.len()))
}

fn sub_range(candidate: &[u8], base: usize, offset: KeyOffset, length: usize) -> Option<&[u8]> {
    let start = offset.resolve(candidate, base)?;
    candidate.get(start..start.checked_add(length)?)
}

fn past_bound(offset: KeyOffset) -> FuzzyMatchResult {
    if offset.is_leading() {
        FuzzyMatchResult::OutOfRange
    } else {
        FuzzyMatchResult::NoMatch
    }
}

/// Sub-range must start with `bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToMatch {
    pub offset: KeyOffset,
    pub length: usize,
    pub bytes: Vec<u8>,
}

impl PartialToMatch {
    pub fn is_match(&self, candidate: &[u8], base: usize) -> FuzzyMatchResult {
        let Some(range) = sub_range(candidate, base, self.offset, self.length) else {
            return FuzzyMatchResult::NoMatch;
        };
        let prefix = &range[..self.bytes.len().min(range.len())];
        match prefix.cmp(self.bytes.as_slice()) {
            Ordering::Equal => FuzzyMatchResult::Match,
            Ordering::Greater => past_bound(self.offset),
            Ordering::Less => FuzzyMatchResult::NoMatch,
        }
    }
}

/// The variable segment whose size prefix sits at `offset` holds exactly `size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSizeToMatch {
    pub offset: KeyOffset,
    pub size: usize,
}

impl PartialSizeToMatch {
    pub fn is_match(&self, candidate: &[u8], base: usize) -> FuzzyMatchResult {
        let Some(position) = self.offset.resolve(candidate, base) else {
            return FuzzyMatchResult::NoMatch;
        };
        match read_size(candidate, position) {
            Some((size, prefix))
                if size == self.size
                    && position
                        .checked_add(prefix)
                        .and_then(|end| end.checked_add(size))
                        .is_some_and(|end| end <= candidate.len()) =>
            {
                FuzzyMatchResult::Match
            }
            _ => FuzzyMatchResult::NoMatch,
        }
    }
}

/// Sub-range decoded as UTF-8 must match `regex`. Without a length the
/// sub-range runs to the end of the key.
#[derive(Debug, Clone)]
pub struct PartialToRegex {
    pub offset: KeyOffset,
    pub length: Option<usize>,
    pub regex: Regex,
}

impl PartialToRegex {
    pub fn is_match(&self, candidate: &[u8], base: usize) -> FuzzyMatchResult {
        let range = match self.length {
            Some(length) => sub_range(candidate, base, self.offset, length),
            None => self.offset.resolve(candidate, base).and_then(|start| candidate.get(start..)),
        };
        match range.map(std::str::from_utf8) {
            Some(Ok(text)) if self.regex.is_match(text) => FuzzyMatchResult::Match,
            _ => FuzzyMatchResult::NoMatch,
        }
    }
}

/// Sub-range compared with a bound; `inclusive` accepts the bound itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialBound {
    pub offset: KeyOffset,
    pub length: usize,
    pub bound: Vec<u8>,
    pub inclusive: bool,
}

impl PartialBound {
    fn compare(&self, candidate: &[u8], base: usize) -> Option<Ordering> {
        sub_range(candidate, base, self.offset, self.length).map(|range| range.cmp(self.bound.as_slice()))
    }

    pub fn is_bigger(&self, candidate: &[u8], base: usize) -> FuzzyMatchResult {
        match self.compare(candidate, base) {
            Some(Ordering::Greater) => FuzzyMatchResult::Match,
            Some(Ordering::Equal) if self.inclusive => FuzzyMatchResult::Match,
            _ => FuzzyMatchResult::NoMatch,
        }
    }

    pub fn is_smaller(&self, candidate: &[u8], base: usize) -> FuzzyMatchResult {
        match self.compare(candidate, base) {
            Some(Ordering::Less) => FuzzyMatchResult::Match,
            Some(Ordering::Equal) if self.inclusive => FuzzyMatchResult::Match,
            Some(_) => past_bound(self.offset),
            None => FuzzyMatchResult::NoMatch,
        }
    }
}

/// Sub-range must equal one of `options`, kept sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToBeOneOf {
    pub offset: KeyOffset,
    pub length: usize,
    pub options: Vec<Vec<u8>>,
}

impl PartialToBeOneOf {
    pub fn new(offset: KeyOffset, length: usize, mut options: Vec<Vec<u8>>) -> Self {
        options.sort();
        options.dedup();
        PartialToBeOneOf { offset, length, options }
    }

    pub fn is_match(&self, candidate: &[u8], base: usize) -> FuzzyMatchResult {
        let Some(range) = sub_range(candidate, base, self.offset, self.length) else {
            return FuzzyMatchResult::NoMatch;
        };
        if self.options.binary_search_by(|o| o.as_slice().cmp(range)).is_ok() {
            return FuzzyMatchResult::Match;
        }
        match self.options.last() {
            Some(last) if range > last.as_slice() => past_bound(self.offset),
            _ => FuzzyMatchResult::NoMatch,
        }
    }

    pub fn first_possible(&self) -> Option<&[u8]> {
        self.options.first().map(|o| o.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Key: [sized name: 03 'b' 'o' 'b'] [2-byte age]
    const KEY: [u8; 6] = [0x03, b'b', b'o', b'b', 0x00, 0x2A];

    #[test]
    fn resolves_after_sized_segment() {
        assert_eq!(KeyOffset::AfterSized(0).resolve(&KEY, 0), Some(4));
        assert_eq!(KeyOffset::Fixed(2).resolve(&KEY, 1), Some(3));
        assert_eq!(KeyOffset::AfterSized(0).resolve(&[0x80], 0), None);
    }

    #[test]
    fn huge_size_prefix_does_not_overflow() {
        let mut key = Vec::new();
        crate::codec::varint::write_var_u64(&mut key, u64::MAX);
        key.push(0x01);
        let after = PartialToMatch {
            offset: KeyOffset::AfterSized(0),
            length: 1,
            bytes: vec![0x01],
        };
        assert_eq!(after.is_match(&key, 0), FuzzyMatchResult::NoMatch);
        assert_eq!(KeyOffset::Fixed(usize::MAX).resolve(&key, 1), None);

        let sized = PartialSizeToMatch {
            offset: KeyOffset::Fixed(0),
            size: u64::MAX as usize,
        };
        assert_eq!(sized.is_match(&key, 0), FuzzyMatchResult::NoMatch);
    }

    #[test]
    fn to_match_on_sized_and_fixed() {
        let age = PartialToMatch {
            offset: KeyOffset::AfterSized(0),
            length: 2,
            bytes: vec![0x00, 0x2A],
        };
        assert_eq!(age.is_match(&KEY, 0), FuzzyMatchResult::Match);

        let prefix = PartialToMatch {
            offset: KeyOffset::Fixed(0),
            length: 4,
            bytes: vec![0x03, b'a'],
        };
        assert_eq!(prefix.is_match(&KEY, 0), FuzzyMatchResult::OutOfRange);

        let truncated = PartialToMatch {
            offset: KeyOffset::Fixed(4),
            length: 4,
            bytes: vec![0x00],
        };
        assert_eq!(truncated.is_match(&KEY, 0), FuzzyMatchResult::NoMatch);
    }

    #[test]
    fn size_to_match() {
        let three = PartialSizeToMatch {
            offset: KeyOffset::Fixed(0),
            size: 3,
        };
        assert_eq!(three.is_match(&KEY, 0), FuzzyMatchResult::Match);
        let four = PartialSizeToMatch { size: 4, ..three };
        assert_eq!(four.is_match(&KEY, 0), FuzzyMatchResult::NoMatch);
    }

    #[test]
    fn regex_on_utf8_segment() {
        let matcher = PartialToRegex {
            offset: KeyOffset::Fixed(1),
            length: Some(3),
            regex: Regex::new("^b.b$").unwrap(),
        };
        assert_eq!(matcher.is_match(&KEY, 0), FuzzyMatchResult::Match);

        let invalid = [0x02, 0xFF, 0xFE];
        let open = PartialToRegex {
            offset: KeyOffset::Fixed(1),
            length: None,
            regex: Regex::new(".*").unwrap(),
        };
        assert_eq!(open.is_match(&invalid, 0), FuzzyMatchResult::NoMatch);
    }

    #[test]
    fn bounds_honour_inclusive() {
        let bound = |inclusive| PartialBound {
            offset: KeyOffset::AfterSized(0),
            length: 2,
            bound: vec![0x00, 0x2A],
            inclusive,
        };
        assert_eq!(bound(true).is_bigger(&KEY, 0), FuzzyMatchResult::Match);
        assert_eq!(bound(false).is_bigger(&KEY, 0), FuzzyMatchResult::NoMatch);
        assert_eq!(bound(true).is_smaller(&KEY, 0), FuzzyMatchResult::Match);
        assert_eq!(bound(false).is_smaller(&KEY, 0), FuzzyMatchResult::NoMatch);
    }

    #[test]
    fn leading_smaller_bound_ends_range() {
        let below = PartialBound {
            offset: KeyOffset::Fixed(0),
            length: 1,
            bound: vec![0x02],
            inclusive: true,
        };
        assert_eq!(below.is_smaller(&KEY, 0), FuzzyMatchResult::OutOfRange);
        assert_eq!(below.is_bigger(&KEY, 0), FuzzyMatchResult::Match);
    }

    #[test]
    fn one_of_uses_sorted_options() {
        let matcher = PartialToBeOneOf::new(
            KeyOffset::Fixed(1),
            3,
            vec![b"eve".to_vec(), b"bob".to_vec(), b"amy".to_vec()],
        );
        assert_eq!(matcher.first_possible(), Some(&b"amy"[..]));
        assert_eq!(matcher.is_match(&KEY, 0), FuzzyMatchResult::Match);
        assert_eq!(matcher.is_match(b"\x03zed", 0), FuzzyMatchResult::NoMatch);

        let leading = PartialToBeOneOf::new(KeyOffset::Fixed(0), 1, vec![vec![0x01], vec![0x02]]);
        assert_eq!(leading.is_match(&KEY, 0), FuzzyMatchResult::OutOfRange);
    }
}
