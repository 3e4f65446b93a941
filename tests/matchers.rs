use marrow::codec::fixed::OrderedFixed;
use marrow::codec::varint::write_var_u64;
use marrow::core::config::ScanConfig;
use marrow::query::fuzzy::{FuzzyLength, QualifierFuzzyMatcher};
use marrow::query::matcher::{FuzzyMatchResult, QualifierExactMatcher, QualifierMatcher};
use marrow::query::partial::{KeyOffset, PartialToBeOneOf, PartialToRegex};
use marrow::query::scan::ScanFilter;
use regex::Regex;

fn map_entry_matcher() -> QualifierMatcher {
    QualifierMatcher::Fuzzy(QualifierFuzzyMatcher::new(
        vec![vec![0xBB, 0xBB], vec![0xCC, 0xCC]],
        vec![FuzzyLength::Dynamic, FuzzyLength::Exact(4)],
    ))
}

#[test]
fn fuzzy_matcher_on_map_qualifiers() {
    let candidate = [0x00, 0xBB, 0xBB, 0x02, 0xFF, 0xFF, 0xCC, 0xCC, 0xDD, 0xDD, 0xDD, 0xDD];
    let matcher = map_entry_matcher();

    assert_eq!(matcher.evaluate(&candidate, 1), FuzzyMatchResult::Match);
    assert_eq!(matcher.evaluate(&candidate[..9], 1), FuzzyMatchResult::NoMatch);
    assert_eq!(
        matcher.evaluate(&[0x00, 0xBC, 0x00, 0x00], 1),
        FuzzyMatchResult::OutOfRange
    );
}

/// Composite key: [ordered u32 partition] [sized utf-8 name] [ordered i16 score]
fn key(partition: u32, name: &str, score: i16) -> Vec<u8> {
    let mut key = partition.to_ordered_bytes();
    write_var_u64(&mut key, name.len() as u64);
    key.extend_from_slice(name.as_bytes());
    key.extend_from_slice(&score.to_ordered_bytes());
    key
}

#[test]
fn scan_over_sorted_composite_keys() {
    let mut keys = vec![
        key(1, "zoe", 3),
        key(2, "amy", -4),
        key(2, "bob", 10),
        key(2, "bea", 7),
        key(2, "eve", 1),
        key(3, "bob", 10),
    ];
    keys.sort();

    let partition = QualifierMatcher::Exact(QualifierExactMatcher::new(2u32.to_ordered_bytes()));
    let name = QualifierMatcher::PartialToRegex(PartialToRegex {
        offset: KeyOffset::Fixed(5),
        length: Some(3),
        regex: Regex::new("^b").unwrap(),
    });
    let score = QualifierMatcher::PartialToBeOneOf(PartialToBeOneOf::new(
        KeyOffset::AfterSized(4),
        2,
        vec![7i16.to_ordered_bytes(), 10i16.to_ordered_bytes()],
    ));

    let filter = ScanFilter::new(vec![partition, name, score], 0, &ScanConfig::default());
    assert_eq!(filter.seek_key(), Some(&2u32.to_ordered_bytes()[..]));

    let outcome = filter.filter(keys.iter());
    assert_eq!(outcome.accepted, vec![&key(2, "bea", 7), &key(2, "bob", 10)]);
    assert!(outcome.stopped_early);
    assert_eq!(outcome.examined, keys.len());
}

#[test]
fn exact_comparison_sign() {
    let matcher = QualifierExactMatcher::new(vec![0x10, 0x20]);
    assert!(matcher.compare_to(&[0x10, 0x10], 0) > 0);
    assert!(matcher.compare_to(&[0x10, 0x30], 0) < 0);
    assert_eq!(matcher.compare_to(&[0x00, 0x10, 0x20], 1), 0);
}
