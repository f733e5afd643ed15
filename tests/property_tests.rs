//! Property-based tests for strip-equality and verdicts
//!
//! These tests use proptest to verify invariants across many randomly
//! generated outputs, catching edge cases that hand-written tests might miss.

use difftest_core::{SummaryBuilder, TestId, Verdict, strip, strip_eq};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Bytes from the whitespace set removed by `strip`.
fn whitespace() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![b' ', b'\t', b'\n', 0x0b, 0x0c, b'\r']), 0..8)
}

/// Arbitrary program output, including non-UTF-8 bytes.
fn output() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

// =============================================================================
// Strip-equality Properties
// =============================================================================

proptest! {
    /// Property: every output is strip-equal to itself
    #[test]
    fn strip_eq_is_reflexive(a in output()) {
        prop_assert!(strip_eq(&a, &a));
    }

    /// Property: strip_eq does not depend on argument order
    #[test]
    fn strip_eq_is_symmetric(a in output(), b in output()) {
        prop_assert_eq!(strip_eq(&a, &b), strip_eq(&b, &a));
    }

    /// Property: surrounding whitespace never changes the verdict
    #[test]
    fn surrounding_whitespace_is_ignored(a in output(), lead in whitespace(), trail in whitespace()) {
        let padded = concat(&[&lead, &a, &trail]);
        prop_assert!(strip_eq(&a, &padded));
    }

    /// Property: stripping is idempotent
    #[test]
    fn strip_is_idempotent(a in output()) {
        let once = strip(&a);
        prop_assert_eq!(strip(once), once);
    }

    /// Property: interior whitespace is significant
    #[test]
    fn interior_space_is_significant(left in "[a-z0-9]{1,8}", right in "[a-z0-9]{1,8}") {
        let joined = concat(&[left.as_bytes(), right.as_bytes()]);
        let spaced = concat(&[left.as_bytes(), b" ", right.as_bytes()]);
        prop_assert!(!strip_eq(&joined, &spaced));
    }

    /// Property: judge fails exactly when outputs are not strip-equal, and keeps both outputs
    #[test]
    fn judge_agrees_with_strip_eq(expected in output(), actual in output()) {
        match Verdict::judge(expected.clone(), actual.clone()) {
            Verdict::Passed => prop_assert!(strip_eq(&expected, &actual)),
            Verdict::Failed(mismatch) => {
                prop_assert!(!strip_eq(&expected, &actual));
                prop_assert_eq!(mismatch.expected, expected);
                prop_assert_eq!(mismatch.actual, actual);
            }
            Verdict::Skipped(_) => prop_assert!(false, "judge never skips"),
        }
    }
}

// =============================================================================
// Summary Properties
// =============================================================================

proptest! {
    /// Property: passed + failed + skipped == total, and the name lists match the counts
    #[test]
    fn summary_counts_add_up(kinds in prop::collection::vec(0u8..3, 0..32)) {
        let mut builder = SummaryBuilder::new();
        for (i, kind) in kinds.iter().enumerate() {
            let verdict = match kind {
                0 => Verdict::Passed,
                1 => Verdict::judge(b"a".to_vec(), b"b".to_vec()),
                _ => Verdict::Skipped(difftest_core::SkipReason::GoldenFileMissing),
            };
            builder.record(&TestId::new(format!("t{i}")), &verdict);
        }
        let summary = builder.finish();
        prop_assert_eq!(summary.passed() + summary.failed() + summary.skipped(), summary.total());
        prop_assert_eq!(summary.total(), kinds.len());
        prop_assert_eq!(summary.failed_tests().len(), summary.failed());
        prop_assert_eq!(summary.skipped_tests().len(), summary.skipped());
        prop_assert_eq!(summary.is_success(), !kinds.contains(&1));
    }
}
