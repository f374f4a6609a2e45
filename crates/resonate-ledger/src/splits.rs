//! Split reconciliation and totals.
//!
//! Weights are basis points (1/100 of a percent). A complete distribution
//! is exactly [`TOTAL_BPS`] = 10000 once the implicit platform fee of
//! [`PLATFORM_FEE_BPS`] = 210 is added. The platform fee is never stored as
//! a split row; it enters the arithmetic only through [`total_bps`], so the
//! constant cannot drift between the ledger and the record builder.

use resonate_types::{Contributor, Split, PLATFORM_FEE_BPS, TOTAL_BPS};

use crate::{Result, SplitError};

/// Total distribution in basis points: the sum of all stored split weights
/// plus the implicit platform fee.
///
/// Summed in `u64` so an over-allocated ledger reports its real total; a
/// wrapped `u32` sum could land back on exactly 10000 and sneak a bogus
/// distribution past [`is_complete`].
pub fn total_bps(splits: &[Split]) -> u64 {
    splits.iter().map(|s| u64::from(s.weight)).sum::<u64>() + u64::from(PLATFORM_FEE_BPS)
}

/// Whether the ledger distributes exactly 100%.
pub fn is_complete(splits: &[Split]) -> bool {
    total_bps(splits) == u64::from(TOTAL_BPS)
}

/// Insert a split for every contributor that has none yet, giving each an
/// even floor-divided share of the unallocated basis points.
///
/// The floor division can lose a remainder of up to `missing - 1` bps: three
/// contributors joining an empty ledger get 3263 each, leaving the total one
/// basis point short of complete. That loss is intentional — the gap stays
/// visible until the user closes it by hand, and publish validation refuses
/// the ledger until then. Nothing here redistributes the residue.
///
/// Contributors already holding a split are untouched. Returns the
/// replacement ledger.
pub fn reconcile_missing(splits: &[Split], contributors: &[Contributor]) -> Vec<Split> {
    let missing: Vec<&Contributor> = contributors
        .iter()
        .filter(|c| !splits.iter().any(|s| s.pubkey == c.pubkey))
        .collect();

    if missing.is_empty() {
        return splits.to_vec();
    }

    let remaining = u64::from(TOTAL_BPS).saturating_sub(total_bps(splits));
    // remaining <= 10000, so the share always fits a u32 weight.
    let share = (remaining / missing.len() as u64) as u32;

    tracing::debug!(
        missing = missing.len(),
        remaining,
        share,
        "assigning even shares to new split recipients"
    );

    let mut next = splits.to_vec();
    for contributor in missing {
        next.push(Split::new(contributor.pubkey.clone(), share));
    }
    next
}

/// Remove the split belonging to `pubkey`, if present.
///
/// The remaining weights are left exactly as they were: money never moves
/// between people without a visible user action, so the freed share stays
/// unallocated until the user reassigns it.
pub fn remove_recipient(splits: &[Split], pubkey: &str) -> Vec<Split> {
    splits
        .iter()
        .filter(|s| s.pubkey != pubkey)
        .cloned()
        .collect()
}

/// Replace the weight of the split belonging to `pubkey`.
///
/// Accepts any weight that fits the stored `u32`, including values that push
/// the total past 10000 — the overrun is surfaced by validation, not
/// prevented here. A pubkey with no split entry leaves the ledger unchanged.
///
/// # Errors
///
/// - [`SplitError::InvalidWeight`] if `weight` is negative or exceeds
///   `u32::MAX` (a plain `as u32` narrowing would silently truncate)
pub fn set_weight(splits: &[Split], pubkey: &str, weight: i64) -> Result<Vec<Split>> {
    let weight = match u32::try_from(weight) {
        Ok(w) => w,
        Err(_) => return Err(SplitError::InvalidWeight { weight }),
    };

    Ok(splits
        .iter()
        .map(|s| {
            if s.pubkey == pubkey {
                Split {
                    weight,
                    ..s.clone()
                }
            } else {
                s.clone()
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_types::DEFAULT_RELAY_URL;

    fn contributor(pubkey: &str) -> Contributor {
        Contributor::new(pubkey, pubkey.to_uppercase(), "Producer")
    }

    #[test]
    fn test_empty_ledger_totals_platform_fee() {
        assert_eq!(total_bps(&[]), u64::from(PLATFORM_FEE_BPS));
        assert!(!is_complete(&[]));
    }

    #[test]
    fn test_total_always_includes_platform_fee() {
        let splits = vec![Split::new("a", 4000), Split::new("b", 3000)];
        assert_eq!(total_bps(&splits), 7210);
    }

    #[test]
    fn test_sole_recipient_gets_everything_but_the_fee() {
        let splits = reconcile_missing(&[], &[contributor("a")]);
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].weight, 9790);
        assert_eq!(splits[0].relay, DEFAULT_RELAY_URL);
        assert!(is_complete(&splits));
    }

    #[test]
    fn test_two_way_reconcile_divides_evenly() {
        let splits = reconcile_missing(&[], &[contributor("a"), contributor("b")]);
        assert_eq!(splits[0].weight, 4895);
        assert_eq!(splits[1].weight, 4895);
        assert!(is_complete(&splits));
    }

    #[test]
    fn test_three_way_reconcile_loses_remainder() {
        // Known rounding edge case: floor(9790 / 3) = 3263, so the ledger
        // ends up one basis point short and stays incomplete until the user
        // distributes that point by hand.
        let splits = reconcile_missing(
            &[],
            &[contributor("a"), contributor("b"), contributor("c")],
        );
        assert!(splits.iter().all(|s| s.weight == 3263));
        assert_eq!(total_bps(&splits), u64::from(TOTAL_BPS) - 1);
        assert!(!is_complete(&splits));
    }

    #[test]
    fn test_reconcile_leaves_existing_splits_alone() {
        let existing = vec![Split::new("a", 6000)];
        let splits = reconcile_missing(&existing, &[contributor("a"), contributor("b")]);
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0], existing[0]);
        // 10000 - (6000 + 210) = 3790 for the one missing recipient.
        assert_eq!(splits[1].weight, 3790);
    }

    #[test]
    fn test_reconcile_with_overallocated_ledger_assigns_zero() {
        let existing = vec![Split::new("a", 12_000)];
        let splits = reconcile_missing(&existing, &[contributor("a"), contributor("b")]);
        assert_eq!(splits[1].weight, 0);
    }

    #[test]
    fn test_reconcile_without_missing_is_identity() {
        let existing = vec![Split::new("a", 9790)];
        let splits = reconcile_missing(&existing, &[contributor("a")]);
        assert_eq!(splits, existing);
    }

    #[test]
    fn test_remove_recipient_keeps_other_weights() {
        let splits = vec![Split::new("a", 4895), Split::new("b", 4895)];
        let next = remove_recipient(&splits, "a");
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].pubkey, "b");
        // No auto-rebalancing: b keeps its 4895 and the ledger is now short.
        assert_eq!(next[0].weight, 4895);
        assert!(!is_complete(&next));
    }

    #[test]
    fn test_remove_unknown_recipient_is_noop() {
        let splits = vec![Split::new("a", 9790)];
        assert_eq!(remove_recipient(&splits, "zzz"), splits);
    }

    #[test]
    fn test_set_weight_replaces_entry() {
        let splits = vec![Split::new("a", 4895), Split::new("b", 4895)];
        let next = set_weight(&splits, "a", 6000).expect("set weight");
        assert_eq!(next[0].weight, 6000);
        assert_eq!(next[1].weight, 4895);
    }

    #[test]
    fn test_set_weight_negative_rejected_and_ledger_unchanged() {
        let splits = vec![Split::new("a", 4895)];
        let err = set_weight(&splits, "a", -1).expect_err("negative weight");
        assert!(matches!(err, SplitError::InvalidWeight { weight: -1 }));
        // Whole-value API: the input vector was never touched.
        assert_eq!(splits[0].weight, 4895);
    }

    #[test]
    fn test_set_weight_allows_overrun() {
        // The ledger accepts totals past 100%; validation surfaces it later.
        let splits = vec![Split::new("a", 4895)];
        let next = set_weight(&splits, "a", 20_000).expect("set weight");
        assert_eq!(total_bps(&next), 20_210);
        assert!(!is_complete(&next));
    }

    #[test]
    fn test_set_weight_above_u32_max_rejected() {
        // Narrowing 2^32 with `as u32` would store weight 0; the ledger must
        // reject it instead of quietly zeroing someone's share.
        let splits = vec![Split::new("a", 4895)];
        let err = set_weight(&splits, "a", 1 << 32).expect_err("too large");
        assert!(matches!(err, SplitError::InvalidWeight { weight } if weight == 1 << 32));
        assert_eq!(splits[0].weight, 4895);
    }

    #[test]
    fn test_total_does_not_wrap_on_huge_weights() {
        // Two weights chosen so a u32 sum would wrap to exactly 10000 and
        // make a wildly over-allocated ledger look complete.
        let splits = vec![Split::new("a", u32::MAX), Split::new("b", 9791)];
        assert_eq!(total_bps(&splits), (1u64 << 32) + 10_000);
        assert!(!is_complete(&splits));
    }

    #[test]
    fn test_set_weight_unknown_recipient_is_noop() {
        let splits = vec![Split::new("a", 4895)];
        let next = set_weight(&splits, "zzz", 100).expect("set weight");
        assert_eq!(next, splits);
    }
}
