use std::collections::HashMap;

use crate::model::deduction::{Deduction, DeductionTypeDefinition};
use crate::model::payroll_run::AppliedDeductionDetail;

/// Proposed allocations for one employee. Nothing here touches the
/// deduction balances; reconciliation happens only when the run is
/// approved.
#[derive(Debug, Clone, Default)]
pub struct AllocationResult {
    pub applied: Vec<AppliedDeductionDetail>,
    pub per_type: HashMap<u64, f64>,
    pub total: f64,
    pub final_net: f64,
}

/// Allocates active deductions against the net pay left after CBHI.
/// Types are served in ascending order; within a type, earliest start
/// date first. Each allocation is capped by the monthly installment,
/// the remaining balance, and the remaining net. Once the remaining
/// net reaches zero, allocation stops for all further types as well —
/// net pay is never driven negative.
///
/// `deduction_types` must already be sorted by `ord`.
pub fn allocate(
    net_after_cbhi: f64,
    deductions: &[Deduction],
    deduction_types: &[DeductionTypeDefinition],
) -> AllocationResult {
    let mut result = AllocationResult {
        final_net: net_after_cbhi,
        ..AllocationResult::default()
    };
    let mut remaining = net_after_cbhi;

    'types: for definition in deduction_types {
        let mut of_type: Vec<&Deduction> = deductions
            .iter()
            .filter(|d| d.deduction_type_id == definition.id && d.balance() > 0.0)
            .collect();
        of_type.sort_by_key(|d| d.start_date);

        for deduction in of_type {
            if remaining <= 0.0 {
                break 'types;
            }
            let applied = deduction
                .monthly_installment
                .min(deduction.balance())
                .min(remaining);
            if applied > 0.0 {
                result.applied.push(AppliedDeductionDetail {
                    deduction_id: deduction.id,
                    deduction_type_id: definition.id,
                    amount: applied,
                });
                *result.per_type.entry(definition.id).or_insert(0.0) += applied;
                result.total += applied;
                remaining -= applied;
            }
        }
    }

    result.final_net = net_after_cbhi - result.total;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const ADVANCE: u64 = 1;
    const CHARGE: u64 = 2;
    const LOAN: u64 = 3;

    fn types() -> Vec<DeductionTypeDefinition> {
        [("Advance", ADVANCE, 1), ("Charge", CHARGE, 2), ("Loan", LOAN, 3)]
            .into_iter()
            .map(|(name, id, ord)| DeductionTypeDefinition {
                id,
                company_id: 1,
                name: name.to_string(),
                ord,
                deletable: false,
            })
            .collect()
    }

    fn deduction(id: u64, type_id: u64, original: f64, installment: f64, day: u32) -> Deduction {
        Deduction {
            id,
            staff_id: 1,
            deduction_type_id: type_id,
            original_amount: original,
            monthly_installment: installment,
            deducted_so_far: 0.0,
            start_date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
        }
    }

    #[test]
    fn advance_is_served_before_loan() {
        // Net covers only one installment; the lower-ordered Advance
        // must win even though the Loan is listed first.
        let deductions = vec![
            deduction(20, LOAN, 100_000.0, 30_000.0, 1),
            deduction(10, ADVANCE, 100_000.0, 30_000.0, 1),
        ];
        let result = allocate(30_000.0, &deductions, &types());
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.applied[0].deduction_id, 10);
        assert_eq!(result.total, 30_000.0);
        assert_eq!(result.final_net, 0.0);
    }

    #[test]
    fn earliest_start_date_wins_within_a_type() {
        let deductions = vec![
            deduction(11, ADVANCE, 50_000.0, 50_000.0, 20),
            deduction(12, ADVANCE, 50_000.0, 50_000.0, 5),
        ];
        let result = allocate(50_000.0, &deductions, &types());
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.applied[0].deduction_id, 12);
    }

    #[test]
    fn allocation_is_capped_by_installment_balance_and_net() {
        let mut partly_paid = deduction(13, ADVANCE, 40_000.0, 30_000.0, 1);
        partly_paid.deducted_so_far = 25_000.0; // balance 15k < installment
        let result = allocate(100_000.0, &[partly_paid], &types());
        assert_eq!(result.applied[0].amount, 15_000.0);

        let capped_by_net = deduction(14, ADVANCE, 100_000.0, 30_000.0, 1);
        let result = allocate(12_000.0, &[capped_by_net], &types());
        assert_eq!(result.applied[0].amount, 12_000.0);
        assert_eq!(result.final_net, 0.0);
    }

    #[test]
    fn stops_all_types_once_net_exhausted() {
        // The advance consumes everything; the charge and loan must be
        // skipped entirely, not just the rest of the advance queue.
        let deductions = vec![
            deduction(10, ADVANCE, 100_000.0, 50_000.0, 1),
            deduction(15, CHARGE, 100_000.0, 10_000.0, 1),
            deduction(20, LOAN, 100_000.0, 10_000.0, 1),
        ];
        let result = allocate(50_000.0, &deductions, &types());
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.applied[0].deduction_id, 10);
        assert_eq!(result.final_net, 0.0);
        assert!(!result.per_type.contains_key(&CHARGE));
        assert!(!result.per_type.contains_key(&LOAN));
    }

    #[test]
    fn exhausted_balances_are_ignored() {
        let mut spent = deduction(16, ADVANCE, 30_000.0, 10_000.0, 1);
        spent.deducted_so_far = 30_000.0;
        let result = allocate(50_000.0, &[spent], &types());
        assert!(result.applied.is_empty());
        assert_eq!(result.final_net, 50_000.0);
    }

    #[test]
    fn net_never_goes_negative() {
        let deductions = vec![
            deduction(10, ADVANCE, 500_000.0, 200_000.0, 1),
            deduction(20, LOAN, 500_000.0, 200_000.0, 1),
        ];
        let result = allocate(250_000.0, &deductions, &types());
        assert!(result.final_net >= 0.0);
        assert!(result.total <= 250_000.0);
        assert_eq!(result.total, 250_000.0);
    }

    #[test]
    fn zero_net_allocates_nothing() {
        let deductions = vec![deduction(10, ADVANCE, 50_000.0, 10_000.0, 1)];
        let result = allocate(0.0, &deductions, &types());
        assert!(result.applied.is_empty());
        assert_eq!(result.total, 0.0);
        assert_eq!(result.final_net, 0.0);
    }

    #[test]
    fn per_type_subtotals_accumulate() {
        let deductions = vec![
            deduction(11, ADVANCE, 20_000.0, 10_000.0, 1),
            deduction(12, ADVANCE, 20_000.0, 10_000.0, 2),
            deduction(20, LOAN, 60_000.0, 15_000.0, 1),
        ];
        let result = allocate(100_000.0, &deductions, &types());
        assert_eq!(result.per_type[&ADVANCE], 20_000.0);
        assert_eq!(result.per_type[&LOAN], 15_000.0);
        assert_eq!(result.total, 35_000.0);
        assert_eq!(result.final_net, 65_000.0);
    }
}
