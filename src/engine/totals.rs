use crate::model::payroll_run::{EmployeePayrollRecord, RunTotals};

/// Pure fold of all employee records into run-level totals, including
/// the per-payment-type and per-deduction-type maps used for the
/// summary projection.
pub fn aggregate(employees: &[EmployeePayrollRecord]) -> RunTotals {
    let mut totals = RunTotals::default();

    for record in employees {
        totals.gross_salary += record.gross_salary;
        totals.pension_employer += record.pension_employer;
        totals.pension_employee += record.pension_employee;
        totals.maternity_employer += record.maternity_employer;
        totals.maternity_employee += record.maternity_employee;
        totals.rama_employer += record.rama_employer;
        totals.rama_employee += record.rama_employee;
        totals.rssb_employer += record.rssb_employer;
        totals.rssb_employee += record.rssb_employee;
        totals.paye += record.paye;
        totals.cbhi += record.cbhi;
        totals.total_deductions += record.total_deductions;
        totals.final_net_pay += record.final_net_pay;

        for (payment_type_id, amount) in &record.payment_amounts {
            *totals.payment_totals.entry(*payment_type_id).or_insert(0.0) += amount;
        }
        for (deduction_type_id, amount) in &record.deduction_amounts {
            *totals
                .deduction_totals
                .entry(*deduction_type_id)
                .or_insert(0.0) += amount;
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(staff_id: u64, gross: f64, net: f64) -> EmployeePayrollRecord {
        EmployeePayrollRecord {
            staff_id,
            staff_name: format!("staff-{}", staff_id),
            payment_amounts: HashMap::from([(1, gross)]),
            gross_salary: gross,
            pension_employer: gross * 0.03,
            pension_employee: gross * 0.03,
            maternity_employer: gross * 0.003,
            maternity_employee: gross * 0.003,
            rama_employer: gross * 0.075,
            rama_employee: gross * 0.075,
            rssb_employer: gross * 0.108,
            rssb_employee: gross * 0.108,
            paye: gross * 0.1,
            net_before_cbhi: net,
            cbhi: net * 0.005,
            net_after_cbhi: net,
            deduction_amounts: HashMap::from([(3, 5_000.0)]),
            applied_deductions: Vec::new(),
            total_deductions: 5_000.0,
            final_net_pay: net - 5_000.0,
        }
    }

    #[test]
    fn scalar_fields_are_summed() {
        let employees = vec![record(1, 100_000.0, 80_000.0), record(2, 200_000.0, 150_000.0)];
        let totals = aggregate(&employees);

        assert_eq!(totals.gross_salary, 300_000.0);
        assert!((totals.paye - 30_000.0).abs() < 1e-9);
        assert_eq!(totals.total_deductions, 10_000.0);

        let expected_net: f64 = employees.iter().map(|e| e.final_net_pay).sum();
        assert_eq!(totals.final_net_pay, expected_net);
    }

    #[test]
    fn per_id_maps_are_summed() {
        let employees = vec![record(1, 100_000.0, 80_000.0), record(2, 200_000.0, 150_000.0)];
        let totals = aggregate(&employees);

        assert_eq!(totals.payment_totals[&1], 300_000.0);
        assert_eq!(totals.deduction_totals[&3], 10_000.0);
    }

    #[test]
    fn empty_run_is_all_zero() {
        let totals = aggregate(&[]);
        assert_eq!(totals.gross_salary, 0.0);
        assert_eq!(totals.final_net_pay, 0.0);
        assert!(totals.payment_totals.is_empty());
        assert!(totals.deduction_totals.is_empty());
    }
}
