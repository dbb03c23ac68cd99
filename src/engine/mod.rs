//! Payroll calculation engine. Everything in here is pure computation
//! over read-only snapshots; persistence and HTTP live in `api`.

pub mod deductions;
pub mod earnings;
pub mod gross_up;
pub mod lifecycle;
pub mod tax;
pub mod totals;

use std::collections::HashMap;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::model::deduction::{Deduction, DeductionTypeDefinition};
use crate::model::payment_type::PaymentTypeDefinition;
use crate::model::payroll_run::{EmployeePayrollRecord, RunTotals};
use crate::model::staff::Staff;
use crate::model::tax_settings::{EffectiveRates, TaxExemptions, TaxSettings};

/// Read-only snapshot of everything one processing pass needs, taken
/// at the start of the pass. Processing the same snapshot twice yields
/// the same outcome.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub company_id: u64,
    pub staff: Vec<Staff>,
    /// staff id → (payment type id → configured amount).
    pub payment_configs: HashMap<u64, HashMap<u64, f64>>,
    /// staff id → active deductions (balance > 0).
    pub deductions: HashMap<u64, Vec<Deduction>>,
    pub payment_types: Vec<PaymentTypeDefinition>,
    pub deduction_types: Vec<DeductionTypeDefinition>,
    pub settings: TaxSettings,
    pub exemptions: TaxExemptions,
}

/// Configuration problems that must stop a run before any employee is
/// processed.
#[derive(Debug, Display, Error, PartialEq)]
pub enum EngineError {
    #[display(fmt = "no payment types are configured for company {}", company_id)]
    NoPaymentTypes { company_id: u64 },

    #[display(fmt = "no deduction types are configured for company {}", company_id)]
    NoDeductionTypes { company_id: u64 },
}

/// Non-fatal findings recorded while processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// Staff member had no active payment configuration and was left
    /// out of the run.
    StaffSkipped { staff_id: u64, staff_name: String },

    /// The gross-up search hit its iteration budget; the best guess was
    /// used. `residual` is the distance from the target net increment.
    GrossUpNotConverged {
        staff_id: u64,
        payment_type_id: u64,
        residual: f64,
    },
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub employees: Vec<EmployeePayrollRecord>,
    pub totals: RunTotals,
    pub warnings: Vec<RunWarning>,
}

/// Processes every active staff member of the snapshot: earnings with
/// gross-up, statutory split, deduction allocation, then run totals.
pub fn process_run(inputs: &RunInputs) -> Result<ProcessOutcome, EngineError> {
    if inputs.payment_types.is_empty() {
        return Err(EngineError::NoPaymentTypes {
            company_id: inputs.company_id,
        });
    }
    if inputs.deduction_types.is_empty() {
        return Err(EngineError::NoDeductionTypes {
            company_id: inputs.company_id,
        });
    }

    let mut payment_types = inputs.payment_types.clone();
    payment_types.sort_by_key(|t| t.ord);
    let mut deduction_types = inputs.deduction_types.clone();
    deduction_types.sort_by_key(|t| t.ord);

    let rates = EffectiveRates::new(&inputs.settings, &inputs.exemptions);

    let mut employees = Vec::new();
    let mut warnings = Vec::new();
    let no_deductions: Vec<Deduction> = Vec::new();

    for staff in inputs.staff.iter().filter(|s| s.active) {
        let amounts = match inputs.payment_configs.get(&staff.id) {
            Some(amounts) if !amounts.is_empty() => amounts,
            _ => {
                warn!(staff_id = staff.id, staff_name = %staff.name, "staff has no active payment configuration, skipping");
                warnings.push(RunWarning::StaffSkipped {
                    staff_id: staff.id,
                    staff_name: staff.name.clone(),
                });
                continue;
            }
        };

        let earnings = earnings::compute(amounts, &payment_types, &inputs.settings, &rates);
        for miss in &earnings.non_converged {
            warn!(
                staff_id = staff.id,
                payment_type_id = miss.payment_type_id,
                residual = miss.residual,
                "gross-up did not converge, using best guess"
            );
            warnings.push(RunWarning::GrossUpNotConverged {
                staff_id: staff.id,
                payment_type_id: miss.payment_type_id,
                residual: miss.residual,
            });
        }

        let staff_deductions = inputs.deductions.get(&staff.id).unwrap_or(&no_deductions);
        let allocation = deductions::allocate(
            earnings.statutory.net_after_cbhi,
            staff_deductions,
            &deduction_types,
        );

        let statutory = earnings.statutory;
        employees.push(EmployeePayrollRecord {
            staff_id: staff.id,
            staff_name: staff.name.clone(),
            payment_amounts: earnings.payment_amounts,
            gross_salary: earnings.gross.total,
            pension_employer: statutory.pension_employer,
            pension_employee: statutory.pension_employee,
            maternity_employer: statutory.maternity_employer,
            maternity_employee: statutory.maternity_employee,
            rama_employer: statutory.rama_employer,
            rama_employee: statutory.rama_employee,
            rssb_employer: statutory.rssb_employer,
            rssb_employee: statutory.rssb_employee,
            paye: statutory.paye,
            net_before_cbhi: statutory.net_before_cbhi,
            cbhi: statutory.cbhi,
            net_after_cbhi: statutory.net_after_cbhi,
            deduction_amounts: allocation.per_type,
            applied_deductions: allocation.applied,
            total_deductions: allocation.total,
            final_net_pay: allocation.final_net,
        });
    }

    let totals = totals::aggregate(&employees);
    Ok(ProcessOutcome {
        employees,
        totals,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payment_type::PaymentCategory;
    use chrono::NaiveDate;

    fn staff(id: u64, name: &str, active: bool) -> Staff {
        Staff {
            id,
            company_id: 1,
            name: name.to_string(),
            active,
        }
    }

    fn payment_type(id: u64, ord: u32, category: PaymentCategory) -> PaymentTypeDefinition {
        PaymentTypeDefinition {
            id,
            company_id: 1,
            name: format!("type-{}", id),
            category,
            ord,
            fixed_name: ord <= 2,
            deletable: ord > 2,
        }
    }

    fn deduction_type(id: u64, ord: u32, name: &str) -> DeductionTypeDefinition {
        DeductionTypeDefinition {
            id,
            company_id: 1,
            name: name.to_string(),
            ord,
            deletable: false,
        }
    }

    fn inputs() -> RunInputs {
        RunInputs {
            company_id: 1,
            staff: vec![
                staff(1, "Aline", true),
                staff(2, "Claude", true),
                staff(3, "Eric (no config)", true),
                staff(4, "Olive (inactive)", false),
            ],
            payment_configs: HashMap::from([
                (
                    1,
                    HashMap::from([(1, 250_000.0), (2, 30_000.0)]),
                ),
                (
                    2,
                    HashMap::from([(1, 120_000.0), (2, 20_000.0), (7, 50_000.0)]),
                ),
            ]),
            deductions: HashMap::from([(
                1,
                vec![Deduction {
                    id: 10,
                    staff_id: 1,
                    deduction_type_id: 3,
                    original_amount: 180_000.0,
                    monthly_installment: 30_000.0,
                    deducted_so_far: 60_000.0,
                    start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                }],
            )]),
            payment_types: vec![
                payment_type(1, 1, PaymentCategory::Gross),
                payment_type(2, 2, PaymentCategory::Gross),
                payment_type(7, 3, PaymentCategory::Net),
            ],
            deduction_types: vec![
                deduction_type(1, 1, "Advance"),
                deduction_type(2, 2, "Charge"),
                deduction_type(3, 3, "Loan"),
            ],
            settings: TaxSettings::default_for_company(1),
            exemptions: TaxExemptions::default(),
        }
    }

    #[test]
    fn processes_configured_staff_and_skips_the_rest() {
        let outcome = process_run(&inputs()).unwrap();
        assert_eq!(outcome.employees.len(), 2);
        assert_eq!(
            outcome.warnings,
            vec![RunWarning::StaffSkipped {
                staff_id: 3,
                staff_name: "Eric (no config)".to_string()
            }]
        );
    }

    #[test]
    fn totals_match_the_employee_records() {
        let outcome = process_run(&inputs()).unwrap();
        let net_sum: f64 = outcome.employees.iter().map(|e| e.final_net_pay).sum();
        assert!((outcome.totals.final_net_pay - net_sum).abs() < 1e-9);
        let gross_sum: f64 = outcome.employees.iter().map(|e| e.gross_salary).sum();
        assert!((outcome.totals.gross_salary - gross_sum).abs() < 1e-9);
    }

    #[test]
    fn net_floor_holds_for_every_employee() {
        let outcome = process_run(&inputs()).unwrap();
        for employee in &outcome.employees {
            assert!(employee.final_net_pay >= 0.0);
            assert!(employee.total_deductions <= employee.net_after_cbhi + 1e-9);
        }
    }

    #[test]
    fn loan_is_allocated_and_proposed_only() {
        let snapshot = inputs();
        let outcome = process_run(&snapshot).unwrap();
        let aline = outcome.employees.iter().find(|e| e.staff_id == 1).unwrap();
        assert_eq!(aline.applied_deductions.len(), 1);
        assert_eq!(aline.applied_deductions[0].amount, 30_000.0);
        // The snapshot's deduction is untouched; balances only move on
        // approval.
        assert_eq!(snapshot.deductions[&1][0].deducted_so_far, 60_000.0);
    }

    #[test]
    fn missing_payment_types_fail_before_processing() {
        let mut snapshot = inputs();
        snapshot.payment_types.clear();
        assert_eq!(
            process_run(&snapshot).unwrap_err(),
            EngineError::NoPaymentTypes { company_id: 1 }
        );

        let mut snapshot = inputs();
        snapshot.deduction_types.clear();
        assert_eq!(
            process_run(&snapshot).unwrap_err(),
            EngineError::NoDeductionTypes { company_id: 1 }
        );
    }

    #[test]
    fn cbhi_exemption_zeroes_cbhi_for_every_employee() {
        let mut snapshot = inputs();
        snapshot.exemptions.cbhi_active = false;
        let outcome = process_run(&snapshot).unwrap();
        assert!(!outcome.employees.is_empty());
        for employee in &outcome.employees {
            assert_eq!(employee.cbhi, 0.0);
            assert_eq!(employee.net_after_cbhi, employee.net_before_cbhi);
        }
        assert_eq!(outcome.totals.cbhi, 0.0);
    }

    #[test]
    fn processing_is_repeatable() {
        let snapshot = inputs();
        let first = process_run(&snapshot).unwrap();
        let second = process_run(&snapshot).unwrap();
        assert_eq!(first.employees.len(), second.employees.len());
        assert_eq!(first.totals.final_net_pay, second.totals.final_net_pay);
        assert_eq!(first.totals.paye, second.totals.paye);
    }
}
