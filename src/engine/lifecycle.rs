use std::collections::BTreeMap;

use derive_more::{Display, Error};

use crate::model::deduction::DeductionAdjustment;
use crate::model::payroll_run::{
    EmployeePayrollRecord, PayrollRun, RunStatus, RunSummary, RunTotals,
};

/// Transition violations. Each carries a specific reason; the run is
/// left untouched when one is returned.
#[derive(Debug, Display, Error, PartialEq)]
pub enum LifecycleError {
    #[display(fmt = "company {} already has run {} in progress", company_id, run_id)]
    RunInProgress { company_id: u64, run_id: String },

    #[display(fmt = "a payroll run already exists for period {}/{}", month, year)]
    PeriodExists { month: u32, year: i32 },

    #[display(fmt = "run {} cannot be processed from status {}", run_id, status)]
    NotProcessable { run_id: String, status: RunStatus },

    #[display(fmt = "run {} cannot be submitted from status {}", run_id, status)]
    NotSubmittable { run_id: String, status: RunStatus },

    #[display(fmt = "run {} has no processed employees to submit", run_id)]
    EmptyRun { run_id: String },

    #[display(fmt = "run {} is not awaiting approval (status {})", run_id, status)]
    NotAwaitingApproval { run_id: String, status: RunStatus },

    #[display(fmt = "a rejection reason is required for run {}", run_id)]
    MissingRejectionReason { run_id: String },

    #[display(fmt = "run {} cannot be reset from status {}", run_id, status)]
    NotResettable { run_id: String, status: RunStatus },
}

/// Creation guard: one non-Approved run per company, one run per
/// period. `existing` is the company's current run list.
pub fn ensure_can_create(
    company_id: u64,
    year: i32,
    month: u32,
    existing: &[RunSummary],
) -> Result<(), LifecycleError> {
    if let Some(open) = existing.iter().find(|r| r.status.is_open()) {
        return Err(LifecycleError::RunInProgress {
            company_id,
            run_id: open.id.clone(),
        });
    }
    if existing.iter().any(|r| r.year == year && r.month == month) {
        return Err(LifecycleError::PeriodExists { month, year });
    }
    Ok(())
}

/// Draft and Rejected runs may be (re)processed.
pub fn ensure_can_process(run: &PayrollRun) -> Result<(), LifecycleError> {
    match run.status {
        RunStatus::Draft | RunStatus::Rejected => Ok(()),
        status => Err(LifecycleError::NotProcessable {
            run_id: run.id.clone(),
            status,
        }),
    }
}

/// Installs a processing result. A Rejected run returns to a populated
/// Draft and loses its previous rejection reason.
pub fn mark_processed(
    run: &mut PayrollRun,
    employees: Vec<EmployeePayrollRecord>,
    totals: RunTotals,
) -> Result<(), LifecycleError> {
    ensure_can_process(run)?;
    run.employees = employees;
    run.totals = totals;
    run.status = RunStatus::Draft;
    run.rejection_reason = None;
    Ok(())
}

/// Processed Draft → To Approve.
pub fn submit(run: &mut PayrollRun) -> Result<(), LifecycleError> {
    if run.status != RunStatus::Draft {
        return Err(LifecycleError::NotSubmittable {
            run_id: run.id.clone(),
            status: run.status,
        });
    }
    if run.employees.is_empty() {
        return Err(LifecycleError::EmptyRun {
            run_id: run.id.clone(),
        });
    }
    run.status = RunStatus::ToApprove;
    Ok(())
}

/// To Approve → Approved. Returns the deduction reconciliation batch;
/// applying it is the only point where deduction balances move.
pub fn approve(run: &mut PayrollRun) -> Result<Vec<DeductionAdjustment>, LifecycleError> {
    if run.status != RunStatus::ToApprove {
        return Err(LifecycleError::NotAwaitingApproval {
            run_id: run.id.clone(),
            status: run.status,
        });
    }
    run.status = RunStatus::Approved;
    Ok(reconciliation_adjustments(run))
}

/// To Approve → Rejected; the reason must not be blank.
pub fn reject(run: &mut PayrollRun, reason: &str) -> Result<(), LifecycleError> {
    if run.status != RunStatus::ToApprove {
        return Err(LifecycleError::NotAwaitingApproval {
            run_id: run.id.clone(),
            status: run.status,
        });
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LifecycleError::MissingRejectionReason {
            run_id: run.id.clone(),
        });
    }
    run.status = RunStatus::Rejected;
    run.rejection_reason = Some(reason.to_string());
    Ok(())
}

/// Back to an empty Draft for editing and a fresh processing pass.
pub fn reset(run: &mut PayrollRun) -> Result<(), LifecycleError> {
    match run.status {
        RunStatus::Draft | RunStatus::Rejected => {
            run.employees = Vec::new();
            run.totals = RunTotals::default();
            run.status = RunStatus::Draft;
            run.rejection_reason = None;
            Ok(())
        }
        status => Err(LifecycleError::NotResettable {
            run_id: run.id.clone(),
            status,
        }),
    }
}

/// One delta per deduction, summed over every applied detail in the
/// run and ordered by deduction id.
pub fn reconciliation_adjustments(run: &PayrollRun) -> Vec<DeductionAdjustment> {
    let mut by_deduction: BTreeMap<u64, f64> = BTreeMap::new();
    for record in &run.employees {
        for detail in &record.applied_deductions {
            *by_deduction.entry(detail.deduction_id).or_insert(0.0) += detail.amount;
        }
    }
    by_deduction
        .into_iter()
        .map(|(deduction_id, amount)| DeductionAdjustment {
            deduction_id,
            amount,
        })
        .collect()
}

/// Inverse of the approval reconciliation, for restoring balances when
/// an approved run is deleted.
pub fn reversal_adjustments(run: &PayrollRun) -> Vec<DeductionAdjustment> {
    reconciliation_adjustments(run)
        .into_iter()
        .map(|adjustment| DeductionAdjustment {
            deduction_id: adjustment.deduction_id,
            amount: -adjustment.amount,
        })
        .collect()
}
