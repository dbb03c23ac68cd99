use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Draft,
    ToApprove,
    Rejected,
    Approved,
}

impl RunStatus {
    /// Approved is the only terminal state; anything else keeps the
    /// company's single run slot occupied.
    pub fn is_open(&self) -> bool {
        !matches!(self, RunStatus::Approved)
    }
}

/// One proposed allocation against one deduction. Balances are only
/// mutated from these details when the run is approved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppliedDeductionDetail {
    #[schema(example = 10)]
    pub deduction_id: u64,

    #[schema(example = 3)]
    pub deduction_type_id: u64,

    #[schema(example = 30000.0)]
    pub amount: f64,
}

/// Computed payroll breakdown for one employee in one period. Built
/// fresh on every processing pass; immutable once the run is saved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeePayrollRecord {
    #[schema(example = 1)]
    pub staff_id: u64,

    #[schema(example = "Jean Bosco Mugisha")]
    pub staff_name: String,

    /// Computed gross per payment type id.
    #[schema(value_type = Object)]
    pub payment_amounts: HashMap<u64, f64>,

    #[schema(example = 300000.0)]
    pub gross_salary: f64,

    pub pension_employer: f64,
    pub pension_employee: f64,
    pub maternity_employer: f64,
    pub maternity_employee: f64,
    pub rama_employer: f64,
    pub rama_employee: f64,

    /// Pension + maternity + RAMA, per side.
    pub rssb_employer: f64,
    pub rssb_employee: f64,

    pub paye: f64,
    pub net_before_cbhi: f64,
    pub cbhi: f64,
    pub net_after_cbhi: f64,

    /// Applied total per deduction type id.
    #[schema(value_type = Object)]
    pub deduction_amounts: HashMap<u64, f64>,

    pub applied_deductions: Vec<AppliedDeductionDetail>,

    pub total_deductions: f64,

    #[schema(example = 250000.0)]
    pub final_net_pay: f64,
}

/// Run-level sums over all employee records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RunTotals {
    pub gross_salary: f64,
    pub pension_employer: f64,
    pub pension_employee: f64,
    pub maternity_employer: f64,
    pub maternity_employee: f64,
    pub rama_employer: f64,
    pub rama_employee: f64,
    pub rssb_employer: f64,
    pub rssb_employee: f64,
    pub paye: f64,
    pub cbhi: f64,
    pub total_deductions: f64,
    pub final_net_pay: f64,

    /// Total computed gross per payment type id.
    #[schema(value_type = Object)]
    pub payment_totals: HashMap<u64, f64>,

    /// Total applied amount per deduction type id.
    #[schema(value_type = Object)]
    pub deduction_totals: HashMap<u64, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayrollRun {
    /// Period-coded id, e.g. "1-202608".
    #[schema(example = "1-202608")]
    pub id: String,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = 8)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = "draft")]
    pub status: RunStatus,

    pub employees: Vec<EmployeePayrollRecord>,

    pub totals: RunTotals,

    #[schema(example = "Totals do not match the advance ledger", nullable = true)]
    pub rejection_reason: Option<String>,

    #[schema(example = "2026-08-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PayrollRun {
    pub fn period_id(company_id: u64, year: i32, month: u32) -> String {
        format!("{}-{}{:02}", company_id, year, month)
    }

    /// Fresh empty draft for a period.
    pub fn new_draft(company_id: u64, year: i32, month: u32) -> Self {
        Self {
            id: Self::period_id(company_id, year, month),
            company_id,
            month,
            year,
            status: RunStatus::Draft,
            employees: Vec::new(),
            totals: RunTotals::default(),
            rejection_reason: None,
            created_at: None,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id.clone(),
            company_id: self.company_id,
            month: self.month,
            year: self.year,
            status: self.status,
            employee_count: self.employees.len() as u32,
            total_gross: self.totals.gross_salary,
            total_deductions: self.totals.total_deductions,
            total_net: self.totals.final_net_pay,
        }
    }
}

/// Denormalized projection for fast listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunSummary {
    #[schema(example = "1-202608")]
    pub id: String,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = 8)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = "draft")]
    pub status: RunStatus,

    #[schema(example = 12)]
    pub employee_count: u32,

    #[schema(example = 3600000.0)]
    pub total_gross: f64,

    #[schema(example = 240000.0)]
    pub total_deductions: f64,

    #[schema(example = 2950000.0)]
    pub total_net: f64,
}

/// Storage shape. Employee records and totals live in JSON text columns;
/// summary figures are denormalized for listing.
#[derive(Debug, FromRow)]
pub struct RunRow {
    pub id: String,
    pub company_id: u64,
    pub month: u32,
    pub year: i32,
    pub status: String,
    pub employees: String,
    pub totals: String,
    pub rejection_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl RunRow {
    pub fn into_run(self) -> anyhow::Result<PayrollRun> {
        Ok(PayrollRun {
            status: self
                .status
                .parse()
                .map_err(|e| anyhow::anyhow!("bad run status {:?}: {}", self.status, e))?,
            employees: serde_json::from_str(&self.employees)?,
            totals: serde_json::from_str(&self.totals)?,
            id: self.id,
            company_id: self.company_id,
            month: self.month,
            year: self.year,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
        })
    }
}

/// Listing row; reads the denormalized summary columns only.
#[derive(Debug, FromRow)]
pub struct RunSummaryRow {
    pub id: String,
    pub company_id: u64,
    pub month: u32,
    pub year: i32,
    pub status: String,
    pub employee_count: u32,
    pub total_gross: f64,
    pub total_deductions: f64,
    pub total_net: f64,
}

impl RunSummaryRow {
    pub fn into_summary(self) -> anyhow::Result<RunSummary> {
        Ok(RunSummary {
            status: self
                .status
                .parse()
                .map_err(|e| anyhow::anyhow!("bad run status {:?}: {}", self.status, e))?,
            id: self.id,
            company_id: self.company_id,
            month: self.month,
            year: self.year,
            employee_count: self.employee_count,
            total_gross: self.total_gross,
            total_deductions: self.total_deductions,
            total_net: self.total_net,
        })
    }
}
