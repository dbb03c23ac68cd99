use crate::api::deduction::{
    CreateDeduction, CreateDeductionType, DeductionQuery, DeductionResponse, DeductionTypeQuery,
};
use crate::api::payment_type::{CreatePaymentType, PaymentTypeListResponse, PaymentTypeQuery};
use crate::api::payroll_run::{
    CreateRun, ProcessRunResponse, RejectRun, RunListResponse, RunQuery,
};
use crate::api::staff::{CreateStaff, PaymentConfigUpdate, StaffListResponse, StaffQuery};
use crate::api::tax_settings::{TaxProfileResponse, TaxSettingsQuery, UpdateTaxProfile};
use crate::engine::RunWarning;
use crate::model::deduction::{Deduction, DeductionTypeDefinition};
use crate::model::payment_type::{PaymentCategory, PaymentTypeDefinition, StaffPaymentConfigRow};
use crate::model::payroll_run::{
    AppliedDeductionDetail, EmployeePayrollRecord, PayrollRun, RunStatus, RunSummary, RunTotals,
};
use crate::model::staff::Staff;
use crate::model::tax_settings::{TaxExemptions, TaxSettings};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll Management API",
        version = "1.0.0",
        description = r#"
## Payroll Management System

This API computes monthly payroll for the employees of a company and
manages the approval lifecycle of each payroll run.

### 🔹 Key Features
- **Payroll Runs**
  - Create a draft run, process it, submit it for approval, approve or
    reject it with a reason
  - Gross-up of net-target payment components, statutory contributions
    (PAYE, pension, maternity, RAMA, CBHI) and ordered deduction
    allocation
- **Payment & Deduction Types**
  - Built-in basic pay / transport allowance and Advance / Charge / Loan
    categories, plus custom types
- **Staff Configuration**
  - Per-staff payment amounts and discretionary deductions with derived
    balances
- **Tax Settings**
  - Per-company PAYE bands, contribution rates and exemption flags

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::payroll_run::create_run,
        crate::api::payroll_run::process_run,
        crate::api::payroll_run::submit_run,
        crate::api::payroll_run::approve_run,
        crate::api::payroll_run::reject_run,
        crate::api::payroll_run::reset_run,
        crate::api::payroll_run::get_run,
        crate::api::payroll_run::list_runs,
        crate::api::payroll_run::delete_run,

        crate::api::payment_type::list_payment_types,
        crate::api::payment_type::create_payment_type,
        crate::api::payment_type::delete_payment_type,

        crate::api::deduction::list_deduction_types,
        crate::api::deduction::create_deduction_type,
        crate::api::deduction::delete_deduction_type,
        crate::api::deduction::list_deductions,
        crate::api::deduction::create_deduction,

        crate::api::staff::create_staff,
        crate::api::staff::list_staff,
        crate::api::staff::update_payment_config,

        crate::api::tax_settings::get_tax_settings,
        crate::api::tax_settings::update_tax_settings
    ),
    components(
        schemas(
            CreateRun,
            RejectRun,
            RunQuery,
            RunListResponse,
            ProcessRunResponse,
            PayrollRun,
            RunStatus,
            RunSummary,
            RunTotals,
            RunWarning,
            EmployeePayrollRecord,
            AppliedDeductionDetail,
            CreatePaymentType,
            PaymentTypeQuery,
            PaymentTypeListResponse,
            PaymentTypeDefinition,
            PaymentCategory,
            StaffPaymentConfigRow,
            CreateDeductionType,
            CreateDeduction,
            DeductionTypeQuery,
            DeductionQuery,
            DeductionResponse,
            Deduction,
            DeductionTypeDefinition,
            CreateStaff,
            StaffQuery,
            StaffListResponse,
            PaymentConfigUpdate,
            Staff,
            TaxSettingsQuery,
            TaxProfileResponse,
            UpdateTaxProfile,
            TaxSettings,
            TaxExemptions
        )
    ),
    tags(
        (name = "Payroll Run", description = "Payroll run lifecycle APIs"),
        (name = "Payment Type", description = "Payment type definition APIs"),
        (name = "Deduction", description = "Deduction types and staff deduction APIs"),
        (name = "Staff", description = "Staff and payment configuration APIs"),
        (name = "Tax Settings", description = "Company tax profile APIs"),
    )
)]
pub struct ApiDoc;
