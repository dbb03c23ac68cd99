use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::engine::{self, RunInputs, RunWarning, lifecycle};
use crate::model::deduction::{Deduction, DeductionAdjustment, DeductionTypeDefinition};
use crate::model::payment_type::{PaymentTypeRow, StaffPaymentConfigRow};
use crate::model::payroll_run::{PayrollRun, RunRow, RunSummary, RunSummaryRow};
use crate::model::staff::Staff;
use crate::model::tax_settings::{TaxExemptions, TaxSettings};

#[derive(Deserialize, ToSchema)]
pub struct CreateRun {
    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = 8)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectRun {
    #[schema(example = "Totals do not match the advance ledger")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RunQuery {
    #[schema(example = 1)]
    pub company_id: Option<u64>,

    #[schema(example = "draft")]
    pub status: Option<String>,

    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct RunListResponse {
    pub data: Vec<RunSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct ProcessRunResponse {
    #[schema(example = "Payroll run processed")]
    pub message: String,
    pub run: RunSummary,
    pub warnings: Vec<RunWarning>,
}

// Typed binding helper for the dynamic list filter.
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/* =========================
Shared data access
========================= */

async fn fetch_run(pool: &MySqlPool, run_id: &str) -> anyhow::Result<Option<PayrollRun>> {
    let row = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, company_id, month, year, status, employees, totals, rejection_reason, created_at
        FROM payroll_runs
        WHERE id = ?
        "#,
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?;

    row.map(RunRow::into_run).transpose()
}

/// Writes the run back, including the denormalized summary columns the
/// list endpoint reads.
async fn persist_run(pool: &MySqlPool, run: &PayrollRun) -> anyhow::Result<()> {
    let summary = run.summary();
    sqlx::query(
        r#"
        UPDATE payroll_runs
        SET status = ?, employees = ?, totals = ?, rejection_reason = ?,
            employee_count = ?, total_gross = ?, total_deductions = ?, total_net = ?
        WHERE id = ?
        "#,
    )
    .bind(run.status.to_string())
    .bind(serde_json::to_string(&run.employees)?)
    .bind(serde_json::to_string(&run.totals)?)
    .bind(&run.rejection_reason)
    .bind(summary.employee_count)
    .bind(summary.total_gross)
    .bind(summary.total_deductions)
    .bind(summary.total_net)
    .bind(&run.id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn company_run_summaries(
    pool: &MySqlPool,
    company_id: u64,
) -> anyhow::Result<Vec<RunSummary>> {
    let rows = sqlx::query_as::<_, RunSummaryRow>(
        r#"
        SELECT id, company_id, month, year, status,
               employee_count, total_gross, total_deductions, total_net
        FROM payroll_runs
        WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RunSummaryRow::into_summary).collect()
}

/// Read-only snapshot for one processing pass: active staff, their
/// payment configs and open deductions, type definitions, tax profile.
async fn load_run_inputs(pool: &MySqlPool, company_id: u64) -> anyhow::Result<RunInputs> {
    let (staff, payment_type_rows, deduction_types) = futures::try_join!(
        sqlx::query_as::<_, Staff>(
            "SELECT id, company_id, name, active FROM staff WHERE company_id = ? AND active = 1",
        )
        .bind(company_id)
        .fetch_all(pool),
        sqlx::query_as::<_, PaymentTypeRow>(
            r#"
            SELECT id, company_id, name, category, ord, fixed_name, deletable
            FROM payment_types
            WHERE company_id = ?
            ORDER BY ord
            "#,
        )
        .bind(company_id)
        .fetch_all(pool),
        sqlx::query_as::<_, DeductionTypeDefinition>(
            r#"
            SELECT id, company_id, name, ord, deletable
            FROM deduction_types
            WHERE company_id = ?
            ORDER BY ord
            "#,
        )
        .bind(company_id)
        .fetch_all(pool),
    )?;

    let payment_types = payment_type_rows
        .into_iter()
        .map(|row| {
            row.into_definition()
                .map_err(|e| anyhow::anyhow!("bad payment category in storage: {}", e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let config_rows = sqlx::query_as::<_, StaffPaymentConfigRow>(
        r#"
        SELECT c.staff_id, c.payment_type_id, c.amount, c.active
        FROM staff_payment_configs c
        JOIN staff s ON s.id = c.staff_id
        WHERE s.company_id = ? AND c.active = 1
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    let mut payment_configs: HashMap<u64, HashMap<u64, f64>> = HashMap::new();
    for row in config_rows {
        payment_configs
            .entry(row.staff_id)
            .or_default()
            .insert(row.payment_type_id, row.amount);
    }

    let deduction_rows = sqlx::query_as::<_, Deduction>(
        r#"
        SELECT d.id, d.staff_id, d.deduction_type_id, d.original_amount,
               d.monthly_installment, d.deducted_so_far, d.start_date
        FROM deductions d
        JOIN staff s ON s.id = d.staff_id
        WHERE s.company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    let mut deductions: HashMap<u64, Vec<Deduction>> = HashMap::new();
    for deduction in deduction_rows {
        if deduction.balance() > 0.0 {
            deductions.entry(deduction.staff_id).or_default().push(deduction);
        }
    }

    let settings = sqlx::query_as::<_, TaxSettings>(
        r#"
        SELECT company_id, band1_limit, band2_limit, band3_limit,
               rate1, rate2, rate3, rate4,
               pension_employer_rate, pension_employee_rate,
               maternity_employer_rate, maternity_employee_rate,
               rama_employer_rate, rama_employee_rate, cbhi_rate
        FROM tax_settings
        WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .unwrap_or_else(|| TaxSettings::default_for_company(company_id));

    let exemptions = sqlx::query_as::<_, TaxExemptions>(
        r#"
        SELECT paye_active, pension_active, maternity_active, rama_active, cbhi_active
        FROM tax_settings
        WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .unwrap_or_default();

    Ok(RunInputs {
        company_id,
        staff,
        payment_configs,
        deductions,
        payment_types,
        deduction_types,
        settings,
        exemptions,
    })
}

async fn apply_adjustment(pool: &MySqlPool, adjustment: &DeductionAdjustment) -> anyhow::Result<()> {
    let mut deduction = sqlx::query_as::<_, Deduction>(
        r#"
        SELECT id, staff_id, deduction_type_id, original_amount,
               monthly_installment, deducted_so_far, start_date
        FROM deductions
        WHERE id = ?
        "#,
    )
    .bind(adjustment.deduction_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| anyhow::anyhow!("deduction {} not found", adjustment.deduction_id))?;

    deduction.apply_adjustment(adjustment.amount);

    sqlx::query("UPDATE deductions SET deducted_so_far = ? WHERE id = ?")
        .bind(deduction.deducted_so_far)
        .bind(deduction.id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Applies the batch with one retry per row; returns ids that still
/// failed so the caller can surface them for a later retry.
async fn apply_adjustment_batch(
    pool: &MySqlPool,
    adjustments: &[DeductionAdjustment],
) -> Vec<u64> {
    let mut failures = Vec::new();
    for adjustment in adjustments {
        if let Err(first) = apply_adjustment(pool, adjustment).await {
            tracing::warn!(
                error = %first,
                deduction_id = adjustment.deduction_id,
                "deduction adjustment failed, retrying"
            );
            if let Err(second) = apply_adjustment(pool, adjustment).await {
                tracing::error!(
                    error = %second,
                    deduction_id = adjustment.deduction_id,
                    amount = adjustment.amount,
                    "deduction adjustment failed after retry"
                );
                failures.push(adjustment.deduction_id);
            }
        }
    }
    failures
}

fn internal_error(context: &str) -> impl Fn(anyhow::Error) -> actix_web::Error + '_ {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    }
}

/* =========================
Create run (empty draft)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/run",
    request_body = CreateRun,
    responses(
        (status = 201, description = "Payroll run created"),
        (status = 400, description = "Invalid period or an open run already exists")
    ),
    tag = "Payroll Run"
)]
pub async fn create_run(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateRun>,
) -> actix_web::Result<impl Responder> {
    if !(1..=12).contains(&payload.month) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "month must be between 1 and 12"
        })));
    }

    let existing = company_run_summaries(pool.get_ref(), payload.company_id)
        .await
        .map_err(internal_error("Failed to list company runs"))?;

    if let Err(e) =
        lifecycle::ensure_can_create(payload.company_id, payload.year, payload.month, &existing)
    {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    let run = PayrollRun::new_draft(payload.company_id, payload.year, payload.month);
    sqlx::query(
        r#"
        INSERT INTO payroll_runs
            (id, company_id, month, year, status, employees, totals,
             employee_count, total_gross, total_deductions, total_net)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, 0, 0)
        "#,
    )
    .bind(&run.id)
    .bind(run.company_id)
    .bind(run.month)
    .bind(run.year)
    .bind(run.status.to_string())
    .bind("[]")
    .bind(serde_json::to_string(&run.totals).unwrap_or_else(|_| "{}".to_string()))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, run_id = %run.id, "Failed to create payroll run");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Payroll run created",
        "id": run.id
    })))
}

/* =========================
Process run (populate employees)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/run/{run_id}/process",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, description = "Run processed", body = ProcessRunResponse),
        (status = 400, description = "Run is not in a processable state"),
        (status = 404, description = "Run not found")
    ),
    tag = "Payroll Run"
)]
pub async fn process_run(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let run_id = path.into_inner();

    let Some(mut run) = fetch_run(pool.get_ref(), &run_id)
        .await
        .map_err(internal_error("Failed to fetch payroll run"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Payroll run not found" })));
    };

    if let Err(e) = lifecycle::ensure_can_process(&run) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    let inputs = load_run_inputs(pool.get_ref(), run.company_id)
        .await
        .map_err(internal_error("Failed to load run inputs"))?;

    let outcome = match engine::process_run(&inputs) {
        Ok(outcome) => outcome,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    };

    if let Err(e) = lifecycle::mark_processed(&mut run, outcome.employees, outcome.totals) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    persist_run(pool.get_ref(), &run)
        .await
        .map_err(internal_error("Failed to persist processed run"))?;

    tracing::info!(run_id = %run.id, employees = run.employees.len(), "payroll run processed");

    Ok(HttpResponse::Ok().json(ProcessRunResponse {
        message: "Payroll run processed".to_string(),
        run: run.summary(),
        warnings: outcome.warnings,
    }))
}

/* =========================
Submit for approval
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/run/{run_id}/submit",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, description = "Run submitted for approval"),
        (status = 400, description = "Run is not a processed draft"),
        (status = 404, description = "Run not found")
    ),
    tag = "Payroll Run"
)]
pub async fn submit_run(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let run_id = path.into_inner();

    let Some(mut run) = fetch_run(pool.get_ref(), &run_id)
        .await
        .map_err(internal_error("Failed to fetch payroll run"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Payroll run not found" })));
    };

    if let Err(e) = lifecycle::submit(&mut run) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    persist_run(pool.get_ref(), &run)
        .await
        .map_err(internal_error("Failed to persist submitted run"))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Payroll run submitted for approval" })))
}

/* =========================
Approve (reconciles deduction balances)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/run/{run_id}/approve",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, description = "Run approved; any reconciliation failures listed for retry"),
        (status = 400, description = "Run is not awaiting approval"),
        (status = 404, description = "Run not found")
    ),
    tag = "Payroll Run"
)]
pub async fn approve_run(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let run_id = path.into_inner();

    let Some(mut run) = fetch_run(pool.get_ref(), &run_id)
        .await
        .map_err(internal_error("Failed to fetch payroll run"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Payroll run not found" })));
    };

    let adjustments = match lifecycle::approve(&mut run) {
        Ok(adjustments) => adjustments,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    };

    persist_run(pool.get_ref(), &run)
        .await
        .map_err(internal_error("Failed to persist approved run"))?;

    // Approval stands even if some balance updates fail; the failures
    // are surfaced so the caller can retry reconciliation.
    let failures = apply_adjustment_batch(pool.get_ref(), &adjustments).await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Payroll run approved",
        "reconciliation_failures": failures
    })))
}

/* =========================
Reject (reason required)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/run/{run_id}/reject",
    params(("run_id", description = "Payroll run ID")),
    request_body = RejectRun,
    responses(
        (status = 200, description = "Run rejected"),
        (status = 400, description = "Run is not awaiting approval, or the reason is blank"),
        (status = 404, description = "Run not found")
    ),
    tag = "Payroll Run"
)]
pub async fn reject_run(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<RejectRun>,
) -> actix_web::Result<impl Responder> {
    let run_id = path.into_inner();

    let Some(mut run) = fetch_run(pool.get_ref(), &run_id)
        .await
        .map_err(internal_error("Failed to fetch payroll run"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Payroll run not found" })));
    };

    if let Err(e) = lifecycle::reject(&mut run, &payload.reason) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    persist_run(pool.get_ref(), &run)
        .await
        .map_err(internal_error("Failed to persist rejected run"))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Payroll run rejected" })))
}

/* =========================
Reset to empty draft
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/run/{run_id}/reset",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, description = "Run reset to an empty draft"),
        (status = 400, description = "Run cannot be reset"),
        (status = 404, description = "Run not found")
    ),
    tag = "Payroll Run"
)]
pub async fn reset_run(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let run_id = path.into_inner();

    let Some(mut run) = fetch_run(pool.get_ref(), &run_id)
        .await
        .map_err(internal_error("Failed to fetch payroll run"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Payroll run not found" })));
    };

    if let Err(e) = lifecycle::reset(&mut run) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    persist_run(pool.get_ref(), &run)
        .await
        .map_err(internal_error("Failed to persist reset run"))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Payroll run reset" })))
}

/* =========================
Get one run
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/run/{run_id}",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, description = "Full payroll run", body = PayrollRun),
        (status = 404, description = "Run not found")
    ),
    tag = "Payroll Run"
)]
pub async fn get_run(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let run_id = path.into_inner();

    let run = fetch_run(pool.get_ref(), &run_id)
        .await
        .map_err(internal_error("Failed to fetch payroll run"))?;

    match run {
        Some(run) => Ok(HttpResponse::Ok().json(run)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Payroll run not found" }))),
    }
}

/* =========================
List run summaries
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/run",
    params(RunQuery),
    responses(
        (status = 200, description = "Paginated run summaries", body = RunListResponse)
    ),
    tag = "Payroll Run"
)]
pub async fn list_runs(
    pool: web::Data<MySqlPool>,
    query: web::Query<RunQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(company_id) = query.company_id {
        where_sql.push_str(" AND company_id = ?");
        args.push(FilterValue::U64(company_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    let count_sql = format!("SELECT COUNT(*) FROM payroll_runs{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count payroll runs");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, company_id, month, year, status,
               employee_count, total_gross, total_deductions, total_net
        FROM payroll_runs
        {}
        ORDER BY year DESC, month DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, RunSummaryRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }
    let rows = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch payroll run list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data = rows
        .into_iter()
        .map(RunSummaryRow::into_summary)
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(internal_error("Failed to decode payroll run summaries"))?;

    Ok(HttpResponse::Ok().json(RunListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/* =========================
Delete run (reverses balances for approved runs)
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/run/{run_id}",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, description = "Run deleted; approved runs have their deduction balances restored"),
        (status = 404, description = "Run not found"),
        (status = 500, description = "Balance reversal failed; the run was left in place")
    ),
    tag = "Payroll Run"
)]
pub async fn delete_run(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let run_id = path.into_inner();

    let Some(run) = fetch_run(pool.get_ref(), &run_id)
        .await
        .map_err(internal_error("Failed to fetch payroll run"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Payroll run not found" })));
    };

    if run.status == crate::model::payroll_run::RunStatus::Approved {
        let reversals = lifecycle::reversal_adjustments(&run);
        let failures = apply_adjustment_batch(pool.get_ref(), &reversals).await;
        if !failures.is_empty() {
            return Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Deduction balance reversal failed, run not deleted",
                "failed_deductions": failures
            })));
        }
    }

    sqlx::query("DELETE FROM payroll_runs WHERE id = ?")
        .bind(&run_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, run_id = %run_id, "Failed to delete payroll run");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Payroll run deleted" })))
}
