use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::model::deduction::{Deduction, DeductionTypeDefinition, LOAN_ORDER};

#[derive(Deserialize, ToSchema)]
pub struct CreateDeductionType {
    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Canteen")]
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateDeduction {
    #[schema(example = 1)]
    pub staff_id: u64,

    #[schema(example = 3)]
    pub deduction_type_id: u64,

    #[schema(example = 180000.0)]
    pub original_amount: f64,

    #[schema(example = 30000.0)]
    pub monthly_installment: f64,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DeductionTypeQuery {
    #[schema(example = 1)]
    pub company_id: u64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DeductionQuery {
    #[schema(example = 1)]
    pub staff_id: u64,
}

#[derive(Serialize, ToSchema)]
pub struct DeductionResponse {
    #[schema(example = 10)]
    pub id: u64,
    pub staff_id: u64,
    pub deduction_type_id: u64,
    pub original_amount: f64,
    pub monthly_installment: f64,
    pub deducted_so_far: f64,
    /// Derived: original − deducted so far, floored at 0.
    #[schema(example = 120000.0)]
    pub balance: f64,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
}

impl From<Deduction> for DeductionResponse {
    fn from(deduction: Deduction) -> Self {
        Self {
            balance: deduction.balance(),
            id: deduction.id,
            staff_id: deduction.staff_id,
            deduction_type_id: deduction.deduction_type_id,
            original_amount: deduction.original_amount,
            monthly_installment: deduction.monthly_installment,
            deducted_so_far: deduction.deducted_so_far,
            start_date: deduction.start_date,
        }
    }
}

/* =========================
List deduction types (allocation order)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/deduction-type",
    params(DeductionTypeQuery),
    responses(
        (status = 200, description = "Deduction types in allocation order", body = [DeductionTypeDefinition])
    ),
    tag = "Deduction"
)]
pub async fn list_deduction_types(
    pool: web::Data<MySqlPool>,
    query: web::Query<DeductionTypeQuery>,
) -> actix_web::Result<impl Responder> {
    let data = sqlx::query_as::<_, DeductionTypeDefinition>(
        r#"
        SELECT id, company_id, name, ord, deletable
        FROM deduction_types
        WHERE company_id = ?
        ORDER BY ord
        "#,
    )
    .bind(query.company_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch deduction types");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(data))
}

/* =========================
Create custom deduction type (order 4+)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/deduction-type",
    request_body = CreateDeductionType,
    responses(
        (status = 201, description = "Deduction type created"),
        (status = 400, description = "Blank name")
    ),
    tag = "Deduction"
)]
pub async fn create_deduction_type(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDeductionType>,
) -> actix_web::Result<impl Responder> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "name must not be blank"
        })));
    }

    // Advance/Charge/Loan hold orders 1-3; custom types start at 4.
    let next_ord = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT MAX(ord) FROM deduction_types WHERE company_id = ?",
    )
    .bind(payload.company_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to compute next deduction type order");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .unwrap_or(LOAN_ORDER as i64)
        + 1;

    sqlx::query(
        r#"
        INSERT INTO deduction_types (company_id, name, ord, deletable)
        VALUES (?, ?, ?, 1)
        "#,
    )
    .bind(payload.company_id)
    .bind(name)
    .bind(next_ord.max(LOAN_ORDER as i64 + 1))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to create deduction type");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({ "message": "Deduction type created" })))
}

/* =========================
Delete custom deduction type
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/deduction-type/{deduction_type_id}",
    params(("deduction_type_id", description = "Deduction type ID")),
    responses(
        (status = 200, description = "Deduction type deleted"),
        (status = 400, description = "Built-in deduction types cannot be deleted")
    ),
    tag = "Deduction"
)]
pub async fn delete_deduction_type(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let deduction_type_id = path.into_inner();

    let result = sqlx::query("DELETE FROM deduction_types WHERE id = ? AND deletable = 1")
        .bind(deduction_type_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, deduction_type_id, "Failed to delete deduction type");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Deduction type not found or not deletable"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Deduction type deleted" })))
}

/* =========================
List a staff member's deductions
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/deduction",
    params(DeductionQuery),
    responses(
        (status = 200, description = "Deductions with derived balances", body = [DeductionResponse])
    ),
    tag = "Deduction"
)]
pub async fn list_deductions(
    pool: web::Data<MySqlPool>,
    query: web::Query<DeductionQuery>,
) -> actix_web::Result<impl Responder> {
    let deductions = sqlx::query_as::<_, Deduction>(
        r#"
        SELECT id, staff_id, deduction_type_id, original_amount,
               monthly_installment, deducted_so_far, start_date
        FROM deductions
        WHERE staff_id = ?
        ORDER BY start_date
        "#,
    )
    .bind(query.staff_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch deductions");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data: Vec<DeductionResponse> = deductions.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(data))
}

/* =========================
Grant a deduction
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/deduction",
    request_body = CreateDeduction,
    responses(
        (status = 201, description = "Deduction created"),
        (status = 400, description = "Non-positive amounts")
    ),
    tag = "Deduction"
)]
pub async fn create_deduction(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDeduction>,
) -> actix_web::Result<impl Responder> {
    if payload.original_amount <= 0.0 || payload.monthly_installment <= 0.0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "original_amount and monthly_installment must be positive"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO deductions
            (staff_id, deduction_type_id, original_amount, monthly_installment,
             deducted_so_far, start_date)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(payload.staff_id)
    .bind(payload.deduction_type_id)
    .bind(payload.original_amount)
    .bind(payload.monthly_installment)
    .bind(payload.start_date)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, staff_id = payload.staff_id, "Failed to create deduction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({ "message": "Deduction created" })))
}
