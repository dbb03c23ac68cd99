use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::model::payment_type::{
    PaymentCategory, PaymentTypeDefinition, PaymentTypeRow, TRANSPORT_ALLOWANCE_ORDER,
};

#[derive(Deserialize, ToSchema)]
pub struct CreatePaymentType {
    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Housing Allowance")]
    pub name: String,

    #[schema(example = "net")]
    pub category: PaymentCategory,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PaymentTypeQuery {
    #[schema(example = 1)]
    pub company_id: u64,
}

#[derive(Serialize, ToSchema)]
pub struct PaymentTypeListResponse {
    pub data: Vec<PaymentTypeDefinition>,
}

/* =========================
List payment types (processing order)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/payment-type",
    params(PaymentTypeQuery),
    responses(
        (status = 200, description = "Payment types in processing order", body = PaymentTypeListResponse)
    ),
    tag = "Payment Type"
)]
pub async fn list_payment_types(
    pool: web::Data<MySqlPool>,
    query: web::Query<PaymentTypeQuery>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, PaymentTypeRow>(
        r#"
        SELECT id, company_id, name, category, ord, fixed_name, deletable
        FROM payment_types
        WHERE company_id = ?
        ORDER BY ord
        "#,
    )
    .bind(query.company_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch payment types");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data = rows
        .into_iter()
        .map(PaymentTypeRow::into_definition)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!(error = %e, "Bad payment category in storage");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PaymentTypeListResponse { data }))
}

/* =========================
Create custom payment type
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/payment-type",
    request_body = CreatePaymentType,
    responses(
        (status = 201, description = "Payment type created"),
        (status = 400, description = "Blank name")
    ),
    tag = "Payment Type"
)]
pub async fn create_payment_type(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePaymentType>,
) -> actix_web::Result<impl Responder> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "name must not be blank"
        })));
    }

    // Custom types slot in after the fixed basic-pay/transport pair.
    let next_ord = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT MAX(ord) FROM payment_types WHERE company_id = ?",
    )
    .bind(payload.company_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to compute next payment type order");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .unwrap_or(TRANSPORT_ALLOWANCE_ORDER as i64)
        + 1;

    sqlx::query(
        r#"
        INSERT INTO payment_types (company_id, name, category, ord, fixed_name, deletable)
        VALUES (?, ?, ?, ?, 0, 1)
        "#,
    )
    .bind(payload.company_id)
    .bind(name)
    .bind(payload.category.to_string())
    .bind(next_ord)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to create payment type");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({ "message": "Payment type created" })))
}

/* =========================
Delete custom payment type
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/payment-type/{payment_type_id}",
    params(("payment_type_id", description = "Payment type ID")),
    responses(
        (status = 200, description = "Payment type deleted"),
        (status = 400, description = "Built-in payment types cannot be deleted"),
        (status = 404, description = "Payment type not found")
    ),
    tag = "Payment Type"
)]
pub async fn delete_payment_type(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let payment_type_id = path.into_inner();

    let result = sqlx::query("DELETE FROM payment_types WHERE id = ? AND deletable = 1")
        .bind(payment_type_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, payment_type_id, "Failed to delete payment type");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Payment type not found or not deletable"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Payment type deleted" })))
}
