use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::model::staff::Staff;

#[derive(Deserialize, ToSchema)]
pub struct CreateStaff {
    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Jean Bosco Mugisha")]
    pub name: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct StaffQuery {
    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = true)]
    pub active: Option<bool>,

    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct StaffListResponse {
    pub data: Vec<Staff>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Replaces the staff member's configured amounts. Keys are payment
/// type ids; the amount is a gross earning or a net target depending on
/// the type's category.
#[derive(Deserialize, ToSchema)]
pub struct PaymentConfigUpdate {
    #[schema(value_type = Object)]
    pub amounts: HashMap<u64, f64>,
}

/* =========================
Create staff
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/staff",
    request_body = CreateStaff,
    responses(
        (status = 201, description = "Staff member created"),
        (status = 400, description = "Blank name")
    ),
    tag = "Staff"
)]
pub async fn create_staff(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateStaff>,
) -> actix_web::Result<impl Responder> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "name must not be blank"
        })));
    }

    sqlx::query("INSERT INTO staff (company_id, name, active) VALUES (?, ?, 1)")
        .bind(payload.company_id)
        .bind(name)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create staff");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Created().json(json!({ "message": "Staff member created" })))
}

/* =========================
List staff
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/staff",
    params(StaffQuery),
    responses(
        (status = 200, description = "Paginated staff list", body = StaffListResponse)
    ),
    tag = "Staff"
)]
pub async fn list_staff(
    pool: web::Data<MySqlPool>,
    query: web::Query<StaffQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE company_id = ?");
    if query.active.is_some() {
        where_sql.push_str(" AND active = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM staff{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(query.company_id);
    if let Some(active) = query.active {
        count_q = count_q.bind(active);
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count staff");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        "SELECT id, company_id, name, active FROM staff{} ORDER BY name LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, Staff>(&data_sql).bind(query.company_id);
    if let Some(active) = query.active {
        data_q = data_q.bind(active);
    }
    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch staff list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(StaffListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/* =========================
Replace payment configuration
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/staff/{staff_id}/payment-config",
    params(("staff_id", description = "Staff ID")),
    request_body = PaymentConfigUpdate,
    responses(
        (status = 200, description = "Payment configuration replaced"),
        (status = 404, description = "Staff member not found")
    ),
    tag = "Staff"
)]
pub async fn update_payment_config(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<PaymentConfigUpdate>,
) -> actix_web::Result<impl Responder> {
    let staff_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM staff WHERE id = ?")
        .bind(staff_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, staff_id, "Failed to check staff");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    if exists == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Staff member not found" })));
    }

    sqlx::query("DELETE FROM staff_payment_configs WHERE staff_id = ?")
        .bind(staff_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, staff_id, "Failed to clear payment config");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    for (payment_type_id, amount) in &payload.amounts {
        sqlx::query(
            r#"
            INSERT INTO staff_payment_configs (staff_id, payment_type_id, amount, active)
            VALUES (?, ?, ?, 1)
            "#,
        )
        .bind(staff_id)
        .bind(payment_type_id)
        .bind(amount)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, staff_id, payment_type_id, "Failed to insert payment config");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Payment configuration updated" })))
}
