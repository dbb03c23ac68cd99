use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::model::tax_settings::{TaxExemptions, TaxSettings};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TaxSettingsQuery {
    #[schema(example = 1)]
    pub company_id: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TaxProfileResponse {
    pub settings: TaxSettings,
    pub exemptions: TaxExemptions,
    /// True when the statutory defaults are being served because the
    /// company has nothing persisted.
    #[schema(example = false)]
    pub defaults: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTaxProfile {
    pub settings: TaxSettings,
    pub exemptions: TaxExemptions,
}

/* =========================
Get tax profile (defaults when unset)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/tax-settings",
    params(TaxSettingsQuery),
    responses(
        (status = 200, description = "Company tax profile", body = TaxProfileResponse)
    ),
    tag = "Tax Settings"
)]
pub async fn get_tax_settings(
    pool: web::Data<MySqlPool>,
    query: web::Query<TaxSettingsQuery>,
) -> actix_web::Result<impl Responder> {
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
    .bind(query.company_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch tax settings");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let exemptions = sqlx::query_as::<_, TaxExemptions>(
        r#"
        SELECT paye_active, pension_active, maternity_active, rama_active, cbhi_active
        FROM tax_settings
        WHERE company_id = ?
        "#,
    )
    .bind(query.company_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch tax exemptions");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let defaults = settings.is_none();
    Ok(HttpResponse::Ok().json(TaxProfileResponse {
        settings: settings.unwrap_or_else(|| TaxSettings::default_for_company(query.company_id)),
        exemptions: exemptions.unwrap_or_default(),
        defaults,
    }))
}

/* =========================
Upsert tax profile
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/tax-settings",
    request_body = UpdateTaxProfile,
    responses(
        (status = 200, description = "Tax profile saved"),
        (status = 400, description = "Negative rates or unordered bands")
    ),
    tag = "Tax Settings"
)]
pub async fn update_tax_settings(
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateTaxProfile>,
) -> actix_web::Result<impl Responder> {
    let s = &payload.settings;

    let rates = [
        s.rate1,
        s.rate2,
        s.rate3,
        s.rate4,
        s.pension_employer_rate,
        s.pension_employee_rate,
        s.maternity_employer_rate,
        s.maternity_employee_rate,
        s.rama_employer_rate,
        s.rama_employee_rate,
        s.cbhi_rate,
    ];
    if rates.iter().any(|r| !(0.0..=1.0).contains(r)) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "rates must be between 0 and 1"
        })));
    }
    if !(s.band1_limit <= s.band2_limit && s.band2_limit <= s.band3_limit) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "band limits must be non-decreasing"
        })));
    }

    let e = &payload.exemptions;
    sqlx::query(
        r#"
        INSERT INTO tax_settings
            (company_id, band1_limit, band2_limit, band3_limit,
             rate1, rate2, rate3, rate4,
             pension_employer_rate, pension_employee_rate,
             maternity_employer_rate, maternity_employee_rate,
             rama_employer_rate, rama_employee_rate, cbhi_rate,
             paye_active, pension_active, maternity_active, rama_active, cbhi_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            band1_limit = VALUES(band1_limit),
            band2_limit = VALUES(band2_limit),
            band3_limit = VALUES(band3_limit),
            rate1 = VALUES(rate1),
            rate2 = VALUES(rate2),
            rate3 = VALUES(rate3),
            rate4 = VALUES(rate4),
            pension_employer_rate = VALUES(pension_employer_rate),
            pension_employee_rate = VALUES(pension_employee_rate),
            maternity_employer_rate = VALUES(maternity_employer_rate),
            maternity_employee_rate = VALUES(maternity_employee_rate),
            rama_employer_rate = VALUES(rama_employer_rate),
            rama_employee_rate = VALUES(rama_employee_rate),
            cbhi_rate = VALUES(cbhi_rate),
            paye_active = VALUES(paye_active),
            pension_active = VALUES(pension_active),
            maternity_active = VALUES(maternity_active),
            rama_active = VALUES(rama_active),
            cbhi_active = VALUES(cbhi_active)
        "#,
    )
    .bind(s.company_id)
    .bind(s.band1_limit)
    .bind(s.band2_limit)
    .bind(s.band3_limit)
    .bind(s.rate1)
    .bind(s.rate2)
    .bind(s.rate3)
    .bind(s.rate4)
    .bind(s.pension_employer_rate)
    .bind(s.pension_employee_rate)
    .bind(s.maternity_employer_rate)
    .bind(s.maternity_employee_rate)
    .bind(s.rama_employer_rate)
    .bind(s.rama_employee_rate)
    .bind(s.cbhi_rate)
    .bind(e.paye_active)
    .bind(e.pension_active)
    .bind(e.maternity_active)
    .bind(e.rama_active)
    .bind(e.cbhi_active)
    .execute(pool.get_ref())
    .await
    .map_err(|err| {
        tracing::error!(error = %err, company_id = s.company_id, "Failed to save tax settings");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Tax profile saved" })))
}
