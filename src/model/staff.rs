use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "company_id": 1,
        "name": "Jean Bosco Mugisha",
        "active": true
    })
)]
pub struct Staff {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Jean Bosco Mugisha")]
    pub name: String,

    /// Inactive staff are excluded from payroll processing.
    #[schema(example = true)]
    pub active: bool,
}
