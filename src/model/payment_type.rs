use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Fixed processing orders of the two mandatory payment types.
pub const BASIC_PAY_ORDER: u32 = 1;
pub const TRANSPORT_ALLOWANCE_ORDER: u32 = 2;

/// How a configured amount is interpreted: a literal gross earning, or a
/// target take-home value that must be grossed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentCategory {
    Gross,
    Net,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "company_id": 1,
        "name": "Basic Pay",
        "category": "gross",
        "ord": 1,
        "fixed_name": true,
        "deletable": false
    })
)]
pub struct PaymentTypeDefinition {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Basic Pay")]
    pub name: String,

    #[schema(example = "gross")]
    pub category: PaymentCategory,

    /// Processing order, unique per company. Basic pay is 1, transport
    /// allowance is 2, custom types start at 3.
    #[schema(example = 1)]
    pub ord: u32,

    #[schema(example = true)]
    pub fixed_name: bool,

    #[schema(example = false)]
    pub deletable: bool,
}

impl PaymentTypeDefinition {
    pub fn is_basic_pay(&self) -> bool {
        self.ord == BASIC_PAY_ORDER
    }

    pub fn is_transport_allowance(&self) -> bool {
        self.ord == TRANSPORT_ALLOWANCE_ORDER
    }
}

/// Storage shape; `category` is kept as a string column.
#[derive(Debug, FromRow)]
pub struct PaymentTypeRow {
    pub id: u64,
    pub company_id: u64,
    pub name: String,
    pub category: String,
    pub ord: u32,
    pub fixed_name: bool,
    pub deletable: bool,
}

impl PaymentTypeRow {
    pub fn into_definition(self) -> Result<PaymentTypeDefinition, strum::ParseError> {
        Ok(PaymentTypeDefinition {
            id: self.id,
            company_id: self.company_id,
            name: self.name,
            category: self.category.parse()?,
            ord: self.ord,
            fixed_name: self.fixed_name,
            deletable: self.deletable,
        })
    }
}

/// One configured amount for one staff member and one payment type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StaffPaymentConfigRow {
    #[schema(example = 1)]
    pub staff_id: u64,

    #[schema(example = 1)]
    pub payment_type_id: u64,

    #[schema(example = 250000.0)]
    pub amount: f64,

    #[schema(example = true)]
    pub active: bool,
}
