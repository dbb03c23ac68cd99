use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Fixed orders of the three built-in deduction categories. Custom
/// categories get order 4 and up.
pub const ADVANCE_ORDER: u32 = 1;
pub const CHARGE_ORDER: u32 = 2;
pub const LOAN_ORDER: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 3,
        "company_id": 1,
        "name": "Loan",
        "ord": 3,
        "deletable": false
    })
)]
pub struct DeductionTypeDefinition {
    #[schema(example = 3)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Loan")]
    pub name: String,

    /// Allocation order; lower orders are served first.
    #[schema(example = 3)]
    pub ord: u32,

    #[schema(example = false)]
    pub deletable: bool,
}

/// One discretionary deduction granted to a staff member. The balance is
/// derived, never stored, and only moves when an approved run is
/// reconciled.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 10,
        "staff_id": 1,
        "deduction_type_id": 3,
        "original_amount": 180000.0,
        "monthly_installment": 30000.0,
        "deducted_so_far": 60000.0,
        "start_date": "2026-01-01"
    })
)]
pub struct Deduction {
    #[schema(example = 10)]
    pub id: u64,

    #[schema(example = 1)]
    pub staff_id: u64,

    #[schema(example = 3)]
    pub deduction_type_id: u64,

    #[schema(example = 180000.0)]
    pub original_amount: f64,

    /// Maximum amount taken in any single run.
    #[schema(example = 30000.0)]
    pub monthly_installment: f64,

    #[schema(example = 60000.0)]
    pub deducted_so_far: f64,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
}

impl Deduction {
    /// Remaining balance, floored at zero.
    pub fn balance(&self) -> f64 {
        (self.original_amount - self.deducted_so_far).max(0.0)
    }

    /// Applies a reconciliation delta. Positive on approval, negative
    /// when a deleted run is reversed.
    pub fn apply_adjustment(&mut self, amount: f64) {
        self.deducted_so_far += amount;
    }
}

/// Reconciliation delta for one deduction, produced when a run is
/// approved and negated when an approved run is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeductionAdjustment {
    #[schema(example = 10)]
    pub deduction_id: u64,

    #[schema(example = 30000.0)]
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn loan() -> Deduction {
        Deduction {
            id: 10,
            staff_id: 1,
            deduction_type_id: 3,
            original_amount: 180_000.0,
            monthly_installment: 30_000.0,
            deducted_so_far: 60_000.0,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        }
    }

    #[test]
    fn balance_is_original_minus_deducted() {
        assert_eq!(loan().balance(), 120_000.0);
    }

    #[test]
    fn balance_floors_at_zero() {
        let mut d = loan();
        d.deducted_so_far = 200_000.0;
        assert_eq!(d.balance(), 0.0);
    }

    #[test]
    fn adjustment_moves_deducted_so_far() {
        let mut d = loan();
        d.apply_adjustment(30_000.0);
        assert_eq!(d.deducted_so_far, 90_000.0);
        assert_eq!(d.balance(), 90_000.0);
        d.apply_adjustment(-30_000.0);
        assert_eq!(d.balance(), 120_000.0);
    }
}
