use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Statutory rate configuration for one company. Falls back to
/// [`TaxSettings::default_for_company`] when nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[schema(
    example = json!({
        "company_id": 1,
        "band1_limit": 60000.0,
        "band2_limit": 100000.0,
        "band3_limit": 200000.0,
        "rate1": 0.0,
        "rate2": 0.1,
        "rate3": 0.2,
        "rate4": 0.3,
        "pension_employer_rate": 0.03,
        "pension_employee_rate": 0.03,
        "maternity_employer_rate": 0.003,
        "maternity_employee_rate": 0.003,
        "rama_employer_rate": 0.075,
        "rama_employee_rate": 0.075,
        "cbhi_rate": 0.005
    })
)]
pub struct TaxSettings {
    #[schema(example = 1)]
    pub company_id: u64,

    // PAYE bands: marginal rates up to each limit, rate4 above band3.
    #[schema(example = 60000.0)]
    pub band1_limit: f64,
    #[schema(example = 100000.0)]
    pub band2_limit: f64,
    #[schema(example = 200000.0)]
    pub band3_limit: f64,
    #[schema(example = 0.0)]
    pub rate1: f64,
    #[schema(example = 0.1)]
    pub rate2: f64,
    #[schema(example = 0.2)]
    pub rate3: f64,
    #[schema(example = 0.3)]
    pub rate4: f64,

    #[schema(example = 0.03)]
    pub pension_employer_rate: f64,
    #[schema(example = 0.03)]
    pub pension_employee_rate: f64,

    /// Maternity base excludes transport allowance.
    #[schema(example = 0.003)]
    pub maternity_employer_rate: f64,
    #[schema(example = 0.003)]
    pub maternity_employee_rate: f64,

    /// RAMA (medical scheme) is computed on basic pay only.
    #[schema(example = 0.075)]
    pub rama_employer_rate: f64,
    #[schema(example = 0.075)]
    pub rama_employee_rate: f64,

    /// CBHI applies to net pay after RSSB and PAYE.
    #[schema(example = 0.005)]
    pub cbhi_rate: f64,
}

impl TaxSettings {
    /// Statutory defaults used when a company has no persisted settings.
    /// Pure constructor so companies and tests never share state.
    pub fn default_for_company(company_id: u64) -> Self {
        Self {
            company_id,
            band1_limit: 60_000.0,
            band2_limit: 100_000.0,
            band3_limit: 200_000.0,
            rate1: 0.0,
            rate2: 0.1,
            rate3: 0.2,
            rate4: 0.3,
            pension_employer_rate: 0.03,
            pension_employee_rate: 0.03,
            maternity_employer_rate: 0.003,
            maternity_employee_rate: 0.003,
            rama_employer_rate: 0.075,
            rama_employee_rate: 0.075,
            cbhi_rate: 0.005,
        }
    }
}

/// Per-company toggles. A false flag removes the corresponding
/// contribution entirely for every employee in a run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TaxExemptions {
    #[schema(example = true)]
    pub paye_active: bool,
    #[schema(example = true)]
    pub pension_active: bool,
    #[schema(example = true)]
    pub maternity_active: bool,
    #[schema(example = true)]
    pub rama_active: bool,
    #[schema(example = true)]
    pub cbhi_active: bool,
}

impl Default for TaxExemptions {
    fn default() -> Self {
        Self {
            paye_active: true,
            pension_active: true,
            maternity_active: true,
            rama_active: true,
            cbhi_active: true,
        }
    }
}

/// Contribution rates with inactive exemptions already zeroed out.
/// Built once per run so every calculation sees the same snapshot.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveRates {
    pub paye_active: bool,
    pub pension_employer: f64,
    pub pension_employee: f64,
    pub maternity_employer: f64,
    pub maternity_employee: f64,
    pub rama_employer: f64,
    pub rama_employee: f64,
    pub cbhi: f64,
}

impl EffectiveRates {
    pub fn new(settings: &TaxSettings, exemptions: &TaxExemptions) -> Self {
        let gate = |active: bool, rate: f64| if active { rate } else { 0.0 };
        Self {
            paye_active: exemptions.paye_active,
            pension_employer: gate(exemptions.pension_active, settings.pension_employer_rate),
            pension_employee: gate(exemptions.pension_active, settings.pension_employee_rate),
            maternity_employer: gate(exemptions.maternity_active, settings.maternity_employer_rate),
            maternity_employee: gate(exemptions.maternity_active, settings.maternity_employee_rate),
            rama_employer: gate(exemptions.rama_active, settings.rama_employer_rate),
            rama_employee: gate(exemptions.rama_active, settings.rama_employee_rate),
            cbhi: gate(exemptions.cbhi_active, settings.cbhi_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constructor_is_pure() {
        let a = TaxSettings::default_for_company(1);
        let b = TaxSettings::default_for_company(2);
        assert_eq!(a.band1_limit, b.band1_limit);
        assert_eq!(a.company_id, 1);
        assert_eq!(b.company_id, 2);
    }

    #[test]
    fn exemption_zeroes_only_its_own_rates() {
        let settings = TaxSettings::default_for_company(1);
        let exemptions = TaxExemptions {
            rama_active: false,
            ..TaxExemptions::default()
        };
        let rates = EffectiveRates::new(&settings, &exemptions);
        assert_eq!(rates.rama_employer, 0.0);
        assert_eq!(rates.rama_employee, 0.0);
        assert_eq!(rates.pension_employee, settings.pension_employee_rate);
        assert_eq!(rates.cbhi, settings.cbhi_rate);
        assert!(rates.paye_active);
    }
}
