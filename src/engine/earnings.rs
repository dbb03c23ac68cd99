use std::collections::HashMap;

use crate::engine::gross_up::{self, GrossAccumulator};
use crate::engine::tax;
use crate::model::payment_type::{PaymentCategory, PaymentTypeDefinition};
use crate::model::tax_settings::{EffectiveRates, TaxSettings};

/// A gross-up that hit the iteration budget; carried up as a run
/// warning rather than failing the employee.
#[derive(Debug, Clone, Copy)]
pub struct NonConvergence {
    pub payment_type_id: u64,
    pub residual: f64,
}

/// Employer/employee statutory split, evaluated once at the final
/// accumulated gross figures.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatutoryBreakdown {
    pub pension_employer: f64,
    pub pension_employee: f64,
    pub maternity_employer: f64,
    pub maternity_employee: f64,
    pub rama_employer: f64,
    pub rama_employee: f64,
    pub rssb_employer: f64,
    pub rssb_employee: f64,
    pub paye: f64,
    pub net_before_cbhi: f64,
    pub cbhi: f64,
    pub net_after_cbhi: f64,
}

/// Earnings side of one employee's record: computed gross per payment
/// type, final accumulated state, and the statutory split.
#[derive(Debug, Clone)]
pub struct EmployeeEarnings {
    pub payment_amounts: HashMap<u64, f64>,
    pub gross: GrossAccumulator,
    pub statutory: StatutoryBreakdown,
    pub non_converged: Vec<NonConvergence>,
}

/// Walks the payment types in ascending order. `Gross` amounts pass
/// through; `Net` amounts are targets handed to the gross-up solver
/// together with the state accumulated so far. `payment_types` must
/// already be sorted by `ord`; amounts absent from `amounts` read as 0.
pub fn compute(
    amounts: &HashMap<u64, f64>,
    payment_types: &[PaymentTypeDefinition],
    settings: &TaxSettings,
    rates: &EffectiveRates,
) -> EmployeeEarnings {
    let mut payment_amounts = HashMap::new();
    let mut acc = GrossAccumulator::default();
    let mut non_converged = Vec::new();

    for definition in payment_types {
        let configured = amounts.get(&definition.id).copied().unwrap_or(0.0);
        let computed = match definition.category {
            PaymentCategory::Gross => configured,
            PaymentCategory::Net => {
                let result = gross_up::solve(configured, acc, settings, rates);
                if !result.converged {
                    non_converged.push(NonConvergence {
                        payment_type_id: definition.id,
                        residual: result.residual,
                    });
                }
                result.additional_gross
            }
        };
        payment_amounts.insert(definition.id, computed);
        acc = acc.add(
            computed,
            definition.is_transport_allowance(),
            definition.is_basic_pay(),
        );
    }

    EmployeeEarnings {
        payment_amounts,
        statutory: statutory_breakdown(acc, settings, rates),
        gross: acc,
        non_converged,
    }
}

/// Full employer/employee split at the final totals. The employee side
/// uses the same formulas as the solver's net helper.
pub fn statutory_breakdown(
    acc: GrossAccumulator,
    settings: &TaxSettings,
    rates: &EffectiveRates,
) -> StatutoryBreakdown {
    let maternity_base = (acc.total - acc.transport).max(0.0);

    let pension_employer = acc.total * rates.pension_employer;
    let pension_employee = acc.total * rates.pension_employee;
    let maternity_employer = maternity_base * rates.maternity_employer;
    let maternity_employee = maternity_base * rates.maternity_employee;
    let rama_employer = acc.basic * rates.rama_employer;
    let rama_employee = acc.basic * rates.rama_employee;

    let rssb_employer = pension_employer + maternity_employer + rama_employer;
    let rssb_employee = pension_employee + maternity_employee + rama_employee;

    let paye = tax::paye(acc.total, settings, rates.paye_active);
    let net_before_cbhi = acc.total - (rssb_employee + paye);
    let cbhi = net_before_cbhi.max(0.0) * rates.cbhi;

    StatutoryBreakdown {
        pension_employer,
        pension_employee,
        maternity_employer,
        maternity_employee,
        rama_employer,
        rama_employee,
        rssb_employer,
        rssb_employee,
        paye,
        net_before_cbhi,
        cbhi,
        net_after_cbhi: net_before_cbhi - cbhi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tax_settings::TaxExemptions;

    fn definition(id: u64, ord: u32, category: PaymentCategory) -> PaymentTypeDefinition {
        PaymentTypeDefinition {
            id,
            company_id: 1,
            name: format!("type-{}", id),
            category,
            ord,
            fixed_name: ord <= 2,
            deletable: ord > 2,
        }
    }

    fn setup() -> (TaxSettings, EffectiveRates) {
        let settings = TaxSettings::default_for_company(1);
        let rates = EffectiveRates::new(&settings, &TaxExemptions::default());
        (settings, rates)
    }

    #[test]
    fn gross_amounts_pass_through_and_feed_the_right_bases() {
        let (settings, rates) = setup();
        let types = vec![
            definition(1, 1, PaymentCategory::Gross), // basic pay
            definition(2, 2, PaymentCategory::Gross), // transport
            definition(3, 3, PaymentCategory::Gross),
        ];
        let amounts =
            HashMap::from([(1, 200_000.0), (2, 30_000.0), (3, 20_000.0)]);

        let earnings = compute(&amounts, &types, &settings, &rates);
        assert_eq!(earnings.gross.total, 250_000.0);
        assert_eq!(earnings.gross.transport, 30_000.0);
        assert_eq!(earnings.gross.basic, 200_000.0);
        assert_eq!(earnings.payment_amounts[&3], 20_000.0);

        // RAMA on basic only, maternity excluding transport.
        let s = earnings.statutory;
        assert!((s.rama_employee - 200_000.0 * 0.075).abs() < 1e-9);
        assert!((s.maternity_employee - 220_000.0 * 0.003).abs() < 1e-9);
        assert!((s.pension_employee - 250_000.0 * 0.03).abs() < 1e-9);
        assert!(
            (s.rssb_employee - (s.pension_employee + s.maternity_employee + s.rama_employee)).abs()
                < 1e-9
        );
    }

    #[test]
    fn missing_amounts_read_as_zero() {
        let (settings, rates) = setup();
        let types = vec![
            definition(1, 1, PaymentCategory::Gross),
            definition(2, 2, PaymentCategory::Gross),
        ];
        let amounts = HashMap::from([(1, 100_000.0)]);

        let earnings = compute(&amounts, &types, &settings, &rates);
        assert_eq!(earnings.payment_amounts[&2], 0.0);
        assert_eq!(earnings.gross.total, 100_000.0);
    }

    #[test]
    fn net_component_raises_take_home_by_its_target() {
        let (settings, rates) = setup();
        let types = vec![
            definition(1, 1, PaymentCategory::Gross),
            definition(2, 2, PaymentCategory::Gross),
            definition(7, 3, PaymentCategory::Net),
        ];
        let base_amounts = HashMap::from([(1, 200_000.0), (2, 30_000.0)]);
        let with_bonus = {
            let mut m = base_amounts.clone();
            m.insert(7, 40_000.0);
            m
        };

        let without = compute(&base_amounts, &types, &settings, &rates);
        let with = compute(&with_bonus, &types, &settings, &rates);

        assert!(with.non_converged.is_empty());
        assert!(with.payment_amounts[&7] > 40_000.0);
        let increment = with.statutory.net_after_cbhi - without.statutory.net_after_cbhi;
        assert!(
            (increment - 40_000.0).abs() <= crate::engine::gross_up::TOLERANCE,
            "net increment was {}",
            increment
        );
    }

    #[test]
    fn split_matches_the_solver_net_helper() {
        let (settings, rates) = setup();
        let acc = GrossAccumulator {
            total: 300_000.0,
            transport: 40_000.0,
            basic: 220_000.0,
        };
        let breakdown = statutory_breakdown(acc, &settings, &rates);
        let helper_net = gross_up::net_for_gross(acc, &settings, &rates);
        assert!((breakdown.net_after_cbhi - helper_net).abs() < 1e-9);
    }

    #[test]
    fn exemption_zeroing_leaves_other_amounts_unchanged() {
        let settings = TaxSettings::default_for_company(1);
        let all_on = EffectiveRates::new(&settings, &TaxExemptions::default());
        let no_pension = EffectiveRates::new(
            &settings,
            &TaxExemptions {
                pension_active: false,
                ..TaxExemptions::default()
            },
        );
        let types = vec![
            definition(1, 1, PaymentCategory::Gross),
            definition(2, 2, PaymentCategory::Gross),
        ];
        let amounts = HashMap::from([(1, 250_000.0), (2, 50_000.0)]);

        let baseline = compute(&amounts, &types, &settings, &all_on);
        let exempted = compute(&amounts, &types, &settings, &no_pension);

        assert_eq!(exempted.statutory.pension_employer, 0.0);
        assert_eq!(exempted.statutory.pension_employee, 0.0);
        assert_eq!(
            exempted.statutory.maternity_employee,
            baseline.statutory.maternity_employee
        );
        assert_eq!(exempted.statutory.rama_employee, baseline.statutory.rama_employee);
        assert_eq!(exempted.statutory.paye, baseline.statutory.paye);
        assert!(exempted.statutory.net_after_cbhi > baseline.statutory.net_after_cbhi);
    }
}
