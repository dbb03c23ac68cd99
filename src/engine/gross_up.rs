use crate::engine::tax;
use crate::model::tax_settings::{EffectiveRates, TaxSettings};

pub const MAX_ITERATIONS: usize = 50;
/// Convergence tolerance in currency units.
pub const TOLERANCE: f64 = 0.5;

/// Running gross state while an employee's payment types are walked in
/// order. Immutable; each component produces the next value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GrossAccumulator {
    /// Total gross over all components so far.
    pub total: f64,
    /// Transport-allowance portion only (maternity base excludes it).
    pub transport: f64,
    /// Basic-pay portion only (RAMA base).
    pub basic: f64,
}

impl GrossAccumulator {
    pub fn add(self, amount: f64, is_transport: bool, is_basic: bool) -> Self {
        Self {
            total: self.total + amount,
            transport: self.transport + if is_transport { amount } else { 0.0 },
            basic: self.basic + if is_basic { amount } else { 0.0 },
        }
    }
}

/// Employee-side net pay for a trial gross state: pension on total,
/// maternity on total minus transport, RAMA on basic pay, PAYE on
/// total, CBHI on what is left. Rates arrive pre-zeroed for inactive
/// exemptions.
pub fn net_for_gross(acc: GrossAccumulator, settings: &TaxSettings, rates: &EffectiveRates) -> f64 {
    let pension = acc.total * rates.pension_employee;
    let maternity = (acc.total - acc.transport).max(0.0) * rates.maternity_employee;
    let rama = acc.basic * rates.rama_employee;
    let rssb = pension + maternity + rama;
    let paye = tax::paye(acc.total, settings, rates.paye_active);
    let net_before_cbhi = acc.total - (rssb + paye);
    let cbhi = net_before_cbhi.max(0.0) * rates.cbhi;
    net_before_cbhi - cbhi
}

#[derive(Debug, Clone, Copy)]
pub struct SolveResult {
    /// Additional gross to add for this component.
    pub additional_gross: f64,
    pub converged: bool,
    /// Absolute distance between the achieved net increment and the
    /// target, for the best guess returned.
    pub residual: f64,
}

/// Finds the additional gross that raises net pay by `target` on top of
/// the already-accumulated state, by bisecting over `[0, 3 × target]`.
///
/// The baseline net is fixed once from `base`; only the total gross
/// moves during the search. Non-convergence within the iteration budget
/// returns the last guess with `converged == false` so the caller can
/// record a warning instead of failing the run.
pub fn solve(
    target: f64,
    base: GrossAccumulator,
    settings: &TaxSettings,
    rates: &EffectiveRates,
) -> SolveResult {
    if target <= 0.0 {
        return SolveResult {
            additional_gross: 0.0,
            converged: true,
            residual: 0.0,
        };
    }

    let baseline = net_for_gross(base, settings, rates);
    let mut lo = 0.0_f64;
    let mut hi = target * 3.0;
    let mut guess = hi;
    let mut residual = f64::INFINITY;

    for _ in 0..MAX_ITERATIONS {
        guess = (lo + hi) / 2.0;
        let trial = GrossAccumulator {
            total: base.total + guess,
            ..base
        };
        let increment = net_for_gross(trial, settings, rates) - baseline;
        let diff = increment - target;
        residual = diff.abs();
        if residual <= TOLERANCE {
            return SolveResult {
                additional_gross: guess,
                converged: true,
                residual,
            };
        }
        if diff > 0.0 {
            hi = guess;
        } else {
            lo = guess;
        }
    }

    SolveResult {
        additional_gross: guess,
        converged: false,
        residual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tax_settings::{TaxExemptions, TaxSettings};

    fn setup() -> (TaxSettings, EffectiveRates) {
        let settings = TaxSettings::default_for_company(1);
        let rates = EffectiveRates::new(&settings, &TaxExemptions::default());
        (settings, rates)
    }

    #[test]
    fn zero_or_negative_target_returns_zero() {
        let (settings, rates) = setup();
        for target in [0.0, -1.0, -50_000.0] {
            let result = solve(target, GrossAccumulator::default(), &settings, &rates);
            assert_eq!(result.additional_gross, 0.0);
            assert!(result.converged);
        }
    }

    #[test]
    fn solved_gross_reproduces_target_net_increment() {
        let (settings, rates) = setup();
        let bases = [
            GrossAccumulator::default(),
            GrossAccumulator {
                total: 250_000.0,
                transport: 50_000.0,
                basic: 200_000.0,
            },
        ];
        for base in bases {
            for target in [10.0, 5_000.0, 50_000.0, 123_456.78] {
                let result = solve(target, base, &settings, &rates);
                assert!(result.converged, "target {} did not converge", target);
                let baseline = net_for_gross(base, &settings, &rates);
                let achieved = net_for_gross(
                    GrossAccumulator {
                        total: base.total + result.additional_gross,
                        ..base
                    },
                    &settings,
                    &rates,
                ) - baseline;
                assert!(
                    (achieved - target).abs() <= TOLERANCE,
                    "target {} achieved {}",
                    target,
                    achieved
                );
            }
        }
    }

    #[test]
    fn grossed_up_amount_exceeds_target_under_taxation() {
        let (settings, rates) = setup();
        let base = GrossAccumulator {
            total: 300_000.0,
            transport: 0.0,
            basic: 300_000.0,
        };
        // At 300k the marginal PAYE rate is 30%, so the gross addition
        // must be well above the requested net.
        let result = solve(20_000.0, base, &settings, &rates);
        assert!(result.converged);
        assert!(result.additional_gross > 20_000.0);
    }

    #[test]
    fn pathological_rates_report_non_convergence() {
        // 100% PAYE from the first franc: net never moves, so no
        // bracket point can reach the target.
        let settings = TaxSettings {
            band1_limit: 0.0,
            band2_limit: 0.0,
            band3_limit: 0.0,
            rate1: 1.0,
            rate2: 1.0,
            rate3: 1.0,
            rate4: 1.0,
            pension_employer_rate: 0.0,
            pension_employee_rate: 0.0,
            maternity_employer_rate: 0.0,
            maternity_employee_rate: 0.0,
            rama_employer_rate: 0.0,
            rama_employee_rate: 0.0,
            cbhi_rate: 0.0,
            ..TaxSettings::default_for_company(1)
        };
        let rates = EffectiveRates::new(&settings, &TaxExemptions::default());
        let result = solve(10_000.0, GrossAccumulator::default(), &settings, &rates);
        assert!(!result.converged);
        assert!((result.residual - 10_000.0).abs() < 1.0);
    }

    #[test]
    fn net_for_gross_handles_transport_heavy_state() {
        let (settings, rates) = setup();
        // Transport above total gross must not produce a negative
        // maternity base.
        let acc = GrossAccumulator {
            total: 10_000.0,
            transport: 15_000.0,
            basic: 0.0,
        };
        let net = net_for_gross(acc, &settings, &rates);
        assert!(net > 0.0);
        assert!(net < 10_000.0);
    }
}
