use crate::model::tax_settings::TaxSettings;

/// Four-band marginal PAYE on a gross salary. Returns 0 when the PAYE
/// flag is off, and never goes negative.
///
/// Must be called with one consistent [`TaxSettings`] snapshot for the
/// whole run.
pub fn paye(gross: f64, settings: &TaxSettings, paye_active: bool) -> f64 {
    if !paye_active || gross <= 0.0 {
        return 0.0;
    }

    let tax = if gross <= settings.band1_limit {
        gross * settings.rate1
    } else {
        let mut tax = settings.band1_limit * settings.rate1;
        let band2_top = gross.min(settings.band2_limit);
        tax += (band2_top - settings.band1_limit) * settings.rate2;
        if gross > settings.band2_limit {
            let band3_top = gross.min(settings.band3_limit);
            tax += (band3_top - settings.band2_limit) * settings.rate3;
        }
        if gross > settings.band3_limit {
            tax += (gross - settings.band3_limit) * settings.rate4;
        }
        tax
    };

    tax.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TaxSettings {
        TaxSettings::default_for_company(1)
    }

    #[test]
    fn zero_gross_is_zero_tax() {
        assert_eq!(paye(0.0, &settings(), true), 0.0);
    }

    #[test]
    fn first_band_uses_rate1_only() {
        // Default rate1 is 0%.
        assert_eq!(paye(50_000.0, &settings(), true), 0.0);
        assert_eq!(paye(60_000.0, &settings(), true), 0.0);
    }

    #[test]
    fn marginal_bands_accumulate() {
        let s = settings();
        // 80k: 60k at 0% + 20k at 10%.
        assert!((paye(80_000.0, &s, true) - 2_000.0).abs() < 1e-9);
        // 150k: 60k at 0% + 40k at 10% + 50k at 20%.
        assert!((paye(150_000.0, &s, true) - 14_000.0).abs() < 1e-9);
        // 300k: 60k at 0% + 40k at 10% + 100k at 20% + 100k at 30%.
        assert!((paye(300_000.0, &s, true) - 54_000.0).abs() < 1e-9);
    }

    #[test]
    fn inactive_flag_zeroes_everything() {
        assert_eq!(paye(1_000_000.0, &settings(), false), 0.0);
    }

    #[test]
    fn paye_is_monotone_in_gross() {
        let s = settings();
        let mut previous = 0.0;
        for step in 0..500 {
            let gross = step as f64 * 1_000.0;
            let tax = paye(gross, &s, true);
            assert!(
                tax + 1e-9 >= previous,
                "PAYE decreased between {} and {}",
                gross - 1_000.0,
                gross
            );
            previous = tax;
        }
    }
}
