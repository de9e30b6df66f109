//! Langevin saturation curve used as the anhysteretic target of the
//! Jiles-Atherton model.

/// Depth of the continued fraction used inside the unit interval.
const CONTINUED_FRACTION_TERMS: usize = 8;

/// Below this magnitude the derivative is replaced by its limit.
pub const DERIVATIVE_SMALL_ARG: f64 = 1.0e-5;

/// Langevin function L(x) = coth(x) - 1/x.
///
/// For |x| <= 1 the closed form cancels badly, so the odd continued fraction
/// x / (3 + x²/(5 + x²/(7 + ...))) is evaluated to a fixed depth instead.
pub fn langevin(x: f64) -> f64 {
    if x.abs() > 1.0 {
        return 1.0 / x.tanh() - 1.0 / x;
    }

    let x2 = x * x;
    let mut g = 0.0;
    for k in (2..=CONTINUED_FRACTION_TERMS).rev() {
        let bk = 2.0 * k as f64 + 1.0;
        g = x2 / (bk + g);
    }
    x / (3.0 + g)
}

/// Derivative L'(x) = 1/x² - 1/sinh²(x), with the exact limit 1/3 near zero.
pub fn langevin_derivative(x: f64) -> f64 {
    if x.abs() < DERIVATIVE_SMALL_ARG {
        return 1.0 / 3.0;
    }
    let s = x.sinh();
    1.0 / (x * x) - 1.0 / (s * s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_form(x: f64) -> f64 {
        1.0 / x.tanh() - 1.0 / x
    }

    #[test]
    fn langevin_is_odd_and_bounded() {
        for &x in &[1e-8, 0.01, 0.3, 0.999, 1.0, 1.5, 4.0, 25.0, 700.0] {
            let fx = langevin(x);
            assert!((langevin(-x) + fx).abs() <= 1e-15, "L is not odd at {x}");
            assert!(fx.abs() < 1.0, "|L({x})| = {fx} should be below one");
        }
        assert_eq!(langevin(0.0), 0.0);
    }

    #[test]
    fn continued_fraction_matches_closed_form_at_unit_boundary() {
        assert!((langevin(1.0) - closed_form(1.0)).abs() < 1e-12);
        assert!((langevin(-1.0) - closed_form(-1.0)).abs() < 1e-12);
    }

    #[test]
    fn langevin_is_continuous_across_branch_switch() {
        let eps = 1e-9;
        let below = langevin(1.0 - eps);
        let above = langevin(1.0 + eps);
        assert!((above - below).abs() < 1e-9);
    }

    #[test]
    fn continued_fraction_tracks_closed_form_inside_interval() {
        for &x in &[0.1, 0.25, 0.5, 0.75] {
            assert!((langevin(x) - closed_form(x)).abs() < 1e-10, "mismatch at {x}");
        }
    }

    #[test]
    fn derivative_is_one_third_at_origin() {
        assert_eq!(langevin_derivative(0.0), 1.0 / 3.0);
        assert_eq!(langevin_derivative(-5e-6), 1.0 / 3.0);
    }

    #[test]
    fn derivative_is_continuous_across_small_argument_switch() {
        let below = langevin_derivative(DERIVATIVE_SMALL_ARG * 0.999);
        let above = langevin_derivative(DERIVATIVE_SMALL_ARG * 1.001);
        // Cancellation in 1/x² - 1/sinh²(x) limits accuracy right above the switch.
        assert!((above - below).abs() < 1e-4);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let h = 1e-6;
        for &x in &[0.2, 0.9, 1.3, 3.0] {
            let fd = (langevin(x + h) - langevin(x - h)) / (2.0 * h);
            assert!((langevin_derivative(x) - fd).abs() < 1e-6, "mismatch at {x}");
        }
    }
}
