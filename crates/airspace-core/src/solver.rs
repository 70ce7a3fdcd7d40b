//! Bounded one-dimensional minimization.
//!
//! Golden-section search with parabolic interpolation (Brent's method without
//! derivatives), derived from the classic Forsythe/Malcolm/Moler FMINBR
//! routine. The iteration count is capped so a single solve has a
//! deterministic worst-case cost; intercept searches run inside the per-tick
//! calculation pass and must never spin.

const MAX_ITERATIONS: usize = 64;

/// Find the minimum of `f` over `[xmin, xmax]`.
///
/// Returns `(x, f(x))` for the best point found. The result is a local
/// minimum; callers arrange for their cost functions to be unimodal enough,
/// and treat the returned cost as a candidate to be validated, not a proof.
pub fn minimize<F: Fn(f64) -> f64>(f: F, xmin: f64, xmax: f64, tolerance: f64) -> (f64, f64) {
    debug_assert!(tolerance > 0.0);

    if !(xmax > xmin) {
        return (xmin, f(xmin));
    }

    // Gold section ratio, (3 - sqrt(5)) / 2
    let r = (3.0 - 5.0_f64.sqrt()) / 2.0;
    let sqrt_eps = f64::EPSILON.sqrt();

    let mut a = xmin;
    let mut b = xmax;

    let mut x = a + r * (b - a);
    let mut w = x;
    let mut v = x;
    let mut fx = f(x);
    let mut fw = fx;
    let mut fv = fx;

    for _ in 0..MAX_ITERATIONS {
        let range = b - a;
        let middle = (a + b) * 0.5;
        let tol_act = sqrt_eps * x.abs() + tolerance / 3.0;

        if (x - middle).abs() + range * 0.5 <= 2.0 * tol_act {
            break;
        }

        // Gold section step by default
        let mut new_step = r * if x < middle { b - x } else { a - x };

        // Try parabolic interpolation when x and w are distinct
        if (x - w).abs() >= tol_act {
            let t = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * t;
            q = 2.0 * (q - t);

            if q > 0.0 {
                p = -p;
            } else {
                q = -q;
            }

            // Accept the interpolation step if it falls inside [a,b],
            // not too close to the bounds, and isn't too large
            if p.abs() < (new_step * q).abs()
                && p > q * (a - x + 2.0 * tol_act)
                && p < q * (b - x - 2.0 * tol_act)
            {
                new_step = p / q;
            }
        }

        if new_step.abs() < tol_act {
            new_step = if new_step > 0.0 { tol_act } else { -tol_act };
        }

        let t = x + new_step;
        let ft = f(t);

        if ft <= fx {
            if t < x {
                b = x;
            } else {
                a = x;
            }
            v = w;
            w = x;
            x = t;
            fv = fw;
            fw = fx;
            fx = ft;
        } else {
            if t < x {
                a = t;
            } else {
                b = t;
            }
            if ft <= fw || w == x {
                v = w;
                w = t;
                fv = fw;
                fw = ft;
            } else if ft <= fv || v == x || v == w {
                v = t;
                fv = ft;
            }
        }
    }

    (x, fx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_minimum() {
        let (x, fx) = minimize(|x| (x - 3.0) * (x - 3.0) + 1.0, 0.0, 10.0, 1e-6);
        assert!((x - 3.0).abs() < 1e-3);
        assert!((fx - 1.0).abs() < 1e-6);
    }

    #[test]
    fn monotonic_function_picks_boundary() {
        let (x, _) = minimize(|x| x, 2.0, 5.0, 1e-6);
        assert!(x < 2.01);

        let (x, _) = minimize(|x| -x, 2.0, 5.0, 1e-6);
        assert!(x > 4.99);
    }

    #[test]
    fn degenerate_interval_returns_bound() {
        let (x, fx) = minimize(|x| x * x, 4.0, 4.0, 1e-6);
        assert_eq!(x, 4.0);
        assert_eq!(fx, 16.0);
    }

    #[test]
    fn rough_function_still_terminates() {
        // Not unimodal; the cap guarantees termination and a bounded result.
        let (x, _) = minimize(|x: f64| (x * 50.0).sin() + 0.01 * x, 0.0, 100.0, 1e-9);
        assert!((0.0..=100.0).contains(&x));
    }
}
