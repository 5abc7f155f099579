// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

/// Polynomial `atan2`, accurate to about 0.004 rad.
#[inline]
pub fn fast_atan2(y: f32, x: f32) -> f32 {
    #[inline]
    fn fast_atan(z: f32) -> f32 {
        let abs_z = z.abs();
        if abs_z <= 1.0 {
            z * (FRAC_PI_4 + 0.273 * (1.0 - abs_z))
        } else {
            let inv = 1.0 / z;
            let base = inv * (FRAC_PI_4 + 0.273 * (1.0 - inv.abs()));
            if z > 0.0 {
                FRAC_PI_2 - base
            } else {
                -FRAC_PI_2 - base
            }
        }
    }

    if x > 0.0 {
        fast_atan(y / x)
    } else if x < 0.0 {
        if y >= 0.0 {
            fast_atan(y / x) + PI
        } else {
            fast_atan(y / x) - PI
        }
    } else if y > 0.0 {
        FRAC_PI_2
    } else if y < 0.0 {
        -FRAC_PI_2
    } else {
        0.0
    }
}

/// Wrap an angle into `(-π, π]`.
#[inline]
pub fn wrap_phase(mut phase: f32) -> f32 {
    while phase > PI {
        phase -= TAU;
    }
    while phase <= -PI {
        phase += TAU;
    }
    phase
}

/// `+1.0` for non-negative input, `-1.0` otherwise.
#[inline]
pub fn hard_sign(x: f32) -> f32 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

pub fn db_to_power(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Power in dB, floored at -200 dB for silent input.
pub fn power_to_db(power: f64) -> f64 {
    if power <= 1e-20 {
        -200.0
    } else {
        10.0 * power.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx_eq(a: f32, b: f32, tol: f32, label: &str) {
        assert!(
            (a - b).abs() <= tol,
            "{}: expected {} ≈ {} (tol {})",
            label,
            a,
            b,
            tol
        );
    }

    #[test]
    fn fast_atan2_tracks_std_in_every_quadrant() {
        for k in 0..360 {
            let angle = (k as f32 - 179.5).to_radians();
            let (y, x) = (angle.sin() * 3.0, angle.cos() * 3.0);
            assert_approx_eq(fast_atan2(y, x), y.atan2(x), 0.005, &format!("{k} deg"));
        }
        assert_eq!(fast_atan2(1.0, 0.0), FRAC_PI_2);
        assert_eq!(fast_atan2(-1.0, 0.0), -FRAC_PI_2);
        assert_eq!(fast_atan2(0.0, 0.0), 0.0);
    }

    #[test]
    fn wrap_phase_folds_into_principal_range() {
        assert_approx_eq(wrap_phase(3.0 * PI), PI, 1e-5, "3π");
        assert_approx_eq(wrap_phase(-3.5 * PI), 0.5 * PI, 1e-5, "-3.5π");
        assert_approx_eq(wrap_phase(0.25), 0.25, 0.0, "inside");
    }

    #[test]
    fn db_conversions_are_inverse() {
        assert!((power_to_db(db_to_power(-37.0)) + 37.0).abs() < 1e-9);
        assert_eq!(power_to_db(0.0), -200.0);
    }
}
