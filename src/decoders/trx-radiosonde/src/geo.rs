// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! WGS-84 conversions for the GPS position block.

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundVelocity {
    pub speed_mps: f64,
    pub vertical_rate_mps: f64,
    /// Course over ground, degrees clockwise from true north.
    pub heading_deg: f64,
}

fn eccentricity_sq() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

/// Earth-centred coordinates in metres to latitude, longitude and height
/// above the ellipsoid (Bowring).
pub fn ecef_to_geodetic(x: f64, y: f64, z: f64) -> Geodetic {
    let a = WGS84_A;
    let b = a * (1.0 - WGS84_F);
    let e2 = eccentricity_sq();
    let ep2 = (a * a - b * b) / (b * b);

    let p = x.hypot(y);
    let theta = (a * z).atan2(b * p);
    let (st, ct) = theta.sin_cos();
    let lat = (z + ep2 * b * st.powi(3)).atan2(p - e2 * a * ct.powi(3));
    let lon = y.atan2(x);

    let (sl, cl) = lat.sin_cos();
    let n = a / (1.0 - e2 * sl * sl).sqrt();
    let altitude_m = if cl.abs() > 1e-9 {
        p / cl - n
    } else {
        z.abs() - b
    };

    Geodetic {
        latitude_deg: lat.to_degrees(),
        longitude_deg: lon.to_degrees(),
        altitude_m,
    }
}

pub fn geodetic_to_ecef(position: Geodetic) -> (f64, f64, f64) {
    let e2 = eccentricity_sq();
    let (sl, cl) = position.latitude_deg.to_radians().sin_cos();
    let (so, co) = position.longitude_deg.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - e2 * sl * sl).sqrt();
    let h = position.altitude_m;
    (
        (n + h) * cl * co,
        (n + h) * cl * so,
        (n * (1.0 - e2) + h) * sl,
    )
}

/// Rotate an earth-centred velocity into the local east/north/up frame.
pub fn ecef_velocity_to_ground(
    latitude_deg: f64,
    longitude_deg: f64,
    vx: f64,
    vy: f64,
    vz: f64,
) -> GroundVelocity {
    let (sl, cl) = latitude_deg.to_radians().sin_cos();
    let (so, co) = longitude_deg.to_radians().sin_cos();

    let east = -so * vx + co * vy;
    let north = -sl * co * vx - sl * so * vy + cl * vz;
    let up = cl * co * vx + cl * so * vy + sl * vz;

    GroundVelocity {
        speed_mps: east.hypot(north),
        vertical_rate_mps: up,
        heading_deg: east.atan2(north).to_degrees().rem_euclid(360.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx_eq(a: f64, b: f64, tol: f64, label: &str) {
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
    fn equator_prime_meridian() {
        let g = ecef_to_geodetic(WGS84_A, 0.0, 0.0);
        assert_approx_eq(g.latitude_deg, 0.0, 1e-9, "lat");
        assert_approx_eq(g.longitude_deg, 0.0, 1e-9, "lon");
        assert_approx_eq(g.altitude_m, 0.0, 1e-6, "alt");
    }

    #[test]
    fn geodetic_survives_conversion_at_balloon_altitudes() {
        for &(lat, lon, alt) in &[
            (52.2297, 21.0122, 120.0),
            (-33.86, 151.21, 18_500.0),
            (64.1, -21.9, 33_000.0),
        ] {
            let (x, y, z) = geodetic_to_ecef(Geodetic {
                latitude_deg: lat,
                longitude_deg: lon,
                altitude_m: alt,
            });
            let g = ecef_to_geodetic(x, y, z);
            assert_approx_eq(g.latitude_deg, lat, 1e-7, "lat");
            assert_approx_eq(g.longitude_deg, lon, 1e-9, "lon");
            assert_approx_eq(g.altitude_m, alt, 0.01, "alt");
        }
    }

    #[test]
    fn velocity_on_the_equator() {
        // At 0/0 east is +y, north is +z and up is +x.
        let v = ecef_velocity_to_ground(0.0, 0.0, 4.0, 3.0, 0.0);
        assert_approx_eq(v.speed_mps, 3.0, 1e-9, "speed");
        assert_approx_eq(v.vertical_rate_mps, 4.0, 1e-9, "climb");
        assert_approx_eq(v.heading_deg, 90.0, 1e-9, "heading");

        let v = ecef_velocity_to_ground(0.0, 0.0, 0.0, -5.0, -5.0);
        assert_approx_eq(v.speed_mps, 50f64.sqrt(), 1e-9, "speed");
        assert_approx_eq(v.heading_deg, 225.0, 1e-9, "heading");
    }
}
