/// ============================================================
///  Clear-sky illuminance
///
///  Theoretical horizontal illuminance under a cloudless sky as a
///  function of sun elevation only. Below civil twilight (−6°) the
///  model is defined as zero.
///
///   normal – closed-form air-mass approximation (~125 klx at zenith)
///   simple – 1000 · sin(elevation), useful as a relative scale
/// ============================================================

use crate::models::illuminance::Mode;

// ─── Model constants ─────────────────────────────────────────
const CIVIL_TWILIGHT_DEG: f64 = -6.0;
const ATMOSPHERE_RATIO: f64 = 753.66156; // earth radius / scale height
const LUX_SCALE: f64 = 133775.0;
const DEG_PER_RAD: f64 = 57.29577951;

pub fn clear_sky_lux(elevation_deg: f64, mode: Mode) -> f64 {
    if elevation_deg <= CIVIL_TWILIGHT_DEG {
        return 0.0;
    }
    match mode {
        Mode::Simple => 1000.0 * elevation_deg.max(0.0).to_radians().sin().max(0.0),
        Mode::Normal => normal_model(elevation_deg),
    }
}

fn normal_model(elevation_deg: f64) -> f64 {
    let elev = elevation_deg.to_radians();
    let u = elev.sin();
    let x = ATMOSPHERE_RATIO;

    // Relative optical path through a spherical shell atmosphere
    let s = (x * elev.cos() / (x + 1.0)).asin();
    let m0 = x * (s.cos() - u) + s.cos();

    let m = (-0.2 * m0).exp() * u
        + 0.0289 * (-0.042 * m0).exp() * (1.0 + (elevation_deg + 90.0) * u / DEG_PER_RAD);
    (LUX_SCALE * m).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_below_civil_twilight() {
        for e in [-90.0, -45.0, -10.0, -6.0] {
            assert_eq!(clear_sky_lux(e, Mode::Normal), 0.0, "normal at {e}");
            assert_eq!(clear_sky_lux(e, Mode::Simple), 0.0, "simple at {e}");
        }
    }

    #[test]
    fn test_normal_zenith_and_horizon() {
        let zenith = clear_sky_lux(90.0, Mode::Normal);
        assert!(zenith > 100_000.0 && zenith < 140_000.0, "zenith lux {zenith:.0}");

        let horizon = clear_sky_lux(0.0, Mode::Normal);
        assert!(horizon > 0.0 && horizon < 1_000.0, "horizon lux {horizon:.0}");

        // Still a little light in civil twilight
        let dusk = clear_sky_lux(-5.0, Mode::Normal);
        assert!(dusk >= 0.0 && dusk < horizon);
    }

    #[test]
    fn test_normal_grows_with_elevation() {
        let mut previous = clear_sky_lux(-5.0, Mode::Normal);
        let mut e = 0.0;
        while e <= 90.0 {
            let lux = clear_sky_lux(e, Mode::Normal);
            assert!(lux >= previous, "lux dropped at {e}°: {lux:.1} < {previous:.1}");
            previous = lux;
            e += 5.0;
        }
    }

    #[test]
    fn test_simple_mode() {
        assert_eq!(clear_sky_lux(-3.0, Mode::Simple), 0.0);
        assert!((clear_sky_lux(30.0, Mode::Simple) - 500.0).abs() < 1e-9);
        assert!((clear_sky_lux(90.0, Mode::Simple) - 1000.0).abs() < 1e-9);
    }
}
