//! Sky-coordinate helpers: angular separation and per-axis agreement checks.

/// Great-circle separation between two (ra, dec) positions, all in degrees
pub fn angular_separation_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let (ra1, dec1, ra2, dec2) = (ra1.to_radians(), dec1.to_radians(), ra2.to_radians(), dec2.to_radians());
    let sin_ddec = ((dec2 - dec1) / 2.0).sin();
    let sin_dra = ((ra2 - ra1) / 2.0).sin();
    let h = sin_ddec * sin_ddec + dec1.cos() * dec2.cos() * sin_dra * sin_dra;
    (2.0 * h.sqrt().min(1.0).asin()).to_degrees()
}

/// Separation for optional coordinates; `None` if any component is missing
pub fn separation(a: (Option<f64>, Option<f64>), b: (Option<f64>, Option<f64>)) -> Option<f64> {
    match (a, b) {
        ((Some(ra1), Some(dec1)), (Some(ra2), Some(dec2))) => Some(angular_separation_deg(ra1, dec1, ra2, dec2)),
        _ => None,
    }
}

/// Smallest difference between two right ascensions, accounting for the 0/360 wrap
pub fn ra_difference_deg(ra1: f64, ra2: f64) -> f64 {
    let diff = (ra1 - ra2).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Largest pairwise separation among the given positions (degrees); 0 when fewer than two
pub fn max_pairwise_separation(points: &[(f64, f64)]) -> f64 {
    let mut max = 0.0_f64;
    for (i, a) in points.iter().enumerate() {
        for b in points.iter().skip(i + 1) {
            max = max.max(angular_separation_deg(a.0, a.1, b.0, b.1));
        }
    }
    max
}

/// Which axes disagree beyond `tolerance_deg` across the given positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMismatch {
    pub ra: bool,
    pub dec: bool,
}

impl AxisMismatch {
    /// 0 none, 1 a single axis, 2 both
    pub fn flag(&self) -> u8 {
        self.ra as u8 + self.dec as u8
    }

    pub fn label(&self) -> &'static str {
        match (self.ra, self.dec) {
            (true, true) => "RADEC",
            (true, false) => "RA",
            (false, true) => "DEC",
            (false, false) => "",
        }
    }
}

pub fn axis_mismatch(points: &[(f64, f64)], tolerance_deg: f64) -> AxisMismatch {
    let mut mismatch = AxisMismatch { ra: false, dec: false };
    for (i, a) in points.iter().enumerate() {
        for b in points.iter().skip(i + 1) {
            // RA offsets shrink towards the poles
            let ra_offset = ra_difference_deg(a.0, b.0) * ((a.1 + b.1) / 2.0).to_radians().cos().abs();
            if ra_offset > tolerance_deg {
                mismatch.ra = true;
            }
            if (a.1 - b.1).abs() > tolerance_deg {
                mismatch.dec = true;
            }
        }
    }
    mismatch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angular_separation_basics() {
        assert!(angular_separation_deg(10.0, 20.0, 10.0, 20.0).abs() < 1e-12);
        assert!((angular_separation_deg(0.0, 0.0, 1.0, 0.0) - 1.0).abs() < 1e-9);
        assert!((angular_separation_deg(0.0, 89.0, 180.0, 89.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_ra_wraparound() {
        assert!((ra_difference_deg(359.5, 0.5) - 1.0).abs() < 1e-12);
        assert!((ra_difference_deg(0.5, 359.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_axis_mismatch_flags() {
        let tol = 5.0 / 3600.0;
        let agree = axis_mismatch(&[(344.36, 20.77), (344.3600001, 20.7700001)], tol);
        assert_eq!(agree.flag(), 0);
        assert_eq!(agree.label(), "");

        let dec_only = axis_mismatch(&[(344.36, 20.77), (344.36, 20.78)], tol);
        assert_eq!(dec_only.flag(), 1);
        assert_eq!(dec_only.label(), "DEC");

        let both = axis_mismatch(&[(344.36, 20.77), (344.40, 20.80)], tol);
        assert_eq!(both.flag(), 2);
        assert_eq!(both.label(), "RADEC");
    }

    #[test]
    fn test_max_pairwise_separation() {
        assert_eq!(max_pairwise_separation(&[(1.0, 1.0)]), 0.0);
        let max = max_pairwise_separation(&[(0.0, 0.0), (0.0, 1.0), (0.0, 3.0)]);
        assert!((max - 3.0).abs() < 1e-9);
    }
}
