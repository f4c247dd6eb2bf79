//! Raw → calibrated value mapping.
//!
//! Two pure functions over an immutable [`ObjectProperties`] record:
//!
//! - [`scale_linear`] maps the logical range straight onto the physical range.
//! - [`scale_axis`] splits the range at its center and applies a dead zone and
//!   a saturation limit to each half independently, the way legacy joystick
//!   APIs calibrate analog sticks.
//!
//! Dead zone and saturation are expressed in ten-thousandths
//! (`0..=10000` = 0–100 %). All arithmetic is integer and goes through
//! [`mul_div`], so results are bit-for-bit reproducible.

use serde::{Deserialize, Serialize};

/// Full scale for dead zone / saturation percentages.
pub const PERCENT_SCALE: i32 = 10_000;

/// Calibration record for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProperties {
    pub logical_min: i32,
    pub logical_max: i32,
    /// Physical (reported) range.
    pub range_min: i32,
    pub range_max: i32,
    pub deadzone: i32,
    pub saturation: i32,
    pub granularity: i32,
}

impl ObjectProperties {
    /// Signed 16-bit sticks reported as `0..=65535` with no dead zone.
    pub const fn axis_default() -> Self {
        Self {
            logical_min: -32768,
            logical_max: 32767,
            range_min: 0,
            range_max: 65535,
            deadzone: 0,
            saturation: PERCENT_SCALE,
            granularity: 1,
        }
    }
}

impl Default for ObjectProperties {
    fn default() -> Self {
        Self::axis_default()
    }
}

/// `a * b / c` with a 64-bit intermediate, rounding half away from zero.
///
/// Returns `None` for a zero divisor or a quotient outside `i32`.
pub fn mul_div(a: i32, b: i32, c: i32) -> Option<i32> {
    if c == 0 {
        return None;
    }
    let (mut a, mut c) = (a as i64, c as i64);
    if c < 0 {
        a = -a;
        c = -c;
    }
    let product = a * b as i64;
    let half = c / 2;
    let q = if product < 0 {
        (product - half) / c
    } else {
        (product + half) / c
    };
    i32::try_from(q).ok()
}

/// `a * b / c` over 64-bit spans with [`mul_div`]'s rounding. A zero divisor yields 0.
fn mul_div_span(a: i64, b: i64, c: i64) -> i64 {
    if c == 0 {
        return 0;
    }
    let (mut a, mut c) = (a as i128, c as i128);
    if c < 0 {
        a = -a;
        c = -c;
    }
    let product = a * b as i128;
    let half = c / 2;
    let q = if product < 0 {
        (product - half) / c
    } else {
        (product + half) / c
    };
    q.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Linear mapping of `[logical_min, logical_max]` onto `[range_min, range_max]`.
pub fn scale_linear(raw: i32, props: &ObjectProperties) -> i32 {
    let span = mul_div_span(
        raw as i64 - props.logical_min as i64,
        props.range_max as i64 - props.range_min as i64,
        props.logical_max as i64 - props.logical_min as i64,
    );
    clamp_i32(props.range_min as i64 + span)
}

fn center(min: i32, max: i32) -> i32 {
    if min == 0 {
        max >> 1
    } else {
        ((min as f64 + max as f64) / 2.0).round() as i32
    }
}

/// Centered mapping with per-side dead zone and saturation.
pub fn scale_axis(raw: i32, props: &ObjectProperties) -> i32 {
    let log_ctr = center(props.logical_min, props.logical_max);
    let phy_ctr = center(props.range_min, props.range_max);

    let value = raw.saturating_sub(log_ctr);
    let percent = |span: i32, pct: i32| mul_div(span, pct, PERCENT_SCALE).unwrap_or(0);

    // Each side gets its own [lo, hi] logical window mapped onto [out_lo, out_hi].
    let (lo, hi, out_lo, out_hi) = if value <= 0 {
        let side = props.logical_min.saturating_sub(log_ctr);
        (
            percent(side, props.saturation),
            percent(side, props.deadzone),
            props.range_min,
            phy_ctr,
        )
    } else {
        let side = props.logical_max.saturating_sub(log_ctr);
        (
            percent(side, props.deadzone),
            percent(side, props.saturation),
            phy_ctr,
            props.range_max,
        )
    };

    if value <= lo {
        return out_lo;
    }
    if value >= hi {
        return out_hi;
    }
    let step = mul_div_span(
        value as i64 - lo as i64,
        out_hi as i64 - out_lo as i64,
        hi as i64 - lo as i64,
    );
    clamp_i32(out_lo as i64 + step)
}
