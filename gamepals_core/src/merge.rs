use crate::action::PolicyRole;
use crate::policy::InputEntry;

// ---------------------------------------------------------------------
// Merge functions behind `PolicyKind::merge`.
//
// Binary policies treat any nonzero value as "on" so they also work for
// analog triggers. They return exactly 0.0 or 1.0.
// ---------------------------------------------------------------------

/// Values within this distance of zero count as "no input" for continuous policies.
pub const NEAR_ZERO: f32 = 1e-3;

/// Exponent shaping the slope-blend confidence band.
pub const SLOPE_EXPONENT: f32 = 4.0;

#[inline]
fn on(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[inline]
fn near_zero(v: f32) -> bool {
    v.abs() <= NEAR_ZERO
}

/// The single registrant's raw value.
pub fn exclusivity(entries: &[InputEntry]) -> f32 {
    entries.first().map(|e| e.record.value).unwrap_or(0.0)
}

pub fn binary_and(entries: &[InputEntry]) -> f32 {
    on(entries.iter().all(|e| e.record.is_on()))
}

pub fn binary_or(entries: &[InputEntry]) -> f32 {
    on(entries.iter().any(|e| e.record.is_on()))
}

/// Most recent input wins, by timestamp then write sequence. On a full tie the
/// earlier roster entry wins.
pub fn continuous_or(entries: &[InputEntry]) -> f32 {
    let mut latest: Option<&InputEntry> = None;
    for e in entries {
        match latest {
            Some(l) if e.record.recency() <= l.record.recency() => {}
            _ => latest = Some(e),
        }
    }
    latest.map(|e| e.record.value).unwrap_or(0.0)
}

/// Confidence-weighted mean of the entries that actually carry a value.
///
/// Near-zero entries are left out of numerator and denominator alike, so an
/// idle actor does not drag the result towards zero, while opposing inputs
/// still cancel by weight.
pub fn continuous_sum(entries: &[InputEntry]) -> f32 {
    let mut values_sum = 0.0_f32;
    let mut weights_sum = 0.0_f32;

    for e in entries {
        if near_zero(e.record.value) {
            continue;
        }
        values_sum += e.record.value * e.record.confidence;
        weights_sum += e.record.confidence;
    }

    if weights_sum > 0.0 {
        values_sum / weights_sum
    } else {
        0.0
    }
}

/// Confidence-weighted vote between "on" and "off" voters.
///
/// Each side scores the mean confidence of its voters; a tie goes to "on".
pub fn binary_democracy(entries: &[InputEntry]) -> f32 {
    let (mut on_sum, mut on_n) = (0.0_f32, 0_usize);
    let (mut off_sum, mut off_n) = (0.0_f32, 0_usize);

    for e in entries {
        if e.record.is_on() {
            on_sum += e.record.confidence;
            on_n += 1;
        } else {
            off_sum += e.record.confidence;
            off_n += 1;
        }
    }

    if on_n == 0 {
        return 0.0;
    }
    if off_n == 0 {
        return 1.0;
    }

    let on_score = on_sum / on_n as f32;
    let off_score = off_sum / off_n as f32;
    on(off_score <= on_score)
}

/// A pilot pressing is an override; otherwise the roster votes.
pub fn supervision_by_pilot(entries: &[InputEntry]) -> f32 {
    if entries
        .iter()
        .any(|e| e.role == PolicyRole::Pilot && e.record.is_on())
    {
        return 1.0;
    }
    binary_democracy(entries)
}

/// Continuous counterpart of [`supervision_by_pilot`]: the first pilot with a
/// real value passes through unchanged, otherwise [`continuous_sum`] decides.
pub fn continuous_supervision_by_pilot(entries: &[InputEntry]) -> f32 {
    entries
        .iter()
        .find(|e| e.role == PolicyRole::Pilot && !near_zero(e.record.value))
        .map(|e| e.record.value)
        .unwrap_or_else(|| continuous_sum(entries))
}

/// Linear blend of pilot and copilot weighted by a confidence slope.
///
/// ```text
///             theta_2
///               v
///               -------      alpha
///             /
///           /
///     ------
///         ^
///      theta_1               copilot confidence ->
/// ```
///
/// The corners come from the pilot's confidence: a confident pilot narrows the
/// band in which the copilot gains influence.
pub fn continuous_slope(entries: &[InputEntry]) -> f32 {
    match entries {
        [] => 0.0,
        [only] => only.record.value,
        _ => {
            let pilot = entries.iter().find(|e| e.role == PolicyRole::Pilot);
            let copilot = entries.iter().find(|e| e.role == PolicyRole::Copilot);
            let (pilot, copilot) = match (pilot, copilot) {
                (Some(p), Some(c)) => (p, c),
                _ => (&entries[0], &entries[1]),
            };

            let (theta_1, theta_2) = slope_thetas(pilot.record.confidence);
            let alpha = slope_alpha(copilot.record.confidence, theta_1, theta_2);

            pilot.record.value * (1.0 - alpha) + copilot.record.value * alpha
        }
    }
}

/// `(c^p, c^(1/p))` for pilot confidence `c`.
pub fn slope_thetas(pilot_confidence: f32) -> (f32, f32) {
    let c = pilot_confidence.clamp(0.0, 1.0);
    (c.powf(SLOPE_EXPONENT), c.powf(1.0 / SLOPE_EXPONENT))
}

/// Blend weight of the copilot for copilot confidence `c`.
pub fn slope_alpha(c: f32, theta_1: f32, theta_2: f32) -> f32 {
    if c < theta_1 {
        return 0.0;
    }
    if c > theta_2 {
        return 1.0;
    }
    if theta_1 == theta_2 {
        return on(c > theta_1);
    }
    (c - theta_1) / (theta_2 - theta_1)
}
