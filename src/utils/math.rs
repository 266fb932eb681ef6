use crate::models::RiskFactor;

/// Clamp a value into [0, 1]. NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Weighted mean of `(value, weight)` pairs, ignoring non-positive weights.
pub fn weighted_average(pairs: &[(f64, f64)]) -> Option<f64> {
    let (sum, total) = pairs
        .iter()
        .filter(|(_, weight)| *weight > 0.0)
        .fold((0.0, 0.0), |(sum, total), (value, weight)| (sum + value * weight, total + weight));

    if total <= 0.0 {
        None
    } else {
        Some(sum / total)
    }
}

/// Aggregate factors into a 0-100 score.
///
/// Returns `(score, total_weight)`, or `None` when there is nothing to weigh.
pub fn weighted_risk_score(factors: &[RiskFactor]) -> Option<(u8, f64)> {
    let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
    if factors.is_empty() || !total_weight.is_finite() || total_weight <= 0.0 {
        return None;
    }

    let weighted_risk: f64 = factors.iter().map(|f| f.effective_impact() * f.weight).sum();
    let score = (100.0 * weighted_risk / total_weight).round().clamp(0.0, 100.0);
    Some((score as u8, total_weight))
}

/// More (and heavier) factors mean more confidence, floored at 0.1.
pub fn confidence_from_weight(total_weight: f64, divisor: f64) -> f64 {
    (total_weight / divisor).clamp(0.1, 1.0)
}
