use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{ConfigError, Normalization, PipelineConfig};
use crate::models::{Factor, FeatureName, FeatureTable, RiskBand, RiskScore, ScoreTable};
use crate::pipeline::errors::{PipelineError, Stage};

/// Distribution of one feature across every customer in the batch. Built once per run.
#[derive(Debug, Clone)]
struct PopulationStats {
    mean: f64,
    std_dev: f64,
    sorted: Vec<f64>,
    /// Every customer shares the same value, so the feature carries no signal.
    degenerate: bool
}

impl PopulationStats {
    fn from_values(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);

        let count = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / count;
        let std_dev = variance.sqrt();

        //NOTE: Equality of the extremes is checked rather than the variance because the mean of
        //      identical floats can round away from the value and leave a tiny non-zero variance.
        let degenerate = match (values.first(), values.last()) {
            (Some(first), Some(last)) => first == last || !(std_dev.is_finite() && std_dev > 0.0),
            _ => true
        };

        Self { mean, std_dev, sorted: values, degenerate }
    }

    fn z_score(&self, value: f64) -> f64 {
        if self.degenerate {
            return 0.0;
        }

        (value - self.mean) / self.std_dev
    }

    /// Mid-rank percentile in `[0, 1]`.
    fn percentile(&self, value: f64) -> f64 {
        let below = self.sorted.partition_point(|other| *other < value);
        let through = self.sorted.partition_point(|other| *other <= value);

        (below as f64 + (through - below) as f64 / 2.0) / self.sorted.len().max(1) as f64
    }

    /// Two-sided extremity of `value` in `[0, 1]`.
    fn normalize(&self, value: f64, normalization: Normalization, z_saturation: f64) -> f64 {
        if self.degenerate {
            return 0.0;
        }

        let normalized = match normalization {
            Normalization::ZScore => self.z_score(value).abs() / z_saturation,
            Normalization::Percentile => (2.0 * self.percentile(value) - 1.0).abs()
        };

        normalized.clamp(0.0, 1.0)
    }
}

/// Scores every customer in the feature table against the batch's own population.
///
/// Each weighted feature is normalized to a `[0, 1]` extremity, then contributes
/// `100 * (weight / total_weight) * extremity` points. Scores are clamped to `[0, 100]`. Because
/// normalization uses this batch's statistics, a score is only comparable with scores from the
/// same run.
///
/// # Errors
/// Returns `PipelineError::EmptyBatch` for an empty feature table and
/// `PipelineError::ConfigurationInvalid` when no weight is positive or the weights sum past
/// `f64::MAX`.
pub fn score_customers(features: &FeatureTable, config: &PipelineConfig) -> Result<ScoreTable, PipelineError> {
    if features.is_empty() {
        return Err(PipelineError::EmptyBatch { stage: Stage::RiskScorer });
    }

    let weight_total = config.weight_total();

    if !weight_total.is_finite() {
        return Err(ConfigError::WeightTotalNotFinite(weight_total).into());
    }

    if weight_total <= 0.0 {
        return Err(ConfigError::NoPositiveWeight.into());
    }

    let population: BTreeMap<FeatureName, PopulationStats> = config.weights.keys()
        .map(|feature| {
            let values = features.values().map(|vector| vector.value(*feature)).collect();
            (*feature, PopulationStats::from_values(values))
        })
        .collect();

    for (feature, stats) in &population {
        if stats.degenerate {
            debug!("Feature [{feature}] has zero variance in this batch and contributes nothing");
        }
    }

    let scores: ScoreTable = features.iter()
        .map(|(customer_id, vector)| {
            let mut factors = Vec::with_capacity(config.weights.len());
            let mut z_total = 0.0;
            let mut z_count = 0usize;

            for (feature, weight) in &config.weights {
                let stats = &population[feature];
                let value = vector.value(*feature);
                let extremity = stats.normalize(value, config.normalization, config.z_saturation);

                if !stats.degenerate {
                    z_total += stats.z_score(value).abs();
                    z_count += 1;
                }

                factors.push(Factor {
                    feature: *feature,
                    weight: *weight,
                    contribution: 100.0 * (weight / weight_total) * extremity
                });
            }

            factors.sort_by(compare_factors);

            let score = factors.iter().map(|factor| factor.contribution).sum::<f64>().clamp(0.0, 100.0);
            let composite_z = if z_count == 0 { 0.0 } else { z_total / z_count as f64 };

            let risk_score = RiskScore {
                customer_id: customer_id.clone(),
                score,
                factors,
                composite_z,
                band: RiskBand::from_score(score),
                is_anomaly: composite_z > config.anomaly_z_threshold
            };

            (customer_id.clone(), risk_score)
        })
        .collect();

    let high_risk = scores.values()
        .filter(|score| matches!(score.band, RiskBand::High | RiskBand::Critical))
        .count();

    info!("Scored {} customers. {} high/critical risk.", scores.len(), high_risk);

    Ok(scores)
}

fn compare_factors(left: &Factor, right: &Factor) -> Ordering {
    right.contribution.abs().total_cmp(&left.contribution.abs())
        .then_with(|| left.feature.as_str().cmp(right.feature.as_str()))
}
