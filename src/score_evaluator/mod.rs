//! ScoreEvaluator - Opening threshold classification
//!
//! The only business rule: does the exposed hand reach the opening score?

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Lowest allowed opening threshold
pub const MIN_THRESHOLD: u32 = 101;
/// Highest allowed opening threshold
pub const MAX_THRESHOLD: u32 = 200;

/// Opening threshold (101..=200, default 101)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u32", into = "u32")]
pub struct ThresholdConfig(u32);

impl ThresholdConfig {
    /// Create a threshold, rejecting values outside 101..=200
    pub fn new(value: u32) -> Result<Self> {
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
            return Err(Error::Validation(format!(
                "threshold {} outside {}..={}",
                value, MIN_THRESHOLD, MAX_THRESHOLD
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self(MIN_THRESHOLD)
    }
}

impl TryFrom<u32> for ThresholdConfig {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ThresholdConfig> for u32 {
    fn from(t: ThresholdConfig) -> u32 {
        t.0
    }
}

/// Score status relative to the threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreStatus {
    Below,
    Near,
    Met,
}

impl ScoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreStatus::Below => "below",
            ScoreStatus::Near => "near",
            ScoreStatus::Met => "met",
        }
    }
}

/// Classify a total against a threshold. Pure and total.
pub fn classify(total_score: u32, threshold: u32) -> ScoreStatus {
    if total_score >= threshold {
        ScoreStatus::Met
    } else if total_score.checked_add(1) == Some(threshold) {
        ScoreStatus::Near
    } else {
        ScoreStatus::Below
    }
}

/// Points still missing to reach the threshold
pub fn remaining(total_score: u32, threshold: u32) -> u32 {
    threshold.saturating_sub(total_score)
}

/// Derived view of a score against the configured threshold
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScoreSummary {
    pub total_score: u32,
    pub threshold: u32,
    pub status: ScoreStatus,
    pub remaining: u32,
}

impl ScoreSummary {
    pub fn evaluate(total_score: u32, threshold: ThresholdConfig) -> Self {
        let threshold = threshold.value();
        Self {
            total_score,
            threshold,
            status: classify(total_score, threshold),
            remaining: remaining(total_score, threshold),
        }
    }

    /// Display line under the score
    pub fn message(&self) -> String {
        if self.total_score > self.threshold {
            format!("Passed {}!", self.threshold)
        } else if self.total_score == self.threshold {
            format!("Exactly {}!", self.threshold)
        } else {
            format!("Remaining: {}", self.remaining)
        }
    }
}
