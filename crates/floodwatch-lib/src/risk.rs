//! Flood risk classification.
//!
//! The canonical policy is [`classify_alerts`], driven by the severities of
//! active alerts near the user. [`confidence_score`] produces a 0–100 figure
//! reported next to the level and [`level_from_text`] reads a level out of
//! generated text. The score thresholds in [`level_from_score`] do not agree
//! with the alert-count policy and are never used to derive a reported level.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal flood or route danger.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity label stored on a flood alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse a stored severity label. Unknown labels are treated as `Low`.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "CRITICAL" => Severity::High,
            "MEDIUM" | "MODERATE" => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points contributed per HIGH alert to the confidence score.
pub const HIGH_ALERT_POINTS: u32 = 30;
/// Points contributed per MEDIUM alert to the confidence score.
pub const MEDIUM_ALERT_POINTS: u32 = 15;
/// Points contributed per LOW alert to the confidence score.
pub const LOW_ALERT_POINTS: u32 = 5;
/// Points contributed per pending distress call to the confidence score.
pub const DISTRESS_CALL_POINTS: u32 = 10;

/// Alert-count policy.
///
/// - no alerts: `Low`
/// - any `High` alert: `Critical`
/// - more than one `Medium` alert: `High`
/// - any other alert: `Medium`
pub fn classify_alerts(severities: &[Severity]) -> RiskLevel {
    if severities.is_empty() {
        return RiskLevel::Low;
    }
    if severities.contains(&Severity::High) {
        return RiskLevel::Critical;
    }
    let medium = severities
        .iter()
        .filter(|s| **s == Severity::Medium)
        .count();
    if medium > 1 {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

/// Severity-weighted confidence in `0..=100`.
pub fn confidence_score(severities: &[Severity], distress_calls: usize) -> u8 {
    let alert_points: u32 = severities
        .iter()
        .map(|s| match s {
            Severity::High => HIGH_ALERT_POINTS,
            Severity::Medium => MEDIUM_ALERT_POINTS,
            Severity::Low => LOW_ALERT_POINTS,
        })
        .fold(0u32, u32::saturating_add);
    let call_points = u32::try_from(distress_calls)
        .unwrap_or(u32::MAX)
        .saturating_mul(DISTRESS_CALL_POINTS);

    alert_points.saturating_add(call_points).min(100) as u8
}

/// Score thresholds: `>= 70` High, `>= 40` Medium, otherwise Low.
pub fn level_from_score(score: u8) -> RiskLevel {
    match score {
        70..=u8::MAX => RiskLevel::High,
        40..=69 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Read a level out of free text by literal, case-sensitive keyword search.
///
/// `CRITICAL` is checked first, then `HIGH`, then `MEDIUM`; anything else is
/// `Low`.
pub fn level_from_text(text: &str) -> RiskLevel {
    if text.contains("CRITICAL") {
        RiskLevel::Critical
    } else if text.contains("HIGH") {
        RiskLevel::High
    } else if text.contains("MEDIUM") {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Evidence gathered around a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskEvidence {
    pub alerts: Vec<Severity>,
    pub distress_calls: usize,
}

impl RiskEvidence {
    pub fn new(alerts: Vec<Severity>, distress_calls: usize) -> Self {
        Self {
            alerts,
            distress_calls,
        }
    }

    #[must_use]
    pub fn with_alert(mut self, severity: Severity) -> Self {
        self.alerts.push(severity);
        self
    }

    pub fn assess(&self) -> RiskAssessment {
        RiskAssessment {
            level: classify_alerts(&self.alerts),
            confidence: confidence_score(&self.alerts, self.distress_calls),
        }
    }
}

/// Canonical level with its confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub confidence: u8,
}
