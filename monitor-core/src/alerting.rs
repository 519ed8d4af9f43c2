//! Threshold rules and alert evaluation
//!
//! This module provides:
//! - Static threshold rules loaded once from configuration
//! - Evaluation of every enabled rule against a set of aggregate values
//! - A fixed output order: system health, then business logic, then performance

use crate::error::{MonitorError, Result};
use crate::metrics::Section;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Alert severity levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

/// Rule categories, in evaluation priority order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    SystemHealth,
    BusinessLogic,
    Performance,
}

/// Comparison operators for thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
}

impl ComparisonOperator {
    /// Whether `value` breaches `limit` under this operator
    pub fn breached(&self, value: f64, limit: f64) -> bool {
        match self {
            ComparisonOperator::GreaterThan => value > limit,
            ComparisonOperator::GreaterThanOrEqual => value >= limit,
            ComparisonOperator::LessThan => value < limit,
            ComparisonOperator::LessThanOrEqual => value <= limit,
            ComparisonOperator::Equal => (value - limit).abs() < f64::EPSILON,
            ComparisonOperator::NotEqual => (value - limit).abs() >= f64::EPSILON,
        }
    }
}

/// Threshold rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Unique rule name
    pub name: String,

    /// What the rule watches for, shown as a recommendation when it fires
    #[serde(default)]
    pub description: String,

    /// Aggregate value to compare
    pub metric: String,

    /// Comparison operator
    pub operator: ComparisonOperator,

    /// Threshold value
    pub limit: f64,

    /// Alert severity
    pub severity: AlertSeverity,

    /// Priority group
    pub category: RuleCategory,

    /// Snapshot section whose status this rule drives
    pub section: Section,

    /// Enable/disable this rule
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// A breached threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub rule: String,
    pub metric: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub category: RuleCategory,
    pub section: Section,
    pub observed_value: f64,
    pub limit: f64,
    pub triggered_at: DateTime<Utc>,
}

/// Alert rules configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub rules: Vec<ThresholdRule>,
}

impl AlertConfig {
    /// Reject rules the evaluator cannot apply
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.name.is_empty() {
                return Err(MonitorError::config("alert rule name must not be empty"));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(MonitorError::config(format!(
                    "duplicate alert rule: {}",
                    rule.name
                )));
            }
            if !rule.limit.is_finite() {
                return Err(MonitorError::config(format!(
                    "alert rule {} has a non-finite limit",
                    rule.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                ThresholdRule {
                    name: "high_error_rate".to_string(),
                    description: "Error rate exceeds 5%, check server logs for failing endpoints"
                        .to_string(),
                    metric: "error_rate".to_string(),
                    operator: ComparisonOperator::GreaterThan,
                    limit: 5.0,
                    severity: AlertSeverity::Critical,
                    category: RuleCategory::SystemHealth,
                    section: Section::Performance,
                    enabled: true,
                },
                ThresholdRule {
                    name: "low_book_availability".to_string(),
                    description:
                        "Fewer than 20% of titles are on the shelf, consider acquiring copies"
                            .to_string(),
                    metric: "availability_rate".to_string(),
                    operator: ComparisonOperator::LessThan,
                    limit: 20.0,
                    severity: AlertSeverity::Warning,
                    category: RuleCategory::BusinessLogic,
                    section: Section::Books,
                    enabled: true,
                },
                ThresholdRule {
                    name: "high_overdue_rate".to_string(),
                    description: "More than 10% of open loans are overdue, send return reminders"
                        .to_string(),
                    metric: "overdue_rate".to_string(),
                    operator: ComparisonOperator::GreaterThan,
                    limit: 10.0,
                    severity: AlertSeverity::Critical,
                    category: RuleCategory::BusinessLogic,
                    section: Section::Loans,
                    enabled: true,
                },
                ThresholdRule {
                    name: "slow_responses".to_string(),
                    description: "Average response time exceeds one second, review slow queries"
                        .to_string(),
                    metric: "avg_response_time_ms".to_string(),
                    operator: ComparisonOperator::GreaterThan,
                    limit: 1000.0,
                    severity: AlertSeverity::Warning,
                    category: RuleCategory::Performance,
                    section: Section::Performance,
                    enabled: true,
                },
            ],
        }
    }
}

/// Evaluates threshold rules against aggregate values
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    /// Enabled rules in output order
    rules: Vec<ThresholdRule>,
}

impl AlertEvaluator {
    /// Create an evaluator from validated configuration
    pub fn new(config: &AlertConfig) -> Result<Self> {
        config.validate()?;

        let mut rules: Vec<ThresholdRule> =
            config.rules.iter().filter(|r| r.enabled).cloned().collect();
        // Stable: equal categories keep declaration order.
        rules.sort_by_key(|r| r.category);

        Ok(Self { rules })
    }

    /// Enabled rules in the order their alerts are reported
    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    /// Evaluate every rule; rules whose metric is missing from `values` are skipped
    pub fn evaluate(&self, values: &BTreeMap<String, f64>) -> Vec<Alert> {
        let now = Utc::now();
        let mut alerts = Vec::new();

        for rule in &self.rules {
            let Some(&value) = values.get(&rule.metric) else {
                debug!(rule = %rule.name, metric = %rule.metric, "Metric absent, rule skipped");
                continue;
            };

            if rule.operator.breached(value, rule.limit) {
                alerts.push(Alert {
                    id: Uuid::new_v4(),
                    rule: rule.name.clone(),
                    metric: rule.metric.clone(),
                    message: format_alert_message(rule, value),
                    severity: rule.severity,
                    category: rule.category,
                    section: rule.section,
                    observed_value: value,
                    limit: rule.limit,
                    triggered_at: now,
                });
            }
        }

        alerts
    }
}

fn format_alert_message(rule: &ThresholdRule, value: f64) -> String {
    format!(
        "{}: {} is {} {} (current: {:.2})",
        rule.name, rule.metric, rule.operator, rule.limit, value
    )
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonOperator::GreaterThan => write!(f, ">"),
            ComparisonOperator::GreaterThanOrEqual => write!(f, ">="),
            ComparisonOperator::LessThan => write!(f, "<"),
            ComparisonOperator::LessThanOrEqual => write!(f, "<="),
            ComparisonOperator::Equal => write!(f, "=="),
            ComparisonOperator::NotEqual => write!(f, "!="),
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Critical => write!(f, "critical"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Info => write!(f, "info"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn rule(name: &str, metric: &str, category: RuleCategory) -> ThresholdRule {
        ThresholdRule {
            name: name.to_string(),
            description: String::new(),
            metric: metric.to_string(),
            operator: ComparisonOperator::GreaterThan,
            limit: 1.0,
            severity: AlertSeverity::Warning,
            category,
            section: Section::Performance,
            enabled: true,
        }
    }

    #[test]
    fn test_condition_evaluation() {
        assert!(ComparisonOperator::GreaterThan.breached(6.0, 5.0));
        assert!(!ComparisonOperator::GreaterThan.breached(5.0, 5.0));
        assert!(ComparisonOperator::GreaterThanOrEqual.breached(5.0, 5.0));
        assert!(ComparisonOperator::LessThan.breached(19.99, 20.0));
        assert!(ComparisonOperator::LessThanOrEqual.breached(20.0, 20.0));
        assert!(ComparisonOperator::Equal.breached(3.0, 3.0));
        assert!(ComparisonOperator::NotEqual.breached(3.0, 4.0));
    }

    #[test]
    fn test_no_alerts_when_within_thresholds() {
        let evaluator = AlertEvaluator::new(&AlertConfig::default()).unwrap();
        let alerts = evaluator.evaluate(&values(&[
            ("error_rate", 1.0),
            ("availability_rate", 66.67),
            ("overdue_rate", 4.0),
            ("avg_response_time_ms", 120.0),
        ]));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_system_health_alert_precedes_business_alert() {
        let evaluator = AlertEvaluator::new(&AlertConfig::default()).unwrap();
        let alerts = evaluator.evaluate(&values(&[("overdue_rate", 12.0), ("error_rate", 6.0)]));

        let rules: Vec<&str> = alerts.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(rules, vec!["high_error_rate", "high_overdue_rate"]);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].observed_value, 6.0);
    }

    #[test]
    fn test_order_is_independent_of_declaration_across_categories() {
        let config = AlertConfig {
            rules: vec![
                rule("perf", "latency", RuleCategory::Performance),
                rule("business", "overdue", RuleCategory::BusinessLogic),
                rule("health", "errors", RuleCategory::SystemHealth),
            ],
        };
        let evaluator = AlertEvaluator::new(&config).unwrap();
        let alerts = evaluator.evaluate(&values(&[
            ("latency", 2.0),
            ("overdue", 2.0),
            ("errors", 2.0),
        ]));

        let rules: Vec<&str> = alerts.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(rules, vec!["health", "business", "perf"]);
    }

    #[test]
    fn test_equal_category_keeps_declaration_order() {
        let config = AlertConfig {
            rules: vec![
                rule("second_declared_first", "b", RuleCategory::BusinessLogic),
                rule("declared_last", "a", RuleCategory::BusinessLogic),
            ],
        };
        let evaluator = AlertEvaluator::new(&config).unwrap();
        let alerts = evaluator.evaluate(&values(&[("a", 5.0), ("b", 5.0)]));

        assert_eq!(alerts[0].rule, "second_declared_first");
        assert_eq!(alerts[1].rule, "declared_last");
    }

    #[test]
    fn test_every_breached_rule_fires() {
        let evaluator = AlertEvaluator::new(&AlertConfig::default()).unwrap();
        let alerts = evaluator.evaluate(&values(&[
            ("error_rate", 50.0),
            ("availability_rate", 5.0),
            ("overdue_rate", 50.0),
            ("avg_response_time_ms", 5000.0),
        ]));
        assert_eq!(alerts.len(), 4);
        assert_eq!(alerts[3].rule, "slow_responses");
    }

    #[test]
    fn test_missing_metric_skips_rule() {
        let evaluator = AlertEvaluator::new(&AlertConfig::default()).unwrap();
        let alerts = evaluator.evaluate(&values(&[("error_rate", 0.0)]));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_disabled_rule_is_not_evaluated() {
        let mut config = AlertConfig::default();
        config.rules[0].enabled = false;
        let evaluator = AlertEvaluator::new(&config).unwrap();
        assert_eq!(evaluator.rules().len(), 3);
        assert!(evaluator.evaluate(&values(&[("error_rate", 99.0)])).is_empty());
    }

    #[test]
    fn test_duplicate_rule_names_rejected() {
        let config = AlertConfig {
            rules: vec![
                rule("dup", "a", RuleCategory::Performance),
                rule("dup", "b", RuleCategory::Performance),
            ],
        };
        assert!(matches!(
            AlertEvaluator::new(&config),
            Err(MonitorError::Config(_))
        ));
    }

    #[test]
    fn test_non_finite_limit_rejected() {
        let mut bad = rule("nan", "a", RuleCategory::Performance);
        bad.limit = f64::NAN;
        let config = AlertConfig { rules: vec![bad] };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alert_message_format() {
        let evaluator = AlertEvaluator::new(&AlertConfig::default()).unwrap();
        let alerts = evaluator.evaluate(&values(&[("availability_rate", 12.5)]));
        assert_eq!(
            alerts[0].message,
            "low_book_availability: availability_rate is < 20 (current: 12.50)"
        );
    }
}
