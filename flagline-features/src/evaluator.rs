//! Feature evaluation against the published snapshot.

use crate::bucket::pick_variant_name;
use crate::coerce::stringify;
use crate::config::EngineConfig;
use crate::context::EvaluationContext;
use crate::flag::{Feature, FeatureKind, RuleAction};
use crate::schedule::schedule_state_at;
use crate::snapshot::SnapshotHolder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Why an evaluation produced its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationReason {
    /// No such feature in the snapshot
    NotFound,
    /// Master switch is off
    Disabled,
    /// Schedules keep the feature off at the evaluated instant
    ScheduledOff,
    /// Boolean feature served its default variant
    BooleanDefault,
    /// A rule matched
    RuleMatch { rule_id: Uuid, action: RuleAction },
    /// No rule matched; the caller was bucketed on the rollout key
    Rollout,
    /// No rule matched and no rollout key was present
    Fallthrough,
}

/// Result of evaluating one feature for one context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Variant name served (empty when disabled or not found)
    pub value: String,
    /// Whether the feature is on for this caller
    pub enabled: bool,
    /// Whether the feature is configured at all
    pub found: bool,
    /// Which branch produced the value
    pub reason: EvaluationReason,
}

impl Evaluation {
    fn not_found() -> Self {
        Self {
            value: String::new(),
            enabled: false,
            found: false,
            reason: EvaluationReason::NotFound,
        }
    }

    fn off(reason: EvaluationReason) -> Self {
        Self {
            value: String::new(),
            enabled: false,
            found: true,
            reason,
        }
    }

    fn served(value: impl Into<String>, reason: EvaluationReason) -> Self {
        Self {
            value: value.into(),
            enabled: true,
            found: true,
            reason,
        }
    }

    /// `(value, enabled, found)`
    pub fn into_parts(self) -> (String, bool, bool) {
        (self.value, self.enabled, self.found)
    }
}

/// Evaluates features from the current snapshot.
///
/// Cheap to clone; clones share the snapshot holder.
#[derive(Debug, Clone)]
pub struct Evaluator {
    snapshots: Arc<SnapshotHolder>,
    config: EngineConfig,
}

impl Evaluator {
    /// Create an evaluator reading from `snapshots`
    pub fn new(snapshots: Arc<SnapshotHolder>, config: EngineConfig) -> Self {
        Self { snapshots, config }
    }

    /// Get the snapshot holder
    pub fn snapshots(&self) -> &Arc<SnapshotHolder> {
        &self.snapshots
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a feature for a context, ignoring schedules.
    pub fn evaluate(&self, project_id: Uuid, key: &str, context: &EvaluationContext) -> Evaluation {
        let snapshot = self.snapshots.load();
        match snapshot.get(project_id, key) {
            Some(feature) => self.evaluate_feature(feature, context),
            None => {
                trace!(project = %project_id, feature = %key, "Feature not configured");
                Evaluation::not_found()
            }
        }
    }

    /// Evaluate a feature for a context with its schedules applied at `now`.
    pub fn evaluate_at(
        &self,
        project_id: Uuid,
        key: &str,
        context: &EvaluationContext,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let snapshot = self.snapshots.load();
        let Some(feature) = snapshot.get(project_id, key) else {
            return Evaluation::not_found();
        };

        if feature.enabled
            && !schedule_state_at(
                feature,
                now,
                self.config.timezone(),
                self.config.max_cron_occurrences,
            )
        {
            return Evaluation::off(EvaluationReason::ScheduledOff);
        }

        self.evaluate_feature(feature, context)
    }

    /// Evaluate an already-resolved feature.
    pub fn evaluate_feature(&self, feature: &Feature, context: &EvaluationContext) -> Evaluation {
        if !feature.enabled {
            return Evaluation::off(EvaluationReason::Disabled);
        }

        if feature.kind == FeatureKind::Boolean {
            return Evaluation::served(&feature.default_variant, EvaluationReason::BooleanDefault);
        }

        for rule in feature.rules_by_priority() {
            if !rule.matches(context) {
                continue;
            }

            let reason = EvaluationReason::RuleMatch {
                rule_id: rule.id,
                action: rule.action,
            };

            match rule.action {
                RuleAction::Assign => {
                    match rule.variant_id.and_then(|id| feature.variant(id)) {
                        Some(variant) => return Evaluation::served(&variant.name, reason),
                        None => {
                            debug!(
                                feature = %feature.key,
                                rule = %rule.id,
                                variant = ?rule.variant_id,
                                "Assign rule references unknown variant; trying next rule"
                            );
                        }
                    }
                }
                RuleAction::Include => {
                    let value = self
                        .rollout_value(feature, context)
                        .map(|key| {
                            pick_variant_name(&feature.variants, &key, &feature.default_variant)
                        })
                        .unwrap_or_else(|| feature.default_variant.clone());
                    return Evaluation::served(value, reason);
                }
                RuleAction::Exclude => {
                    return Evaluation::served(&feature.default_variant, reason);
                }
            }
        }

        match self.rollout_value(feature, context) {
            Some(key) => Evaluation::served(
                pick_variant_name(&feature.variants, &key, &feature.default_variant),
                EvaluationReason::Rollout,
            ),
            None => Evaluation::served(&feature.default_variant, EvaluationReason::Fallthrough),
        }
    }

    /// Stringified rollout attribute, if the context carries it.
    fn rollout_value(&self, feature: &Feature, context: &EvaluationContext) -> Option<String> {
        let attribute = feature
            .rollout_key
            .as_deref()
            .unwrap_or(&self.config.default_rollout_key);
        context.get(attribute).map(stringify)
    }
}
