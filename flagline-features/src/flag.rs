//! Feature Flag Core
//!
//! Defines the feature aggregate (variants, rules, schedules) and rule resolution.

use crate::condition::Expression;
use crate::context::EvaluationContext;
use crate::schedule::FeatureSchedule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Feature flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Feature ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Flag key, unique within a project
    pub key: String,

    /// Boolean or multivariant
    pub kind: FeatureKind,

    /// Variant name served when nothing more specific applies
    #[serde(default)]
    pub default_variant: String,

    /// Master switch; overrides every rule and schedule when off
    pub enabled: bool,

    /// Context attribute used for percentage rollout (engine default when unset)
    #[serde(default)]
    pub rollout_key: Option<String>,

    /// Creation time; recurring schedules never fire before it
    pub created_at: DateTime<Utc>,

    /// Variants in rollout order
    #[serde(default)]
    pub variants: Vec<FlagVariant>,

    /// Targeting rules
    #[serde(default)]
    pub rules: Vec<Rule>,

    /// One-shot and recurring schedules
    #[serde(default)]
    pub schedules: Vec<FeatureSchedule>,
}

impl Feature {
    /// Create a new boolean feature
    ///
    /// The feature is enabled and serves `"true"` as its default variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use flagline_features::Feature;
    /// use uuid::Uuid;
    ///
    /// let feature = Feature::boolean(Uuid::new_v4(), "new-ui");
    /// assert!(feature.enabled);
    /// ```
    pub fn boolean(project_id: Uuid, key: impl Into<String>) -> Self {
        Self::new(project_id, key, FeatureKind::Boolean, "true")
    }

    /// Create a new multivariant feature
    pub fn multivariant(
        project_id: Uuid,
        key: impl Into<String>,
        default_variant: impl Into<String>,
        variants: Vec<FlagVariant>,
    ) -> Self {
        let mut feature = Self::new(project_id, key, FeatureKind::Multivariant, default_variant);
        feature.variants = variants;
        feature
    }

    fn new(
        project_id: Uuid,
        key: impl Into<String>,
        kind: FeatureKind,
        default_variant: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            key: key.into(),
            kind,
            default_variant: default_variant.into(),
            enabled: true,
            rollout_key: None,
            created_at: Utc::now(),
            variants: Vec::new(),
            rules: Vec::new(),
            schedules: Vec::new(),
        }
    }

    /// Set the master switch
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set rollout attribute
    pub fn with_rollout_key(mut self, attribute: impl Into<String>) -> Self {
        self.rollout_key = Some(attribute.into());
        self
    }

    /// Set creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Add targeting rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add schedule
    pub fn with_schedule(mut self, schedule: FeatureSchedule) -> Self {
        self.schedules.push(schedule);
        self
    }

    /// Look up a variant by ID
    pub fn variant(&self, id: Uuid) -> Option<&FlagVariant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Rules in evaluation order: ascending priority, list order for ties.
    pub fn rules_by_priority(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by_key(|rule| rule.priority);
        rules
    }

    /// First rule (by priority) whose conditions match the context.
    pub fn first_matching_rule(&self, context: &EvaluationContext) -> Option<&Rule> {
        self.rules_by_priority()
            .into_iter()
            .find(|rule| rule.matches(context))
    }
}

/// Feature kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// On/off flag; rules are never consulted
    #[serde(alias = "simple")]
    Boolean,
    /// Flag serving one of several named variants
    Multivariant,
}

/// Named traffic bucket of a multivariant feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagVariant {
    /// Variant ID
    pub id: Uuid,

    /// Value served to callers in this bucket
    pub name: String,

    /// Share of traffic in percent (0-100)
    #[serde(default)]
    pub rollout_percent: u8,
}

impl FlagVariant {
    /// Create a new variant; percentages above 100 are clamped
    pub fn new(name: impl Into<String>, rollout_percent: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rollout_percent: rollout_percent.min(100),
        }
    }
}

/// What a matching rule does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Serve the rule's target variant
    Assign,
    /// Bucket the caller across variants
    Include,
    /// Serve the default variant
    Exclude,
}

/// Targeting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule ID
    pub id: Uuid,

    /// Lower values are evaluated first
    pub priority: i32,

    /// Condition tree; always matches when absent
    #[serde(default)]
    pub conditions: Expression,

    /// Action taken on match
    pub action: RuleAction,

    /// Target variant; required for [`RuleAction::Assign`]
    #[serde(default)]
    pub variant_id: Option<Uuid>,
}

impl Rule {
    /// Create a new unconditional rule
    pub fn new(priority: i32, action: RuleAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            conditions: Expression::Always,
            action,
            variant_id: None,
        }
    }

    /// Create an assign rule targeting a variant
    pub fn assign(priority: i32, variant_id: Uuid) -> Self {
        Self {
            variant_id: Some(variant_id),
            ..Self::new(priority, RuleAction::Assign)
        }
    }

    /// Create an include rule
    pub fn include(priority: i32) -> Self {
        Self::new(priority, RuleAction::Include)
    }

    /// Create an exclude rule
    pub fn exclude(priority: i32) -> Self {
        Self::new(priority, RuleAction::Exclude)
    }

    /// Set the condition tree
    pub fn with_conditions(mut self, conditions: impl Into<Expression>) -> Self {
        self.conditions = conditions.into();
        self
    }

    /// Check the rule's conditions against a context
    pub fn matches(&self, context: &EvaluationContext) -> bool {
        self.conditions.matches(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;
    use serde_json::json;

    #[test]
    fn test_rules_sorted_by_priority_stable() {
        let project = Uuid::new_v4();
        let first_tie = Rule::exclude(5);
        let second_tie = Rule::include(5);
        let feature = Feature::multivariant(project, "checkout", "control", vec![])
            .with_rule(Rule::exclude(10))
            .with_rule(first_tie.clone())
            .with_rule(Rule::include(-1))
            .with_rule(second_tie.clone());

        let order: Vec<i32> = feature.rules_by_priority().iter().map(|r| r.priority).collect();
        assert_eq!(order, vec![-1, 5, 5, 10]);

        let ties: Vec<Uuid> = feature
            .rules_by_priority()
            .iter()
            .filter(|r| r.priority == 5)
            .map(|r| r.id)
            .collect();
        assert_eq!(ties, vec![first_tie.id, second_tie.id]);
    }

    #[test]
    fn test_first_matching_rule() {
        let feature = Feature::multivariant(Uuid::new_v4(), "checkout", "control", vec![])
            .with_rule(Rule::exclude(1).with_conditions(Expression::condition(
                "country",
                Operator::Eq,
                "FR",
            )))
            .with_rule(Rule::include(2));

        let de = EvaluationContext::new().with_attribute("country", "DE");
        let fr = EvaluationContext::new().with_attribute("country", "FR");
        assert_eq!(feature.first_matching_rule(&de).map(|r| r.action), Some(RuleAction::Include));
        assert_eq!(feature.first_matching_rule(&fr).map(|r| r.action), Some(RuleAction::Exclude));
    }

    #[test]
    fn test_variant_percent_is_clamped() {
        assert_eq!(FlagVariant::new("big", 250).rollout_percent, 100);
    }

    #[test]
    fn test_feature_from_json() {
        let variant_id = Uuid::new_v4();
        let feature: Feature = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "project_id": Uuid::new_v4(),
            "key": "banner",
            "kind": "simple",
            "default_variant": "on",
            "enabled": true,
            "created_at": "2024-01-01T00:00:00Z",
            "variants": [{"id": variant_id, "name": "on", "rollout_percent": 100}],
            "rules": [{
                "id": Uuid::new_v4(),
                "priority": 1,
                "action": "assign",
                "variant_id": variant_id
            }]
        }))
        .unwrap();

        assert_eq!(feature.kind, FeatureKind::Boolean);
        assert_eq!(feature.rules[0].conditions, Expression::Always);
        assert_eq!(feature.variant(variant_id).map(|v| v.name.as_str()), Some("on"));
        assert!(feature.schedules.is_empty());
        assert!(feature.rollout_key.is_none());
    }
}
