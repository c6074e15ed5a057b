// Flagline - feature flag evaluation and schedule timelines
//
// This library answers two questions from the same in-memory feature data:
// "which variant does this caller get right now" and "when was this feature on".

// Re-export the evaluation engine
pub use flagline_features::*;

// Re-export cron support
pub use flagline_cron;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Condition,
        EngineConfig,
        EngineError,
        EngineResult,
        Evaluation,
        EvaluationContext,
        EvaluationReason,
        Evaluator,
        Expression,
        Feature,
        FeatureKind,
        FeatureSchedule,
        FlagVariant,
        Operator,
        Rule,
        RuleAction,
        ScheduleAction,
        Snapshot,
        SnapshotHolder,
        TimelineBuilder,
        TimelineEvent,
    };
    pub use flagline_cron::{CronError, CronExpression};
}
