//! Static task catalog
//!
//! The catalog is fixed configuration consulted by every other stage:
//! behavior kind, daily goal, input bounds, and the impact weight used to
//! normalize contributions across tasks. Two disjoint groups exist: "dos"
//! (positive-framed) and "don'ts" (inverted). Sleep and meals are
//! dual-direction dos: under-performing them pulls the score down.

use crate::types::{BehaviorKind, Polarity, TaskDefinition, TaskId};

/// The shipped catalog. Loaded once, looked up by id, never mutated.
static CATALOG: [TaskDefinition; 8] = [
    TaskDefinition {
        id: TaskId::SunExposure,
        kind: BehaviorKind::Slider,
        polarity: Polarity::Do,
        goal: 30.0,
        max_value: 120.0,
        step: 5.0,
        impact_weight: 15.0,
        dual_direction: false,
    },
    TaskDefinition {
        id: TaskId::Exercise,
        kind: BehaviorKind::Simple,
        polarity: Polarity::Do,
        goal: 1.0,
        max_value: 1.0,
        step: 1.0,
        impact_weight: 30.0,
        dual_direction: false,
    },
    TaskDefinition {
        id: TaskId::Sleep,
        kind: BehaviorKind::SleepSlider,
        polarity: Polarity::Do,
        goal: 8.0,
        max_value: 12.0,
        step: 0.5,
        impact_weight: 25.0,
        dual_direction: true,
    },
    TaskDefinition {
        id: TaskId::Meals,
        kind: BehaviorKind::MealLog,
        polarity: Polarity::Do,
        goal: 3.0,
        max_value: 5.0,
        step: 1.0,
        impact_weight: 35.0,
        dual_direction: true,
    },
    TaskDefinition {
        id: TaskId::Supplements,
        kind: BehaviorKind::Checklist { item_count: 4 },
        polarity: Polarity::Do,
        goal: 4.0,
        max_value: 4.0,
        step: 1.0,
        impact_weight: 20.0,
        dual_direction: false,
    },
    TaskDefinition {
        id: TaskId::Alcohol,
        kind: BehaviorKind::Slider,
        polarity: Polarity::Dont,
        goal: 0.0,
        max_value: 10.0,
        step: 1.0,
        impact_weight: 40.0,
        dual_direction: false,
    },
    TaskDefinition {
        id: TaskId::Stress,
        kind: BehaviorKind::Slider,
        polarity: Polarity::Dont,
        goal: 3.0,
        max_value: 10.0,
        step: 1.0,
        impact_weight: 25.0,
        dual_direction: false,
    },
    TaskDefinition {
        id: TaskId::Abstinence,
        kind: BehaviorKind::Simple,
        polarity: Polarity::Dont,
        goal: 0.0,
        max_value: 1.0,
        step: 1.0,
        impact_weight: 30.0,
        dual_direction: false,
    },
];

/// Look up a task definition by id.
///
/// Returns `None` for ids the catalog no longer (or does not yet) carry;
/// callers skip such data rather than erroring, so old logs stay loadable
/// across catalog revisions.
pub fn definition_of(task: &TaskId) -> Option<&'static TaskDefinition> {
    CATALOG.iter().find(|def| &def.id == task)
}

/// All catalog definitions, in display order.
pub fn all_definitions() -> &'static [TaskDefinition] {
    &CATALOG
}

/// Sum of impact weights over all "do" definitions.
pub fn total_positive_impact() -> f64 {
    CATALOG
        .iter()
        .filter(|def| def.polarity == Polarity::Do)
        .map(|def| def.impact_weight)
        .sum()
}

/// Sum of impact weights over everything that can pull the score down:
/// the "don'ts" plus the dual-direction dos.
pub fn total_negative_impact() -> f64 {
    CATALOG
        .iter()
        .filter(|def| def.counts_negative())
        .map(|def| def.impact_weight)
        .sum()
}
