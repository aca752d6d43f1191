//! Step descriptors and plans.
//!
//! A plan is an ordered, branch-free list of steps. Each step names the
//! milestone the flow reaches once it succeeds, so a failure can be reported
//! against the step that caused it.

use std::collections::HashSet;
use std::fmt;

use gridproof_common::{GridproofError, Result};
use gridproof_config::{FlowConfig, StepSpec, TargetSpec};
use gridproof_drivers::Target;
use serde::{Serialize, Serializer};

pub const NEW_GAME_BUTTON: &str = "New Game";
pub const DIFFICULTY_LABEL: &str = "Difficulty";
pub const HARD_DIFFICULTY: &str = "Hard";
pub const FIRST_PUZZLE_BUTTON: &str = "New Puzzle 1";
/// First cell input of the board rendered under the game root.
pub const BOARD_CELL_SELECTOR: &str = "#sudoku .sudoku-board-cell input";

/// What a step does.
///
/// Serializes in the same shape as a configured step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Navigate,
    Click {
        #[serde(serialize_with = "as_target_spec")]
        target: Target,
    },
    #[serde(rename = "select")]
    SelectOption {
        #[serde(serialize_with = "as_target_spec")]
        target: Target,
        option: String,
    },
    /// Poll until the first match has a non-empty `value`.
    WaitForValue {
        #[serde(serialize_with = "as_target_spec")]
        target: Target,
    },
    Screenshot,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate => "navigate",
            Action::Click { .. } => "click",
            Action::SelectOption { .. } => "select",
            Action::WaitForValue { .. } => "wait_for_value",
            Action::Screenshot => "screenshot",
        }
    }
}

/// State reached after a step completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Milestone {
    Navigated,
    DialogOpened,
    DifficultySelected,
    PuzzleSelected,
    BoardPopulated,
    ArtifactCaptured,
    /// Milestone of a configured step, named after the step.
    Completed(String),
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Milestone::Navigated => f.write_str("Navigated"),
            Milestone::DialogOpened => f.write_str("DialogOpened"),
            Milestone::DifficultySelected => f.write_str("DifficultySelected"),
            Milestone::PuzzleSelected => f.write_str("PuzzleSelected"),
            Milestone::BoardPopulated => f.write_str("BoardPopulated"),
            Milestone::ArtifactCaptured => f.write_str("ArtifactCaptured"),
            Milestone::Completed(step) => write!(f, "Completed({step})"),
        }
    }
}

impl Serialize for Milestone {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub name: String,
    #[serde(flatten)]
    pub action: Action,
    pub milestone: Milestone,
}

impl Step {
    pub fn new(name: impl Into<String>, action: Action, milestone: Milestone) -> Self {
        Self {
            name: name.into(),
            action,
            milestone,
        }
    }
}

/// Ordered list of steps executed by a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowPlan {
    steps: Vec<Step>,
}

impl FlowPlan {
    /// The new-puzzle journey: open the New Game dialog, pick Hard, start the
    /// first puzzle, wait for the board, capture it.
    ///
    /// ```
    /// use gridproof_flow::step::{FlowPlan, Milestone};
    ///
    /// let plan = FlowPlan::new_puzzle();
    /// assert_eq!(plan.len(), 6);
    /// assert_eq!(plan.steps()[5].milestone, Milestone::ArtifactCaptured);
    /// ```
    pub fn new_puzzle() -> Self {
        Self {
            steps: vec![
                Step::new("navigate", Action::Navigate, Milestone::Navigated),
                Step::new(
                    "open-new-game",
                    Action::Click {
                        target: Target::button(NEW_GAME_BUTTON),
                    },
                    Milestone::DialogOpened,
                ),
                Step::new(
                    "select-difficulty",
                    Action::SelectOption {
                        target: Target::label(DIFFICULTY_LABEL),
                        option: HARD_DIFFICULTY.to_string(),
                    },
                    Milestone::DifficultySelected,
                ),
                Step::new(
                    "start-puzzle",
                    Action::Click {
                        target: Target::button(FIRST_PUZZLE_BUTTON),
                    },
                    Milestone::PuzzleSelected,
                ),
                Step::new(
                    "await-board",
                    Action::WaitForValue {
                        target: Target::css(BOARD_CELL_SELECTOR),
                    },
                    Milestone::BoardPopulated,
                ),
                Step::new("capture", Action::Screenshot, Milestone::ArtifactCaptured),
            ],
        }
    }

    /// Build and validate a plan from configured step descriptors.
    pub fn from_specs(specs: &[StepSpec]) -> Result<Self> {
        let steps = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| step_from_spec(index, spec))
            .collect();
        let plan = Self { steps };
        plan.validate()?;
        Ok(plan)
    }

    /// Configured steps when present, otherwise [`new_puzzle`](Self::new_puzzle).
    pub fn from_config(flow: &FlowConfig) -> Result<Self> {
        match &flow.steps {
            Some(specs) => Self::from_specs(specs),
            None => Ok(Self::new_puzzle()),
        }
    }

    /// Structural checks run before any browser is touched.
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.steps.first() else {
            return Err(GridproofError::InvalidPlan("plan has no steps".into()));
        };
        if first.action != Action::Navigate {
            return Err(GridproofError::InvalidPlan(format!(
                "first step must navigate, found {:?} ({})",
                first.name,
                first.action.kind()
            )));
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(GridproofError::InvalidPlan(format!(
                    "duplicate step name {:?}",
                    step.name
                )));
            }
        }

        let captures: Vec<usize> = self
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.action == Action::Screenshot)
            .map(|(i, _)| i)
            .collect();
        match captures.as_slice() {
            [] => Ok(()),
            [only] if *only == self.steps.len() - 1 => Ok(()),
            [_] => Err(GridproofError::InvalidPlan(
                "screenshot must be the last step".into(),
            )),
            _ => Err(GridproofError::InvalidPlan(
                "at most one screenshot step is allowed".into(),
            )),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn as_target_spec<S: Serializer>(target: &Target, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let spec = match target {
        Target::Role { role, name } => TargetSpec::Role {
            role: role.clone(),
            name: name.clone(),
        },
        Target::Label(label) => TargetSpec::Label {
            label: label.clone(),
        },
        Target::Css(css) => TargetSpec::Css { css: css.clone() },
    };
    spec.serialize(serializer)
}

fn target_from_spec(spec: &TargetSpec) -> Target {
    match spec {
        TargetSpec::Role { role, name } => Target::role(role.clone(), name.clone()),
        TargetSpec::Label { label } => Target::label(label.clone()),
        TargetSpec::Css { css } => Target::css(css.clone()),
    }
}

fn step_from_spec(index: usize, spec: &StepSpec) -> Step {
    let (id, action) = match spec {
        StepSpec::Navigate { id } => (id, Action::Navigate),
        StepSpec::Click { id, target } => (
            id,
            Action::Click {
                target: target_from_spec(target),
            },
        ),
        StepSpec::Select { id, target, option } => (
            id,
            Action::SelectOption {
                target: target_from_spec(target),
                option: option.clone(),
            },
        ),
        StepSpec::WaitForValue { id, target } => (
            id,
            Action::WaitForValue {
                target: target_from_spec(target),
            },
        ),
        StepSpec::Screenshot { id } => (id, Action::Screenshot),
    };
    let name = id
        .clone()
        .unwrap_or_else(|| format!("{}-{}", index + 1, action.kind()));
    let milestone = Milestone::Completed(name.clone());
    Step::new(name, action, milestone)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(name: &str) -> StepSpec {
        StepSpec::Click {
            id: None,
            target: TargetSpec::Role {
                role: "button".into(),
                name: name.into(),
            },
        }
    }

    #[test]
    fn default_plan_is_valid_and_ordered() {
        let plan = FlowPlan::new_puzzle();
        plan.validate().unwrap();
        let milestones: Vec<String> = plan.steps().iter().map(|s| s.milestone.to_string()).collect();
        assert_eq!(
            milestones,
            [
                "Navigated",
                "DialogOpened",
                "DifficultySelected",
                "PuzzleSelected",
                "BoardPopulated",
                "ArtifactCaptured"
            ]
        );
        assert_eq!(
            plan.steps()[4].action,
            Action::WaitForValue {
                target: Target::css(BOARD_CELL_SELECTOR)
            }
        );
    }

    #[test]
    fn configured_steps_get_positional_names() {
        let plan = FlowPlan::from_specs(&[
            StepSpec::Navigate { id: None },
            click("Start"),
            StepSpec::Screenshot {
                id: Some("shot".into()),
            },
        ])
        .unwrap();
        let names: Vec<&str> = plan.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["1-navigate", "2-click", "shot"]);
        assert_eq!(plan.steps()[2].milestone, Milestone::Completed("shot".into()));
    }

    #[test]
    fn empty_plan_is_rejected() {
        assert!(matches!(
            FlowPlan::from_specs(&[]),
            Err(GridproofError::InvalidPlan(_))
        ));
    }

    #[test]
    fn plan_must_start_with_navigation() {
        let err = FlowPlan::from_specs(&[click("Start"), StepSpec::Navigate { id: None }]).unwrap_err();
        assert!(err.to_string().contains("first step must navigate"));
    }

    #[test]
    fn screenshot_must_be_last() {
        let err = FlowPlan::from_specs(&[
            StepSpec::Navigate { id: None },
            StepSpec::Screenshot { id: None },
            click("Start"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("last step"));
    }

    #[test]
    fn only_one_screenshot() {
        let err = FlowPlan::from_specs(&[
            StepSpec::Navigate { id: None },
            StepSpec::Screenshot { id: Some("a".into()) },
            StepSpec::Screenshot { id: Some("b".into()) },
        ])
        .unwrap_err();
        assert!(err.to_string().contains("at most one"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = FlowPlan::from_specs(&[
            StepSpec::Navigate { id: Some("x".into()) },
            StepSpec::Click {
                id: Some("x".into()),
                target: TargetSpec::Css { css: "#go".into() },
            },
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn missing_flow_section_falls_back_to_default_plan() {
        let plan = FlowPlan::from_config(&FlowConfig::default()).unwrap();
        assert_eq!(plan, FlowPlan::new_puzzle());
    }

    #[test]
    fn configured_targets_keep_their_locator_kind() {
        let plan = FlowPlan::from_specs(&[
            StepSpec::Navigate { id: None },
            StepSpec::Select {
                id: None,
                target: TargetSpec::Label {
                    label: "Difficulty".into(),
                },
                option: "Hard".into(),
            },
            StepSpec::WaitForValue {
                id: None,
                target: TargetSpec::Css {
                    css: BOARD_CELL_SELECTOR.into(),
                },
            },
        ])
        .unwrap();
        assert_eq!(
            plan.steps()[1].action,
            Action::SelectOption {
                target: Target::label("Difficulty"),
                option: "Hard".into(),
            }
        );
        assert_eq!(
            plan.steps()[2].action,
            Action::WaitForValue {
                target: Target::css(BOARD_CELL_SELECTOR)
            }
        );
    }

    #[test]
    fn plan_serializes_with_flat_actions() {
        let json = serde_json::to_value(FlowPlan::new_puzzle()).unwrap();
        let step = &json["steps"][2];
        assert_eq!(step["name"], "select-difficulty");
        assert_eq!(step["action"], "select");
        assert_eq!(step["target"]["label"], "Difficulty");
        assert_eq!(step["option"], "Hard");
        assert_eq!(json["steps"][1]["target"]["name"], "New Game");
        assert_eq!(step["milestone"], "DifficultySelected");
    }
}
