//! Step progression for the poster workflow.
//!
//! The machine is forward-only. Every transition first records the step being
//! left in the completed set, then moves on; nothing is ever removed.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowStep {
    Upload,
    Ratio,
    Concept,
    Edit,
    Download,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 5] = [
        WorkflowStep::Upload,
        WorkflowStep::Ratio,
        WorkflowStep::Concept,
        WorkflowStep::Edit,
        WorkflowStep::Download,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkflowStep::Upload => "Upload",
            WorkflowStep::Ratio => "Ratio",
            WorkflowStep::Concept => "Concept",
            WorkflowStep::Edit => "Edit",
            WorkflowStep::Download => "Download",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a step should be drawn in the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepProgress {
    pub step: WorkflowStep,
    /// 1-based position shown next to the label
    pub number: usize,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    current: WorkflowStep,
    completed: BTreeSet<WorkflowStep>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self {
            current: WorkflowStep::Upload,
            completed: BTreeSet::new(),
        }
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> WorkflowStep {
        self.current
    }

    pub fn completed(&self) -> &BTreeSet<WorkflowStep> {
        &self.completed
    }

    pub fn is_completed(&self, step: WorkflowStep) -> bool {
        self.completed.contains(&step)
    }

    fn advance(&mut self, next: WorkflowStep) {
        debug_assert!(next > self.current, "workflow only moves forward");
        self.completed.insert(self.current);
        self.current = next;
    }

    /// Background removal succeeded. Returns whether the step changed.
    pub fn on_image_processed(&mut self) -> bool {
        if self.current == WorkflowStep::Upload {
            self.advance(WorkflowStep::Ratio);
            true
        } else {
            false
        }
    }

    /// A ratio was picked; only moves on while the user is on `Ratio`.
    pub fn on_ratio_selected(&mut self) -> bool {
        if self.current == WorkflowStep::Ratio {
            self.advance(WorkflowStep::Concept);
            true
        } else {
            false
        }
    }

    /// A poster was generated. The target depends on where the user is
    /// right now, not on how many posters exist.
    pub fn on_poster_generated(&mut self) -> bool {
        match self.current {
            WorkflowStep::Ratio | WorkflowStep::Concept => {
                self.advance(WorkflowStep::Edit);
                true
            }
            WorkflowStep::Edit => {
                self.advance(WorkflowStep::Download);
                true
            }
            WorkflowStep::Upload | WorkflowStep::Download => false,
        }
    }

    pub fn progress(&self) -> Vec<StepProgress> {
        let current_index = self.current.index();
        WorkflowStep::ALL
            .iter()
            .map(|&step| {
                let status = if step == self.current {
                    StepStatus::Active
                } else if self.is_completed(step) || step.index() < current_index {
                    StepStatus::Completed
                } else {
                    StepStatus::Pending
                };
                StepProgress {
                    step,
                    number: step.index() + 1,
                    status,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(step: WorkflowStep) -> Workflow {
        let mut wf = Workflow::new();
        for next in WorkflowStep::ALL.iter().skip(1) {
            if wf.current() == step {
                break;
            }
            wf.advance(*next);
        }
        wf
    }

    #[test]
    fn starts_on_upload_with_nothing_completed() {
        let wf = Workflow::new();
        assert_eq!(wf.current(), WorkflowStep::Upload);
        assert!(wf.completed().is_empty());
    }

    #[test]
    fn image_processing_moves_upload_to_ratio() {
        let mut wf = Workflow::new();
        assert!(wf.on_image_processed());
        assert_eq!(wf.current(), WorkflowStep::Ratio);
        assert!(wf.is_completed(WorkflowStep::Upload));

        // A re-upload later on never moves backwards.
        let mut wf = at(WorkflowStep::Edit);
        assert!(!wf.on_image_processed());
        assert_eq!(wf.current(), WorkflowStep::Edit);
    }

    #[test]
    fn ratio_selection_advances_once() {
        let mut wf = at(WorkflowStep::Ratio);
        assert!(wf.on_ratio_selected());
        assert_eq!(wf.current(), WorkflowStep::Concept);
        assert!(!wf.on_ratio_selected());
        assert_eq!(wf.current(), WorkflowStep::Concept);
    }

    #[test]
    fn ratio_selection_is_ignored_off_the_ratio_step() {
        for step in [WorkflowStep::Upload, WorkflowStep::Concept, WorkflowStep::Edit] {
            let mut wf = at(step);
            assert!(!wf.on_ratio_selected());
            assert_eq!(wf.current(), step);
        }
    }

    #[test]
    fn generation_depends_on_current_step() {
        let mut wf = at(WorkflowStep::Concept);
        assert!(wf.on_poster_generated());
        assert_eq!(wf.current(), WorkflowStep::Edit);
        assert!(wf.on_poster_generated());
        assert_eq!(wf.current(), WorkflowStep::Download);
        assert!(!wf.on_poster_generated());
        assert_eq!(wf.current(), WorkflowStep::Download);

        // Generating straight from Ratio skips Concept in the completed set.
        let mut wf = at(WorkflowStep::Ratio);
        assert!(wf.on_poster_generated());
        assert_eq!(wf.current(), WorkflowStep::Edit);
        assert!(wf.is_completed(WorkflowStep::Ratio));
        assert!(!wf.is_completed(WorkflowStep::Concept));

        let mut wf = Workflow::new();
        assert!(!wf.on_poster_generated());
        assert_eq!(wf.current(), WorkflowStep::Upload);
    }

    #[test]
    fn completed_set_only_grows() {
        let mut wf = Workflow::new();
        let mut seen = BTreeSet::new();
        let events: [fn(&mut Workflow) -> bool; 7] = [
            Workflow::on_ratio_selected,
            Workflow::on_image_processed,
            Workflow::on_image_processed,
            Workflow::on_ratio_selected,
            Workflow::on_poster_generated,
            Workflow::on_ratio_selected,
            Workflow::on_poster_generated,
        ];
        for event in events {
            event(&mut wf);
            assert!(wf.completed().is_superset(&seen));
            seen = wf.completed().clone();
        }
        assert_eq!(wf.current(), WorkflowStep::Download);
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn progress_marks_steps_before_current_as_completed() {
        let mut wf = at(WorkflowStep::Ratio);
        wf.on_poster_generated();

        let statuses: Vec<_> = wf.progress().into_iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Completed,
                StepStatus::Completed,
                StepStatus::Completed,
                StepStatus::Active,
                StepStatus::Pending,
            ]
        );
        assert_eq!(wf.progress()[3].number, 4);
    }
}
