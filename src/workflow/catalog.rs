use std::collections::{BTreeSet, HashMap};

use super::store::StepRepository;
use crate::errors::AppError;
use crate::models::step::{Step, StepInfo, StepTransitionResult, Workflow};

/// In-memory step graph.
///
/// Nodes are steps in catalog order (`step_order`, then `step_id`). Edges come
/// from workflows: within each workflow the following step is a forward
/// ("next") transition and the preceding step a backward ("back") one. Edges
/// from every workflow containing a step are merged.
#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    steps: Vec<Step>,
    position: HashMap<i64, usize>,
    next: HashMap<i64, BTreeSet<usize>>,
    back: HashMap<i64, BTreeSet<usize>>,
}

impl StepCatalog {
    pub fn new(mut steps: Vec<Step>, workflows: &[Workflow]) -> Self {
        steps.sort_by_key(|s| (s.step_order, s.step_id));
        let position: HashMap<i64, usize> = steps
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.step_id, pos))
            .collect();

        let mut next: HashMap<i64, BTreeSet<usize>> = HashMap::new();
        let mut back: HashMap<i64, BTreeSet<usize>> = HashMap::new();

        for workflow in workflows {
            for pair in workflow.steps.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                if from == to {
                    continue;
                }
                // Workflows referencing steps outside the catalog contribute no edges.
                let (Some(&from_pos), Some(&to_pos)) = (position.get(&from), position.get(&to)) else {
                    continue;
                };
                next.entry(from).or_default().insert(to_pos);
                back.entry(to).or_default().insert(from_pos);
            }
        }

        Self { steps, position, next, back }
    }

    /// Build the catalog from the current steps and workflows.
    pub async fn load(repo: &dyn StepRepository) -> Result<Self, AppError> {
        let steps = repo.list_steps().await?;
        let workflows = repo.list_workflows().await?;
        Ok(Self::new(steps, &workflows))
    }

    pub fn contains(&self, step_id: i64) -> bool {
        self.position.contains_key(&step_id)
    }

    /// Allowed forward and backward steps from `current_step_id`, each in
    /// catalog order. Inactive steps are never offered.
    pub fn transitions(&self, current_step_id: i64) -> Result<StepTransitionResult, AppError> {
        if !self.contains(current_step_id) {
            return Err(AppError::StepNotFound(current_step_id));
        }

        Ok(StepTransitionResult {
            next_steps: self.collect(self.next.get(&current_step_id), current_step_id),
            back_steps: self.collect(self.back.get(&current_step_id), current_step_id),
        })
    }

    fn collect(&self, positions: Option<&BTreeSet<usize>>, current_step_id: i64) -> Vec<StepInfo> {
        positions
            .into_iter()
            .flatten()
            .map(|&pos| &self.steps[pos])
            .filter(|s| s.step_id != current_step_id && s.is_active())
            .map(Step::info)
            .collect()
    }
}
