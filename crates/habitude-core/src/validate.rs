use thiserror::Error;
use uuid::Uuid;

/// A single broken habit rule. `Display` gives the user-facing message;
/// `field` names the offending field for structured error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("execution_time must not exceed 120 seconds")]
    ExecutionTimeTooLong,
    #[error("periodicity must be at least 7 days")]
    PeriodicityTooFrequent,
    #[error("a habit may carry a reward or a linked habit, not both")]
    RewardAndLink,
    #[error("linked_habit must reference a pleasant habit")]
    LinkNotPleasant,
    #[error("a pleasant habit cannot have a reward or a linked habit")]
    PleasantWithRewardOrLink,
}

impl Violation {
    pub fn field(&self) -> &'static str {
        match self {
            Violation::ExecutionTimeTooLong => "execution_time",
            Violation::PeriodicityTooFrequent => "periodicity",
            Violation::RewardAndLink => "reward",
            Violation::LinkNotPleasant => "linked_habit",
            Violation::PleasantWithRewardOrLink => "is_pleasant",
        }
    }
}

/// The rule-relevant slice of a habit record. Callers resolve the full
/// merged field set first (stored values overlaid with the proposed
/// changes) so updates are validated as whole records, not deltas.
#[derive(Debug, Clone)]
pub struct HabitCandidate {
    pub is_pleasant: bool,
    pub linked_habit: Option<Uuid>,
    pub periodicity: u32,
    pub reward: Option<String>,
    pub execution_time: u32,
}

impl HabitCandidate {
    /// An empty-string reward counts as no reward at all.
    fn has_reward(&self) -> bool {
        self.reward.as_deref().is_some_and(|r| !r.is_empty())
    }
}

/// Check a candidate against every habit rule, collecting all violations
/// rather than stopping at the first, so one rejection reports every
/// problem in the submission.
///
/// `linked_is_pleasant` is the `is_pleasant` flag of the referenced habit
/// and must be supplied whenever `linked_habit` is set.
pub fn validate(
    candidate: &HabitCandidate,
    linked_is_pleasant: Option<bool>,
) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    if candidate.execution_time > 120 {
        violations.push(Violation::ExecutionTimeTooLong);
    }
    if candidate.periodicity < 7 {
        violations.push(Violation::PeriodicityTooFrequent);
    }
    if candidate.has_reward() && candidate.linked_habit.is_some() {
        violations.push(Violation::RewardAndLink);
    }
    if candidate.linked_habit.is_some() && linked_is_pleasant == Some(false) {
        violations.push(Violation::LinkNotPleasant);
    }
    if candidate.is_pleasant && (candidate.has_reward() || candidate.linked_habit.is_some()) {
        violations.push(Violation::PleasantWithRewardOrLink);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
