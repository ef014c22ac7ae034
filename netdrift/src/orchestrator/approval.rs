//! The operator's say in the fix phase.

use crate::diff::Problem;
use crate::fix::FixPlan;

/// What to do with one proposed fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Send the plan to the device.
    Apply,
    /// Leave this problem alone and move on.
    Decline,
    /// Leave this and every remaining problem on the device alone.
    SkipDevice,
}

/// Decides, problem by problem, whether a fix is applied.
///
/// Plans that need manual intervention are never offered.
///
/// Any `FnMut(&Problem, &FixPlan) -> Decision` closure is an approval:
///
/// ```rust
/// use netdrift::orchestrator::{Approval, Decision};
/// use netdrift::diff::{Problem, ProblemType};
/// use netdrift::fix::FixPlan;
///
/// fn only_shutdowns() -> impl Approval {
///     |problem: &Problem, _plan: &FixPlan| {
///         if problem.problem_type() == ProblemType::InterfaceShutdown {
///             Decision::Apply
///         } else {
///             Decision::Decline
///         }
///     }
/// }
/// ```
pub trait Approval {
    fn decide(&mut self, problem: &Problem, plan: &FixPlan) -> Decision;
}

impl<F> Approval for F
where
    F: FnMut(&Problem, &FixPlan) -> Decision,
{
    fn decide(&mut self, problem: &Problem, plan: &FixPlan) -> Decision {
        self(problem, plan)
    }
}

/// Applies every fix without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Approval for AutoApprove {
    fn decide(&mut self, _problem: &Problem, _plan: &FixPlan) -> Decision {
        Decision::Apply
    }
}
