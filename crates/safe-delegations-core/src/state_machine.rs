use serde::{Deserialize, Serialize};

use crate::domain::{DelegationStatus, ScopeType};
use crate::ports::PortError;
use crate::scope::PermissionScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardStep {
    SelectCategory,
    Configure,
    Review,
    AwaitingSignature,
    Granted,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Choose,
    Submit,
    Back,
    Confirm,
    Signed,
    Reject,
    Cancel,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTransition {
    pub from: WizardStep,
    pub to: WizardStep,
    pub reason: &'static str,
}

pub fn wizard_transition(
    step: WizardStep,
    action: WizardAction,
) -> Result<(WizardStep, StepTransition), PortError> {
    use WizardAction as A;
    use WizardStep as S;

    let (to, reason) = match (step, action) {
        (S::SelectCategory, A::Choose) => (S::Configure, "category_chosen"),
        (S::Configure, A::Submit) => (S::Review, "config_submitted"),
        (S::Configure, A::Back) => (S::SelectCategory, "back_to_categories"),
        (S::Review, A::Back) => (S::Configure, "back_to_config"),
        (S::Review, A::Confirm) => (S::AwaitingSignature, "signature_requested"),
        (S::AwaitingSignature, A::Signed) => (S::Granted, "signature_received"),
        (S::AwaitingSignature, A::Reject) => (S::Failed, "signature_rejected"),
        (S::Failed, A::Retry) => (S::Review, "retry"),
        (S::Granted | S::Cancelled, _) => {
            return Err(PortError::Validation(format!(
                "illegal wizard transition: {step:?} is final"
            )))
        }
        (_, A::Cancel) => (S::Cancelled, "cancelled"),
        _ => {
            return Err(PortError::Validation(format!(
                "illegal wizard transition: {step:?} -> {action:?}"
            )))
        }
    };
    Ok((
        to,
        StepTransition {
            from: step,
            to,
            reason,
        },
    ))
}

pub fn status_transition(
    from: DelegationStatus,
    to: DelegationStatus,
) -> Result<DelegationStatus, PortError> {
    use DelegationStatus as St;
    match (from, to) {
        (St::Pending, St::Signed)
        | (St::Pending, St::Revoked)
        | (St::Signed, St::Revoked)
        | (St::Signed, St::Expired) => Ok(to),
        _ => Err(PortError::Validation(format!(
            "illegal status transition: {from:?} -> {to:?}"
        ))),
    }
}

/// Permission wizard: a linear form whose draft is typed per category.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    category: Option<ScopeType>,
    scope: Option<PermissionScope>,
    history: Vec<StepTransition>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::SelectCategory,
            category: None,
            scope: None,
            history: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn category(&self) -> Option<ScopeType> {
        self.category
    }

    pub fn scope(&self) -> Option<&PermissionScope> {
        self.scope.as_ref()
    }

    pub fn history(&self) -> &[StepTransition] {
        &self.history
    }

    fn apply(&mut self, action: WizardAction) -> Result<(), PortError> {
        let (next, transition) = wizard_transition(self.step, action)?;
        self.step = next;
        self.history.push(transition);
        Ok(())
    }

    pub fn choose(&mut self, category: ScopeType) -> Result<(), PortError> {
        if category == ScopeType::SwapExecution {
            return Err(PortError::Validation(
                "swap execution links are derived, not chosen".to_owned(),
            ));
        }
        self.apply(WizardAction::Choose)?;
        self.category = Some(category);
        Ok(())
    }

    /// Accepts the form only when it matches the chosen category and validates.
    pub fn submit(&mut self, scope: PermissionScope, now_secs: u64) -> Result<(), PortError> {
        if self.step != WizardStep::Configure {
            return Err(PortError::Validation(format!(
                "illegal wizard transition: {:?} -> Submit",
                self.step
            )));
        }
        if Some(scope.scope_type()) != self.category {
            return Err(PortError::Validation(format!(
                "config for {:?} submitted while {:?} is selected",
                scope.scope_type(),
                self.category
            )));
        }
        scope.validate(now_secs)?;
        self.apply(WizardAction::Submit)?;
        self.scope = Some(scope);
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), PortError> {
        self.apply(WizardAction::Back)?;
        if self.step == WizardStep::SelectCategory {
            self.category = None;
            self.scope = None;
        }
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<&PermissionScope, PortError> {
        self.apply(WizardAction::Confirm)?;
        self.scope
            .as_ref()
            .ok_or_else(|| PortError::Validation("no reviewed config".to_owned()))
    }

    pub fn signed(&mut self) -> Result<(), PortError> {
        self.apply(WizardAction::Signed)
    }

    pub fn reject(&mut self) -> Result<(), PortError> {
        self.apply(WizardAction::Reject)
    }

    pub fn retry(&mut self) -> Result<(), PortError> {
        self.apply(WizardAction::Retry)
    }

    pub fn cancel(&mut self) -> Result<(), PortError> {
        self.apply(WizardAction::Cancel)
    }
}
