//! Multi-step form framework: field store, validation, step control and the
//! wizard shell that composes them. Concrete wizards live in
//! [`crate::registration`] and plug in through [`WizardFlow`].

pub mod field;
pub mod flow;
pub mod path;
pub mod shell;
pub mod step;
pub mod store;
pub mod validation;

pub use field::{FieldDescriptor, FieldKind};
pub use flow::{AssemblyError, WizardFlow, WizardMode};
pub use path::{FieldPath, FieldPathError};
pub use shell::{
    Banner, BannerKind, FieldView, NextOutcome, Progress, Resolution, StepView,
    SubmissionTicket, WizardPhase, WizardShell, WizardState,
};
pub use step::{Advance, NavigationError, StepController, StepDefinition};
pub use store::FieldStore;
pub use validation::{validate_step, FieldErrors, Rule, StepCheck};
