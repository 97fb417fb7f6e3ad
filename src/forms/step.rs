use thiserror::Error;
use tracing::debug;

use super::field::FieldDescriptor;
use super::path::FieldPath;
use super::validation::{FieldErrors, StepCheck};

/// One page of a wizard. Immutable once the wizard is built.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub name: &'static str,
    pub title: &'static str,
    /// Key of the store section this step owns.
    pub section: &'static str,
    pub fields: Vec<FieldDescriptor>,
    pub checks: Vec<StepCheck>,
}

impl StepDefinition {
    pub fn new(
        name: &'static str,
        title: &'static str,
        section: &'static str,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        Self {
            name,
            title,
            section,
            fields,
            checks: Vec::new(),
        }
    }

    pub fn with_check(mut self, check: StepCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn required_fields(&self) -> Vec<FieldPath> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| FieldPath::in_section(self.section, field.name))
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn path_of(&self, field: &FieldDescriptor) -> FieldPath {
        FieldPath::in_section(self.section, field.name)
    }

    /// True when `path` addresses one of this step's fields.
    pub fn owns(&self, path: &FieldPath) -> bool {
        path.segments().len() == 2
            && path.root() == self.section
            && self.fields.iter().any(|field| field.name == path.leaf())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("step {index} does not exist (wizard has {len} steps)")]
    OutOfRange { index: usize, len: usize },
    #[error("step {index} is locked until earlier steps are completed")]
    Locked { index: usize },
}

/// Result of attempting to move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved { to: usize },
    Blocked(FieldErrors),
    /// The current step is clean and there is nowhere further to go.
    AtLastStep,
    /// The last step is clean but an earlier step was edited after it
    /// validated; `from` is the first step that must be checked again.
    Unverified { from: usize },
}

/// Tracks the current step and the furthest contiguous run of clean steps.
#[derive(Debug, Clone)]
pub struct StepController {
    len: usize,
    index: usize,
    /// Highest index such that every step `0..=clean_through` validated clean.
    clean_through: Option<usize>,
}

impl StepController {
    /// `len` must be at least 1.
    pub fn new(len: usize) -> Self {
        Self {
            len: len.max(1),
            index: 0,
            clean_through: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.len
    }

    pub fn clean_through(&self) -> Option<usize> {
        self.clean_through
    }

    /// Applies the validator's verdict for the current step.
    pub fn next(&mut self, errors: FieldErrors) -> Advance {
        if !errors.is_empty() {
            debug!(step = self.index, errors = errors.len(), "step blocked");
            return Advance::Blocked(errors);
        }
        self.mark_clean(self.index);
        if self.is_last() {
            return match self.first_unverified() {
                Some(from) => {
                    debug!(step = from, "earlier step needs validation again");
                    Advance::Unverified { from }
                }
                None => Advance::AtLastStep,
            };
        }
        self.index += 1;
        debug!(step = self.index, "advanced");
        Advance::Moved { to: self.index }
    }

    /// Moves back one step without validation. Returns false at the first step.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        debug!(step = self.index, "moved back");
        true
    }

    pub fn go_to(&mut self, target: usize) -> Result<(), NavigationError> {
        if target >= self.len {
            return Err(NavigationError::OutOfRange {
                index: target,
                len: self.len,
            });
        }
        if target > self.index && target > self.frontier() {
            return Err(NavigationError::Locked { index: target });
        }
        self.index = target;
        debug!(step = self.index, "jumped");
        Ok(())
    }

    /// Jump used when the server rejects a field on an earlier step.
    pub(crate) fn rewind_to(&mut self, target: usize) {
        if target < self.len && target <= self.index {
            self.index = target;
        }
    }

    /// Forgets clean status for `step` and everything after it.
    pub fn invalidate_from(&mut self, step: usize) {
        self.clean_through = match (step, self.clean_through) {
            (0, _) => None,
            (s, Some(clean)) if clean >= s => Some(s - 1),
            (_, current) => current,
        };
    }

    /// Highest index reachable by `go_to` without validating again.
    fn frontier(&self) -> usize {
        match self.clean_through {
            Some(clean) => (clean + 1).min(self.len - 1),
            None => 0,
        }
    }

    /// First step outside the clean run, or `None` when every step is clean.
    pub fn first_unverified(&self) -> Option<usize> {
        match self.clean_through {
            Some(clean) if clean + 1 >= self.len => None,
            Some(clean) => Some(clean + 1),
            None => Some(0),
        }
    }

    pub(crate) fn mark_clean(&mut self, step: usize) {
        let contiguous = match self.clean_through {
            None => step == 0,
            Some(clean) => step <= clean + 1,
        };
        if contiguous && self.clean_through.map_or(true, |clean| step > clean) {
            self.clean_through = Some(step);
        }
    }
}
