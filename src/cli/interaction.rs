//! Prompting contract between the wizard runner and whoever answers it.

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use serde_json::Value;

use crate::forms::{Banner, FieldKind, FieldView};

/// How a single field prompt was answered.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptResponse {
    Value(Value),
    /// Leave the stored value as is.
    Keep,
    /// Clear the stored value.
    Clear,
    /// Return to the previous step.
    Back,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResponse {
    Submit,
    Back,
    Cancel,
}

pub struct PromptContext<'a> {
    pub field: &'a FieldView<'a>,
    pub step_title: &'a str,
    pub step_index: usize,
    pub step_total: usize,
}

pub trait StepInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> Result<PromptResponse, dialoguer::Error>;

    fn confirm(&mut self, summary: &[(String, String)]) -> Result<ConfirmationResponse, dialoguer::Error>;

    /// Asked after a retryable failure; `true` resubmits.
    fn retry(&mut self, banner: &Banner) -> Result<bool, dialoguer::Error>;
}

const BACK_COMMAND: &str = ":back";
const CANCEL_COMMAND: &str = ":cancel";
const CLEAR_COMMAND: &str = ":clear";

/// Converts typed text into a store value according to the field kind.
/// Unparseable integers stay text so the validator can report them.
pub fn parse_input(kind: &FieldKind, raw: &str) -> PromptResponse {
    let trimmed = raw.trim();
    match trimmed {
        BACK_COMMAND => return PromptResponse::Back,
        CANCEL_COMMAND => return PromptResponse::Cancel,
        CLEAR_COMMAND => return PromptResponse::Clear,
        "" => return PromptResponse::Keep,
        _ => {}
    }
    let value = match kind {
        FieldKind::Integer => trimmed
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(trimmed.to_string())),
        FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" => Value::Bool(true),
            "n" | "no" | "false" => Value::Bool(false),
            _ => Value::String(trimmed.to_string()),
        },
        _ => Value::String(trimmed.to_string()),
    };
    PromptResponse::Value(value)
}

/// Dialoguer-backed prompts.
pub struct TerminalInteraction {
    theme: ColorfulTheme,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn prompt_label(context: &PromptContext<'_>) -> String {
        let descriptor = context.field.descriptor;
        let mut label = format!(
            "[{}/{}] {}",
            context.step_index + 1,
            context.step_total,
            descriptor.label
        );
        if !descriptor.required {
            label.push_str(" (optional)");
        }
        if descriptor.kind == FieldKind::Date {
            label.push_str(" [YYYY-MM-DD]");
        }
        label
    }

    fn prompt_choice(
        &self,
        context: &PromptContext<'_>,
        options: &[&'static str],
    ) -> Result<PromptResponse, dialoguer::Error> {
        let mut items: Vec<String> = options.iter().map(|option| option.to_string()).collect();
        items.push("<- Back".into());
        items.push("Cancel".into());
        let current = context
            .field
            .value
            .and_then(Value::as_str)
            .and_then(|value| options.iter().position(|option| *option == value))
            .unwrap_or(0);
        let selected = Select::with_theme(&self.theme)
            .with_prompt(Self::prompt_label(context))
            .items(&items)
            .default(current)
            .interact_opt()?;
        Ok(match selected {
            Some(index) if index < options.len() => {
                PromptResponse::Value(Value::String(options[index].to_string()))
            }
            Some(index) if index == options.len() => PromptResponse::Back,
            _ => PromptResponse::Cancel,
        })
    }

    fn prompt_boolean(&self, context: &PromptContext<'_>) -> Result<PromptResponse, dialoguer::Error> {
        let current = context.field.value.and_then(Value::as_bool).unwrap_or(false);
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(Self::prompt_label(context))
            .default(current)
            .interact_opt()?;
        Ok(match answer {
            Some(flag) => PromptResponse::Value(Value::Bool(flag)),
            None => PromptResponse::Cancel,
        })
    }

    fn prompt_text(&self, context: &PromptContext<'_>) -> Result<PromptResponse, dialoguer::Error> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(Self::prompt_label(context))
            .allow_empty(true);
        if let Some(Value::String(current)) = context.field.value {
            input = input.with_initial_text(current.clone());
        }
        let raw = input.interact_text()?;
        Ok(parse_input(&context.field.descriptor.kind, &raw))
    }
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl StepInteraction for TerminalInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> Result<PromptResponse, dialoguer::Error> {
        if let Some(help) = context.field.descriptor.help {
            super::output::info(help);
        }
        if let Some(error) = context.field.error {
            super::output::error(error);
        }
        match &context.field.descriptor.kind {
            FieldKind::Choice(options) => self.prompt_choice(context, options),
            FieldKind::Boolean => self.prompt_boolean(context),
            _ => self.prompt_text(context),
        }
    }

    fn confirm(&mut self, summary: &[(String, String)]) -> Result<ConfirmationResponse, dialoguer::Error> {
        super::output::section("Review");
        for (label, value) in summary {
            println!("  {label}: {value}");
        }
        let items = ["Submit", "<- Back", "Cancel"];
        let selected = Select::with_theme(&self.theme)
            .with_prompt("Submit these details?")
            .items(&items)
            .default(0)
            .interact_opt()?;
        Ok(match selected {
            Some(0) => ConfirmationResponse::Submit,
            Some(1) => ConfirmationResponse::Back,
            _ => ConfirmationResponse::Cancel,
        })
    }

    fn retry(&mut self, banner: &Banner) -> Result<bool, dialoguer::Error> {
        super::output::banner(banner);
        Confirm::with_theme(&self.theme)
            .with_prompt("Try again?")
            .default(true)
            .interact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_commands_map_to_navigation() {
        assert_eq!(parse_input(&FieldKind::Text, " :back "), PromptResponse::Back);
        assert_eq!(parse_input(&FieldKind::Text, ":cancel"), PromptResponse::Cancel);
        assert_eq!(parse_input(&FieldKind::Text, ":clear"), PromptResponse::Clear);
        assert_eq!(parse_input(&FieldKind::Text, "   "), PromptResponse::Keep);
    }

    #[test]
    fn integers_parse_or_stay_text() {
        assert_eq!(
            parse_input(&FieldKind::Integer, "42"),
            PromptResponse::Value(Value::from(42u64))
        );
        assert_eq!(
            parse_input(&FieldKind::Integer, "4x"),
            PromptResponse::Value(Value::String("4x".into()))
        );
        assert_eq!(
            parse_input(&FieldKind::Boolean, "Yes"),
            PromptResponse::Value(Value::Bool(true))
        );
    }
}
