//! Consent and data-sharing wizard.
//!
//! The sharing toggle decides whether the third party is sent at all; the
//! expiry date must not precede the date the wizard was opened.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::forms::flow::{optional, read_section, required, AssemblyError, WizardFlow};
use crate::forms::validation::{parse_date, Rule, StepCheck};
use crate::forms::{FieldDescriptor, FieldKind, FieldStore, StepDefinition};

pub const DATA_CATEGORIES: [&str; 6] = [
    "medical_history",
    "treatments",
    "imaging",
    "prescriptions",
    "pathology",
    "vitals",
];

/// Store sections, one per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentSection {
    Scope,
    Sharing,
}

impl ConsentSection {
    pub fn key(self) -> &'static str {
        match self {
            ConsentSection::Scope => "scope",
            ConsentSection::Sharing => "sharing",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scope {
    data_type: String,
    purpose: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Sharing {
    share_with_third_party: Option<bool>,
    third_party: Option<String>,
    expiry_date: Option<serde_json::Value>,
}

/// Body for `POST /consent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsentPayload {
    pub data_type: String,
    pub purpose: String,
    pub third_party: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

pub struct ConsentWizard {
    steps: Vec<StepDefinition>,
}

impl ConsentWizard {
    /// `today` bounds the earliest acceptable expiry date.
    pub fn new(today: NaiveDate) -> Self {
        let scope = StepDefinition::new(
            ConsentSection::Scope.key(),
            "What are you consenting to?",
            ConsentSection::Scope.key(),
            vec![
                FieldDescriptor::new(
                    "dataType",
                    "Data category",
                    FieldKind::Choice(DATA_CATEGORIES.to_vec()),
                    Rule::OneOf(DATA_CATEGORIES.to_vec()),
                )
                .with_remote_key("data_type"),
                FieldDescriptor::new("purpose", "Purpose", FieldKind::Text, Rule::MaxLength(500)),
            ],
        );

        let sharing = StepDefinition::new(
            ConsentSection::Sharing.key(),
            "Sharing",
            ConsentSection::Sharing.key(),
            vec![
                FieldDescriptor::new(
                    "shareWithThirdParty",
                    "Share with a third party",
                    FieldKind::Boolean,
                    Rule::Boolean,
                )
                .with_optional(),
                FieldDescriptor::new("thirdParty", "Third party", FieldKind::Text, Rule::MaxLength(200))
                    .with_optional()
                    .with_remote_key("third_party"),
                FieldDescriptor::new("expiryDate", "Expiry date", FieldKind::Date, Rule::Date)
                    .with_optional()
                    .with_remote_key("expiry_date")
                    .with_help("Leave blank for consent without an end date."),
            ],
        )
        .with_check(StepCheck::RequiredWhen {
            field: "thirdParty",
            toggle: "shareWithThirdParty",
            message: "Name the organisation that will receive the data",
        })
        .with_check(StepCheck::NotBefore {
            field: "expiryDate",
            reference: today,
            message: "Expiry date cannot be in the past",
        });

        Self {
            steps: vec![scope, sharing],
        }
    }
}

impl WizardFlow for ConsentWizard {
    type Payload = ConsentPayload;

    fn name(&self) -> &'static str {
        "consent"
    }

    fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    fn collection(&self) -> &'static str {
        "/consent"
    }

    fn assemble(&self, store: &FieldStore) -> Result<Self::Payload, AssemblyError> {
        let scope_key = ConsentSection::Scope.key();
        let sharing_key = ConsentSection::Sharing.key();
        let scope: Scope = read_section(store, scope_key)?;
        let sharing: Sharing = read_section(store, sharing_key)?;

        let third_party = if sharing.share_with_third_party.unwrap_or(false) {
            let name = optional(sharing.third_party.as_deref()).ok_or(
                AssemblyError::MissingField {
                    section: sharing_key,
                    field: "thirdParty",
                },
            )?;
            Some(name)
        } else {
            None
        };

        let expiry_date = match sharing.expiry_date {
            Some(value) if !crate::forms::store::is_blank_value(&value) => {
                let date = parse_date(&value).map_err(|message| AssemblyError::InvalidField {
                    section: sharing_key,
                    field: "expiryDate",
                    message,
                })?;
                date.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc())
            }
            _ => None,
        };

        Ok(ConsentPayload {
            data_type: required(scope_key, "dataType", &scope.data_type)?,
            purpose: required(scope_key, "purpose", &scope.purpose)?,
            third_party,
            expiry_date,
            is_active: true,
        })
    }
}
