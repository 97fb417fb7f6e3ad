//! Two-step practitioner registration against an existing clinic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::forms::flow::{read_section, required, AssemblyError, WizardFlow};
use crate::forms::validation::Rule;
use crate::forms::{FieldDescriptor, FieldKind, FieldStore, StepDefinition};

/// Store sections, one per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PractitionerSection {
    Professional,
    Placement,
}

impl PractitionerSection {
    pub const fn key(self) -> &'static str {
        match self {
            PractitionerSection::Professional => "professional",
            PractitionerSection::Placement => "placement",
        }
    }
}

const PROFESSIONAL: &str = PractitionerSection::Professional.key();
const PLACEMENT: &str = PractitionerSection::Placement.key();

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Professional {
    specialty: String,
    license_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Placement {
    clinic_id: Value,
    user_id: Value,
}

/// Body for `POST /practitioners/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PractitionerPayload {
    pub specialty: String,
    pub license_number: String,
    pub clinic_id: u64,
    pub user_id: u64,
    pub is_active: bool,
}

pub struct PractitionerRegistration {
    steps: Vec<StepDefinition>,
}

impl PractitionerRegistration {
    pub fn new() -> Self {
        let professional = StepDefinition::new(
            PROFESSIONAL,
            "Professional Details",
            PROFESSIONAL,
            vec![
                FieldDescriptor::new("specialty", "Specialty", FieldKind::Text, Rule::MaxLength(120)),
                FieldDescriptor::new(
                    "licenseNumber",
                    "AHPRA registration number",
                    FieldKind::Text,
                    Rule::AhpraNumber,
                )
                .with_remote_key("license_number")
                .with_help("Three letters followed by 10 digits, e.g. MED0001234567."),
            ],
        );
        let placement = StepDefinition::new(
            PLACEMENT,
            "Clinic Placement",
            PLACEMENT,
            vec![
                FieldDescriptor::new("clinicId", "Clinic ID", FieldKind::Integer, Rule::PositiveInteger)
                    .with_remote_key("clinic_id"),
                FieldDescriptor::new("userId", "User ID", FieldKind::Integer, Rule::PositiveInteger)
                    .with_remote_key("user_id"),
            ],
        );
        Self {
            steps: vec![professional, placement],
        }
    }
}

impl Default for PractitionerRegistration {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardFlow for PractitionerRegistration {
    type Payload = PractitionerPayload;

    fn name(&self) -> &'static str {
        "practitioner_registration"
    }

    fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    fn collection(&self) -> &'static str {
        "/practitioners/"
    }

    fn assemble(&self, store: &FieldStore) -> Result<Self::Payload, AssemblyError> {
        let professional: Professional = read_section(store, PROFESSIONAL)?;
        let placement: Placement = read_section(store, PLACEMENT)?;

        Ok(PractitionerPayload {
            specialty: required(PROFESSIONAL, "specialty", &professional.specialty)?,
            license_number: required(PROFESSIONAL, "licenseNumber", &professional.license_number)?,
            clinic_id: positive_id(PLACEMENT, "clinicId", &placement.clinic_id)?,
            user_id: positive_id(PLACEMENT, "userId", &placement.user_id)?,
            is_active: true,
        })
    }
}

fn positive_id(
    section: &'static str,
    field: &'static str,
    value: &Value,
) -> Result<u64, AssemblyError> {
    let parsed = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(id) if id > 0 => Ok(id),
        _ => Err(AssemblyError::InvalidField {
            section,
            field,
            message: format!("expected a positive integer, got {}", value),
        }),
    }
}
