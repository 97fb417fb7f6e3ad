//! Six-step clinic (organisation) registration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::forms::flow::{optional, read_section, required, AssemblyError, WizardFlow};
use crate::forms::validation::{parse_date, Rule, StepCheck};
use crate::forms::{FieldDescriptor, FieldKind, FieldStore, StepDefinition};

pub const ACCREDITING_BODIES: [&str; 4] = ["AGPAL", "QPA", "ACHS", "Other"];
pub const PRACTICE_SOFTWARE: [&str; 4] = ["cliniko", "best_practice", "health_engine", "none"];

/// Store sections, one per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClinicSection {
    OrganisationDetails,
    Accreditation,
    Identifiers,
    Contact,
    Integrations,
    Declarations,
}

impl ClinicSection {
    pub const ALL: [ClinicSection; 6] = [
        ClinicSection::OrganisationDetails,
        ClinicSection::Accreditation,
        ClinicSection::Identifiers,
        ClinicSection::Contact,
        ClinicSection::Integrations,
        ClinicSection::Declarations,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ClinicSection::OrganisationDetails => "organisationDetails",
            ClinicSection::Accreditation => "accreditation",
            ClinicSection::Identifiers => "identifiers",
            ClinicSection::Contact => "contact",
            ClinicSection::Integrations => "integrations",
            ClinicSection::Declarations => "declarations",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ClinicSection::OrganisationDetails => "Organisation Details",
            ClinicSection::Accreditation => "Accreditation",
            ClinicSection::Identifiers => "Healthcare Identifiers",
            ClinicSection::Contact => "Primary Contact",
            ClinicSection::Integrations => "Practice Software",
            ClinicSection::Declarations => "Declarations",
        }
    }

    fn step(self) -> StepDefinition {
        let fields = match self {
            ClinicSection::OrganisationDetails => vec![
                FieldDescriptor::new("legalName", "Legal name", FieldKind::Text, Rule::MaxLength(200))
                    .with_remote_key("name"),
                FieldDescriptor::new(
                    "tradingName",
                    "Trading name",
                    FieldKind::Text,
                    Rule::MaxLength(200),
                )
                .with_optional()
                .with_remote_key("trading_name"),
                FieldDescriptor::new("abn", "ABN", FieldKind::Text, Rule::Abn)
                    .with_help("Australian Business Number, 11 digits."),
                FieldDescriptor::new("phone", "Phone", FieldKind::Phone, Rule::Phone),
                FieldDescriptor::text("address", "Street address"),
            ],
            ClinicSection::Accreditation => vec![
                FieldDescriptor::new(
                    "accreditingBody",
                    "Accrediting body",
                    FieldKind::Choice(ACCREDITING_BODIES.to_vec()),
                    Rule::OneOf(ACCREDITING_BODIES.to_vec()),
                )
                .with_remote_key("accreditation_body"),
                FieldDescriptor::text("certificateNumber", "Certificate number")
                    .with_remote_key("accreditation_number"),
                FieldDescriptor::new("issueDate", "Issue date", FieldKind::Date, Rule::Date)
                    .with_remote_key("accreditation_issued"),
                FieldDescriptor::new("expiryDate", "Expiry date", FieldKind::Date, Rule::Date)
                    .with_remote_key("accreditation_expires"),
            ],
            ClinicSection::Identifiers => vec![FieldDescriptor::new(
                "hpio",
                "HPI-O",
                FieldKind::Text,
                Rule::Hpio,
            )
            .with_help("Healthcare Provider Identifier for the organisation (16 digits).")],
            ClinicSection::Contact => vec![
                FieldDescriptor::text("contactName", "Contact name").with_remote_key("contact_name"),
                FieldDescriptor::new("contactEmail", "Contact email", FieldKind::Email, Rule::Email)
                    .with_remote_key("contact_email"),
                FieldDescriptor::new("contactPhone", "Contact phone", FieldKind::Phone, Rule::Phone)
                    .with_optional()
                    .with_remote_key("contact_phone"),
            ],
            ClinicSection::Integrations => vec![
                FieldDescriptor::new(
                    "practiceSoftware",
                    "Practice management software",
                    FieldKind::Choice(PRACTICE_SOFTWARE.to_vec()),
                    Rule::OneOf(PRACTICE_SOFTWARE.to_vec()),
                )
                .with_optional()
                .with_remote_key("practice_software"),
                FieldDescriptor::new(
                    "myHealthRecord",
                    "Connect to My Health Record",
                    FieldKind::Boolean,
                    Rule::Boolean,
                )
                .with_optional()
                .with_remote_key("my_health_record_enabled"),
            ],
            ClinicSection::Declarations => vec![
                FieldDescriptor::new(
                    "acceptTerms",
                    "Terms of service",
                    FieldKind::Boolean,
                    Rule::MustAccept,
                )
                .with_remote_key("terms_accepted"),
                FieldDescriptor::text("declarantName", "Declarant name").with_remote_key("declared_by"),
            ],
        };

        let step = StepDefinition::new(self.key(), self.title(), self.key(), fields);
        match self {
            ClinicSection::Accreditation => step.with_check(StepCheck::DateOrder {
                earlier: "issueDate",
                later: "expiryDate",
                message: "Expiry date must be after the issue date",
            }),
            _ => step,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganisationDetails {
    legal_name: String,
    trading_name: Option<String>,
    abn: String,
    phone: String,
    address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accreditation {
    accrediting_body: String,
    certificate_number: String,
    issue_date: Value,
    expiry_date: Value,
}

#[derive(Deserialize)]
struct Identifiers {
    hpio: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contact {
    contact_name: String,
    contact_email: String,
    contact_phone: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Integrations {
    practice_software: Option<String>,
    my_health_record: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Declarations {
    accept_terms: bool,
    declarant_name: String,
}

/// Flat registration body for `POST /clinics/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicRegistrationPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trading_name: Option<String>,
    pub abn: String,
    pub address: String,
    pub phone: String,
    pub is_active: bool,
    pub accreditation_body: String,
    pub accreditation_number: String,
    pub accreditation_issued: NaiveDate,
    pub accreditation_expires: NaiveDate,
    pub hpio: String,
    pub contact_name: String,
    pub contact_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_software: Option<String>,
    pub my_health_record_enabled: bool,
    pub terms_accepted: bool,
    pub declared_by: String,
}

pub struct ClinicRegistration {
    steps: Vec<StepDefinition>,
}

impl ClinicRegistration {
    pub fn new() -> Self {
        Self {
            steps: ClinicSection::ALL.iter().map(|section| section.step()).collect(),
        }
    }
}

impl Default for ClinicRegistration {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardFlow for ClinicRegistration {
    type Payload = ClinicRegistrationPayload;

    fn name(&self) -> &'static str {
        "clinic_registration"
    }

    fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    fn collection(&self) -> &'static str {
        "/clinics/"
    }

    fn assemble(&self, store: &FieldStore) -> Result<Self::Payload, AssemblyError> {
        const ORG: &str = "organisationDetails";
        const ACC: &str = "accreditation";
        const IDS: &str = "identifiers";
        const CONTACT: &str = "contact";
        const DECL: &str = "declarations";

        let org: OrganisationDetails = read_section(store, ORG)?;
        let accreditation: Accreditation = read_section(store, ACC)?;
        let identifiers: Identifiers = read_section(store, IDS)?;
        let contact: Contact = read_section(store, CONTACT)?;
        let integrations: Integrations = read_section(store, "integrations")?;
        let declarations: Declarations = read_section(store, DECL)?;

        if !declarations.accept_terms {
            return Err(AssemblyError::InvalidField {
                section: DECL,
                field: "acceptTerms",
                message: "terms were not accepted".into(),
            });
        }

        let issued = date_field(ACC, "issueDate", &accreditation.issue_date)?;
        let expires = date_field(ACC, "expiryDate", &accreditation.expiry_date)?;

        Ok(ClinicRegistrationPayload {
            name: required(ORG, "legalName", &org.legal_name)?,
            trading_name: optional(org.trading_name.as_deref()),
            abn: compact_digits(&required(ORG, "abn", &org.abn)?),
            address: required(ORG, "address", &org.address)?,
            phone: required(ORG, "phone", &org.phone)?,
            is_active: true,
            accreditation_body: required(ACC, "accreditingBody", &accreditation.accrediting_body)?,
            accreditation_number: required(
                ACC,
                "certificateNumber",
                &accreditation.certificate_number,
            )?,
            accreditation_issued: issued,
            accreditation_expires: expires,
            hpio: compact_digits(&required(IDS, "hpio", &identifiers.hpio)?),
            contact_name: required(CONTACT, "contactName", &contact.contact_name)?,
            contact_email: required(CONTACT, "contactEmail", &contact.contact_email)?,
            contact_phone: optional(contact.contact_phone.as_deref()),
            practice_software: optional(integrations.practice_software.as_deref())
                .filter(|software| software != "none"),
            my_health_record_enabled: integrations.my_health_record.unwrap_or(false),
            terms_accepted: true,
            declared_by: required(DECL, "declarantName", &declarations.declarant_name)?,
        })
    }
}

fn date_field(
    section: &'static str,
    field: &'static str,
    value: &Value,
) -> Result<NaiveDate, AssemblyError> {
    parse_date(value).map_err(|message| AssemblyError::InvalidField {
        section,
        field,
        message,
    })
}

fn compact_digits(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
