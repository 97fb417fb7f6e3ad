#![allow(dead_code)]

use careportal::forms::{WizardFlow, WizardShell};
use careportal::gateway::RemoteResource;
use serde_json::{json, Value};

/// Answers for every clinic step, keyed by dotted path, in step order.
pub fn clinic_answers() -> Vec<Vec<(&'static str, Value)>> {
    vec![
        vec![
            ("organisationDetails.legalName", json!("Harbour Family Practice Pty Ltd")),
            ("organisationDetails.abn", json!("51 824 753 556")),
            ("organisationDetails.phone", json!("02 9876 5432")),
            ("organisationDetails.address", json!("1 Wharf Rd, Sydney NSW 2000")),
        ],
        vec![
            ("accreditation.accreditingBody", json!("AGPAL")),
            ("accreditation.certificateNumber", json!("AG-1182")),
            ("accreditation.issueDate", json!("2024-03-01")),
            ("accreditation.expiryDate", json!("2027-03-01")),
        ],
        vec![("identifiers.hpio", json!("8003 6212 3456 7892"))],
        vec![
            ("contact.contactName", json!("Dr Ada Lovelace")),
            ("contact.contactEmail", json!("ada@harbour.example")),
        ],
        vec![],
        vec![
            ("declarations.acceptTerms", json!(true)),
            ("declarations.declarantName", json!("Ada Lovelace")),
        ],
    ]
}

pub fn practitioner_answers() -> Vec<Vec<(&'static str, Value)>> {
    vec![
        vec![
            ("professional.specialty", json!("General Practice")),
            ("professional.licenseNumber", json!("MED0001234567")),
        ],
        vec![("placement.clinicId", json!(12)), ("placement.userId", json!(40))],
    ]
}

pub fn fill<F: WizardFlow>(shell: &mut WizardShell<F>, answers: &[(&str, Value)]) {
    for (path, value) in answers {
        shell
            .set_field(path, value.clone())
            .expect("wizard accepts edits");
    }
}

pub fn created(id: u64) -> RemoteResource {
    RemoteResource {
        status: 201,
        body: json!({ "id": id }),
    }
}
