//! Concrete wizards for the care portal: clinic onboarding, practitioner
//! registration and patient consent.

pub mod clinic;
pub mod consent;
pub mod practitioner;

pub use clinic::{ClinicRegistration, ClinicRegistrationPayload, ClinicSection};
pub use consent::{ConsentPayload, ConsentSection, ConsentWizard};
pub use practitioner::{PractitionerPayload, PractitionerRegistration, PractitionerSection};
