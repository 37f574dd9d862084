//! Offer acceptance: in-house or out-house placement, job tier and the signed
//! offer letter.

use super::definition::{require_filled, require_option, Check, FormDefinition, FormKind};
use super::gate::ValidationFailure;
use super::payload::Payload;
use super::store::{FormSchema, FormState};

pub const SELECT_OPTION: &str = "select_option";
pub const COMPANY_NAME: &str = "company_name";
pub const CUSTOM_COMPANY: &str = "custom_company";
pub const JOB_TYPE: &str = "job_type";

pub const IN_HOUSE: &str = "inHouse";
pub const OUT_HOUSE: &str = "outHouse";

/// Multipart part names the receiving endpoint expects.
pub mod parts {
    pub const SELECT_OPTION: &str = "selectOption";
    pub const COMPANY_NAME: &str = "companyName";
    pub const JOB_TYPE: &str = "jobType";
    pub const OFFER_LETTER: &str = "offerLetter";
}

/// Placement branch chosen through `select_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    InHouse,
    OutHouse,
}

impl Placement {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            IN_HOUSE => Some(Placement::InHouse),
            OUT_HOUSE => Some(Placement::OutHouse),
            _ => None,
        }
    }

    /// Field holding the company for this branch.
    pub const fn company_field(self) -> &'static str {
        match self {
            Placement::InHouse => COMPANY_NAME,
            Placement::OutHouse => CUSTOM_COMPANY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcceptanceForm {
    companies: Vec<String>,
    job_tiers: Vec<String>,
}

impl AcceptanceForm {
    pub fn new(companies: Vec<String>, job_tiers: Vec<String>) -> Self {
        Self {
            companies,
            job_tiers,
        }
    }

    fn placement(state: &FormState) -> Option<Placement> {
        state.filled(SELECT_OPTION).and_then(Placement::parse)
    }

    /// Company resolved from whichever branch is selected.
    pub fn resolved_company<'s>(state: &'s FormState) -> Option<&'s str> {
        Self::placement(state).and_then(|placement| state.filled(placement.company_field()))
    }
}

impl FormDefinition for AcceptanceForm {
    fn kind(&self) -> FormKind {
        FormKind::Acceptance
    }

    fn schema(&self) -> FormSchema {
        FormSchema::new()
            .scalar(SELECT_OPTION)
            .scalar(COMPANY_NAME)
            .scalar(CUSTOM_COMPANY)
            .scalar(JOB_TYPE)
    }

    fn checklist(&self) -> Vec<Check<'_>> {
        let mut checks: Vec<Check<'_>> = Vec::new();
        checks.push(require_filled(SELECT_OPTION, |field| {
            ValidationFailure::MissingPrimaryChoice { field }
        }));
        checks.push(Box::new(|state: &FormState| {
            match state.filled(SELECT_OPTION) {
                Some(value) if Placement::parse(value).is_none() => {
                    Err(ValidationFailure::InvalidOption {
                        field: SELECT_OPTION.to_string(),
                        value: value.to_string(),
                    })
                }
                _ => Ok(()),
            }
        }));
        checks.push(Box::new(|state: &FormState| match Self::placement(state) {
            Some(placement) if state.filled(placement.company_field()).is_none() => {
                Err(ValidationFailure::MissingDependentSelection {
                    field: placement.company_field().to_string(),
                })
            }
            _ => Ok(()),
        }));
        let company_in_catalog = require_option(COMPANY_NAME, &self.companies);
        checks.push(Box::new(move |state: &FormState| {
            match Self::placement(state) {
                Some(Placement::InHouse) => company_in_catalog(state),
                _ => Ok(()),
            }
        }));
        checks.push(require_filled(JOB_TYPE, |field| {
            ValidationFailure::MissingRequiredField { field }
        }));
        checks.push(require_option(JOB_TYPE, &self.job_tiers));
        checks.push(Box::new(|state: &FormState| {
            match state.attachment().current() {
                Some(_) => Ok(()),
                None => Err(ValidationFailure::MissingAttachment),
            }
        }));
        checks
    }

    fn assemble(&self, state: &FormState) -> Payload {
        let mut payload = Payload::new(FormKind::Acceptance)
            .with_field(
                parts::SELECT_OPTION,
                state.filled(SELECT_OPTION).unwrap_or_default(),
            )
            .with_field(
                parts::COMPANY_NAME,
                Self::resolved_company(state).unwrap_or_default(),
            )
            .with_field(parts::JOB_TYPE, state.filled(JOB_TYPE).unwrap_or_default());

        if let Some(attachment) = state.attachment().current() {
            payload = payload.with_attachment(parts::OFFER_LETTER, attachment);
        }
        payload
    }

    fn dependents(&self, field: &str) -> &'static [&'static str] {
        match field {
            SELECT_OPTION => &[COMPANY_NAME, CUSTOM_COMPANY],
            _ => &[],
        }
    }

    fn attachment_part(&self) -> Option<&'static str> {
        Some(parts::OFFER_LETTER)
    }
}
