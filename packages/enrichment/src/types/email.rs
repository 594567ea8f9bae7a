//! Identity context parsed from a row's email address.

use serde::{Deserialize, Serialize};

/// What an email address tells us about the organization behind it.
///
/// Created once per row. `company_name_guess` is a starting point only;
/// Discovery may resolve a confirmed name that supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailContext {
    pub email: String,

    /// Lower-cased domain part of the address
    pub domain: String,

    /// Same as `domain` unless the address is on a consumer webmail provider
    pub company_domain: Option<String>,

    /// Name derived from the local part (`jane.doe` -> `Jane Doe`)
    pub personal_name: Option<String>,

    /// Company name derived from the domain (`acme-labs.io` -> `Acme Labs`)
    pub company_name_guess: Option<String>,

    pub is_personal_email: bool,
}

impl EmailContext {
    /// The domain to research, if the address belongs to a company.
    pub fn research_domain(&self) -> Option<&str> {
        self.company_domain.as_deref()
    }
}
