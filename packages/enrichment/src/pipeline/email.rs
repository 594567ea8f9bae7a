//! Email address parsing into an `EmailContext`.

use crate::types::email::EmailContext;
use crate::types::field::title_case;

/// Consumer webmail providers: addresses here say nothing about a company.
pub const PERSONAL_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "yahoo.co.uk",
    "ymail.com",
    "hotmail.com",
    "hotmail.co.uk",
    "outlook.com",
    "live.com",
    "msn.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "mac.com",
    "protonmail.com",
    "proton.me",
    "gmx.com",
    "gmx.de",
    "mail.com",
    "zoho.com",
    "yandex.com",
    "yandex.ru",
    "qq.com",
    "163.com",
    "fastmail.com",
    "hey.com",
];

/// Second-level labels that sit between the brand and the country code
/// (`acme.co.uk`, `acme.com.au`).
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu"];

/// Brands whose canonical casing differs from naive title-casing.
const BRAND_OVERRIDES: &[(&str, &str)] = &[
    ("onetrust", "OneTrust"),
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("hubspot", "HubSpot"),
    ("linkedin", "LinkedIn"),
    ("paypal", "PayPal"),
    ("youtube", "YouTube"),
    ("openai", "OpenAI"),
    ("mongodb", "MongoDB"),
    ("salesforce", "Salesforce"),
    ("mailchimp", "Mailchimp"),
    ("wordpress", "WordPress"),
    ("docusign", "DocuSign"),
    ("servicenow", "ServiceNow"),
    ("zoominfo", "ZoomInfo"),
];

/// Local-part words that name a role rather than a person.
const ROLE_WORDS: &[&str] = &[
    "info", "contact", "hello", "hi", "admin", "sales", "support", "team", "office", "mail",
    "help", "billing", "careers", "jobs", "hr", "press", "marketing", "noreply", "no-reply",
];

/// Parse `email` into an identity context.
///
/// Returns `None` when the address has no `@`, an empty local part, or a
/// domain without a dot. Callers treat `None` as a row error.
pub fn extract_email_context(email: &str) -> Option<EmailContext> {
    let email = email.trim();
    let (local, domain) = email.rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('.').to_lowercase();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains(' ') {
        return None;
    }

    let is_personal_email = is_personal_domain(&domain);
    let company_name_guess = (!is_personal_email)
        .then(|| company_name_from_domain(&domain))
        .flatten();

    Some(EmailContext {
        email: email.to_string(),
        company_domain: (!is_personal_email).then(|| domain.clone()),
        domain,
        personal_name: personal_name_from_local(local),
        company_name_guess,
        is_personal_email,
    })
}

pub fn is_personal_domain(domain: &str) -> bool {
    PERSONAL_EMAIL_DOMAINS.contains(&domain.to_lowercase().as_str())
}

/// The brand label of a domain: `mail.acme-labs.co.uk` -> `acme-labs`.
pub fn domain_token(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain
        .trim()
        .trim_start_matches("www.")
        .split('.')
        .filter(|l| !l.is_empty())
        .collect();
    if labels.len() < 2 {
        return labels.first().map(|l| l.to_lowercase());
    }

    let mut end = labels.len() - 1;
    if end >= 2 && SECOND_LEVEL_LABELS.contains(&labels[end - 1]) && labels[end].len() == 2 {
        end -= 1;
    }
    Some(labels[end - 1].to_lowercase())
}

/// Guess a display name from a domain: `acme-labs.io` -> `Acme Labs`.
pub fn company_name_from_domain(domain: &str) -> Option<String> {
    let token = domain_token(domain)?;
    if let Some((_, brand)) = BRAND_OVERRIDES.iter().find(|(key, _)| *key == token) {
        return Some(brand.to_string());
    }

    let name = title_case(&token.replace(['-', '_'], " "));
    (!name.is_empty()).then_some(name)
}

fn personal_name_from_local(local: &str) -> Option<String> {
    let local = local.split('+').next().unwrap_or(local).to_lowercase();
    let parts: Vec<&str> = local
        .split(['.', '_', '-'])
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty()
        || parts.iter().any(|p| ROLE_WORDS.contains(p))
        || parts.iter().any(|p| p.chars().any(|c| c.is_ascii_digit()))
    {
        return None;
    }
    // Single short tokens like "jd" are initials, not names.
    if parts.len() == 1 && parts[0].len() < 3 {
        return None;
    }

    Some(title_case(&parts.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_email() {
        let ctx = extract_email_context("Jane.Doe@Acme-Labs.io").unwrap();
        assert_eq!(ctx.domain, "acme-labs.io");
        assert_eq!(ctx.company_domain.as_deref(), Some("acme-labs.io"));
        assert_eq!(ctx.company_name_guess.as_deref(), Some("Acme Labs"));
        assert_eq!(ctx.personal_name.as_deref(), Some("Jane Doe"));
        assert!(!ctx.is_personal_email);
        assert_eq!(ctx.research_domain(), Some("acme-labs.io"));
    }

    #[test]
    fn test_personal_email_has_no_company() {
        let ctx = extract_email_context("someone@gmail.com").unwrap();
        assert!(ctx.is_personal_email);
        assert_eq!(ctx.company_domain, None);
        assert_eq!(ctx.company_name_guess, None);
        assert_eq!(ctx.research_domain(), None);
    }

    #[test]
    fn test_invalid_emails() {
        assert!(extract_email_context("not-an-email").is_none());
        assert!(extract_email_context("@acme.io").is_none());
        assert!(extract_email_context("jane@").is_none());
        assert!(extract_email_context("jane@localhost").is_none());
    }

    #[test]
    fn test_brand_overrides_and_second_level_tlds() {
        assert_eq!(company_name_from_domain("onetrust.com").as_deref(), Some("OneTrust"));
        assert_eq!(company_name_from_domain("acme.co.uk").as_deref(), Some("Acme"));
        assert_eq!(company_name_from_domain("mail.acme.com.au").as_deref(), Some("Acme"));
        assert_eq!(domain_token("www.acme.io").as_deref(), Some("acme"));
    }

    #[test]
    fn test_role_addresses_have_no_personal_name() {
        assert_eq!(extract_email_context("info@acme.io").unwrap().personal_name, None);
        assert_eq!(extract_email_context("jd@acme.io").unwrap().personal_name, None);
        assert_eq!(
            extract_email_context("jane+news@acme.io").unwrap().personal_name.as_deref(),
            Some("Jane")
        );
    }
}
