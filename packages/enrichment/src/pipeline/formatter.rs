//! Final per-row result map.

use crate::types::config::EnrichmentConfig;
use crate::types::field::EnrichmentField;
use crate::types::result::FieldResults;

/// Build the row's result map from everything the phases accepted.
///
/// Keys follow the requested field order. Fields with no accepted value,
/// or whose confidence does not clear the threshold, are omitted rather
/// than represented as null.
pub fn format_results(
    fields: &[EnrichmentField],
    discovered: &FieldResults,
    config: &EnrichmentConfig,
) -> FieldResults {
    let mut formatted = FieldResults::new();
    for field in fields {
        if formatted.contains_key(&field.name) {
            continue;
        }
        if let Some(result) = discovered.get(&field.name) {
            if config.accepts(result.confidence) && !result.value.is_empty() {
                formatted.insert(field.name.clone(), result.clone());
            }
        }
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::field::{FieldType, FieldValue};
    use crate::types::result::EnrichmentResult;

    #[test]
    fn test_requested_order_threshold_and_omission() {
        let fields = vec![
            EnrichmentField::new("website", FieldType::String),
            EnrichmentField::new("companyName", FieldType::String),
            EnrichmentField::new("industry", FieldType::String),
            EnrichmentField::new("description", FieldType::String),
        ];
        let mut discovered = FieldResults::new();
        for (name, confidence) in [("companyName", 0.9), ("website", 0.7), ("description", 0.25)] {
            discovered.insert(
                name.to_string(),
                EnrichmentResult::new(name, FieldValue::String("x".into()), confidence),
            );
        }

        let formatted = format_results(&fields, &discovered, &EnrichmentConfig::default());
        let keys: Vec<&str> = formatted.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["website", "companyName"]);
    }
}
