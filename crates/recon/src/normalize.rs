//! Medication name normalization.
//!
//! The default key is the lower-cased first whitespace token of the display
//! name ("Lisinopril 10mg" -> "lisinopril"). This is a coarse stand-in for
//! RxNorm/NDC identity; callers with coded data plug in their own
//! [`DrugKeyResolver`].

/// Maps a free-text medication name to a matching key.
///
/// An empty key means "unknown": it matches no other record and resolves to
/// the default formulary policy.
pub trait DrugKeyResolver: Send + Sync {
    fn resolve(&self, display_name: &str) -> String;
}

/// First-token resolver backed by [`normalize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTokenResolver;

impl DrugKeyResolver for FirstTokenResolver {
    fn resolve(&self, display_name: &str) -> String {
        normalize(display_name)
    }
}

/// Lower-case first whitespace-delimited token. Never fails; blank input gives `""`.
pub fn normalize(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Permissive key match used by the reconciliation matcher.
///
/// Keys match when neither is empty and one contains the other,
/// case-insensitively. Equal keys always match.
pub fn keys_match(home_key: &str, inpatient_key: &str) -> bool {
    if home_key.is_empty() || inpatient_key.is_empty() {
        return false;
    }
    let home = home_key.to_lowercase();
    let inpatient = inpatient_key.to_lowercase();
    home.contains(&inpatient) || inpatient.contains(&home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_strength() {
        assert_eq!(normalize("Lisinopril 10mg"), "lisinopril");
        assert_eq!(normalize("  METFORMIN   1000 mg tablet"), "metformin");
    }

    #[test]
    fn blank_is_unknown() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t\n"), "");
    }

    #[test]
    fn single_token() {
        assert_eq!(normalize("Warfarin"), "warfarin");
    }

    #[test]
    fn empty_keys_never_match() {
        assert!(!keys_match("", ""));
        assert!(!keys_match("aspirin", ""));
        assert!(!keys_match("", "aspirin"));
    }

    #[test]
    fn substring_in_either_direction() {
        assert!(keys_match("metoprolol", "metoprolol"));
        assert!(keys_match("metoprolol-xl", "metoprolol"));
        assert!(keys_match("insulin", "insulin-glargine"));
        assert!(!keys_match("lisinopril", "losartan"));
    }

    #[test]
    fn match_ignores_case_for_custom_resolvers() {
        assert!(keys_match("Apixaban", "apixaban"));
    }

    #[test]
    fn resolver_delegates_to_normalize() {
        assert_eq!(FirstTokenResolver.resolve("Atorvastatin 40 mg"), "atorvastatin");
    }
}
