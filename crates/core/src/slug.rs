//! Slug derivation for human-readable names and titles.

/// Derive a URL-safe slug: lowercase ASCII alphanumerics separated by single
/// dashes, with no leading or trailing dash.
///
/// Slugifying an existing slug returns it unchanged.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercases_single_word() {
        assert_eq!(slugify("Shoes"), "shoes");
    }

    #[test]
    fn collapses_separators_and_trims() {
        assert_eq!(slugify("  Apple  iPhone 15 -- Pro! "), "apple-iphone-15-pro");
    }

    #[test]
    fn non_ascii_only_yields_empty() {
        assert_eq!(slugify("ünï"), "n");
        assert_eq!(slugify("!!!"), "");
    }

    proptest! {
        #[test]
        fn slugify_is_idempotent(name in "\\PC{0,60}") {
            let once = slugify(&name);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn slug_contains_only_url_safe_chars(name in "\\PC{0,60}") {
            let slug = slugify(&name);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
