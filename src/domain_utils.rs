//! Root-domain reduction and public-suffix diagnostics.
//!
//! Grouping uses a deliberately simple heuristic: keep the last two labels.
//! It handles `.com`, `.net`, `.org` style names well and collapses two-part
//! country-code suffixes incorrectly:
//! - mail.sub.example.com -> example.com
//! - example.com -> example.com
//! - news.example.co.uk -> co.uk (heuristic), example.co.uk (PSL)
//!
//! The Public Suffix List is only consulted to *report* where the heuristic
//! diverges; it never changes how records are grouped.

use psl::domain_str;
use serde::Serialize;

/// Reduce an already lower-cased domain to its last two labels.
///
/// Total on any input: an empty string stays empty and single-label names
/// (`localhost`) are returned unchanged.
pub fn normalize_root(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() > 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        domain.to_string()
    }
}

/// Registrable domain according to the Public Suffix List, if any.
pub fn registrable_domain(domain: &str) -> Option<String> {
    let clean = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if clean.is_empty() {
        return None;
    }
    domain_str(&clean).map(|s| s.to_string())
}

/// A place where the two-label heuristic disagrees with the PSL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuffixMismatch {
    /// Root the records were grouped under.
    pub heuristic_root: String,
    /// Registrable domain the PSL would have produced.
    pub registrable: String,
}

impl SuffixMismatch {
    pub fn describe(&self) -> String {
        format!(
            "'{}' is grouped as '{}' (registrable domain per public suffix list: '{}')",
            self.registrable, self.heuristic_root, self.registrable
        )
    }
}

/// Compare heuristic and PSL roots for a lower-cased origin domain.
///
/// Returns `None` when they agree or the PSL has no opinion (single labels,
/// address-like values, unknown suffixes).
pub fn suffix_mismatch(origin: &str) -> Option<SuffixMismatch> {
    if origin.contains('@') {
        return None;
    }
    let heuristic_root = normalize_root(origin);
    let registrable = registrable_domain(origin)?;
    if registrable == heuristic_root {
        return None;
    }
    // The PSL wildcard fallback treats any unknown last label as a suffix; only
    // report multi-label suffixes, which is where the heuristic goes wrong.
    if registrable.split('.').count() <= 2 {
        return None;
    }
    Some(SuffixMismatch {
        heuristic_root,
        registrable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_root("mail.sub.example.com"), "example.com");
        assert_eq!(normalize_root("example.com"), "example.com");
        assert_eq!(normalize_root("localhost"), "localhost");
        assert_eq!(normalize_root(""), "");
    }

    #[test]
    fn test_normalize_root_is_heuristic_for_cctld() {
        // Accepted approximation: two-part suffixes collapse.
        assert_eq!(normalize_root("news.example.co.uk"), "co.uk");
    }

    #[test]
    fn test_normalize_root_keeps_odd_labels() {
        assert_eq!(normalize_root("a..b.c"), "b.c");
        assert_eq!(normalize_root("trailing.example.com."), "com.");
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(
            registrable_domain("sub.example.co.uk").as_deref(),
            Some("example.co.uk")
        );
        assert_eq!(
            registrable_domain("Mail.Example.Com.").as_deref(),
            Some("example.com")
        );
        assert_eq!(registrable_domain(""), None);
    }

    #[test]
    fn test_suffix_mismatch_reports_cctld() {
        let mismatch = suffix_mismatch("news.example.co.uk").unwrap();
        assert_eq!(mismatch.heuristic_root, "co.uk");
        assert_eq!(mismatch.registrable, "example.co.uk");
        assert!(mismatch.describe().contains("co.uk"));
    }

    #[test]
    fn test_suffix_mismatch_silent_when_agreeing() {
        assert_eq!(suffix_mismatch("mail.sub.example.com"), None);
        assert_eq!(suffix_mismatch("example.com"), None);
        assert_eq!(suffix_mismatch("localhost"), None);
        assert_eq!(suffix_mismatch("x@example.co.uk"), None);
    }
}
