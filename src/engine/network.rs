//! Network allow-list expansion.

use std::collections::BTreeSet;

/// Domains every agent needs to reach its own infrastructure.
const DEFAULT_DOMAINS: &[&str] = &[
    "api.github.com",
    "api.githubcopilot.com",
    "api.anthropic.com",
    "github.com",
    "objects.githubusercontent.com",
    "raw.githubusercontent.com",
    "statsig.anthropic.com",
];

const ECOSYSTEMS: &[(&str, &[&str])] = &[
    (
        "github",
        &[
            "api.github.com",
            "codeload.github.com",
            "github.com",
            "objects.githubusercontent.com",
            "raw.githubusercontent.com",
            "uploads.github.com",
        ],
    ),
    (
        "node",
        &["nodejs.org", "registry.npmjs.org", "registry.yarnpkg.com"],
    ),
    (
        "python",
        &["files.pythonhosted.org", "pypi.org", "pypi.python.org"],
    ),
    ("rust", &["crates.io", "index.crates.io", "static.crates.io"]),
    ("containers", &["ghcr.io", "registry-1.docker.io", "auth.docker.io"]),
];

/// Expand ecosystem identifiers into domains.
///
/// An absent policy means `defaults`. The result is sorted and
/// de-duplicated so it renders identically across compiles.
pub fn expand_allowed(allowed: Option<&[String]>) -> Vec<String> {
    let defaults = ["defaults".to_string()];
    let entries = allowed.unwrap_or(&defaults);

    let mut domains = BTreeSet::new();
    for entry in entries {
        if entry == "defaults" {
            domains.extend(DEFAULT_DOMAINS.iter().map(|d| d.to_string()));
        } else if let Some((_, list)) = ECOSYSTEMS.iter().find(|(id, _)| *id == entry.as_str()) {
            domains.extend(list.iter().map(|d| d.to_string()));
        } else {
            domains.insert(entry.trim().to_lowercase());
        }
    }
    domains.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_policy_means_defaults() {
        let domains = expand_allowed(None);
        assert!(domains.contains(&"api.github.com".to_string()));
        let mut sorted = domains.clone();
        sorted.sort();
        assert_eq!(domains, sorted);
    }

    #[test]
    fn ecosystems_and_domains_combine() {
        let allowed = vec!["python".to_string(), "Example.COM".to_string()];
        let domains = expand_allowed(Some(allowed.as_slice()));
        assert!(domains.contains(&"pypi.org".to_string()));
        assert!(domains.contains(&"example.com".to_string()));
        assert!(!domains.contains(&"api.anthropic.com".to_string()));
    }

    #[test]
    fn empty_policy_allows_nothing() {
        assert!(expand_allowed(Some(&[][..])).is_empty());
    }
}
