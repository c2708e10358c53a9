//! Permission scopes, levels and shorthand tokens.

use std::fmt;

/// A named GitHub Actions permission category.
///
/// Variants are declared in lexical order of their YAML names, so the
/// derived `Ord` matches rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionScope {
    Actions,
    Attestations,
    Checks,
    Contents,
    Deployments,
    Discussions,
    IdToken,
    Issues,
    Metadata,
    Models,
    OrganizationProjects,
    Packages,
    Pages,
    PullRequests,
    RepositoryProjects,
    SecurityEvents,
    Statuses,
}

impl PermissionScope {
    /// Every known scope, in lexical order.
    pub const ALL: [PermissionScope; 17] = [
        PermissionScope::Actions,
        PermissionScope::Attestations,
        PermissionScope::Checks,
        PermissionScope::Contents,
        PermissionScope::Deployments,
        PermissionScope::Discussions,
        PermissionScope::IdToken,
        PermissionScope::Issues,
        PermissionScope::Metadata,
        PermissionScope::Models,
        PermissionScope::OrganizationProjects,
        PermissionScope::Packages,
        PermissionScope::Pages,
        PermissionScope::PullRequests,
        PermissionScope::RepositoryProjects,
        PermissionScope::SecurityEvents,
        PermissionScope::Statuses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionScope::Actions => "actions",
            PermissionScope::Attestations => "attestations",
            PermissionScope::Checks => "checks",
            PermissionScope::Contents => "contents",
            PermissionScope::Deployments => "deployments",
            PermissionScope::Discussions => "discussions",
            PermissionScope::IdToken => "id-token",
            PermissionScope::Issues => "issues",
            PermissionScope::Metadata => "metadata",
            PermissionScope::Models => "models",
            PermissionScope::OrganizationProjects => "organization-projects",
            PermissionScope::Packages => "packages",
            PermissionScope::Pages => "pages",
            PermissionScope::PullRequests => "pull-requests",
            PermissionScope::RepositoryProjects => "repository-projects",
            PermissionScope::SecurityEvents => "security-events",
            PermissionScope::Statuses => "statuses",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == name)
    }

    /// Scopes that are never written to generated output.
    ///
    /// `organization-projects` only applies to GitHub App tokens and
    /// `metadata` is always implicitly granted.
    pub fn is_rendered(self) -> bool {
        !matches!(
            self,
            PermissionScope::OrganizationProjects | PermissionScope::Metadata
        )
    }

    /// Whether `level` is a valid grant for this scope.
    pub fn accepts(self, level: PermissionLevel) -> bool {
        !(self == PermissionScope::IdToken && level == PermissionLevel::Read)
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level for one scope. Ordered by precedence: `none < read < write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionLevel {
    None,
    Read,
    Write,
}

impl PermissionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(PermissionLevel::None),
            "read" => Some(PermissionLevel::Read),
            "write" => Some(PermissionLevel::Write),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-token permission shorthand. Ordered by precedence:
/// `none < read-all < write-all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shorthand {
    None,
    ReadAll,
    WriteAll,
}

impl Shorthand {
    pub fn as_str(self) -> &'static str {
        match self {
            Shorthand::None => "none",
            Shorthand::ReadAll => "read-all",
            Shorthand::WriteAll => "write-all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Shorthand::None),
            "read-all" => Some(Shorthand::ReadAll),
            "write-all" => Some(Shorthand::WriteAll),
            _ => None,
        }
    }

    /// The per-scope level this shorthand implies.
    pub fn level(self) -> PermissionLevel {
        match self {
            Shorthand::None => PermissionLevel::None,
            Shorthand::ReadAll => PermissionLevel::Read,
            Shorthand::WriteAll => PermissionLevel::Write,
        }
    }
}

impl fmt::Display for Shorthand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_order_is_lexical() {
        let mut names: Vec<&str> = PermissionScope::ALL.iter().map(|s| s.as_str()).collect();
        let declared = names.clone();
        names.sort_unstable();
        assert_eq!(names, declared);
    }

    #[test]
    fn scope_parse_round_trips() {
        for scope in PermissionScope::ALL {
            assert_eq!(PermissionScope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(PermissionScope::parse("issue"), None);
    }

    #[test]
    fn level_precedence() {
        assert!(PermissionLevel::Write > PermissionLevel::Read);
        assert!(PermissionLevel::Read > PermissionLevel::None);
        assert!(Shorthand::WriteAll > Shorthand::ReadAll);
        assert!(Shorthand::ReadAll > Shorthand::None);
    }

    #[test]
    fn id_token_rejects_read() {
        assert!(!PermissionScope::IdToken.accepts(PermissionLevel::Read));
        assert!(PermissionScope::IdToken.accepts(PermissionLevel::Write));
        assert!(PermissionScope::Issues.accepts(PermissionLevel::Read));
    }
}
