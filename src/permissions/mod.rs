//! Permission model for generated jobs.
//!
//! A [`Permissions`] value holds exactly one of three representations:
//!
//! - a shorthand token (`read-all`, `write-all`, `none`),
//! - an explicit scope → level map,
//! - a blanket level for every scope with an explicit overlay for exceptions
//!   (written as `all: read` in frontmatter).
//!
//! # Merge algebra
//!
//! Merging is per scope with precedence `write > read > none`. Two bare
//! shorthands merge to the higher shorthand without expansion. Any other
//! combination expands both sides into explicit maps first. Expansion of a
//! `read` level never produces `id-token: read`, which GitHub rejects.
//!
//! ```
//! use awc::permissions::{Permissions, PermissionScope, PermissionLevel};
//!
//! let root = Permissions::explicit([(PermissionScope::Issues, PermissionLevel::Write)]);
//! let shared = Permissions::explicit([(PermissionScope::Issues, PermissionLevel::Read)]);
//! let merged = root.merged(&shared);
//! assert_eq!(merged.get(PermissionScope::Issues), Some(PermissionLevel::Write));
//! ```

mod parse;
mod scope;


pub use parse::PermissionError;
pub use scope::{PermissionLevel, PermissionScope, Shorthand};

use std::collections::BTreeMap;
use std::fmt;

/// Scope → level map used by the explicit and blanket representations.
pub type ScopeMap = BTreeMap<PermissionScope, PermissionLevel>;

/// Job or workflow permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    /// A single token applying uniformly to all scopes.
    Shorthand(Shorthand),
    /// Explicit per-scope grants. Unlisted scopes have no access.
    Explicit(ScopeMap),
    /// A level for every scope, with explicit exceptions layered on top.
    Blanket {
        level: PermissionLevel,
        overrides: ScopeMap,
    },
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::Explicit(ScopeMap::new())
    }
}

impl Permissions {
    /// Build an explicit map from `(scope, level)` pairs.
    pub fn explicit<I>(grants: I) -> Self
    where
        I: IntoIterator<Item = (PermissionScope, PermissionLevel)>,
    {
        Permissions::Explicit(grants.into_iter().collect())
    }

    /// Look up the effective level for one scope.
    ///
    /// Explicit entries win, then the shorthand or blanket level. A `read`
    /// shorthand or blanket does not report a level for `id-token`.
    pub fn get(&self, scope: PermissionScope) -> Option<PermissionLevel> {
        match self {
            Permissions::Explicit(map) => map.get(&scope).copied(),
            Permissions::Shorthand(shorthand) => implied(shorthand.level(), scope),
            Permissions::Blanket { level, overrides } => overrides
                .get(&scope)
                .copied()
                .or_else(|| implied(*level, scope)),
        }
    }

    /// Assign an explicit level for one scope.
    ///
    /// A shorthand or blanket receiver is expanded into an explicit map first,
    /// so the explicit value always wins.
    pub fn set(
        &mut self,
        scope: PermissionScope,
        level: PermissionLevel,
    ) -> Result<(), PermissionError> {
        if !scope.accepts(level) {
            return Err(PermissionError::IdTokenRead);
        }
        let mut map = self.to_scope_map();
        map.insert(scope, level);
        *self = Permissions::Explicit(map);
        Ok(())
    }

    /// Merge two permission values into a new one.
    pub fn merged(&self, other: &Permissions) -> Permissions {
        if let (Permissions::Shorthand(a), Permissions::Shorthand(b)) = (self, other) {
            return Permissions::Shorthand((*a).max(*b));
        }

        let mut map = self.to_scope_map();
        for (scope, level) in other.to_scope_map() {
            map.entry(scope)
                .and_modify(|existing| *existing = (*existing).max(level))
                .or_insert(level);
        }
        Permissions::Explicit(map)
    }

    /// In-place form of [`Permissions::merged`].
    pub fn merge(&mut self, other: &Permissions) {
        *self = self.merged(other);
    }

    /// Expand into an explicit scope map.
    ///
    /// `none` expands to the empty map; `read` skips `id-token`.
    pub fn to_scope_map(&self) -> ScopeMap {
        match self {
            Permissions::Explicit(map) => map.clone(),
            Permissions::Shorthand(shorthand) => expand(shorthand.level()),
            Permissions::Blanket { level, overrides } => {
                let mut map = expand(*level);
                map.extend(overrides.iter().map(|(s, l)| (*s, *l)));
                map
            }
        }
    }

    /// Entries written to generated output, in lexical scope order.
    pub fn rendered_entries(&self) -> Vec<(PermissionScope, PermissionLevel)> {
        self.to_scope_map()
            .into_iter()
            .filter(|(scope, _)| scope.is_rendered())
            .collect()
    }

    /// Scopes granted `write`.
    pub fn write_scopes(&self) -> Vec<PermissionScope> {
        self.to_scope_map()
            .into_iter()
            .filter(|(_, level)| *level == PermissionLevel::Write)
            .map(|(scope, _)| scope)
            .collect()
    }

    /// Whether the value renders as a bare shorthand token.
    pub fn shorthand(&self) -> Option<Shorthand> {
        match self {
            Permissions::Shorthand(shorthand) => Some(*shorthand),
            _ => None,
        }
    }
}

fn implied(level: PermissionLevel, scope: PermissionScope) -> Option<PermissionLevel> {
    scope.accepts(level).then_some(level)
}

fn expand(level: PermissionLevel) -> ScopeMap {
    if level == PermissionLevel::None {
        return ScopeMap::new();
    }
    PermissionScope::ALL
        .into_iter()
        .filter(|scope| scope.accepts(level))
        .map(|scope| (scope, level))
        .collect()
}

/// Renders the YAML value of a `permissions:` key.
///
/// Shorthand renders as its token, an empty map as `{}`, anything else as
/// `scope: level` lines.
impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(shorthand) = self.shorthand() {
            return f.write_str(shorthand.as_str());
        }
        let entries = self.rendered_entries();
        if entries.is_empty() {
            return f.write_str("{}");
        }
        for (i, (scope, level)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}: {}", scope, level)?;
        }
        Ok(())
    }
}
