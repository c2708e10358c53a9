//! Configuration merging.
//!
//! Folds the frontmatter of every imported fragment (in merge order) and the
//! root document into one effective [`Frontmatter`]:
//!
//! - `permissions` merge with the permission algebra,
//! - list fields union with de-duplication, fragments first and root last,
//! - keyed maps (`tools`, `mcp-servers`, `env`, `safe-outputs`) merge per key,
//!   later documents winning on conflicting scalar leaves,
//! - scalar fields take the root value if set, otherwise the first fragment
//!   that sets one.

mod values;

#[cfg(test)]
mod tests;

pub use values::{deep_merge, merge_keyed, union_into};

use crate::frontmatter::{Frontmatter, NetworkPolicy, Roles};
use crate::imports::ImportGraph;
use crate::permissions::Permissions;

/// Merge `fragments` (in merge order) with `root`.
pub fn merge_frontmatter(root: &Frontmatter, fragments: &[&Frontmatter]) -> Frontmatter {
    // Root first for "root wins, else first fragment" scalars.
    let precedence: Vec<&Frontmatter> = std::iter::once(root)
        .chain(fragments.iter().copied())
        .collect();
    // Fragments first, root last for unions and keyed overrides.
    let layered: Vec<&Frontmatter> = fragments
        .iter()
        .copied()
        .chain(std::iter::once(root))
        .collect();

    macro_rules! first_set {
        ($field:ident) => {
            precedence.iter().find_map(|fm| fm.$field.clone())
        };
    }

    Frontmatter {
        name: first_set!(name),
        description: first_set!(description),
        on: first_set!(on),
        permissions: merge_permissions(&layered),
        engine: first_set!(engine),
        tools: merge_keyed(layered.iter().map(|fm| &fm.tools)),
        mcp_servers: merge_keyed(layered.iter().map(|fm| &fm.mcp_servers)),
        safe_outputs: merge_keyed(layered.iter().map(|fm| &fm.safe_outputs)),
        network: merge_network(&layered),
        imports: root.imports.clone(),
        env: merge_keyed(layered.iter().map(|fm| &fm.env)),
        steps: union_all(layered.iter().map(|fm| fm.steps.as_slice())),
        post_steps: union_all(layered.iter().map(|fm| fm.post_steps.as_slice())),
        strict: first_set!(strict),
        timeout_minutes: first_set!(timeout_minutes),
        roles: merge_roles(&layered),
        runs_on: first_set!(runs_on),
        run_name: first_set!(run_name),
        concurrency: first_set!(concurrency),
        condition: first_set!(condition),
        container: first_set!(container),
        environment: first_set!(environment),
        sandbox: first_set!(sandbox),
        features: merge_keyed(layered.iter().map(|fm| &fm.features)),
        github_token: first_set!(github_token),
        tracker_id: first_set!(tracker_id),
    }
}

/// Merge the root document's frontmatter with every fragment of its graph.
pub fn merge_graph(root: &Frontmatter, graph: &ImportGraph) -> Frontmatter {
    let fragments: Vec<&Frontmatter> = graph
        .fragments()
        .map(|fragment| &fragment.document.frontmatter)
        .collect();
    tracing::debug!(fragments = fragments.len(), "merging frontmatter");
    merge_frontmatter(root, &fragments)
}

fn merge_permissions(layered: &[&Frontmatter]) -> Option<Permissions> {
    layered
        .iter()
        .filter_map(|fm| fm.permissions.as_ref())
        .fold(None, |acc: Option<Permissions>, next| match acc {
            None => Some(next.clone()),
            Some(current) => Some(current.merged(next)),
        })
}

fn merge_network(layered: &[&Frontmatter]) -> Option<NetworkPolicy> {
    let policies: Vec<&NetworkPolicy> = layered.iter().filter_map(|fm| fm.network.as_ref()).collect();
    if policies.is_empty() {
        return None;
    }
    let allowed = union_all(policies.iter().map(|p| p.allowed.as_slice()));
    Some(NetworkPolicy { allowed })
}

fn merge_roles(layered: &[&Frontmatter]) -> Option<Roles> {
    let roles: Vec<&Roles> = layered.iter().filter_map(|fm| fm.roles.as_ref()).collect();
    if roles.is_empty() {
        return None;
    }
    Some(Roles(union_all(roles.iter().map(|r| r.0.as_slice()))))
}

fn union_all<'a, T, I>(lists: I) -> Vec<T>
where
    T: PartialEq + Clone + 'a,
    I: IntoIterator<Item = &'a [T]>,
{
    let mut merged = Vec::new();
    for list in lists {
        union_into(&mut merged, list);
    }
    merged
}
