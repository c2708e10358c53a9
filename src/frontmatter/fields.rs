//! Typed frontmatter sections.
//!
//! Scalar sections are typed directly. Sections whose merge semantics work on
//! nested structure (`tools`, `mcp-servers`, `safe-outputs`, `env`) are kept
//! as YAML values keyed by name and interpreted by the component that owns
//! them after merging.

use crate::permissions::Permissions;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Every top-level field the parser recognizes.
pub const FRONTMATTER_FIELDS: &[&str] = &[
    "name",
    "description",
    "on",
    "permissions",
    "engine",
    "tools",
    "mcp-servers",
    "safe-outputs",
    "network",
    "imports",
    "env",
    "steps",
    "post-steps",
    "strict",
    "timeout-minutes",
    "roles",
    "runs-on",
    "run-name",
    "concurrency",
    "if",
    "container",
    "environment",
    "sandbox",
    "features",
    "github-token",
    "tracker-id",
];

/// Unknown fields that are dropped instead of rejected.
///
/// Empty on purpose: every field is validated. Adding an entry here is an
/// explicit decision to accept a field without checking it.
pub const IGNORED_FRONTMATTER_FIELDS: &[&str] = &[];

/// The structured configuration block of a workflow document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Frontmatter {
    pub name: Option<String>,
    pub description: Option<String>,

    /// Trigger specification, passed through to the generated workflow
    /// after schedule and stop-time processing.
    pub on: Option<Value>,

    pub permissions: Option<Permissions>,
    pub engine: Option<EngineConfig>,

    #[serde(default)]
    pub tools: BTreeMap<String, Value>,

    #[serde(default)]
    pub mcp_servers: BTreeMap<String, Value>,

    #[serde(default)]
    pub safe_outputs: BTreeMap<String, Value>,

    pub network: Option<NetworkPolicy>,

    #[serde(default)]
    pub imports: Vec<ImportSpec>,

    #[serde(default)]
    pub env: BTreeMap<String, Value>,

    /// Custom steps run in the agent job before the engine starts.
    #[serde(default)]
    pub steps: Vec<Value>,

    /// Custom steps run in the agent job after the engine finishes.
    #[serde(default)]
    pub post_steps: Vec<Value>,

    pub strict: Option<bool>,
    pub timeout_minutes: Option<u32>,
    pub roles: Option<Roles>,
    pub runs_on: Option<Value>,
    pub run_name: Option<String>,
    pub concurrency: Option<Value>,

    #[serde(rename = "if")]
    pub condition: Option<String>,

    pub container: Option<Value>,
    pub environment: Option<Value>,
    pub sandbox: Option<Value>,

    #[serde(default)]
    pub features: BTreeMap<String, Value>,

    pub github_token: Option<String>,
    pub tracker_id: Option<String>,
}

/// Engine selection as written in frontmatter: `engine: claude` or a mapping.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "EngineConfigRepr")]
pub struct EngineConfig {
    pub id: String,
    pub version: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub env: BTreeMap<String, String>,
    pub args: Vec<String>,
    /// Steps for the `custom` engine, emitted verbatim.
    pub steps: Vec<Value>,
}

impl EngineConfig {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EngineConfigRepr {
    Id(String),
    Detailed(DetailedEngineConfig),
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct DetailedEngineConfig {
    id: String,
    version: Option<String>,
    model: Option<String>,
    max_turns: Option<u32>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    steps: Vec<Value>,
}

impl From<EngineConfigRepr> for EngineConfig {
    fn from(repr: EngineConfigRepr) -> Self {
        match repr {
            EngineConfigRepr::Id(id) => EngineConfig::with_id(id),
            EngineConfigRepr::Detailed(d) => EngineConfig {
                id: d.id,
                version: d.version,
                model: d.model,
                max_turns: d.max_turns,
                env: d.env,
                args: d.args,
                steps: d.steps,
            },
        }
    }
}

/// Network egress policy: `network: defaults` or `network: { allowed: [...] }`.
///
/// Entries are either domains or ecosystem identifiers (`defaults`,
/// `github`, `node`, `python`) expanded at compile time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "NetworkRepr")]
pub struct NetworkPolicy {
    pub allowed: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NetworkRepr {
    Preset(String),
    Rules(NetworkRules),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkRules {
    #[serde(default)]
    allowed: Vec<String>,
}

impl From<NetworkRepr> for NetworkPolicy {
    fn from(repr: NetworkRepr) -> Self {
        match repr {
            NetworkRepr::Preset(preset) => NetworkPolicy {
                allowed: vec![preset],
            },
            NetworkRepr::Rules(rules) => NetworkPolicy {
                allowed: rules.allowed,
            },
        }
    }
}

/// One entry of the `imports` list.
///
/// Written as `shared/tools.md`, `shared/tools.md#Section`, or
/// `{ path: shared/tools.md }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ImportRepr")]
pub struct ImportSpec {
    pub path: String,
    /// Optional `##` section of the fragment body to include.
    pub section: Option<String>,
}

impl ImportSpec {
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('#') {
            Some((path, section)) if !section.trim().is_empty() => ImportSpec {
                path: path.trim().to_string(),
                section: Some(section.trim().to_string()),
            },
            Some((path, _)) => ImportSpec {
                path: path.trim().to_string(),
                section: None,
            },
            None => ImportSpec {
                path: spec.trim().to_string(),
                section: None,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportRepr {
    Path(String),
    Detailed { path: String },
}

impl From<ImportRepr> for ImportSpec {
    fn from(repr: ImportRepr) -> Self {
        match repr {
            ImportRepr::Path(path) | ImportRepr::Detailed { path } => ImportSpec::parse(&path),
        }
    }
}

/// Repository roles allowed to trigger the workflow (`all` disables the check).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct Roles(pub Vec<String>);

impl Roles {
    pub fn allows_everyone(&self) -> bool {
        self.0.iter().any(|role| role == "all")
    }
}

impl Default for Roles {
    fn default() -> Self {
        Roles(vec![
            "admin".to_string(),
            "maintainer".to_string(),
            "write".to_string(),
        ])
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Roles {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(role) => Roles(vec![role]),
            OneOrMany::Many(roles) => Roles(roles),
        }
    }
}
