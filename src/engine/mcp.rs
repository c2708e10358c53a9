//! MCP server configuration.
//!
//! Collects the MCP servers an agent can reach (built-in tools, the safe
//! outputs server and user `mcp-servers`) and renders the JSON config file
//! each engine CLI reads.

use super::tools::{GithubTool, ToolSet};
use crate::error::{CompileError, Result};
use serde_json::{Map, Value as Json, json};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Pinned image of the GitHub MCP server.
pub const GITHUB_MCP_IMAGE: &str = "ghcr.io/github/github-mcp-server:v0.20.1";
/// Pinned Playwright MCP package.
pub const PLAYWRIGHT_MCP_PACKAGE: &str = "@playwright/mcp@0.0.41";
/// Path of the safe outputs MCP server script on the runner.
pub const SAFE_OUTPUTS_SERVER_SCRIPT: &str = "/tmp/gh-aw/actions/safe_outputs_mcp_server.cjs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTransport {
    Stdio { command: String, args: Vec<String> },
    Container { image: String, args: Vec<String> },
    Http {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServer {
    pub name: String,
    pub transport: McpTransport,
    pub env: BTreeMap<String, String>,
    /// Allowed tool names; empty means all.
    pub allowed: Vec<String>,
}

/// JSON dialect of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpFormat {
    Copilot,
    Claude,
}

impl McpServer {
    /// Parse one `mcp-servers` entry.
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let list = |key: &str| -> Vec<String> {
            value
                .get(key)
                .and_then(Value::as_sequence)
                .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default()
        };
        let map = |key: &str| -> BTreeMap<String, String> {
            value
                .get(key)
                .and_then(Value::as_mapping)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
                        .collect()
                })
                .unwrap_or_default()
        };

        let transport = match (text("command"), text("container"), text("url")) {
            (Some(command), None, None) => McpTransport::Stdio {
                command,
                args: list("args"),
            },
            (None, Some(image), None) => McpTransport::Container {
                image,
                args: list("args"),
            },
            (None, None, Some(url)) => McpTransport::Http {
                url,
                headers: map("headers"),
            },
            (None, None, None) => {
                return Err(CompileError::configuration(format!(
                    "mcp server '{}' needs one of 'command', 'container' or 'url'",
                    name
                )));
            }
            _ => {
                return Err(CompileError::configuration(format!(
                    "mcp server '{}' must set only one of 'command', 'container' or 'url'",
                    name
                )));
            }
        };

        Ok(Self {
            name: name.to_string(),
            transport,
            env: map("env"),
            allowed: list("allowed"),
        })
    }

    fn github(tool: &GithubTool) -> Self {
        let mut env = BTreeMap::new();
        env.insert(
            "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
            "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}".to_string(),
        );
        env.insert("GITHUB_TOOLSETS".to_string(), tool.toolsets.join(","));
        env.insert("GITHUB_READ_ONLY".to_string(), "1".to_string());
        Self {
            name: "github".to_string(),
            transport: McpTransport::Container {
                image: GITHUB_MCP_IMAGE.to_string(),
                args: Vec::new(),
            },
            env,
            allowed: tool.allowed.clone(),
        }
    }

    fn playwright(domains: &[String]) -> Self {
        let mut args = vec![PLAYWRIGHT_MCP_PACKAGE.to_string(), "--headless".to_string()];
        if !domains.is_empty() {
            args.push("--allowed-origins".to_string());
            args.push(domains.join(";"));
        }
        Self {
            name: "playwright".to_string(),
            transport: McpTransport::Stdio {
                command: "npx".to_string(),
                args,
            },
            env: BTreeMap::new(),
            allowed: Vec::new(),
        }
    }

    fn safe_outputs() -> Self {
        let mut env = BTreeMap::new();
        for var in ["GH_AW_SAFE_OUTPUTS", "GH_AW_SAFE_OUTPUTS_CONFIG"] {
            env.insert(var.to_string(), format!("${{{{ env.{} }}}}", var));
        }
        Self {
            name: "safeoutputs".to_string(),
            transport: McpTransport::Stdio {
                command: "node".to_string(),
                args: vec![SAFE_OUTPUTS_SERVER_SCRIPT.to_string()],
            },
            env,
            allowed: Vec::new(),
        }
    }

    fn to_json(&self, format: McpFormat) -> Json {
        let mut entry = Map::new();
        match (&self.transport, format) {
            (McpTransport::Stdio { command, args }, McpFormat::Copilot) => {
                entry.insert("type".into(), json!("local"));
                entry.insert("command".into(), json!(command));
                entry.insert("args".into(), json!(args));
            }
            (McpTransport::Stdio { command, args }, McpFormat::Claude) => {
                entry.insert("command".into(), json!(command));
                entry.insert("args".into(), json!(args));
            }
            (McpTransport::Container { image, args }, format) => {
                if format == McpFormat::Copilot {
                    entry.insert("type".into(), json!("local"));
                }
                let mut docker_args = vec!["run".to_string(), "-i".to_string(), "--rm".to_string()];
                for name in self.env.keys() {
                    docker_args.push("-e".to_string());
                    docker_args.push(name.clone());
                }
                docker_args.push(image.clone());
                docker_args.extend(args.iter().cloned());
                entry.insert("command".into(), json!("docker"));
                entry.insert("args".into(), json!(docker_args));
            }
            (McpTransport::Http { url, headers }, _) => {
                entry.insert("type".into(), json!("http"));
                entry.insert("url".into(), json!(url));
                if !headers.is_empty() {
                    entry.insert("headers".into(), json!(headers));
                }
            }
        }

        if format == McpFormat::Copilot {
            let tools = if self.allowed.is_empty() {
                vec!["*".to_string()]
            } else {
                self.allowed.clone()
            };
            entry.insert("tools".into(), json!(tools));
        }
        if !self.env.is_empty() {
            entry.insert("env".into(), json!(self.env));
        }
        Json::Object(entry)
    }
}

/// Every MCP server the agent can reach, sorted by name.
pub fn collect_servers(
    tools: &ToolSet,
    custom: &BTreeMap<String, Value>,
    safe_outputs: bool,
) -> Result<Vec<McpServer>> {
    let mut servers: BTreeMap<String, McpServer> = BTreeMap::new();

    if let Some(github) = &tools.github {
        servers.insert("github".to_string(), McpServer::github(github));
    }
    if let Some(playwright) = &tools.playwright {
        servers.insert(
            "playwright".to_string(),
            McpServer::playwright(&playwright.allowed_domains),
        );
    }
    if safe_outputs {
        servers.insert("safeoutputs".to_string(), McpServer::safe_outputs());
    }
    for (name, value) in custom {
        if servers.contains_key(name) {
            return Err(CompileError::configuration(format!(
                "mcp server '{}' conflicts with a built-in server",
                name
            )));
        }
        servers.insert(name.clone(), McpServer::from_value(name, value)?);
    }

    Ok(servers.into_values().collect())
}

/// Render the `mcpServers` JSON document.
pub fn render_config(servers: &[McpServer], format: McpFormat) -> String {
    let entries: Map<String, Json> = servers
        .iter()
        .map(|server| (server.name.clone(), server.to_json(format)))
        .collect();
    let document = json!({ "mcpServers": Json::Object(entries) });
    serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(yaml: &str) -> BTreeMap<String, Value> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn builtin_and_custom_servers_are_sorted() {
        let servers = collect_servers(
            &ToolSet::default(),
            &custom("notion:\n  command: npx\n  args: [notion-mcp]\n"),
            true,
        )
        .unwrap();
        let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["github", "notion", "safeoutputs"]);
    }

    #[test]
    fn custom_server_needs_exactly_one_transport() {
        assert!(McpServer::from_value("x", &serde_yaml::from_str("args: [a]").unwrap()).is_err());
        assert!(
            McpServer::from_value(
                "x",
                &serde_yaml::from_str("command: a\nurl: https://x").unwrap()
            )
            .is_err()
        );
    }

    #[test]
    fn builtin_name_conflict_is_rejected() {
        let err = collect_servers(
            &ToolSet::default(),
            &custom("github:\n  url: https://example.com/mcp\n"),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("conflicts"));
    }

    #[test]
    fn copilot_format_lists_tools() {
        let servers = collect_servers(&ToolSet::default(), &BTreeMap::new(), false).unwrap();
        let config: Json = serde_json::from_str(&render_config(&servers, McpFormat::Copilot)).unwrap();
        let github = &config["mcpServers"]["github"];
        assert_eq!(github["type"], "local");
        assert_eq!(github["command"], "docker");
        assert_eq!(github["tools"], json!(["*"]));
        assert_eq!(github["env"]["GITHUB_READ_ONLY"], "1");
    }

    #[test]
    fn claude_format_omits_type_for_stdio() {
        let servers = collect_servers(
            &ToolSet {
                github: None,
                ..ToolSet::default()
            },
            &custom("local:\n  command: ./server\n"),
            false,
        )
        .unwrap();
        let config: Json = serde_json::from_str(&render_config(&servers, McpFormat::Claude)).unwrap();
        let local = &config["mcpServers"]["local"];
        assert!(local.get("type").is_none());
        assert_eq!(local["command"], "./server");
        assert!(local.get("tools").is_none());
    }

    #[test]
    fn rendering_is_stable() {
        let servers = collect_servers(&ToolSet::default(), &BTreeMap::new(), true).unwrap();
        assert_eq!(
            render_config(&servers, McpFormat::Claude),
            render_config(&servers, McpFormat::Claude)
        );
    }
}
