//! Reference plugins for every node type.

mod analytics;
mod backend_api;
mod erc1155;
mod erc20;
mod frontend;
mod ipfs_storage;
mod wallet_auth;

pub use analytics::AnalyticsPlugin;
pub use backend_api::BackendApiPlugin;
pub use erc1155::Erc1155Plugin;
pub use erc20::Erc20Plugin;
pub use frontend::FrontendScaffoldPlugin;
pub use ipfs_storage::IpfsStoragePlugin;
pub use wallet_auth::WalletAuthPlugin;

use crate::dsl::NodeType;
use crate::plugins::{PluginError, PluginRegistry};
use crate::runtime::context::ExecutionContext;
use crate::schema::{FieldKind, FieldSpec};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Files a frontend scaffold may render its provider anchor into.
pub const FRONTEND_ENTRIES: [&str; 2] = ["apps/web/src/app/layout.tsx", "apps/web/src/app/App.tsx"];

/// Marker inside the frontend entry where providers and global widgets go.
pub const PROVIDERS_ANCHOR: &str = "{/* providers */}";

pub const CHILDREN_SLOT: &str = "{children}";

pub fn register_all(registry: &mut PluginRegistry) {
    registry.register(Arc::new(FrontendScaffoldPlugin::new()));
    registry.register(Arc::new(Erc20Plugin::new()));
    registry.register(Arc::new(Erc1155Plugin::new()));
    registry.register(Arc::new(WalletAuthPlugin::new()));
    registry.register(Arc::new(IpfsStoragePlugin::new()));
    registry.register(Arc::new(AnalyticsPlugin::new()));
    registry.register(Arc::new(BackendApiPlugin::new()));
}

/// Template variables: the project fields, then the typed config on top.
pub(crate) fn template_vars(ctx: &ExecutionContext, config: &impl Serialize) -> Result<Value, PluginError> {
    let mut vars = Map::new();
    vars.insert("projectName".into(), Value::from(ctx.project_name.clone()));
    vars.insert("projectSlug".into(), Value::from(ctx.project_slug.clone()));
    let config = serde_json::to_value(config).map_err(|e| PluginError::Generation(e.to_string()))?;
    if let Value::Object(fields) = config {
        vars.extend(fields);
    }
    Ok(Value::Object(vars))
}

pub(crate) fn insert(vars: &mut Value, key: &str, value: impl Into<Value>) {
    if let Value::Object(map) = vars {
        map.insert(key.to_string(), value.into());
    }
}

/// The frontend entry file already in the tree, if a scaffold ran before.
pub(crate) fn frontend_entry(ctx: &ExecutionContext) -> Option<&'static str> {
    FRONTEND_ENTRIES.iter().copied().find(|path| ctx.has_file(path))
}

/// Prefix that exposes env vars to browser code for the scaffolded frontend.
pub(crate) fn public_env_prefix(ctx: &ExecutionContext) -> &'static str {
    let vite = ctx
        .upstream_of(NodeType::FrontendScaffold)
        .any(|u| u.config.get("framework").and_then(Value::as_str) == Some("vite"));
    if vite || ctx.has_file("apps/web/vite.config.ts") {
        "VITE_"
    } else {
        "NEXT_PUBLIC_"
    }
}

/// Expression prefix that reads a public env var in browser code.
pub(crate) fn public_env_access(prefix: &str) -> String {
    if prefix == "VITE_" {
        "import.meta.env.VITE_".to_string()
    } else {
        format!("process.env.{}", prefix)
    }
}

/// Name and symbol-derived identifiers of upstream token contracts.
pub(crate) fn upstream_contracts(ctx: &ExecutionContext) -> Vec<Value> {
    ctx.upstream
        .iter()
        .filter(|u| u.kind.is_contract())
        .map(|u| {
            let name = u.config.get("name").and_then(Value::as_str).unwrap_or(&u.id);
            let slug = crate::merge::router::slugify(name);
            serde_json::json!({
                "nodeId": u.id,
                "name": name,
                "slug": slug,
                "standard": if u.kind == NodeType::Erc20Token { "erc20" } else { "erc1155" },
                "addressVar": contract_address_var(name),
            })
        })
        .collect()
}

/// `My Token` becomes `MY_TOKEN_CONTRACT_ADDRESS`.
pub(crate) fn contract_address_var(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    format!("{}_CONTRACT_ADDRESS", trimmed)
}

/// Contract names end up in Rust identifiers and string literals, so they
/// must start with a letter and stay within `[A-Za-z0-9 _-]`.
pub(crate) fn contract_name_field(description: &str) -> FieldSpec {
    FieldSpec::required(
        "name",
        FieldKind::String {
            min_len: Some(1),
            max_len: Some(64),
            pattern: Some(CONTRACT_NAME_PATTERN.to_string()),
        },
    )
    .describe(description)
}

pub(crate) const CONTRACT_NAME_PATTERN: &str = "^[A-Za-z][A-Za-z0-9 _-]*$";

/// `my-token` becomes `MyToken`.
pub(crate) fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_from_names() {
        assert_eq!(contract_address_var("My Token"), "MY_TOKEN_CONTRACT_ADDRESS");
        assert_eq!(contract_address_var("game-items!"), "GAME_ITEMS_CONTRACT_ADDRESS");
        assert_eq!(pascal_case("my token"), "MyToken");
        assert_eq!(pascal_case("game-items"), "GameItems");
    }

    #[test]
    fn contract_names_are_identifier_safe() {
        let schema = crate::schema::ConfigSchema::new().field(contract_name_field("Token name"));
        for ok in ["Gold Coin", "game-items", "A1_b"] {
            assert!(schema.validate(&serde_json::json!({ "name": ok })).is_ok(), "{}", ok);
        }
        for bad in ["???", "9lives", "Say \"hi\"", "tab\there"] {
            assert!(schema.validate(&serde_json::json!({ "name": bad })).is_err(), "{}", bad);
        }
    }
}
