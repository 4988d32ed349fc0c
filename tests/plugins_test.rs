use blueprint_forge::dsl::builder::BlueprintBuilder;
use blueprint_forge::dsl::{Blueprint, NodeType};
use blueprint_forge::plugins::output::PatchOperation;
use blueprint_forge::plugins::{CodegenOutput, PluginError, PluginRegistry, PortDirection};
use blueprint_forge::runtime::context::ExecutionContext;
use serde_json::{Value, json};

async fn run_plugin(bp: &Blueprint, node_id: &str, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
    let registry = PluginRegistry::with_builtins();
    let node = bp.node(node_id).expect("node exists");
    let plugin = registry.get(node.kind).expect("plugin registered");
    plugin.generate(node, ctx).await
}

fn single(kind: NodeType, config: Value) -> Blueprint {
    BlueprintBuilder::new("plugins").name("Plugin Lab").raw_node("n", kind, config).build()
}

fn paths(output: &CodegenOutput) -> Vec<&str> {
    output.files.iter().map(|f| f.path.as_str()).collect()
}

#[test]
fn test_registry_covers_every_node_type() {
    let registry = PluginRegistry::with_builtins();
    assert_eq!(registry.len(), NodeType::ALL.len());
    for kind in NodeType::ALL {
        let plugin = registry.get(kind).expect("registered");
        assert_eq!(plugin.node_type(), kind);
        assert_eq!(plugin.metadata().id, kind.as_str());
    }

    let listed: Vec<NodeType> = registry.list().iter().map(|p| p.node_type()).collect();
    let mut sorted = listed.clone();
    sorted.sort();
    assert_eq!(listed, sorted);
}

#[test]
fn test_contract_plugins_expose_abi_output() {
    let registry = PluginRegistry::with_builtins();
    for kind in [NodeType::Erc20Token, NodeType::Erc1155Token] {
        let plugin = registry.get(kind).expect("registered");
        assert!(
            plugin
                .ports()
                .iter()
                .any(|p| p.direction == PortDirection::Output && p.data_type == "contract-abi")
        );
    }
}

#[tokio::test]
async fn test_erc20_defaults_and_outputs() {
    let bp = single(NodeType::Erc20Token, json!({ "name": "Gold Coin", "symbol": "GOLD" }));
    let ctx = ExecutionContext::detached(&bp);
    let output = run_plugin(&bp, "n", &ctx).await.expect("generate");

    let files = paths(&output);
    assert!(files.contains(&"lib.rs"));
    assert!(files.contains(&"Cargo.toml"));
    assert!(files.contains(&"deploy-gold-coin.sh"));

    let lib = &output.files.iter().find(|f| f.path == "lib.rs").expect("lib").content;
    assert!(lib.starts_with("// SPDX-License-Identifier: MIT\n"));
    assert!(lib.contains("Gold Coin"));
    assert!(lib.contains("GOLD"));
    assert!(!lib.contains("pub fn mint"));

    assert!(output.env_vars.iter().any(|v| v.name == "GOLD_COIN_CONTRACT_ADDRESS"));
    assert!(output.env_vars.iter().any(|v| v.name == "DEPLOYER_PRIVATE_KEY" && v.secret));
    assert!(output.scripts.iter().any(|s| s.name == "deploy:gold-coin"));
    assert!(output.interfaces.iter().any(|i| i.name == "GoldCoinAbi"));
}

#[tokio::test]
async fn test_erc20_rejects_invalid_config() {
    let bp = single(NodeType::Erc20Token, json!({ "name": "", "symbol": "GOLD" }));
    let ctx = ExecutionContext::detached(&bp);
    let err = run_plugin(&bp, "n", &ctx).await.expect_err("invalid config");
    match err {
        PluginError::InvalidConfig { node_id, issues } => {
            assert_eq!(node_id, "n");
            assert_eq!(issues[0].path, "config.name");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_contract_names_must_be_identifier_safe() {
    for (kind, config) in [
        (NodeType::Erc20Token, json!({ "name": "Say \"hi\"", "symbol": "GOLD" })),
        (NodeType::Erc20Token, json!({ "name": "???", "symbol": "GOLD" })),
        (NodeType::Erc1155Token, json!({ "name": "1st Edition" })),
    ] {
        let bp = single(kind, config.clone());
        let ctx = ExecutionContext::detached(&bp);
        let err = run_plugin(&bp, "n", &ctx).await.expect_err("name rejected");
        match err {
            PluginError::InvalidConfig { issues, .. } => {
                assert!(issues.iter().any(|i| i.path == "config.name"), "{}: {:?}", config, issues);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_erc1155_without_constructor_args() {
    let bp = single(NodeType::Erc1155Token, json!({ "name": "Items", "baseUri": "ipfs://bafy/" }));
    let ctx = ExecutionContext::detached(&bp);
    let output = run_plugin(&bp, "n", &ctx).await.expect("generate");

    let lib = &output.files.iter().find(|f| f.path == "lib.rs").expect("lib").content;
    assert!(lib.starts_with("// SPDX-License-Identifier: MIT\n"));
    assert!(lib.contains("ipfs://bafy/"));
    assert!(!output.env_vars.iter().any(|v| v.name == "DEPLOYER_ADDRESS"));
}

#[tokio::test]
async fn test_frontend_nextjs_and_vite() {
    let bp = single(NodeType::FrontendScaffold, Value::Null);
    let output = run_plugin(&bp, "n", &ExecutionContext::detached(&bp)).await.expect("nextjs");
    let files = paths(&output);
    assert!(files.contains(&"layout.tsx"));
    assert!(files.contains(&"apps/web/next.config.mjs"));
    let layout = &output.files.iter().find(|f| f.path == "layout.tsx").expect("layout").content;
    assert!(layout.contains("{/* providers */}"));
    assert!(layout.contains("Plugin Lab"));

    let bp = single(NodeType::FrontendScaffold, json!({ "framework": "vite", "styling": "css" }));
    let output = run_plugin(&bp, "n", &ExecutionContext::detached(&bp)).await.expect("vite");
    let files = paths(&output);
    assert!(files.contains(&"App.tsx"));
    assert!(files.contains(&"apps/web/vite.config.ts"));
    assert!(!files.contains(&"globals.css"));
}

#[tokio::test]
async fn test_wallet_auth_patches_existing_entry() {
    let bp = single(NodeType::WalletAuth, json!({ "connector": "wagmi", "chains": ["arbitrum", "base"] }));

    let detached = ExecutionContext::detached(&bp);
    let output = run_plugin(&bp, "n", &detached).await.expect("generate");
    assert!(output.patches.is_empty());
    assert!(output.env_vars.iter().any(|v| v.name == "NEXT_PUBLIC_WALLETCONNECT_PROJECT_ID"));

    let with_layout = ExecutionContext::detached(&bp).with_existing_file("apps/web/src/app/layout.tsx");
    let output = run_plugin(&bp, "n", &with_layout).await.expect("generate");
    assert_eq!(output.patches.len(), 1);
    assert_eq!(output.patches[0].path, "apps/web/src/app/layout.tsx");
    assert!(output.patches[0].operations.contains(&PatchOperation::replace(
        "{children}",
        "<WalletProvider>{children}</WalletProvider>",
        false
    )));

    let wagmi = &output.files.iter().find(|f| f.path == "wagmi.ts").expect("wagmi config").content;
    assert!(wagmi.contains("arbitrum"));
    assert!(wagmi.contains("base"));
}

#[tokio::test]
async fn test_wallet_auth_uses_vite_prefix_after_vite_frontend() {
    let bp = BlueprintBuilder::new("vite")
        .node("web", NodeType::FrontendScaffold)
        .param("framework", "vite")
        .build()
        .node("wallet", NodeType::WalletAuth)
        .build()
        .connect("web", "wallet")
        .build();
    let web = bp.node("web").expect("web").clone();
    let ctx = ExecutionContext::detached(&bp).with_upstream(&web);

    let output = run_plugin(&bp, "wallet", &ctx).await.expect("generate");
    assert!(output.env_vars.iter().any(|v| v.name == "VITE_WALLETCONNECT_PROJECT_ID"));
}

#[tokio::test]
async fn test_ipfs_provider_selects_token_variable() {
    let bp = single(NodeType::IpfsStorage, json!({ "provider": "web3storage" }));
    let output = run_plugin(&bp, "n", &ExecutionContext::detached(&bp)).await.expect("generate");
    assert!(output.env_vars.iter().any(|v| v.name == "WEB3_STORAGE_TOKEN" && v.secret));

    let bp = single(NodeType::IpfsStorage, Value::Null);
    let output = run_plugin(&bp, "n", &ExecutionContext::detached(&bp)).await.expect("generate");
    assert!(output.env_vars.iter().any(|v| v.name == "PINATA_JWT"));
}

#[tokio::test]
async fn test_analytics_inserts_after_providers_anchor() {
    let bp = single(NodeType::Analytics, json!({ "provider": "plausible" }));
    let ctx = ExecutionContext::detached(&bp).with_existing_file("apps/web/src/app/App.tsx");
    let output = run_plugin(&bp, "n", &ctx).await.expect("generate");

    assert!(output.env_vars.iter().any(|v| v.name == "NEXT_PUBLIC_PLAUSIBLE_DOMAIN"));
    assert_eq!(output.patches.len(), 1);
    assert_eq!(output.patches[0].path, "apps/web/src/app/App.tsx");
    assert!(output.patches[0]
        .operations
        .contains(&PatchOperation::insert_after("{/* providers */}", "\n        <Analytics />")));
}

#[tokio::test]
async fn test_backend_routes_follow_upstream() {
    let bp = single(NodeType::BackendApi, json!({ "port": 5000 }));
    let output = run_plugin(&bp, "n", &ExecutionContext::detached(&bp)).await.expect("generate");
    let files = paths(&output);
    assert!(files.contains(&"health.ts"));
    assert!(!files.contains(&"contracts.ts"));
    assert!(!files.contains(&"ipfs.ts"));
    assert!(output.env_vars.iter().any(|v| v.name == "API_PORT" && v.default.as_deref() == Some("5000")));

    let bp = BlueprintBuilder::new("api")
        .node("token", NodeType::Erc20Token)
        .param("name", "Gold")
        .param("symbol", "GLD")
        .build()
        .node("api", NodeType::BackendApi)
        .param("basePath", "/v1/")
        .build()
        .connect("token", "api")
        .build();
    let token = bp.node("token").expect("token").clone();
    let ctx = ExecutionContext::detached(&bp).with_upstream(&token);
    let output = run_plugin(&bp, "api", &ctx).await.expect("generate");

    assert!(paths(&output).contains(&"contracts.ts"));
    let index = &output.files.iter().find(|f| f.path == "index.ts").expect("index").content;
    assert!(index.contains("app.use(\"/v1/contracts\", contractsRouter);"), "{}", index);
}
