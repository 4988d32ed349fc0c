use super::{CHILDREN_SLOT, frontend_entry, insert, public_env_access, public_env_prefix, template_vars};
use crate::dsl::{Node, NodeType};
use crate::plugins::output::{CodegenFile, EnvVar, FileCategory, PatchOperation};
use crate::plugins::{CodegenOutput, Plugin, PluginError, PluginMetadata, Port, typed_config};
use crate::runtime::context::ExecutionContext;
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const CHAINS: [&str; 5] = ["arbitrum", "arbitrum-sepolia", "ethereum", "base", "optimism"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletAuthConfig {
    connector: String,
    chains: Vec<String>,
    ssr: bool,
}

/// wagmi's export name for a chain.
fn chain_import(chain: &str) -> &'static str {
    match chain {
        "arbitrum" => "arbitrum",
        "arbitrum-sepolia" => "arbitrumSepolia",
        "ethereum" => "mainnet",
        "base" => "base",
        "optimism" => "optimism",
        _ => "arbitrumSepolia",
    }
}

const WAGMI_CONFIG: &str = r#"import { http, createConfig } from "wagmi";
import { {{#each chains}}{{import}}{{#unless @last}}, {{/unless}}{{/each}} } from "wagmi/chains";

export const config = createConfig({
  chains: [{{#each chains}}{{import}}{{#unless @last}}, {{/unless}}{{/each}}],
  transports: {
{{#each chains}}
    [{{import}}.id]: http(),
{{/each}}
  },
  ssr: {{ssr}},
});

export const walletConnectProjectId = {{envAccess}}WALLETCONNECT_PROJECT_ID ?? "";
"#;

const PROVIDER: &str = r#""use client";

import type { ReactNode } from "react";
import { QueryClient, QueryClientProvider } from "@tanstack/react-query";
import { WagmiProvider } from "wagmi";
{{#if rainbowkit}}
import { RainbowKitProvider } from "@rainbow-me/rainbowkit";
import "@rainbow-me/rainbowkit/styles.css";
{{/if}}
{{#if connectkit}}
import { ConnectKitProvider } from "connectkit";
{{/if}}
import { config } from "../lib/wagmi";

const queryClient = new QueryClient();

export function WalletProvider({ children }: { children: ReactNode }) {
  return (
    <WagmiProvider config={config}>
      <QueryClientProvider client={queryClient}>
{{#if rainbowkit}}
        <RainbowKitProvider>{children}</RainbowKitProvider>
{{else}}
{{#if connectkit}}
        <ConnectKitProvider>{children}</ConnectKitProvider>
{{else}}
        {children}
{{/if}}
{{/if}}
      </QueryClientProvider>
    </WagmiProvider>
  );
}
"#;

const HOOK: &str = r#"import { useAccount, useConnect, useDisconnect } from "wagmi";

export function useWallet() {
  const { address, isConnected, chain } = useAccount();
  const { connect, connectors } = useConnect();
  const { disconnect } = useDisconnect();

  return { address, isConnected, chain, connect, connectors, disconnect };
}
"#;

const DOC: &str = r#"Wallet connection through wagmi{{#if rainbowkit}} and RainbowKit{{/if}}{{#if connectkit}} and ConnectKit{{/if}}.
Supported chains: {{#each chains}}{{name}}{{#unless @last}}, {{/unless}}{{/each}}.
{{#if patched}}
`WalletProvider` wraps the application in `{{entry}}`.
{{else}}
No frontend scaffold was generated before this node; wrap your root component in `WalletProvider` manually.
{{/if}}
"#;

/// Wallet connection provider and hook for the frontend.
#[derive(Debug)]
pub struct WalletAuthPlugin {
    metadata: PluginMetadata,
    schema: ConfigSchema,
    ports: Vec<Port>,
}

impl WalletAuthPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("wallet-auth", "Wallet Auth", "frontend")
                .description("wagmi-based wallet connection for the web app")
                .tags(&["wallet", "wagmi", "auth"]),
            schema: ConfigSchema::new()
                .field(
                    FieldSpec::optional("connector", FieldKind::one_of(&["rainbowkit", "connectkit", "wagmi"]))
                        .with_default("rainbowkit"),
                )
                .field(FieldSpec::optional("chains", FieldKind::list_of(&CHAINS, 1)).with_default(json!(["arbitrum-sepolia"])))
                .field(FieldSpec::optional("ssr", FieldKind::Boolean).with_default(true)),
            ports: vec![
                Port::input("app", "web-app", true),
                Port::input("contracts", "contract-abi", false),
                Port::output("session", "wallet-session"),
            ],
        }
    }
}

impl Default for WalletAuthPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for WalletAuthPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn node_type(&self) -> NodeType {
        NodeType::WalletAuth
    }

    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
        let config: WalletAuthConfig = typed_config(self, node)?;
        let prefix = public_env_prefix(ctx);
        let entry = frontend_entry(ctx);
        let chains: Vec<_> = config
            .chains
            .iter()
            .map(|c| json!({ "name": c, "import": chain_import(c) }))
            .collect();

        let mut vars = template_vars(ctx, &config)?;
        insert(&mut vars, "chains", chains);
        insert(&mut vars, "rainbowkit", config.connector == "rainbowkit");
        insert(&mut vars, "connectkit", config.connector == "connectkit");
        insert(&mut vars, "envAccess", public_env_access(prefix));
        insert(&mut vars, "patched", entry.is_some());
        insert(&mut vars, "entry", entry.unwrap_or_default());

        let mut output = CodegenOutput::new()
            .file(CodegenFile::new("wagmi.ts", ctx.render(WAGMI_CONFIG, &vars)?).category(FileCategory::FrontendLib))
            .file(
                CodegenFile::new("WalletProvider.tsx", ctx.render(PROVIDER, &vars)?)
                    .category(FileCategory::FrontendComponents),
            )
            .file(CodegenFile::new("useWallet.ts", ctx.render(HOOK, &vars)?).category(FileCategory::FrontendHooks))
            .env(EnvVar::required(
                &format!("{}WALLETCONNECT_PROJECT_ID", prefix),
                "WalletConnect Cloud project id",
            ));

        if let Some(entry) = entry {
            output = output.patch(
                entry,
                vec![
                    PatchOperation::prepend("import { WalletProvider } from \"../components/WalletProvider\";\n"),
                    PatchOperation::replace(CHILDREN_SLOT, "<WalletProvider>{children}</WalletProvider>", false),
                ],
            );
        }

        Ok(output.doc("Wallet Auth", ctx.render(DOC, &vars)?))
    }
}
