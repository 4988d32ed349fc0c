use super::erc20::{CONTRACT_MANIFEST, DEPLOY_SCRIPT, deployment_env};
use super::{contract_address_var, contract_name_field, insert, pascal_case, template_vars};
use crate::dsl::{Node, NodeType};
use crate::merge::router::slugify;
use crate::plugins::output::{CodegenFile, EnvVar, FileCategory};
use crate::plugins::{CodegenOutput, Plugin, PluginError, PluginMetadata, Port, typed_config};
use crate::runtime::context::ExecutionContext;
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Erc1155Config {
    name: String,
    #[serde(default)]
    base_uri: Option<String>,
    burnable: bool,
    supply: bool,
}

const LIB_RS: &str = r#"// SPDX-License-Identifier: MIT
// Compatible with OpenZeppelin Contracts for Stylus ^0.3.0

#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
{{#if supply}}
use openzeppelin_stylus::token::erc1155::extensions::{Erc1155Supply, IErc1155Supply};
{{else}}
use openzeppelin_stylus::token::erc1155::Erc1155;
{{/if}}
{{#if burnable}}
use openzeppelin_stylus::token::erc1155::extensions::IErc1155Burnable;
{{/if}}
use openzeppelin_stylus::token::erc1155::{self, IErc1155};
use openzeppelin_stylus::utils::introspection::erc165::IErc165;
use stylus_sdk::abi::Bytes;
use stylus_sdk::alloy_primitives::{Address, FixedBytes, U256};
use stylus_sdk::prelude::*;
use stylus_sdk::storage::StorageString;

#[entrypoint]
#[storage]
struct {{contractName}} {
{{#if supply}}
    erc1155: Erc1155Supply,
{{else}}
    erc1155: Erc1155,
{{/if}}
    base_uri: StorageString,
}

#[public]
#[implements(IErc1155<Error = erc1155::Error>{{#if burnable}}, IErc1155Burnable<Error = erc1155::Error>{{/if}}{{#if supply}}, IErc1155Supply{{/if}}, IErc165)]
impl {{contractName}} {
    #[constructor]
    pub fn constructor(&mut self) {
        self.base_uri.set_str("{{baseUri}}");
    }

    pub fn name(&self) -> String {
        String::from("{{name}}")
    }

    pub fn uri(&self, id: U256) -> String {
        let mut uri = self.base_uri.get_string();
        uri.push_str(&id.to_string());
        uri.push_str(".json");
        uri
    }
}

#[public]
impl IErc1155 for {{contractName}} {
    type Error = erc1155::Error;

    fn balance_of(&self, account: Address, id: U256) -> U256 {
        self.erc1155.balance_of(account, id)
    }

    fn balance_of_batch(&self, accounts: Vec<Address>, ids: Vec<U256>) -> Result<Vec<U256>, Self::Error> {
        Ok(self.erc1155.balance_of_batch(accounts, ids)?)
    }

    fn set_approval_for_all(&mut self, operator: Address, approved: bool) -> Result<(), Self::Error> {
        Ok(self.erc1155.set_approval_for_all(operator, approved)?)
    }

    fn is_approved_for_all(&self, account: Address, operator: Address) -> bool {
        self.erc1155.is_approved_for_all(account, operator)
    }

    fn safe_transfer_from(&mut self, from: Address, to: Address, id: U256, value: U256, data: Bytes) -> Result<(), Self::Error> {
        Ok(self.erc1155.safe_transfer_from(from, to, id, value, data)?)
    }

    fn safe_batch_transfer_from(
        &mut self,
        from: Address,
        to: Address,
        ids: Vec<U256>,
        values: Vec<U256>,
        data: Bytes,
    ) -> Result<(), Self::Error> {
        Ok(self.erc1155.safe_batch_transfer_from(from, to, ids, values, data)?)
    }
}
{{#if burnable}}

#[public]
impl IErc1155Burnable for {{contractName}} {
    type Error = erc1155::Error;

    fn burn(&mut self, account: Address, token_id: U256, value: U256) -> Result<(), Self::Error> {
        Ok(self.erc1155._burn(account, token_id, value)?)
    }

    fn burn_batch(&mut self, account: Address, token_ids: Vec<U256>, values: Vec<U256>) -> Result<(), Self::Error> {
        Ok(self.erc1155._burn_batch(account, token_ids, values)?)
    }
}
{{/if}}
{{#if supply}}

#[public]
impl IErc1155Supply for {{contractName}} {
    fn total_supply(&self, id: U256) -> U256 {
        self.erc1155.total_supply(id)
    }

    #[selector(name = "totalSupply")]
    fn total_supply_all(&self) -> U256 {
        self.erc1155.total_supply_all()
    }

    fn exists(&self, id: U256) -> bool {
        self.erc1155.exists(id)
    }
}
{{/if}}

#[public]
impl IErc165 for {{contractName}} {
    fn supports_interface(&self, interface_id: FixedBytes<4>) -> bool {
        self.erc1155.supports_interface(interface_id)
    }
}
"#;

const ABI: &str = r#"export const {{abiName}} = [
  "function uri(uint256 id) view returns (string)",
  "function balanceOf(address account, uint256 id) view returns (uint256)",
  "function balanceOfBatch(address[] accounts, uint256[] ids) view returns (uint256[])",
  "function setApprovalForAll(address operator, bool approved)",
  "function isApprovedForAll(address account, address operator) view returns (bool)",
  "function safeTransferFrom(address from, address to, uint256 id, uint256 value, bytes data)",
  "function safeBatchTransferFrom(address from, address to, uint256[] ids, uint256[] values, bytes data)",
{{#if burnable}}
  "function burn(address account, uint256 id, uint256 value)",
  "function burnBatch(address account, uint256[] ids, uint256[] values)",
{{/if}}
{{#if supply}}
  "function totalSupply(uint256 id) view returns (uint256)",
  "function totalSupply() view returns (uint256)",
  "function exists(uint256 id) view returns (bool)",
{{/if}}
] as const;
"#;

const DOC: &str = r#"Stylus ERC-1155 collection `{{name}}` in `contracts/{{slug}}`.
{{#if baseUri}}
Token metadata resolves to `{{baseUri}}<id>.json`.
{{else}}
No base URI is set; call the constructor with one before minting.
{{/if}}
{{#if metadataStorage}}
Metadata is expected to be pinned through the `{{metadataStorage}}` storage node.
{{/if}}
Deploy with `bash scripts/deploy-{{slug}}.sh` and store the address in `{{addressVar}}`.
"#;

/// Stylus ERC-1155 multi-token with optional burn and supply tracking.
#[derive(Debug)]
pub struct Erc1155Plugin {
    metadata: PluginMetadata,
    schema: ConfigSchema,
    ports: Vec<Port>,
}

impl Erc1155Plugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("erc1155-token", "ERC-1155 Token", "contracts")
                .description("Multi-token contract for Arbitrum Stylus")
                .tags(&["stylus", "erc1155", "nft"]),
            schema: ConfigSchema::new()
                .field(contract_name_field("Collection name"))
                .field(
                    FieldSpec::optional("baseUri", FieldKind::pattern("^(ipfs|https?)://"))
                        .describe("Prefix for token metadata URIs"),
                )
                .field(FieldSpec::optional("burnable", FieldKind::Boolean).with_default(true))
                .field(FieldSpec::optional("supply", FieldKind::Boolean).with_default(true)),
            ports: vec![
                Port::input("metadata", "storage", false),
                Port::output("abi", "contract-abi"),
            ],
        }
    }
}

impl Default for Erc1155Plugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for Erc1155Plugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn node_type(&self) -> NodeType {
        NodeType::Erc1155Token
    }

    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
        let config: Erc1155Config = typed_config(self, node)?;
        let slug = slugify(&config.name);
        let contract_name = pascal_case(&config.name);
        let address_var = contract_address_var(&config.name);
        let storage = ctx.upstream_of(NodeType::IpfsStorage).next().map(|u| u.id.clone());

        let mut vars = template_vars(ctx, &config)?;
        insert(&mut vars, "baseUri", config.base_uri.clone().unwrap_or_default());
        insert(&mut vars, "slug", slug.clone());
        insert(&mut vars, "contractName", contract_name.clone());
        insert(&mut vars, "abiName", format!("{}Abi", contract_name));
        insert(&mut vars, "addressVar", address_var.clone());
        insert(&mut vars, "metadataStorage", storage.unwrap_or_default());
        insert(&mut vars, "constructorArgs", false);

        let mut output = CodegenOutput::new()
            .file(
                CodegenFile::new("lib.rs", ctx.render(LIB_RS, &vars)?)
                    .category(FileCategory::ContractSource)
                    .group(&slug),
            )
            .file(
                CodegenFile::new("Cargo.toml", ctx.render(CONTRACT_MANIFEST, &vars)?)
                    .category(FileCategory::ContractManifest)
                    .group(&slug),
            )
            .file(
                CodegenFile::new(&format!("deploy-{}.sh", slug), ctx.render(DEPLOY_SCRIPT, &vars)?)
                    .category(FileCategory::Scripts),
            );

        for var in deployment_env() {
            output = output.env(var);
        }

        Ok(output
            .env(EnvVar::optional(&address_var, &format!("Deployed address of {}", config.name), ""))
            .script(&format!("deploy:{}", slug), &format!("bash scripts/deploy-{}.sh", slug))
            .interface(&format!("{}Abi", contract_name), "typescript", ctx.render(ABI, &vars)?)
            .doc(&format!("ERC-1155: {}", config.name), ctx.render(DOC, &vars)?))
    }
}
