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
struct Erc20Config {
    name: String,
    symbol: String,
    decimals: u32,
    initial_supply: String,
    burnable: bool,
    mintable: bool,
}

const LIB_RS: &str = r#"// SPDX-License-Identifier: MIT
// Compatible with OpenZeppelin Contracts for Stylus ^0.3.0

#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
{{#if burnable}}
use openzeppelin_stylus::token::erc20::extensions::burnable::IErc20Burnable;
{{/if}}
use openzeppelin_stylus::token::erc20::{self, Erc20, IErc20};
use stylus_sdk::alloy_primitives::{uint, Address, U256};
use stylus_sdk::prelude::*;
{{#if mintable}}
use stylus_sdk::storage::StorageAddress;
{{/if}}

#[entrypoint]
#[storage]
struct {{contractName}} {
    erc20: Erc20,
{{#if mintable}}
    owner: StorageAddress,
{{/if}}
}

#[public]
#[implements(IErc20<Error = erc20::Error>{{#if burnable}}, IErc20Burnable<Error = erc20::Error>{{/if}})]
impl {{contractName}} {
    #[constructor]
    pub fn constructor(&mut self, initial_owner: Address) -> Result<(), erc20::Error> {
{{#if mintable}}
        self.owner.set(initial_owner);
{{/if}}
{{#if hasInitialSupply}}
        self.erc20._mint(initial_owner, uint!({{initialSupply}}_U256))?;
{{/if}}
        Ok(())
    }

    pub fn name(&self) -> String {
        String::from("{{name}}")
    }

    pub fn symbol(&self) -> String {
        String::from("{{symbol}}")
    }

    pub fn decimals(&self) -> u8 {
        {{decimals}}
    }
{{#if mintable}}

    pub fn mint(&mut self, account: Address, value: U256) -> Result<(), Vec<u8>> {
        if self.vm().msg_sender() != self.owner.get() {
            return Err(b"caller is not the owner".to_vec());
        }
        self.erc20._mint(account, value).map_err(Into::into)
    }
{{/if}}
}

#[public]
impl IErc20 for {{contractName}} {
    type Error = erc20::Error;

    fn total_supply(&self) -> U256 {
        self.erc20.total_supply()
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.erc20.balance_of(account)
    }

    fn transfer(&mut self, to: Address, value: U256) -> Result<bool, Self::Error> {
        Ok(self.erc20.transfer(to, value)?)
    }

    fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.erc20.allowance(owner, spender)
    }

    fn approve(&mut self, spender: Address, value: U256) -> Result<bool, Self::Error> {
        Ok(self.erc20.approve(spender, value)?)
    }

    fn transfer_from(&mut self, from: Address, to: Address, value: U256) -> Result<bool, Self::Error> {
        Ok(self.erc20.transfer_from(from, to, value)?)
    }
}
{{#if burnable}}

#[public]
impl IErc20Burnable for {{contractName}} {
    type Error = erc20::Error;

    fn burn(&mut self, value: U256) -> Result<(), Self::Error> {
        Ok(self.erc20.burn(value)?)
    }

    fn burn_from(&mut self, account: Address, value: U256) -> Result<(), Self::Error> {
        Ok(self.erc20.burn_from(account, value)?)
    }
}
{{/if}}
"#;

pub(crate) const CONTRACT_MANIFEST: &str = r#"[package]
name = "{{slug}}"
version = "0.1.0"
edition = "2021"

[dependencies]
openzeppelin-stylus = "0.3.0"
stylus-sdk = "0.9.0"
alloy-primitives = "0.8"

[features]
export-abi = ["stylus-sdk/export-abi"]

[lib]
crate-type = ["lib", "cdylib"]
"#;

pub(crate) const DEPLOY_SCRIPT: &str = r#"#!/usr/bin/env bash
set -euo pipefail

cd "$(dirname "$0")/../contracts/{{slug}}"
cargo stylus deploy \
  --endpoint "$STYLUS_RPC_URL" \
{{#if constructorArgs}}
  --constructor-args "$DEPLOYER_ADDRESS" \
{{/if}}
  --private-key "$DEPLOYER_PRIVATE_KEY"
"#;

const ABI: &str = r#"export const {{abiName}} = [
  "function name() view returns (string)",
  "function symbol() view returns (string)",
  "function decimals() view returns (uint8)",
  "function totalSupply() view returns (uint256)",
  "function balanceOf(address account) view returns (uint256)",
  "function transfer(address to, uint256 value) returns (bool)",
  "function allowance(address owner, address spender) view returns (uint256)",
  "function approve(address spender, uint256 value) returns (bool)",
  "function transferFrom(address from, address to, uint256 value) returns (bool)",
{{#if burnable}}
  "function burn(uint256 value)",
  "function burnFrom(address account, uint256 value)",
{{/if}}
{{#if mintable}}
  "function mint(address account, uint256 value)",
{{/if}}
] as const;
"#;

const DOC: &str = r#"Stylus ERC-20 token `{{name}}` ({{symbol}}) in `contracts/{{slug}}`.
{{#if decimals != 18}}
Note: the token uses {{decimals}} decimals instead of the usual 18.
{{/if}}
{{#if hasInitialSupply}}
The constructor mints {{initialSupply}} base units to the deployer.
{{/if}}
Deploy with `bash scripts/deploy-{{slug}}.sh` and store the address in `{{addressVar}}`.
"#;

pub(crate) const RPC_URL_VAR: &str = "STYLUS_RPC_URL";
pub(crate) const DEFAULT_RPC_URL: &str = "https://sepolia-rollup.arbitrum.io/rpc";

/// Common deployment env vars shared by every contract plugin.
pub(crate) fn deployment_env() -> Vec<EnvVar> {
    vec![
        EnvVar::optional(RPC_URL_VAR, "Arbitrum RPC endpoint used for deployment", DEFAULT_RPC_URL),
        EnvVar::required("DEPLOYER_PRIVATE_KEY", "Private key of the deploying account").secret(),
    ]
}

/// Stylus ERC-20 token built on OpenZeppelin's Rust contracts.
#[derive(Debug)]
pub struct Erc20Plugin {
    metadata: PluginMetadata,
    schema: ConfigSchema,
    ports: Vec<Port>,
}

impl Erc20Plugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("erc20-token", "ERC-20 Token", "contracts")
                .description("Fungible token contract for Arbitrum Stylus")
                .tags(&["stylus", "erc20", "token"]),
            schema: ConfigSchema::new()
                .field(contract_name_field("Token name"))
                .field(FieldSpec::required("symbol", FieldKind::pattern("^[A-Z][A-Z0-9]{1,10}$")).describe("Ticker symbol"))
                .field(FieldSpec::optional("decimals", FieldKind::integer(0, 36)).with_default(18))
                .field(
                    FieldSpec::optional("initialSupply", FieldKind::pattern("^[0-9]+$"))
                        .with_default("0")
                        .describe("Base units minted to the deployer"),
                )
                .field(FieldSpec::optional("burnable", FieldKind::Boolean).with_default(true))
                .field(FieldSpec::optional("mintable", FieldKind::Boolean).with_default(false)),
            ports: vec![Port::output("abi", "contract-abi")],
        }
    }
}

impl Default for Erc20Plugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for Erc20Plugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn node_type(&self) -> NodeType {
        NodeType::Erc20Token
    }

    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
        let config: Erc20Config = typed_config(self, node)?;
        let slug = slugify(&config.name);
        let contract_name = pascal_case(&config.name);
        let address_var = contract_address_var(&config.name);

        let mut vars = template_vars(ctx, &config)?;
        insert(&mut vars, "slug", slug.clone());
        insert(&mut vars, "contractName", contract_name.clone());
        insert(&mut vars, "abiName", format!("{}Abi", contract_name));
        insert(&mut vars, "addressVar", address_var.clone());
        insert(&mut vars, "hasInitialSupply", config.initial_supply.trim_start_matches('0') != "");
        insert(&mut vars, "constructorArgs", true);

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
            .env(EnvVar::required("DEPLOYER_ADDRESS", "Address receiving ownership and initial supply"))
            .env(EnvVar::optional(&address_var, &format!("Deployed address of {}", config.name), ""))
            .script(&format!("deploy:{}", slug), &format!("bash scripts/deploy-{}.sh", slug))
            .interface(&format!("{}Abi", contract_name), "typescript", ctx.render(ABI, &vars)?)
            .doc(&format!("ERC-20: {}", config.name), ctx.render(DOC, &vars)?))
    }
}
