use super::{insert, public_env_access, public_env_prefix, template_vars};
use crate::dsl::{Node, NodeType};
use crate::plugins::output::{CodegenFile, EnvVar, FileCategory};
use crate::plugins::{CodegenOutput, Plugin, PluginError, PluginMetadata, Port, typed_config};
use crate::runtime::context::ExecutionContext;
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_PROVIDER: &str = "pinata";
pub(crate) const DEFAULT_MAX_FILE_SIZE_MB: i64 = 10;

/// Where a pinning provider takes uploads and how it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PinningService {
    pub upload_endpoint: &'static str,
    pub token_var: &'static str,
    pub cid_field: &'static str,
    pub gateway: &'static str,
}

pub(crate) fn pinning_service(provider: &str) -> PinningService {
    match provider {
        "web3storage" => PinningService {
            upload_endpoint: "https://api.web3.storage/upload",
            token_var: "WEB3_STORAGE_TOKEN",
            cid_field: "cid",
            gateway: "https://w3s.link/ipfs",
        },
        "filebase" => PinningService {
            upload_endpoint: "https://rpc.filebase.io/api/v0/add",
            token_var: "FILEBASE_TOKEN",
            cid_field: "Hash",
            gateway: "https://ipfs.filebase.io/ipfs",
        },
        _ => PinningService {
            upload_endpoint: "https://api.pinata.cloud/pinning/pinFileToIPFS",
            token_var: "PINATA_JWT",
            cid_field: "IpfsHash",
            gateway: "https://gateway.pinata.cloud/ipfs",
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpfsStorageConfig {
    provider: String,
    #[serde(default)]
    gateway: Option<String>,
    max_file_size_mb: i64,
}

const LIB: &str = r#"export const IPFS_GATEWAY = {{envAccess}}IPFS_GATEWAY ?? "{{gateway}}";
export const MAX_UPLOAD_MB = {{maxFileSizeMb}};

export function gatewayUrl(cid: string): string {
  return `${IPFS_GATEWAY}/${cid}`;
}
"#;

const HOOK: &str = r#"import { useState } from "react";
import { MAX_UPLOAD_MB } from "../lib/ipfs";

const UPLOAD_URL = "/api/ipfs/upload";

export function useIpfsUpload() {
  const [cid, setCid] = useState<string | null>(null);
  const [error, setError] = useState<string | null>(null);
  const [uploading, setUploading] = useState(false);

  async function upload(file: File): Promise<string | null> {
    if (file.size > MAX_UPLOAD_MB * 1024 * 1024) {
      setError(`file exceeds ${MAX_UPLOAD_MB} MB`);
      return null;
    }
    setUploading(true);
    setError(null);
    try {
      const body = new FormData();
      body.append("file", file);
      const response = await fetch(UPLOAD_URL, { method: "POST", body });
      if (!response.ok) {
        throw new Error(`upload failed: ${response.status}`);
      }
      const result = await response.json();
      setCid(result.cid);
      return result.cid as string;
    } catch (e) {
      setError(e instanceof Error ? e.message : String(e));
      return null;
    } finally {
      setUploading(false);
    }
  }

  return { upload, cid, error, uploading };
}
"#;

const NEXT_ROUTE: &str = r#"import { NextResponse } from "next/server";

const MAX_BYTES = {{maxFileSizeMb}} * 1024 * 1024;

export async function POST(request: Request) {
  const form = await request.formData();
  const file = form.get("file");
  if (!(file instanceof Blob)) {
    return NextResponse.json({ error: "missing file" }, { status: 400 });
  }
  if (file.size > MAX_BYTES) {
    return NextResponse.json({ error: "file too large" }, { status: 413 });
  }

  const body = new FormData();
  body.append("file", file);
  const response = await fetch("{{uploadEndpoint}}", {
    method: "POST",
    headers: { Authorization: `Bearer ${process.env.{{tokenVar}}}` },
    body,
  });
  if (!response.ok) {
    return NextResponse.json({ error: "upload failed" }, { status: 502 });
  }
  const result = await response.json();
  return NextResponse.json({ cid: result.{{cidField}} });
}
"#;

const DOC: &str = r#"Files are pinned through {{provider}} and served from `{{gateway}}`.
Uploads are limited to {{maxFileSizeMb}} MB and go to `/api/ipfs/upload`.
{{#if nextRoute}}
The upload endpoint is a Next.js route handler in `apps/web/src/app/api/ipfs/upload/route.ts`.
{{else}}
Serve `/api/ipfs/upload` from the backend API, or add a route handler to your frontend.
{{/if}}
Set `{{tokenVar}}` before uploading.
"#;

/// IPFS pinning helpers, upload hook and (with Next.js) an upload route.
#[derive(Debug)]
pub struct IpfsStoragePlugin {
    metadata: PluginMetadata,
    schema: ConfigSchema,
    ports: Vec<Port>,
}

impl IpfsStoragePlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("ipfs-storage", "IPFS Storage", "storage")
                .description("Pin files to IPFS through a pinning service")
                .tags(&["ipfs", "storage", "upload"]),
            schema: ConfigSchema::new()
                .field(
                    FieldSpec::optional("provider", FieldKind::one_of(&["pinata", "web3storage", "filebase"]))
                        .with_default(DEFAULT_PROVIDER),
                )
                .field(FieldSpec::optional("gateway", FieldKind::pattern("^https?://")).describe("Public gateway base URL"))
                .field(FieldSpec::optional("maxFileSizeMb", FieldKind::integer(1, 1024)).with_default(DEFAULT_MAX_FILE_SIZE_MB)),
            ports: vec![Port::input("api", "http-api", false), Port::output("storage", "storage")],
        }
    }
}

impl Default for IpfsStoragePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for IpfsStoragePlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn node_type(&self) -> NodeType {
        NodeType::IpfsStorage
    }

    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
        let config: IpfsStorageConfig = typed_config(self, node)?;
        let service = pinning_service(&config.provider);
        let gateway = config.gateway.clone().unwrap_or_else(|| service.gateway.to_string());
        let prefix = public_env_prefix(ctx);
        let next_route = ctx.has_file("apps/web/src/app/layout.tsx");

        let mut vars = template_vars(ctx, &config)?;
        insert(&mut vars, "gateway", gateway.clone());
        insert(&mut vars, "envAccess", public_env_access(prefix));
        insert(&mut vars, "uploadEndpoint", service.upload_endpoint);
        insert(&mut vars, "tokenVar", service.token_var);
        insert(&mut vars, "cidField", service.cid_field);
        insert(&mut vars, "nextRoute", next_route);

        let mut output = CodegenOutput::new()
            .file(CodegenFile::new("ipfs.ts", ctx.render(LIB, &vars)?).category(FileCategory::FrontendLib))
            .file(CodegenFile::new("useIpfsUpload.ts", ctx.render(HOOK, &vars)?).category(FileCategory::FrontendHooks));
        if next_route {
            output = output.file(
                CodegenFile::new("api/ipfs/upload/route.ts", ctx.render(NEXT_ROUTE, &vars)?)
                    .category(FileCategory::FrontendApp),
            );
        }

        Ok(output
            .env(EnvVar::required(service.token_var, &format!("API token for {}", config.provider)).secret())
            .env(EnvVar::optional(&format!("{}IPFS_GATEWAY", prefix), "Public IPFS gateway", &gateway))
            .doc("IPFS Storage", ctx.render(DOC, &vars)?))
    }
}
