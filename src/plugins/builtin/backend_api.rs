use super::ipfs_storage::{DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_PROVIDER, pinning_service};
use super::{insert, template_vars, upstream_contracts};
use crate::dsl::{Node, NodeType};
use crate::plugins::output::{CodegenFile, EnvVar, FileCategory};
use crate::plugins::{CodegenOutput, Plugin, PluginError, PluginMetadata, Port, typed_config};
use crate::runtime::context::ExecutionContext;
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendApiConfig {
    port: u16,
    cors: bool,
    base_path: String,
}

const PACKAGE_JSON: &str = r#"{
  "name": "{{projectSlug}}-api",
  "private": true,
  "version": "0.1.0",
  "type": "module",
  "scripts": {
    "dev": "tsx watch src/index.ts",
    "build": "tsc",
    "start": "node dist/index.js"
  },
  "dependencies": {
    "express": "^4.19.2"{{#if cors}},
    "cors": "^2.8.5"{{/if}}{{#if storage}},
    "multer": "^1.4.5-lts.1"{{/if}}
  },
  "devDependencies": {
    "@types/express": "^4.17.21",
{{#if cors}}
    "@types/cors": "^2.8.17",
{{/if}}
{{#if storage}}
    "@types/multer": "^1.4.11",
{{/if}}
    "tsx": "^4.16.5",
    "typescript": "^5.5.4"
  }
}
"#;

const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "target": "ES2022",
    "module": "NodeNext",
    "moduleResolution": "NodeNext",
    "outDir": "dist",
    "rootDir": "src",
    "strict": true,
    "esModuleInterop": true,
    "skipLibCheck": true
  },
  "include": ["src"]
}
"#;

const INDEX: &str = r#"import express from "express";
{{#if cors}}
import cors from "cors";
{{/if}}
import { healthRouter } from "./routes/health";
{{#if contracts}}
import { contractsRouter } from "./routes/contracts";
{{/if}}
{{#if storage}}
import { ipfsRouter } from "./routes/ipfs";
{{/if}}

const app = express();
app.use(express.json());
{{#if cors}}
app.use(cors({ origin: process.env.CORS_ORIGIN ?? "http://localhost:3000" }));
{{/if}}

app.use("/health", healthRouter);
{{#if contracts}}
app.use("{{basePath}}/contracts", contractsRouter);
{{/if}}
{{#if storage}}
app.use("{{basePath}}/ipfs", ipfsRouter);
{{/if}}

const port = Number(process.env.API_PORT ?? {{port}});
app.listen(port, () => {
  console.log(`{{projectName}} API listening on :${port}`);
});
"#;

const HEALTH_ROUTE: &str = r#"import { Router } from "express";

export const healthRouter = Router();

healthRouter.get("/", (_req, res) => {
  res.json({ status: "ok", service: "{{projectSlug}}-api" });
});
"#;

const CONTRACTS_ROUTE: &str = r#"import { Router } from "express";

export const contractsRouter = Router();

const contracts = [
{{#each contracts}}
  { name: "{{name}}", standard: "{{standard}}", address: process.env.{{addressVar}} ?? null },
{{/each}}
];

contractsRouter.get("/", (_req, res) => {
  res.json(contracts);
});
"#;

const IPFS_ROUTE: &str = r#"import { Router } from "express";
import multer from "multer";

const upload = multer({ limits: { fileSize: {{maxFileSizeMb}} * 1024 * 1024 } });

export const ipfsRouter = Router();

ipfsRouter.post("/upload", upload.single("file"), async (req, res) => {
  if (!req.file) {
    res.status(400).json({ error: "missing file" });
    return;
  }
  const body = new FormData();
  body.append("file", new Blob([req.file.buffer]), req.file.originalname);
  const response = await fetch("{{uploadEndpoint}}", {
    method: "POST",
    headers: { Authorization: `Bearer ${process.env.{{tokenVar}}}` },
    body,
  });
  if (!response.ok) {
    res.status(502).json({ error: "upload failed" });
    return;
  }
  const result = await response.json();
  res.json({ cid: result.{{cidField}} });
});
"#;

const DOC: &str = r#"Express API in `apps/api`, listening on port {{port}} (`API_PORT`).

Routes:
- `GET /health`
{{#if contracts}}
- `GET {{basePath}}/contracts` lists {{#each contracts}}{{name}}{{#unless @last}}, {{/unless}}{{/each}}
{{/if}}
{{#if storage}}
- `POST {{basePath}}/ipfs/upload` pins a multipart `file` field
{{/if}}
"#;

/// Express API server with routes for upstream contracts and storage.
#[derive(Debug)]
pub struct BackendApiPlugin {
    metadata: PluginMetadata,
    schema: ConfigSchema,
    ports: Vec<Port>,
}

impl BackendApiPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("backend-api", "Backend API", "backend")
                .description("Express API server exposing contract and storage routes")
                .tags(&["express", "api", "node"]),
            schema: ConfigSchema::new()
                .field(FieldSpec::optional("port", FieldKind::integer(1, 65535)).with_default(4000))
                .field(FieldSpec::optional("cors", FieldKind::Boolean).with_default(true))
                .field(FieldSpec::optional("basePath", FieldKind::pattern("^/[a-z0-9/-]*$")).with_default("/api")),
            ports: vec![
                Port::input("contracts", "contract-abi", false),
                Port::input("storage", "storage", false),
                Port::output("api", "http-api"),
            ],
        }
    }
}

impl Default for BackendApiPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for BackendApiPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn node_type(&self) -> NodeType {
        NodeType::BackendApi
    }

    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
        let mut config: BackendApiConfig = typed_config(self, node)?;
        config.base_path = config.base_path.trim_end_matches('/').to_string();
        let contracts = upstream_contracts(ctx);
        let storage = ctx.upstream_of(NodeType::IpfsStorage).next();

        let mut vars = template_vars(ctx, &config)?;
        insert(&mut vars, "contracts", contracts.clone());
        insert(&mut vars, "storage", storage.is_some());
        if let Some(storage) = storage {
            let provider = storage.config.get("provider").and_then(Value::as_str).unwrap_or(DEFAULT_PROVIDER);
            let max_mb = storage
                .config
                .get("maxFileSizeMb")
                .and_then(Value::as_i64)
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);
            let service = pinning_service(provider);
            insert(&mut vars, "maxFileSizeMb", max_mb);
            insert(&mut vars, "uploadEndpoint", service.upload_endpoint);
            insert(&mut vars, "tokenVar", service.token_var);
            insert(&mut vars, "cidField", service.cid_field);
        }

        let mut output = CodegenOutput::new()
            .file(CodegenFile::new("apps/api/package.json", ctx.render(PACKAGE_JSON, &vars)?).category(FileCategory::Root))
            .file(CodegenFile::new("apps/api/tsconfig.json", ctx.render(TSCONFIG, &vars)?).category(FileCategory::Root))
            .file(CodegenFile::new("index.ts", ctx.render(INDEX, &vars)?).category(FileCategory::BackendSource))
            .file(CodegenFile::new("health.ts", ctx.render(HEALTH_ROUTE, &vars)?).category(FileCategory::BackendRoutes));
        if !contracts.is_empty() {
            output = output.file(
                CodegenFile::new("contracts.ts", ctx.render(CONTRACTS_ROUTE, &vars)?).category(FileCategory::BackendRoutes),
            );
        }
        if storage.is_some() {
            output = output
                .file(CodegenFile::new("ipfs.ts", ctx.render(IPFS_ROUTE, &vars)?).category(FileCategory::BackendRoutes));
        }

        output = output.env(EnvVar::optional("API_PORT", "Port the API listens on", &config.port.to_string()));
        if config.cors {
            output = output.env(EnvVar::optional(
                "CORS_ORIGIN",
                "Origin allowed to call the API",
                "http://localhost:3000",
            ));
        }

        Ok(output
            .script("dev:api", &format!("pnpm --filter {}-api dev", ctx.project_slug))
            .script("start:api", &format!("pnpm --filter {}-api start", ctx.project_slug))
            .interface(
                "ApiRoutes",
                "json",
                serde_json::to_string_pretty(&json!({
                    "health": "/health",
                    "contracts": (!contracts.is_empty()).then(|| format!("{}/contracts", config.base_path)),
                    "upload": storage.map(|_| format!("{}/ipfs/upload", config.base_path)),
                }))
                .map_err(|e| PluginError::Generation(e.to_string()))?,
            )
            .doc("Backend API", ctx.render(DOC, &vars)?))
    }
}
