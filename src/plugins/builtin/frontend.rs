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
struct FrontendConfig {
    framework: String,
    #[serde(default)]
    app_name: Option<String>,
    styling: String,
    dark_mode: bool,
}

const PACKAGE_JSON: &str = r#"{
  "name": "{{projectSlug}}-web",
  "private": true,
  "version": "0.1.0",
  "type": "module",
  "scripts": {
{{#if nextjs}}
    "dev": "next dev",
    "build": "next build",
    "start": "next start"
{{else}}
    "dev": "vite",
    "build": "tsc && vite build",
    "preview": "vite preview"
{{/if}}
  },
  "dependencies": {
{{#each dependencies}}
    "{{name}}": "{{version}}"{{#unless @last}},{{/unless}}
{{/each}}
  },
  "devDependencies": {
{{#each devDependencies}}
    "{{name}}": "{{version}}"{{#unless @last}},{{/unless}}
{{/each}}
  }
}
"#;

const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "target": "ES2022",
    "lib": ["dom", "dom.iterable", "esnext"],
    "module": "esnext",
    "moduleResolution": "bundler",
    "jsx": "{{#if nextjs}}preserve{{else}}react-jsx{{/if}}",
    "strict": true,
    "noEmit": true,
    "skipLibCheck": true,
    "baseUrl": ".",
    "paths": { "@/*": ["./src/*"] }
  },
  "include": ["src"]
}
"#;

const NEXT_CONFIG: &str = r#"/** @type {import('next').NextConfig} */
const nextConfig = {
  reactStrictMode: true,
};

export default nextConfig;
"#;

const NEXT_LAYOUT: &str = r#"import type { ReactNode } from "react";
{{#if tailwind}}
import "./globals.css";
{{/if}}

export const metadata = {
  title: "{{appName}}",
  description: "{{appName}} dApp",
};

export default function RootLayout({ children }: { children: ReactNode }) {
  return (
    <html lang="en"{{#if darkMode}} className="dark"{{/if}}>
      <body>
        {/* providers */}
        {children}
      </body>
    </html>
  );
}
"#;

const HOME: &str = r#"export default function Home() {
  return (
    <main>
      <h1>{{appName}}</h1>
{{#if contracts}}
      <ul>
{{#each contracts}}
        <li>
          {{name}} ({{standard}}): { {{../envAccess}}{{addressVar}} }
        </li>
{{/each}}
      </ul>
{{/if}}
{{#if hasApi}}
      <p>API: { {{envAccess}}API_URL }</p>
{{/if}}
    </main>
  );
}
"#;

const VITE_INDEX: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{{appName}}</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/app/main.tsx"></script>
  </body>
</html>
"#;

const VITE_CONFIG: &str = r#"import { defineConfig } from "vite";
import react from "@vitejs/plugin-react";

export default defineConfig({
  plugins: [react()],
});
"#;

const VITE_MAIN: &str = r#"import { StrictMode } from "react";
import { createRoot } from "react-dom/client";
import App from "./App";

const root = document.getElementById("root");
if (root) {
  createRoot(root).render(
    <StrictMode>
      <App />
    </StrictMode>,
  );
}
"#;

const VITE_APP: &str = r#"import type { ReactNode } from "react";
import Home from "./Home";
{{#if tailwind}}
import "./globals.css";
{{/if}}

export default function App({ children }: { children?: ReactNode }) {
  return (
    <div{{#if darkMode}} className="dark"{{/if}}>
      {/* providers */}
      {children}
      <Home />
    </div>
  );
}
"#;

const GLOBALS_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

const DOC: &str = r#"`apps/web` is a {{#if nextjs}}Next.js{{else}}Vite + React{{/if}} application.
Run `pnpm install` then `pnpm --filter {{projectSlug}}-web dev`.
{{#if contracts}}

Contract addresses are read from:
{{#each contracts}}
- `{{../envPrefix}}{{addressVar}}` ({{name}})
{{/each}}
{{/if}}
"#;

/// Next.js or Vite application skeleton other UI plugins patch into.
#[derive(Debug)]
pub struct FrontendScaffoldPlugin {
    metadata: PluginMetadata,
    schema: ConfigSchema,
    ports: Vec<Port>,
}

impl FrontendScaffoldPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("frontend-scaffold", "Frontend Scaffold", "frontend")
                .description("React application skeleton with a providers slot")
                .tags(&["nextjs", "vite", "react"]),
            schema: ConfigSchema::new()
                .field(FieldSpec::optional("framework", FieldKind::one_of(&["nextjs", "vite"])).with_default("nextjs"))
                .field(FieldSpec::optional("appName", FieldKind::string()).describe("Display name, defaults to the project name"))
                .field(FieldSpec::optional("styling", FieldKind::one_of(&["tailwind", "css"])).with_default("tailwind"))
                .field(FieldSpec::optional("darkMode", FieldKind::Boolean).with_default(false)),
            ports: vec![
                Port::input("contracts", "contract-abi", false),
                Port::input("api", "http-api", false),
                Port::output("web-app", "web-app"),
            ],
        }
    }
}

impl Default for FrontendScaffoldPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn package(name: &str, version: &str) -> Value {
    json!({ "name": name, "version": version })
}

#[async_trait]
impl Plugin for FrontendScaffoldPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn node_type(&self) -> NodeType {
        NodeType::FrontendScaffold
    }

    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
        let config: FrontendConfig = typed_config(self, node)?;
        let nextjs = config.framework == "nextjs";
        let tailwind = config.styling == "tailwind";
        let app_name = config.app_name.clone().unwrap_or_else(|| ctx.project_name.clone());
        let env_prefix = if nextjs { "NEXT_PUBLIC_" } else { "VITE_" };
        let env_access = if nextjs { "process.env.NEXT_PUBLIC_" } else { "import.meta.env.VITE_" };
        let contracts = upstream_contracts(ctx);
        let has_api = ctx.upstream_of(NodeType::BackendApi).next().is_some();

        let mut dependencies = vec![package("react", "^18.3.1"), package("react-dom", "^18.3.1")];
        let mut dev_dependencies = vec![package("typescript", "^5.5.4"), package("@types/react", "^18.3.3")];
        if nextjs {
            dependencies.insert(0, package("next", "^14.2.5"));
        } else {
            dev_dependencies.push(package("vite", "^5.4.0"));
            dev_dependencies.push(package("@vitejs/plugin-react", "^4.3.1"));
        }
        if tailwind {
            dev_dependencies.push(package("tailwindcss", "^3.4.7"));
            dev_dependencies.push(package("postcss", "^8.4.40"));
            dev_dependencies.push(package("autoprefixer", "^10.4.19"));
        }

        let mut vars = template_vars(ctx, &config)?;
        insert(&mut vars, "appName", app_name.clone());
        insert(&mut vars, "nextjs", nextjs);
        insert(&mut vars, "tailwind", tailwind);
        insert(&mut vars, "envPrefix", env_prefix);
        insert(&mut vars, "envAccess", env_access);
        insert(&mut vars, "contracts", contracts.clone());
        insert(&mut vars, "hasApi", has_api);
        insert(&mut vars, "dependencies", dependencies);
        insert(&mut vars, "devDependencies", dev_dependencies);

        let mut output = CodegenOutput::new()
            .file(CodegenFile::new("apps/web/package.json", ctx.render(PACKAGE_JSON, &vars)?).category(FileCategory::Root))
            .file(CodegenFile::new("apps/web/tsconfig.json", ctx.render(TSCONFIG, &vars)?).category(FileCategory::Root));

        if nextjs {
            output = output
                .file(CodegenFile::new("apps/web/next.config.mjs", ctx.render(NEXT_CONFIG, &vars)?).category(FileCategory::Root))
                .file(CodegenFile::new("layout.tsx", ctx.render(NEXT_LAYOUT, &vars)?).category(FileCategory::FrontendApp))
                .file(CodegenFile::new("page.tsx", ctx.render(HOME, &vars)?).category(FileCategory::FrontendApp));
        } else {
            output = output
                .file(CodegenFile::new("apps/web/index.html", ctx.render(VITE_INDEX, &vars)?).category(FileCategory::Root))
                .file(CodegenFile::new("apps/web/vite.config.ts", ctx.render(VITE_CONFIG, &vars)?).category(FileCategory::Root))
                .file(CodegenFile::new("main.tsx", ctx.render(VITE_MAIN, &vars)?).category(FileCategory::FrontendApp))
                .file(CodegenFile::new("App.tsx", ctx.render(VITE_APP, &vars)?).category(FileCategory::FrontendApp))
                .file(CodegenFile::new("Home.tsx", ctx.render(HOME, &vars)?).category(FileCategory::FrontendApp));
        }
        if tailwind {
            output = output.file(CodegenFile::new("globals.css", GLOBALS_CSS).category(FileCategory::FrontendApp));
        }

        for contract in &contracts {
            let var = contract.get("addressVar").and_then(Value::as_str).unwrap_or_default();
            let name = contract.get("name").and_then(Value::as_str).unwrap_or_default();
            output = output.env(EnvVar::optional(
                &format!("{}{}", env_prefix, var),
                &format!("Deployed address of {}", name),
                "",
            ));
        }
        if has_api {
            output = output.env(EnvVar::optional(
                &format!("{}API_URL", env_prefix),
                "Base URL of the backend API",
                "http://localhost:4000",
            ));
        }

        Ok(output
            .script("dev:web", &format!("pnpm --filter {}-web dev", ctx.project_slug))
            .script("build:web", &format!("pnpm --filter {}-web build", ctx.project_slug))
            .doc("Frontend", ctx.render(DOC, &vars)?))
    }
}
