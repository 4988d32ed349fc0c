use super::{PROVIDERS_ANCHOR, frontend_entry, insert, public_env_access, public_env_prefix, template_vars};
use crate::dsl::{Node, NodeType};
use crate::plugins::output::{CodegenFile, EnvVar, FileCategory, PatchOperation};
use crate::plugins::{CodegenOutput, Plugin, PluginError, PluginMetadata, Port, typed_config};
use crate::runtime::context::ExecutionContext;
use crate::schema::{ConfigSchema, FieldKind, FieldSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsConfig {
    provider: String,
    #[serde(default)]
    host: Option<String>,
    track_page_views: bool,
}

/// Public env var (without prefix) and default host per provider.
fn provider_settings(provider: &str) -> (&'static str, &'static str) {
    match provider {
        "plausible" => ("PLAUSIBLE_DOMAIN", "https://plausible.io"),
        "umami" => ("UMAMI_WEBSITE_ID", "https://cloud.umami.is"),
        _ => ("POSTHOG_KEY", "https://us.i.posthog.com"),
    }
}

const COMPONENT: &str = r#""use client";

import { useEffect } from "react";
{{#if posthog}}
import posthog from "posthog-js";
{{/if}}

export function Analytics() {
  useEffect(() => {
{{#if posthog}}
    posthog.init({{keyAccess}} ?? "", {
      api_host: "{{host}}",
      capture_pageview: {{trackPageViews}},
    });
{{else}}
    const script = document.createElement("script");
    script.defer = true;
{{#if plausible}}
    script.dataset.domain = {{keyAccess}} ?? "";
    script.src = "{{host}}/js/script.js";
{{else}}
    script.dataset.websiteId = {{keyAccess}} ?? "";
    script.dataset.autoTrack = "{{trackPageViews}}";
    script.src = "{{host}}/script.js";
{{/if}}
    document.head.appendChild(script);
{{/if}}
  }, []);

  return null;
}
"#;

const HOOK: &str = r#"{{#if posthog}}
import posthog from "posthog-js";

{{/if}}
export function useAnalytics() {
  function track(event: string, properties?: Record<string, unknown>) {
{{#if posthog}}
    posthog.capture(event, properties);
{{/if}}
{{#if plausible}}
    (window as any).plausible?.(event, { props: properties });
{{/if}}
{{#if umami}}
    (window as any).umami?.track(event, properties);
{{/if}}
  }

  return { track };
}
"#;

const DOC: &str = r#"Product analytics via {{provider}} (`{{host}}`).
{{#if trackPageViews}}
Page views are tracked automatically.
{{/if}}
Use `useAnalytics().track(name, props)` for custom events.
{{#unless patched}}
Render `<Analytics />` once near the root of your app.
{{/unless}}
"#;

/// Analytics provider component and event hook.
#[derive(Debug)]
pub struct AnalyticsPlugin {
    metadata: PluginMetadata,
    schema: ConfigSchema,
    ports: Vec<Port>,
}

impl AnalyticsPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("analytics", "Analytics", "frontend")
                .description("Page view and event tracking for the web app")
                .tags(&["analytics", "posthog", "plausible", "umami"]),
            schema: ConfigSchema::new()
                .field(
                    FieldSpec::optional("provider", FieldKind::one_of(&["posthog", "plausible", "umami"]))
                        .with_default("posthog"),
                )
                .field(FieldSpec::optional("host", FieldKind::pattern("^https?://")).describe("Self-hosted instance URL"))
                .field(FieldSpec::optional("trackPageViews", FieldKind::Boolean).with_default(true)),
            ports: vec![Port::input("app", "web-app", true)],
        }
    }
}

impl Default for AnalyticsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for AnalyticsPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn node_type(&self) -> NodeType {
        NodeType::Analytics
    }

    fn config_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn generate(&self, node: &Node, ctx: &ExecutionContext) -> Result<CodegenOutput, PluginError> {
        let config: AnalyticsConfig = typed_config(self, node)?;
        let (key_var, default_host) = provider_settings(&config.provider);
        let host = config.host.clone().unwrap_or_else(|| default_host.to_string());
        let prefix = public_env_prefix(ctx);
        let entry = frontend_entry(ctx);

        let mut vars = template_vars(ctx, &config)?;
        insert(&mut vars, "host", host.trim_end_matches('/'));
        insert(&mut vars, "posthog", config.provider == "posthog");
        insert(&mut vars, "plausible", config.provider == "plausible");
        insert(&mut vars, "umami", config.provider == "umami");
        insert(&mut vars, "keyAccess", format!("{}{}", public_env_access(prefix), key_var));
        insert(&mut vars, "patched", entry.is_some());

        let mut output = CodegenOutput::new()
            .file(CodegenFile::new("Analytics.tsx", ctx.render(COMPONENT, &vars)?).category(FileCategory::FrontendComponents))
            .file(CodegenFile::new("useAnalytics.ts", ctx.render(HOOK, &vars)?).category(FileCategory::FrontendHooks))
            .env(EnvVar::required(
                &format!("{}{}", prefix, key_var),
                &format!("{} site or project key", config.provider),
            ));

        if let Some(entry) = entry {
            output = output.patch(
                entry,
                vec![
                    PatchOperation::prepend("import { Analytics } from \"../components/Analytics\";\n"),
                    PatchOperation::insert_after(PROVIDERS_ANCHOR, "\n        <Analytics />"),
                ],
            );
        }

        Ok(output.doc("Analytics", ctx.render(DOC, &vars)?))
    }
}
