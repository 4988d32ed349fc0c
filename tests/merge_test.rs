use blueprint_forge::dsl::builder::BlueprintBuilder;
use blueprint_forge::dsl::{Node, NodeType};
use blueprint_forge::merge::{ENV_EXAMPLE_PATH, GENERATED_DOCS_PATH, MergeEngine, MergeError};
use blueprint_forge::plugins::CodegenOutput;
use blueprint_forge::plugins::output::{CodegenFile, EnvVar, FileCategory, PatchOperation};
use serde_json::Value;

fn nodes(specs: &[(&str, NodeType)]) -> Vec<Node> {
    let mut builder = BlueprintBuilder::new("merge");
    for (id, kind) in specs {
        builder = builder.raw_node(id, *kind, Value::Null);
    }
    builder.build().nodes
}

fn root_file(path: &str, content: &str) -> CodegenFile {
    CodegenFile::new(path, content).category(FileCategory::Root)
}

fn contract_output(content: &str) -> CodegenOutput {
    CodegenOutput::new().file(
        CodegenFile::new("lib.rs", content)
            .category(FileCategory::ContractSource)
            .group("token"),
    )
}

#[test]
fn test_file_collision_names_both_nodes() {
    let n = nodes(&[("token-a", NodeType::Erc20Token), ("token-b", NodeType::Erc20Token)]);
    let mut engine = MergeEngine::new();

    let report = engine.merge(&n[0], &contract_output("// a")).expect("first merge");
    assert_eq!(report.files, vec!["contracts/token/src/lib.rs"]);

    let err = engine.merge(&n[1], &contract_output("// b")).expect_err("collision");
    assert_eq!(
        err,
        MergeError::FileCollision {
            path: "contracts/token/src/lib.rs".to_string(),
            first_node: "token-a".to_string(),
            second_node: "token-b".to_string(),
        }
    );
    assert_eq!(engine.tree().get("contracts/token/src/lib.rs").expect("kept").content, "// a");
}

#[test]
fn test_replace_all_occurrences() {
    let n = nodes(&[("web", NodeType::FrontendScaffold), ("wallet", NodeType::WalletAuth)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(&n[0], &CodegenOutput::new().file(root_file("config.ts", "PLACEHOLDER PLACEHOLDER PLACEHOLDER")))
        .expect("base file");

    let report = engine
        .merge(
            &n[1],
            &CodegenOutput::new().patch("config.ts", vec![PatchOperation::replace("PLACEHOLDER", "X", true)]),
        )
        .expect("patch");

    assert_eq!(report.patched, vec!["config.ts"]);
    let entry = engine.tree().get("config.ts").expect("file");
    assert_eq!(entry.content, "X X X");
    assert_eq!(entry.owner, "web");
    assert_eq!(entry.patched_by, vec!["wallet"]);
}

#[test]
fn test_replace_first_only_and_absent_search_is_noop() {
    let n = nodes(&[("web", NodeType::FrontendScaffold), ("wallet", NodeType::WalletAuth)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(&n[0], &CodegenOutput::new().file(root_file("a.txt", "x x x")))
        .expect("base");

    engine
        .merge(
            &n[1],
            &CodegenOutput::new().patch(
                "a.txt",
                vec![
                    PatchOperation::replace("x", "y", false),
                    PatchOperation::replace("missing", "z", true),
                ],
            ),
        )
        .expect("patch");

    assert_eq!(engine.tree().get("a.txt").expect("file").content, "y x x");
}

#[test]
fn test_insert_operations() {
    let n = nodes(&[("web", NodeType::FrontendScaffold), ("stats", NodeType::Analytics)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(&n[0], &CodegenOutput::new().file(root_file("layout.tsx", "<A>{children}</A>")))
        .expect("base");

    engine
        .merge(
            &n[1],
            &CodegenOutput::new().patch(
                "layout.tsx",
                vec![
                    PatchOperation::prepend("import x;\n"),
                    PatchOperation::insert_before("{children}", "<B/>"),
                    PatchOperation::insert_after("{children}", "<C/>"),
                    PatchOperation::append("\n"),
                ],
            ),
        )
        .expect("patch");

    assert_eq!(
        engine.tree().get("layout.tsx").expect("file").content,
        "import x;\n<A><B/>{children}<C/></A>\n"
    );
}

#[test]
fn test_missing_anchor_fails_and_leaves_tree_unchanged() {
    let n = nodes(&[("web", NodeType::FrontendScaffold), ("stats", NodeType::Analytics)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(&n[0], &CodegenOutput::new().file(root_file("layout.tsx", "original")))
        .expect("base");

    let output = CodegenOutput::new()
        .file(CodegenFile::new("Analytics.tsx", "component").category(FileCategory::FrontendComponents))
        .patch(
            "layout.tsx",
            vec![PatchOperation::prepend("first "), PatchOperation::insert_after("<nowhere/>", "x")],
        );
    let err = engine.merge(&n[1], &output).expect_err("anchor missing");

    assert!(matches!(err, MergeError::PatchAnchorNotFound { ref anchor, ref node_id, .. } if anchor == "<nowhere/>" && node_id == "stats"));
    assert_eq!(engine.tree().get("layout.tsx").expect("file").content, "original");
    assert!(!engine.tree().contains("apps/web/src/components/Analytics.tsx"));
    assert_eq!(engine.tree().len(), 1);
}

#[test]
fn test_patch_on_missing_file_fails() {
    let n = nodes(&[("stats", NodeType::Analytics)]);
    let mut engine = MergeEngine::new();
    let err = engine
        .merge(&n[0], &CodegenOutput::new().patch("nope.ts", vec![PatchOperation::append("x")]))
        .expect_err("missing target");
    assert!(matches!(err, MergeError::PatchTargetMissing { .. }));
}

#[test]
fn test_binary_files_cannot_be_patched() {
    let n = nodes(&[("web", NodeType::FrontendScaffold), ("stats", NodeType::Analytics)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(&n[0], &CodegenOutput::new().file(root_file("logo.png", "iVBORw0KGgo=").base64()))
        .expect("base");
    let err = engine
        .merge(&n[1], &CodegenOutput::new().patch("logo.png", vec![PatchOperation::append("x")]))
        .expect_err("binary");
    assert!(matches!(err, MergeError::BinaryPatchTarget { .. }));
}

#[test]
fn test_category_routing() {
    let n = nodes(&[("My Node", NodeType::BackendApi)]);
    let mut engine = MergeEngine::new();
    let output = CodegenOutput::new()
        .file(CodegenFile::new("package.json", "{}").category(FileCategory::Root))
        .file(CodegenFile::new("index.ts", "").category(FileCategory::BackendSource))
        .file(CodegenFile::new("health.ts", "").category(FileCategory::BackendRoutes))
        .file(CodegenFile::new("page.tsx", "").category(FileCategory::FrontendApp))
        .file(CodegenFile::new("useX.ts", "").category(FileCategory::FrontendHooks))
        .file(CodegenFile::new("Cargo.toml", "").category(FileCategory::ContractManifest).group("My Token"))
        .file(CodegenFile::new("deploy.sh", "").category(FileCategory::Scripts))
        .file(CodegenFile::new("notes.md", ""));

    let report = engine.merge(&n[0], &output).expect("merge");
    for expected in [
        "package.json",
        "apps/api/src/index.ts",
        "apps/api/src/routes/health.ts",
        "apps/web/src/app/page.tsx",
        "apps/web/src/hooks/useX.ts",
        "contracts/my-token/Cargo.toml",
        "scripts/deploy.sh",
        "generated/backend-api/my-node/notes.md",
    ] {
        assert!(report.files.iter().any(|f| f == expected), "{} not in {:?}", expected, report.files);
    }
}

#[test]
fn test_escaping_paths_are_rejected() {
    let n = nodes(&[("web", NodeType::FrontendScaffold)]);
    let mut engine = MergeEngine::new();
    let err = engine
        .merge(&n[0], &CodegenOutput::new().file(CodegenFile::new("../etc/passwd", "")))
        .expect_err("escape");
    assert!(matches!(err, MergeError::InvalidPath { .. }));
}

#[test]
fn test_drive_prefixes_rejected_but_colons_allowed() {
    let n = nodes(&[("web", NodeType::FrontendScaffold)]);
    let mut engine = MergeEngine::new();
    let err = engine
        .merge(&n[0], &CodegenOutput::new().file(root_file("C:\\Windows\\win.ini", "")))
        .expect_err("drive path");
    assert!(matches!(err, MergeError::InvalidPath { .. }));

    let report = engine
        .merge(&n[0], &CodegenOutput::new().file(root_file("a:b.txt", "ok")))
        .expect("colon in name");
    assert_eq!(report.files, vec!["a:b.txt"]);
}

#[test]
fn test_env_vars_first_definition_wins() {
    let n = nodes(&[("a", NodeType::Erc20Token), ("b", NodeType::Erc1155Token)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(&n[0], &CodegenOutput::new().env(EnvVar::optional("RPC_URL", "first", "http://a")))
        .expect("a");
    engine
        .merge(
            &n[1],
            &CodegenOutput::new()
                .env(EnvVar::optional("RPC_URL", "second", "http://b"))
                .env(EnvVar::required("PRIVATE_KEY", "deployer key").secret()),
        )
        .expect("b");

    let vars = &engine.manifest().env_vars;
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0].default.as_deref(), Some("http://a"));
}

#[test]
fn test_finish_synthesizes_env_example_and_docs() {
    let n = nodes(&[("a", NodeType::Erc20Token)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(
            &n[0],
            &CodegenOutput::new()
                .env(EnvVar::optional("RPC_URL", "RPC endpoint", "http://localhost:8547"))
                .env(EnvVar::required("PRIVATE_KEY", "Deployer key").secret())
                .script("deploy", "sh scripts/deploy.sh")
                .doc("Token", "An ERC-20 token."),
        )
        .expect("merge");

    let repo = engine.finish();
    let env = repo.file(ENV_EXAMPLE_PATH).expect("env example");
    assert!(env.content.contains("# RPC endpoint\nRPC_URL=http://localhost:8547\n"));
    assert!(env.content.contains("# (required)\nPRIVATE_KEY=\n"));

    let docs = repo.file(GENERATED_DOCS_PATH).expect("docs");
    assert!(docs.content.contains("## Token"));
    assert!(docs.content.contains("`deploy`"));
    assert_eq!(repo.file("README.md"), None);
}

#[test]
fn test_write_to_disk() {
    let n = nodes(&[("web", NodeType::FrontendScaffold)]);
    let mut engine = MergeEngine::new();
    engine
        .merge(
            &n[0],
            &CodegenOutput::new()
                .file(CodegenFile::new("README.md", "# hi").category(FileCategory::Root))
                .file(CodegenFile::new("page.tsx", "export {}").category(FileCategory::FrontendApp)),
        )
        .expect("merge");

    let dir = tempfile::tempdir().expect("tempdir");
    engine.finish().write_to(dir.path()).expect("write");

    let readme = std::fs::read_to_string(dir.path().join("README.md")).expect("readme");
    assert_eq!(readme, "# hi");
    assert!(dir.path().join("apps/web/src/app/page.tsx").exists());
}
