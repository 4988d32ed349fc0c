//! Combines the outputs of every executed node into one repository tree.

pub mod patch;
pub mod router;

use crate::dsl::Node;
use crate::plugins::output::{CodegenFile, CodegenOutput, DocEntry, Encoding, EnvVar, FileCategory, Script, TypedInterface};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const ENV_EXAMPLE_PATH: &str = ".env.example";
pub const GENERATED_DOCS_PATH: &str = "docs/GENERATED.md";

/// Node id recorded as the owner of files synthesized by the engine itself.
pub const ENGINE_OWNER: &str = "<engine>";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("file collision at '{path}': written by node {first_node} and node {second_node}")]
    FileCollision {
        path: String,
        first_node: String,
        second_node: String,
    },
    #[error("patch from node {node_id} on '{path}': anchor {anchor:?} not found")]
    PatchAnchorNotFound {
        path: String,
        node_id: String,
        anchor: String,
    },
    #[error("patch from node {node_id} targets '{path}', which is not in the output tree")]
    PatchTargetMissing { path: String, node_id: String },
    #[error("patch from node {node_id} targets binary file '{path}'")]
    BinaryPatchTarget { path: String, node_id: String },
    #[error("node {node_id} emitted invalid path '{path}': {reason}")]
    InvalidPath {
        path: String,
        node_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub content: String,
    pub encoding: Encoding,
    /// Node that created the file.
    pub owner: String,
    /// Nodes that patched it afterwards, in order.
    pub patched_by: Vec<String>,
}

/// The in-progress output tree, ordered by path.
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    entries: BTreeMap<String, TreeEntry>,
}

impl FileTree {
    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }
}

/// Flat, de-duplicated view of the non-file outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub env_vars: Vec<EnvVar>,
    pub scripts: Vec<Script>,
    pub docs: Vec<DocEntry>,
    pub interfaces: Vec<TypedInterface>,
}

/// What merging one node changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub files: Vec<String>,
    pub patched: Vec<String>,
}

/// Final result of a generation: the whole tree plus manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRepository {
    pub files: Vec<CodegenFile>,
    pub manifest: Manifest,
}

impl GeneratedRepository {
    pub fn file(&self, path: &str) -> Option<&CodegenFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Materializes the repository under `dir`.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<()> {
        for file in &self.files {
            let target = dir.join(&file.path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            match file.encoding {
                Encoding::Utf8 => fs::write(&target, &file.content)?,
                Encoding::Base64 => {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(file.content.as_bytes())
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                    fs::write(&target, bytes)?;
                }
            }
        }
        Ok(())
    }
}

/// Single-writer merge of node outputs, fed in execution order.
#[derive(Debug, Default)]
pub struct MergeEngine {
    tree: FileTree,
    manifest: Manifest,
    env_owners: BTreeMap<String, String>,
    script_owners: BTreeMap<String, String>,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Merges one node's output.
    ///
    /// Files are routed and added first, then patches run against the tree
    /// including those new files. Nothing is committed unless every file and
    /// every patch operation succeeds.
    pub fn merge(&mut self, node: &Node, output: &CodegenOutput) -> Result<MergeReport, MergeError> {
        let mut staged: BTreeMap<String, TreeEntry> = BTreeMap::new();

        for file in &output.files {
            let dest = router::route(file, node)?;
            if let Some(existing) = self.tree.get(&dest) {
                return Err(MergeError::FileCollision {
                    path: dest,
                    first_node: existing.owner.clone(),
                    second_node: node.id.clone(),
                });
            }
            if staged.contains_key(&dest) {
                return Err(MergeError::FileCollision {
                    path: dest,
                    first_node: node.id.clone(),
                    second_node: node.id.clone(),
                });
            }
            staged.insert(
                dest,
                TreeEntry {
                    content: file.content.clone(),
                    encoding: file.encoding,
                    owner: node.id.clone(),
                    patched_by: Vec::new(),
                },
            );
        }

        let mut patched: BTreeMap<String, String> = BTreeMap::new();
        let mut patched_order: Vec<String> = Vec::new();

        for file_patch in &output.patches {
            let path = router::normalize(&file_patch.path).map_err(|reason| MergeError::InvalidPath {
                path: file_patch.path.clone(),
                node_id: node.id.clone(),
                reason,
            })?;

            let (current, encoding) = if let Some(content) = patched.get(&path) {
                (content.clone(), Encoding::Utf8)
            } else if let Some(entry) = staged.get(&path).or_else(|| self.tree.get(&path)) {
                (entry.content.clone(), entry.encoding)
            } else {
                return Err(MergeError::PatchTargetMissing {
                    path,
                    node_id: node.id.clone(),
                });
            };

            if encoding == Encoding::Base64 {
                return Err(MergeError::BinaryPatchTarget {
                    path,
                    node_id: node.id.clone(),
                });
            }

            let updated = patch::apply_operations(&current, &file_patch.operations).map_err(|e| {
                MergeError::PatchAnchorNotFound {
                    path: path.clone(),
                    node_id: node.id.clone(),
                    anchor: e.anchor,
                }
            })?;

            if !patched_order.contains(&path) {
                patched_order.push(path.clone());
            }
            patched.insert(path, updated);
        }

        // Commit.
        let mut report = MergeReport {
            files: staged.keys().cloned().collect(),
            patched: Vec::new(),
        };
        for (path, entry) in staged {
            self.tree.entries.insert(path, entry);
        }
        for path in patched_order {
            let Some(content) = patched.remove(&path) else {
                continue;
            };
            if let Some(entry) = self.tree.entries.get_mut(&path) {
                entry.content = content;
                if entry.owner != node.id {
                    entry.patched_by.push(node.id.clone());
                }
            }
            debug!(node_id = %node.id, path = %path, "Patched file");
            report.patched.push(path);
        }

        self.merge_manifest(node, output);
        Ok(report)
    }

    fn merge_manifest(&mut self, node: &Node, output: &CodegenOutput) {
        for var in &output.env_vars {
            match self.env_owners.get(&var.name) {
                Some(owner) => {
                    let existing = self.manifest.env_vars.iter().find(|v| v.name == var.name);
                    if existing != Some(var) {
                        warn!(
                            name = %var.name,
                            first_node = %owner,
                            node_id = %node.id,
                            "Conflicting environment variable definition ignored"
                        );
                    }
                }
                None => {
                    self.env_owners.insert(var.name.clone(), node.id.clone());
                    self.manifest.env_vars.push(var.clone());
                }
            }
        }

        for script in &output.scripts {
            match self.script_owners.get(&script.name) {
                Some(owner) => {
                    let existing = self.manifest.scripts.iter().find(|s| s.name == script.name);
                    if existing.map(|s| &s.command) != Some(&script.command) {
                        warn!(
                            name = %script.name,
                            first_node = %owner,
                            node_id = %node.id,
                            "Conflicting script definition ignored"
                        );
                    }
                }
                None => {
                    self.script_owners.insert(script.name.clone(), node.id.clone());
                    self.manifest.scripts.push(script.clone());
                }
            }
        }

        self.manifest.docs.extend(output.docs.iter().cloned());
        self.manifest.interfaces.extend(output.interfaces.iter().cloned());
    }

    /// Closes the merge, synthesizing `.env.example` and the generated docs
    /// page unless a plugin already wrote those paths.
    pub fn finish(mut self) -> GeneratedRepository {
        if !self.manifest.env_vars.is_empty() && !self.tree.contains(ENV_EXAMPLE_PATH) {
            let content = render_env_example(&self.manifest.env_vars);
            self.tree.entries.insert(ENV_EXAMPLE_PATH.to_string(), synthesized(content));
        }
        if !self.manifest.docs.is_empty() && !self.tree.contains(GENERATED_DOCS_PATH) {
            let content = render_docs(&self.manifest);
            self.tree.entries.insert(GENERATED_DOCS_PATH.to_string(), synthesized(content));
        }

        let files = self
            .tree
            .entries
            .into_iter()
            .map(|(path, entry)| CodegenFile {
                path,
                content: entry.content,
                encoding: entry.encoding,
                category: Some(FileCategory::Root),
                group: None,
            })
            .collect();

        GeneratedRepository {
            files,
            manifest: self.manifest,
        }
    }
}

fn synthesized(content: String) -> TreeEntry {
    TreeEntry {
        content,
        encoding: Encoding::Utf8,
        owner: ENGINE_OWNER.to_string(),
        patched_by: Vec::new(),
    }
}

fn render_env_example(vars: &[EnvVar]) -> String {
    let mut out = String::new();
    for var in vars {
        if !var.description.is_empty() {
            out.push_str(&format!("# {}\n", var.description));
        }
        if var.required {
            out.push_str("# (required)\n");
        }
        let value = if var.secret {
            String::new()
        } else {
            var.default.clone().unwrap_or_default()
        };
        out.push_str(&format!("{}={}\n\n", var.name, value));
    }
    out
}

fn render_docs(manifest: &Manifest) -> String {
    let mut out = String::from("# Generated Components\n");
    for doc in &manifest.docs {
        out.push_str(&format!("\n## {}\n\n{}\n", doc.title, doc.content.trim_end()));
    }
    if !manifest.scripts.is_empty() {
        out.push_str("\n## Scripts\n\n");
        for script in &manifest.scripts {
            out.push_str(&format!("- `{}`: `{}`\n", script.name, script.command));
        }
    }
    out
}
