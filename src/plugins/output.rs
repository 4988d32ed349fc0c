use serde::{Deserialize, Serialize};

/// Everything one plugin invocation produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodegenOutput {
    #[serde(default)]
    pub files: Vec<CodegenFile>,
    #[serde(default)]
    pub patches: Vec<FilePatch>,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
    #[serde(default)]
    pub scripts: Vec<Script>,
    #[serde(default)]
    pub docs: Vec<DocEntry>,
    #[serde(default)]
    pub interfaces: Vec<TypedInterface>,
}

impl CodegenOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file: CodegenFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn patch(mut self, path: &str, operations: Vec<PatchOperation>) -> Self {
        self.patches.push(FilePatch {
            path: path.to_string(),
            operations,
        });
        self
    }

    pub fn env(mut self, var: EnvVar) -> Self {
        self.env_vars.push(var);
        self
    }

    pub fn script(mut self, name: &str, command: &str) -> Self {
        self.scripts.push(Script {
            name: name.to_string(),
            command: command.to_string(),
            description: None,
        });
        self
    }

    pub fn doc(mut self, title: &str, content: impl Into<String>) -> Self {
        self.docs.push(DocEntry {
            title: title.to_string(),
            content: content.into(),
        });
        self
    }

    pub fn interface(mut self, name: &str, language: &str, definition: impl Into<String>) -> Self {
        self.interfaces.push(TypedInterface {
            name: name.to_string(),
            language: language.to_string(),
            definition: definition.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodegenFile {
    /// Path relative to the category's destination directory, or to the
    /// repository root for [`FileCategory::Root`].
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    /// Logical grouping, e.g. the contract a source file belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl CodegenFile {
    pub fn new(path: &str, content: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            content: content.into(),
            encoding: Encoding::Utf8,
            category: None,
            group: None,
        }
    }

    pub fn category(mut self, category: FileCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn base64(mut self) -> Self {
        self.encoding = Encoding::Base64;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Base64,
}

/// Declared destination category; see `merge::router` for the routing table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    /// Path is taken verbatim relative to the repository root.
    Root,
    FrontendApp,
    FrontendComponents,
    FrontendHooks,
    FrontendLib,
    BackendRoutes,
    BackendSource,
    ContractSource,
    ContractTests,
    ContractManifest,
    Scripts,
    Docs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilePatch {
    /// Destination path in the merged tree.
    pub path: String,
    pub operations: Vec<PatchOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Insert {
        position: InsertPosition,
        content: String,
    },
    Replace {
        search: String,
        replace: String,
        #[serde(default)]
        all: bool,
    },
}

impl PatchOperation {
    pub fn insert_after(anchor: &str, content: &str) -> Self {
        PatchOperation::Insert {
            position: InsertPosition::After(anchor.to_string()),
            content: content.to_string(),
        }
    }

    pub fn insert_before(anchor: &str, content: &str) -> Self {
        PatchOperation::Insert {
            position: InsertPosition::Before(anchor.to_string()),
            content: content.to_string(),
        }
    }

    pub fn append(content: &str) -> Self {
        PatchOperation::Insert {
            position: InsertPosition::End,
            content: content.to_string(),
        }
    }

    pub fn prepend(content: &str) -> Self {
        PatchOperation::Insert {
            position: InsertPosition::Start,
            content: content.to_string(),
        }
    }

    pub fn replace(search: &str, replace: &str, all: bool) -> Self {
        PatchOperation::Replace {
            search: search.to_string(),
            replace: replace.to_string(),
            all,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Start,
    End,
    After(String),
    Before(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub secret: bool,
}

impl EnvVar {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
            default: None,
            secret: false,
        }
    }

    pub fn optional(name: &str, description: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            default: Some(default.to_string()),
            secret: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocEntry {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedInterface {
    pub name: String,
    pub language: String,
    pub definition: String,
}
