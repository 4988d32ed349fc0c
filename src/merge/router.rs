use crate::dsl::Node;
use crate::merge::MergeError;
use crate::plugins::output::{CodegenFile, FileCategory};

/// Category → destination subtree. `{group}` expands to the slugified logical
/// grouping of the file (its `group`, else the node label, else the node id).
const ROUTES: &[(FileCategory, &str)] = &[
    (FileCategory::Root, ""),
    (FileCategory::FrontendApp, "apps/web/src/app"),
    (FileCategory::FrontendComponents, "apps/web/src/components"),
    (FileCategory::FrontendHooks, "apps/web/src/hooks"),
    (FileCategory::FrontendLib, "apps/web/src/lib"),
    (FileCategory::BackendRoutes, "apps/api/src/routes"),
    (FileCategory::BackendSource, "apps/api/src"),
    (FileCategory::ContractSource, "contracts/{group}/src"),
    (FileCategory::ContractTests, "contracts/{group}/tests"),
    (FileCategory::ContractManifest, "contracts/{group}"),
    (FileCategory::Scripts, "scripts"),
    (FileCategory::Docs, "docs"),
];

/// Uncategorized files land under a directory owned by their node.
const FALLBACK_ROOT: &str = "generated";

pub fn destination_root(category: FileCategory) -> &'static str {
    ROUTES
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, root)| *root)
        .unwrap_or(FALLBACK_ROOT)
}

/// Computes where `file`, emitted by `node`, lives in the merged tree.
pub fn route(file: &CodegenFile, node: &Node) -> Result<String, MergeError> {
    let relative = normalize(&file.path).map_err(|reason| MergeError::InvalidPath {
        path: file.path.clone(),
        node_id: node.id.clone(),
        reason,
    })?;

    let root = match file.category {
        Some(category) => {
            let group = file
                .group
                .as_deref()
                .or(node.label.as_deref())
                .unwrap_or(&node.id);
            destination_root(category).replace("{group}", &slugify(group))
        }
        None => format!("{}/{}/{}", FALLBACK_ROOT, node.kind, slugify(&node.id)),
    };

    if root.is_empty() {
        Ok(relative)
    } else {
        Ok(format!("{}/{}", root, relative))
    }
}

/// `C:`, `C:/...` style prefixes. `a:b.txt` is an ordinary relative name.
fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some(':'), None | Some('/')) if letter.is_ascii_alphabetic()
    )
}

/// Normalizes a relative path: forward slashes, no `.` segments, no `..`,
/// not absolute, not empty.
pub fn normalize(path: &str) -> Result<String, String> {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err("absolute paths are not allowed".to_string());
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err("parent directory segments are not allowed".to_string()),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err("path is empty".to_string());
    }
    Ok(segments.join("/"))
}

/// Lowercase kebab-case identifier safe for directory names.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("unnamed");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("My  Token!"), "my-token");
        assert_eq!(slugify("__x__y"), "x-y");
        assert_eq!(slugify("???"), "unnamed");
    }

    #[test]
    fn normalize_rejects_escapes() {
        assert_eq!(normalize("./src//lib.rs").unwrap(), "src/lib.rs");
        assert!(normalize("../etc/passwd").is_err());
        assert!(normalize("/etc/passwd").is_err());
        assert!(normalize("C:\\x").is_err());
        assert!(normalize("c:").is_err());
        assert!(normalize("C:/x").is_err());
        assert!(normalize("./").is_err());
    }
}
