use crate::plugins::output::{InsertPosition, PatchOperation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorNotFound {
    pub anchor: String,
}

/// Applies `operations` in order to a copy of `content`.
///
/// Either every operation applies and the new content is returned, or the
/// first missing anchor is reported and the caller's content stays untouched.
/// A `replace` whose search text is absent is a no-op.
pub fn apply_operations(content: &str, operations: &[PatchOperation]) -> Result<String, AnchorNotFound> {
    let mut current = content.to_string();
    for op in operations {
        current = apply_operation(&current, op)?;
    }
    Ok(current)
}

pub fn apply_operation(content: &str, op: &PatchOperation) -> Result<String, AnchorNotFound> {
    match op {
        PatchOperation::Insert { position, content: insert } => match position {
            InsertPosition::Start => Ok(format!("{}{}", insert, content)),
            InsertPosition::End => Ok(format!("{}{}", content, insert)),
            InsertPosition::After(anchor) => {
                let at = content.find(anchor.as_str()).ok_or_else(|| AnchorNotFound {
                    anchor: anchor.clone(),
                })?;
                Ok(splice(content, at + anchor.len(), insert))
            }
            InsertPosition::Before(anchor) => {
                let at = content.find(anchor.as_str()).ok_or_else(|| AnchorNotFound {
                    anchor: anchor.clone(),
                })?;
                Ok(splice(content, at, insert))
            }
        },
        PatchOperation::Replace { search, replace, all } => {
            if search.is_empty() {
                return Ok(content.to_string());
            }
            if *all {
                Ok(content.replace(search.as_str(), replace))
            } else {
                Ok(content.replacen(search.as_str(), replace, 1))
            }
        }
    }
}

fn splice(content: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(content.len() + insert.len());
    out.push_str(&content[..at]);
    out.push_str(insert);
    out.push_str(&content[at..]);
    out
}
