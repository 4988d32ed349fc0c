//! Text templates used by generators.
//!
//! Supported syntax:
//! - `{{path.to.value}}` interpolation (`this`, `@index`, `@first`, `@last`, `../name`)
//! - `{{#if cond}} .. {{else}} .. {{/if}}` and `{{#unless cond}} .. {{/unless}}`
//! - `{{#each list}} .. {{else}} .. {{/each}}` over arrays and objects
//! - `{{! comment }}`
//!
//! A condition that is a plain path tests JSON truthiness. Anything else
//! (`decimals > 0`, `framework == "nextjs"`) is evaluated with `evalexpr`
//! against the scalar values visible in scope. Missing values render as "".
//!
//! A line holding nothing but a block tag is removed entirely so templates can
//! be laid out one tag per line without leaving blank lines behind.

use evalexpr::{ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, eval_with_context};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_MAX_DEPTH: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated tag near: {0}")]
    UnterminatedTag(String),
    #[error("closing tag '/{found}' does not match open block '{expected}'")]
    MismatchedClose { expected: String, found: String },
    #[error("closing tag '/{0}' without an open block")]
    UnexpectedClose(String),
    #[error("'else' outside of a block")]
    UnexpectedElse,
    #[error("block '{0}' is never closed")]
    UnclosedBlock(String),
    #[error("unknown block helper '{0}'")]
    UnknownHelper(String),
    #[error("block '{0}' requires an argument")]
    MissingArgument(String),
    #[error("template nesting exceeds {0} levels")]
    DepthExceeded(usize),
    #[error("cannot evaluate condition '{condition}': {message}")]
    Condition { condition: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Var(String),
    If {
        condition: String,
        negate: bool,
        then: Vec<Segment>,
        otherwise: Vec<Segment>,
    },
    Each {
        path: String,
        body: Vec<Segment>,
        otherwise: Vec<Segment>,
    },
}

/// A parsed template. Parsing once and rendering many times is cheaper than
/// calling [`render`] repeatedly.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        Self::parse_with_depth(source, DEFAULT_MAX_DEPTH)
    }

    pub fn parse_with_depth(source: &str, max_depth: usize) -> Result<Self, TemplateError> {
        let tokens = tokenize(&strip_standalone_lines(source))?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            max_depth,
        };
        let (segments, _) = parser.parse_block(0, None)?;
        Ok(Self { segments })
    }

    pub fn render(&self, context: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        let scopes = [Scope::root(context)];
        render_segments(&self.segments, &scopes, &mut out)?;
        Ok(out)
    }
}

/// Stateless `render(template, context) -> text` with the default nesting bound.
pub fn render(template: &str, context: &Value) -> Result<String, TemplateError> {
    Template::parse(template)?.render(context)
}

/// Same as [`render`] with an explicit nesting bound.
pub fn render_with_depth(template: &str, context: &Value, max_depth: usize) -> Result<String, TemplateError> {
    Template::parse_with_depth(template, max_depth)?.render(context)
}

// --- Lexing ---

#[derive(Debug)]
enum Token {
    Text(String),
    Tag(String),
}

fn is_block_tag(inner: &str) -> bool {
    inner.starts_with('#') || inner.starts_with('/') || inner == "else"
}

fn strip_standalone_lines(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let trimmed = line.trim();
        let standalone = trimmed.starts_with("{{")
            && trimmed.ends_with("}}")
            && trimmed.matches("{{").count() == 1
            && is_block_tag(trimmed[2..trimmed.len() - 2].trim());
        if standalone {
            out.push_str(trimmed);
        } else {
            out.push_str(line);
        }
    }
    out
}

fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            tokens.push(Token::Text(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let close = after.find("}}").ok_or_else(|| {
            TemplateError::UnterminatedTag(rest[open..].chars().take(24).collect())
        })?;
        let inner = after[..close].trim();
        if !inner.starts_with('!') {
            tokens.push(Token::Tag(inner.to_string()));
        }
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

// --- Parsing ---

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    max_depth: usize,
}

impl Parser {
    /// Parses until `closing` (or end of input at the top level). Returns the
    /// main branch and, if an `else` was seen, the alternative branch.
    fn parse_block(
        &mut self,
        depth: usize,
        closing: Option<&str>,
    ) -> Result<(Vec<Segment>, Vec<Segment>), TemplateError> {
        let mut main = Vec::new();
        let mut alternative = Vec::new();
        let mut in_else = false;

        while self.pos < self.tokens.len() {
            let token = &self.tokens[self.pos];
            self.pos += 1;

            let segment = match token {
                Token::Text(text) => Segment::Text(text.clone()),
                Token::Tag(tag) if tag == "else" => {
                    if closing.is_none() || in_else {
                        return Err(TemplateError::UnexpectedElse);
                    }
                    in_else = true;
                    continue;
                }
                Token::Tag(tag) if tag.starts_with('/') => {
                    let name = tag[1..].trim().to_string();
                    return match closing {
                        Some(expected) if expected == name => Ok((main, alternative)),
                        Some(expected) => Err(TemplateError::MismatchedClose {
                            expected: expected.to_string(),
                            found: name,
                        }),
                        None => Err(TemplateError::UnexpectedClose(name)),
                    };
                }
                Token::Tag(tag) if tag.starts_with('#') => {
                    let tag = tag.clone();
                    self.parse_helper(&tag[1..], depth + 1)?
                }
                Token::Tag(tag) => Segment::Var(tag.clone()),
            };

            if in_else {
                alternative.push(segment);
            } else {
                main.push(segment);
            }
        }

        match closing {
            Some(name) => Err(TemplateError::UnclosedBlock(name.to_string())),
            None => Ok((main, alternative)),
        }
    }

    fn parse_helper(&mut self, header: &str, depth: usize) -> Result<Segment, TemplateError> {
        if depth > self.max_depth {
            return Err(TemplateError::DepthExceeded(self.max_depth));
        }

        let (helper, argument) = match header.split_once(char::is_whitespace) {
            Some((h, a)) => (h.trim(), a.trim()),
            None => (header.trim(), ""),
        };
        if argument.is_empty() {
            return Err(TemplateError::MissingArgument(helper.to_string()));
        }

        match helper {
            "if" | "unless" => {
                let (then, otherwise) = self.parse_block(depth, Some(helper))?;
                Ok(Segment::If {
                    condition: argument.to_string(),
                    negate: helper == "unless",
                    then,
                    otherwise,
                })
            }
            "each" => {
                let (body, otherwise) = self.parse_block(depth, Some(helper))?;
                Ok(Segment::Each {
                    path: argument.to_string(),
                    body,
                    otherwise,
                })
            }
            other => Err(TemplateError::UnknownHelper(other.to_string())),
        }
    }
}

// --- Rendering ---

struct Scope<'a> {
    value: &'a Value,
    index: Option<usize>,
    len: usize,
}

impl<'a> Scope<'a> {
    fn root(value: &'a Value) -> Self {
        Self {
            value,
            index: None,
            len: 0,
        }
    }
}

// Loop items live shorter than the outer scopes, so each iteration gets its own scope stack.
fn render_segments(segments: &[Segment], scopes: &[Scope<'_>], out: &mut String) -> Result<(), TemplateError> {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Var(path) => {
                if let Some(value) = lookup(scopes, path) {
                    out.push_str(&stringify(&value));
                }
            }
            Segment::If {
                condition,
                negate,
                then,
                otherwise,
            } => {
                let pass = evaluate(scopes, condition)? != *negate;
                render_segments(if pass { then } else { otherwise }, scopes, out)?;
            }
            Segment::Each { path, body, otherwise } => {
                let items: Vec<Value> = match lookup(scopes, path) {
                    Some(Value::Array(items)) => items,
                    Some(Value::Object(map)) => map.into_iter().map(|(_, v)| v).collect(),
                    _ => Vec::new(),
                };
                if items.is_empty() {
                    render_segments(otherwise, scopes, out)?;
                    continue;
                }
                let len = items.len();
                for (index, item) in items.iter().enumerate() {
                    let mut inner: Vec<Scope<'_>> = scopes
                        .iter()
                        .map(|s| Scope {
                            value: s.value,
                            index: s.index,
                            len: s.len,
                        })
                        .collect();
                    inner.push(Scope {
                        value: item,
                        index: Some(index),
                        len,
                    });
                    render_segments(body, &inner, out)?;
                }
            }
        }
    }
    Ok(())
}

fn lookup(scopes: &[Scope<'_>], path: &str) -> Option<Value> {
    let current = scopes.last()?;

    match path {
        "this" | "." => return Some(current.value.clone()),
        "@index" => return current.index.map(Value::from),
        "@first" => return current.index.map(|i| Value::Bool(i == 0)),
        "@last" => return current.index.map(|i| Value::Bool(i + 1 == current.len)),
        _ => {}
    }

    // `../name` climbs one scope per prefix.
    let mut rest = path;
    let mut depth = scopes.len() - 1;
    while let Some(stripped) = rest.strip_prefix("../") {
        depth = depth.checked_sub(1)?;
        rest = stripped;
    }

    if let Some(stripped) = rest.strip_prefix("this.") {
        return navigate(scopes[depth].value, stripped);
    }

    // Plain names resolve against the innermost scope that defines them.
    let head = rest.split('.').next().unwrap_or(rest);
    for scope in scopes[..=depth].iter().rev() {
        if scope.value.get(head).is_some() {
            return navigate(scope.value, rest);
        }
    }
    None
}

fn navigate(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    for key in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn is_plain_path(condition: &str) -> bool {
    !condition.is_empty()
        && condition
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '@' | '/'))
}

fn evaluate(scopes: &[Scope<'_>], condition: &str) -> Result<bool, TemplateError> {
    if is_plain_path(condition) {
        return Ok(lookup(scopes, condition).map(|v| truthy(&v)).unwrap_or(false));
    }

    let mut eval_ctx = HashMapContext::<DefaultNumericTypes>::new();
    for scope in scopes {
        let Some(obj) = scope.value.as_object() else {
            continue;
        };
        for (k, v) in obj {
            let ev = match v {
                Value::String(s) => Some(evalexpr::Value::String(s.clone())),
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Some(evalexpr::Value::Int(i))
                    } else {
                        n.as_f64().map(evalexpr::Value::Float)
                    }
                }
                Value::Bool(b) => Some(evalexpr::Value::Boolean(*b)),
                _ => None,
            };
            if let Some(ev) = ev {
                let _ = eval_ctx.set_value(k.clone(), ev);
            }
        }
    }

    match eval_with_context(condition, &eval_ctx) {
        Ok(evalexpr::Value::Boolean(b)) => Ok(b),
        Ok(evalexpr::Value::Int(i)) => Ok(i != 0),
        Ok(evalexpr::Value::Float(f)) => Ok(f != 0.0),
        Ok(evalexpr::Value::String(s)) => Ok(!s.is_empty()),
        Ok(_) => Ok(false),
        Err(e) => Err(TemplateError::Condition {
            condition: condition.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_block_lines_are_removed() {
        let src = "a\n{{#if x}}\nb\n{{/if}}\nc\n";
        assert_eq!(strip_standalone_lines(src), "a\n{{#if x}}b\n{{/if}}c\n");
    }

    #[test]
    fn comments_are_dropped() {
        let tokens = tokenize("x{{! ignore me }}y").unwrap();
        assert_eq!(tokens.len(), 2);
    }
}
