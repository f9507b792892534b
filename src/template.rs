//! gigboard template engine
//!
//! A small Django-style engine used for every page.
//!
//! Workflow:
//! 1. `render_template` loads the child template from the template directory.
//! 2. `tokenize_template` splits content into Text, Variable and Tag tokens
//!    (`{# comments #}` are dropped).
//! 3. `parse_tokens` builds an AST of `Node`.
//! 4. Child `Block` definitions and the `Extends` tag are collected.
//! 5. `merge_blocks` replaces the base template's blocks with the child's by name.
//! 6. `render_nodes` walks the merged AST: variables (with `|filters`) are
//!    HTML-escaped, `if` tests truthiness (`not` negates), `for` iterates lists and
//!    `{% tailwind %}` inserts the stylesheet CDN.
//!
//! Runtime logging is controlled via `set_display_logs`.

use chrono::DateTime;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Global switch for enabling/disabling internal template logs
static DISPLAY_LOGS: AtomicBool = AtomicBool::new(false);

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\{\{.*?\}\}|\{%.*?%\}|\{#.*?#\})").expect("valid regex"));

/// Enable or disable internal debug logs for the template engine
pub fn set_display_logs(enabled: bool) {
    DISPLAY_LOGS.store(enabled, Ordering::Relaxed);
}

/// Internal debug: logs only if DISPLAY_LOGS is true
macro_rules! tdebug {
    ($($arg:tt)+) => {
        if DISPLAY_LOGS.load(Ordering::Relaxed) {
            debug!($($arg)+);
        }
    }
}

/// Variables available to a template.
pub type Context = HashMap<String, TemplateValue>;

/// Supported value types for template context
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateValue {
    Null,
    String(String),
    Bool(bool),
    Number(f64),
    List(Vec<TemplateValue>),
    Object(HashMap<String, TemplateValue>),
}

impl TemplateValue {
    /// Convert the value to a string for rendering
    pub fn as_string(&self) -> String {
        match self {
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Bool(b) => b.to_string(),
            TemplateValue::Number(n) => n.to_string(),
            TemplateValue::Null | TemplateValue::List(_) | TemplateValue::Object(_) => {
                String::new()
            }
        }
    }

    /// Empty strings, empty lists, zero, `false` and null are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Null => false,
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::Bool(b) => *b,
            TemplateValue::Number(n) => *n != 0.0,
            TemplateValue::List(items) => !items.is_empty(),
            TemplateValue::Object(map) => !map.is_empty(),
        }
    }

    /// Convert any serializable view model into a template value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(TemplateValue::from)
            .map_err(|e| Error::Template(format!("context serialization failed: {e}")))
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => TemplateValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.into_iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(map) => TemplateValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, TemplateValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::String(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::String(value)
    }
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// Token types extracted from the template
#[derive(Debug, Clone)]
pub enum Token {
    Text(String),     // Plain text
    Variable(String), // {{ variable }}
    Tag(String),      // {% tag %}
}

/// AST node types for the template engine
#[derive(Debug, Clone)]
pub enum Node {
    Text(String),
    Variable(String),
    If {
        condition: String,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
    For {
        var_name: String,
        list_name: String,
        body: Vec<Node>,
    },
    Block {
        name: String,
        body: Vec<Node>,
    },
    Extends(String), // {% extends "base.html" %}
    Tailwind,        // {% tailwind %}
}

/// Tokenizes the template content into a Vec<Token>
pub fn tokenize_template(content: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last_end = 0;
    for mat in TOKEN_RE.find_iter(content) {
        let start = mat.start();
        let end = mat.end();
        if start > last_end {
            tokens.push(Token::Text(content[last_end..start].to_string()));
        }
        let m = mat.as_str();
        if m.starts_with("{{") {
            let inner = m
                .trim_start_matches("{{")
                .trim_end_matches("}}")
                .trim()
                .to_string();
            tdebug!("tokenize: Variable '{}'", inner);
            tokens.push(Token::Variable(inner));
        } else if m.starts_with("{%") {
            let inner = m
                .trim_start_matches("{%")
                .trim_end_matches("%}")
                .trim()
                .to_string();
            tdebug!("tokenize: Tag '{}'", inner);
            tokens.push(Token::Tag(inner));
        }
        last_end = end;
    }
    if last_end < content.len() {
        tokens.push(Token::Text(content[last_end..].to_string()));
    }
    tokens
}

/// Parses a sequence of Token into an AST of Node
pub fn parse_tokens(tokens: &[Token]) -> Vec<Node> {
    let mut idx = 0;
    parse_nodes(tokens, &mut idx, &[])
}

/// Recursive parser: consumes tokens until one of `end_tags` is found
fn parse_nodes(tokens: &[Token], idx: &mut usize, end_tags: &[&str]) -> Vec<Node> {
    let mut nodes = Vec::new();
    while *idx < tokens.len() {
        match &tokens[*idx] {
            Token::Text(t) => {
                nodes.push(Node::Text(t.clone()));
                *idx += 1;
            }
            Token::Variable(v) => {
                nodes.push(Node::Variable(v.clone()));
                *idx += 1;
            }
            Token::Tag(tag) => {
                let t = tag.trim();
                if end_tags.contains(&t) {
                    break;
                }
                if let Some(rest) = t.strip_prefix("extends ") {
                    nodes.push(Node::Extends(unquote(rest).to_string()));
                    *idx += 1;
                    continue;
                }
                if let Some(name) = t.strip_prefix("block ") {
                    *idx += 1;
                    let body = parse_nodes(tokens, idx, &["endblock"]);
                    *idx += 1; // skip endblock
                    nodes.push(Node::Block {
                        name: name.trim().to_string(),
                        body,
                    });
                    continue;
                }
                if let Some(cond) = t.strip_prefix("if ") {
                    *idx += 1;
                    let then_body = parse_nodes(tokens, idx, &["else", "endif"]);
                    let mut else_body = Vec::new();
                    if let Some(Token::Tag(tt)) = tokens.get(*idx) {
                        if tt.trim() == "else" {
                            *idx += 1;
                            else_body = parse_nodes(tokens, idx, &["endif"]);
                        }
                    }
                    *idx += 1; // skip endif
                    nodes.push(Node::If {
                        condition: cond.trim().to_string(),
                        then_body,
                        else_body,
                    });
                    continue;
                }
                if let Some(rest) = t.strip_prefix("for ") {
                    let parts: Vec<&str> = rest.split_whitespace().collect();
                    if parts.len() == 3 && parts[1] == "in" {
                        *idx += 1;
                        let body = parse_nodes(tokens, idx, &["endfor"]);
                        *idx += 1; // skip endfor
                        nodes.push(Node::For {
                            var_name: parts[0].to_string(),
                            list_name: parts[2].to_string(),
                            body,
                        });
                        continue;
                    }
                }
                if t == "tailwind" {
                    nodes.push(Node::Tailwind);
                    *idx += 1;
                    continue;
                }
                tdebug!("parse: skipping unknown tag '{}'", t);
                *idx += 1;
            }
        }
    }
    nodes
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'')
}

/// Resolves a dotted variable path 'a.b.c' within the context
fn resolve_variable<'a>(name: &str, context: &'a Context) -> Option<&'a TemplateValue> {
    let mut current: Option<&TemplateValue> = None;
    for (i, key) in name.split('.').enumerate() {
        if i == 0 {
            current = context.get(key);
        } else if let Some(TemplateValue::Object(map)) = current {
            current = map.get(key);
        } else {
            return None;
        }
    }
    current
}

/// Evaluates `{{ path|filter|filter:"arg" }}`.
fn evaluate(expression: &str, context: &Context) -> TemplateValue {
    let mut parts = expression.split('|');
    let path = parts.next().unwrap_or_default().trim();
    let mut value = resolve_variable(path, context)
        .cloned()
        .unwrap_or(TemplateValue::Null);
    for filter in parts {
        let (name, arg) = match filter.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(unquote(arg))),
            None => (filter.trim(), None),
        };
        value = apply_filter(name, arg, value);
    }
    value
}

fn apply_filter(name: &str, arg: Option<&str>, value: TemplateValue) -> TemplateValue {
    match name {
        "length" => TemplateValue::Number(match &value {
            TemplateValue::List(items) => items.len() as f64,
            TemplateValue::String(s) => s.chars().count() as f64,
            TemplateValue::Object(map) => map.len() as f64,
            _ => 0.0,
        }),
        "default" => {
            if value.is_truthy() {
                value
            } else {
                TemplateValue::String(arg.unwrap_or_default().to_string())
            }
        }
        "datetime" => format_datetime(&value.as_string(), arg.unwrap_or("medium"))
            .map(TemplateValue::String)
            .unwrap_or(value),
        _ => {
            tdebug!("render: unknown filter '{}'", name);
            value
        }
    }
}

/// `medium`: `Tue 05, 21, 2019 9:30PM`; `full`: `Tuesday May, 21, 2019 at 9:30PM`.
pub fn format_datetime(value: &str, format: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(value).ok()?;
    let pattern = match format {
        "full" => "%A %B, %-d, %Y at %-I:%M%p",
        _ => "%a %m, %d, %Y %-I:%M%p",
    };
    Some(parsed.format(pattern).to_string())
}

/// Escape text for safe inclusion in HTML bodies and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn condition_holds(condition: &str, context: &Context) -> bool {
    match condition.strip_prefix("not ") {
        Some(inner) => !evaluate(inner.trim(), context).is_truthy(),
        None => evaluate(condition, context).is_truthy(),
    }
}

/// Merges child blocks into base AST by matching block names
fn merge_blocks(nodes: &[Node], child_blocks: &HashMap<String, Vec<Node>>) -> Vec<Node> {
    nodes
        .iter()
        .map(|node| match node {
            Node::Block { name, body } => Node::Block {
                name: name.clone(),
                body: match child_blocks.get(name) {
                    Some(child) => child.clone(),
                    None => merge_blocks(body, child_blocks),
                },
            },
            Node::If {
                condition,
                then_body,
                else_body,
            } => Node::If {
                condition: condition.clone(),
                then_body: merge_blocks(then_body, child_blocks),
                else_body: merge_blocks(else_body, child_blocks),
            },
            Node::For {
                var_name,
                list_name,
                body,
            } => Node::For {
                var_name: var_name.clone(),
                list_name: list_name.clone(),
                body: merge_blocks(body, child_blocks),
            },
            other => other.clone(),
        })
        .collect()
}

/// Renders the AST into HTML string using the context
pub fn render_nodes(nodes: &[Node], context: &Context) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Variable(expression) => {
                out.push_str(&escape_html(&evaluate(expression, context).as_string()));
            }
            Node::If {
                condition,
                then_body,
                else_body,
            } => {
                if condition_holds(condition, context) {
                    out.push_str(&render_nodes(then_body, context));
                } else {
                    out.push_str(&render_nodes(else_body, context));
                }
            }
            Node::For {
                var_name,
                list_name,
                body,
            } => {
                if let Some(TemplateValue::List(items)) = resolve_variable(list_name, context) {
                    let mut local = context.clone();
                    for item in items {
                        local.insert(var_name.clone(), item.clone());
                        out.push_str(&render_nodes(body, &local));
                    }
                }
            }
            Node::Block { body, .. } => {
                out.push_str(&render_nodes(body, context));
            }
            Node::Extends(_) => {}
            Node::Tailwind => {
                tdebug!("Inserting Tailwind CDN link");
                out.push_str(r#"<script src="https://cdn.tailwindcss.com"></script>"#);
            }
        }
    }
    out
}

fn load(template_dir: &Path, template_name: &str) -> Result<Vec<Node>> {
    let path = template_dir.join(template_name);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Template(format!("template '{}' not found: {}", template_name, e)))?;
    Ok(parse_tokens(&tokenize_template(&content)))
}

/// Main entry: loads the child template, merges it into its base and renders HTML.
pub fn render_template(template_dir: &Path, template_name: &str, context: &Context) -> Result<String> {
    let child_nodes = load(template_dir, template_name)?;
    tdebug!("Child AST: {:?}", child_nodes);

    let mut child_blocks = HashMap::new();
    let mut base_name: Option<String> = None;
    for node in &child_nodes {
        if let Node::Extends(b) = node {
            base_name = Some(b.clone());
        }
        if let Node::Block { name, body } = node {
            child_blocks.insert(name.clone(), body.clone());
        }
    }

    let merged = match base_name {
        Some(base) => {
            let base_nodes = load(template_dir, &base)?;
            tdebug!("Base AST: {:?}", base_nodes);
            merge_blocks(&base_nodes, &child_blocks)
        }
        None => child_nodes,
    };
    tdebug!("Merged AST: {:?}", merged);
    Ok(render_nodes(&merged, context))
}
