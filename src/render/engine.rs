//! Template language for report sources.
//!
//! Tags use LaTeX-friendly delimiters so a template is still a valid TeX
//! file: `\VAR{expr}` substitutes a value, `\BLOCK{...}` holds `for`/`if`
//! statements and `\#{...}` is a comment. A newline directly after a block
//! or comment tag is dropped. Lookups are strict: an undefined path is an
//! error, never an empty string.

use std::sync::LazyLock;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use crate::errors::ReportError;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(VAR|BLOCK|#)\{([^}]*)\}").expect("tag pattern is valid")
});

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*$").expect("path pattern is valid")
});

static FOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^for\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*([A-Za-z_][A-Za-z0-9_]*))?\s+in\s+(.+)$")
        .expect("for pattern is valid")
});

#[derive(Debug)]
enum Token {
    Text(String),
    Var(String),
    Block(String),
}

#[derive(Debug, Clone)]
enum Filter {
    Length,
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
struct Expr {
    path: Vec<String>,
    filters: Vec<Filter>,
}

impl Expr {
    fn display(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone)]
enum Cond {
    Truthy(Expr),
    Not(Expr),
    Defined(Expr),
    NotDefined(Expr),
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Var(Expr),
    For {
        first_var: String,
        second_var: Option<String>,
        iterable: Expr,
        body: Vec<Node>,
    },
    If {
        cond: Cond,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// A parsed template, ready to render against any number of contexts.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse `source`. `name` is the logical path used in error messages.
    pub fn parse(name: &str, source: &str) -> Result<Self, ReportError> {
        let tokens = tokenize(source);
        let mut parser = Parser { name, tokens: tokens.into_iter() };
        let (nodes, terminator) = parser.parse_until()?;
        if let Some(stmt) = terminator {
            return Err(parser.syntax(format!("unexpected '{}' without an opening block", stmt)));
        }
        Ok(Self { name: name.to_string(), nodes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against `context`, which must be a mapping at the root.
    pub fn render(&self, context: &Value) -> Result<String, ReportError> {
        let mut out = String::new();
        let mut scope = Vec::new();
        self.render_nodes(&self.nodes, context, &mut scope, &mut out)?;
        Ok(out)
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        context: &Value,
        scope: &mut Vec<(String, Value)>,
        out: &mut String,
    ) -> Result<(), ReportError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var(expr) => {
                    let value = self.eval(expr, context, scope)?;
                    out.push_str(&self.to_text(&value, expr)?);
                }
                Node::For { first_var, second_var, iterable, body } => {
                    let items = self.iteration_items(iterable, context, scope, second_var.is_some())?;
                    let length = items.len();
                    for (i, (first, second)) in items.into_iter().enumerate() {
                        let depth = scope.len();
                        scope.push(("loop".to_string(), loop_value(i, length)));
                        scope.push((first_var.clone(), first));
                        if let (Some(name), Some(value)) = (second_var, second) {
                            scope.push((name.clone(), value));
                        }
                        let result = self.render_nodes(body, context, scope, out);
                        scope.truncate(depth);
                        result?;
                    }
                }
                Node::If { cond, then, otherwise } => {
                    let branch = if self.test(cond, context, scope)? { then } else { otherwise };
                    self.render_nodes(branch, context, scope, out)?;
                }
            }
        }
        Ok(())
    }

    fn iteration_items(
        &self,
        iterable: &Expr,
        context: &Value,
        scope: &[(String, Value)],
        pairs: bool,
    ) -> Result<Vec<(Value, Option<Value>)>, ReportError> {
        match self.eval(iterable, context, scope)? {
            Value::Sequence(seq) if !pairs => Ok(seq.into_iter().map(|v| (v, None)).collect()),
            Value::Mapping(map) => Ok(map.into_iter().map(|(k, v)| (k, Some(v))).collect()),
            Value::Sequence(_) => Err(self.syntax(format!(
                "cannot unpack items of sequence '{}' into two loop variables",
                iterable.display()
            ))),
            _ => Err(self.syntax(format!("'{}' is not iterable", iterable.display()))),
        }
    }

    fn test(&self, cond: &Cond, context: &Value, scope: &[(String, Value)]) -> Result<bool, ReportError> {
        Ok(match cond {
            Cond::Truthy(expr) => truthy(&self.eval(expr, context, scope)?),
            Cond::Not(expr) => !truthy(&self.eval(expr, context, scope)?),
            Cond::Defined(expr) => lookup(&expr.path, context, scope).is_some(),
            Cond::NotDefined(expr) => lookup(&expr.path, context, scope).is_none(),
        })
    }

    fn eval(&self, expr: &Expr, context: &Value, scope: &[(String, Value)]) -> Result<Value, ReportError> {
        let found = lookup(&expr.path, context, scope).ok_or_else(|| ReportError::TemplateRender {
            path: self.name.clone(),
            field: expr.display(),
        })?;
        let mut value = found.clone();
        for filter in &expr.filters {
            value = self.apply(filter, value, expr)?;
        }
        Ok(value)
    }

    fn apply(&self, filter: &Filter, value: Value, expr: &Expr) -> Result<Value, ReportError> {
        match filter {
            Filter::Length => {
                let len = match &value {
                    Value::Sequence(s) => s.len(),
                    Value::Mapping(m) => m.len(),
                    Value::String(s) => s.chars().count(),
                    _ => return Err(self.syntax(format!("'{}' has no length", expr.display()))),
                };
                Ok(Value::Number((len as u64).into()))
            }
            Filter::Upper => Ok(Value::String(self.to_text(&value, expr)?.to_uppercase())),
            Filter::Lower => Ok(Value::String(self.to_text(&value, expr)?.to_lowercase())),
        }
    }

    fn to_text(&self, value: &Value, expr: &Expr) -> Result<String, ReportError> {
        match value {
            Value::Null => Err(self.syntax(format!(
                "'{}' is null and cannot be written as text",
                expr.display()
            ))),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            Value::Tagged(tagged) => self.to_text(&tagged.value, expr),
            Value::Sequence(_) | Value::Mapping(_) => Err(self.syntax(format!(
                "'{}' is a collection and cannot be written as text",
                expr.display()
            ))),
        }
    }

    fn syntax(&self, message: String) -> ReportError {
        ReportError::TemplateSyntax { path: self.name.clone(), message }
    }
}

fn loop_value(index: usize, length: usize) -> Value {
    let mut map = Mapping::new();
    map.insert("index".into(), Value::Number(((index + 1) as u64).into()));
    map.insert("first".into(), Value::Bool(index == 0));
    map.insert("last".into(), Value::Bool(index + 1 == length));
    map.insert("length".into(), Value::Number((length as u64).into()));
    Value::Mapping(map)
}

fn lookup<'a>(path: &[String], context: &'a Value, scope: &'a [(String, Value)]) -> Option<&'a Value> {
    let (head, rest) = path.split_first()?;
    let mut current = scope
        .iter()
        .rev()
        .find(|(name, _)| name == head)
        .map(|(_, value)| value)
        .or_else(|| context.as_mapping().and_then(|m| m.get(head.as_str())))?;
    for segment in rest {
        current = match current {
            Value::Mapping(m) => m.get(segment.as_str())?,
            Value::Sequence(s) => s.get(segment.parse::<usize>().ok()?)?,
            Value::Tagged(t) => match &t.value {
                Value::Mapping(m) => m.get(segment.as_str())?,
                _ => return None,
            },
            _ => return None,
        };
    }
    Some(current)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(t) => truthy(&t.value),
    }
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last = 0;
    let mut trim_newline = false;

    for cap in TAG_RE.captures_iter(source) {
        let Some(whole) = cap.get(0) else { continue };
        push_text(&mut tokens, &source[last..whole.start()], trim_newline);
        last = whole.end();
        let body = cap[2].trim().to_string();
        match &cap[1] {
            "VAR" => {
                tokens.push(Token::Var(body));
                trim_newline = false;
            }
            "BLOCK" => {
                tokens.push(Token::Block(body));
                trim_newline = true;
            }
            _ => trim_newline = true,
        }
    }
    push_text(&mut tokens, &source[last..], trim_newline);
    tokens
}

fn push_text(tokens: &mut Vec<Token>, text: &str, trim_newline: bool) {
    let text = if trim_newline {
        text.strip_prefix("\r\n").or_else(|| text.strip_prefix('\n')).unwrap_or(text)
    } else {
        text
    };
    if !text.is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }
}

struct Parser<'a> {
    name: &'a str,
    tokens: std::vec::IntoIter<Token>,
}

impl Parser<'_> {
    /// Parse nodes until a closing statement (`endfor`, `else`, `elif ...`,
    /// `endif`) or the end of input. Returns the statement that stopped parsing.
    fn parse_until(&mut self) -> Result<(Vec<Node>, Option<String>), ReportError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Var(body) => nodes.push(Node::Var(self.parse_expr(&body)?)),
                Token::Block(body) => {
                    if body == "endfor" || body == "endif" || body == "else" || body.starts_with("elif ") {
                        return Ok((nodes, Some(body)));
                    }
                    if body.starts_with("for ") {
                        nodes.push(self.parse_for(&body)?);
                    } else if let Some(cond) = body.strip_prefix("if ") {
                        nodes.push(self.parse_if(cond)?);
                    } else {
                        return Err(self.syntax(format!("unknown block statement '{}'", body)));
                    }
                }
            }
        }
        Ok((nodes, None))
    }

    fn parse_for(&mut self, body: &str) -> Result<Node, ReportError> {
        let cap = FOR_RE
            .captures(body)
            .ok_or_else(|| self.syntax(format!("malformed for statement '{}'", body)))?;
        let first_var = cap[1].to_string();
        let second_var = cap.get(2).map(|m| m.as_str().to_string());
        let iterable = self.parse_expr(&cap[3])?;
        let (nodes, terminator) = self.parse_until()?;
        match terminator.as_deref() {
            Some("endfor") => Ok(Node::For { first_var, second_var, iterable, body: nodes }),
            Some(other) => Err(self.syntax(format!("expected 'endfor', found '{}'", other))),
            None => Err(self.syntax(format!("unclosed '{}'", body))),
        }
    }

    fn parse_if(&mut self, cond: &str) -> Result<Node, ReportError> {
        let cond = self.parse_cond(cond)?;
        let (then, terminator) = self.parse_until()?;
        let otherwise = match terminator.as_deref() {
            Some("endif") => Vec::new(),
            Some("else") => {
                let (otherwise, end) = self.parse_until()?;
                match end.as_deref() {
                    Some("endif") => otherwise,
                    Some(other) => return Err(self.syntax(format!("expected 'endif', found '{}'", other))),
                    None => return Err(self.syntax("unclosed 'if' block".to_string())),
                }
            }
            Some(stmt) if stmt.starts_with("elif ") => {
                let nested = self.parse_if(&stmt["elif ".len()..])?;
                vec![nested]
            }
            Some(other) => return Err(self.syntax(format!("expected 'endif', found '{}'", other))),
            None => return Err(self.syntax("unclosed 'if' block".to_string())),
        };
        Ok(Node::If { cond, then, otherwise })
    }

    fn parse_cond(&self, text: &str) -> Result<Cond, ReportError> {
        let text = text.trim();
        if let Some(path) = text.strip_suffix(" is not defined") {
            return Ok(Cond::NotDefined(self.parse_expr(path)?));
        }
        if let Some(path) = text.strip_suffix(" is defined") {
            return Ok(Cond::Defined(self.parse_expr(path)?));
        }
        if let Some(path) = text.strip_prefix("not ") {
            return Ok(Cond::Not(self.parse_expr(path)?));
        }
        Ok(Cond::Truthy(self.parse_expr(text)?))
    }

    fn parse_expr(&self, text: &str) -> Result<Expr, ReportError> {
        let mut parts = text.split('|').map(str::trim);
        let path = parts.next().unwrap_or_default();
        if !PATH_RE.is_match(path) {
            return Err(self.syntax(format!("invalid expression '{}'", text.trim())));
        }
        let filters = parts
            .map(|f| match f {
                "length" => Ok(Filter::Length),
                "upper" => Ok(Filter::Upper),
                "lower" => Ok(Filter::Lower),
                other => Err(self.syntax(format!("unknown filter '{}'", other))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expr {
            path: path.split('.').map(str::to_string).collect(),
            filters,
        })
    }

    fn syntax(&self, message: String) -> ReportError {
        ReportError::TemplateSyntax { path: self.name.to_string(), message }
    }
}
