// src/templates.rs
//
// Explanation templates are external content: the generator only knows the
// operation -> template list mapping handed to it.

use crate::error::AppError;
use crate::models::Operation;
use log::info;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const BUNDLED_TEMPLATES: &str = include_str!("data/explanations.toml");

pub const DEFAULT_EXPLANATION: &str = "The answer is {answer}.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    #[error("unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateArgs {
    pub num1: i32,
    pub num2: i32,
    pub answer: i64,
}

impl TemplateArgs {
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "num1" => Some(self.num1.to_string()),
            "num2" => Some(self.num2.to_string()),
            "answer" => Some(self.answer.to_string()),
            _ => None,
        }
    }
}

/// Replaces `{num1}`, `{num2}` and `{answer}`. `{{` and `}}` are literal
/// braces; anything else in braces is an error.
pub fn render(template: &str, args: &TemplateArgs) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut key = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    key.push(c);
                }
                if !closed {
                    return Err(TemplateError::Unclosed(pos));
                }
                let value = args
                    .lookup(key.trim())
                    .ok_or(TemplateError::UnknownPlaceholder(key))?;
                out.push_str(&value);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::UnmatchedClose(pos));
                }
            }
            _ => out.push(ch),
        }
    }
    Ok(out)
}

#[derive(Deserialize)]
struct TemplateFile {
    templates: BTreeMap<String, Vec<String>>,
}

/// Non-empty, ordered template lists for every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationCatalog {
    templates: BTreeMap<Operation, Vec<String>>,
}

impl ExplanationCatalog {
    /// Accepts any template text; every operation needs at least one entry.
    pub fn new(templates: BTreeMap<Operation, Vec<String>>) -> Result<Self, AppError> {
        for op in Operation::ALL {
            if templates.get(&op).map_or(true, |list| list.is_empty()) {
                return Err(AppError::MissingTemplates(op));
            }
        }
        Ok(ExplanationCatalog { templates })
    }

    /// Parses and validates a template file: unknown operation keys and
    /// templates that fail to render are rejected up front.
    pub fn from_toml_str(s: &str) -> Result<Self, AppError> {
        let file: TemplateFile = toml::from_str(s)?;
        let mut templates = BTreeMap::new();
        for (name, list) in file.templates {
            let op = Operation::from_str(&name)?;
            let probe = TemplateArgs { num1: 1, num2: 1, answer: 1 };
            for tpl in &list {
                render(tpl, &probe)
                    .map_err(|e| AppError::Template(format!("{} template {:?}: {}", op, tpl, e)))?;
            }
            templates.insert(op, list);
        }
        Self::new(templates)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&raw)?;
        info!("Loaded explanation templates from {:?}", path);
        Ok(catalog)
    }

    /// The template set shipped with the crate.
    pub fn bundled() -> Result<Self, AppError> {
        Self::from_toml_str(BUNDLED_TEMPLATES)
    }

    pub fn templates_for(&self, op: Operation) -> &[String] {
        self.templates.get(&op).map(Vec::as_slice).unwrap_or(&[])
    }
}
