//! Deterministic Markdown compilation of a request.

use crate::PromptRequest;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Compiles a request into final prompt text without any backend.
pub trait Formatter: Send + Sync {
    fn format(&self, request: &PromptRequest) -> String;
}

/// Emits `### ROLE`, `### CONTEXT`, `### TASK` and `### CONSTRAINTS`
/// sections separated by blank lines. Empty role and context sections are
/// omitted; the task section is always present.
///
/// Placeholders in the task resolve against `role`, `context` and the
/// request variables; anything left becomes `[MISSING:<name>]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    fn resolve_task(&self, request: &PromptRequest) -> String {
        PLACEHOLDER
            .replace_all(&request.task, |caps: &Captures<'_>| {
                let name = &caps[1];
                match name {
                    "role" if !request.role.is_empty() => request.role.clone(),
                    "context" if !request.context.is_empty() => request.context.clone(),
                    _ => request
                        .variables
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| format!("[MISSING:{}]", name)),
                }
            })
            .into_owned()
    }
}

impl Formatter for MarkdownFormatter {
    fn format(&self, request: &PromptRequest) -> String {
        let mut blocks = Vec::with_capacity(4);

        if !request.role.is_empty() {
            blocks.push(format!("### ROLE\n{}", request.role));
        }
        if !request.context.is_empty() {
            blocks.push(format!("### CONTEXT\n{}", request.context));
        }
        blocks.push(format!("### TASK\n{}", self.resolve_task(request)));

        if !request.constraints.is_empty() {
            let items: Vec<String> = request
                .constraints
                .iter()
                .map(|c| format!("- {}", c))
                .collect();
            blocks.push(format!("### CONSTRAINTS\n{}", items.join("\n")));
        }

        blocks.join("\n\n")
    }
}
