//! Sensitive data masking.
//!
//! Applied to every field of a request before it is compiled or sent to a
//! backend, so personal data never leaves the agent.

use crate::PromptRequest;
use regex::Regex;
use std::sync::LazyLock;

/// Result of masking one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Masked {
    pub text: String,
    /// Names of the rules that matched, in rule order.
    pub detected: Vec<&'static str>,
}

/// Replaces sensitive values in free text.
pub trait Masker: Send + Sync {
    fn mask(&self, text: &str) -> Masked;
}

struct Rule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

fn rule(name: &'static str, pattern: &str, replacement: &'static str) -> Rule {
    Rule {
        name,
        pattern: Regex::new(pattern).expect("masking pattern is valid"),
        replacement,
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(
            "RUT",
            r"(?i)\b\d{1,2}(?:\.?\d{3}){2}-?[\dk]\b",
            "[RUT_HIDDEN]",
        ),
        rule(
            "EMAIL",
            r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b",
            "[EMAIL_HIDDEN]",
        ),
        rule("CREDIT_CARD", r"\b(?:\d[ -]*?){13,16}\b", "[CARD_HIDDEN]"),
        rule(
            "IP_ADDRESS",
            r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b",
            "[IP_HIDDEN]",
        ),
    ]
});

/// National ids (RUT), e-mail addresses, card numbers and IPv4 addresses.
///
/// Rules run in that order, each over the output of the previous one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMasker;

impl Masker for RegexMasker {
    fn mask(&self, text: &str) -> Masked {
        let mut out = text.to_string();
        let mut detected = Vec::new();

        for rule in RULES.iter() {
            if rule.pattern.is_match(&out) {
                out = rule
                    .pattern
                    .replace_all(&out, rule.replacement)
                    .into_owned();
                detected.push(rule.name);
            }
        }

        Masked {
            text: out,
            detected,
        }
    }
}

/// Mask role, context, task, constraints and variable values.
///
/// Returns the masked copy and the distinct rule names that fired.
pub fn mask_request(
    masker: &dyn Masker,
    request: &PromptRequest,
) -> (PromptRequest, Vec<String>) {
    let mut detected: Vec<String> = Vec::new();
    let mut apply = |text: &str| {
        let masked = masker.mask(text);
        for name in masked.detected {
            if !detected.iter().any(|d| d == name) {
                detected.push(name.to_string());
            }
        }
        masked.text
    };

    let masked = PromptRequest {
        role: apply(&request.role),
        context: apply(&request.context),
        task: apply(&request.task),
        constraints: request.constraints.iter().map(|c| apply(c)).collect(),
        variables: request
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), apply(value)))
            .collect(),
        template_name: request.template_name.clone(),
    };

    (masked, detected)
}
