//! Meta-prompts sent to the backends.

use promptc_core::PromptRequest;

/// System instruction shared by chat-style backends.
pub(crate) const SYSTEM_INSTRUCTION: &str = "You are the promptc compilation engine. \
Turn rough prompt drafts into deterministic, professional system prompts. \
Return only the final prompt, with no introduction or commentary. \
Structure it with ### ROLE, ### CONTEXT, ### TASK and ### CONSTRAINTS headers.";

/// The user-facing request: what to fix and the draft itself.
pub(crate) fn optimization_request(request: &PromptRequest, issues: &[String]) -> String {
    let mut out = String::new();

    if issues.is_empty() {
        out.push_str("Optimise the following prompt.\n\n");
    } else {
        out.push_str(&format!(
            "Optimise the following prompt, fixing: {}.\n\n",
            issues.join(", ")
        ));
    }

    out.push_str("### ORIGINAL PROMPT\n");
    out.push_str(&format!("ROLE: {}\n", request.role));
    out.push_str(&format!("CONTEXT: {}\n", request.context));
    out.push_str(&format!("TASK: {}\n", request.task));

    if !request.constraints.is_empty() {
        out.push_str("CONSTRAINTS:\n");
        for constraint in &request.constraints {
            out.push_str(&format!("- {}\n", constraint));
        }
    }

    if !request.variables.is_empty() {
        out.push_str("VARIABLES:\n");
        for (name, value) in &request.variables {
            out.push_str(&format!("- {} = {}\n", name, value));
        }
    }

    out
}

/// Single-string form for completion-style backends.
pub(crate) fn completion_prompt(request: &PromptRequest, issues: &[String]) -> String {
    format!(
        "{}\n\n{}\n### RULE\nAnswer with the optimised prompt only.",
        SYSTEM_INSTRUCTION,
        optimization_request(request, issues)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_lists_issues_and_fields() {
        let mut req = PromptRequest::with_task("Summarise {{doc}}");
        req.role = "Analyst".into();
        req.constraints = vec!["no jargon".into()];
        req.variables.insert("doc".into(), "Q3".into());

        let text = optimization_request(&req, &["missing context".into(), "weak task".into()]);
        assert!(
            text.starts_with("Optimise the following prompt, fixing: missing context, weak task.")
        );
        assert!(text.contains("ROLE: Analyst\n"));
        assert!(text.contains("TASK: Summarise {{doc}}\n"));
        assert!(text.contains("- no jargon\n"));
        assert!(text.contains("- doc = Q3\n"));
    }

    #[test]
    fn test_completion_prompt_ends_with_rule() {
        let text = completion_prompt(&PromptRequest::with_task("t"), &[]);
        assert!(text.starts_with("You are the promptc compilation engine."));
        assert!(text.ends_with("Answer with the optimised prompt only."));
    }
}
