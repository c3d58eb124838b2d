//! The forced `select_choice` tool used by model-graded classifiers.

use autoevals_core::ToolDefinition;
use serde_json::{Value, json};

pub const SELECT_CHOICE_TOOL: &str = "select_choice";

pub const NO_COT_SUFFIX: &str =
    "Answer the question by calling `select_choice` with a single choice from {{__choices}}.";

pub const COT_SUFFIX: &str = "Answer the question by calling `select_choice` with your reasoning in \
a step-by-step matter to be sure that your conclusion is correct. Avoid simply stating the correct \
answer at the outset. Select a single choice by setting the `choice` parameter to a single choice \
from {{__choices}}.";

const REASONS_DESCRIPTION: &str = "Write out in a step by step manner your reasoning to be sure \
that your conclusion is correct. Avoid simply stating the correct answer at the outset.";

/// Prompt suffix instructing the model how to answer.
pub fn suffix(use_cot: bool) -> &'static str {
    if use_cot { COT_SUFFIX } else { NO_COT_SUFFIX }
}

/// JSON schema of the `select_choice` arguments, with `choice` restricted to
/// `choices` when any are given.
pub fn response_schema(use_cot: bool, choices: &[String]) -> Value {
    let mut choice = json!({"title": "Choice", "description": "The choice", "type": "string"});
    if !choices.is_empty() {
        choice["enum"] = json!(choices);
    }

    if use_cot {
        json!({
            "title": "CoTResponse",
            "type": "object",
            "properties": {
                "reasons": {
                    "title": "Reasons",
                    "description": REASONS_DESCRIPTION,
                    "type": "string"
                },
                "choice": choice
            },
            "required": ["reasons", "choice"]
        })
    } else {
        json!({
            "title": "FunctionResponse",
            "type": "object",
            "properties": {"choice": choice},
            "required": ["choice"]
        })
    }
}

pub fn build_classification_tools(use_cot: bool, choices: &[String]) -> Vec<ToolDefinition> {
    vec![ToolDefinition::function(
        SELECT_CHOICE_TOOL,
        "Call this function to select a choice.",
        response_schema(use_cot, choices),
    )]
}
