//! Instruction text sent to the vision model, and the response shape it must follow.

use serde_json::{json, Value};

use crate::language::Language;

const BASE_INSTRUCTION: &str = "What text is shown on screen? Are there any spelling errors?";

const HINGLISH_NOTE: &str = "This video uses Hinglish, Hindi words written in Roman/English script. \
Words like 'kya', 'hai', 'nahi', 'bhai', 'yaar', 'aur', 'bhi', 'toh', 'matlab' \
are correctly spelled Hinglish and must NOT be flagged as errors.";

/// The user instruction for one frame in the given language mode.
pub fn instruction(language: Language) -> String {
    match language {
        Language::En => BASE_INSTRUCTION.to_string(),
        Language::HiLatin => format!("{} {}", BASE_INSTRUCTION, HINGLISH_NOTE),
    }
}

/// JSON schema handed to the model as its structured output format.
pub fn response_format() -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": { "type": ["string", "null"] },
            "errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "word": { "type": "string" },
                        "suggestion": { "type": "string" },
                        "context": { "type": "string" }
                    },
                    "required": ["word", "suggestion"]
                }
            }
        },
        "required": ["text", "errors"]
    })
}
