//! Prompt-based tool calling
//!
//! For models without native function calling, tool definitions are
//! described in the system prompt and the model answers with
//! `[TOOL_CALL: {"name": "...", "arguments": {...}}]` markers.

use serde_json::Value;

use lead_agent_core::{ToolCall, ToolDefinition};

const TOOL_CALL_MARKER: &str = "[TOOL_CALL:";

/// Describe tools for the system prompt
pub fn tool_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::from(
        r#"## Available Tools

When you need a tool, output a tool call in this EXACT format and nothing else:

[TOOL_CALL: {"name": "tool_name", "arguments": {"param1": "value1"}}]

After the tool runs, you will receive the result to incorporate into your response.

Available tools:
"#,
    );

    for tool in tools {
        prompt.push_str(&format!("\n### {}\n{}\n", tool.name, tool.description));

        let Some(props) = tool.parameters.get("properties").and_then(|p| p.as_object()) else {
            continue;
        };
        if props.is_empty() {
            continue;
        }
        let required: Vec<&str> = tool
            .parameters
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        prompt.push_str("Parameters:\n");
        for (name, schema) in props {
            let description = schema.get("description").and_then(|d| d.as_str()).unwrap_or("");
            let param_type = schema.get("type").and_then(|t| t.as_str()).unwrap_or("string");
            let marker = if required.contains(&name.as_str()) {
                " (required)"
            } else {
                ""
            };
            prompt.push_str(&format!("- {} ({}){}: {}\n", name, param_type, marker, description));
        }
    }

    prompt
}

/// Byte length of the JSON object starting at `text[0] == '{'`
fn json_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Pull `[TOOL_CALL: ...]` markers out of model text.
///
/// Returns the text with well-formed markers removed, and the calls in
/// order. Malformed markers are left in the text.
pub fn parse_tool_calls(text: &str) -> (String, Vec<ToolCall>) {
    let mut calls = Vec::new();
    let mut remaining = String::new();
    let mut rest = text;

    while let Some(start) = rest.find(TOOL_CALL_MARKER) {
        let after_marker = &rest[start + TOOL_CALL_MARKER.len()..];
        let body = after_marker.trim_start();
        let skipped = after_marker.len() - body.len();

        let parsed = body
            .starts_with('{')
            .then(|| json_object_len(body))
            .flatten()
            .and_then(|len| {
                let tail = body[len..].trim_start();
                if !tail.starts_with(']') {
                    return None;
                }
                let value: Value = serde_json::from_str(&body[..len]).ok()?;
                let name = value.get("name")?.as_str()?.to_string();
                let arguments = value
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                let consumed = TOOL_CALL_MARKER.len() + skipped + len + (body[len..].len() - tail.len()) + 1;
                Some((ToolCall::new(name, arguments), consumed))
            });

        match parsed {
            Some((call, consumed)) => {
                remaining.push_str(&rest[..start]);
                calls.push(call);
                rest = &rest[start + consumed..];
            }
            None => {
                let keep = start + TOOL_CALL_MARKER.len();
                remaining.push_str(&rest[..keep]);
                rest = &rest[keep..];
            }
        }
    }
    remaining.push_str(rest);

    (remaining.trim().to_string(), calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_call() {
        let (text, calls) = parse_tool_calls(
            r#"Let me check. [TOOL_CALL: {"name": "check_service_area", "arguments": {"city": "Boston"}}]"#,
        );
        assert_eq!(text, "Let me check.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "check_service_area");
        assert_eq!(calls[0].get_string("city"), Some("Boston"));
    }

    #[test]
    fn test_parse_nested_arrays_and_brackets_in_strings() {
        let (text, calls) = parse_tool_calls(
            r#"[TOOL_CALL: {"name": "find_restaurant_partners", "arguments": {"city": "NYC [Manhattan]", "cuisine_type": ["Italian", "Thai"]}}] then [TOOL_CALL: {"name": "get_business_rules"}]"#,
        );
        assert_eq!(text, "then");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments["cuisine_type"], json!(["Italian", "Thai"]));
        assert_eq!(calls[0].get_string("city"), Some("NYC [Manhattan]"));
        assert_eq!(calls[1].name, "get_business_rules");
        assert!(calls[1].arguments.is_empty());
    }

    #[test]
    fn test_malformed_marker_left_in_text() {
        let (text, calls) = parse_tool_calls("Hmm [TOOL_CALL: {\"name\": oops}] ok");
        assert!(calls.is_empty());
        assert_eq!(text, "Hmm [TOOL_CALL: {\"name\": oops}] ok");

        let (text, calls) = parse_tool_calls("No tools here.");
        assert!(calls.is_empty());
        assert_eq!(text, "No tools here.");
    }

    #[test]
    fn test_tool_prompt_lists_parameters() {
        let tools = vec![ToolDefinition::new(
            "check_service_area",
            "Check a city",
            json!({
                "type": "object",
                "properties": {"city": {"type": "string", "description": "City name"}},
                "required": ["city"]
            }),
        )];
        let prompt = tool_prompt(&tools);
        assert!(prompt.contains("### check_service_area"));
        assert!(prompt.contains("- city (string) (required): City name"));
    }
}
