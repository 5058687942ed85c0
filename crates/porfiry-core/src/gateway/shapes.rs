use super::CompletionError;
use serde_json::Value;

/// The response layouts the completion proxy is known to pass through,
/// depending on which upstream provider served the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"output_text": "..."}`
    DirectText,
    /// `{"choices": [{"message": {"content": "..."}}]}`
    ChoiceArray,
    /// `{"output": [{"content": [{"type": "output_text", "text": "..."}]}]}`
    StructuredOutput,
}

impl ResponseShape {
    /// Matchers in the order they are tried.
    pub const ORDERED: [ResponseShape; 3] = [
        ResponseShape::DirectText,
        ResponseShape::ChoiceArray,
        ResponseShape::StructuredOutput,
    ];

    /// Pull the generated text out of `body` if it has this shape.
    pub fn extract(self, body: &Value) -> Option<String> {
        match self {
            ResponseShape::DirectText => body
                .get("output_text")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),

            ResponseShape::ChoiceArray => body
                .get("choices")
                .and_then(Value::as_array)
                .and_then(|choices| choices.first())
                .and_then(|choice| choice.pointer("/message/content"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),

            ResponseShape::StructuredOutput => {
                let items = body.get("output").and_then(Value::as_array)?;
                let chunks: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("content").and_then(Value::as_array))
                    .flatten()
                    .filter(|part| {
                        matches!(
                            part.get("type").and_then(Value::as_str),
                            Some("output_text") | Some("text")
                        )
                    })
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .filter(|text| !text.is_empty())
                    .collect();
                if chunks.is_empty() {
                    None
                } else {
                    Some(chunks.join("\n"))
                }
            }
        }
    }
}

/// Try every known shape in order; first match wins.
pub fn extract_text(body: &Value) -> Result<(ResponseShape, String), CompletionError> {
    ResponseShape::ORDERED
        .iter()
        .find_map(|shape| shape.extract(body).map(|text| (*shape, text)))
        .ok_or(CompletionError::NoTextOutput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_text() {
        let body = json!({"output_text": "hi there", "choices": [{"message": {"content": "nope"}}]});
        let (shape, text) = extract_text(&body).unwrap();
        assert_eq!(shape, ResponseShape::DirectText);
        assert_eq!(text, "hi there");
    }

    #[test]
    fn test_empty_direct_text_falls_through() {
        let body = json!({"output_text": "", "choices": [{"message": {"content": "fallback"}}]});
        let (shape, text) = extract_text(&body).unwrap();
        assert_eq!(shape, ResponseShape::ChoiceArray);
        assert_eq!(text, "fallback");
    }

    #[test]
    fn test_chat_completion_choice() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "joke"}},
                {"index": 1, "message": {"role": "assistant", "content": "other"}}
            ]
        });
        assert_eq!(extract_text(&body).unwrap().1, "joke");
    }

    #[test]
    fn test_structured_output_joins_text_parts() {
        let body = json!({
            "output": [
                {"type": "web_search_call", "status": "completed"},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "line one"},
                    {"type": "refusal", "text": "ignored"},
                    {"type": "text", "text": "line two"},
                    {"type": "output_text", "text": ""}
                ]}
            ]
        });
        let (shape, text) = extract_text(&body).unwrap();
        assert_eq!(shape, ResponseShape::StructuredOutput);
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_no_known_shape() {
        let body = json!({"choices": [], "output": [{"content": []}]});
        assert!(matches!(
            extract_text(&body),
            Err(CompletionError::NoTextOutput)
        ));
    }

    #[test]
    fn test_non_string_content_is_not_text() {
        let body = json!({"choices": [{"message": {"content": [{"type": "text"}]}}]});
        assert!(extract_text(&body).is_err());
    }
}
