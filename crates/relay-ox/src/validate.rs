use serde_json::Value;

use crate::error::{AskError, ValidationError};

/// A question about one image, checked and ready to send upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    pub image_url: String,
}

/// Parses and checks an ask body.
///
/// The question is checked first, so a body missing both fields reports the
/// question. A field that is present but not a string counts as missing. A
/// body that is not JSON, or not a JSON object, is a processing error rather
/// than a validation error.
pub fn parse_ask(body: &[u8]) -> Result<AskRequest, AskError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| AskError::MalformedBody(e.to_string()))?;

    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(AskError::MalformedBody(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            )));
        }
    };

    let question = match fields.get("question") {
        Some(Value::String(q)) if !q.trim().is_empty() => q.clone(),
        _ => return Err(ValidationError::MissingQuestion.into()),
    };

    let image_url = match fields.get("imageUrl") {
        Some(Value::String(url)) if !url.is_empty() => url.clone(),
        _ => return Err(ValidationError::MissingImage.into()),
    };

    Ok(AskRequest {
        question,
        image_url,
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(body: &str) -> Option<ValidationError> {
        match parse_ask(body.as_bytes()) {
            Err(AskError::Validation(err)) => Some(err),
            _ => None,
        }
    }

    #[test]
    fn valid_body_parses() {
        let ask = parse_ask(br#"{"question":"What is this?","imageUrl":"https://example.com/a.jpg"}"#)
            .unwrap();
        assert_eq!(ask.question, "What is this?");
        assert_eq!(ask.image_url, "https://example.com/a.jpg");
    }

    #[test]
    fn question_missing_empty_or_blank() {
        for body in [
            r#"{"imageUrl":"https://example.com/a.jpg"}"#,
            r#"{"question":"","imageUrl":"https://example.com/a.jpg"}"#,
            r#"{"question":"  \n\t ","imageUrl":"https://example.com/a.jpg"}"#,
            r#"{"question":42,"imageUrl":"https://example.com/a.jpg"}"#,
            r#"{"question":null,"imageUrl":"https://example.com/a.jpg"}"#,
        ] {
            assert_eq!(validation(body), Some(ValidationError::MissingQuestion), "{body}");
        }
    }

    #[test]
    fn question_is_reported_before_image() {
        assert_eq!(validation("{}"), Some(ValidationError::MissingQuestion));
        assert_eq!(
            validation(r#"{"question":" ","imageUrl":""}"#),
            Some(ValidationError::MissingQuestion)
        );
    }

    #[test]
    fn image_missing_or_empty() {
        for body in [
            r#"{"question":"What is this?"}"#,
            r#"{"question":"What is this?","imageUrl":""}"#,
            r#"{"question":"What is this?","imageUrl":["x"]}"#,
        ] {
            assert_eq!(validation(body), Some(ValidationError::MissingImage), "{body}");
        }
    }

    #[test]
    fn non_json_and_non_object_bodies_are_malformed() {
        for body in ["not json", "", "[1,2]", "\"question\"", "null"] {
            assert!(
                matches!(parse_ask(body.as_bytes()), Err(AskError::MalformedBody(_))),
                "{body:?}"
            );
        }
    }
}
