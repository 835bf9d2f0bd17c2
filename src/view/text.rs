//! Plain text card: forwards a title and message for device-side layout.

use serde::Deserialize;

use super::{
    ParamField, ParamKind, RenderOutcome, RenderResult, TextPayload, View, ViewError,
    parse_params, signature_now,
};

const SCHEMA: [ParamField; 2] = [
    ParamField { name: "title", kind: ParamKind::String, required: false },
    ParamField { name: "message", kind: ParamKind::String, required: true },
];

#[derive(Debug, Deserialize)]
struct TextParams {
    title: Option<String>,
    message: String,
}

pub struct TextView;

impl View for TextView {
    fn schema(&self) -> &'static [ParamField] {
        &SCHEMA
    }

    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
        let params: TextParams = parse_params("text", params)?;
        Ok(RenderOutcome::ok(RenderResult::Text(TextPayload {
            title: params.title,
            message: params.message,
            signature: Some(signature_now()),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_title_and_message() {
        let outcome = TextView
            .execute(serde_json::json!({"title": "Note", "message": "hello"}))
            .unwrap();
        match outcome.result {
            RenderResult::Text(payload) => {
                assert_eq!(payload.title.as_deref(), Some("Note"));
                assert_eq!(payload.message, "hello");
                assert!(payload.signature.is_some());
            }
            RenderResult::Image(_) => panic!("expected text"),
        }
    }

    #[test]
    fn title_is_optional() {
        let outcome = TextView.execute(serde_json::json!({"message": "hi"})).unwrap();
        match outcome.result {
            RenderResult::Text(payload) => assert!(payload.title.is_none()),
            RenderResult::Image(_) => panic!("expected text"),
        }
    }

    #[test]
    fn missing_message_is_invalid() {
        assert!(TextView.execute(serde_json::json!({})).is_err());
    }
}
