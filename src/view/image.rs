//! Raw image passthrough: pre-encoded bytes forwarded without rendering.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use super::{
    DisplayHints, HINT_FIELDS, ImagePayload, ParamField, ParamKind, RenderOutcome, RenderResult,
    View, ViewError, parse_params,
};

const SCHEMA: [ParamField; 5] = [
    ParamField { name: "image_data", kind: ParamKind::Base64, required: true },
    HINT_FIELDS[0],
    HINT_FIELDS[1],
    HINT_FIELDS[2],
    HINT_FIELDS[3],
];

#[derive(Debug, Deserialize)]
struct ImageParams {
    image_data: String,
    #[serde(flatten)]
    hints: DisplayHints,
}

pub struct RawImageView;

impl View for RawImageView {
    fn schema(&self) -> &'static [ParamField] {
        &SCHEMA
    }

    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
        let params: ImageParams = parse_params("image", params)?;
        let png = BASE64.decode(&params.image_data).map_err(|err| ViewError::InvalidParams {
            scenario: "image",
            message: format!("image_data is not valid base64: {err}"),
        })?;
        Ok(RenderOutcome::ok(RenderResult::Image(ImagePayload { png, hints: params.hints })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pass_through_unchanged() {
        let original: Vec<u8> = (0u8..=255).collect();
        let outcome = RawImageView
            .execute(serde_json::json!({"image_data": BASE64.encode(&original)}))
            .unwrap();
        match outcome.result {
            RenderResult::Image(payload) => assert_eq!(payload.png, original),
            RenderResult::Text(_) => panic!("expected image"),
        }
    }

    #[test]
    fn hints_are_forwarded() {
        let outcome = RawImageView
            .execute(serde_json::json!({
                "image_data": BASE64.encode(b"png"),
                "link": "https://example.com",
                "border": 2,
                "dither_type": "NONE",
            }))
            .unwrap();
        match outcome.result {
            RenderResult::Image(payload) => {
                assert_eq!(payload.hints.link.as_deref(), Some("https://example.com"));
                assert_eq!(payload.hints.border, Some(2));
            }
            RenderResult::Text(_) => panic!("expected image"),
        }
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err =
            RawImageView.execute(serde_json::json!({"image_data": "$$$not base64$$$"})).unwrap_err();
        assert!(matches!(err, ViewError::InvalidParams { scenario: "image", .. }));
    }
}
