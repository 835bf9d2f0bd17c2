//! Coding-status card: today's tracked time and top languages from a
//! WakaTime-compatible status-bar endpoint.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use super::{
    DisplayHints, HINT_FIELDS, ImagePayload, ParamField, ParamKind, RenderOutcome, RenderResult,
    View, ViewError, encode_png, format_duration, parse_params, signature_now,
};
use crate::canvas::{self, Canvas};
use crate::font::{FontQuery, FontService, ResolvedFont};

const SCHEMA: [ParamField; 6] = [
    ParamField { name: "api_key", kind: ParamKind::String, required: true },
    ParamField { name: "api_url", kind: ParamKind::String, required: false },
    HINT_FIELDS[0],
    HINT_FIELDS[1],
    HINT_FIELDS[2],
    HINT_FIELDS[3],
];

const DEFAULT_API_URL: &str = "https://wakatime.com/api/v1/users/current/status_bar/today";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const TOP_LANGUAGES: usize = 3;

#[derive(Debug, Deserialize)]
struct CodeStatusParams {
    api_key: String,
    api_url: Option<String>,
    #[serde(flatten)]
    hints: DisplayHints,
}

#[derive(Debug, Default, Deserialize)]
struct StatusBarResponse {
    #[serde(default)]
    data: StatusBarData,
}

#[derive(Debug, Default, Deserialize)]
struct StatusBarData {
    #[serde(default)]
    grand_total: GrandTotal,
    #[serde(default)]
    languages: Vec<Language>,
}

#[derive(Debug, Default, Deserialize)]
struct GrandTotal {
    #[serde(default)]
    total_seconds: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Language {
    name: String,
    #[serde(default)]
    total_seconds: f64,
}

/// The fetched data reduced to what the card shows.
#[derive(Debug, Default)]
struct CodingDay {
    total_seconds: u64,
    /// Ranked (name, seconds), already capped to the display count.
    languages: Vec<(String, u64)>,
}

impl From<StatusBarResponse> for CodingDay {
    fn from(response: StatusBarResponse) -> Self {
        let mut languages: Vec<(String, u64)> = response
            .data
            .languages
            .into_iter()
            .map(|l| (l.name, l.total_seconds as u64))
            .filter(|(_, secs)| *secs > 0)
            .collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1));
        languages.truncate(TOP_LANGUAGES);
        Self { total_seconds: response.data.grand_total.total_seconds as u64, languages }
    }
}

pub struct CodeStatusView {
    fonts: Arc<FontService>,
}

impl CodeStatusView {
    pub fn new(fonts: Arc<FontService>) -> Self {
        Self { fonts }
    }

    fn fetch(&self, params: &CodeStatusParams) -> Result<CodingDay, String> {
        let url = params.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| err.to_string())?;
        // WakaTime expects the api key base64-wrapped as a Basic credential.
        let response = client
            .get(url)
            .header("Authorization", format!("Basic {}", BASE64.encode(&params.api_key)))
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| err.to_string())?;
        let parsed: StatusBarResponse = response.json().map_err(|err| err.to_string())?;
        Ok(parsed.into())
    }

    fn render(&self, day: &CodingDay) -> Result<Vec<u8>, ViewError> {
        let mut canvas = Canvas::new();

        let title_font = self.fonts.resolve(&FontQuery::sized(18));
        let total_font = self.fonts.resolve(&FontQuery::sized(20));
        let name_font = self.fonts.resolve(&FontQuery::sized(14));
        let time_font = self.fonts.resolve(&FontQuery::sized(12));
        let stamp_font = self.fonts.resolve(&FontQuery::sized(10));

        // Assemble the centered block: title, total, then a content/compact
        // line pair per language.
        let mut lines: Vec<(ResolvedFont, String)> = vec![
            (title_font, "Code Status".to_owned()),
        ];
        if day.total_seconds == 0 {
            lines.push((total_font, "No time tracked yet".to_owned()));
        } else {
            lines.push((total_font, format!("Today: {}", format_duration(day.total_seconds))));
            for (name, seconds) in &day.languages {
                lines.push((name_font.clone(), name.clone()));
                lines.push((time_font.clone(), format_duration(*seconds)));
            }
        }

        let block_height: i32 = lines.iter().map(|(font, _)| font.line_height() as i32 + 2).sum();
        let mut y = ((canvas::HEIGHT as i32 - block_height) / 2).max(6);
        for (font, text) in &lines {
            canvas.draw_text_centered(font, y, text);
            y += font.line_height() as i32 + 2;
        }

        let stamp = signature_now();
        let (stamp_width, stamp_height) = stamp_font.measure(&stamp);
        canvas.draw_text(
            &stamp_font,
            canvas::WIDTH as i32 - stamp_width as i32 - 6,
            canvas::HEIGHT as i32 - stamp_height as i32 - 4,
            &stamp,
        );

        encode_png(&canvas)
    }
}

impl View for CodeStatusView {
    fn schema(&self) -> &'static [ParamField] {
        &SCHEMA
    }

    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
        let params: CodeStatusParams = parse_params("code_status", params)?;

        let (day, degraded) = match self.fetch(&params) {
            Ok(day) => (day, None),
            Err(reason) => {
                log::warn!("code_status: fetch failed, rendering zeroed data: {reason}");
                (CodingDay::default(), Some(reason))
            }
        };

        let png = self.render(&day)?;
        let result = RenderResult::Image(ImagePayload { png, hints: params.hints });
        Ok(match degraded {
            Some(reason) => RenderOutcome::degraded(result, reason),
            None => RenderOutcome::ok(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn view() -> CodeStatusView {
        CodeStatusView::new(Arc::new(FontService::with_search_paths(
            PathBuf::from("/nonexistent"),
            Vec::new(),
        )))
    }

    #[test]
    fn zero_data_renders_valid_card() {
        let png = view().render(&CodingDay::default()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (canvas::WIDTH, canvas::HEIGHT));
    }

    #[test]
    fn languages_are_ranked_and_capped() {
        let response: StatusBarResponse = serde_json::from_value(serde_json::json!({
            "data": {
                "grand_total": { "total_seconds": 9000.0 },
                "languages": [
                    { "name": "TOML", "total_seconds": 60.0 },
                    { "name": "Rust", "total_seconds": 7200.0 },
                    { "name": "Markdown", "total_seconds": 0.0 },
                    { "name": "Shell", "total_seconds": 900.0 },
                    { "name": "Python", "total_seconds": 840.0 },
                ]
            }
        }))
        .unwrap();
        let day: CodingDay = response.into();
        assert_eq!(day.total_seconds, 9000);
        let names: Vec<&str> = day.languages.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Rust", "Shell", "Python"]);
    }

    #[test]
    fn tracked_day_renders() {
        let day = CodingDay {
            total_seconds: 13_380,
            languages: vec![("Rust".to_owned(), 9_000), ("TOML".to_owned(), 600)],
        };
        let png = view().render(&day).unwrap();
        assert!(image::load_from_memory(&png).is_ok());
    }

    #[test]
    fn unreachable_endpoint_degrades() {
        let outcome = view()
            .execute(serde_json::json!({
                "api_key": "waka_secret",
                "api_url": "http://127.0.0.1:1",
            }))
            .unwrap();
        assert!(outcome.degraded.is_some());
        assert!(outcome.result.png().is_some());
    }
}
