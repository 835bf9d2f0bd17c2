//! Title card: one or two titles, size-fitted, wrapped and centered.

use std::sync::Arc;

use serde::Deserialize;

use super::{
    DisplayHints, HINT_FIELDS, ImagePayload, ParamField, ParamKind, RenderOutcome, RenderResult,
    View, ViewError, encode_png, parse_params,
};
use crate::canvas::{self, Canvas};
use crate::font::{FontQuery, FontService, ResolvedFont};
use crate::layout;

const SCHEMA: [ParamField; 6] = [
    ParamField { name: "main_title", kind: ParamKind::String, required: true },
    ParamField { name: "sub_title", kind: ParamKind::String, required: false },
    HINT_FIELDS[0],
    HINT_FIELDS[1],
    HINT_FIELDS[2],
    HINT_FIELDS[3],
];

/// Titles may use at most two thirds of the canvas width.
const MAX_TEXT_WIDTH: u32 = canvas::WIDTH * 2 / 3;
/// Vertical padding reserved above and below the text block.
const VERTICAL_PADDING: u32 = 20;
/// Gap between the main and sub title blocks.
const BLOCK_GAP: i32 = 15;
const MIN_TOP: i32 = 10;

#[derive(Debug, Deserialize)]
struct TitleCardParams {
    main_title: String,
    sub_title: Option<String>,
    #[serde(flatten)]
    hints: DisplayHints,
}

pub struct TitleCardView {
    fonts: Arc<FontService>,
}

impl TitleCardView {
    pub fn new(fonts: Arc<FontService>) -> Self {
        Self { fonts }
    }

    fn render(&self, main_title: &str, sub_title: Option<&str>) -> Result<Vec<u8>, ViewError> {
        let mut canvas = Canvas::new();
        let available_height = canvas::HEIGHT - VERTICAL_PADDING;

        let blocks: Vec<TitleBlock> = match sub_title {
            Some(sub) => {
                let main_alloc = (available_height as f32 * 0.6) as u32;
                let sub_alloc = (available_height as f32 * 0.4) as u32;
                vec![
                    self.fit_block(main_title, main_alloc, 42),
                    self.fit_block(sub, sub_alloc, 32),
                ]
            }
            None => vec![self.fit_block(main_title, available_height, 48)],
        };

        let total_height: i32 = blocks.iter().map(TitleBlock::height).sum::<i32>()
            + BLOCK_GAP * (blocks.len() as i32 - 1);
        let start_y = ((canvas::HEIGHT as i32 - total_height) / 2).max(MIN_TOP);

        let mut y = start_y;
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                y += BLOCK_GAP;
            }
            let offsets = bold_offsets(&block.font, block.size);
            for line in &block.lines {
                let (line_width, _) = block.font.measure(line);
                let x = (canvas::WIDTH.saturating_sub(line_width) / 2) as i32;
                canvas.draw_text_offsets(&block.font, x, y, line, offsets);
                y += block.line_height;
            }
        }

        encode_png(&canvas)
    }

    fn fit_block(&self, text: &str, max_height: u32, initial_size: u32) -> TitleBlock {
        let size = layout::fit_size(&self.fonts, text, MAX_TEXT_WIDTH, max_height, initial_size, 16);
        let font = self.fonts.resolve(&FontQuery::sized(size));
        let lines = layout::wrap(text, &font, MAX_TEXT_WIDTH);
        let line_height = (font.line_height() as f32 * 1.2) as i32;
        TitleBlock { font, size, lines, line_height }
    }
}

struct TitleBlock {
    font: ResolvedFont,
    size: u32,
    lines: Vec<String>,
    line_height: i32,
}

impl TitleBlock {
    fn height(&self) -> i32 {
        self.lines.len() as i32 * self.line_height
    }
}

/// The builtin font has no weight variants; redrawing at small offsets
/// thickens glyphs so large nominal sizes still read as headlines.
fn bold_offsets(font: &ResolvedFont, size: u32) -> &'static [(i32, i32)] {
    if !font.is_builtin() {
        return &[(0, 0)];
    }
    if size >= 32 {
        &[(0, 0), (1, 0), (0, 1), (1, 1)]
    } else if size >= 24 {
        &[(0, 0), (1, 0)]
    } else {
        &[(0, 0)]
    }
}

impl View for TitleCardView {
    fn schema(&self) -> &'static [ParamField] {
        &SCHEMA
    }

    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
        let params: TitleCardParams = parse_params("title_image", params)?;
        let png = self.render(&params.main_title, params.sub_title.as_deref())?;
        Ok(RenderOutcome::ok(RenderResult::Image(ImagePayload { png, hints: params.hints })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn view() -> TitleCardView {
        TitleCardView::new(Arc::new(FontService::with_search_paths(
            PathBuf::from("/nonexistent"),
            Vec::new(),
        )))
    }

    fn png_of(outcome: RenderOutcome) -> Vec<u8> {
        match outcome.result {
            RenderResult::Image(payload) => payload.png,
            RenderResult::Text(_) => panic!("expected image"),
        }
    }

    #[test]
    fn single_title_renders_fixed_size_png() {
        let outcome = view().execute(serde_json::json!({"main_title": "Hello"})).unwrap();
        assert!(outcome.degraded.is_none());
        let decoded = image::load_from_memory(&png_of(outcome)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (canvas::WIDTH, canvas::HEIGHT));
    }

    #[test]
    fn two_titles_render_and_differ_from_one() {
        let v = view();
        let one = png_of(v.execute(serde_json::json!({"main_title": "Deploy"})).unwrap());
        let two = png_of(
            v.execute(serde_json::json!({"main_title": "Deploy", "sub_title": "v2.1 shipped"}))
                .unwrap(),
        );
        assert_ne!(one, two);
    }

    #[test]
    fn long_titles_wrap_instead_of_failing() {
        let outcome = view()
            .execute(serde_json::json!({
                "main_title": "a rather long headline that cannot possibly fit on one line",
                "sub_title": "and an equally verbose subtitle underneath it",
            }))
            .unwrap();
        let png = png_of(outcome);
        assert!(image::load_from_memory(&png).is_ok());
    }

    #[test]
    fn missing_main_title_is_invalid() {
        let err = view().execute(serde_json::json!({"sub_title": "only"})).unwrap_err();
        assert!(matches!(err, ViewError::InvalidParams { scenario: "title_image", .. }));
    }

    #[test]
    fn builtin_bold_offsets_scale_with_size() {
        let fonts = FontService::with_search_paths(PathBuf::from("/nonexistent"), Vec::new());
        let font = fonts.resolve(&FontQuery::sized(16));
        assert_eq!(bold_offsets(&font, 40).len(), 4);
        assert_eq!(bold_offsets(&font, 24).len(), 2);
        assert_eq!(bold_offsets(&font, 16).len(), 1);
    }
}
