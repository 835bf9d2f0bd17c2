//! Layout fitting — dynamic font sizing and greedy word wrapping.

use crate::font::{FontQuery, FontService, ResolvedFont};

/// Nominal size of the builtin bitmap font. Its measurements are scaled by
/// `candidate_size / BUILTIN_SCALE_BASE` so a missing system font degrades
/// layout fidelity instead of breaking it. Empirical constant, not derived.
pub const BUILTIN_SCALE_BASE: f32 = 11.0;

/// Find the largest font size in `[min_size, initial_size]` whose rendering
/// of `text` fits within `max_width` × `max_height`. Linear descending
/// search; returns `min_size` when nothing fits.
pub fn fit_size(
    fonts: &FontService,
    text: &str,
    max_width: u32,
    max_height: u32,
    initial_size: u32,
    min_size: u32,
) -> u32 {
    let mut size = initial_size.max(min_size);
    loop {
        let font = fonts.resolve(&FontQuery::sized(size));
        let (mut width, mut height) = font.measure(text);
        if font.is_builtin() {
            let scale = size as f32 / BUILTIN_SCALE_BASE;
            width = (width as f32 * scale) as u32;
            height = (height as f32 * scale) as u32;
        }
        if width <= max_width && height <= max_height {
            return size;
        }
        if size <= min_size {
            return min_size;
        }
        size -= 1;
    }
}

/// Greedy word wrap: accumulate words while the measured line stays within
/// `max_width`; a single word wider than the limit becomes its own line
/// rather than being split. Preserves word order; pure function of inputs.
pub fn wrap(text: &str, font: &ResolvedFont, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let test_line = if current.is_empty() {
            word.to_owned()
        } else {
            format!("{} {word}", current.join(" "))
        };
        let (line_width, _) = font.measure(&test_line);

        if line_width <= max_width {
            current.push(word);
        } else if current.is_empty() {
            // Over-long single word: emit alone instead of splitting.
            lines.push(word.to_owned());
        } else {
            lines.push(current.join(" "));
            current = vec![word];
        }
    }

    if !current.is_empty() {
        lines.push(current.join(" "));
    }
    lines
}
