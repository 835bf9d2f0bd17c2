//! Font resolution — discovery, fallback chain, and the per-process cache.
//!
//! `FontService::resolve` never fails: every query degrades through the
//! fallback chain until something loads, bottoming out at the built-in
//! bitmap font.

pub mod builtin;
mod discovery;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

pub use discovery::FontCatalog;

/// The preferred bundled font file, tried before any system scan.
const BEST_BUNDLED_FONT: &str = "SourceHanSansSC-VF.otf";

/// Filenames tried directly against every search root as a late fallback,
/// catching fonts a font manager installed under a predictable name.
const WELL_KNOWN_NAMES: &[&str] = &[
    "SourceHanSansSC-Regular.ttf",
    "SourceHanSansSC-Normal.ttf",
    "SourceHanSansSC.ttf",
    "SourceHanSansHC-Regular.ttf",
    "NotoSansCJKsc-Regular.ttf",
    "NotoSansCJK-Regular.ttc",
    "arial.ttf",
    "helvetica.ttf",
    "times.ttf",
];

/// A font request. Immutable; the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontQuery {
    /// Pixel size, > 0.
    pub size: u32,
    /// Optional family/file stem preference.
    pub name: Option<String>,
    /// Optional weight in [100, 900].
    pub weight: Option<u16>,
}

impl FontQuery {
    /// A plain query at the given size.
    pub fn sized(size: u32) -> Self {
        Self { size, name: None, weight: None }
    }

    pub fn named(size: u32, name: &str) -> Self {
        Self { size, name: Some(name.to_owned()), weight: None }
    }
}

#[derive(Clone)]
enum Face {
    Scalable(Arc<fontdue::Font>),
    Builtin,
}

/// A loaded, sized font handle. Cheap to clone; never mutated after creation.
#[derive(Clone)]
pub struct ResolvedFont {
    face: Face,
    size: u32,
    weight: Option<u16>,
}

impl ResolvedFont {
    fn scalable(font: Arc<fontdue::Font>, size: u32, weight: Option<u16>) -> Self {
        Self { face: Face::Scalable(font), size, weight }
    }

    fn fallback(size: u32, weight: Option<u16>) -> Self {
        Self { face: Face::Builtin, size, weight }
    }

    /// Whether this handle is the built-in bitmap fallback.
    pub fn is_builtin(&self) -> bool {
        matches!(self.face, Face::Builtin)
    }

    /// Requested pixel size. The builtin face cannot actually scale to it.
    pub fn px(&self) -> f32 {
        self.size as f32
    }

    /// Requested weight, when the query carried one. fontdue exposes no
    /// variable-axis API, so this only drives synthetic-bold drawing.
    pub fn weight(&self) -> Option<u16> {
        self.weight
    }

    pub(crate) fn raster(&self) -> Option<&fontdue::Font> {
        match &self.face {
            Face::Scalable(f) => Some(f),
            Face::Builtin => None,
        }
    }

    /// Measure a single line of text: (width, height) in pixels.
    ///
    /// Builtin measurements are size-independent; `layout::fit_size` scales
    /// them to approximate a scalable font.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match &self.face {
            Face::Scalable(font) => {
                let mut width = 0.0f32;
                for ch in text.chars() {
                    width += font.metrics(ch, self.px()).advance_width;
                }
                (width.ceil() as u32, self.line_height())
            }
            Face::Builtin => builtin::measure(text),
        }
    }

    /// Height of one text line at this size.
    pub fn line_height(&self) -> u32 {
        match &self.face {
            Face::Scalable(font) => font
                .horizontal_line_metrics(self.px())
                .map_or(self.size, |lm| (lm.ascent - lm.descent).ceil() as u32),
            Face::Builtin => builtin::LINE_HEIGHT,
        }
    }

    /// Baseline offset from the top of a line box.
    pub(crate) fn ascent(&self) -> i32 {
        match &self.face {
            Face::Scalable(font) => font
                .horizontal_line_metrics(self.px())
                .map_or(self.size as i32, |lm| lm.ascent.ceil() as i32),
            Face::Builtin => builtin::GLYPH_HEIGHT as i32 + 1,
        }
    }
}

/// Discovers, loads, and caches fonts for the life of the process.
///
/// Owns its state rather than living in a global so tests can construct
/// isolated instances with explicit search paths.
pub struct FontService {
    bundled_dir: PathBuf,
    search_dirs: Vec<PathBuf>,
    catalog: Mutex<Option<FontCatalog>>,
    cache: Mutex<HashMap<FontQuery, ResolvedFont>>,
}

impl Default for FontService {
    fn default() -> Self {
        Self::new()
    }
}

impl FontService {
    /// Service over the default bundled directory and platform font dirs.
    pub fn new() -> Self {
        Self::with_search_paths(PathBuf::from("fonts"), discovery::platform_font_dirs())
    }

    /// Service with explicit search roots (isolated instances for tests).
    pub fn with_search_paths(bundled_dir: PathBuf, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            bundled_dir,
            search_dirs,
            catalog: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a query to a usable font. Infallible: missing files degrade
    /// down the chain until the builtin bitmap font answers.
    pub fn resolve(&self, query: &FontQuery) -> ResolvedFont {
        if let Some(found) = self.cache.lock().get(query) {
            return found.clone();
        }
        let font = self.load_best(query);
        self.cache.lock().insert(query.clone(), font.clone());
        font
    }

    /// The discovered catalog (scans on first call, then memoized).
    pub fn catalog(&self) -> FontCatalog {
        let mut slot = self.catalog.lock();
        slot.get_or_insert_with(|| {
            let mut dirs = Vec::with_capacity(self.search_dirs.len() + 1);
            if self.bundled_dir.is_dir() {
                dirs.push(self.bundled_dir.clone());
            }
            dirs.extend(self.search_dirs.iter().cloned());
            discovery::scan(&dirs)
        })
        .clone()
    }

    /// Drop the font cache and the memoized catalog.
    pub fn clear(&self) {
        self.cache.lock().clear();
        *self.catalog.lock() = None;
    }

    /// The ordered fallback chain; first success wins.
    fn load_best(&self, query: &FontQuery) -> ResolvedFont {
        // 1. Explicit name against the bundled directory.
        if let Some(name) = query.name.as_deref() {
            if let Some(path) = discovery::find_named(&self.bundled_dir, name) {
                if let Some(font) = load_font_file(&path) {
                    return ResolvedFont::scalable(font, query.size, query.weight);
                }
            }
        }

        // 2. The well-known best bundled file.
        let best = self.bundled_dir.join(BEST_BUNDLED_FONT);
        if let Some(font) = load_font_file(&best) {
            return ResolvedFont::scalable(font, query.size, query.weight);
        }

        // 3. Catalog scan: priority set, then CJK-capable, then Latin.
        let catalog = self.catalog();
        let candidates = catalog
            .priority
            .iter()
            .chain(catalog.chinese.iter().take(3))
            .chain(catalog.english.iter().take(2));
        for path in candidates {
            if let Some(font) = load_font_file(path) {
                return ResolvedFont::scalable(font, query.size, query.weight);
            }
        }

        // 4. Well-known filenames tried against every search root.
        for name in WELL_KNOWN_NAMES {
            for dir in std::iter::once(&self.bundled_dir).chain(self.search_dirs.iter()) {
                if let Some(font) = load_font_file(&dir.join(name)) {
                    return ResolvedFont::scalable(font, query.size, query.weight);
                }
            }
        }

        // 5. The builtin bitmap font always succeeds.
        log::debug!("font: no scalable font for {query:?}, using builtin");
        ResolvedFont::fallback(query.size, query.weight)
    }
}

fn load_font_file(path: &Path) -> Option<Arc<fontdue::Font>> {
    let data = std::fs::read(path).ok()?;
    match fontdue::Font::from_bytes(data, fontdue::FontSettings::default()) {
        Ok(font) => Some(Arc::new(font)),
        Err(err) => {
            log::warn!("font: failed to parse {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A service that can never find a scalable font.
    fn empty_service() -> FontService {
        FontService::with_search_paths(PathBuf::from("/nonexistent/bundled"), Vec::new())
    }

    #[test]
    fn resolve_never_fails_without_fonts() {
        let service = empty_service();
        for size in [8, 16, 48] {
            let font = service.resolve(&FontQuery::sized(size));
            assert!(font.is_builtin());
        }
        let named = service.resolve(&FontQuery::named(16, "Hack-Bold"));
        assert!(named.is_builtin());
    }

    #[test]
    fn cache_hits_are_equivalent() {
        let service = empty_service();
        let q = FontQuery { size: 20, name: None, weight: Some(600) };
        let a = service.resolve(&q);
        let b = service.resolve(&q);
        assert_eq!(a.is_builtin(), b.is_builtin());
        assert_eq!(a.weight(), b.weight());
        assert_eq!(service.cache.lock().len(), 1);
    }

    #[test]
    fn clear_resets_cache_and_catalog() {
        let service = empty_service();
        service.resolve(&FontQuery::sized(12));
        let _ = service.catalog();
        service.clear();
        assert!(service.cache.lock().is_empty());
        assert!(service.catalog.lock().is_none());
    }

    #[test]
    fn builtin_measure_ignores_size() {
        let service = empty_service();
        let small = service.resolve(&FontQuery::sized(8));
        let large = service.resolve(&FontQuery::sized(48));
        assert_eq!(small.measure("hello"), large.measure("hello"));
    }

    #[test]
    fn weight_survives_resolution() {
        let service = empty_service();
        let font = service.resolve(&FontQuery { size: 16, name: None, weight: Some(700) });
        assert_eq!(font.weight(), Some(700));
    }
}
