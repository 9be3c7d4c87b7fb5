//! Font metrics for text measurement and glyph rasterization.
//!
//! One font face is installed process-wide at startup. Layout measures text
//! with its advance widths and the rasterizer draws its outlines. Without an
//! installed face, measurement falls back to fixed em ratios (half-width for
//! ASCII, full-width for everything else) and text is not painted.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ttf_parser::{Face, GlyphId};

/// Approximate advance of a half-width character, in em
const HALF_WIDTH_EM: f32 = 0.55;
/// Approximate advance of a full-width (CJK, kana, symbols) character, in em
const FULL_WIDTH_EM: f32 = 1.0;
/// Ascender used when no face is installed, in em
const FALLBACK_ASCENDER_EM: f32 = 0.88;

/// Well-known CJK-capable font files searched when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "NotoSansJP-Regular.ttf",
    "NotoSansJP-Regular.otf",
    "NotoSansCJKjp-Regular.otf",
    "NotoSansCJK-Regular.ttc",
    "opentype/noto/NotoSansCJK-Regular.ttc",
    "truetype/noto/NotoSansCJK-Regular.ttc",
    "ipaexg.ttf",
    "truetype/ipaexfont-gothic/ipaexg.ttf",
    "ipag.ttf",
    "ヒラギノ角ゴシック W3.ttc",
    "meiryo.ttc",
    "msgothic.ttc",
];

static ACTIVE_FONT: OnceLock<LoadedFont> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font data could not be parsed")]
    Parse,
    #[error("a font is already installed")]
    AlreadyInstalled,
}

/// Parsed font data kept alive for the life of the process.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    data: Arc<Vec<u8>>,
    units_per_em: f32,
    ascender: f32,
}

impl LoadedFont {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FontError> {
        let face = Face::parse(&data, 0).map_err(|_| FontError::Parse)?;
        let units_per_em = face.units_per_em().max(1) as f32;
        let ascender = face.ascender() as f32 / units_per_em;
        Ok(LoadedFont { data: Arc::new(data), units_per_em, ascender })
    }

    pub fn from_path(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path)
            .map_err(|source| FontError::Io { path: path.to_path_buf(), source })?;
        LoadedFont::from_bytes(data)
    }

    /// Re-borrow the face. Parsing only reads the table directory.
    pub fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    pub fn units_per_em(&self) -> f32 {
        self.units_per_em
    }
}

/// Install the process-wide font. Only the first call succeeds.
pub fn install(font: LoadedFont) -> Result<(), FontError> {
    ACTIVE_FONT.set(font).map_err(|_| FontError::AlreadyInstalled)
}

pub fn active_font() -> Option<&'static LoadedFont> {
    ACTIVE_FONT.get()
}

/// Resolve a font: the configured path first, then well-known system locations.
pub fn discover(configured: Option<&Path>) -> Option<LoadedFont> {
    if let Some(path) = configured {
        match LoadedFont::from_path(path) {
            Ok(font) => return Some(font),
            Err(e) => tracing::warn!(error = %e, "configured font unusable, searching system fonts"),
        }
    }

    for dir in system_font_dirs() {
        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = dir.join(candidate);
            if !path.is_file() {
                continue;
            }
            if let Ok(font) = LoadedFont::from_path(&path) {
                tracing::info!(path = %path.display(), "using system font");
                return Some(font);
            }
        }
    }
    None
}

fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from(r"C:\Windows\Fonts"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        dirs.push(PathBuf::from(&home).join(".fonts"));
        dirs.push(PathBuf::from(home).join("Library/Fonts"));
    }
    dirs
}

// ============================================================================
// MEASUREMENT
// ============================================================================

/// Text measurement against the installed face, or the em-ratio fallback.
#[derive(Debug, Clone, Copy)]
pub struct FontMetrics {
    font: Option<&'static LoadedFont>,
}

impl FontMetrics {
    /// Metrics that never consult an installed face.
    pub const fn fallback() -> Self {
        FontMetrics { font: None }
    }

    /// Width of a single character in points
    pub fn char_width_pt(&self, c: char, font_size: f32) -> f32 {
        let mut buf = [0u8; 4];
        self.string_width(c.encode_utf8(&mut buf), font_size)
    }

    /// Width of a string in points
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        match self.font.and_then(|f| f.face().map(|face| (f, face))) {
            Some((font, face)) => text
                .chars()
                .map(|c| {
                    let advance = face
                        .glyph_index(c)
                        .and_then(|gid| face.glyph_hor_advance(gid))
                        .map(|a| a as f32 / font.units_per_em)
                        .filter(|a| *a > 0.0)
                        .unwrap_or_else(|| fallback_em(c));
                    advance * font_size
                })
                .sum(),
            None => text.chars().map(|c| fallback_em(c) * font_size).sum(),
        }
    }

    /// Distance from the top of a line box to the baseline
    pub fn ascent_pt(&self, font_size: f32) -> f32 {
        self.font.map(|f| f.ascender).unwrap_or(FALLBACK_ASCENDER_EM) * font_size
    }

    /// Glyph id for rasterization; `None` when no face is installed or the glyph is missing
    pub fn glyph(&self, c: char) -> Option<GlyphId> {
        self.font.and_then(|f| f.face()).and_then(|face| face.glyph_index(c))
    }
}

fn fallback_em(c: char) -> f32 {
    if c.is_ascii() || ('\u{FF61}'..='\u{FF9F}').contains(&c) {
        HALF_WIDTH_EM
    } else {
        FULL_WIDTH_EM
    }
}

/// Metrics for the installed font (bold is synthesized, so it shares widths).
pub fn get_metrics() -> FontMetrics {
    FontMetrics { font: active_font() }
}

/// True for characters that may break a line without surrounding whitespace.
pub fn breaks_anywhere(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // CJK punctuation
        | '\u{3040}'..='\u{30FF}' // kana
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}' // unified ideographs
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}' // full/half-width forms
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_widths() {
        let metrics = FontMetrics::fallback();
        // 5 ASCII chars at 10pt, 0.55em each
        assert!((metrics.string_width("Hello", 10.0) - 27.5).abs() < 0.01);
        // 3 full-width chars at 10pt
        assert!((metrics.string_width("見積書", 10.0) - 30.0).abs() < 0.01);
        assert!((metrics.char_width_pt('ｱ', 10.0) - 5.5).abs() < 0.01);
    }

    #[test]
    fn test_fallback_ascent() {
        let metrics = FontMetrics::fallback();
        assert!((metrics.ascent_pt(10.0) - 8.8).abs() < 0.01);
        assert!(metrics.glyph('a').is_none());
    }

    #[test]
    fn test_breaks_anywhere() {
        assert!(breaks_anywhere('車'));
        assert!(breaks_anywhere('の'));
        assert!(breaks_anywhere('、'));
        assert!(!breaks_anywhere('a'));
        assert!(!breaks_anywhere(' '));
    }

    #[test]
    fn test_bad_font_bytes() {
        assert!(matches!(LoadedFont::from_bytes(vec![0, 1, 2, 3]), Err(FontError::Parse)));
    }
}
