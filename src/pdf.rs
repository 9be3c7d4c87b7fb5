use printpdf::*;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use crate::error::{AssemblyError, EnvironmentError};
use crate::raster::Bitmap;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const A4: Size = Size { width: 210.0, height: 297.0 };
pub const PAGE_MARGIN_MM: f32 = 10.0;

const PT_TO_MM: f32 = 0.352_777_78;

// ============================================================================
// PAGE GEOMETRY
// ============================================================================

/// A width and height. Page sizes are in millimetres, bitmap sizes in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Size { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const fn uniform(m: f32) -> Self {
        Margins { top: m, right: m, bottom: m, left: m }
    }

    fn sanitized(self) -> Self {
        let clean = |v: f32| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Margins {
            top: clean(self.top),
            right: clean(self.right),
            bottom: clean(self.bottom),
            left: clean(self.left),
        }
    }
}

/// A placement on the page in millimetres, measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit `image` into the printable area of `page`, preserving its aspect ratio and centring it.
///
/// The result always lies inside the page. A degenerate page falls back to
/// A4; margins that leave no printable area are dropped; an image without a
/// usable size fills the printable area.
pub fn fit_rect(image: Size, page: Size, margins: Margins) -> Rect {
    let page = if page.is_usable() { page } else { A4 };
    let mut margins = margins.sanitized();
    if margins.left + margins.right >= page.width || margins.top + margins.bottom >= page.height {
        margins = Margins::uniform(0.0);
    }

    let printable = Rect {
        x: margins.left,
        y: margins.top,
        width: page.width - margins.left - margins.right,
        height: page.height - margins.top - margins.bottom,
    };

    let fitted = if image.is_usable() {
        let ratio = (printable.width / image.width).min(printable.height / image.height);
        let width = image.width * ratio;
        let height = image.height * ratio;
        Rect {
            x: printable.x + (printable.width - width) / 2.0,
            y: printable.y + (printable.height - height) / 2.0,
            width,
            height,
        }
    } else {
        printable
    };

    let fitted = if [fitted.x, fitted.y, fitted.width, fitted.height].iter().all(|v| v.is_finite()) {
        fitted
    } else {
        printable
    };

    clamp_to_page(fitted, page)
}

fn clamp_to_page(rect: Rect, page: Size) -> Rect {
    let x = rect.x.clamp(0.0, page.width);
    let y = rect.y.clamp(0.0, page.height);
    Rect {
        x,
        y,
        width: rect.width.clamp(0.0, page.width - x),
        height: rect.height.clamp(0.0, page.height - y),
    }
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// A finished PDF ready for delivery.
#[derive(Debug, Clone)]
pub struct PdfFile {
    filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl PdfFile {
    /// `<label>_<number>.pdf`
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

pub fn file_name(label: &str, number: &str) -> String {
    format!("{}_{}.pdf", label, number)
}

/// Build an A4 PDF with one fragment per page, in order.
pub fn assemble(fragments: &[Bitmap], label: &str, number: &str) -> Result<PdfFile, AssemblyError> {
    if fragments.is_empty() {
        return Err(AssemblyError::NoFragments);
    }

    // Decode everything first so a bad fragment never leaves a half-built document
    let mut decoded = Vec::with_capacity(fragments.len());
    for (index, fragment) in fragments.iter().enumerate() {
        let img = ::image::load_from_memory(&fragment.png)
            .map_err(|source| AssemblyError::Decode { index, source })?;
        decoded.push(img.to_rgb8());
    }

    let filename = file_name(label, number);
    let (doc, page1, layer1) =
        PdfDocument::new(filename.trim_end_matches(".pdf"), Mm(A4.width), Mm(A4.height), "Layer 1");

    for (i, rgb) in decoded.into_iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page, layer) = doc.add_page(Mm(A4.width), Mm(A4.height), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let (px_w, px_h) = rgb.dimensions();
        let rect = fit_rect(
            Size::new(px_w as f32, px_h as f32),
            A4,
            Margins::uniform(PAGE_MARGIN_MM),
        );
        place_bitmap(&layer, rgb, rect);
        tracing::debug!(page = i + 1, px_w, px_h, width_mm = rect.width, height_mm = rect.height, "page placed");
    }

    let mut bytes = Vec::new();
    {
        let mut writer = BufWriter::new(Cursor::new(&mut bytes));
        doc.save(&mut writer).map_err(|e| AssemblyError::Encoding(e.to_string()))?;
        writer.flush().map_err(|e| AssemblyError::Encoding(e.to_string()))?;
    }

    Ok(PdfFile { filename, bytes, page_count: fragments.len() })
}

fn place_bitmap(layer: &PdfLayerReference, rgb: ::image::RgbImage, rect: Rect) {
    let (px_w, px_h) = rgb.dimensions();

    let image = printpdf::Image::from(printpdf::ImageXObject {
        width: Px(px_w as usize),
        height: Px(px_h as usize),
        color_space: printpdf::ColorSpace::Rgb,
        bits_per_component: printpdf::ColorBits::Bit8,
        interpolate: true,
        image_data: rgb.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // At 72 DPI one pixel is one point; scale from there to the fitted size
    let natural_w = px_w.max(1) as f32 * PT_TO_MM;
    let natural_h = px_h.max(1) as f32 * PT_TO_MM;

    image.add_to_layer(
        layer.clone(),
        printpdf::ImageTransform {
            translate_x: Some(Mm(rect.x)),
            // PDF space grows upward from the bottom edge
            translate_y: Some(Mm(A4.height - rect.y - rect.height)),
            scale_x: Some(rect.width / natural_w),
            scale_y: Some(rect.height / natural_h),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
}

// ============================================================================
// DELIVERY
// ============================================================================

/// Where a finished PDF goes.
pub trait DownloadSink {
    fn deliver(&self, file: &PdfFile) -> Result<(), EnvironmentError>;
}

/// Saves into a directory. The file appears whole or not at all.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file: &PdfFile) -> PathBuf {
        let safe: String = file
            .filename()
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        self.dir.join(safe)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, file: &PdfFile) -> Result<(), EnvironmentError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            EnvironmentError::DownloadUnavailable(format!("{}: {}", self.dir.display(), e))
        })?;

        let target = self.path_for(file);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&file.bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| EnvironmentError::Io(e.error))?;

        tracing::info!(path = %target.display(), bytes = file.bytes.len(), "pdf saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn png(width: u32, height: u32) -> Bitmap {
        let img = ::image::RgbaImage::from_pixel(width, height, ::image::Rgba([200, 10, 10, 255]));
        let mut png = Vec::new();
        ::image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();
        Bitmap { width, height, png }
    }

    fn within_page(r: &Rect, page: Size) -> bool {
        [r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite())
            && r.x >= 0.0
            && r.y >= 0.0
            && r.width >= 0.0
            && r.height >= 0.0
            && r.x + r.width <= page.width + EPS
            && r.y + r.height <= page.height + EPS
    }

    #[test]
    fn test_fit_rect_tall_image_fills_height() {
        let r = fit_rect(Size::new(1000.0, 2000.0), A4, Margins::uniform(10.0));
        assert!((r.height - 277.0).abs() < EPS);
        assert!((r.width - 138.5).abs() < EPS);
        assert!((r.x - (10.0 + (190.0 - 138.5) / 2.0)).abs() < EPS);
        assert!((r.y - 10.0).abs() < EPS);
    }

    #[test]
    fn test_fit_rect_wide_image_fills_width() {
        let r = fit_rect(Size::new(1900.0, 100.0), A4, Margins::uniform(10.0));
        assert!((r.width - 190.0).abs() < EPS);
        assert!((r.height - 10.0).abs() < EPS);
        assert!((r.y - (10.0 + (277.0 - 10.0) / 2.0)).abs() < EPS);
    }

    #[test]
    fn test_fit_rect_stays_on_page_for_any_input() {
        let values = [0.0, -5.0, 1e-30, 0.5, 1.0, 3.0, 1e6, 1e30, f32::NAN, f32::INFINITY, f32::NEG_INFINITY];
        for &w in &values {
            for &h in &values {
                let r = fit_rect(Size::new(w, h), A4, Margins::uniform(PAGE_MARGIN_MM));
                assert!(within_page(&r, A4), "image {w}x{h} gave {r:?}");

                let valid = w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0;
                if valid && r.width > 0.01 && r.height > 0.01 {
                    let want = h / w;
                    let got = r.height / r.width;
                    assert!((got - want).abs() / want < 1e-3, "aspect drift for {w}x{h}: {r:?}");
                }
            }
        }
    }

    #[test]
    fn test_fit_rect_degenerate_inputs_use_printable_area() {
        let printable = Rect { x: 10.0, y: 10.0, width: 190.0, height: 277.0 };
        assert_eq!(fit_rect(Size::new(0.0, 0.0), A4, Margins::uniform(10.0)), printable);
        assert_eq!(fit_rect(Size::new(f32::NAN, 5.0), A4, Margins::uniform(10.0)), printable);
        assert_eq!(fit_rect(Size::new(10.0, 10.0), Size::new(f32::NAN, 0.0), Margins::uniform(10.0)).x, 10.0);

        let r = fit_rect(Size::new(1.0, 1.0), A4, Margins::uniform(500.0));
        assert!((r.width - 210.0).abs() < EPS);
        assert!(within_page(&r, A4));
    }

    #[test]
    fn test_assemble_one_page_per_fragment() {
        let file = assemble(&[png(20, 30), png(20, 30)], "注文書", "ORD-7").unwrap();
        assert_eq!(file.page_count, 2);
        assert_eq!(file.filename(), "注文書_ORD-7.pdf");
        assert!(file.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_assemble_errors() {
        assert!(matches!(assemble(&[], "見積書", "Q-1"), Err(AssemblyError::NoFragments)));

        let broken = Bitmap { width: 1, height: 1, png: vec![1, 2, 3] };
        let err = assemble(&[png(2, 2), broken], "見積書", "Q-1").unwrap_err();
        assert!(matches!(err, AssemblyError::Decode { index: 1, .. }));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("請求書", "EST-0001"), "請求書_EST-0001.pdf");
    }

    #[test]
    fn test_directory_sink_writes_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let file = PdfFile { filename: "請求書_A/1.pdf".into(), bytes: b"%PDF-1.3 test".to_vec(), page_count: 1 };

        sink.deliver(&file).unwrap();

        let path = sink.path_for(&file);
        assert_eq!(path.file_name().unwrap(), "請求書_A_1.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), file.bytes);
        let entries = std::fs::read_dir(sink.dir()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_directory_sink_unavailable_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let sink = DirectorySink::new(blocker.join("out"));
        let file = PdfFile { filename: "x.pdf".into(), bytes: vec![1], page_count: 1 };
        let err = sink.deliver(&file).unwrap_err();

        assert!(matches!(err, EnvironmentError::DownloadUnavailable(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
