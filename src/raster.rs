//! Painting a markup subtree into a bitmap.
//!
//! The subtree is laid out with [`crate::layout_box::lay_out`], which places
//! the root at `[0, w] x [0, h]` with y growing upward. A single flip
//! transform maps that space onto the pixmap, so rectangles and glyph
//! outlines are emitted in layout coordinates.

use tiny_skia::{
    FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};
use ttf_parser::OutlineBuilder;

use crate::error::CaptureError;
use crate::font_metrics::{self, FontMetrics};
use crate::images::ImageSet;
use crate::layout::{Color, MarkupNode, NodeType, ObjectFit, TextAlign};
use crate::layout_box::{lay_out, LayoutBox};

/// CSS pixels per point. A capture scale of 1.0 yields one pixel per CSS px.
pub const PX_PER_PT: f32 = 96.0 / 72.0;

/// Largest bitmap edge we are willing to allocate, in pixels.
const MAX_EDGE_PX: u32 = 16_384;

const PLACEHOLDER_FILL: Color = Color::rgb(0xee, 0xee, 0xee);
const PLACEHOLDER_EDGE: Color = Color::rgb(0xbb, 0xbb, 0xbb);

/// A captured fragment, PNG-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Bitmap {
    /// Height over width; 0 for an empty bitmap.
    pub fn aspect(&self) -> f32 {
        if self.width == 0 {
            0.0
        } else {
            self.height as f32 / self.width as f32
        }
    }
}

/// Turns a resolved subtree into pixels. Implementations run on the blocking pool.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, target: &MarkupNode, images: &ImageSet, scale: f32) -> Result<Bitmap, CaptureError>;
}

/// The built-in painter: backgrounds, borders, text outlines and images.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkiaRasterizer;

impl Rasterizer for SkiaRasterizer {
    fn rasterize(&self, target: &MarkupNode, images: &ImageSet, scale: f32) -> Result<Bitmap, CaptureError> {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let root = lay_out(target);
        let page_h = root.outer_height();
        let px = fit_px_per_pt(root.width, page_h, scale * PX_PER_PT)?;

        let width_px = to_px(root.width, px)?;
        let height_px = to_px(page_h, px)?;
        let mut pixmap = Pixmap::new(width_px, height_px).ok_or_else(|| {
            CaptureError::Raster(format!("invalid raster size {}x{}", width_px, height_px))
        })?;
        pixmap.fill(tiny_skia::Color::from_rgba8(255, 255, 255, 255));

        let base = Transform::from_row(px, 0.0, 0.0, -px, 0.0, page_h * px);
        let mut painter = Painter { pixmap: &mut pixmap, base, images, metrics: font_metrics::get_metrics() };
        painter.paint_box(&root, Color::black());

        let png = pixmap
            .encode_png()
            .map_err(|e| CaptureError::Raster(format!("png encode failed: {e}")))?;

        tracing::debug!(width = width_px, height = height_px, bytes = png.len(), "subtree rasterized");
        Ok(Bitmap { width: width_px, height: height_px, png })
    }
}

/// Pixels per point for a `width` x `height` target, lowered from `wanted`
/// when the longest edge would exceed [`MAX_EDGE_PX`].
fn fit_px_per_pt(width: f32, height: f32, wanted: f32) -> Result<f32, CaptureError> {
    let longest = width.max(height);
    if !width.is_finite() || !height.is_finite() {
        return Err(CaptureError::Raster(format!("raster size {width}x{height}pt is not finite")));
    }
    // One pixel of slack keeps the rounded-up edge inside the limit
    let limit = (MAX_EDGE_PX - 1) as f32;
    if longest * wanted <= limit {
        return Ok(wanted);
    }

    let px = limit / longest;
    if !px.is_finite() || px <= 0.0 {
        return Err(CaptureError::Raster(format!("raster edge of {longest}pt is out of range")));
    }
    tracing::debug!(edge_pt = longest, wanted, px, "target exceeds raster limit, lowering scale");
    Ok(px)
}

fn to_px(pt: f32, px_per_pt: f32) -> Result<u32, CaptureError> {
    let px = (pt * px_per_pt).ceil();
    if !px.is_finite() || px > MAX_EDGE_PX as f32 {
        return Err(CaptureError::Raster(format!("raster edge of {pt}pt is out of range")));
    }
    // An empty element still yields a one-pixel capture
    Ok((px as u32).max(1))
}

struct Painter<'a> {
    pixmap: &'a mut Pixmap,
    base: Transform,
    images: &'a ImageSet,
    metrics: FontMetrics,
}

impl Painter<'_> {
    fn paint_box(&mut self, lb: &LayoutBox, inherited: Color) {
        let style = &lb.node.style;
        let color = style.color.unwrap_or(inherited);

        if let Some(bg) = style.background_color {
            self.fill_rect(lb.x, lb.bottom(), lb.width, lb.height, bg);
        }

        match lb.node.node_type {
            NodeType::Text => self.paint_text(lb, color),
            NodeType::Image => self.paint_image(lb),
            _ => {}
        }

        for child in &lb.children {
            self.paint_box(child, color);
        }

        // Borders last so cell backgrounds never cover a neighbour's rule
        self.paint_borders(lb);
    }

    fn paint_borders(&mut self, lb: &LayoutBox) {
        let [top, right, bottom, left] = lb.node.style.border_sides();
        if let Some(side) = top {
            self.fill_rect(lb.x, lb.y - side.width, lb.width, side.width, side.color);
        }
        if let Some(side) = bottom {
            self.fill_rect(lb.x, lb.bottom(), lb.width, side.width, side.color);
        }
        if let Some(side) = left {
            self.fill_rect(lb.x, lb.bottom(), side.width, lb.height, side.color);
        }
        if let Some(side) = right {
            self.fill_rect(lb.x + lb.width - side.width, lb.bottom(), side.width, lb.height, side.color);
        }
    }

    fn paint_text(&mut self, lb: &LayoutBox, color: Color) {
        let Some(font) = font_metrics::active_font() else {
            return;
        };
        let Some(face) = font.face() else {
            return;
        };

        let size = lb.font_size();
        let line_h = size * lb.line_height_multiplier();
        let (pad_t, pad_r, _, pad_l) = lb.node.style.padding_trbl();
        let inner_w = lb.width - pad_l - pad_r;
        let glyph_scale = size / font.units_per_em();
        let half_leading = (line_h - size) / 2.0;
        let ascent = self.metrics.ascent_pt(size);

        let paint = fill_paint(color);
        let bold = lb.is_bold().then(|| Stroke { width: size * 0.04, ..Stroke::default() });

        for (i, line) in lb.lines.iter().enumerate() {
            let line_w = self.metrics.string_width(line, size);
            let offset = match lb.text_align() {
                TextAlign::Left => 0.0,
                TextAlign::Center => (inner_w - line_w) / 2.0,
                TextAlign::Right => inner_w - line_w,
            };
            let baseline = lb.y - pad_t - i as f32 * line_h - half_leading - ascent;
            let mut pen_x = lb.x + pad_l + offset.max(0.0);

            for c in line.chars() {
                if let Some(gid) = self.metrics.glyph(c) {
                    let mut builder = GlyphPathBuilder::new(pen_x, baseline, glyph_scale);
                    if face.outline_glyph(gid, &mut builder).is_some() {
                        if let Some(path) = builder.finish() {
                            self.pixmap.fill_path(&path, &paint, FillRule::Winding, self.base, None);
                            if let Some(stroke) = &bold {
                                self.pixmap.stroke_path(&path, &paint, stroke, self.base, None);
                            }
                        }
                    }
                }
                pen_x += self.metrics.char_width_pt(c, size);
            }
        }
    }

    fn paint_image(&mut self, lb: &LayoutBox) {
        let image = lb.node.src.as_deref().and_then(|src| self.images.get(src));
        let Some(image) = image.and_then(rgba_to_pixmap) else {
            self.fill_rect(lb.x, lb.bottom(), lb.width, lb.height, PLACEHOLDER_FILL);
            let edge = 0.5;
            self.fill_rect(lb.x, lb.y - edge, lb.width, edge, PLACEHOLDER_EDGE);
            self.fill_rect(lb.x, lb.bottom(), lb.width, edge, PLACEHOLDER_EDGE);
            return;
        };

        let src_w = image.width() as f32;
        let src_h = image.height() as f32;
        let fit = lb.node.style.object_fit.unwrap_or_default();
        let (sx, sy) = match fit {
            ObjectFit::Fill => (lb.width / src_w, lb.height / src_h),
            ObjectFit::Contain => {
                let s = (lb.width / src_w).min(lb.height / src_h);
                (s, s)
            }
            ObjectFit::Cover => {
                let s = (lb.width / src_w).max(lb.height / src_h);
                (s, s)
            }
        };
        let draw_w = src_w * sx;
        let draw_h = src_h * sy;
        let left = lb.x + (lb.width - draw_w) / 2.0;
        let top = lb.y - (lb.height - draw_h) / 2.0;

        // Source row 0 must land at the visual top
        let image_ts = Transform::from_row(sx, 0.0, 0.0, -sy, left, top);
        let clip = Rect::from_xywh(lb.x, lb.bottom(), lb.width, lb.height)
            .and_then(|r| r.transform(self.base))
            .and_then(|r| {
                let mut mask = tiny_skia::Mask::new(self.pixmap.width(), self.pixmap.height())?;
                mask.fill_path(&PathBuilder::from_rect(r), FillRule::Winding, false, Transform::identity());
                Some(mask)
            });

        let mut paint = PixmapPaint::default();
        paint.quality = FilterQuality::Bilinear;
        self.pixmap
            .draw_pixmap(0, 0, image.as_ref(), &paint, self.base.pre_concat(image_ts), clip.as_ref());
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            let path = PathBuilder::from_rect(rect);
            self.pixmap.fill_path(&path, &fill_paint(color), FillRule::Winding, self.base, None);
        }
    }
}

fn fill_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = true;
    paint
}

fn rgba_to_pixmap(img: &image::RgbaImage) -> Option<Pixmap> {
    let (width, height) = img.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    for (src, dst) in img.as_raw().chunks_exact(4).zip(pixmap.data_mut().chunks_exact_mut(4)) {
        let a = src[3];
        dst[0] = premultiply(src[0], a);
        dst[1] = premultiply(src[1], a);
        dst[2] = premultiply(src[2], a);
        dst[3] = a;
    }
    Some(pixmap)
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self { builder: PathBuilder::new(), origin_x, origin_y, scale }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }

    fn pt(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y + y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.pt(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.pt(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.pt(x1, y1);
        let (x, y) = self.pt(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.pt(x1, y1);
        let (x2, y2) = self.pt(x2, y2);
        let (x, y) = self.pt(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Dimension;

    fn decode(bitmap: &Bitmap) -> image::RgbaImage {
        image::load_from_memory(&bitmap.png).unwrap().to_rgba8()
    }

    #[test]
    fn test_bitmap_size_follows_layout_and_scale() {
        let tree = MarkupNode::view().styled(|s| {
            s.width = Some(Dimension::Pt(72.0));
            s.height = Some(Dimension::Pt(36.0));
        });
        let bitmap = SkiaRasterizer.rasterize(&tree, &ImageSet::default(), 2.0).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (192, 96));
        assert_eq!(decode(&bitmap).dimensions(), (192, 96));
        assert!((bitmap.aspect() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_background_is_painted_top_down() {
        // Red band on top of a white block
        let tree = MarkupNode::view()
            .styled(|s| s.width = Some(Dimension::Pt(72.0)))
            .child(MarkupNode::view().styled(|s| {
                s.height = Some(Dimension::Pt(36.0));
                s.background_color = Some(Color::rgb(255, 0, 0));
            }))
            .child(MarkupNode::view().styled(|s| s.height = Some(Dimension::Pt(36.0))));

        let img = decode(&SkiaRasterizer.rasterize(&tree, &ImageSet::default(), 1.0).unwrap());
        assert_eq!(img.get_pixel(48, 10).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(48, 85).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_missing_image_draws_placeholder() {
        let tree = MarkupNode::image("/nowhere.png").styled(|s| {
            s.width = Some(Dimension::Pt(30.0));
            s.height = Some(Dimension::Pt(30.0));
        });
        let img = decode(&SkiaRasterizer.rasterize(&tree, &ImageSet::default(), 1.0).unwrap());
        assert_eq!(img.get_pixel(20, 20).0, [0xee, 0xee, 0xee, 255]);
    }

    #[test]
    fn test_loaded_image_is_drawn_upright() {
        let mut src = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 255]));
        src.put_pixel(0, 0, image::Rgba([0, 255, 0, 255]));
        src.put_pixel(1, 0, image::Rgba([0, 255, 0, 255]));
        let mut images = ImageSet::default();
        images.insert("logo".into(), src);

        let tree = MarkupNode::image("logo").styled(|s| {
            s.width = Some(Dimension::Pt(60.0));
            s.height = Some(Dimension::Pt(60.0));
            s.object_fit = Some(ObjectFit::Fill);
        });
        let img = decode(&SkiaRasterizer.rasterize(&tree, &images, 1.0).unwrap());
        let top = img.get_pixel(40, 5).0;
        let bottom = img.get_pixel(40, 75).0;
        assert!(top[1] > 200 && top[2] < 50, "top row should be green, got {:?}", top);
        assert!(bottom[2] > 200 && bottom[1] < 50, "bottom row should be blue, got {:?}", bottom);
    }

    #[test]
    fn test_tall_target_is_downscaled_to_fit() {
        let tree = MarkupNode::view().styled(|s| {
            s.width = Some(Dimension::Pt(600.0));
            s.height = Some(Dimension::Pt(9000.0));
        });
        let bitmap = SkiaRasterizer.rasterize(&tree, &ImageSet::default(), 2.0).unwrap();
        assert!(bitmap.height <= MAX_EDGE_PX, "height {}", bitmap.height);
        assert!(bitmap.height > MAX_EDGE_PX - 8, "height {}", bitmap.height);
        assert!((bitmap.aspect() - 15.0).abs() < 0.05, "aspect {}", bitmap.aspect());
    }

    #[test]
    fn test_fit_px_per_pt() {
        let wanted = 2.0 * PX_PER_PT;
        assert_eq!(fit_px_per_pt(595.0, 842.0, wanted).unwrap(), wanted);

        let px = fit_px_per_pt(100.0, 1.0e7, wanted).unwrap();
        assert!(px > 0.0 && (1.0e7 * px).ceil() <= MAX_EDGE_PX as f32);

        for (w, h) in [(f32::INFINITY, 10.0), (10.0, f32::NAN), (10.0, f32::INFINITY)] {
            assert!(matches!(fit_px_per_pt(w, h, wanted), Err(CaptureError::Raster(_))), "{w}x{h}");
        }
    }
}
