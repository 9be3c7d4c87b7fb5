use crate::font_metrics::{self, FontMetrics};
use crate::layout::{CrossAlign, Direction, FontWeight, MainAlign, MarkupNode, NodeType, TextAlign};

/// Parent size used when a tree is measured without an explicit width.
const DEFAULT_PARENT_WIDTH: f32 = 595.28;

// ============================================================================
// LAYOUT BOX
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    pub column_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct LayoutBox {
    // Top-left corner; y grows upward, so children sit at smaller y
    pub x: f32,
    pub y: f32,

    // Includes padding, excludes margin
    pub width: f32,
    pub height: f32,

    pub margin_top: f32,
    pub margin_bottom: f32,

    pub children: Vec<LayoutBox>,
    pub node: MarkupNode,

    // Text nodes: wrapped lines
    pub lines: Vec<String>,

    pub table: Option<TableLayout>,
}

impl LayoutBox {
    pub fn new(node: MarkupNode) -> Self {
        let (mt, mb) = node.style.margin_tb();

        LayoutBox {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            margin_top: mt,
            margin_bottom: mb,
            children: Vec::new(),
            node,
            lines: Vec::new(),
            table: None,
        }
    }

    pub fn resolve_width(&self, parent_width: f32) -> Option<f32> {
        self.node.style.width.as_ref().map(|d| d.resolve(parent_width))
    }

    pub fn resolve_height(&self, parent_height: f32) -> Option<f32> {
        self.node.style.height.as_ref().map(|d| d.resolve(parent_height))
    }

    pub fn flex(&self) -> f32 {
        self.node.style.flex.unwrap_or(0.0)
    }

    pub fn main_align(&self) -> MainAlign {
        self.node.style.main_align.unwrap_or(MainAlign::Start)
    }

    pub fn cross_align(&self) -> CrossAlign {
        self.node.style.cross_align.unwrap_or(CrossAlign::Stretch)
    }

    pub fn text_align(&self) -> TextAlign {
        self.node.style.text_align.unwrap_or(TextAlign::Left)
    }

    pub fn font_size(&self) -> f32 {
        self.node.style.font_size.unwrap_or(10.0)
    }

    pub fn is_bold(&self) -> bool {
        self.node.style.font_weight == Some(FontWeight::Bold)
    }

    pub fn line_height_multiplier(&self) -> f32 {
        self.node.style.line_height.unwrap_or(1.4)
    }

    pub fn font_metrics(&self) -> FontMetrics {
        font_metrics::get_metrics()
    }

    pub fn outer_height(&self) -> f32 {
        self.margin_top + self.height + self.margin_bottom
    }

    pub fn col_span(&self) -> usize {
        self.node.col_span.unwrap_or(1).max(1)
    }

    /// Bottom edge of the box
    pub fn bottom(&self) -> f32 {
        self.y - self.height
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Build, measure and place a tree with its top-left corner at (0, height).
///
/// After this call the root spans `[0, width] x [0, height]` and every
/// descendant lies inside it unless its content overflows.
pub fn lay_out(node: &MarkupNode) -> LayoutBox {
    let mut root = build_layout(node);
    measure_layout_with_parent(&mut root, DEFAULT_PARENT_WIDTH, 0.0);
    let top = root.height + root.margin_top;
    place_layout(&mut root, 0.0, top);
    root
}

pub fn build_layout(node: &MarkupNode) -> LayoutBox {
    let mut lb = LayoutBox::new(node.clone());
    for child in &node.children {
        lb.children.push(build_layout(child));
    }
    lb
}

// ============================================================================
// MEASURE PASS
// ============================================================================

pub fn measure_layout_with_parent(layout: &mut LayoutBox, parent_width: f32, parent_height: f32) {
    match layout.node.node_type {
        NodeType::Text => measure_text(layout, parent_width),
        NodeType::View | NodeType::Row | NodeType::Cell => {
            measure_container(layout, parent_width, parent_height)
        }
        NodeType::Table => measure_table(layout, parent_width, parent_height),
        NodeType::Image => measure_image(layout, parent_width, parent_height),
    }
}

fn measure_text(layout: &mut LayoutBox, parent_width: f32) {
    let text = layout.node.text.clone().unwrap_or_default();
    let size = layout.font_size();
    let line_h = layout.line_height_multiplier();
    let metrics = layout.font_metrics();
    let (pad_t, pad_r, pad_b, pad_l) = layout.node.style.padding_trbl();
    let box_width = layout.resolve_width(parent_width).unwrap_or(parent_width);
    let max_width = box_width - pad_l - pad_r;

    if max_width.is_finite() && max_width > 0.0 {
        layout.lines = wrap_text(&text, size, max_width, &metrics);
        layout.width = box_width;
    } else {
        layout.width = metrics.string_width(&text, size) + pad_l + pad_r;
        layout.lines = vec![text];
    }
    layout.height = size * line_h * layout.lines.len() as f32 + pad_t + pad_b;
}

/// Break text into lines no wider than `max_width`.
///
/// Breaks at whitespace, between CJK characters, at explicit newlines, and
/// inside words that are wider than a line on their own.
pub fn wrap_text(text: &str, size: f32, max_width: f32, metrics: &FontMetrics) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_w = 0.0f32;

        for token in tokenize(paragraph) {
            let token_w = metrics.string_width(&token, size);
            let is_space = token.chars().all(char::is_whitespace);

            if current_w + token_w <= max_width {
                current.push_str(&token);
                current_w += token_w;
                continue;
            }
            if is_space {
                // Swallow the space at a line break
                lines.push(std::mem::take(&mut current).trim_end().to_string());
                current_w = 0.0;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current).trim_end().to_string());
                current_w = 0.0;
            }
            if token_w <= max_width {
                current_w = token_w;
                current = token;
                continue;
            }
            // Overlong word: hard break by character
            for c in token.chars() {
                let cw = metrics.char_width_pt(c, size);
                if current_w + cw > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_w = 0.0;
                }
                current.push(c);
                current_w += cw;
            }
        }

        lines.push(current.trim_end().to_string());
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Split into break opportunities: whitespace runs, single CJK chars, and other runs.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_is_space = false;

    for c in text.chars() {
        if font_metrics::breaks_anywhere(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
            continue;
        }
        let is_space = c.is_whitespace();
        if !current.is_empty() && is_space != current_is_space {
            tokens.push(std::mem::take(&mut current));
        }
        current_is_space = is_space;
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn measure_image(layout: &mut LayoutBox, parent_width: f32, parent_height: f32) {
    // Images need explicit dimensions; default to a 100pt square
    layout.width = layout.resolve_width(parent_width).unwrap_or(100.0);
    layout.height = layout.resolve_height(parent_height).unwrap_or(100.0);
}

fn measure_container(layout: &mut LayoutBox, parent_width: f32, parent_height: f32) {
    let dir = layout.node.style.direction.unwrap_or(Direction::Column);
    let gap = layout.node.style.gap.unwrap_or(0.0);
    let (pad_t, pad_r, pad_b, pad_l) = layout.node.style.padding_trbl();

    let mut explicit_width = layout.resolve_width(parent_width);
    if let Some(max_w) = layout.node.style.max_width {
        let max_w = max_w.resolve(parent_width);
        explicit_width = Some(explicit_width.unwrap_or(parent_width).min(max_w));
    }
    let explicit_height = layout.resolve_height(parent_height);

    // Block-level: containers take the full available width unless told otherwise
    let width = explicit_width.unwrap_or(parent_width);
    let inner_w = (width - pad_l - pad_r).max(0.0);
    let child_parent_height = explicit_height.map(|h| h - pad_t - pad_b).unwrap_or(0.0);

    let content_h = match dir {
        Direction::Column => {
            for child in &mut layout.children {
                measure_layout_with_parent(child, inner_w, child_parent_height);
            }
            measure_column(&layout.children, gap)
        }
        Direction::Row => measure_row(&mut layout.children, gap, inner_w, child_parent_height),
    };

    let mut height = explicit_height.unwrap_or(content_h + pad_t + pad_b);
    if let Some(min_h) = layout.node.style.min_height {
        height = height.max(min_h.resolve(parent_height));
    }

    layout.width = width;
    layout.height = height;
}

fn measure_column(children: &[LayoutBox], gap: f32) -> f32 {
    let n = children.len();
    children.iter().map(|c| c.outer_height()).sum::<f32>() + gap * n.saturating_sub(1) as f32
}

/// Row children: fixed-width children first, then flex children share what is left.
fn measure_row(children: &mut [LayoutBox], gap: f32, inner_w: f32, parent_height: f32) -> f32 {
    let n = children.len();
    let total_gap = gap * n.saturating_sub(1) as f32;
    let total_flex: f32 = children.iter().map(|c| c.flex()).sum();

    let mut used = 0.0f32;
    for child in children.iter_mut().filter(|c| c.flex() <= 0.0) {
        let natural = child
            .resolve_width(inner_w)
            .unwrap_or_else(|| natural_width(child, inner_w));
        measure_layout_with_parent(child, natural, parent_height);
        used += child.width;
    }

    let free = (inner_w - used - total_gap).max(0.0);
    for child in children.iter_mut().filter(|c| c.flex() > 0.0) {
        let share = if total_flex > 0.0 { free * child.flex() / total_flex } else { 0.0 };
        measure_layout_with_parent(child, share, parent_height);
        child.width = share;
    }

    children.iter().map(|c| c.outer_height()).fold(0.0, f32::max)
}

/// Width a non-flex row child wants when it has no explicit width.
fn natural_width(child: &LayoutBox, available: f32) -> f32 {
    match child.node.node_type {
        NodeType::Text => {
            let text = child.node.text.as_deref().unwrap_or_default();
            let (_, pad_r, _, pad_l) = child.node.style.padding_trbl();
            (child.font_metrics().string_width(text, child.font_size()) + pad_l + pad_r).min(available)
        }
        _ => available,
    }
}

fn measure_table(layout: &mut LayoutBox, parent_width: f32, parent_height: f32) {
    let row_count = layout.children.len();
    let gap = layout.node.style.gap.unwrap_or(0.0);
    let (pad_t, pad_r, pad_b, pad_l) = layout.node.style.padding_trbl();

    let explicit_width = layout.resolve_width(parent_width);
    let explicit_height = layout.resolve_height(parent_height);

    // Column count is the widest row, counting spans
    let num_cols = layout
        .children
        .iter()
        .map(|row| row.children.iter().map(|cell| cell.col_span()).sum::<usize>())
        .max()
        .unwrap_or(0);

    let width = explicit_width.unwrap_or(parent_width);
    if num_cols == 0 || row_count == 0 {
        layout.width = width;
        layout.height = explicit_height.unwrap_or(pad_t + pad_b);
        layout.table = Some(TableLayout::default());
        return;
    }

    let inner_available = (width - pad_l - pad_r).max(0.0);
    let mut col_widths = vec![0.0f32; num_cols];
    if let Some(ref defs) = layout.node.column_widths {
        for (i, dim) in defs.iter().enumerate().take(num_cols) {
            col_widths[i] = dim.resolve(inner_available);
        }
    }

    let total_col_gaps = gap * num_cols.saturating_sub(1) as f32;
    let specified_total: f32 = col_widths.iter().sum();
    let unspecified = col_widths.iter().filter(|w| **w == 0.0).count();
    let remaining = (inner_available - specified_total - total_col_gaps).max(0.0);
    let default_w = if unspecified > 0 { remaining / unspecified as f32 } else { 0.0 };
    for w in col_widths.iter_mut().filter(|w| **w == 0.0) {
        *w = default_w;
    }

    let mut row_heights = vec![0.0f32; row_count];
    for (row_idx, row) in layout.children.iter_mut().enumerate() {
        let mut col_idx = 0usize;
        for cell in row.children.iter_mut() {
            if col_idx >= num_cols {
                break;
            }
            let span = cell.col_span().min(num_cols - col_idx);
            let span_width = col_widths[col_idx..col_idx + span].iter().sum::<f32>()
                + gap * span.saturating_sub(1) as f32;

            measure_layout_with_parent(cell, span_width, 0.0);
            cell.width = span_width;
            row_heights[row_idx] = row_heights[row_idx].max(cell.outer_height());
            col_idx += span;
        }
    }

    let content_height = row_heights.iter().sum::<f32>() + gap * row_count.saturating_sub(1) as f32;

    layout.width = width;
    layout.height = explicit_height.unwrap_or(pad_t + content_height + pad_b);
    tracing::trace!(cols = num_cols, rows = row_count, height = layout.height, "table measured");
    layout.table = Some(TableLayout { column_widths: col_widths, row_heights });
}

// ============================================================================
// PLACE PASS
// ============================================================================

pub fn place_layout(layout: &mut LayoutBox, x: f32, y: f32) {
    layout.x = x;
    layout.y = y - layout.margin_top;

    match layout.node.node_type {
        NodeType::View | NodeType::Cell => place_container(layout),
        NodeType::Table => place_table(layout),
        NodeType::Row => {
            // Cells are positioned by place_table
        }
        NodeType::Text | NodeType::Image => {}
    }
}

fn place_container(layout: &mut LayoutBox) {
    let dir = layout.node.style.direction.unwrap_or(Direction::Column);
    let gap = layout.node.style.gap.unwrap_or(0.0);
    let (pad_t, pad_r, pad_b, pad_l) = layout.node.style.padding_trbl();
    let inner_w = layout.width - pad_l - pad_r;
    let inner_h = layout.height - pad_t - pad_b;

    match dir {
        Direction::Column => place_column(layout, inner_w, inner_h, gap, pad_t, pad_l),
        Direction::Row => place_row(layout, inner_w, inner_h, gap, pad_t, pad_l),
    }
}

fn place_table(layout: &mut LayoutBox) {
    let table_layout = match layout.table.clone() {
        Some(t) => t,
        None => return,
    };
    let cols = table_layout.column_widths.len();
    if cols == 0 {
        return;
    }

    let (pad_t, _pad_r, _pad_b, pad_l) = layout.node.style.padding_trbl();
    let gap = layout.node.style.gap.unwrap_or(0.0);
    let inner_width = table_layout.column_widths.iter().sum::<f32>() + gap * cols.saturating_sub(1) as f32;

    let start_x = layout.x + pad_l;
    let mut cursor_y = layout.y - pad_t;

    for (row_idx, row) in layout.children.iter_mut().enumerate() {
        let row_height = table_layout.row_heights.get(row_idx).copied().unwrap_or(0.0);

        // Rows are positioned for their own backgrounds/borders
        row.x = start_x;
        row.y = cursor_y;
        row.width = inner_width;
        row.height = row_height;

        let mut col_idx = 0usize;
        let mut cursor_x = start_x;
        for cell in row.children.iter_mut() {
            if col_idx >= cols {
                break;
            }
            let span = cell.col_span().min(cols - col_idx);
            let cell_width = table_layout.column_widths[col_idx..col_idx + span].iter().sum::<f32>()
                + gap * span.saturating_sub(1) as f32;

            // Cells stretch to the row height so borders line up
            cell.width = cell_width;
            cell.height = cell.height.max(row_height - cell.margin_top - cell.margin_bottom);
            place_layout(cell, cursor_x, cursor_y);

            cursor_x += cell_width + gap;
            col_idx += span;
        }

        cursor_y -= row_height + gap;
    }
}

fn place_column(layout: &mut LayoutBox, inner_w: f32, inner_h: f32, gap: f32, pad_t: f32, pad_l: f32) {
    let n = layout.children.len();
    if n == 0 {
        return;
    }
    let x = layout.x;
    let y = layout.y;
    let cross_align = layout.cross_align();
    let main_align = layout.main_align();

    let total_h = measure_column(&layout.children, gap);
    let free = (inner_h - total_h).max(0.0);
    let total_flex: f32 = layout.children.iter().map(|c| c.flex()).sum();
    let flex_unit = if total_flex > 0.0 { free / total_flex } else { 0.0 };
    let free = if total_flex > 0.0 { 0.0 } else { free };

    let (mut cursor_y, base_gap) = main_axis_start(main_align, y - pad_t, -1.0, free, gap, n);

    for (i, child) in layout.children.iter_mut().enumerate() {
        if child.flex() > 0.0 {
            child.height += flex_unit * child.flex();
        }

        let child_x = match cross_align {
            CrossAlign::Start | CrossAlign::Stretch => x + pad_l,
            CrossAlign::Center => x + pad_l + (inner_w - child.width) / 2.0,
            CrossAlign::End => x + pad_l + inner_w - child.width,
        };

        place_layout(child, child_x, cursor_y);

        cursor_y -= child.outer_height();
        if i < n - 1 {
            cursor_y -= base_gap;
        }
    }
}

fn place_row(layout: &mut LayoutBox, inner_w: f32, inner_h: f32, gap: f32, pad_t: f32, pad_l: f32) {
    let n = layout.children.len();
    if n == 0 {
        return;
    }
    let x = layout.x;
    let y = layout.y;
    let cross_align = layout.cross_align();
    let main_align = layout.main_align();

    let total_w = layout.children.iter().map(|c| c.width).sum::<f32>() + gap * (n - 1) as f32;
    let free = (inner_w - total_w).max(0.0);

    let (mut cursor_x, base_gap) = main_axis_start(main_align, x + pad_l, 1.0, free, gap, n);

    for (i, child) in layout.children.iter_mut().enumerate() {
        let child_y = match cross_align {
            CrossAlign::Start => y - pad_t,
            CrossAlign::Center => y - pad_t - (inner_h - child.outer_height()) / 2.0,
            CrossAlign::End => y - pad_t - (inner_h - child.outer_height()),
            CrossAlign::Stretch => {
                child.height = child.height.max(inner_h - child.margin_top - child.margin_bottom);
                y - pad_t
            }
        };

        place_layout(child, cursor_x, child_y);

        cursor_x += child.width;
        if i < n - 1 {
            cursor_x += base_gap;
        }
    }
}

/// Start offset and spacing along the main axis. `sign` is +1 for x, -1 for y.
fn main_axis_start(align: MainAlign, origin: f32, sign: f32, free: f32, gap: f32, n: usize) -> (f32, f32) {
    match align {
        MainAlign::Start => (origin, gap),
        MainAlign::Center => (origin + sign * free / 2.0, gap),
        MainAlign::End => (origin + sign * free, gap),
        MainAlign::SpaceBetween if n > 1 => (origin, gap + free / (n as f32 - 1.0)),
        MainAlign::SpaceBetween => (origin, gap),
    }
}
