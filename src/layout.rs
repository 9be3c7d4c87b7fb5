use serde::{Deserialize, Serialize};

// ============================================================================
// NODE TYPES
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    View,
    Text,
    Image,
    Table,
    Row,
    Cell,
}

// ============================================================================
// OBJECT FIT
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFit {
    /// Scale to fit entirely within the box, may leave empty space
    #[default]
    Contain,
    /// Scale to fill the box, may crop
    Cover,
    /// Stretch to the box (distorts aspect ratio)
    Fill,
}

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Row,
    Column,
}

/// Main-axis alignment (justify-content)
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum MainAlign {
    Start,
    Center,
    End,
    SpaceBetween,
}

/// Cross-axis alignment (align-items)
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CrossAlign {
    Start,
    Center,
    End,
    Stretch,
}

/// Dimension value - fixed points or percentage of the parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Pt(f32),
    /// Percentage of parent dimension (0-100)
    Percent(f32),
}

impl Dimension {
    /// Resolve dimension to points given parent size
    pub fn resolve(&self, parent_size: f32) -> f32 {
        match self {
            Dimension::Pt(v) => *v,
            Dimension::Percent(p) => parent_size * p / 100.0,
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dimension::Pt(v) => serializer.serialize_f32(*v),
            Dimension::Percent(p) => serializer.serialize_str(&format!("{}%", p)),
        }
    }
}

// Accepts both numbers (points) and strings like "50%".
impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DimensionVisitor;

        impl<'de> Visitor<'de> for DimensionVisitor {
            type Value = Dimension;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number or a string like \"50%\"")
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Dimension::Pt(v as f32))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Dimension::Pt(v as f32))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Dimension::Pt(v as f32))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if let Some(percent_str) = v.strip_suffix('%') {
                    percent_str
                        .trim()
                        .parse::<f32>()
                        .map(Dimension::Percent)
                        .map_err(|_| de::Error::custom(format!("invalid percentage: {}", v)))
                } else {
                    v.trim()
                        .parse::<f32>()
                        .map(Dimension::Pt)
                        .map_err(|_| de::Error::custom(format!("invalid dimension: {}", v)))
                }
            }
        }

        deserializer.deserialize_any(DimensionVisitor)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

// ============================================================================
// COLOR
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub const fn black() -> Self {
        Color::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Color::rgb(255, 255, 255)
    }
}

// ============================================================================
// BORDER
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
pub struct BorderSide {
    pub width: f32,
    pub color: Color,
}

// ============================================================================
// STYLE
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Style {
    // --- Dimensions ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<Dimension>,

    // --- Flex ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_align: Option<MainAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_align: Option<CrossAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<f32>,
    /// flex-grow share of the remaining main-axis space
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex: Option<f32>,

    // --- Padding ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_top: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_right: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_bottom: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_left: Option<f32>,

    // --- Margin ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_top: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_bottom: Option<f32>,

    // --- Background ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,

    // --- Borders ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_top: Option<BorderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<BorderSide>,

    // --- Text ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,

    // --- Image ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_fit: Option<ObjectFit>,
}

impl Style {
    /// Padding as (top, right, bottom, left)
    pub fn padding_trbl(&self) -> (f32, f32, f32, f32) {
        let base = self.padding.unwrap_or(0.0);
        (
            self.padding_top.unwrap_or(base),
            self.padding_right.unwrap_or(base),
            self.padding_bottom.unwrap_or(base),
            self.padding_left.unwrap_or(base),
        )
    }

    /// Margin as (top, bottom); horizontal margins are not supported
    pub fn margin_tb(&self) -> (f32, f32) {
        (self.margin_top.unwrap_or(0.0), self.margin_bottom.unwrap_or(0.0))
    }

    /// Border sides as (top, right, bottom, left), falling back to the uniform border
    pub fn border_sides(&self) -> [Option<BorderSide>; 4] {
        let uniform = self.border_width.filter(|w| *w > 0.0).map(|width| BorderSide {
            width,
            color: self.border_color.unwrap_or_else(Color::black),
        });
        [
            self.border_top.or(uniform),
            uniform,
            self.border_bottom.or(uniform),
            uniform,
        ]
    }
}

// ============================================================================
// MARKUP NODE
// ============================================================================

/// One element of the document markup tree.
///
/// The serialized JSON form of a tree is the "markup" passed between the
/// template renderer and the capture engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarkupNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub style: Style,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MarkupNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Image source (data URL, http(s) URL or local path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<Dimension>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_span: Option<usize>,
}

impl MarkupNode {
    pub fn new(node_type: NodeType) -> Self {
        MarkupNode {
            node_type,
            id: None,
            style: Style::default(),
            children: Vec::new(),
            text: None,
            src: None,
            column_widths: None,
            col_span: None,
        }
    }

    pub fn view() -> Self {
        MarkupNode::new(NodeType::View)
    }

    pub fn row_view() -> Self {
        let mut node = MarkupNode::new(NodeType::View);
        node.style.direction = Some(Direction::Row);
        node
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut node = MarkupNode::new(NodeType::Text);
        node.text = Some(text.into());
        node
    }

    pub fn image(src: impl Into<String>) -> Self {
        let mut node = MarkupNode::new(NodeType::Image);
        node.src = Some(src.into());
        node
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn styled(mut self, f: impl FnOnce(&mut Style)) -> Self {
        f(&mut self.style);
        self
    }

    pub fn child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = MarkupNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Parse serialized markup.
    pub fn parse(markup: &str) -> Result<MarkupNode, serde_json::Error> {
        serde_json::from_str(markup)
    }

    /// Serialize to markup. Field order is fixed, so equal trees give equal strings.
    pub fn to_markup(&self) -> String {
        // Serializing plain data with string keys cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Depth-first search for the node carrying `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&MarkupNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_id(id))
    }

    /// Image sources referenced anywhere in this subtree, in document order, deduplicated.
    pub fn image_sources(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_image_sources(&mut out);
        out
    }

    fn collect_image_sources(&self, out: &mut Vec<String>) {
        if self.node_type == NodeType::Image {
            if let Some(src) = self.src.as_ref().filter(|s| !s.is_empty()) {
                if !out.contains(src) {
                    out.push(src.clone());
                }
            }
        }
        for child in &self.children {
            child.collect_image_sources(out);
        }
    }
}
