//! Chart Description Module
//! A chart is plain data: titles, categories, panels and an ordered list of
//! layers. `ChartRenderer::draw` is the only code that turns it into pixels.

use plotters::style::RGBColor;
use thiserror::Error;

/// Bar fill colour.
pub const BAR_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue
/// Reference (target) line colour.
pub const TARGET_COLOR: RGBColor = RGBColor(231, 76, 60); // Red

pub const PALETTE: [RGBColor; 10] = [
    RGBColor(41, 128, 185),  // Dark Blue
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(255, 87, 34),   // Deep Orange
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Chart '{0}' has no data to plot")]
    EmptyChart(String),
    #[error("Chart '{chart}': category index {index} out of range ({len} categories)")]
    CategoryOutOfRange {
        chart: String,
        index: usize,
        len: usize,
    },
    #[error("Failed to render chart: {0}")]
    Render(String),
    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Bitmap buffer does not match {0}x{1}")]
    Buffer(u32, u32),
}

/// Get color for a group.
pub fn group_color(group_index: usize) -> RGBColor {
    PALETTE[group_index % PALETTE.len()]
}

/// Format a fraction as a percentage label, `0.8512` → `"85.12%"`.
///
/// Rounds to `decimals` places and drops trailing zeros, so `0.85` → `"85%"`.
pub fn percent_label(fraction: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (fraction * 100.0 * scale).round() / scale;
    let text = format!("{:.*}", decimals, rounded);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    format!("{}%", text)
}

/// One drawable layer, applied to every panel in list order.
#[derive(Debug, Clone, Copy)]
pub enum Layer {
    /// Vertical bar per datum; `margin` is the pixel gap on each side.
    Bars { color: RGBColor, margin: u32 },
    /// Horizontal line across the panel at `value`.
    ReferenceLine { value: f64, color: RGBColor, width: u32 },
    /// Marker per datum, coloured by group.
    Points { size: u32 },
    /// Segments joining a group's data in category order.
    Lines { width: u32 },
    /// Percentage text above each datum.
    Labels { decimals: usize, font_size: u32 },
}

/// One observation: x category, colour group and y value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    pub category: usize,
    pub group: usize,
    pub value: f64,
}

/// A sub-plot; a faceted chart has one per facet value.
#[derive(Debug, Clone, Default)]
pub struct Panel {
    pub title: Option<String>,
    pub data: Vec<Datum>,
}

/// Y axis range and display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YScale {
    pub min: f64,
    pub max: f64,
    /// Show ticks as percentages of a fraction.
    pub percent: bool,
}

impl Default for YScale {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.05,
            percent: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelRotation {
    #[default]
    None,
    Rotate90,
}

/// Complete description of one chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub subtitle: Option<String>,
    pub caption: Option<String>,
    pub x_desc: String,
    pub y_desc: String,
    pub categories: Vec<String>,
    pub panels: Vec<Panel>,
    pub layers: Vec<Layer>,
    pub y_scale: YScale,
    pub x_label_rotation: LabelRotation,
}

impl ChartSpec {
    pub fn builder(title: impl Into<String>) -> ChartSpecBuilder {
        ChartSpecBuilder::new(title)
    }

    /// Facet grid (rows, cols) for the panel count, as close to square as possible.
    pub fn grid(&self) -> (usize, usize) {
        let n = self.panels.len().max(1);
        let cols = (n as f64).sqrt().ceil() as usize;
        let rows = n.div_ceil(cols);
        (rows, cols)
    }
}

/// Builder for [`ChartSpec`].
#[derive(Debug, Clone)]
pub struct ChartSpecBuilder {
    spec: ChartSpec,
}

impl ChartSpecBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            spec: ChartSpec {
                title: title.into(),
                subtitle: None,
                caption: None,
                x_desc: String::new(),
                y_desc: String::new(),
                categories: Vec::new(),
                panels: Vec::new(),
                layers: Vec::new(),
                y_scale: YScale::default(),
                x_label_rotation: LabelRotation::None,
            },
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.spec.subtitle = Some(subtitle.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.spec.caption = Some(caption.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn axis_labels(mut self, x_desc: impl Into<String>, y_desc: impl Into<String>) -> Self {
        self.spec.x_desc = x_desc.into();
        self.spec.y_desc = y_desc.into();
        self
    }

    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.spec.categories = categories;
        self
    }

    pub fn panel(mut self, title: Option<String>, data: Vec<Datum>) -> Self {
        self.spec.panels.push(Panel { title, data });
        self
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.spec.layers.push(layer);
        self
    }

    pub fn y_scale(mut self, min: f64, max: f64, percent: bool) -> Self {
        self.spec.y_scale = YScale { min, max, percent };
        self
    }

    pub fn rotate_x_labels(mut self, rotation: LabelRotation) -> Self {
        self.spec.x_label_rotation = rotation;
        self
    }

    /// Validate and finish; every datum must point at an existing category.
    pub fn build(self) -> Result<ChartSpec, ChartError> {
        let spec = self.spec;
        if spec.categories.is_empty() || spec.panels.iter().all(|p| p.data.is_empty()) {
            return Err(ChartError::EmptyChart(spec.title));
        }

        let len = spec.categories.len();
        if let Some(d) = spec
            .panels
            .iter()
            .flat_map(|p| &p.data)
            .find(|d| d.category >= len)
        {
            return Err(ChartError::CategoryOutOfRange {
                chart: spec.title.clone(),
                index: d.category,
                len,
            });
        }

        Ok(spec)
    }
}
