//! Static Chart Renderer
//! Draws a [`ChartSpec`] with plotters and encodes it as PNG.
//!
//! Layout:
//! 1. Header: title, optional subtitle underneath
//! 2. Body: one panel, or a near-square grid of facet panels sharing the
//!    y scale and the x categories
//! 3. Footer: optional caption

use crate::charts::layers::{
    group_color, percent_label, ChartError, ChartSpec, Datum, LabelRotation, Layer, Panel,
};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::BTreeMap;
use std::io::Cursor;

const FONT: &str = "sans-serif";
const TITLE_SIZE: f64 = 26.0;
const SUBTITLE_SIZE: f64 = 17.0;
const CAPTION_SIZE: f64 = 13.0;
const AXIS_SIZE: f64 = 13.0;
const PANEL_TITLE_SIZE: f64 = 15.0;
const TEXT_COLOR: RGBColor = RGBColor(40, 40, 40);
/// Dash and gap length of reference lines, in pixels.
const DASH: (u32, u32) = (10, 6);

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

pub struct ChartRenderer;

impl ChartRenderer {
    /// Render a chart into PNG bytes of exactly `width` x `height` pixels.
    pub fn render_png(spec: &ChartSpec, width: u32, height: u32) -> Result<Vec<u8>, ChartError> {
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            Self::draw(spec, &root)?;
            root.present().map_err(render_err)?;
        }

        let image =
            RgbImage::from_raw(width, height, buffer).ok_or(ChartError::Buffer(width, height))?;
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }

    /// Draw a chart onto any plotters drawing area.
    pub fn draw<DB: DrawingBackend>(
        spec: &ChartSpec,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<(), ChartError> {
        root.fill(&WHITE).map_err(render_err)?;
        let (_, height) = root.dim_in_pixel();

        let header_h: u32 = if spec.subtitle.is_some() { 78 } else { 50 };
        let footer_h: u32 = if spec.caption.is_some() { 30 } else { 8 };
        let (header, rest) = root.split_vertically(header_h);
        let (body, footer) = rest.split_vertically(height.saturating_sub(header_h + footer_h));

        let title_style = TextStyle::from((FONT, TITLE_SIZE).into_font().style(FontStyle::Bold))
            .color(&TEXT_COLOR);
        header
            .draw_text(&spec.title, &title_style, (20, 12))
            .map_err(render_err)?;
        if let Some(subtitle) = &spec.subtitle {
            let style = TextStyle::from((FONT, SUBTITLE_SIZE).into_font()).color(&TEXT_COLOR);
            header
                .draw_text(subtitle, &style, (20, 48))
                .map_err(render_err)?;
        }
        if let Some(caption) = &spec.caption {
            let style = TextStyle::from((FONT, CAPTION_SIZE).into_font().style(FontStyle::Italic))
                .color(&RGBColor(110, 110, 110));
            footer
                .draw_text(caption, &style, (20, 8))
                .map_err(render_err)?;
        }

        let cells = body.split_evenly(spec.grid());
        for (panel, area) in spec.panels.iter().zip(cells.iter()) {
            Self::draw_panel(spec, panel, area)?;
        }

        Ok(())
    }

    /// Pixel height reserved under a panel for the x tick labels and description.
    fn x_label_area(spec: &ChartSpec) -> u32 {
        match spec.x_label_rotation {
            LabelRotation::None => 45,
            LabelRotation::Rotate90 => {
                let longest = spec
                    .categories
                    .iter()
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0) as u32;
                (longest as f64 * AXIS_SIZE * 0.6) as u32 + 30
            }
        }
    }

    fn draw_panel<DB: DrawingBackend>(
        spec: &ChartSpec,
        panel: &Panel,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<(), ChartError> {
        let n = spec.categories.len() as i32;
        let scale = spec.y_scale;

        let mut builder = ChartBuilder::on(area);
        builder
            .margin(10)
            .x_label_area_size(Self::x_label_area(spec))
            .y_label_area_size(60);
        if let Some(title) = &panel.title {
            builder.caption(title, (FONT, PANEL_TITLE_SIZE).into_font().style(FontStyle::Bold));
        }
        let mut chart = builder
            .build_cartesian_2d((0..n).into_segmented(), scale.min..scale.max)
            .map_err(render_err)?;

        let categories = &spec.categories;
        let x_formatter = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) => categories.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        let y_formatter = |v: &f64| {
            if scale.percent {
                format!("{:.0}%", v * 100.0)
            } else {
                format!("{:.2}", v)
            }
        };

        let mut x_style = TextStyle::from((FONT, AXIS_SIZE).into_font()).color(&TEXT_COLOR);
        if spec.x_label_rotation == LabelRotation::Rotate90 {
            x_style = x_style.transform(FontTransform::Rotate90);
        }

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n as usize)
            .x_label_formatter(&x_formatter)
            .x_label_style(x_style)
            .y_labels(12)
            .y_label_formatter(&y_formatter)
            .y_label_style((FONT, AXIS_SIZE))
            .x_desc(spec.x_desc.as_str())
            .y_desc(spec.y_desc.as_str())
            .axis_desc_style((FONT, AXIS_SIZE + 1.0))
            .draw()
            .map_err(render_err)?;

        let at = |d: &Datum| (SegmentValue::CenterOf(d.category as i32), d.value);

        for layer in &spec.layers {
            match *layer {
                Layer::Bars { color, margin } => {
                    chart
                        .draw_series(
                            Histogram::vertical(&chart)
                                .style(color.filled())
                                .margin(margin)
                                .data(panel.data.iter().map(|d| (d.category as i32, d.value))),
                        )
                        .map_err(render_err)?;
                }
                Layer::ReferenceLine {
                    value,
                    color,
                    width,
                } => {
                    chart
                        .draw_series(DashedLineSeries::new(
                            [(SegmentValue::Exact(0), value), (SegmentValue::Last, value)],
                            DASH.0,
                            DASH.1,
                            color.stroke_width(width),
                        ))
                        .map_err(render_err)?;
                }
                Layer::Points { size } => {
                    chart
                        .draw_series(panel.data.iter().map(|d| {
                            Circle::new(at(d), size, group_color(d.group).filled())
                        }))
                        .map_err(render_err)?;
                }
                Layer::Lines { width } => {
                    for (group, data) in Self::by_group(&panel.data) {
                        chart
                            .draw_series(LineSeries::new(
                                data.into_iter().map(at),
                                group_color(group).stroke_width(width),
                            ))
                            .map_err(render_err)?;
                    }
                }
                Layer::Labels {
                    decimals,
                    font_size,
                } => {
                    let style = TextStyle::from((FONT, font_size as f64).into_font())
                        .color(&TEXT_COLOR)
                        .pos(Pos::new(HPos::Center, VPos::Bottom));
                    chart
                        .draw_series(panel.data.iter().map(|d| {
                            EmptyElement::at(at(d))
                                + Text::new(percent_label(d.value, decimals), (0, -6), style.clone())
                        }))
                        .map_err(render_err)?;
                }
            }
        }

        Ok(())
    }

    /// Split data by colour group, each sorted by category.
    fn by_group(data: &[Datum]) -> BTreeMap<usize, Vec<&Datum>> {
        let mut groups: BTreeMap<usize, Vec<&Datum>> = BTreeMap::new();
        for d in data {
            groups.entry(d.group).or_default().push(d);
        }
        for points in groups.values_mut() {
            points.sort_by_key(|d| d.category);
        }
        groups
    }
}
