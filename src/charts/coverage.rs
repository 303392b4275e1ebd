//! PCA coverage charts: regional summary bars and faceted campaign trend.

use crate::charts::layers::{
    ChartError, ChartSpec, Datum, LabelRotation, Layer, BAR_COLOR, TARGET_COLOR,
};
use crate::config::PipelineConfig;
use crate::stats::{Aggregator, RegionSummary, TrendPoint};
use std::collections::HashMap;

const Y_DESC: &str = "PCA Coverage";

/// Bar per region with the target line and a percentage label on each bar.
pub fn summary_chart(
    rows: &[RegionSummary],
    config: &PipelineConfig,
) -> Result<ChartSpec, ChartError> {
    let categories: Vec<String> = rows.iter().map(|r| r.region.clone()).collect();
    let data: Vec<Datum> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            r.pct.map(|value| Datum {
                category: i,
                group: 0,
                value,
            })
        })
        .collect();

    ChartSpec::builder(&config.text.summary_title)
        .subtitle(&config.text.subtitle)
        .caption(&config.text.caption)
        .axis_labels("Region", Y_DESC)
        .categories(categories)
        .panel(None, data)
        .layer(Layer::Bars {
            color: BAR_COLOR,
            margin: 12,
        })
        .layer(Layer::ReferenceLine {
            value: config.target,
            color: TARGET_COLOR,
            width: 2,
        })
        .layer(Layer::Labels {
            decimals: 2,
            font_size: 14,
        })
        .y_scale(0.0, config.y_max, true)
        .build()
}

/// One panel per region: coverage per campaign joined by a line, with the target line.
pub fn trend_chart(
    points: &[TrendPoint],
    config: &PipelineConfig,
) -> Result<ChartSpec, ChartError> {
    let categories = Aggregator::campaign_categories(points);
    let category_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // Regions in first-seen order, each with its own colour group
    let mut regions: Vec<&str> = Vec::new();
    let mut panels: HashMap<&str, Vec<Datum>> = HashMap::new();
    for p in points {
        let group = match regions.iter().position(|r| *r == p.region) {
            Some(group) => group,
            None => {
                regions.push(p.region.as_str());
                regions.len() - 1
            }
        };
        let data = panels.entry(p.region.as_str()).or_default();
        if let (Some(value), Some(&category)) = (p.pct, category_index.get(p.campaign.as_str())) {
            data.push(Datum {
                category,
                group,
                value,
            });
        }
    }

    let mut builder = ChartSpec::builder(&config.text.trend_title)
        .subtitle(&config.text.subtitle)
        .caption(&config.text.caption)
        .axis_labels("Campaign", Y_DESC)
        .categories(categories)
        .layer(Layer::ReferenceLine {
            value: config.target,
            color: TARGET_COLOR,
            width: 2,
        })
        .layer(Layer::Lines { width: 2 })
        .layer(Layer::Points { size: 4 })
        .layer(Layer::Labels {
            decimals: 2,
            font_size: 10,
        })
        .y_scale(0.0, config.y_max, true)
        .rotate_x_labels(LabelRotation::Rotate90);

    for region in &regions {
        let data = panels.remove(region).unwrap_or_default();
        builder = builder.panel(Some(region.to_string()), data);
    }

    builder.build()
}
