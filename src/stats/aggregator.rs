//! Coverage Aggregator Module
//! Builds the per-region summary view and the per-region trend view.

use crate::config::UnknownCampaignPolicy;
use crate::data::{CAMPAIGN, DENOMINATOR, NUMERATOR, PCT, REGION};
use crate::error::ErrorKind;
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Ordinal position column added by the trend view.
pub const CAMPAIGN_ORDER: &str = "campaign_order";

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Unknown campaign '{0}' (not in the configured campaign order)")]
    UnknownCampaign(String),
}

impl StatsError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Format
    }
}

/// Closed, ordered set of campaign labels.
#[derive(Debug, Clone)]
pub struct CampaignOrder {
    labels: Vec<String>,
    policy: UnknownCampaignPolicy,
}

impl CampaignOrder {
    pub fn new(labels: &[String], policy: UnknownCampaignPolicy) -> Self {
        Self {
            labels: labels.to_vec(),
            policy,
        }
    }

    /// Position of every campaign in `campaigns`.
    ///
    /// Known labels keep their configured index; unknown ones follow in
    /// first-seen order unless the policy rejects them.
    pub fn positions<'a>(
        &self,
        campaigns: impl IntoIterator<Item = &'a str>,
    ) -> Result<HashMap<String, u32>, StatsError> {
        let mut positions: HashMap<String, u32> = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i as u32))
            .collect();
        let mut next = self.labels.len() as u32;

        for campaign in campaigns {
            if positions.contains_key(campaign) {
                continue;
            }
            match self.policy {
                UnknownCampaignPolicy::Reject => {
                    return Err(StatsError::UnknownCampaign(campaign.to_string()))
                }
                UnknownCampaignPolicy::Append => {
                    warn!(campaign, position = next, "unknown campaign appended after known rounds");
                    positions.insert(campaign.to_string(), next);
                    next += 1;
                }
            }
        }

        Ok(positions)
    }
}

/// One row of the summary view.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub region: String,
    pub numerator: i64,
    pub denominator: i64,
    /// `numerator / denominator`; `None` when nothing was assessed.
    pub pct: Option<f64>,
}

/// One row of the trend view.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub region: String,
    pub campaign: String,
    pub order: u32,
    pub pct: Option<f64>,
}

fn fraction(numerator: Option<i64>, denominator: Option<i64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0 => Some(n as f64 / d as f64),
        _ => None,
    }
}

/// Derives the two chart views from the cleaned long table.
pub struct Aggregator;

impl Aggregator {
    /// Sum counts per region (first-seen order) and recompute the percentage.
    ///
    /// Output columns: [`Region`, `numerator`, `denominator`, `pct`].
    pub fn summary_view(df: &DataFrame) -> Result<DataFrame, StatsError> {
        let sums = df
            .clone()
            .lazy()
            .group_by_stable([col(REGION)])
            .agg([
                col(NUMERATOR).fill_null(lit(0i64)).sum().alias(NUMERATOR),
                col(DENOMINATOR).fill_null(lit(0i64)).sum().alias(DENOMINATOR),
            ])
            .collect()?;

        let numerators = sums.column(NUMERATOR)?.i64()?;
        let denominators = sums.column(DENOMINATOR)?.i64()?;
        let pct: Vec<Option<f64>> = numerators
            .into_iter()
            .zip(denominators)
            .map(|(n, d)| fraction(n, d))
            .collect();

        let mut summary = sums;
        summary.with_column(Column::new(PCT.into(), pct))?;
        Ok(summary)
    }

    /// Recompute `pct` per row as a fraction and tag each campaign with its position.
    ///
    /// Output columns: [`Region`, `Campaign`, `campaign_order`, `pct`,
    /// `numerator`, `denominator`], in the cleaned table's row order.
    pub fn trend_view(df: &DataFrame, order: &CampaignOrder) -> Result<DataFrame, StatsError> {
        let campaigns = df.column(CAMPAIGN)?.str()?;
        let positions = order.positions(campaigns.into_iter().flatten())?;

        let ordinals: Vec<Option<u32>> = campaigns
            .into_iter()
            .map(|c| c.and_then(|c| positions.get(c).copied()))
            .collect();

        let numerators = df.column(NUMERATOR)?.i64()?;
        let denominators = df.column(DENOMINATOR)?.i64()?;
        let pct: Vec<Option<f64>> = numerators
            .into_iter()
            .zip(denominators)
            .map(|(n, d)| fraction(n, d))
            .collect();

        let trend = DataFrame::new(vec![
            df.column(REGION)?.clone(),
            df.column(CAMPAIGN)?.clone(),
            Column::new(CAMPAIGN_ORDER.into(), ordinals),
            Column::new(PCT.into(), pct),
            df.column(NUMERATOR)?.clone(),
            df.column(DENOMINATOR)?.clone(),
        ])?;

        Ok(trend)
    }

    /// Typed rows of a summary view.
    pub fn summary_rows(summary: &DataFrame) -> Result<Vec<RegionSummary>, StatsError> {
        let regions = summary.column(REGION)?.str()?;
        let numerators = summary.column(NUMERATOR)?.i64()?;
        let denominators = summary.column(DENOMINATOR)?.i64()?;
        let pct = summary.column(PCT)?.f64()?;

        let rows = (0..summary.height())
            .map(|i| RegionSummary {
                region: regions.get(i).unwrap_or_default().to_string(),
                numerator: numerators.get(i).unwrap_or(0),
                denominator: denominators.get(i).unwrap_or(0),
                pct: pct.get(i),
            })
            .collect();
        Ok(rows)
    }

    /// Typed rows of a trend view, sorted by campaign position within each region.
    ///
    /// Regions keep their first-seen order.
    pub fn trend_points(trend: &DataFrame) -> Result<Vec<TrendPoint>, StatsError> {
        let regions = trend.column(REGION)?.str()?;
        let campaigns = trend.column(CAMPAIGN)?.str()?;
        let ordinals = trend.column(CAMPAIGN_ORDER)?.u32()?;
        let pct = trend.column(PCT)?.f64()?;

        let mut region_rank: HashMap<&str, usize> = HashMap::new();
        let mut points: Vec<(usize, TrendPoint)> = Vec::with_capacity(trend.height());
        for i in 0..trend.height() {
            let region = regions.get(i).unwrap_or_default();
            let next_rank = region_rank.len();
            let rank = *region_rank.entry(region).or_insert(next_rank);
            points.push((
                rank,
                TrendPoint {
                    region: region.to_string(),
                    campaign: campaigns.get(i).unwrap_or_default().to_string(),
                    order: ordinals.get(i).unwrap_or(u32::MAX),
                    pct: pct.get(i),
                },
            ));
        }

        points.sort_by_key(|(rank, p)| (*rank, p.order));
        Ok(points.into_iter().map(|(_, p)| p).collect())
    }

    /// Campaign labels present in the trend view, in position order.
    pub fn campaign_categories(points: &[TrendPoint]) -> Vec<String> {
        let mut labels: Vec<(u32, &str)> = points
            .iter()
            .map(|p| (p.order, p.campaign.as_str()))
            .collect();
        labels.sort();
        labels.dedup();
        labels.into_iter().map(|(_, c)| c.to_string()).collect()
    }
}
