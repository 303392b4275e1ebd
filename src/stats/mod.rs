//! Stats module - summary and trend views of the cleaned coverage table

mod aggregator;

pub use aggregator::{
    Aggregator, CampaignOrder, RegionSummary, StatsError, TrendPoint,
};
