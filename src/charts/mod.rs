//! Charts module - chart descriptions and static rendering

pub mod coverage;
mod layers;
mod renderer;

pub use layers::{ChartError, ChartSpec};
pub use renderer::ChartRenderer;

#[cfg(test)]
pub(crate) use layers::{Datum, Layer};
#[cfg(test)]
pub(crate) use renderer::tests::fonts_available;
