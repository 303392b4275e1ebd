//! Data module - spreadsheet loading, cleaning and reshaping

mod coverage;
mod loader;
mod processor;
mod xlsx;

pub use loader::{DataLoader, LoaderError};
pub use processor::{
    DataProcessor, ProcessorError, CAMPAIGN, DENOMINATOR, NUMERATOR, PCT, REGION,
};

#[cfg(test)]
pub(crate) use processor::tests;
#[cfg(test)]
pub(crate) use xlsx::tests::workbook_bytes;
