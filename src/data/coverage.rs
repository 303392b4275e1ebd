//! PCA Coverage Field Parser
//! Splits `"<pct>%(<numerator>/<denominator>)"` into its three numbers.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoverageParseError {
    #[error("missing '%' before '('")]
    MissingPercent,
    #[error("missing '('")]
    MissingOpenParen,
    #[error("missing ')'")]
    MissingCloseParen,
    #[error("missing '/' between numerator and denominator")]
    MissingSlash,
    #[error("'{0}' is not a number")]
    NotNumeric(String),
    #[error("negative count '{0}'")]
    NegativeCount(String),
}

/// One parsed coverage cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    /// Percentage as written, e.g. `90.5` for `"90.50%"`.
    pub pct: f64,
    pub numerator: i64,
    pub denominator: i64,
}

impl Coverage {
    /// Parse a composite coverage string such as `"1,234.50%(2,469/2,000)"`.
    pub fn parse(raw: &str) -> Result<Self, CoverageParseError> {
        let value = raw.trim();

        let (pct_part, rest) = value
            .split_once('(')
            .ok_or(CoverageParseError::MissingOpenParen)?;
        let pct_part = pct_part
            .trim_end()
            .strip_suffix('%')
            .ok_or(CoverageParseError::MissingPercent)?;
        let rest = rest
            .trim_end()
            .strip_suffix(')')
            .ok_or(CoverageParseError::MissingCloseParen)?;
        let (num_part, den_part) = rest
            .split_once('/')
            .ok_or(CoverageParseError::MissingSlash)?;

        Ok(Coverage {
            pct: parse_number(pct_part)?,
            numerator: parse_count(num_part)?,
            denominator: parse_count(den_part)?,
        })
    }
}

fn strip_separators(part: &str) -> String {
    part.trim().chars().filter(|&c| c != ',').collect()
}

fn parse_number(part: &str) -> Result<f64, CoverageParseError> {
    let cleaned = strip_separators(part);
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoverageParseError::NotNumeric(part.trim().to_string()))
}

/// Counts are integer valued; `"1,200.0"` is accepted, `"12.5"` is not.
fn parse_count(part: &str) -> Result<i64, CoverageParseError> {
    let cleaned = strip_separators(part);
    let not_numeric = || CoverageParseError::NotNumeric(part.trim().to_string());

    let value = match cleaned.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let v = cleaned.parse::<f64>().map_err(|_| not_numeric())?;
            if !v.is_finite() || v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
                return Err(not_numeric());
            }
            v as i64
        }
    };

    if value < 0 {
        return Err(CoverageParseError::NegativeCount(part.trim().to_string()));
    }
    Ok(value)
}
