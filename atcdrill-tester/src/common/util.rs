use atcdrill_engine::Viewport;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewportParseError {
    #[error("viewport must look like WIDTHxHEIGHT, got '{0}'")]
    Shape(String),
    #[error("viewport dimension '{0}' is not a positive number")]
    Dimension(String),
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse `1280x900` (also `1280X900` or `1280*900`) into a viewport.
pub fn parse_viewport(raw: &str) -> Result<Viewport, ViewportParseError> {
    let trimmed = raw.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X', '*'])
        .ok_or_else(|| ViewportParseError::Shape(trimmed.to_string()))?;
    let dimension = |part: &str| -> Result<f64, ViewportParseError> {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or_else(|| ViewportParseError::Dimension(part.trim().to_string()))
    };
    Ok(Viewport::new(dimension(w)?, dimension(h)?))
}
