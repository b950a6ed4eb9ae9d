use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid point '{0}'. Expected three comma-separated numbers 'x,y,z' (e.g., '1.0,-2.5,0').")]
    InvalidPoint(String),

    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Component '{component}' cannot be empty in '{input}'.")]
    EmptyComponent {
        component: &'static str,
        input: String,
    },
}

/// Parses `x,y,z` into a point.
pub fn parse_point(input: &str) -> Result<Point3<f64>, ParseError> {
    let values = input
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ParseError::InvalidPoint(input.to_string()))?;
    match values.as_slice() {
        &[x, y, z] if values.iter().all(|v| v.is_finite()) => Ok(Point3::new(x, y, z)),
        _ => Err(ParseError::InvalidPoint(input.to_string())),
    }
}

/// Splits a `KEY=VALUE` override at its first `=`.
pub fn parse_key_value(input: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidKeyValue(input.to_string()))?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "KEY",
            input: input.to_string(),
        });
    }
    if value.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "VALUE",
            input: input.to_string(),
        });
    }
    Ok((key, value))
}
