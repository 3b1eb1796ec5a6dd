//! Named input series for entry signals: `close`, `ema_<n>`, `rsi_<n>`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Series {
    Close,
    Ema(usize),
    Rsi(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesParseError {
    #[error("unknown series `{0}` (expected close, ema_<period>, rsi_<period>)")]
    Unknown(String),
    #[error("series `{0}` needs a period >= 1")]
    BadPeriod(String),
}

impl Series {
    pub fn parse(name: &str) -> Result<Self, SeriesParseError> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("close") {
            return Ok(Self::Close);
        }
        let (kind, period) = name
            .split_once('_')
            .ok_or_else(|| SeriesParseError::Unknown(name.to_string()))?;
        let build: fn(usize) -> Series = match kind.to_ascii_lowercase().as_str() {
            "ema" => Series::Ema,
            "rsi" => Series::Rsi,
            _ => return Err(SeriesParseError::Unknown(name.to_string())),
        };
        match period.parse::<usize>() {
            Ok(p) if p >= 1 => Ok(build(p)),
            _ => Err(SeriesParseError::BadPeriod(name.to_string())),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Close => "close".to_string(),
            Self::Ema(p) => format!("ema_{p}"),
            Self::Rsi(p) => format!("rsi_{p}"),
        }
    }
}

impl std::fmt::Display for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

impl TryFrom<String> for Series {
    type Error = SeriesParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Series::parse(&value)
    }
}

impl From<Series> for String {
    fn from(value: Series) -> Self {
        value.name()
    }
}
