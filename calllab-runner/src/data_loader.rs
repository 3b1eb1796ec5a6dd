//! Candle loading for the runner.
//!
//! Candles come from CSV files with the header
//! `timestamp,open,high,low,close,volume` (timestamp in epoch milliseconds),
//! one file per token, or from a seeded synthetic random walk.
//!
//! The loader never repairs data. Malformed candles are passed through and
//! rejected by the engine with the offending index.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use calllab_core::domain::Candle;

/// Synthetic series start at 2023-11-14T22:13:20Z, one candle every 5 minutes.
const SYNTHETIC_START_MS: i64 = 1_700_000_000_000;
const SYNTHETIC_STEP_MS: i64 = 300_000;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("bad candle CSV {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{} contains no candles", .path.display())]
    Empty { path: PathBuf },
}

/// The candle series of one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenCandles {
    pub token: String,
    pub candles: Vec<Candle>,
}

/// Parse candles from any CSV reader.
pub fn read_candles<R: io::Read>(reader: R) -> Result<Vec<Candle>, csv::Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect()
}

/// Write candles as CSV, header included.
pub fn write_candles<W: io::Write>(writer: W, candles: &[Candle]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for candle in candles {
        wtr.serialize(candle)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Load one token's candles from a CSV file. The token id is the file stem.
pub fn load_token(path: &Path) -> Result<TokenCandles, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let candles = read_candles(io::BufReader::new(file)).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    if candles.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    let token = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(TokenCandles { token, candles })
}

/// Load several tokens, preserving argument order.
pub fn load_tokens(paths: &[PathBuf]) -> Result<Vec<TokenCandles>, LoadError> {
    paths.iter().map(|p| load_token(p)).collect()
}

pub fn save_candles(path: &Path, candles: &[Candle]) -> Result<(), LoadError> {
    let file = std::fs::File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_candles(io::BufWriter::new(file), candles).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Deterministic sub-seed for a token under a master seed.
///
/// Derived by hashing, so the seed of one token does not depend on which
/// other tokens are generated or in what order.
pub fn token_seed(master_seed: u64, token: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(token.as_bytes());
    let hash = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// Generate a synthetic random-walk candle series for demos and tests.
///
/// Same `(master_seed, token, n)` always yields the same candles. Every
/// generated candle passes the engine's integrity checks.
pub fn synthetic_candles(master_seed: u64, token: &str, n: usize) -> TokenCandles {
    let mut rng = StdRng::seed_from_u64(token_seed(master_seed, token));
    let mut price = 0.001_f64;

    let candles = (0..n)
        .map(|i| {
            let ret: f64 = rng.gen_range(-0.05..0.055);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.04));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.04));
            let volume = rng.gen_range(1_000.0..50_000.0);
            price = close;
            Candle::new(
                SYNTHETIC_START_MS + i as i64 * SYNTHETIC_STEP_MS,
                open,
                high,
                low,
                close,
                volume,
            )
        })
        .collect();

    TokenCandles {
        token: token.to_string(),
        candles,
    }
}
