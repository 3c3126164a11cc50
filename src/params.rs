//! User-facing parameter sets
//!
//! The parameter surface consumed by the data-store framework that sits on
//! top of the index: store construction parameters and dataset open
//! parameters. Validation happens here, at the boundary, so the core never
//! sees a malformed resolution or tolerance.

use crate::timerange::{normalize_time_range, TimeRangeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Pixel size in degrees at the finest resolution level.
pub const BASE_RESOLUTION_DEG: f64 = 360.0 / 8192.0;

/// Number of levels in the resolution ladder.
pub const NUM_RESOLUTION_LEVELS: u32 = 5;

/// Default time tolerance: ten minutes.
pub const DEFAULT_TIME_TOLERANCE: &str = "10T";

/// Pattern a time tolerance string must match: a count followed by one of
/// the offset unit codes N, U, L, S, T, H.
pub const TIME_TOLERANCE_PATTERN: &str = "^([1-9]*[0-9]*)[NULSTH]$";

/// Mis-typed or out-of-range user parameters; fatal at construction
#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },
}

/// Parameters for constructing a data store over an existing index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreParams {
    /// Path or URL of the index root
    pub index_path: String,

    /// Storage options for the index filesystem
    #[serde(default)]
    pub index_options: HashMap<String, serde_json::Value>,
}

/// Parameters for opening a dataset from the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenParams {
    /// Names of variables to include; all when absent
    #[serde(default)]
    pub variable_names: Option<Vec<String>>,

    /// Bounding box `[x1, y1, x2, y2]` in geographical coordinates
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,

    /// Spatial resolution in decimal degrees, one of
    /// [`OpenParams::resolution_ladder`]
    #[serde(default)]
    pub spatial_res: Option<f64>,

    /// Required time range `[from, to]`; either bound may be null
    pub time_range: (Option<String>, Option<String>),

    /// Time tolerance, e.g. `10T` for ten minutes
    #[serde(default = "default_time_tolerance")]
    pub time_tolerance: String,

    /// Maximum number of opened source products to cache
    #[serde(default)]
    pub cache_size: usize,
}

fn default_time_tolerance() -> String {
    DEFAULT_TIME_TOLERANCE.to_string()
}

fn tolerance_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(TIME_TOLERANCE_PATTERN)
            .unwrap_or_else(|e| panic!("invalid tolerance pattern: {e}"))
    })
}

impl OpenParams {
    /// Open everything in the given time range, defaults elsewhere.
    pub fn for_time_range(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            variable_names: None,
            bbox: None,
            spatial_res: None,
            time_range: (start.map(str::to_string), end.map(str::to_string)),
            time_tolerance: default_time_tolerance(),
            cache_size: 0,
        }
    }

    /// The valid spatial resolutions, one per level, finest first.
    pub fn resolution_ladder() -> Vec<f64> {
        (0..NUM_RESOLUTION_LEVELS)
            .map(|level| (1u32 << level) as f64 * BASE_RESOLUTION_DEG)
            .collect()
    }

    /// Check every supplied parameter against its constraints.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if let Some(bbox) = &self.bbox {
            if bbox.iter().any(|v| !v.is_finite()) {
                return Err(ParamsError::InvalidParam {
                    name: "bbox",
                    reason: "coordinates must be finite".to_string(),
                });
            }
            if bbox[0] > bbox[2] || bbox[1] > bbox[3] {
                return Err(ParamsError::InvalidParam {
                    name: "bbox",
                    reason: format!("lower corner must not exceed upper corner: {bbox:?}"),
                });
            }
        }

        if let Some(res) = self.spatial_res {
            let on_ladder = Self::resolution_ladder()
                .iter()
                .any(|step| (step - res).abs() < f64::EPSILON);
            if !on_ladder {
                return Err(ParamsError::InvalidParam {
                    name: "spatial_res",
                    reason: format!(
                        "{res} is not on the resolution ladder {:?}",
                        Self::resolution_ladder()
                    ),
                });
            }
        }

        if !tolerance_pattern().is_match(&self.time_tolerance) {
            return Err(ParamsError::InvalidParam {
                name: "time_tolerance",
                reason: format!(
                    "{:?} does not match {}",
                    self.time_tolerance, TIME_TOLERANCE_PATTERN
                ),
            });
        }

        Ok(())
    }

    /// Resolve the open-ended time range into closed UTC bounds.
    pub fn resolve_time_range(
        &self,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), TimeRangeError> {
        normalize_time_range(self.time_range.0.as_deref(), self.time_range.1.as_deref())
    }
}
