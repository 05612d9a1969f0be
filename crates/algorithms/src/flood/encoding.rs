//! Fixed-point depth encoding
//!
//! Depths are stored as millimetres in a `u16` with three reserved codes:
//!
//! | code          | meaning                 |
//! |---------------|-------------------------|
//! | 0             | dry                     |
//! | 1..=65533     | depth in mm             |
//! | 65534         | 65.534 m or deeper      |
//! | 65535         | no data                 |

/// Metres to stored units
pub const SCALE: f64 = 1000.0;
/// Dry land
pub const DRY: u16 = 0;
/// Depth at or beyond [`MAX_DEPTH`]
pub const CAPPED: u16 = 65534;
/// No estimate
pub const NODATA: u16 = u16::MAX;
/// Shallowest representable wet depth in metres
pub const MIN_DEPTH: f64 = 0.001;
/// Deepest representable depth in metres
pub const MAX_DEPTH: f64 = 65.534;

/// Encode a depth in metres.
///
/// Missing or NaN → [`NODATA`], `<= 0` → [`DRY`], `>= MAX_DEPTH` →
/// [`CAPPED`]. Other depths are rounded half-to-even to millimetres and
/// floored at 1 so a positive depth never reads as dry.
pub fn encode_depth(depth: Option<f64>) -> u16 {
    match depth {
        None => NODATA,
        Some(d) if d.is_nan() => NODATA,
        Some(d) if d <= 0.0 => DRY,
        Some(d) if d >= MAX_DEPTH => CAPPED,
        Some(d) => (d * SCALE).round_ties_even().clamp(1.0, CAPPED as f64) as u16,
    }
}

/// A decoded depth cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthClass {
    Dry,
    /// Depth in metres
    Depth(f64),
    Capped,
    NoData,
}

impl DepthClass {
    /// Depth in metres where one is known; capped cells report [`MAX_DEPTH`]
    pub fn meters(&self) -> Option<f64> {
        match self {
            DepthClass::Dry => Some(0.0),
            DepthClass::Depth(m) => Some(*m),
            DepthClass::Capped => Some(MAX_DEPTH),
            DepthClass::NoData => None,
        }
    }
}

pub fn decode_depth(code: u16) -> DepthClass {
    match code {
        DRY => DepthClass::Dry,
        CAPPED => DepthClass::Capped,
        NODATA => DepthClass::NoData,
        mm => DepthClass::Depth(mm as f64 / SCALE),
    }
}
