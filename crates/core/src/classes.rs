//! Class codes of the wet/dry/nodata classification mask

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Classification of a single mask cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellClass {
    NoData,
    Dry,
    Wet,
}

/// Code table mapping mask values to [`CellClass`].
///
/// Any code that matches none of the three is treated as nodata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskClasses {
    pub nodata: u8,
    pub dry: u8,
    pub wet: u8,
}

impl Default for MaskClasses {
    fn default() -> Self {
        Self {
            nodata: 0,
            dry: 2,
            wet: 3,
        }
    }
}

impl MaskClasses {
    pub fn new(nodata: u8, dry: u8, wet: u8) -> Result<Self> {
        let classes = Self { nodata, dry, wet };
        classes.validate()?;
        Ok(classes)
    }

    /// Codes must be pairwise distinct
    pub fn validate(&self) -> Result<()> {
        if self.nodata == self.dry || self.nodata == self.wet || self.dry == self.wet {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: format!("{{{}, {}, {}}}", self.nodata, self.dry, self.wet),
                reason: "nodata, dry and wet codes must differ".into(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn classify(&self, code: u8) -> CellClass {
        if code == self.wet {
            CellClass::Wet
        } else if code == self.dry {
            CellClass::Dry
        } else {
            CellClass::NoData
        }
    }

    #[inline]
    pub fn is_wet(&self, code: u8) -> bool {
        code == self.wet
    }

    #[inline]
    pub fn is_dry(&self, code: u8) -> bool {
        code == self.dry
    }
}
