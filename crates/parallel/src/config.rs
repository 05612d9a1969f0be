//! Engine configuration
//!
//! All sections are optional and fall back to the production defaults:
//!
//! ```json
//! {
//!   "classes": { "nodata": 0, "dry": 2, "wet": 3 },
//!   "strategy": { "method": "thin_plate_spline", "averaging_constant": 60, "neighbors": 100 },
//!   "processing": "parallel"
//! }
//! ```

use serde::{Deserialize, Serialize};

use fwdet_algorithms::flood::{FwdetEstimator, StrategyConfig};
use fwdet_core::{MaskClasses, Result};

use crate::engine::FloodDepthEngine;
use crate::strategy::ProcessingMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FwdetConfig {
    pub classes: MaskClasses,
    pub strategy: StrategyConfig,
    pub processing: ProcessingMode,
}

impl FwdetConfig {
    pub fn validate(&self) -> Result<()> {
        self.classes.validate()?;
        self.strategy.validate()?;
        self.processing.validate()
    }

    pub fn build_estimator(&self) -> Result<FwdetEstimator> {
        FwdetEstimator::from_config(&self.strategy)?.with_classes(self.classes)
    }

    pub fn build_engine(&self) -> Result<FloodDepthEngine> {
        self.processing.validate()?;
        Ok(FloodDepthEngine::new(self.build_estimator()?).with_mode(self.processing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwdet_algorithms::interpolation::TpsParams;

    #[test]
    fn test_empty_config_is_default() {
        let config: FwdetConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FwdetConfig::default());
        assert_eq!(
            config.strategy,
            StrategyConfig::ThinPlateSpline(TpsParams::default())
        );
        assert_eq!(config.processing, ProcessingMode::Parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let config: FwdetConfig = serde_json::from_str(
            r#"{
                "classes": { "nodata": 0, "dry": 1, "wet": 200 },
                "strategy": { "method": "kriging", "averaging_constant": 300 },
                "processing": { "parallel_with": 2 }
            }"#,
        )
        .unwrap();
        let engine = config.build_engine().unwrap();
        assert_eq!(engine.mode(), ProcessingMode::ParallelWith(2));
        assert_eq!(engine.estimator().strategy().name(), "kriging");
        assert!(engine.estimator().classes().is_wet(200));
    }

    #[test]
    fn test_conflicting_codes_rejected() {
        let config: FwdetConfig =
            serde_json::from_str(r#"{ "classes": { "dry": 3, "wet": 3 } }"#).unwrap();
        assert!(config.validate().is_err());
        assert!(config.build_estimator().is_err());
    }

    #[test]
    fn test_empty_thread_pool_rejected() {
        let config: FwdetConfig =
            serde_json::from_str(r#"{ "processing": { "parallel_with": 0 } }"#).unwrap();
        assert!(config.validate().is_err());
        assert!(config.build_engine().is_err());
    }
}
