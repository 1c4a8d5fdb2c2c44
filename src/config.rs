//! Complete recognizer configuration.
//!
//! Every threshold the pipeline uses lives here; nothing is hard-coded in
//! the stages themselves. `Default` carries values calibrated for 720p
//! captures.

use crate::aggregate::AggregateConfig;
use crate::calibrate::CalibrationConfig;
use crate::classify::ClassifierConfig;
use crate::grid::GridConfig;
use crate::library::RarityPalette;
use crate::matcher::MatcherConfig;
use crate::util::IconMatchResult;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecognitionConfig {
    pub grid: GridConfig,
    pub classifier: ClassifierConfig,
    pub matcher: MatcherConfig,
    /// Border colors used by the adaptive grid and rarity shortlist.
    pub palette: RarityPalette,
    pub calibration: CalibrationConfig,
    pub aggregate: AggregateConfig,
}

impl RecognitionConfig {
    /// Checks every section, returning the first violation.
    pub fn validate(&self) -> IconMatchResult<()> {
        self.grid.validate()?;
        self.classifier.validate()?;
        self.matcher.validate()?;
        self.calibration.validate()?;
        self.aggregate.validate()
    }
}
