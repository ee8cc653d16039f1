//! Price samples and chronological train/validation splitting.

use gridlab_core::domain::Kline;
use serde::{Deserialize, Serialize};

/// An independent, chronologically ordered run of price bars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    bars: Vec<Kline>,
}

impl PriceSample {
    pub fn new(bars: Vec<Kline>) -> Self {
        Self { bars }
    }

    pub fn bars(&self) -> &[Kline] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Strictly increasing bar starts.
    pub fn is_ordered(&self) -> bool {
        self.bars.windows(2).all(|pair| pair[0].start < pair[1].start)
    }

    /// Split into a training prefix and validation suffix at `pct` of the
    /// bars.
    ///
    /// `pct == 0.0` means no split at all: training and validation are
    /// the identical full sample. `pct == 1.0` is all-train with an empty
    /// validation suffix. Anything between cuts the sample so prefix and
    /// suffix reconstruct it with no gap or overlap.
    pub fn split(&self, pct: f64) -> SampleSplit {
        if pct <= 0.0 {
            return SampleSplit {
                training: self.clone(),
                validation: self.clone(),
            };
        }
        let cut = ((self.bars.len() as f64) * pct.min(1.0)).floor() as usize;
        let cut = cut.min(self.bars.len());
        SampleSplit {
            training: PriceSample::new(self.bars[..cut].to_vec()),
            validation: PriceSample::new(self.bars[cut..].to_vec()),
        }
    }
}

/// The two chronological halves of a split sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSplit {
    pub training: PriceSample,
    pub validation: PriceSample,
}
