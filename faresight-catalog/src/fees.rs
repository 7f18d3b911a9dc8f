use faresight_core::{FareError, FareResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Baseline ancillary fee per airline, fed to the models as a numeric feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeTable {
    /// Fee for airlines missing from `fees`
    pub default_fee: f64,

    /// Airline name (verbatim, as in training data) => fee
    pub fees: HashMap<String, f64>,
}

impl Default for FeeTable {
    fn default() -> Self {
        Self {
            default_fee: 0.0,
            fees: HashMap::new(),
        }
    }
}

impl FeeTable {
    pub fn new(fees: HashMap<String, f64>, default_fee: f64) -> FareResult<Self> {
        let table = Self { default_fee, fees };
        table.validate()?;
        Ok(table)
    }

    /// Fees are money amounts; negative or non-finite values are configuration mistakes.
    pub fn validate(&self) -> FareResult<()> {
        if !self.default_fee.is_finite() || self.default_fee < 0.0 {
            return Err(FareError::InvalidConfig(format!(
                "default fee must be a nonnegative number, got {}",
                self.default_fee
            )));
        }
        for (airline, fee) in &self.fees {
            if !fee.is_finite() || *fee < 0.0 {
                return Err(FareError::InvalidConfig(format!(
                    "fee for {} must be a nonnegative number, got {}",
                    airline, fee
                )));
            }
        }
        Ok(())
    }

    pub fn estimate(&self, airline: &str) -> f64 {
        self.fees.get(airline).copied().unwrap_or(self.default_fee)
    }
}
