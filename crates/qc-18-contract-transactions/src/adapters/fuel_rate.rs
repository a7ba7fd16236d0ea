//! Fuel rate providers.

use crate::domain::value_objects::BlockHeight;
use crate::ports::outbound::FuelRateProvider;
use std::collections::BTreeMap;

/// Same fuel rate at every height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedFuelRate(pub u64);

impl FuelRateProvider for FixedFuelRate {
    fn fuel_rate(&self, _height: BlockHeight) -> u64 {
        self.0
    }
}

/// Step-function fuel rate: each entry applies from its height onward.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuelRateSchedule {
    initial: u64,
    changes: BTreeMap<BlockHeight, u64>,
}

impl FuelRateSchedule {
    /// Schedule starting at `initial`.
    pub fn new(initial: u64) -> Self {
        Self {
            initial,
            changes: BTreeMap::new(),
        }
    }

    /// Sets the rate from `height` onward.
    #[must_use]
    pub fn with_change(mut self, height: BlockHeight, rate: u64) -> Self {
        self.changes.insert(height, rate);
        self
    }
}

impl FuelRateProvider for FuelRateSchedule {
    fn fuel_rate(&self, height: BlockHeight) -> u64 {
        self.changes
            .range(..=height)
            .next_back()
            .map_or(self.initial, |(_, rate)| *rate)
    }
}
