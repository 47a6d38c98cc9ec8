//! Energy Model
//!
//! Deterministic onboard-computation energy draw, applied to the vehicle's
//! battery every tick:
//!
//! ```text
//! energy_j         = C_eff * f^2 * dt
//! percent_consumed = energy_j / capacity_j * 100
//! remaining        = clamp(remaining - percent_consumed, 0, 100)
//! ```
//!
//! Pure logic module; the controller writes the result back to the vehicle
//! and raises the emergency landing when the low-battery flag is set.

use crate::vehicle::BatteryState;

/// Effective switched capacitance (farads)
pub const DEFAULT_EFFECTIVE_CAPACITANCE_F: f64 = 1.2e-9;

/// Simulated processor clock frequency (Hz)
pub const DEFAULT_CLOCK_FREQUENCY_HZ: f64 = 1000.0;

/// Remaining-battery threshold for emergency landing (percent)
pub const DEFAULT_LOW_BATTERY_PERCENT: f64 = 5.0;

/// Energy model constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyConfig {
    /// Effective switched capacitance (farads)
    pub effective_capacitance_f: f64,
    /// Clock frequency (Hz)
    pub clock_frequency_hz: f64,
    /// Emergency landing threshold (percent, inclusive)
    pub low_battery_percent: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            effective_capacitance_f: DEFAULT_EFFECTIVE_CAPACITANCE_F,
            clock_frequency_hz: DEFAULT_CLOCK_FREQUENCY_HZ,
            low_battery_percent: DEFAULT_LOW_BATTERY_PERCENT,
        }
    }
}

/// Figures from one applied energy update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyReport {
    /// Energy consumed this tick (joules)
    pub energy_j: f64,
    /// Battery percentage consumed this tick
    pub percent_consumed: f64,
    /// Remaining battery after the update (percent, clamped to 0-100)
    pub remaining_percent: f64,
    /// Remaining battery is at or below the emergency threshold
    pub low_battery: bool,
}

/// Reason an energy update was not applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnergyFault {
    /// Battery capacity is zero, negative or not finite
    InvalidCapacity { capacity_j: f64 },
}

/// Outcome of [`EnergyModel::update`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnergyUpdate {
    Applied(EnergyReport),
    Skipped(EnergyFault),
}

/// Per-tick battery consumption model
#[derive(Debug, Clone)]
pub struct EnergyModel {
    config: EnergyConfig,
    /// Energy consumed since the last reset (joules)
    total_energy_j: f64,
}

impl EnergyModel {
    pub fn new(config: EnergyConfig) -> Self {
        Self {
            config,
            total_energy_j: 0.0,
        }
    }

    pub fn config(&self) -> &EnergyConfig {
        &self.config
    }

    /// Energy drawn over `dt_s` seconds (joules)
    pub fn energy_for(&self, dt_s: f64) -> f64 {
        self.config.effective_capacitance_f
            * self.config.clock_frequency_hz
            * self.config.clock_frequency_hz
            * dt_s
    }

    /// Compute the battery state after `dt_s` seconds of load
    ///
    /// Skips the update (without touching the running total) when the
    /// capacity cannot be divided by.
    pub fn update(&mut self, battery: BatteryState, dt_s: f64) -> EnergyUpdate {
        let capacity_j = battery.capacity_j;
        if !capacity_j.is_finite() || capacity_j <= 0.0 {
            return EnergyUpdate::Skipped(EnergyFault::InvalidCapacity { capacity_j });
        }

        let energy_j = self.energy_for(dt_s.max(0.0));
        let percent_consumed = (energy_j / capacity_j) * 100.0;
        let remaining_percent = (battery.remaining_percent - percent_consumed).clamp(0.0, 100.0);

        self.total_energy_j += energy_j;

        EnergyUpdate::Applied(EnergyReport {
            energy_j,
            percent_consumed,
            remaining_percent,
            low_battery: remaining_percent <= self.config.low_battery_percent,
        })
    }

    /// Energy consumed since the last [`reset_total`](Self::reset_total)
    pub fn total_energy_j(&self) -> f64 {
        self.total_energy_j
    }

    /// Restart the running total (called at mission start)
    pub fn reset_total(&mut self) {
        self.total_energy_j = 0.0;
    }
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self::new(EnergyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery(remaining_percent: f64, capacity_j: f64) -> BatteryState {
        BatteryState {
            remaining_percent,
            capacity_j,
        }
    }

    fn applied(update: EnergyUpdate) -> EnergyReport {
        match update {
            EnergyUpdate::Applied(report) => report,
            EnergyUpdate::Skipped(fault) => panic!("update skipped: {:?}", fault),
        }
    }

    #[test]
    fn test_update_matches_formula_exactly() {
        let mut model = EnergyModel::default();
        let c_eff = DEFAULT_EFFECTIVE_CAPACITANCE_F;
        let f = DEFAULT_CLOCK_FREQUENCY_HZ;

        for &(remaining, capacity, dt) in &[
            (100.0, 0.5, 0.1),
            (42.0, 0.01, 0.25),
            (6.0, 1e-3, 1.0),
            (0.5, 2.0, 0.02),
        ] {
            let report = applied(model.update(battery(remaining, capacity), dt));
            let expected_energy = c_eff * f * f * dt;
            let expected_percent = (expected_energy / capacity) * 100.0;
            let expected_remaining = (remaining - expected_percent).clamp(0.0, 100.0);

            assert_eq!(report.energy_j, expected_energy);
            assert_eq!(report.percent_consumed, expected_percent);
            assert_eq!(report.remaining_percent, expected_remaining);
        }
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        let mut model = EnergyModel::default();
        // 1.2e-3 J drawn from a 1e-5 J battery is far more than 100%
        let report = applied(model.update(battery(3.0, 1e-5), 1.0));
        assert_eq!(report.remaining_percent, 0.0);
        assert!(report.low_battery);
    }

    #[test]
    fn test_remaining_clamps_at_hundred() {
        let mut model = EnergyModel::default();
        let report = applied(model.update(battery(150.0, 1.0), 0.1));
        assert_eq!(report.remaining_percent, 100.0);
    }

    #[test]
    fn test_low_battery_threshold_is_inclusive() {
        let config = EnergyConfig {
            effective_capacitance_f: 0.0,
            ..EnergyConfig::default()
        };
        let mut model = EnergyModel::new(config);

        let at_threshold = applied(model.update(battery(5.0, 1.0), 0.1));
        assert!(at_threshold.low_battery);

        let above = applied(model.update(battery(5.0001, 1.0), 0.1));
        assert!(!above.low_battery);
    }

    #[test]
    fn test_zero_capacity_skips_update() {
        let mut model = EnergyModel::default();
        let update = model.update(battery(50.0, 0.0), 0.1);
        assert_eq!(
            update,
            EnergyUpdate::Skipped(EnergyFault::InvalidCapacity { capacity_j: 0.0 })
        );
        assert_eq!(model.total_energy_j(), 0.0);
    }

    #[test]
    fn test_negative_and_nan_capacity_skip_update() {
        let mut model = EnergyModel::default();
        assert!(matches!(
            model.update(battery(50.0, -1.0), 0.1),
            EnergyUpdate::Skipped(_)
        ));
        assert!(matches!(
            model.update(battery(50.0, f64::NAN), 0.1),
            EnergyUpdate::Skipped(_)
        ));
    }

    #[test]
    fn test_total_energy_accumulates_and_resets() {
        let mut model = EnergyModel::default();
        for _ in 0..10 {
            model.update(battery(100.0, 1.0), 0.1);
        }
        let expected = model.energy_for(0.1) * 10.0;
        assert!((model.total_energy_j() - expected).abs() < 1e-15);

        model.reset_total();
        assert_eq!(model.total_energy_j(), 0.0);
    }
}
