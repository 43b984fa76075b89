//! System-wide constants for the Selene simulator workspace.
//!
//! Single source of truth for numeric limits, tolerances and default paths.

/// Default simulation tick rate in Hz (dwell = 100 ms).
pub const DEFAULT_TICK_RATE_HZ: f64 = 10.0;

/// Distance below which a motor is considered to be at its target.
pub const MOTION_EPSILON: f64 = 1e-9;

/// Guard added before truncating the step count so that floating-point
/// remainders (e.g. `7.999999999`) do not drop a whole step.
pub const STEP_ROUNDING_GUARD: f64 = 1e-9;

/// Lower bound applied to the step resolution when deriving raw readback.
pub const MIN_STEP_RESOLUTION: f64 = 1e-10;

/// Maximum number of selector channels in one interlock group.
pub const MAX_SELECTORS_PER_UNIT: usize = 256;

/// Maximum number of motion units per device.
pub const MAX_UNITS: usize = 16;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/selene/selene.toml";

/// Default channel-name prefix.
pub const DEFAULT_PREFIX: &str = "SQ:AMOR:SEL2:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(DEFAULT_TICK_RATE_HZ > 0.0);
        assert!(MOTION_EPSILON > 0.0 && MOTION_EPSILON < 1e-6);
        assert!(STEP_ROUNDING_GUARD < 1e-6);
        assert!(MIN_STEP_RESOLUTION > 0.0);
        assert!(MAX_UNITS > 0);
    }
}
