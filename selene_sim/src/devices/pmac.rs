//! Single free-running motor (`motor1`).

use selene_common::device::config::DeviceConfig;
use selene_common::device::driver::{relative_name, SimDevice, SimError, Tickable};
use selene_common::device::types::{FieldValue, MotorField};
use std::sync::Arc;
use tracing::info;

use crate::units::{FreeMotion, MotionSimulator};

/// Registry key.
pub const KIND: &str = "pmac";

/// Motor name, relative to the prefix.
pub const MOTOR_NAME: &str = "motor1";

/// Device with one motor that is always permitted to move.
pub struct PmacDevice {
    prefix: String,
    motor: Arc<MotionSimulator>,
}

impl PmacDevice {
    /// Build the device from the `[device.motor]` section.
    pub fn new(config: &DeviceConfig) -> Result<Self, SimError> {
        config.validate()?;
        let motor_config = config.require_motor()?;
        let motor = MotionSimulator::new(
            MOTOR_NAME,
            motor_config,
            config.dwell(),
            Arc::new(FreeMotion),
        )?;

        info!(
            "Pmac device created: {}{} at {}, velocity={}",
            config.prefix, MOTOR_NAME, motor_config.initial_position, motor_config.velocity
        );

        Ok(Self {
            prefix: config.prefix.clone(),
            motor: Arc::new(motor),
        })
    }

    /// The motor.
    pub fn motor(&self) -> &MotionSimulator {
        &self.motor
    }

    fn parse(&self, field: &str) -> Result<MotorField, SimError> {
        let name = relative_name(&self.prefix, field);
        let rest = name
            .strip_prefix(MOTOR_NAME)
            .ok_or_else(|| SimError::UnknownField(field.to_string()))?;
        if rest.is_empty() {
            return Ok(MotorField::Val);
        }
        rest.strip_prefix('.')
            .and_then(|suffix| suffix.parse().ok())
            .ok_or_else(|| SimError::UnknownField(field.to_string()))
    }
}

impl SimDevice for PmacDevice {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn field_names(&self) -> Vec<String> {
        std::iter::once(MOTOR_NAME.to_string())
            .chain(
                MotorField::ALL
                    .iter()
                    .filter(|f| **f != MotorField::Val)
                    .map(|f| format!("{}.{}", MOTOR_NAME, f.suffix())),
            )
            .collect()
    }

    fn read(&self, field: &str) -> Result<FieldValue, SimError> {
        Ok(self.motor.read_field(self.parse(field)?))
    }

    fn write(&self, field: &str, value: FieldValue) -> Result<(), SimError> {
        let motor_field = self.parse(field)?;
        self.motor
            .write_field(motor_field, &value)
            .map_err(|reason| SimError::rejected(field, reason))
    }

    fn tickers(&self) -> Vec<Arc<dyn Tickable>> {
        vec![self.motor.clone() as Arc<dyn Tickable>]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_common::device::config::MotorConfig;

    fn make_device() -> PmacDevice {
        let config = DeviceConfig {
            kind: KIND.to_string(),
            prefix: "simple:".to_string(),
            motor: Some(MotorConfig {
                initial_position: 1.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        PmacDevice::new(&config).unwrap()
    }

    #[test]
    fn test_initial_position() {
        let device = make_device();
        assert_eq!(device.read("motor1").unwrap(), FieldValue::Double(1.0));
        assert_eq!(device.read("simple:motor1.RBV").unwrap(), FieldValue::Double(1.0));
        assert_eq!(device.read("motor1.DMOV").unwrap(), FieldValue::Int(1));
    }

    #[test]
    fn test_moves_without_interlock() {
        let device = make_device();
        device.write("motor1", FieldValue::Double(1.5)).unwrap();
        for _ in 0..60 {
            device.motor().tick();
        }
        assert_eq!(device.read("motor1.RBV").unwrap(), FieldValue::Double(1.5));
    }

    #[test]
    fn test_unknown_fields() {
        let device = make_device();
        assert!(matches!(device.read("motor2"), Err(SimError::UnknownField(_))));
        assert!(matches!(device.read("motor1.FOO"), Err(SimError::UnknownField(_))));
        assert!(matches!(device.read("motor1RBV"), Err(SimError::UnknownField(_))));
    }

    #[test]
    fn test_missing_motor_section() {
        let config = DeviceConfig {
            kind: KIND.to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PmacDevice::new(&config),
            Err(SimError::ConfigError(_))
        ));
    }

    #[test]
    fn test_field_names() {
        let device = make_device();
        let names = device.field_names();
        assert_eq!(names.len(), MotorField::ALL.len());
        assert_eq!(names[0], "motor1");
        assert!(names.contains(&"motor1.SPMG".to_string()));
    }
}
