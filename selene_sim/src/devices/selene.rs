//! Selene selector/motor device.
//!
//! The `DeviceComposer` wires each configured motion unit together:
//! one `InterlockEvaluator` owning the unit's selector channels, one
//! `MotionSimulator` gated by that evaluator and one fine-adjustment
//! `RangeSelector`. Selector numbers run consecutively across units in
//! declaration order.

use selene_common::device::config::{DeviceConfig, UnitConfig};
use selene_common::device::driver::{
    relative_name, RejectReason, SimDevice, SimError, Tickable,
};
use selene_common::device::types::{FieldValue, FineRange, MotorField};
use static_assertions::assert_impl_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::units::{InterlockEvaluator, MotionSimulator, RangeSelector, SelectorChannel};

/// Registry key.
pub const KIND: &str = "selene";

/// Address of one Selene field, parsed from its relative name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldAddr {
    /// `MCU{u}` or `MCU{u}.SUFFIX`
    Motor { unit: u8, field: MotorField },
    /// `MCU{u}:FineAdjustment:Select`
    RangeSelect { unit: u8 },
    /// `MCU{u}:FineAdjustment:Selected`
    RangeSelected { unit: u8 },
    /// `P{n}:Select`
    Select(usize),
    /// `P{n}:Selected`
    Selected(usize),
    /// `P{n}:Selectable`
    Selectable(usize),
}

impl FieldAddr {
    fn parse(name: &str) -> Option<Self> {
        if let Some(rest) = name.strip_prefix("MCU") {
            if let Some((unit, tail)) = rest.split_once(':') {
                let unit = unit.parse().ok()?;
                return match tail {
                    "FineAdjustment:Select" => Some(FieldAddr::RangeSelect { unit }),
                    "FineAdjustment:Selected" => Some(FieldAddr::RangeSelected { unit }),
                    _ => None,
                };
            }
            let (unit, field) = match rest.split_once('.') {
                Some((unit, suffix)) => (unit, suffix.parse().ok()?),
                None => (rest, MotorField::Val),
            };
            return Some(FieldAddr::Motor {
                unit: unit.parse().ok()?,
                field,
            });
        }

        let (number, tail) = name.strip_prefix('P')?.split_once(':')?;
        let number = number.parse().ok()?;
        match tail {
            "Select" => Some(FieldAddr::Select(number)),
            "Selected" => Some(FieldAddr::Selected(number)),
            "Selectable" => Some(FieldAddr::Selectable(number)),
            _ => None,
        }
    }
}

/// One interlocked motion unit.
pub struct MotionUnit {
    /// Unit number (`MCU{index}`)
    index: u8,
    /// Interlock group over this unit's selectors
    interlock: Arc<InterlockEvaluator>,
    /// Motor gated by `interlock`
    motor: Arc<MotionSimulator>,
    /// Fine-adjustment range
    range: RangeSelector,
}

impl MotionUnit {
    fn new(config: &UnitConfig, first_selector: usize, dwell: Duration) -> Result<Self, SimError> {
        let interlock = Arc::new(InterlockEvaluator::new(
            first_selector..first_selector + config.selectors,
        ));
        let motor = MotionSimulator::new(
            format!("MCU{}", config.index),
            &config.motor,
            dwell,
            interlock.clone(),
        )?;

        Ok(Self {
            index: config.index,
            interlock,
            motor: Arc::new(motor),
            range: RangeSelector::new(config.range),
        })
    }

    /// Unit number.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Interlock group of this unit.
    pub fn interlock(&self) -> &InterlockEvaluator {
        &self.interlock
    }

    /// Motor of this unit.
    pub fn motor(&self) -> &MotionSimulator {
        &self.motor
    }

    /// Fine-adjustment range switch.
    pub fn range(&self) -> &RangeSelector {
        &self.range
    }

    fn field_names(&self, names: &mut Vec<String>) {
        let mcu = format!("MCU{}", self.index);
        names.push(mcu.clone());
        names.extend(
            MotorField::ALL
                .iter()
                .filter(|f| **f != MotorField::Val)
                .map(|f| format!("{}.{}", mcu, f.suffix())),
        );
        names.push(format!("{mcu}:FineAdjustment:Select"));
        names.push(format!("{mcu}:FineAdjustment:Selected"));
        for channel in self.interlock.channels() {
            let n = channel.number();
            names.push(format!("P{n}:Select"));
            names.push(format!("P{n}:Selected"));
            names.push(format!("P{n}:Selectable"));
        }
    }
}

/// Selene device: interlocked selector banks gating their motors.
pub struct DeviceComposer {
    /// Channel-name prefix
    prefix: String,
    /// Units in declaration order
    units: Vec<MotionUnit>,
}

assert_impl_all!(DeviceComposer: Send, Sync);

impl DeviceComposer {
    /// Compose the device from its configuration.
    ///
    /// # Errors
    /// `SimError::ConfigError` if the units section is missing or invalid.
    pub fn new(config: &DeviceConfig) -> Result<Self, SimError> {
        config.validate()?;
        let dwell = config.dwell();

        let mut units = Vec::with_capacity(config.units.len());
        let mut next_selector = 1;
        for unit_config in config.require_units()? {
            let unit = MotionUnit::new(unit_config, next_selector, dwell)?;
            info!(
                "  Unit MCU{}: selectors P{}..P{}, velocity={}, limits=[{}, {}]",
                unit_config.index,
                next_selector,
                next_selector + unit_config.selectors - 1,
                unit_config.motor.velocity,
                unit_config.motor.user_limits[0],
                unit_config.motor.user_limits[1]
            );
            next_selector += unit_config.selectors;
            units.push(unit);
        }

        info!(
            "Selene device composed: {} units, {} selectors, prefix '{}'",
            units.len(),
            next_selector - 1,
            config.prefix
        );

        Ok(Self {
            prefix: config.prefix.clone(),
            units,
        })
    }

    /// Units in declaration order.
    pub fn units(&self) -> &[MotionUnit] {
        &self.units
    }

    /// Unit by number.
    pub fn unit(&self, index: u8) -> Option<&MotionUnit> {
        self.units.iter().find(|u| u.index == index)
    }

    /// Selector channel by global number, with the unit that owns it.
    pub fn selector(&self, number: usize) -> Option<(&MotionUnit, &SelectorChannel)> {
        self.units
            .iter()
            .find_map(|unit| unit.interlock.find(number).map(|channel| (unit, channel)))
    }

    fn lookup_unit(&self, index: u8, field: &str) -> Result<&MotionUnit, SimError> {
        self.unit(index)
            .ok_or_else(|| SimError::UnknownField(field.to_string()))
    }

    fn lookup_selector(
        &self,
        number: usize,
        field: &str,
    ) -> Result<(&MotionUnit, &SelectorChannel), SimError> {
        self.selector(number)
            .ok_or_else(|| SimError::UnknownField(field.to_string()))
    }
}

impl SimDevice for DeviceComposer {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn field_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for unit in &self.units {
            unit.field_names(&mut names);
        }
        names
    }

    fn read(&self, field: &str) -> Result<FieldValue, SimError> {
        let name = relative_name(&self.prefix, field);
        let addr =
            FieldAddr::parse(name).ok_or_else(|| SimError::UnknownField(field.to_string()))?;

        match addr {
            FieldAddr::Motor { unit, field: motor_field } => {
                Ok(self.lookup_unit(unit, field)?.motor.read_field(motor_field))
            }
            FieldAddr::RangeSelect { unit } | FieldAddr::RangeSelected { unit } => Ok(
                FieldValue::Text(self.lookup_unit(unit, field)?.range.read().to_string()),
            ),
            FieldAddr::Select(n) | FieldAddr::Selected(n) => {
                let (_, channel) = self.lookup_selector(n, field)?;
                Ok(FieldValue::Bool(channel.read_enabled()))
            }
            FieldAddr::Selectable(n) => {
                let (unit, channel) = self.lookup_selector(n, field)?;
                Ok(FieldValue::Bool(channel.read_selectable(&unit.interlock)))
            }
        }
    }

    fn write(&self, field: &str, value: FieldValue) -> Result<(), SimError> {
        let name = relative_name(&self.prefix, field);
        let addr =
            FieldAddr::parse(name).ok_or_else(|| SimError::UnknownField(field.to_string()))?;
        let reject = |reason: RejectReason| SimError::rejected(field, reason);

        match addr {
            FieldAddr::Motor { unit, field: motor_field } => self
                .lookup_unit(unit, field)?
                .motor
                .write_field(motor_field, &value)
                .map_err(reject),
            FieldAddr::RangeSelect { unit } => {
                let unit = self.lookup_unit(unit, field)?;
                let range = match &value {
                    FieldValue::Text(s) => s.parse::<FineRange>().ok(),
                    other => other.as_i64().and_then(|i| i.to_string().parse().ok()),
                }
                .ok_or_else(|| reject(RejectReason::InvalidValue))?;
                unit.range.select(range);
                Ok(())
            }
            FieldAddr::Select(n) => {
                let (unit, channel) = self.lookup_selector(n, field)?;
                let enable = value
                    .as_bool()
                    .ok_or_else(|| reject(RejectReason::InvalidValue))?;
                channel
                    .request_enable(enable, &unit.interlock)
                    .map_err(reject)
            }
            FieldAddr::RangeSelected { unit } => {
                self.lookup_unit(unit, field)?;
                Err(reject(RejectReason::ReadOnly))
            }
            FieldAddr::Selected(n) | FieldAddr::Selectable(n) => {
                self.lookup_selector(n, field)?;
                Err(reject(RejectReason::ReadOnly))
            }
        }
    }

    fn tickers(&self) -> Vec<Arc<dyn Tickable>> {
        self.units
            .iter()
            .map(|unit| unit.motor.clone() as Arc<dyn Tickable>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_common::device::config::MotorConfig;

    fn make_config() -> DeviceConfig {
        let motor = MotorConfig {
            velocity: 1.0,
            user_limits: [0.0, 10.0],
            ..Default::default()
        };
        DeviceConfig {
            kind: KIND.to_string(),
            prefix: "SQ:AMOR:SEL2:".to_string(),
            units: (1..=2)
                .map(|index| UnitConfig {
                    index,
                    selectors: 18,
                    motor,
                    range: FineRange::Narrow,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_field_addresses() {
        assert_eq!(
            FieldAddr::parse("MCU1"),
            Some(FieldAddr::Motor { unit: 1, field: MotorField::Val })
        );
        assert_eq!(
            FieldAddr::parse("MCU2.RBV"),
            Some(FieldAddr::Motor { unit: 2, field: MotorField::Rbv })
        );
        assert_eq!(
            FieldAddr::parse("MCU1:FineAdjustment:Selected"),
            Some(FieldAddr::RangeSelected { unit: 1 })
        );
        assert_eq!(FieldAddr::parse("P36:Selectable"), Some(FieldAddr::Selectable(36)));
        assert_eq!(FieldAddr::parse("P1:Enable"), None);
        assert_eq!(FieldAddr::parse("MCU1.XYZ"), None);
        assert_eq!(FieldAddr::parse("Q1:Select"), None);
    }

    #[test]
    fn test_selectors_numbered_across_units() {
        let device = DeviceComposer::new(&make_config()).unwrap();
        let (unit, _) = device.selector(18).unwrap();
        assert_eq!(unit.index(), 1);
        let (unit, _) = device.selector(19).unwrap();
        assert_eq!(unit.index(), 2);
        assert!(device.selector(37).is_none());
        assert!(device.selector(0).is_none());
    }

    #[test]
    fn test_field_names_are_readable() {
        let device = DeviceComposer::new(&make_config()).unwrap();
        let names = device.field_names();
        assert_eq!(names.len(), 2 * (16 + 2 + 18 * 3));
        for name in &names {
            assert!(device.read(name).is_ok(), "{name} should be readable");
        }
    }

    #[test]
    fn test_missing_units_is_config_error() {
        let config = DeviceConfig {
            units: Vec::new(),
            ..make_config()
        };
        assert!(matches!(
            DeviceComposer::new(&config),
            Err(SimError::ConfigError(_))
        ));
    }

    #[test]
    fn test_unknown_fields() {
        let device = DeviceComposer::new(&make_config()).unwrap();
        assert!(matches!(device.read("MCU3.RBV"), Err(SimError::UnknownField(_))));
        assert!(matches!(device.read("P99:Select"), Err(SimError::UnknownField(_))));
        assert!(matches!(
            device.write("bogus", FieldValue::Int(1)),
            Err(SimError::UnknownField(_))
        ));
    }

    #[test]
    fn test_full_name_accepted() {
        let device = DeviceComposer::new(&make_config()).unwrap();
        device
            .write("SQ:AMOR:SEL2:P1:Select", FieldValue::Bool(true))
            .unwrap();
        assert_eq!(device.read("P1:Selected").unwrap(), FieldValue::Bool(true));
    }

    #[test]
    fn test_range_select_follows() {
        let device = DeviceComposer::new(&make_config()).unwrap();
        assert_eq!(
            device.read("MCU1:FineAdjustment:Selected").unwrap(),
            FieldValue::from("narrow")
        );
        device
            .write("MCU1:FineAdjustment:Select", FieldValue::from("wide"))
            .unwrap();
        assert_eq!(
            device.read("MCU1:FineAdjustment:Selected").unwrap(),
            FieldValue::from("wide")
        );
        assert_eq!(
            device.read("MCU2:FineAdjustment:Selected").unwrap(),
            FieldValue::from("narrow")
        );
        device
            .write("MCU2:FineAdjustment:Select", FieldValue::Int(0))
            .unwrap();
        assert_eq!(
            device.read("MCU2:FineAdjustment:Select").unwrap(),
            FieldValue::from("wide")
        );
    }

    #[test]
    fn test_readbacks_reject_writes() {
        let device = DeviceComposer::new(&make_config()).unwrap();
        for name in ["P1:Selected", "P1:Selectable", "MCU1:FineAdjustment:Selected", "MCU1.RBV"] {
            let err = device.write(name, FieldValue::Int(1)).unwrap_err();
            assert!(
                matches!(err, SimError::Rejected { reason: RejectReason::ReadOnly, .. }),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn test_one_ticker_per_unit() {
        let device = DeviceComposer::new(&make_config()).unwrap();
        let tickers = device.tickers();
        assert_eq!(tickers.len(), 2);
        assert_eq!(tickers[0].name(), "MCU1");
        assert_eq!(tickers[1].dwell(), Duration::from_millis(100));
    }
}
