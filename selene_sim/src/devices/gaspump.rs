//! Gas pump controller set-points.
//!
//! Each channel carries integer set-points with read-only readbacks.
//! `Amplitude` and `Frequency` writes are echoed into their readbacks;
//! `Phase` is stored without echo. Nothing here is ticked.

use selene_common::device::config::DeviceConfig;
use selene_common::device::driver::{relative_name, RejectReason, SimDevice, SimError};
use selene_common::device::types::FieldValue;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Registry key.
pub const KIND: &str = "gaspump";

const DEFAULT_AMPLITUDE_RBV: i64 = 10000;
const DEFAULT_FREQUENCY_RBV: i64 = 50;
const DEFAULT_MODE_RBV: i64 = 1;

/// Field of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpField {
    Amplitude,
    AmplitudeRbv,
    Frequency,
    FrequencyRbv,
    Phase,
    PhaseRbv,
    ModeRbv,
    Error,
}

impl PumpField {
    const ALL: [PumpField; 8] = [
        PumpField::Amplitude,
        PumpField::AmplitudeRbv,
        PumpField::Frequency,
        PumpField::FrequencyRbv,
        PumpField::Phase,
        PumpField::PhaseRbv,
        PumpField::ModeRbv,
        PumpField::Error,
    ];

    fn name(&self) -> &'static str {
        match self {
            PumpField::Amplitude => "Amplitude",
            PumpField::AmplitudeRbv => "Amplitude_RBV",
            PumpField::Frequency => "Frequency",
            PumpField::FrequencyRbv => "Frequency_RBV",
            PumpField::Phase => "Phase",
            PumpField::PhaseRbv => "Phase_RBV",
            PumpField::ModeRbv => "Mode_RBV",
            PumpField::Error => "Error",
        }
    }
}

/// State of one pump channel.
#[derive(Debug, Clone, PartialEq)]
struct PumpChannel {
    amplitude: i64,
    amplitude_rbv: i64,
    frequency: i64,
    frequency_rbv: i64,
    phase: i64,
    phase_rbv: i64,
    mode_rbv: i64,
    error: String,
}

impl Default for PumpChannel {
    fn default() -> Self {
        Self {
            amplitude: 0,
            amplitude_rbv: DEFAULT_AMPLITUDE_RBV,
            frequency: 0,
            frequency_rbv: DEFAULT_FREQUENCY_RBV,
            phase: 0,
            phase_rbv: 0,
            mode_rbv: DEFAULT_MODE_RBV,
            error: String::new(),
        }
    }
}

impl PumpChannel {
    fn read(&self, field: PumpField) -> FieldValue {
        match field {
            PumpField::Amplitude => FieldValue::Int(self.amplitude),
            PumpField::AmplitudeRbv => FieldValue::Int(self.amplitude_rbv),
            PumpField::Frequency => FieldValue::Int(self.frequency),
            PumpField::FrequencyRbv => FieldValue::Int(self.frequency_rbv),
            PumpField::Phase => FieldValue::Int(self.phase),
            PumpField::PhaseRbv => FieldValue::Int(self.phase_rbv),
            PumpField::ModeRbv => FieldValue::Int(self.mode_rbv),
            PumpField::Error => FieldValue::Text(self.error.clone()),
        }
    }

    fn write(&mut self, field: PumpField, value: &FieldValue) -> Result<(), RejectReason> {
        let int = || value.as_i64().ok_or(RejectReason::InvalidValue);
        match field {
            PumpField::Amplitude => {
                self.amplitude = int()?;
                self.amplitude_rbv = self.amplitude;
            }
            PumpField::Frequency => {
                self.frequency = int()?;
                self.frequency_rbv = self.frequency;
            }
            PumpField::Phase => self.phase = int()?,
            PumpField::Error => self.error = value.as_text(),
            PumpField::AmplitudeRbv
            | PumpField::FrequencyRbv
            | PumpField::PhaseRbv
            | PumpField::ModeRbv => return Err(RejectReason::ReadOnly),
        }
        Ok(())
    }
}

/// Gas pump with named channels (`Ch1:`, `Ch2:`, ...).
pub struct GasPumpDevice {
    prefix: String,
    channels: Vec<(String, Mutex<PumpChannel>)>,
}

impl GasPumpDevice {
    /// Build the device from the `channels` list.
    pub fn new(config: &DeviceConfig) -> Result<Self, SimError> {
        config.validate()?;
        let channels: Vec<_> = config
            .require_channels()?
            .iter()
            .map(|name| (name.clone(), Mutex::new(PumpChannel::default())))
            .collect();

        info!(
            "Gas pump device created: {} channels, prefix '{}'",
            channels.len(),
            config.prefix
        );

        Ok(Self {
            prefix: config.prefix.clone(),
            channels,
        })
    }

    fn lookup(&self, field: &str) -> Result<(MutexGuard<'_, PumpChannel>, PumpField), SimError> {
        let unknown = || SimError::UnknownField(field.to_string());
        let name = relative_name(&self.prefix, field);
        let (channel, tail) = name.split_once(':').ok_or_else(unknown)?;
        let state = self
            .channels
            .iter()
            .find(|(n, _)| n == channel)
            .map(|(_, state)| state)
            .ok_or_else(unknown)?;
        let pump_field = PumpField::ALL
            .into_iter()
            .find(|f| f.name() == tail)
            .ok_or_else(unknown)?;
        Ok((
            state.lock().unwrap_or_else(PoisonError::into_inner),
            pump_field,
        ))
    }
}

impl SimDevice for GasPumpDevice {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn field_names(&self) -> Vec<String> {
        self.channels
            .iter()
            .flat_map(|(channel, _)| {
                PumpField::ALL
                    .iter()
                    .map(move |f| format!("{}:{}", channel, f.name()))
            })
            .collect()
    }

    fn read(&self, field: &str) -> Result<FieldValue, SimError> {
        let (state, pump_field) = self.lookup(field)?;
        Ok(state.read(pump_field))
    }

    fn write(&self, field: &str, value: FieldValue) -> Result<(), SimError> {
        let (mut state, pump_field) = self.lookup(field)?;
        state
            .write(pump_field, &value)
            .map_err(|reason| SimError::rejected(field, reason))?;
        debug!("Gas pump {} = {}", field, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_device() -> GasPumpDevice {
        let config = DeviceConfig {
            kind: KIND.to_string(),
            prefix: "SQ:DMC:gaspump:".to_string(),
            channels: vec!["Ch1".to_string(), "Ch2".to_string()],
            ..Default::default()
        };
        GasPumpDevice::new(&config).unwrap()
    }

    #[test]
    fn test_defaults() {
        let device = make_device();
        assert_eq!(device.read("Ch1:Amplitude_RBV").unwrap(), FieldValue::Int(10000));
        assert_eq!(device.read("Ch2:Frequency_RBV").unwrap(), FieldValue::Int(50));
        assert_eq!(device.read("Ch1:Phase_RBV").unwrap(), FieldValue::Int(0));
        assert_eq!(device.read("Ch1:Mode_RBV").unwrap(), FieldValue::Int(1));
        assert_eq!(device.read("Ch1:Error").unwrap(), FieldValue::from(""));
    }

    #[test]
    fn test_amplitude_and_frequency_echo() {
        let device = make_device();
        device.write("Ch1:Amplitude", FieldValue::Int(1234)).unwrap();
        device.write("SQ:DMC:gaspump:Ch1:Frequency", FieldValue::Int(60)).unwrap();
        assert_eq!(device.read("Ch1:Amplitude_RBV").unwrap(), FieldValue::Int(1234));
        assert_eq!(device.read("Ch1:Frequency_RBV").unwrap(), FieldValue::Int(60));
        // Channels are independent.
        assert_eq!(device.read("Ch2:Amplitude_RBV").unwrap(), FieldValue::Int(10000));
    }

    #[test]
    fn test_phase_not_echoed() {
        let device = make_device();
        device.write("Ch2:Phase", FieldValue::Int(90)).unwrap();
        assert_eq!(device.read("Ch2:Phase").unwrap(), FieldValue::Int(90));
        assert_eq!(device.read("Ch2:Phase_RBV").unwrap(), FieldValue::Int(0));
    }

    #[test]
    fn test_rejections() {
        let device = make_device();
        let err = device.write("Ch1:Mode_RBV", FieldValue::Int(2)).unwrap_err();
        assert!(matches!(err, SimError::Rejected { reason: RejectReason::ReadOnly, .. }));
        let err = device.write("Ch1:Amplitude", FieldValue::Double(1.5)).unwrap_err();
        assert!(matches!(err, SimError::Rejected { reason: RejectReason::InvalidValue, .. }));
        assert!(matches!(device.read("Ch3:Amplitude"), Err(SimError::UnknownField(_))));
        assert!(matches!(device.read("Ch1:Voltage"), Err(SimError::UnknownField(_))));
    }

    #[test]
    fn test_error_text_and_listing() {
        let device = make_device();
        device.write("Ch1:Error", FieldValue::from("overpressure")).unwrap();
        assert_eq!(device.read("Ch1:Error").unwrap(), FieldValue::from("overpressure"));
        assert_eq!(device.field_names().len(), 16);
        assert!(device.tickers().is_empty());
    }
}
