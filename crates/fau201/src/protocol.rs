//! Command protocol of the FAU201's onboard DAC.
//!
//! The DAC (an LTC2640 with a 12-bit code space) sits behind channel 0 of
//! the CP2130 and takes 3-byte commands: an opcode followed by a 16-bit word
//! whose top 12 bits are the code. One code step is one millivolt.

use std::time::Duration;

use cp2130::{ClockFrequency, CsMode, Phase, Polarity, SpiMode, UsbConfig};

use crate::error::{Error, Result};

/// USB vendor ID.
pub const VID: u16 = 0x10C4;
/// USB product ID.
pub const PID: u16 = 0x8C46;

/// Bulk OUT endpoint used for SPI writes.
pub const EPOUT: u8 = 0x01;
/// CP2130 channel wired to the DAC.
pub const CHANNEL: u8 = 0;

/// Minimum output voltage.
pub const VOLTAGE_MIN: f32 = 0.0;
/// Maximum output voltage.
pub const VOLTAGE_MAX: f32 = 4.095;

/// Selects the external voltage reference.
pub const CONFIG_COMMAND: [u8; 3] = [0x70, 0x00, 0x00];
/// Write to input register and update DAC register.
pub const UPDATE_OPCODE: u8 = 0x30;

/// Delay between the last SPI write and disabling the chip select.
///
/// Without it the bridge can report errors when the chip select is dropped
/// right after a write.
pub const SETTLE_DELAY: Duration = Duration::from_micros(100);

/// SPI settings required by the DAC.
pub const SPI_MODE: SpiMode = SpiMode {
    cs_mode: CsMode::PushPull,
    frequency: ClockFrequency::Khz750,
    polarity: Polarity::IdleLow,
    phase: Phase::CaptureOnFirstTransition,
};

/// 12-bit DAC code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VoltageCode(u16);

impl VoltageCode {
    pub const MAX: u16 = 0x0FFF;

    /// Convert a voltage to its code, rounding to the nearest millivolt.
    ///
    /// Values outside `[VOLTAGE_MIN, VOLTAGE_MAX]` and NaN are rejected.
    pub fn from_volts(volts: f32) -> Result<Self> {
        if !(VOLTAGE_MIN..=VOLTAGE_MAX).contains(&volts) {
            return Err(Error::VoltageOutOfRange(volts));
        }
        Ok(VoltageCode((volts * 1000.0).round() as u16))
    }

    /// Build a code from a raw value, keeping only the low 12 bits.
    pub fn from_raw(raw: u16) -> Self {
        VoltageCode(raw & Self::MAX)
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Data bytes of the DAC word: upper 8 bits of the code, then the lower
    /// 4 bits followed by four zero bits.
    pub fn pack(self) -> [u8; 2] {
        [(self.0 >> 4) as u8, (self.0 << 4) as u8]
    }

    /// Inverse of [`VoltageCode::pack`].
    pub fn unpack(hi: u8, lo: u8) -> Self {
        VoltageCode(((hi as u16) << 4) | ((lo as u16) >> 4))
    }

    /// The full 3-byte update command for this code.
    pub fn command(self) -> [u8; 3] {
        let [hi, lo] = self.pack();
        [UPDATE_OPCODE, hi, lo]
    }
}

/// Hardware revision string from a USB configuration.
///
/// A major release of 2 maps to "A", 3 to "B" and so on up to 27. The minor
/// release is appended when it is non-zero, or always when the major
/// release is 1.
pub fn hardware_revision(config: &UsbConfig) -> String {
    let mut revision = String::new();
    if config.major_release > 1 && config.major_release <= 27 {
        revision.push((b'A' + config.major_release - 2) as char);
    }
    if config.major_release == 1 || config.minor_release != 0 {
        revision.push_str(&config.minor_release.to_string());
    }
    revision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(major_release: u8, minor_release: u8) -> UsbConfig {
        UsbConfig {
            major_release,
            minor_release,
            ..Default::default()
        }
    }

    #[test]
    fn test_hardware_revision_table() {
        assert_eq!(hardware_revision(&config(2, 0)), "A");
        assert_eq!(hardware_revision(&config(2, 5)), "A5");
        assert_eq!(hardware_revision(&config(28, 0)), "");
    }

    #[test]
    fn test_hardware_revision_major_one_has_no_letter() {
        // only the minor release is printed, even when it is zero
        assert_eq!(hardware_revision(&config(1, 0)), "0");
        assert_eq!(hardware_revision(&config(1, 3)), "3");
        assert_eq!(hardware_revision(&config(1, 12)), "12");
    }

    #[test]
    fn test_hardware_revision_boundaries() {
        assert_eq!(hardware_revision(&config(0, 0)), "");
        assert_eq!(hardware_revision(&config(0, 7)), "7");
        assert_eq!(hardware_revision(&config(3, 0)), "B");
        assert_eq!(hardware_revision(&config(27, 0)), "Z");
        assert_eq!(hardware_revision(&config(27, 12)), "Z12");
        assert_eq!(hardware_revision(&config(28, 4)), "4");
        assert_eq!(hardware_revision(&config(255, 255)), "255");
    }

    #[test]
    fn test_voltage_code_rounding() {
        assert_eq!(VoltageCode::from_volts(0.0).unwrap().value(), 0);
        assert_eq!(VoltageCode::from_volts(1.0).unwrap().value(), 1000);
        assert_eq!(VoltageCode::from_volts(2.5004).unwrap().value(), 2500);
        assert_eq!(VoltageCode::from_volts(2.5006).unwrap().value(), 2501);
        assert_eq!(VoltageCode::from_volts(VOLTAGE_MAX).unwrap().value(), 4095);
    }

    #[test]
    fn test_voltage_code_rejects_out_of_range() {
        for volts in [-0.1, -f32::EPSILON, 4.096, 4.2, f32::NAN, f32::INFINITY] {
            assert!(
                matches!(VoltageCode::from_volts(volts), Err(Error::VoltageOutOfRange(_))),
                "{} should be rejected",
                volts
            );
        }
    }

    #[test]
    fn test_command_bytes() {
        let code = VoltageCode::from_volts(VOLTAGE_MAX).unwrap();
        assert_eq!(code.command(), [0x30, 0xFF, 0xF0]);

        let code = VoltageCode::from_volts(1.234).unwrap();
        // 1234 = 0x4D2
        assert_eq!(code.command(), [0x30, 0x4D, 0x20]);
    }

    #[test]
    fn test_pack_unpack_all_codes() {
        for raw in 0..=VoltageCode::MAX {
            let code = VoltageCode::from_raw(raw);
            let [hi, lo] = code.pack();
            assert_eq!(lo & 0x0F, 0);
            assert_eq!(VoltageCode::unpack(hi, lo), code);
        }
    }

    #[test]
    fn test_spi_mode_word() {
        assert_eq!(SPI_MODE.to_word(), 0x0C);
        assert_eq!(SPI_MODE.frequency.hz(), 750_000);
    }
}
