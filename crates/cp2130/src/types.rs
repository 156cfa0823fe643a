//! Value types exchanged with the CP2130.

use crate::error::{Error, Result};

/// Chip select pin drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsMode {
    OpenDrain,
    PushPull,
}

/// SPI clock frequencies supported by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockFrequency {
    Mhz12,
    Mhz6,
    Mhz3,
    Khz1500,
    Khz750,
    Khz375,
    Khz187_5,
    Khz93_75,
}

impl ClockFrequency {
    /// Frequency in Hz.
    pub fn hz(self) -> u32 {
        12_000_000 >> self.bits()
    }

    fn bits(self) -> u8 {
        match self {
            ClockFrequency::Mhz12 => 0,
            ClockFrequency::Mhz6 => 1,
            ClockFrequency::Mhz3 => 2,
            ClockFrequency::Khz1500 => 3,
            ClockFrequency::Khz750 => 4,
            ClockFrequency::Khz375 => 5,
            ClockFrequency::Khz187_5 => 6,
            ClockFrequency::Khz93_75 => 7,
        }
    }
}

/// Idle level of the SPI clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// CPOL = 0
    IdleLow,
    /// CPOL = 1
    IdleHigh,
}

/// Edge on which SPI data is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// CPHA = 0
    CaptureOnFirstTransition,
    /// CPHA = 1
    CaptureOnSecondTransition,
}

/// SPI settings applied to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiMode {
    pub cs_mode: CsMode,
    pub frequency: ClockFrequency,
    pub polarity: Polarity,
    pub phase: Phase,
}

impl SpiMode {
    /// Encode into the `Set_SPI_Word` byte.
    ///
    /// Layout: bit 5 CPHA, bit 4 CPOL, bit 3 CS pin mode, bits 2:0 clock.
    pub fn to_word(self) -> u8 {
        let cpha = match self.phase {
            Phase::CaptureOnFirstTransition => 0,
            Phase::CaptureOnSecondTransition => 1,
        };
        let cpol = match self.polarity {
            Polarity::IdleLow => 0,
            Polarity::IdleHigh => 1,
        };
        let cs = match self.cs_mode {
            CsMode::OpenDrain => 0,
            CsMode::PushPull => 1,
        };
        (cpha << 5) | (cpol << 4) | (cs << 3) | self.frequency.bits()
    }
}

/// Read-only silicon version of the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiliconVersion {
    pub major: u8,
    pub minor: u8,
}

/// USB configuration record as stored in the bridge's PROM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsbConfig {
    pub vid: u16,
    pub pid: u16,
    pub max_power: u8,
    pub power_mode: u8,
    pub major_release: u8,
    pub minor_release: u8,
    pub transfer_priority: u8,
}

impl UsbConfig {
    /// Size of the `Get_USB_Config` response.
    pub const LEN: usize = 9;

    /// Decode a `Get_USB_Config` response.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::LEN {
            return Err(Error::ShortTransfer {
                expected: Self::LEN,
                actual: buf.len(),
            });
        }

        Ok(UsbConfig {
            vid: u16::from_le_bytes([buf[0], buf[1]]),
            pid: u16::from_le_bytes([buf[2], buf[3]]),
            max_power: buf[4],
            power_mode: buf[5],
            major_release: buf[6],
            minor_release: buf[7],
            transfer_priority: buf[8],
        })
    }
}
