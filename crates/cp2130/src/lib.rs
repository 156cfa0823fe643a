//! Bridge abstraction for the Silicon Labs CP2130 USB-to-SPI bridge.
//!
//! # Overview
//!
//! Device drivers built on a CP2130 talk to it through the [`Bridge`] trait:
//! open and close, SPI channel configuration, chip select control, raw SPI
//! writes and a few identity queries. [`Cp2130`] implements the trait on top
//! of `rusb`. Tests implement it with a fake.
//!
//! # Example
//!
//! ```no_run
//! use cp2130::{Bridge, Cp2130, OpenStatus};
//!
//! let mut bridge = Cp2130::new();
//! if bridge.open(0x10C4, 0x87A0, None) == OpenStatus::Success {
//!     let version = bridge.silicon_version()?;
//!     println!("CP2130 silicon {}.{}", version.major, version.minor);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, OpenStatus, Result};
pub use transport::Cp2130;
pub use types::{ClockFrequency, CsMode, Phase, Polarity, SiliconVersion, SpiMode, UsbConfig};

/// Highest SPI channel number on the CP2130.
pub const MAX_CHANNEL: u8 = 10;

/// Operations a CP2130-based device driver needs from the bridge.
///
/// Action methods take `&mut self`, queries take `&self`. Every fallible
/// call on a bridge that is not open returns [`Error::NotOpen`].
pub trait Bridge {
    /// Open the first device matching `vid`/`pid`, or the one whose serial
    /// string equals `serial`. Opening an already open bridge is a no-op.
    fn open(&mut self, vid: u16, pid: u16, serial: Option<&str>) -> OpenStatus;

    /// Release the device. Safe to call when nothing is open.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// True once the open device has stopped answering with "no device".
    fn disconnected(&self) -> bool;

    fn configure_spi_mode(&mut self, channel: u8, mode: SpiMode) -> Result<()>;

    /// Clear the inter-byte, post-assert and pre-deassert delays of a channel.
    fn disable_spi_delays(&mut self, channel: u8) -> Result<()>;

    /// Enable the chip select of `channel` and disable all others.
    fn select_cs(&mut self, channel: u8) -> Result<()>;

    fn disable_cs(&mut self, channel: u8) -> Result<()>;

    /// Write `data` over SPI through the bulk OUT endpoint `endpoint`.
    fn spi_write(&mut self, data: &[u8], endpoint: u8) -> Result<()>;

    fn silicon_version(&self) -> Result<SiliconVersion>;

    fn manufacturer_desc(&self) -> Result<String>;

    fn product_desc(&self) -> Result<String>;

    fn serial_desc(&self) -> Result<String>;

    fn usb_config(&self) -> Result<UsbConfig>;

    /// Reset the bridge, which resets the whole device behind it.
    fn reset(&mut self) -> Result<()>;

    /// Serial strings of all attached devices matching `vid`/`pid`.
    fn list_devices(vid: u16, pid: u16) -> Result<Vec<String>>
    where
        Self: Sized;
}
