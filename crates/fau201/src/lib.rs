//! Driver for the FAU201 single-channel voltage output device.
//!
//! # Overview
//!
//! The FAU201 is a CP2130 USB-to-SPI bridge wired to a 12-bit DAC. Its
//! output covers 0 to 4.095 V in 1 mV steps. [`Fau201Device`] owns a
//! [`cp2130::Bridge`] and turns device-level calls into bridge calls.
//!
//! # Errors
//!
//! Opening reports an [`OpenStatus`]. Everything else takes a
//! [`Diagnostics`] and records failures in it without stopping, so one call
//! to [`Fau201Device::setup`] reports every failing step at once.
//!
//! # Example
//!
//! ```no_run
//! use fau201::{Diagnostics, Fau201Device, OpenStatus};
//!
//! let mut device = Fau201Device::new();
//! if device.open(None) == OpenStatus::Success {
//!     let mut diag = Diagnostics::new();
//!     device.setup(&mut diag);
//!     device.set_voltage(2.5, &mut diag);
//!     if !diag.is_ok() {
//!         eprint!("{}", diag);
//!     }
//!     device.close();
//! }
//! ```

pub mod device;
pub mod diagnostics;
pub mod error;
pub mod protocol;
pub mod wait;

pub use cp2130::{OpenStatus, SiliconVersion, UsbConfig};
pub use device::Fau201Device;
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
pub use protocol::{VOLTAGE_MAX, VOLTAGE_MIN, VoltageCode, hardware_revision};
pub use wait::{ThreadSleep, Wait};
