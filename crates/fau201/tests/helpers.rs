//! Fake CP2130 bridge that records every call instead of touching USB

#![allow(dead_code)]

use cp2130::{Bridge, Error, OpenStatus, Result, SiliconVersion, SpiMode, UsbConfig};
use fau201::Fau201Device;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// One observed interaction, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(Option<String>),
    Close,
    ConfigureSpiMode(u8, SpiMode),
    DisableSpiDelays(u8),
    SelectCs(u8),
    DisableCs(u8),
    SpiWrite(Vec<u8>, u8),
    Reset,
    Wait(Duration),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Serials reported by `FakeBridge::list_devices`
pub const FAKE_SERIALS: [&str; 2] = ["FAU201-0001", "FAU201-0002"];

pub struct FakeBridge {
    log: CallLog,
    open: bool,
    disconnected: bool,
    /// Status returned by `open` when nothing is open yet
    pub open_status: OpenStatus,
    /// Operation names that return an error
    pub failing: Vec<&'static str>,
    pub usb_config: UsbConfig,
}

impl FakeBridge {
    pub fn new(log: CallLog) -> Self {
        FakeBridge {
            log,
            open: false,
            disconnected: false,
            open_status: OpenStatus::Success,
            failing: Vec::new(),
            usb_config: UsbConfig {
                vid: fau201::protocol::VID,
                pid: fau201::protocol::PID,
                major_release: 2,
                minor_release: 0,
                ..Default::default()
            },
        }
    }

    pub fn unplug(&mut self) {
        self.disconnected = true;
    }

    fn push(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    fn outcome(&self, operation: &str) -> Result<()> {
        if !self.open {
            Err(Error::NotOpen)
        } else if self.disconnected {
            Err(Error::Disconnected)
        } else if self.failing.contains(&operation) {
            Err(Error::ControlTransferFailed(format!("{} injected", operation)))
        } else {
            Ok(())
        }
    }
}

impl Bridge for FakeBridge {
    fn open(&mut self, _vid: u16, _pid: u16, serial: Option<&str>) -> OpenStatus {
        self.push(Call::Open(serial.map(str::to_string)));
        if self.open {
            return OpenStatus::Success;
        }
        if self.open_status == OpenStatus::Success {
            self.open = true;
        }
        self.open_status
    }

    fn close(&mut self) {
        if self.open {
            self.push(Call::Close);
        }
        self.open = false;
        self.disconnected = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn disconnected(&self) -> bool {
        self.disconnected
    }

    fn configure_spi_mode(&mut self, channel: u8, mode: SpiMode) -> Result<()> {
        self.push(Call::ConfigureSpiMode(channel, mode));
        self.outcome("configure_spi_mode")
    }

    fn disable_spi_delays(&mut self, channel: u8) -> Result<()> {
        self.push(Call::DisableSpiDelays(channel));
        self.outcome("disable_spi_delays")
    }

    fn select_cs(&mut self, channel: u8) -> Result<()> {
        self.push(Call::SelectCs(channel));
        self.outcome("select_cs")
    }

    fn disable_cs(&mut self, channel: u8) -> Result<()> {
        self.push(Call::DisableCs(channel));
        self.outcome("disable_cs")
    }

    fn spi_write(&mut self, data: &[u8], endpoint: u8) -> Result<()> {
        self.push(Call::SpiWrite(data.to_vec(), endpoint));
        self.outcome("spi_write")
    }

    fn silicon_version(&self) -> Result<SiliconVersion> {
        self.outcome("silicon_version")?;
        Ok(SiliconVersion { major: 0, minor: 6 })
    }

    fn manufacturer_desc(&self) -> Result<String> {
        self.outcome("manufacturer_desc")?;
        Ok("Bloguetronica".to_string())
    }

    fn product_desc(&self) -> Result<String> {
        self.outcome("product_desc")?;
        Ok("FAU201 Voltage Output Device".to_string())
    }

    fn serial_desc(&self) -> Result<String> {
        self.outcome("serial_desc")?;
        Ok(FAKE_SERIALS[0].to_string())
    }

    fn usb_config(&self) -> Result<UsbConfig> {
        self.outcome("usb_config")?;
        Ok(self.usb_config)
    }

    fn reset(&mut self) -> Result<()> {
        self.push(Call::Reset);
        self.outcome("reset")
    }

    fn list_devices(_vid: u16, _pid: u16) -> Result<Vec<String>> {
        Ok(FAKE_SERIALS.iter().map(|s| s.to_string()).collect())
    }
}

pub type FakeDevice = Fau201Device<FakeBridge, Box<dyn FnMut(Duration)>>;

/// Controller over a fake bridge. Settle waits are logged, not slept.
pub fn fake_device() -> (FakeDevice, CallLog) {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let wait_log = Rc::clone(&log);
    let wait: Box<dyn FnMut(Duration)> =
        Box::new(move |d: Duration| wait_log.borrow_mut().push(Call::Wait(d)));
    (Fau201Device::with_bridge(FakeBridge::new(Rc::clone(&log)), wait), log)
}

/// Like [`fake_device`], already opened.
pub fn open_fake_device() -> (FakeDevice, CallLog) {
    let (mut device, log) = fake_device();
    assert_eq!(device.open(None), OpenStatus::Success);
    log.borrow_mut().clear();
    (device, log)
}

/// SPI payloads written so far.
pub fn spi_writes(log: &CallLog) -> Vec<Vec<u8>> {
    log.borrow()
        .iter()
        .filter_map(|call| match call {
            Call::SpiWrite(data, _) => Some(data.clone()),
            _ => None,
        })
        .collect()
}
