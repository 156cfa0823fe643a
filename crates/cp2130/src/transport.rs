//! USB transport layer for the CP2130.

use crate::error::{Error, OpenStatus, Result};
use crate::types::{SiliconVersion, SpiMode, UsbConfig};
use crate::{Bridge, MAX_CHANNEL};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::cell::Cell;
use std::time::Duration;

/// Default timeout for USB transfers.
const USB_TIMEOUT: Duration = Duration::from_millis(500);

// bmRequestType values: vendor request, device recipient
const REQUEST_TYPE_OUT: u8 = 0x40;
const REQUEST_TYPE_IN: u8 = 0xC0;
// standard request, device recipient
const REQUEST_TYPE_STANDARD_IN: u8 = 0x80;

const GET_DESCRIPTOR: u8 = 0x06;
const DESCRIPTOR_TYPE_STRING: u8 = 0x03;

// CP2130 vendor request codes (AN792)
const RESET_DEVICE: u8 = 0x10;
const GET_READONLY_VERSION: u8 = 0x11;
const SET_GPIO_CHIP_SELECT: u8 = 0x25;
const SET_SPI_WORD: u8 = 0x31;
const SET_SPI_DELAY: u8 = 0x33;
const GET_USB_CONFIG: u8 = 0x60;

// Set_GPIO_Chip_Select control values
const CS_DISABLE: u8 = 0x00;
const CS_ENABLE_EXCLUSIVE: u8 = 0x02;

// Bulk command byte for an SPI write
const SPI_WRITE_COMMAND: u8 = 0x01;

const INTERFACE: u8 = 0;

/// CP2130 bridge accessed through `rusb`.
pub struct Cp2130 {
    handle: Option<DeviceHandle<Context>>,
    disconnected: Cell<bool>,
    /// A kernel driver was detached on open and must be reattached on close.
    kernel_driver_detached: bool,
    timeout: Duration,
}

impl Default for Cp2130 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cp2130 {
    /// Create a closed bridge with the default transfer timeout.
    pub fn new() -> Self {
        Self::with_timeout(USB_TIMEOUT)
    }

    /// Create a closed bridge using `timeout` for every USB transfer.
    pub fn with_timeout(timeout: Duration) -> Self {
        Cp2130 {
            handle: None,
            disconnected: Cell::new(false),
            kernel_driver_detached: false,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn handle(&self) -> Result<&DeviceHandle<Context>> {
        match &self.handle {
            None => Err(Error::NotOpen),
            Some(_) if self.disconnected.get() => Err(Error::Disconnected),
            Some(handle) => Ok(handle),
        }
    }

    /// Remember a vanished device so `disconnected()` can report it.
    fn track<T>(&self, result: rusb::Result<T>) -> rusb::Result<T> {
        if let Err(rusb::Error::NoDevice) = result {
            self.disconnected.set(true);
        }
        result
    }

    /// Claim the bridge interface on a matching device.
    ///
    /// A bound kernel driver is detached first. The returned flag tells
    /// whether that happened, so `close` can give the interface back.
    fn claim(
        device: &Device<Context>,
        mut handle: DeviceHandle<Context>,
    ) -> Result<(DeviceHandle<Context>, bool)> {
        let mut detached = false;
        if handle.kernel_driver_active(INTERFACE).unwrap_or(false) {
            tracing::debug!("Detaching kernel driver from interface {}", INTERFACE);
            match handle.detach_kernel_driver(INTERFACE) {
                Ok(()) => detached = true,
                Err(e) => tracing::warn!("Failed to detach kernel driver: {}", e),
            }
        }

        if let Err(e) = handle.claim_interface(INTERFACE) {
            if detached {
                let _ = handle.attach_kernel_driver(INTERFACE);
            }
            return Err(e.into());
        }
        tracing::debug!(
            "Claimed CP2130 at bus {:03} device {:03}",
            device.bus_number(),
            device.address()
        );
        Ok((handle, detached))
    }

    fn check_channel(channel: u8) -> Result<()> {
        if channel > MAX_CHANNEL {
            return Err(Error::InvalidChannel(channel));
        }
        Ok(())
    }

    /// Perform a vendor control OUT transfer carrying `data`.
    fn control_out(&self, request: u8, data: &[u8]) -> Result<()> {
        let handle = self.handle()?;
        let result = handle.write_control(REQUEST_TYPE_OUT, request, 0, 0, data, self.timeout);
        match self.track(result) {
            Ok(n) if n == data.len() => Ok(()),
            Ok(n) => Err(Error::ShortTransfer {
                expected: data.len(),
                actual: n,
            }),
            Err(e) => {
                tracing::debug!("Control OUT transfer failed: req=0x{:02X}, error={}", request, e);
                Err(Error::ControlTransferFailed(format!("request 0x{:02X}: {}", request, e)))
            }
        }
    }

    /// Perform a vendor control IN transfer, returning the bytes read.
    fn control_in(&self, request: u8, buf: &mut [u8]) -> Result<usize> {
        let handle = self.handle()?;
        let result = handle.read_control(REQUEST_TYPE_IN, request, 0, 0, buf, self.timeout);
        match self.track(result) {
            Ok(n) => Ok(n),
            Err(e) => {
                tracing::debug!("Control IN transfer failed: req=0x{:02X}, error={}", request, e);
                Err(Error::ControlTransferFailed(format!("request 0x{:02X}: {}", request, e)))
            }
        }
    }

    /// Perform a GET_DESCRIPTOR request for a string descriptor.
    fn read_string_descriptor(&self, index: u8, language: u16, buf: &mut [u8]) -> Result<usize> {
        let handle = self.handle()?;
        let value = (u16::from(DESCRIPTOR_TYPE_STRING) << 8) | u16::from(index);
        let result = handle.read_control(
            REQUEST_TYPE_STANDARD_IN,
            GET_DESCRIPTOR,
            value,
            language,
            buf,
            self.timeout,
        );
        match self.track(result) {
            Ok(n) => Ok(n),
            Err(e) => {
                tracing::debug!("String descriptor {} read failed: {}", index, e);
                Err(Error::ControlTransferFailed(format!("string descriptor {}: {}", index, e)))
            }
        }
    }

    /// Read string descriptor `index` in the device's first language.
    fn read_string(&self, name: &str, index: Option<u8>) -> Result<String> {
        let index =
            index.ok_or_else(|| Error::InvalidResponse(format!("no {} string", name)))?;

        let mut buf = [0u8; 255];
        let n = self.read_string_descriptor(0, 0, &mut buf)?;
        let language = *decode_languages(&buf[..n])?
            .first()
            .ok_or_else(|| Error::InvalidResponse("no string languages".to_string()))?;

        let n = self.read_string_descriptor(index, language, &mut buf)?;
        decode_string_descriptor(&buf[..n])
    }

    fn device_descriptor(&self) -> Result<rusb::DeviceDescriptor> {
        Ok(self.handle()?.device().device_descriptor()?)
    }
}

/// Payload of a string descriptor, after checking its two-byte header.
fn string_descriptor_payload(buf: &[u8]) -> Result<&[u8]> {
    if buf.len() < 2 {
        return Err(Error::ShortTransfer {
            expected: 2,
            actual: buf.len(),
        });
    }
    let length = buf[0] as usize;
    if buf[1] != DESCRIPTOR_TYPE_STRING {
        return Err(Error::InvalidResponse(format!(
            "descriptor type 0x{:02X}, expected string",
            buf[1]
        )));
    }
    if length > buf.len() {
        return Err(Error::ShortTransfer {
            expected: length,
            actual: buf.len(),
        });
    }
    if length < 2 || length % 2 != 0 {
        return Err(Error::InvalidResponse(format!(
            "string descriptor length {}",
            length
        )));
    }
    Ok(&buf[2..length])
}

fn utf16_units(payload: &[u8]) -> impl Iterator<Item = u16> + '_ {
    payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

/// Language IDs from string descriptor zero.
pub(crate) fn decode_languages(buf: &[u8]) -> Result<Vec<u16>> {
    Ok(utf16_units(string_descriptor_payload(buf)?).collect())
}

/// Text of a UTF-16LE string descriptor.
pub(crate) fn decode_string_descriptor(buf: &[u8]) -> Result<String> {
    let units: Vec<u16> = utf16_units(string_descriptor_payload(buf)?).collect();
    String::from_utf16(&units).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Build the bulk OUT frame for an SPI write: an 8-byte header followed by
/// the payload, with the payload length as a little-endian u32.
pub(crate) fn spi_write_frame(data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8 + data.len());
    frame.extend_from_slice(&[0x00, 0x00, SPI_WRITE_COMMAND, 0x00]);
    frame.extend_from_slice(&(data.len() as u32).to_le_bytes());
    frame.extend_from_slice(data);
    frame
}

impl Bridge for Cp2130 {
    fn open(&mut self, vid: u16, pid: u16, serial: Option<&str>) -> OpenStatus {
        if self.handle.is_some() {
            return OpenStatus::Success;
        }

        let context = match Context::new() {
            Ok(context) => context,
            Err(e) => {
                tracing::debug!("Failed to initialize USB context: {}", e);
                return OpenStatus::InitFailed;
            }
        };
        let devices = match context.devices() {
            Ok(devices) => devices,
            Err(e) => {
                tracing::debug!("Failed to list USB devices: {}", e);
                return OpenStatus::NotFound;
            }
        };

        for device in devices.iter() {
            let Ok(desc) = device.device_descriptor() else {
                continue;
            };
            if desc.vendor_id() != vid || desc.product_id() != pid {
                continue;
            }

            let handle = match device.open() {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::debug!("Skipping device that could not be opened: {}", e);
                    continue;
                }
            };

            if let Some(wanted) = serial {
                match handle.read_serial_number_string_ascii(&desc) {
                    Ok(found) if found == wanted => {}
                    _ => continue,
                }
            }

            return match Self::claim(&device, handle) {
                Ok((handle, detached)) => {
                    tracing::info!("Opened device {:04x}:{:04x}", vid, pid);
                    self.handle = Some(handle);
                    self.kernel_driver_detached = detached;
                    self.disconnected.set(false);
                    OpenStatus::Success
                }
                Err(e) => {
                    tracing::debug!("Failed to claim interface: {}", e);
                    OpenStatus::Busy
                }
            };
        }

        OpenStatus::NotFound
    }

    fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.release_interface(INTERFACE) {
                tracing::debug!("Failed to release USB interface: {}", e);
            }
            if self.kernel_driver_detached {
                if let Err(e) = handle.attach_kernel_driver(INTERFACE) {
                    tracing::debug!("Failed to reattach kernel driver: {}", e);
                }
            }
            tracing::info!("Device closed");
        }
        self.kernel_driver_detached = false;
        self.disconnected.set(false);
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn disconnected(&self) -> bool {
        self.disconnected.get()
    }

    fn configure_spi_mode(&mut self, channel: u8, mode: SpiMode) -> Result<()> {
        Self::check_channel(channel)?;
        self.control_out(SET_SPI_WORD, &[channel, mode.to_word()])
    }

    fn disable_spi_delays(&mut self, channel: u8) -> Result<()> {
        Self::check_channel(channel)?;
        // channel, delay mask, then three zeroed u16 delays
        self.control_out(SET_SPI_DELAY, &[channel, 0, 0, 0, 0, 0, 0, 0])
    }

    fn select_cs(&mut self, channel: u8) -> Result<()> {
        Self::check_channel(channel)?;
        self.control_out(SET_GPIO_CHIP_SELECT, &[channel, CS_ENABLE_EXCLUSIVE])
    }

    fn disable_cs(&mut self, channel: u8) -> Result<()> {
        Self::check_channel(channel)?;
        self.control_out(SET_GPIO_CHIP_SELECT, &[channel, CS_DISABLE])
    }

    fn spi_write(&mut self, data: &[u8], endpoint: u8) -> Result<()> {
        let handle = self.handle()?;
        let frame = spi_write_frame(data);
        match self.track(handle.write_bulk(endpoint, &frame, self.timeout)) {
            Ok(n) if n == frame.len() => Ok(()),
            Ok(n) => Err(Error::ShortTransfer {
                expected: frame.len(),
                actual: n,
            }),
            Err(e) => {
                tracing::debug!("Bulk OUT transfer failed: ep=0x{:02X}, error={}", endpoint, e);
                Err(e.into())
            }
        }
    }

    fn silicon_version(&self) -> Result<SiliconVersion> {
        let mut buf = [0u8; 2];
        let n = self.control_in(GET_READONLY_VERSION, &mut buf)?;
        if n < buf.len() {
            return Err(Error::ShortTransfer {
                expected: buf.len(),
                actual: n,
            });
        }
        Ok(SiliconVersion {
            major: buf[0],
            minor: buf[1],
        })
    }

    fn manufacturer_desc(&self) -> Result<String> {
        let desc = self.device_descriptor()?;
        self.read_string("manufacturer", desc.manufacturer_string_index())
    }

    fn product_desc(&self) -> Result<String> {
        let desc = self.device_descriptor()?;
        self.read_string("product", desc.product_string_index())
    }

    fn serial_desc(&self) -> Result<String> {
        let desc = self.device_descriptor()?;
        self.read_string("serial", desc.serial_number_string_index())
    }

    fn usb_config(&self) -> Result<UsbConfig> {
        let mut buf = [0u8; UsbConfig::LEN];
        let n = self.control_in(GET_USB_CONFIG, &mut buf)?;
        tracing::debug!("usb_config buffer: {:02X?}", &buf[..n]);
        UsbConfig::from_bytes(&buf[..n])
    }

    fn reset(&mut self) -> Result<()> {
        self.control_out(RESET_DEVICE, &[])?;
        tracing::info!("Device reset issued");
        Ok(())
    }

    fn list_devices(vid: u16, pid: u16) -> Result<Vec<String>> {
        let context = Context::new()?;
        let devices = context.devices()?;
        let mut result = Vec::new();

        for device in devices.iter() {
            let Ok(desc) = device.device_descriptor() else {
                continue;
            };
            if desc.vendor_id() != vid || desc.product_id() != pid {
                continue;
            }

            match device
                .open()
                .and_then(|handle| handle.read_serial_number_string_ascii(&desc))
            {
                Ok(serial) => result.push(serial),
                Err(e) => tracing::debug!(
                    "Skipping device at bus {:03} device {:03}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                ),
            }
        }

        Ok(result)
    }
}

impl Drop for Cp2130 {
    fn drop(&mut self) {
        self.close();
    }
}
