//! FAU201 device controller.

use cp2130::{Bridge, Cp2130, OpenStatus, SiliconVersion, UsbConfig};

use crate::diagnostics::Diagnostics;
use crate::protocol::{
    self, CHANNEL, CONFIG_COMMAND, EPOUT, PID, SETTLE_DELAY, SPI_MODE, VID, VoltageCode,
};
use crate::wait::{ThreadSleep, Wait};

/// Controller for one FAU201 unit.
///
/// Owns the bridge used to reach the device and the wait primitive used for
/// the settle delay. Operations that touch hardware take a [`Diagnostics`]
/// and record failures there instead of returning early.
pub struct Fau201Device<B: Bridge = Cp2130, W: Wait = ThreadSleep> {
    bridge: B,
    wait: W,
}

impl Default for Fau201Device {
    fn default() -> Self {
        Self::new()
    }
}

impl Fau201Device {
    /// Controller backed by a `rusb` CP2130 bridge. Nothing is opened yet.
    pub fn new() -> Self {
        Self::with_bridge(Cp2130::new(), ThreadSleep)
    }

    /// Serial strings of all attached FAU201 devices.
    pub fn list_devices(diag: &mut Diagnostics) -> Vec<String> {
        Self::list_devices_with::<Cp2130>(diag)
    }
}

impl<B: Bridge, W: Wait> Fau201Device<B, W> {
    pub fn with_bridge(bridge: B, wait: W) -> Self {
        Fau201Device { bridge, wait }
    }

    /// Serial strings of all attached FAU201 devices, enumerated through
    /// bridge type `T`.
    pub fn list_devices_with<T: Bridge>(diag: &mut Diagnostics) -> Vec<String> {
        diag.check("list_devices", T::list_devices(VID, PID))
            .unwrap_or_default()
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    /// True if the device was open and has since been unplugged.
    pub fn disconnected(&self) -> bool {
        self.bridge.disconnected()
    }

    pub fn is_open(&self) -> bool {
        self.bridge.is_open()
    }

    /// Close the device if open. Safe to call any number of times.
    pub fn close(&mut self) {
        self.bridge.close();
    }

    /// Open the device with the given serial, or the first one found.
    pub fn open(&mut self, serial: Option<&str>) -> OpenStatus {
        let status = self.bridge.open(VID, PID, serial);
        tracing::debug!("open({:?}) -> {}", serial, status.name());
        status
    }

    /// Silicon version of the CP2130 bridge.
    pub fn cp2130_silicon_version(&self, diag: &mut Diagnostics) -> Option<SiliconVersion> {
        diag.check("silicon_version", self.bridge.silicon_version())
    }

    /// Hardware revision, derived from the USB configuration.
    pub fn hardware_revision(&self, diag: &mut Diagnostics) -> Option<String> {
        self.usb_config(diag)
            .map(|config| protocol::hardware_revision(&config))
    }

    pub fn manufacturer_desc(&self, diag: &mut Diagnostics) -> Option<String> {
        diag.check("manufacturer_desc", self.bridge.manufacturer_desc())
    }

    pub fn product_desc(&self, diag: &mut Diagnostics) -> Option<String> {
        diag.check("product_desc", self.bridge.product_desc())
    }

    pub fn serial_desc(&self, diag: &mut Diagnostics) -> Option<String> {
        diag.check("serial_desc", self.bridge.serial_desc())
    }

    pub fn usb_config(&self, diag: &mut Diagnostics) -> Option<UsbConfig> {
        diag.check("usb_config", self.bridge.usb_config())
    }

    /// Reset the bridge and with it the whole device. Run [`setup`] again
    /// before setting a voltage.
    ///
    /// [`setup`]: Fau201Device::setup
    pub fn reset(&mut self, diag: &mut Diagnostics) {
        diag.check("reset", self.bridge.reset());
    }

    /// Configure the SPI channel and put the DAC in external reference mode.
    ///
    /// Every step runs even if an earlier one failed.
    pub fn setup(&mut self, diag: &mut Diagnostics) {
        diag.check("configure_spi_mode", self.bridge.configure_spi_mode(CHANNEL, SPI_MODE));
        diag.check("disable_spi_delays", self.bridge.disable_spi_delays(CHANNEL));
        self.framed_write(&CONFIG_COMMAND, diag);
        tracing::info!("Setup done with {} error(s)", diag.count());
    }

    /// Set the output voltage, in volts.
    ///
    /// A value outside `[0, 4.095]` records one error and touches no
    /// hardware.
    pub fn set_voltage(&mut self, voltage: f32, diag: &mut Diagnostics) {
        match VoltageCode::from_volts(voltage) {
            Ok(code) => {
                tracing::debug!("set_voltage({}) -> code {}", voltage, code.value());
                self.framed_write(&code.command(), diag);
            }
            Err(e) => diag.record("set_voltage", e),
        }
    }

    /// Select the DAC, write `payload`, let the bridge settle, deselect.
    fn framed_write(&mut self, payload: &[u8], diag: &mut Diagnostics) {
        diag.check("select_cs", self.bridge.select_cs(CHANNEL));
        diag.check("spi_write", self.bridge.spi_write(payload, EPOUT));
        self.wait.wait(SETTLE_DELAY);
        diag.check("disable_cs", self.bridge.disable_cs(CHANNEL));
    }
}

impl<B: Bridge, W: Wait> Drop for Fau201Device<B, W> {
    fn drop(&mut self) {
        self.bridge.close();
    }
}
