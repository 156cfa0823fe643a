//! Discover FAU201 devices and print what they report about themselves.
//!
//! Optionally sets the output voltage of the first device.
//!
//! # Usage
//!
//! ```sh
//! # Show device info
//! cargo run --example fau201_info
//!
//! # Also set the output to 1.5 V
//! cargo run --example fau201_info -- 1.5
//! ```

use fau201::{Diagnostics, Fau201Device, OpenStatus};
use std::env;
use std::process;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let voltage = match env::args().nth(1).map(|arg| arg.parse::<f32>()) {
        None => None,
        Some(Ok(v)) => Some(v),
        Some(Err(e)) => {
            eprintln!("Invalid voltage: {}", e);
            process::exit(2);
        }
    };

    let mut diag = Diagnostics::new();
    let serials = Fau201Device::list_devices(&mut diag);
    if serials.is_empty() {
        println!("No FAU201 devices found.");
        process::exit(if diag.is_ok() { 0 } else { 1 });
    }
    for serial in &serials {
        println!("Found FAU201 {}", serial);
    }

    let mut device = Fau201Device::new();
    let status = device.open(Some(&serials[0]));
    if status != OpenStatus::Success {
        eprintln!("Failed to open {}: {}", serials[0], status.name());
        process::exit(1);
    }

    device.setup(&mut diag);

    let not_found = || String::from("(not found)");
    println!(
        "Manufacturer: {}",
        device.manufacturer_desc(&mut diag).unwrap_or_else(not_found)
    );
    println!(
        "Product: {}",
        device.product_desc(&mut diag).unwrap_or_else(not_found)
    );
    println!(
        "Serial: {}",
        device.serial_desc(&mut diag).unwrap_or_else(not_found)
    );
    println!(
        "Hardware revision: {}",
        device.hardware_revision(&mut diag).unwrap_or_else(not_found)
    );
    match device.cp2130_silicon_version(&mut diag) {
        Some(v) => println!("CP2130 version: {}.{}", v.major, v.minor),
        None => println!("CP2130 version: (not found)"),
    }

    if let Some(v) = voltage {
        device.set_voltage(v, &mut diag);
        println!("Output set to {} V", v);
    }

    device.close();

    if !diag.is_ok() {
        eprint!("{}", diag);
        process::exit(1);
    }
}
