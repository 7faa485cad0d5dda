//! Serial port discovery.

use crate::error::{Error, Result};
use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::debug;

/// Source of candidate port identifiers, in preference order.
pub trait PortLister {
    fn list_ports(&self) -> Result<Vec<String>>;
}

/// Ports reported by the operating system.
///
/// Enumeration goes through `serialport`, which picks the platform backend
/// (registry on Windows, udev/sysfs on Linux, IOKit on macOS) at build time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortLister;

impl SystemPortLister {
    /// Full port descriptions, for listings that show more than the name.
    pub fn port_infos(&self) -> Result<Vec<SerialPortInfo>> {
        Ok(tokio_serial::available_ports()?)
    }
}

impl PortLister for SystemPortLister {
    fn list_ports(&self) -> Result<Vec<String>> {
        let ports: Vec<String> = self.port_infos()?.into_iter().map(|p| p.port_name).collect();
        debug!(count = ports.len(), "Enumerated serial ports");
        Ok(ports)
    }
}

/// A caller-supplied list, e.g. from configuration or a `--port` flag.
#[derive(Debug, Default, Clone)]
pub struct FixedPortLister(pub Vec<String>);

impl PortLister for FixedPortLister {
    fn list_ports(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// The first listed port. Not necessarily the intended device when several are attached.
pub fn first_port(lister: &dyn PortLister) -> Result<String> {
    lister.list_ports()?.into_iter().next().ok_or(Error::NoDevices)
}

/// Short human-readable kind of a port, for listings.
pub fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut text = format!("USB {:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                text.push_str(&format!(" {product}"));
            }
            if let Some(manufacturer) = &usb.manufacturer {
                text.push_str(&format!(" ({manufacturer})"));
            }
            text
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_port_is_deterministic() {
        let lister = FixedPortLister(vec!["/dev/ttyACM1".into(), "/dev/ttyACM0".into()]);
        assert_eq!(first_port(&lister).unwrap(), "/dev/ttyACM1");
    }

    #[test]
    fn test_no_ports() {
        let lister = FixedPortLister::default();
        assert!(matches!(first_port(&lister), Err(Error::NoDevices)));
    }

    #[test]
    fn test_describe_non_usb_ports() {
        assert_eq!(describe_port_type(&SerialPortType::PciPort), "PCI");
        assert_eq!(describe_port_type(&SerialPortType::Unknown), "unknown");
    }
}
