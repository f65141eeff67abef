//! UART adapter for the [`SerialLink`] port.
//!
//! Two instances run on the target: UART1 to the companion MCU and UART2 to
//! the GSM modem.  Reads never wait; an empty receive FIFO yields zero bytes.

#[cfg(target_os = "espidf")]
use esp_idf_hal::{delay::NON_BLOCK, uart::UartDriver};

#[cfg(target_os = "espidf")]
use crate::app::ports::SerialLink;
#[cfg(target_os = "espidf")]
use crate::error::LinkError;

#[cfg(target_os = "espidf")]
pub struct UartLink<'d> {
    driver: UartDriver<'d>,
    label: &'static str,
}

#[cfg(target_os = "espidf")]
impl<'d> UartLink<'d> {
    pub fn new(driver: UartDriver<'d>, label: &'static str) -> Self {
        Self { driver, label }
    }
}

#[cfg(target_os = "espidf")]
impl SerialLink for UartLink<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let mut sent = 0;
        while sent < bytes.len() {
            match self.driver.write(&bytes[sent..]) {
                Ok(n) => sent += n,
                Err(e) => {
                    log::warn!("{}: UART write failed: {}", self.label, e);
                    return Err(LinkError::WriteFailed);
                }
            }
        }
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.driver.read(buf, NON_BLOCK).map_err(|e| {
            log::warn!("{}: UART read failed: {}", self.label, e);
            LinkError::ReadFailed
        })
    }
}
