use core::convert::Infallible;

use crate::hal::Uart;
use crate::logger::Console;

/// USART0 as the log console
pub struct SerialConsole {
    uart: Uart,
}

impl SerialConsole {
    pub fn new() -> Self {
        Self { uart: Uart::new() }
    }
}

impl Default for SerialConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ufmt::uWrite for SerialConsole {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        for line in s.split_inclusive('\n') {
            match line.strip_suffix('\n') {
                Some(text) => {
                    self.uart.write_str(text);
                    self.uart.write_str("\r\n");
                }
                None => self.uart.write_str(line),
            }
        }
        Ok(())
    }
}

impl Console for SerialConsole {
    fn flush(&mut self) {
        self.uart.flush();
    }
}
