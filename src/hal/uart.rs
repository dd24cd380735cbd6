//! Interrupt-driven USART0 with a transmit ring buffer

use avr_device::atmega128::USART0;
use avr_device::interrupt::Mutex;
use core::cell::RefCell;

use crate::config::{CPU_FREQ_HZ, UART_BAUD};

// Buffer size must be power of 2 for efficient masking
const BUFFER_SIZE: usize = 64;
const BUFFER_MASK: usize = BUFFER_SIZE - 1;

const UBRR: u16 = (CPU_FREQ_HZ / (16 * UART_BAUD) - 1) as u16;

// UCSR0A
const TXC: u8 = 1 << 6;
const UDRE: u8 = 1 << 5;
// UCSR0B
const UDRIE: u8 = 1 << 5;
const TXEN: u8 = 1 << 3;

pub struct Buffer {
    data: [u8; BUFFER_SIZE],
    write_idx: usize,
    read_idx: usize,
}

impl Buffer {
    const fn new() -> Self {
        Self {
            data: [0; BUFFER_SIZE],
            write_idx: 0,
            read_idx: 0,
        }
    }

    fn write(&mut self, byte: u8) -> bool {
        let next_write = (self.write_idx + 1) & BUFFER_MASK;
        if next_write != self.read_idx {
            self.data[self.write_idx] = byte;
            self.write_idx = next_write;
            true
        } else {
            false
        }
    }

    fn read(&mut self) -> Option<u8> {
        if self.read_idx != self.write_idx {
            let byte = self.data[self.read_idx];
            self.read_idx = (self.read_idx + 1) & BUFFER_MASK;
            Some(byte)
        } else {
            None
        }
    }

    fn is_empty(&self) -> bool {
        self.read_idx == self.write_idx
    }
}

static TX_BUFFER: Mutex<RefCell<Buffer>> = Mutex::new(RefCell::new(Buffer::new()));

pub struct Uart {
    _private: (),
}

impl Uart {
    pub fn new() -> Self {
        unsafe {
            let p = USART0::ptr();
            (*p).ubrr0h.write(|w| w.bits((UBRR >> 8) as u8));
            (*p).ubrr0l.write(|w| w.bits(UBRR as u8));
            // 8N1
            (*p).ucsr0c.write(|w| w.bits(0x06));
            (*p).ucsr0b.write(|w| w.bits(TXEN));
        }
        Self { _private: () }
    }

    pub fn write_byte(&mut self, byte: u8) {
        loop {
            let queued = avr_device::interrupt::free(|cs| {
                TX_BUFFER.borrow(cs).borrow_mut().write(byte)
            });
            unsafe {
                (*USART0::ptr()).ucsr0b.modify(|r, w| w.bits(r.bits() | UDRIE));
            }
            if queued {
                return;
            }
            // Full: the UDRE interrupt drains it
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }

    /// Block until the last stop bit has left the shift register
    pub fn flush(&mut self) {
        while !avr_device::interrupt::free(|cs| TX_BUFFER.borrow(cs).borrow().is_empty()) {}
        unsafe {
            let p = USART0::ptr();
            while (*p).ucsr0a.read().bits() & (TXC | UDRE) != (TXC | UDRE) {}
        }
    }
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}

#[avr_device::interrupt(atmega128)]
fn USART0_UDRE() {
    avr_device::interrupt::free(|cs| unsafe {
        let p = USART0::ptr();
        match TX_BUFFER.borrow(cs).borrow_mut().read() {
            Some(byte) => {
                // Clear TXC so flush sees this byte complete
                (*p).ucsr0a.write(|w| w.bits(TXC));
                (*p).udr0.write(|w| w.bits(byte));
            }
            None => (*p).ucsr0b.modify(|r, w| w.bits(r.bits() & !UDRIE)),
        }
    });
}
