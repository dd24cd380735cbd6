use avr_device::atmega128::{EXINT, PORTD};
use core::convert::Infallible;
use core::marker::PhantomData;
use embedded_hal::digital::v2::InputPin;

pub trait PinMode {}
pub struct Input;
impl PinMode for Input {}

#[derive(Debug)]
pub struct Pin<PORT, const PIN: u8, MODE> {
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

impl<PORT, const P: u8, MODE> Pin<PORT, P, MODE> {
    /// # Safety
    /// Only one handle per physical pin may exist.
    pub const unsafe fn steal() -> Self {
        Pin {
            _port: PhantomData,
            _mode: PhantomData,
        }
    }
}

macro_rules! impl_port {
    ($PORT:ident, $ddr:ident, $port:ident, $pin:ident) => {
        impl<const P: u8, MODE: PinMode> Pin<$PORT, P, MODE> {
            /// Input with pull-up; buttons pull the line low
            pub fn into_pull_up_input(self) -> Pin<$PORT, P, Input> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin {
                    _port: PhantomData,
                    _mode: PhantomData,
                }
            }
        }

        impl<const P: u8> InputPin for Pin<$PORT, P, Input> {
            type Error = Infallible;

            #[inline]
            fn is_high(&self) -> Result<bool, Infallible> {
                Ok(unsafe { (*$PORT::ptr()).$pin.read().bits() } & (1 << P) != 0)
            }

            #[inline]
            fn is_low(&self) -> Result<bool, Infallible> {
                self.is_high().map(|high| !high)
            }
        }
    };
}

impl_port!(PORTD, ddrd, portd, pind);

/// Sense control for INT0..INT3. Edges on these lines are detected
/// asynchronously, so they wake the core from power-save. INT4..INT7 edges
/// need the I/O clock and are not offered here.
#[derive(Clone, Copy)]
#[repr(u8)]
pub enum Edge {
    Falling = 0b10,
    Rising = 0b11,
}

/// Highest external interrupt line whose edges wake from power-save
pub const ASYNC_INT_MAX: u8 = 3;

pub struct ExtInt {
    _private: (),
}

impl ExtInt {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Enable external interrupt `line` (0..=3)
    pub fn listen(&mut self, line: u8, edge: Edge) {
        let line = line & ASYNC_INT_MAX;
        let shift = line * 2;
        unsafe {
            let p = EXINT::ptr();
            // Mask first: changing ISCn can raise a stray request
            (*p).eimsk.modify(|r, w| w.bits(r.bits() & !(1 << line)));
            (*p).eicra.modify(|r, w| w.bits((r.bits() & !(0b11 << shift)) | ((edge as u8) << shift)));
            (*p).eifr.write(|w| w.bits(1 << line));
            (*p).eimsk.modify(|r, w| w.bits(r.bits() | (1 << line)));
        }
    }

    pub fn unlisten(&mut self, line: u8) {
        let line = line & ASYNC_INT_MAX;
        unsafe {
            (*EXINT::ptr()).eimsk.modify(|r, w| w.bits(r.bits() & !(1 << line)));
        }
    }
}

impl Default for ExtInt {
    fn default() -> Self {
        Self::new()
    }
}

// BigAVR2 board wiring
pub mod board {
    use super::*;

    /// INT0
    pub type BTN1 = Pin<PORTD, 0, Input>;
    /// INT1
    pub type BTN2 = Pin<PORTD, 1, Input>;

    pub const BTN1_INT: u8 = 0;
    pub const BTN2_INT: u8 = 1;

    // Buttons must sit on lines that can wake the core from power-save
    const _: () = assert!(BTN1_INT <= ASYNC_INT_MAX && BTN2_INT <= ASYNC_INT_MAX);
}
