#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use avr_device::interrupt::{self, Mutex};
    use core::cell::RefCell;
    use panic_halt as _;

    use wakeup_firmware::drivers::{
        ButtonWakeup, IrqSignal, PowerWakeup, RtcRearm, RtcWakeup, SerialConsole, WdtWakeup,
        Worker,
    };
    use wakeup_firmware::hal::gpio::Edge as Sense;
    use wakeup_firmware::hal::{
        board, timer, ExtInt, LpAlarm, LpTimer, Pin, Power, PowerSaveLatch, RtcAlarm, SysTick,
        Watchdog,
    };
    use wakeup_firmware::os::avr::{install_idle, on_deep_wake, AvrPort};
    use wakeup_firmware::rtos::TicklessIdle;
    use wakeup_firmware::{BinarySemaphore, EventRegistry, IdleConfig, Logger, WakeupMonitor};

    static REGISTRY: EventRegistry<AvrPort> = EventRegistry::new(AvrPort);
    static RTC_REARM: BinarySemaphore<AvrPort> = BinarySemaphore::new(AvrPort);

    type Button<PIN> = ButtonWakeup<'static, AvrPort, PIN>;

    static BUTTON1: Mutex<RefCell<Option<Button<board::BTN1>>>> = Mutex::new(RefCell::new(None));
    static BUTTON2: Mutex<RefCell<Option<Button<board::BTN2>>>> = Mutex::new(RefCell::new(None));
    static RTC: Mutex<RefCell<Option<RtcWakeup<'static, 'static, AvrPort, AvrPort, RtcAlarm>>>> =
        Mutex::new(RefCell::new(None));
    static PWR: Mutex<RefCell<Option<PowerWakeup<'static, AvrPort, PowerSaveLatch>>>> =
        Mutex::new(RefCell::new(None));

    #[avr_device::entry]
    fn main() -> ! {
        timer::init_async_timer();
        install_idle(TicklessIdle::new(
            SysTick::new(),
            LpTimer::new(),
            LpAlarm::new(),
            Power::new(),
            IdleConfig::new(),
        ));

        let mut monitor = WakeupMonitor::new(&REGISTRY, Logger::new(SerialConsole::new()));
        monitor.logger_mut().info("ATmega128 wake-up monitor");

        let mut pwr = PowerWakeup::new(PowerSaveLatch::new(), &REGISTRY);
        monitor.configure(&mut pwr).ok();

        let btn1: board::BTN1 = unsafe { Pin::steal() };
        let btn2: board::BTN2 = unsafe { Pin::steal() };
        let mut button1 = ButtonWakeup::button1(btn1.into_pull_up_input(), &REGISTRY);
        let mut button2 = ButtonWakeup::button2(btn2.into_pull_up_input(), &REGISTRY);
        monitor.configure(&mut button1).ok();
        monitor.configure(&mut button2).ok();
        let mut ext = ExtInt::new();
        // Buttons are active low: release is the rising edge
        ext.listen(board::BTN1_INT, Sense::Rising);
        ext.listen(board::BTN2_INT, Sense::Rising);

        let mut wdt = WdtWakeup::new(Watchdog::new(), &REGISTRY);
        monitor.configure(&mut wdt).ok();

        let mut rtc_worker = Worker::new(&RTC_REARM, &REGISTRY, RtcRearm::new(RtcAlarm::new()));
        monitor.configure(rtc_worker.check_mut()).ok();
        let rtc = RtcWakeup::new(RtcAlarm::new(), &REGISTRY, IrqSignal::new(&RTC_REARM));

        // UART CTS and I2C address match need a second USART and TWI slave
        // wake-up; not wired on this board

        interrupt::free(|cs| {
            BUTTON1.borrow(cs).replace(Some(button1));
            BUTTON2.borrow(cs).replace(Some(button2));
            RTC.borrow(cs).replace(Some(rtc));
            PWR.borrow(cs).replace(Some(pwr));
        });
        on_deep_wake(power_save_exit);

        unsafe { interrupt::enable() };

        loop {
            monitor.run_once();
            rtc_worker.poll(monitor.logger_mut());
        }
    }

    fn power_save_exit() {
        if !PowerSaveLatch::pending() {
            return;
        }
        interrupt::free(|cs| {
            if let Some(pwr) = PWR.borrow(cs).borrow_mut().as_mut() {
                pwr.on_interrupt();
            }
        });
    }

    #[avr_device::interrupt(atmega128)]
    fn INT0() {
        interrupt::free(|cs| {
            if let Some(button) = BUTTON1.borrow(cs).borrow_mut().as_mut() {
                button.on_edge();
            }
        });
    }

    #[avr_device::interrupt(atmega128)]
    fn INT1() {
        interrupt::free(|cs| {
            if let Some(button) = BUTTON2.borrow(cs).borrow_mut().as_mut() {
                button.on_edge();
            }
        });
    }

    #[avr_device::interrupt(atmega128)]
    fn TIMER0_OVF() {
        if timer::on_overflow() {
            interrupt::free(|cs| {
                if let Some(rtc) = RTC.borrow(cs).borrow_mut().as_mut() {
                    rtc.on_interrupt();
                }
            });
        }
    }

    #[avr_device::interrupt(atmega128)]
    fn TIMER1_COMPA() {
        SysTick::on_tick();
    }
}

/// Host build: the same monitor and producers, with threads standing in for
/// interrupt handlers and a wall clock for the RTC.
#[cfg(all(not(target_arch = "avr"), feature = "std"))]
mod simulation {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    use embedded_hal::digital::v2::InputPin;
    use wakeup_firmware::drivers::{
        AlarmFlag, AlarmScheduler, ButtonWakeup, IrqSignal, PowerWakeup, RtcRearm, RtcWakeup,
        WakeLatch, Worker,
    };
    use wakeup_firmware::drivers::{ConfigError, WatchdogWake, WdtWakeup};
    use wakeup_firmware::os::host::{HostPort, StdoutConsole};
    use wakeup_firmware::{BinarySemaphore, EventRegistry, Logger, WakeupMonitor};

    /// Button line, high when released
    struct SimPin(AtomicBool);

    impl InputPin for &SimPin {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(self.0.load(Ordering::Acquire))
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    #[derive(Default)]
    struct SimRtc {
        alarm_at: Mutex<Option<Instant>>,
        fired: AtomicBool,
    }

    impl SimRtc {
        fn tick(&self) -> bool {
            let Ok(mut alarm_at) = self.alarm_at.lock() else {
                return false;
            };
            match *alarm_at {
                Some(at) if Instant::now() >= at => {
                    *alarm_at = None;
                    self.fired.store(true, Ordering::Release);
                    true
                }
                _ => false,
            }
        }
    }

    impl AlarmFlag for &SimRtc {
        fn take_alarm(&mut self) -> bool {
            self.fired.swap(false, Ordering::AcqRel)
        }
    }

    impl AlarmScheduler for &SimRtc {
        type Error = ();

        fn schedule_alarm(&mut self, secs: u32) -> Result<(), ()> {
            let mut alarm_at = self.alarm_at.lock().map_err(|_| ())?;
            *alarm_at = Some(Instant::now() + Duration::from_secs(secs as u64));
            Ok(())
        }
    }

    struct SimLatch;

    impl WakeLatch for SimLatch {
        fn enable(&mut self) -> Result<(), ConfigError> {
            Ok(())
        }

        fn clear(&mut self) {}
    }

    /// Host watchdog only resets, like the ATmega128's
    struct SimWatchdog;

    impl WatchdogWake for SimWatchdog {
        fn enable_wakeup(&mut self) -> Result<(), ConfigError> {
            Err(ConfigError::Unsupported)
        }

        fn take_timeout(&mut self) -> bool {
            false
        }

        fn reset_counter(&mut self) {}

        fn take_wakeup(&mut self) -> bool {
            false
        }
    }

    pub fn run(cycles: Option<u32>) {
        let registry = EventRegistry::new(HostPort::new());
        let rtc_rearm = BinarySemaphore::new(HostPort::new());
        let rtc_hw = SimRtc::default();
        let pin = SimPin(AtomicBool::new(true));

        let mut monitor = WakeupMonitor::new(&registry, Logger::new(StdoutConsole));
        monitor.logger_mut().info("host wake-up monitor");

        let mut pwr = PowerWakeup::new(SimLatch, &registry);
        let mut button = ButtonWakeup::button1(&pin, &registry);
        let mut wdt = WdtWakeup::new(SimWatchdog, &registry);
        let mut rtc_worker = Worker::new(&rtc_rearm, &registry, RtcRearm::new(&rtc_hw));
        let mut rtc = RtcWakeup::new(&rtc_hw, &registry, IrqSignal::new(&rtc_rearm));

        monitor.configure(&mut pwr).ok();
        monitor.configure(&mut button).ok();
        monitor.configure(&mut wdt).ok();
        monitor.configure(rtc_worker.check_mut()).ok();

        thread::scope(|s| {
            s.spawn(|| {
                let mut log = Logger::new(StdoutConsole);
                rtc_worker.run(&mut log)
            });

            s.spawn(|| loop {
                thread::sleep(Duration::from_millis(10));
                if rtc_hw.tick() {
                    // Core was in power-save when the alarm hit
                    pwr.on_interrupt();
                    rtc.on_interrupt();
                }
            });

            s.spawn(|| loop {
                thread::sleep(Duration::from_millis(4700));
                pin.0.store(false, Ordering::Release);
                button.on_edge();
                thread::sleep(Duration::from_millis(80));
                pin.0.store(true, Ordering::Release);
                button.on_edge();
            });

            let mut done = 0;
            loop {
                monitor.run_once();
                done += 1;
                if cycles.is_some_and(|limit| done >= limit) {
                    std::process::exit(0);
                }
            }
        });
    }
}

#[cfg(all(not(target_arch = "avr"), feature = "std"))]
fn main() {
    let cycles = std::env::args().nth(1).and_then(|arg| arg.parse().ok());
    simulation::run(cycles);
}

#[cfg(all(not(target_arch = "avr"), not(feature = "std")))]
fn main() {
    eprintln!("host simulation needs the `std` feature");
}
