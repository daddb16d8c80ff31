//! LcrMeter - Main entry point
//!
//! On the ESP32-S3 this brings up the UART console and the analog front end
//! and runs the command loop forever. On any other target it runs the same
//! console on stdin/stdout against a simulated component:
//!
//! ```text
//! lcrmeter r 1000        # 1 kOhm resistor
//! lcrmeter c 4.7         # 4.7 uF capacitor
//! lcrmeter l 1000 5      # 1 mH inductor, 5 Ohm ESR
//! lcrmeter open
//! lcrmeter --debug --quiet c 4.7
//! ```

#![cfg_attr(target_os = "espidf", no_std, no_main)]

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::AnyIOPin;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys::{self as esp_idf_sys, EspError};

    use lcr_meter::config::{PinMap, UartConfig};
    use lcr_meter::hal::esp::{EspBoard, EspSerial};
    use lcr_meter::hal::{Restart, SerialLine, SerialWriter};
    use lcr_meter::{log_drain, CaptureCell, Console, MeasurementEngine, Outcome};

    /// Capture handoff shared with the comparator ISR.
    static CAPTURE: CaptureCell = CaptureCell::new();

    /// Pause after the greeting before accepting input.
    const BANNER_HOLD_MS: u32 = 500;

    #[no_mangle]
    fn main() {
        // Initialize ESP-IDF
        esp_idf_sys::link_patches();

        if let Err(err) = run() {
            lcr_meter::rt_error!(
                lcr_meter::APP_LOG_STREAM,
                unsafe { esp_idf_sys::esp_timer_get_time() },
                "init failed: {}",
                err
            );
            unsafe { esp_idf_sys::esp_restart() }
        }
    }

    fn run() -> Result<(), EspError> {
        let peripherals = Peripherals::take()?;
        let uart_config = UartConfig::default();

        // SAFETY: the console pins are not claimed anywhere else.
        let (tx, rx) = unsafe {
            (AnyIOPin::new(uart_config.tx_pin), AnyIOPin::new(uart_config.rx_pin))
        };
        let mut serial = EspSerial::new(peripherals.uart0, tx, rx, &uart_config)?;

        let board = EspBoard::new(PinMap::default(), &CAPTURE)?;
        let mut engine = MeasurementEngine::new(board, &CAPTURE);
        let mut console = Console::new();

        console.print_banner(&mut SerialWriter(&mut serial));
        FreeRtos::delay_ms(BANNER_HOLD_MS);

        loop {
            let byte = serial.read_byte();
            let mut out = SerialWriter(&mut serial);
            let Some(result) = console.process_byte(byte, &mut engine, &mut out) else {
                continue;
            };
            log_drain::drain_logs(&mut out);
            if let Ok(Outcome::Restart) = result {
                engine.board_mut().restart();
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::io::{Read, Write as _};
    use std::process::ExitCode;

    use lcr_meter::hal::sim::{Component, SimBoard};
    use lcr_meter::hal::Timebase;
    use lcr_meter::logging::LogLevel;
    use lcr_meter::{log_drain, CaptureCell, Console, MeasurementEngine, Outcome, CONFIG};

    static CAPTURE: CaptureCell = CaptureCell::new();

    /// Virtual time between commands, so an armed capture can land.
    const OPERATOR_IDLE_MS: u32 = 100;

    const USAGE: &str =
        "usage: lcrmeter [--debug] [--quiet] (r <ohms> | c <uF> | l <uH> <esr_ohms> | open)";

    /// `core::fmt::Write` over stdout.
    struct Stdout(std::io::Stdout);

    impl core::fmt::Write for Stdout {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.0.write_all(s.as_bytes()).map_err(|_| core::fmt::Error)
        }
    }

    fn parse_component(args: &[String]) -> Option<Component> {
        let num = |i: usize| args.get(i).and_then(|s| s.parse::<f32>().ok());
        match args.first().map(String::as_str) {
            Some("r") => Some(Component::Resistor { ohms: num(1)? }),
            Some("c") => Some(Component::Capacitor { microfarads: num(1)? }),
            Some("l") => Some(Component::Inductor { microhenries: num(1)?, esr_ohms: num(2)? }),
            Some("open") | None => Some(Component::Open),
            Some(_) => None,
        }
    }

    /// Apply leading `--` flags to `CONFIG`, return the component arguments.
    fn apply_flags(args: &[String]) -> Option<&[String]> {
        let mut rest = args;
        while let Some((flag, tail)) = rest.split_first() {
            match flag.as_str() {
                "--debug" => CONFIG.set_log_level(LogLevel::Debug),
                "--quiet" => CONFIG.set_capture_log(false),
                s if s.starts_with("--") => return None,
                _ => break,
            }
            rest = tail;
        }
        Some(rest)
    }

    pub fn run(args: &[String]) -> ExitCode {
        let Some(component) = apply_flags(args).and_then(parse_component) else {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        };

        // the terminal echoes locally
        CONFIG.set_echo(false);

        let mut out = Stdout(std::io::stdout());
        let mut engine = MeasurementEngine::new(SimBoard::new(&CAPTURE, component), &CAPTURE);
        let mut console = Console::new();
        console.print_banner(&mut out);

        for byte in std::io::stdin().lock().bytes() {
            let Ok(byte) = byte else { break };
            let byte = if byte == b'\n' { b'\r' } else { byte };

            let Some(result) = console.process_byte(byte, &mut engine, &mut out) else {
                continue;
            };
            engine.board_mut().delay_ms(OPERATOR_IDLE_MS);
            log_drain::drain_logs(&mut out);

            if let Ok(Outcome::Restart) = result {
                CAPTURE.clear();
                engine = MeasurementEngine::new(SimBoard::new(&CAPTURE, component), &CAPTURE);
                console = Console::new();
                console.print_banner(&mut out);
            }
            let _ = out.0.flush();
        }
        ExitCode::SUCCESS
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> std::process::ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    host::run(&args)
}
