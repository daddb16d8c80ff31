//! ESP32-S3 board: GPIO control lines, ADC1 oneshot, comparator edge
//! interrupt as capture timer, UART0 console.
//!
//! The capture counter is the ESP high-resolution timer: `rearm` records the
//! start time, the comparator ISR computes the elapsed interval, scales it to
//! ticks and hands it to [`on_capture_edge`]. Only the first edge after
//! `enable` is latched.

use core::ffi::c_void;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use esp_idf_svc::hal::delay::{Ets, FreeRtos, BLOCK};
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::{self as esp_idf_sys, esp, EspError};

use crate::capture::{on_capture_edge, CaptureCell};
use crate::config::{PinMap, UartConfig, CONFIG};
use crate::frontend::ControlLine;

use super::{AnalogInput, CaptureTimer, ControlPins, Restart, SerialLine, Timebase};

/// Low 32 bits of `esp_timer_get_time()` at the last rearm.
static ARMED_AT_US: AtomicU32 = AtomicU32::new(0);
/// Counter enabled and no edge latched yet.
static COUNTING: AtomicBool = AtomicBool::new(false);

#[inline]
fn timer_us() -> i64 {
    unsafe { esp_idf_sys::esp_timer_get_time() }
}

/// Comparator edge ISR. `arg` is the `&'static CaptureCell`.
unsafe extern "C" fn comparator_isr(arg: *mut c_void) {
    if !COUNTING.swap(false, Ordering::AcqRel) {
        return;
    }
    let now = timer_us();
    let elapsed_us = (now as u32).wrapping_sub(ARMED_AT_US.load(Ordering::Acquire));
    let ticks = elapsed_us.saturating_mul(CONFIG.ticks_per_us());

    // SAFETY: registered with a pointer to a 'static CaptureCell.
    let cell = &*(arg as *const CaptureCell);
    on_capture_edge(cell, ticks, now);
}

/// Analog front end and capture hardware.
pub struct EspBoard {
    pins: PinMap,
    adc: esp_idf_sys::adc_oneshot_unit_handle_t,
}

impl EspBoard {
    /// Configure outputs (all low), ADC1 and the comparator interrupt.
    pub fn new(pins: PinMap, capture: &'static CaptureCell) -> Result<Self, EspError> {
        let outputs = [pins.integrate, pins.lowside_r, pins.highside_r, pins.meas_c, pins.meas_lr]
            .iter()
            .fold(0u64, |mask, &pin| mask | (1u64 << pin));

        unsafe {
            let out_conf = esp_idf_sys::gpio_config_t {
                pin_bit_mask: outputs,
                mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_OUTPUT,
                pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_DISABLE,
                ..Default::default()
            };
            esp!(esp_idf_sys::gpio_config(&out_conf))?;

            let in_conf = esp_idf_sys::gpio_config_t {
                pin_bit_mask: 1u64 << pins.comparator,
                mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_POSEDGE,
                ..Default::default()
            };
            esp!(esp_idf_sys::gpio_config(&in_conf))?;
            esp!(esp_idf_sys::gpio_install_isr_service(0))?;
            esp!(esp_idf_sys::gpio_isr_handler_add(
                pins.comparator,
                Some(comparator_isr),
                capture as *const CaptureCell as *mut c_void,
            ))?;
        }

        let mut adc: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        unsafe {
            let unit_conf = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ..Default::default()
            };
            esp!(esp_idf_sys::adc_oneshot_new_unit(&unit_conf, &mut adc))?;

            let chan_conf = esp_idf_sys::adc_oneshot_chan_cfg_t {
                atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_12,
                bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            esp!(esp_idf_sys::adc_oneshot_config_channel(adc, pins.adc_channel, &chan_conf))?;
        }

        Ok(Self { pins, adc })
    }

    fn gpio(&self, line: ControlLine) -> i32 {
        match line {
            ControlLine::Integrate => self.pins.integrate,
            ControlLine::LowsideR => self.pins.lowside_r,
            ControlLine::HighsideR => self.pins.highside_r,
            ControlLine::MeasC => self.pins.meas_c,
            ControlLine::MeasLr => self.pins.meas_lr,
        }
    }
}

impl ControlPins for EspBoard {
    fn write_line(&mut self, line: ControlLine, asserted: bool) {
        unsafe {
            esp_idf_sys::gpio_set_level(self.gpio(line), u32::from(asserted));
        }
    }
}

impl AnalogInput for EspBoard {
    fn read_raw(&mut self) -> u16 {
        let mut raw: i32 = 0;
        let err = unsafe { esp_idf_sys::adc_oneshot_read(self.adc, self.pins.adc_channel, &mut raw) };
        if err != esp_idf_sys::ESP_OK {
            crate::rt_error!(crate::log_globals::APP_LOG_STREAM, timer_us(), "adc read failed: {}", err);
            return 0;
        }
        raw.clamp(0, 4095) as u16
    }
}

impl Timebase for EspBoard {
    fn delay_us(&mut self, us: u32) {
        Ets::delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn now_us(&self) -> i64 {
        timer_us()
    }
}

impl CaptureTimer for EspBoard {
    fn rearm(&mut self) {
        COUNTING.store(false, Ordering::Release);
        ARMED_AT_US.store(timer_us() as u32, Ordering::Release);
    }

    fn enable(&mut self) {
        COUNTING.store(true, Ordering::Release);
    }
}

impl Restart for EspBoard {
    fn restart(&mut self) -> ! {
        unsafe { esp_idf_sys::esp_restart() }
    }
}

/// Console UART.
pub struct EspSerial<'d> {
    uart: UartDriver<'d>,
}

impl<'d> EspSerial<'d> {
    pub fn new(
        uart: impl Peripheral<P = uart::UART0> + 'd,
        tx: AnyIOPin,
        rx: AnyIOPin,
        config: &UartConfig,
    ) -> Result<Self, EspError> {
        let uart_config = uart::config::Config::default().baudrate(Hertz(config.baud_rate));
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None, // CTS
            Option::<AnyIOPin>::None, // RTS
            &uart_config,
        )?;
        Ok(Self { uart })
    }
}

impl SerialLine for EspSerial<'_> {
    fn read_byte(&mut self) -> u8 {
        let mut byte = [0u8; 1];
        loop {
            if let Ok(1) = self.uart.read(&mut byte, BLOCK) {
                return byte[0];
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let _ = self.uart.write(bytes);
    }
}
