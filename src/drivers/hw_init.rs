//! One-shot hardware peripheral initialization and raw register helpers.
//!
//! Configures the presence GPIO, the servo LEDC timer/channel, and the
//! companion-board UART using raw ESP-IDF sys calls. Called from `main()`
//! before the control loop starts. Host builds get inert stand-ins.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "UART driver install failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if ret == ESP_OK as i32 { Ok(()) } else { Err(err(ret)) }
}

// ── Presence input ────────────────────────────────────────────

/// Configure the presence sensor line as a pulled-up input.
#[cfg(target_os = "espidf")]
pub fn init_presence_input() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::PRESENCE_SENSOR_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    // SAFETY: called once from main before the control loop.
    check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
    info!("hw_init: presence input on GPIO{}", pins::PRESENCE_SENSOR_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_presence_input() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): presence input skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured input.
    (unsafe { gpio_get_level(pin) }) != 0
}

// ── LEDC PWM (servo) ──────────────────────────────────────────

pub const LEDC_CH_SERVO: u32 = 0;

/// Configure LEDC timer 0 at the servo frame rate and bind channel 0
/// to the servo pin.
#[cfg(target_os = "espidf")]
pub fn init_servo_pwm() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_14_BIT,
        freq_hz: pins::SERVO_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: single-threaded init path.
    check(unsafe { ledc_timer_config(&timer) }, HwInitError::LedcInitFailed)?;

    let channel = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_SERVO,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: pins::SERVO_PWM_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: single-threaded init path.
    check(unsafe { ledc_channel_config(&channel) }, HwInitError::LedcInitFailed)?;

    info!(
        "hw_init: servo PWM on GPIO{} ({} Hz, {}-bit)",
        pins::SERVO_PWM_GPIO,
        pins::SERVO_PWM_FREQ_HZ,
        pins::SERVO_PWM_RESOLUTION_BITS
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_servo_pwm() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): servo PWM skipped");
    Ok(())
}

/// Write a raw duty value and latch it. Returns the ESP error code on failure.
#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) -> Result<(), i32> {
    // SAFETY: channel was configured in init_servo_pwm(); only the control
    // loop writes duty registers.
    unsafe {
        let ret = esp_idf_svc::sys::ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        if ret != ESP_OK as i32 {
            return Err(ret);
        }
        let ret = esp_idf_svc::sys::ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
        if ret != ESP_OK as i32 {
            return Err(ret);
        }
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
mod sim_ledc {
    use std::cell::Cell;

    thread_local! {
        pub static LAST_DUTY: Cell<Option<(u32, u32)>> = const { Cell::new(None) };
        pub static FAIL_WRITES: Cell<bool> = const { Cell::new(false) };
    }
}

/// Host stand-in: records the last `(channel, duty)` written on this thread.
#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(channel: u32, duty: u32) -> Result<(), i32> {
    if sim_ledc::FAIL_WRITES.with(|f| f.get()) {
        return Err(-1);
    }
    sim_ledc::LAST_DUTY.with(|d| d.set(Some((channel, duty))));
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_last_duty() -> Option<(u32, u32)> {
    sim_ledc::LAST_DUTY.with(|d| d.get())
}

/// Make every following host `ledc_set` on this thread fail.
#[cfg(not(target_os = "espidf"))]
pub fn sim_fail_ledc_writes(fail: bool) {
    sim_ledc::FAIL_WRITES.with(|f| f.set(fail));
}

// ── UART (companion board) ────────────────────────────────────

#[cfg(target_os = "espidf")]
const UART_RX_BUF: i32 = 256;

#[cfg(target_os = "espidf")]
pub fn init_uart(port: i32, baud_rate: u32) -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: baud_rate as i32,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };
    // SAFETY: single-threaded init path; the driver owns its buffers.
    unsafe {
        check(
            uart_driver_install(port, UART_RX_BUF, 0, 0, core::ptr::null_mut(), 0),
            HwInitError::UartInitFailed,
        )?;
        check(uart_param_config(port, &cfg), HwInitError::UartInitFailed)?;
        check(
            uart_set_pin(port, pins::AUTH_UART_TX_GPIO, pins::AUTH_UART_RX_GPIO, -1, -1),
            HwInitError::UartInitFailed,
        )?;
    }
    info!("hw_init: UART{} at {} baud", port, baud_rate);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_uart(port: i32, baud_rate: u32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): UART{} at {} baud (loopback-free stub)", port, baud_rate);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn uart_write(port: i32, data: &[u8]) -> Result<usize, i32> {
    // SAFETY: driver installed by init_uart(); data outlives the call.
    let n = unsafe { uart_write_bytes(port, data.as_ptr().cast(), data.len()) };
    if n < 0 { Err(n) } else { Ok(n as usize) }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_write(_port: i32, data: &[u8]) -> Result<usize, i32> {
    Ok(data.len())
}

/// Non-blocking read of whatever is already buffered.
#[cfg(target_os = "espidf")]
pub fn uart_read(port: i32, buf: &mut [u8]) -> Result<usize, i32> {
    // SAFETY: driver installed by init_uart(); zero ticks = no blocking.
    let n = unsafe { uart_read_bytes(port, buf.as_mut_ptr().cast(), buf.len() as u32, 0) };
    if n < 0 { Err(n) } else { Ok(n as usize) }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_read(_port: i32, _buf: &mut [u8]) -> Result<usize, i32> {
    Ok(0)
}

#[cfg(target_os = "espidf")]
pub fn uart_flush_tx(port: i32) -> Result<(), i32> {
    // SAFETY: driver installed by init_uart().
    let ret = unsafe { uart_wait_tx_done(port, 10) };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(ret) }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_flush_tx(_port: i32) -> Result<(), i32> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn uart_buffered_len(port: i32) -> usize {
    let mut len: usize = 0;
    // SAFETY: driver installed by init_uart(); `len` is a valid out pointer.
    let ret = unsafe { uart_get_buffered_data_len(port, &mut len) };
    if ret == ESP_OK as i32 { len } else { 0 }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_buffered_len(_port: i32) -> usize {
    0
}
