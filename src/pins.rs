//! GPIO / peripheral pin assignments for the GateKeeper board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Presence sensor (LM393 IR obstacle module)
// ---------------------------------------------------------------------------

/// Digital input. The module pulls LOW while an object is in range.
pub const PRESENCE_SENSOR_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Barrier servo (SG90 class, 50 Hz hobby PWM)
// ---------------------------------------------------------------------------

/// LEDC PWM output driving the servo signal line.
pub const SERVO_PWM_GPIO: i32 = 5;
/// Hobby-servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC duty resolution for the servo timer (bits).
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;

// ---------------------------------------------------------------------------
// Companion board link (serial authorization)
// ---------------------------------------------------------------------------

/// UART peripheral used for the `CAR_DETECTED` exchange.
pub const AUTH_UART_PORT: i32 = 1;
pub const AUTH_UART_TX_GPIO: i32 = 17;
pub const AUTH_UART_RX_GPIO: i32 = 16;
