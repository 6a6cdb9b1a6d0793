//! Conversions between raw 16-bit converter codes and physical units.
//!
//! Analog inputs and the set-point output both use the full unsigned 16-bit
//! range, scaled against the board's reference voltage.
/// Largest code an analog input can return or an analog output can accept.
pub const CODE_MAX: u16 = u16::MAX;
/// Convert a converter code to volts.
pub fn code_to_volts(code: u16, v_ref: f64) -> f64 {
    v_ref * f64::from(code) / f64::from(CODE_MAX)
}
/// Convert volts to the nearest converter code.
///
/// Values outside `[0, v_ref]` saturate to `0` or [`CODE_MAX`] so a bad
/// set-point can never wrap around on the output.
pub fn volts_to_code(volts: f64, v_ref: f64) -> u16 {
    let code = (f64::from(CODE_MAX) * volts / v_ref).round();
    // NaN casts to 0
    code.clamp(0.0, f64::from(CODE_MAX)) as u16
}
pub fn amps_to_microamps(amps: f64) -> f64 {
    amps * 1.0e6
}
