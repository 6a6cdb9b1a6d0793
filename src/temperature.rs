// src/temperature.rs
use crate::drivers::{PstatError, TemperatureProbe};
use log::{info, warn};
use std::time::{Duration, Instant};
/// Safety factor applied to the probe's advertised conversion time.
pub const READY_MARGIN: f64 = 1.2;
/// Optional temperature sensor.
///
/// With no probe every operation is a no-op and `value` stays `None`.
pub struct TemperatureSensor {
    probe: Option<Box<dyn TemperatureProbe>>,
    conversion: Duration,
    t_ready: Option<Instant>,
    value: Option<f64>,
}
impl TemperatureSensor {
    pub fn absent() -> Self {
        Self {
            probe: None,
            conversion: Duration::ZERO,
            t_ready: None,
            value: None,
        }
    }
    /// Applies the resolution and starts the first conversion. A probe that
    /// refuses either is treated as absent.
    pub fn new(probe: Option<Box<dyn TemperatureProbe>>, resolution: u8, now: Instant) -> Self {
        let Some(mut probe) = probe else {
            return Self::absent();
        };
        match probe
            .set_resolution(resolution)
            .and_then(|()| probe.start_conversion())
        {
            Ok(conversion) => {
                info!("temperature sensor found, {resolution} bit, conversion {conversion:?}");
                Self {
                    probe: Some(probe),
                    conversion,
                    t_ready: Some(next_ready(now, conversion)),
                    value: None,
                }
            }
            Err(err) => {
                warn!("temperature sensor disabled: {err}");
                Self::absent()
            }
        }
    }
    pub fn is_available(&self) -> bool {
        self.probe.is_some()
    }
    pub fn value(&self) -> Option<f64> {
        self.value
    }
    /// Reads the probe once its conversion is complete and starts the next one.
    pub fn update(&mut self, now: Instant) -> Result<(), PstatError> {
        let (Some(probe), Some(t_ready)) = (self.probe.as_mut(), self.t_ready) else {
            return Ok(());
        };
        if now <= t_ready {
            return Ok(());
        }
        let reading = probe.read_celsius();
        let started = probe.start_conversion();
        if let Ok(conversion) = &started {
            self.conversion = *conversion;
        }
        // retry after one conversion period even when the probe misbehaves
        self.t_ready = Some(next_ready(now, self.conversion));
        self.value = Some(reading?);
        started.map(|_| ())
    }
}
fn next_ready(now: Instant, conversion: Duration) -> Instant {
    now + conversion.mul_f64(READY_MARGIN)
}
