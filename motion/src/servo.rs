use embedded_hal::pwm::SetDutyCycle;
use log::*;

/// One 50 Hz servo frame, in microseconds.
pub const FRAME_US: u16 = 20_000;

/// Hobby-servo pulse writer on top of a PWM channel running at 50 Hz.
pub struct Servo<P> {
    pwm: P,
    pulse_us: u16,
}

impl<P> Servo<P>
where
    P: SetDutyCycle,
{
    pub fn new(pwm: P) -> Servo<P> {
        Servo { pwm, pulse_us: 0 }
    }

    /// Emit a pulse of `us` microseconds every frame.
    pub fn write_microseconds(&mut self, us: u16) {
        let us = us.min(FRAME_US);
        if let Err(e) = self.pwm.set_duty_cycle_fraction(us, FRAME_US) {
            warn!("Servo pulse write failed ({} us): {:?}", us, e);
        }
        self.pulse_us = us;
    }

    /// Last commanded pulse width.
    pub fn pulse_us(&self) -> u16 {
        self.pulse_us
    }
}
