use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use crate::servo::FRAME_US;

/// PWM channel whose max duty equals one frame, so duty reads back as microseconds.
#[derive(Clone, Default)]
pub struct FakePwm(Rc<Cell<u16>>);

impl FakePwm {
    pub fn pulse_us(&self) -> u16 {
        self.0.get()
    }
}

impl ErrorType for FakePwm {
    type Error = Infallible;
}

impl SetDutyCycle for FakePwm {
    fn max_duty_cycle(&self) -> u16 {
        FRAME_US
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.0.set(duty);
        Ok(())
    }
}
