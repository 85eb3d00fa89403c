//! Countdown timers.

use crate::routing::{InterruptSink, Vector};
use bitos::bitos;

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    /// Reload from the period whenever the counter expires.
    #[default]
    AutoRestart = 0b00,
    /// Stop once the counter expires.
    Single = 0b01,
    /// Wrap around to the maximum once the counter expires.
    FreeRunning = 0b10,
    /// Count external events instead of steps.
    EventCount = 0b11,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prescaler {
    #[default]
    Div1 = 0b00,
    Div2 = 0b01,
    Div4 = 0b10,
    Div16 = 0b11,
}

impl Prescaler {
    pub fn divisor(self) -> u8 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div16 => 16,
        }
    }
}

#[bitos(16)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Control {
    #[bits(0..2)]
    pub prescaler: Prescaler,
    #[bits(2..4)]
    pub mode: CountMode,
    #[bits(4)]
    pub enabled: bool,
    #[bits(5)]
    pub paused: bool,
}

#[derive(Debug)]
pub struct Timer {
    vector: Vector,
    control: Control,
    period: u32,
    counter: u32,
    prescale: u8,
}

impl Timer {
    /// Creates a disabled timer which raises `vector` on expiry.
    pub fn new(vector: Vector) -> Self {
        Self {
            vector,
            control: Control::default(),
            period: 0,
            counter: 0,
            prescale: 0,
        }
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn set_control(&mut self, control: Control) {
        self.control = control;
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Sets the reload value. The current count is left alone until the next reload.
    pub fn set_period(&mut self, period: u32) {
        self.period = period;
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Reloads the counter from the period.
    pub fn restart(&mut self) {
        self.counter = self.period;
        self.prescale = 0;
    }

    /// Loads `period`, reloads the counter and enables the timer.
    pub fn start(&mut self, period: u32) {
        self.set_period(period);
        self.restart();
        self.control.set_enabled(true);

        tracing::debug!(vector = %self.vector, period, mode = ?self.control.mode(), "timer started");
    }

    pub fn stop(&mut self) {
        self.control.set_enabled(false);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.control.set_paused(paused);
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.control.enabled() && !self.control.paused()
    }

    fn count(&mut self, sink: &mut impl InterruptSink) {
        // a stopped single shot or a zero period never fires
        if self.counter == 0 {
            return;
        }

        self.counter -= 1;
        if self.counter != 0 {
            return;
        }

        tracing::trace!(vector = %self.vector, "timer expired");
        sink.raise(self.vector);

        match self.control.mode() {
            CountMode::AutoRestart => self.counter = self.period,
            CountMode::FreeRunning => self.counter = u32::MAX,
            CountMode::Single | CountMode::EventCount => (),
        }
    }

    /// Advances the timer by one step.
    pub fn tick(&mut self, sink: &mut impl InterruptSink) {
        if !self.is_running() || self.control.mode() == CountMode::EventCount {
            return;
        }

        self.prescale += 1;
        if self.prescale < self.control.prescaler().divisor() {
            return;
        }

        self.prescale = 0;
        self.count(sink);
    }

    /// Counts one external event. Only has an effect in [`CountMode::EventCount`].
    pub fn count_event(&mut self, sink: &mut impl InterruptSink) {
        if self.is_running() && self.control.mode() == CountMode::EventCount {
            self.count(sink);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.vector);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Count(usize);

    impl InterruptSink for Count {
        fn raise(&mut self, vector: Vector) {
            assert_eq!(vector, Vector::new(0xA));
            self.0 += 1;
        }
    }

    fn run(timer: &mut Timer, steps: usize) -> usize {
        let mut sink = Count::default();
        for _ in 0..steps {
            timer.tick(&mut sink);
        }

        sink.0
    }

    #[test]
    fn disabled_by_default() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.set_period(1);
        timer.restart();

        assert_eq!(run(&mut timer, 10), 0);
    }

    #[test]
    fn fires_every_period() {
        for period in [1, 2, 3, 7, 10] {
            let mut timer = Timer::new(Vector::new(0xA));
            timer.start(period);

            assert_eq!(run(&mut timer, 100), 100 / period as usize, "period {period}");
        }
    }

    #[test]
    fn reloads_on_expiry() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.start(4);

        assert_eq!(run(&mut timer, 3), 0);
        assert_eq!(timer.counter(), 1);
        assert_eq!(run(&mut timer, 1), 1);
        assert_eq!(timer.counter(), 4);
    }

    #[test]
    fn single_shot_stops() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.set_control(Control::default().with_mode(CountMode::Single));
        timer.start(5);

        assert_eq!(run(&mut timer, 50), 1);
        assert_eq!(timer.counter(), 0);
    }

    #[test]
    fn free_running_wraps() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.set_control(Control::default().with_mode(CountMode::FreeRunning));
        timer.start(2);

        assert_eq!(run(&mut timer, 2), 1);
        assert_eq!(timer.counter(), u32::MAX);
    }

    #[test]
    fn prescaler_divides_steps() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.set_control(Control::default().with_prescaler(Prescaler::Div4));
        timer.start(2);

        assert_eq!(run(&mut timer, 7), 0);
        assert_eq!(run(&mut timer, 1), 1);
    }

    #[test]
    fn paused_and_zero_period() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.start(1);
        timer.set_paused(true);
        assert_eq!(run(&mut timer, 10), 0);

        timer.set_paused(false);
        timer.start(0);
        assert_eq!(run(&mut timer, 10), 0);
        assert_eq!(timer.counter(), 0);
    }

    #[test]
    fn event_count_ignores_steps() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.set_control(Control::default().with_mode(CountMode::EventCount));
        timer.start(2);

        assert_eq!(run(&mut timer, 10), 0);

        let mut sink = Count::default();
        timer.count_event(&mut sink);
        timer.count_event(&mut sink);
        assert_eq!(sink.0, 1);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut timer = Timer::new(Vector::new(0xA));
        timer.start(3);
        run(&mut timer, 1);
        timer.reset();

        assert_eq!(timer.counter(), 0);
        assert_eq!(timer.period(), 0);
        assert!(!timer.is_running());
    }
}
