//! Performance measurement tools.

use std::{
    cell::{Cell, RefCell},
    fmt::{self, Arguments},
    time::{Duration, Instant},
};

const MAX_DURATIONS: usize = 250;

/// A timer that can measure and average the time an operation takes.
///
/// Collected timings are averaged and reset when the timer is displayed using `{}`
/// ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    durations: RefCell<Vec<Duration>>,
    forgotten: Cell<bool>,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            durations: Default::default(),
            forgotten: Cell::new(false),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&mut self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&mut self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&mut self, start: Instant) {
        if self.forgotten.get() {
            return;
        }

        let duration = start.elapsed();
        let durations = self.durations.get_mut();
        if durations.len() < MAX_DURATIONS {
            durations.push(duration);
        } else {
            // Nobody displayed the timer in a while, stop collecting.
            self.forgotten.set(true);
            durations.clear();
        }
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.forgotten.replace(false) {
            return write!(f, "{}: <forgotten>", self.name);
        }

        let mut durations = self.durations.borrow_mut();
        let len = durations.len();
        let avg_ms = if len == 0 {
            0.0
        } else {
            durations.iter().map(|d| d.as_secs_f32() * 1000.0).sum::<f32>() / len as f32
        };
        durations.clear();

        write!(f, "{}: {len}x{avg_ms:.01}ms", self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

/// Counts frames, logs frames per second with optional extra data, and reports the instantaneous
/// frame rate.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
    last_tick: Option<Instant>,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
            last_tick: None,
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    ///
    /// Returns the frame rate derived from the time since the previous tick, or 0 on the first
    /// tick.
    pub fn tick(&mut self) -> f32 {
        self.tick_impl(format_args!(""))
    }

    /// Advances the frame counter by 1 and logs FPS and `extra` data if one second has passed.
    ///
    /// Returns the same value as [`FpsCounter::tick`].
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, extra: I) -> f32 {
        struct DisplayExtra<D: fmt::Display, I: Iterator<Item = D>>(Cell<Option<I>>);

        impl<D: fmt::Display, I: Iterator<Item = D>> fmt::Display for DisplayExtra<D, I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let Some(mut iter) = self.0.take() else {
                    return Ok(());
                };
                match iter.next() {
                    Some(item) => {
                        write!(f, " ({}", item)?;
                        for item in iter {
                            write!(f, ", {}", item)?;
                        }
                        f.write_str(")")
                    }
                    None => Ok(()),
                }
            }
        }

        self.tick_impl(format_args!(
            "{}",
            DisplayExtra(Cell::new(Some(extra.into_iter())))
        ))
    }

    fn tick_impl(&mut self, args: Arguments<'_>) -> f32 {
        let now = Instant::now();
        let fps = match self.last_tick.replace(now) {
            Some(prev) => instantaneous_fps(now.duration_since(prev)),
            None => 0.0,
        };

        self.frames += 1;
        if self.start.elapsed() > Duration::from_secs(1) {
            log::debug!("{}: {} FPS{}", self.name, self.frames, args);

            self.frames = 0;
            self.start = now;
        }

        fps
    }
}

fn instantaneous_fps(frame_time: Duration) -> f32 {
    let secs = frame_time.as_secs_f32();
    if secs > 0.0 {
        1.0 / secs
    } else {
        0.0
    }
}
