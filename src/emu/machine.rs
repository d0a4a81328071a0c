use std::{
    path::Path,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use super::{Chip8, Chip8Error, Display, StepResult};

/// Loop rates for the execution engine and the timer ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub cpu_hz: u32,
    pub timer_hz: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cpu_hz: 500,
            timer_hz: 60,
        }
    }
}

/// Single owner of the VM state shared by the CPU, timer and render/input loops.
///
/// Every operation takes the state lock for its whole duration, so a step,
/// a timer tick, a keypad write, a framebuffer copy and a reset never
/// interleave.
pub struct Machine {
    chip8: Mutex<Chip8>,
    stopped: AtomicBool,
    halted: AtomicBool,
    fault: Mutex<Option<Chip8Error>>,
}

impl Machine {
    pub fn new(chip8: Chip8) -> Self {
        Self {
            chip8: Mutex::new(chip8),
            stopped: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            fault: Mutex::new(None),
        }
    }

    /// Runs `f` with exclusive access to the VM.
    pub fn with_chip8<R>(&self, f: impl FnOnce(&mut Chip8) -> R) -> R {
        f(&mut *self.lock())
    }

    pub fn load(&self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.lock().load(rom)
    }

    /// Resets the VM and loads the ROM at `path`. On failure the VM keeps
    /// its previous program.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<(), Chip8Error> {
        let mut fresh = Chip8::new();
        fresh.load_file(path)?;
        *self.lock() = fresh;
        Ok(())
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn step(&self) -> Result<StepResult, Chip8Error> {
        self.lock().step()
    }

    pub fn tick_timers(&self) {
        self.lock().tick_timers();
    }

    /// Overwrites the input latch in one go.
    pub fn set_keys(&self, pressed: [bool; 16]) {
        self.lock().set_keys(pressed);
    }

    pub fn framebuffer(&self) -> Display<bool> {
        self.lock().framebuffer()
    }

    pub fn take_sound_request(&self) -> bool {
        self.lock().take_sound_request()
    }

    pub fn is_ready(&self) -> bool {
        self.lock().is_ready()
    }

    /// Asks every loop to exit.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// False once the machine was stopped or the CPU faulted.
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire) && !self.is_halted()
    }

    /// Takes the fatal error that halted the CPU, if any.
    pub fn take_fault(&self) -> Option<Chip8Error> {
        self.fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Execution engine loop. Returns when the machine stops or halts.
    pub fn run_cpu(&self, hz: u32) {
        log::info!("CPU loop started at {hz}Hz");
        let mut pacer = Pacer::new(hz);

        while self.is_running() {
            match self.step() {
                Err(e) if e.is_fatal() => {
                    self.halt(e);
                    break;
                }
                Err(e) => log::warn!("Step failed: {e}"),
                Ok(_) => (),
            }
            pacer.wait();
        }

        log::info!("CPU loop exited");
    }

    /// Timer ticker loop. Returns when the machine stops or halts.
    pub fn run_timers(&self, hz: u32) {
        log::info!("Timer loop started at {hz}Hz");
        let mut pacer = Pacer::new(hz);

        while self.is_running() {
            self.tick_timers();
            pacer.wait();
        }

        log::info!("Timer loop exited");
    }

    /// Runs the CPU and timer loops on scoped threads alongside `front_end`,
    /// which plays the render/input loop on the calling thread. The machine
    /// is stopped once `front_end` returns, and both loops are joined.
    pub fn run<R>(&self, config: RunConfig, front_end: impl FnOnce(&Self) -> R) -> R {
        thread::scope(|s| {
            s.spawn(|| self.run_cpu(config.cpu_hz));
            s.spawn(|| self.run_timers(config.timer_hz));

            // Stops the loops even if `front_end` panics, so the scope can join.
            let _stop = StopOnDrop(self);
            front_end(self)
        })
    }

    fn halt(&self, error: Chip8Error) {
        log::error!("CPU halted: {error}");
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
        self.halted.store(true, Ordering::Release);
    }

    fn lock(&self) -> MutexGuard<'_, Chip8> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere does not invalidate it.
        self.chip8.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(Chip8::new())
    }
}

struct StopOnDrop<'a>(&'a Machine);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Sleeps until fixed-period deadlines. A loop that falls behind skips the
/// missed ticks instead of bursting to catch up.
struct Pacer {
    period: Duration,
    next: Instant,
}

impl Pacer {
    fn new(hz: u32) -> Self {
        let period = Duration::from_secs(1) / hz.max(1);
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            self.next = now + self.period;
        }
    }
}
