//! A minimal event loop for deferreds.
use crate::{Deferred, Error, Promise, State};
use std::thread;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverConfig {
    /// Sleep between ticks while work remains.
    pub tick_delay: Duration,
    /// Fail with [`Error::TickLimit`] instead of ticking past this count.
    pub max_ticks: Option<u64>,
}

impl DriverConfig {
    pub fn with_tick_delay(mut self, tick_delay: Duration) -> Self {
        self.tick_delay = tick_delay;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

/// Holds active deferreds and runs their processes once per tick, dropping
/// each deferred as soon as it stops being active.
///
/// # Examples
///
/// ```
/// use promise_chain::{Deferred, Driver, Spawned};
///
/// let deferred = Deferred::new();
/// let handle = deferred.clone();
/// let mut steps = 0;
/// deferred.add_process(move || {
///     steps += 1;
///     if steps == 3 {
///         handle.resolve(steps)?;
///     }
///     Ok(Spawned::Nothing)
/// });
///
/// let mut driver = Driver::new();
/// driver.add(deferred.clone());
/// driver.run()?;
/// assert!(!deferred.is_active());
/// assert_eq!(driver.ticks(), 3);
/// # Ok::<(), promise_chain::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Driver {
    active: Vec<Deferred>,
    config: DriverConfig,
    ticks: u64,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DriverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Track `deferred` until it finishes. Inactive or already tracked
    /// deferreds are ignored.
    pub fn add(&mut self, deferred: Deferred) {
        if deferred.is_active() && !self.active.iter().any(|d| d.same(&deferred)) {
            self.active.push(deferred);
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one round of processes. Returns how many deferreds remain.
    pub fn tick(&mut self) -> Result<usize, Error> {
        self.ticks += 1;
        for deferred in self.active.clone() {
            if deferred.is_active() {
                deferred.process()?;
            }
        }
        self.active.retain(Deferred::is_active);
        debug!(tick = self.ticks, remaining = self.active.len(), "driver tick");
        Ok(self.active.len())
    }

    /// Tick until every deferred has finished.
    pub fn run(&mut self) -> Result<(), Error> {
        self.run_while(|driver| !driver.is_empty())
    }

    /// Tick until `promise` settles or nothing is left to drive.
    pub fn run_until(&mut self, promise: &Promise) -> Result<(), Error> {
        self.run_while(|driver| !driver.is_empty() && promise.state() == State::Pending)
    }

    fn run_while(&mut self, mut keep_going: impl FnMut(&Driver) -> bool) -> Result<(), Error> {
        while keep_going(self) {
            if let Some(max_ticks) = self.config.max_ticks {
                if self.ticks >= max_ticks {
                    return Err(Error::TickLimit(self.ticks));
                }
            }
            self.tick()?;
            if keep_going(self) && !self.config.tick_delay.is_zero() {
                thread::sleep(self.config.tick_delay);
            }
        }
        Ok(())
    }
}
