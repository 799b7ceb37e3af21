//! One-shot background timer
//!
//! Test sequences use this to overlap a settling or soak period with other work: start the timer,
//! do something else, then wait for whatever remains of the delay.
//!
//! ```text
//! Idle --start(d)--> Armed --expiry--> Fired --wait()--> Idle
//!                      |
//!                      +--cancel()--> Idle
//! ```
//!
//! The expiry runs as a task on the tokio runtime. State and the pending expiry sit behind one lock,
//! and completion is signalled through a [`Notify`]. Every arming gets a new generation number so an
//! expiry which loses a race with [`Timer::cancel`] or a re-arm cannot mark the timer fired.

use std::{
    sync::{ Arc, Mutex, MutexGuard, PoisonError },
    time::Duration,
};
use tokio::{ sync::Notify, task::JoinHandle };
use tracing::{ debug, warn };
use crate::error::UsageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState
{
    Idle,
    Armed,
    Fired,
}

struct Slot
{
    state: TimerState,
    expiry: Option<JoinHandle<()>>,
    generation: u64,
    /// Completion was signalled since the last arming
    fired: bool,
}

struct Shared
{
    slot: Mutex<Slot>,
    event: Notify,
}

impl Shared
{
    fn lock(&self) -> MutexGuard<'_, Slot>
    {
        // Slot updates are single assignments, so a panic elsewhere cannot leave it torn
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, generation: u64)
    {
        {
            let mut slot = self.lock();

            if slot.generation != generation || slot.state != TimerState::Armed {
                return;
            }

            slot.state = TimerState::Fired;
            slot.fired = true;
            slot.expiry = None;
        }

        debug!(generation, "timer fired");
        self.event.notify_waiters();
    }
}

/// A cancellable one-shot timer
///
/// Clones share the same timer, so one task may wait while another cancels.
#[derive(Clone)]
pub struct Timer
{
    shared: Arc<Shared>,
}

impl Default for Timer
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl Timer
{
    pub fn new() -> Self
    {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: TimerState::Idle,
                    expiry: None,
                    generation: 0,
                    fired: false,
                }),
                event: Notify::new(),
            }),
        }
    }

    /// Arms the timer to fire after `delay`
    ///
    /// Starting an armed timer discards the pending expiry and arms a new one.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn start(&self, delay: Duration)
    {
        let mut slot = self.shared.lock();

        if slot.state == TimerState::Armed {
            warn!(?delay, "timer restarted while armed; previous expiry discarded");
        }

        self.arm_locked(&mut slot, delay);
    }

    /// Arms the timer, refusing if it is already armed
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, delay: Duration) -> Result<(), UsageError>
    {
        let mut slot = self.shared.lock();

        if slot.state == TimerState::Armed {
            return Err(UsageError::AlreadyArmed);
        }

        self.arm_locked(&mut slot, delay);

        Ok(())
    }

    fn arm_locked(&self, slot: &mut Slot, delay: Duration)
    {
        if let Some(expiry) = slot.expiry.take() {
            expiry.abort();
        }

        slot.generation = slot.generation.wrapping_add(1);
        slot.state = TimerState::Armed;
        slot.fired = false;

        let shared = Arc::clone(&self.shared);
        let generation = slot.generation;

        slot.expiry = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.expire(generation);
        }));

        debug!(?delay, generation, "timer armed");
    }

    /// Waits for the timer to fire, then disarms it
    ///
    /// Returns at once when the timer is idle. Returns without the timer having fired when it is
    /// cancelled during the wait.
    pub async fn wait(&self)
    {
        loop {
            let notified = self.shared.event.notified();
            tokio::pin!(notified);
            // register before looking at the state so an expiry in between is not missed
            notified.as_mut().enable();

            {
                let mut slot = self.shared.lock();

                match slot.state {
                    TimerState::Idle => return,
                    TimerState::Fired => {
                        slot.state = TimerState::Idle;
                        return;
                    },
                    TimerState::Armed => (),
                }
            }

            notified.await;
        }
    }

    /// Like [`Timer::wait`], but waiting on a timer that is not armed or fired is an error
    pub async fn wait_armed(&self) -> Result<(), UsageError>
    {
        if self.state() == TimerState::Idle {
            return Err(UsageError::NotArmed);
        }

        self.wait().await;

        Ok(())
    }

    /// Disarms the timer without signalling completion
    ///
    /// Does nothing unless the timer is armed. Safe to call from any task or thread.
    pub fn cancel(&self)
    {
        {
            let mut slot = self.shared.lock();

            if slot.state != TimerState::Armed {
                return;
            }

            if let Some(expiry) = slot.expiry.take() {
                expiry.abort();
            }

            slot.generation = slot.generation.wrapping_add(1);
            slot.state = TimerState::Idle;
            slot.fired = false;
        }

        debug!("timer cancelled");
        // wake waiters so they observe the idle state
        self.shared.event.notify_waiters();
    }

    /// Whether the timer is armed and has not fired yet
    pub fn running(&self) -> bool
    {
        self.state() == TimerState::Armed
    }

    pub fn state(&self) -> TimerState
    {
        self.shared.lock().state
    }

    /// Whether the timer fired since it was last armed
    pub fn fired(&self) -> bool
    {
        self.shared.lock().fired
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay()
    {
        let timer = Timer::new();
        let started = Instant::now();

        timer.start(Duration::from_secs(2));
        assert!(timer.running());

        timer.wait().await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed <= Duration::from_millis(2_050));
        assert!(timer.fired());
        assert!(!timer.running());
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_on_idle_returns_immediately()
    {
        let timer = Timer::new();
        let started = Instant::now();

        timer.wait().await;

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(!timer.fired());
    }

    #[tokio::test(start_paused = true)]
    async fn fired_without_waiter()
    {
        let timer = Timer::new();

        timer.start(Duration::from_millis(500));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(timer.state(), TimerState::Fired);
        assert!(!timer.running());

        let started = Instant::now();
        timer.wait().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_expiry()
    {
        let timer = Timer::new();

        timer.start(Duration::from_secs(10));
        timer.cancel();
        timer.cancel();

        assert!(tokio::time::timeout(Duration::from_millis(1), timer.wait()).await.is_ok());
        assert!(!timer.fired());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!timer.fired());
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wakes_waiter()
    {
        let timer = Timer::new();
        timer.start(Duration::from_secs(10));

        let waiter = {
            let timer = timer.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                timer.wait().await;
                started.elapsed()
            })
        };

        tokio::task::yield_now().await;
        timer.cancel();

        let waited = waiter.await.unwrap();
        assert!(waited < Duration::from_secs(10));
        assert!(!timer.fired());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_expiry()
    {
        let timer = Timer::new();
        let started = Instant::now();

        timer.start(Duration::from_secs(10));
        timer.start(Duration::from_secs(1));
        timer.wait().await;

        assert!(started.elapsed() < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn strict_arming()
    {
        let timer = Timer::new();

        assert_eq!(timer.wait_armed().await, Err(UsageError::NotArmed));

        timer.arm(Duration::from_secs(1)).unwrap();
        assert_eq!(timer.arm(Duration::from_secs(1)), Err(UsageError::AlreadyArmed));
        assert_eq!(timer.wait_armed().await, Ok(()));
    }
}
