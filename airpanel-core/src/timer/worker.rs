//! Timer waiter thread and the handle state shared by both variants

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace, warn};

use super::{TimerError, TimerState, JOIN_TIMEOUT};
use crate::sync::lock;

/// Work run when a timer expires
pub(crate) type Action = Box<dyn FnMut() + Send>;

/// Commands consumed by the waiter
#[derive(Debug, Clone, Copy)]
pub(crate) enum Command {
    /// Restart the countdown from `at`, optionally with a new interval
    Reset {
        at: Instant,
        interval: Option<Duration>,
    },
    /// Disarm without firing
    Stop,
    /// Replace the interval, keeping the current period start
    SetInterval(Duration),
    /// Exit the waiter
    Cancel,
}

/// Timer flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// Re-arms itself after every expiry, armed from start
    Repeat,
    /// Returns to idle after expiry, idle from start
    SingleShot,
}

/// Waiter-side mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Armed { start: Instant, deadline: Instant },
}

/// Outcome of a passed deadline
#[derive(Debug, PartialEq, Eq)]
enum Expiry {
    Fire,
    Preempted(Mode),
    Exit,
}

struct Running {
    handle: JoinHandle<()>,
    /// Disconnects when the waiter returns
    exited: Receiver<()>,
    thread: ThreadId,
}

/// State shared by [`RepeatTimer`](super::RepeatTimer) and
/// [`ResettableTimer`](super::ResettableTimer)
pub(crate) struct TimerCore {
    name: String,
    kind: Kind,
    interval: Mutex<Duration>,
    commands: Sender<Command>,
    /// Receiver and action, handed to the waiter on start
    pending: Mutex<Option<(Receiver<Command>, Action)>>,
    running: Mutex<Option<Running>>,
    state: Arc<Mutex<TimerState>>,
    cancelled: AtomicBool,
    fired: Arc<AtomicU64>,
}

impl TimerCore {
    pub(crate) fn new(name: &str, kind: Kind, interval: Duration, action: Action) -> Self {
        let (commands, receiver) = unbounded();
        Self {
            name: name.to_string(),
            kind,
            interval: Mutex::new(interval),
            commands,
            pending: Mutex::new(Some((receiver, action))),
            running: Mutex::new(None),
            state: Arc::new(Mutex::new(TimerState::Idle)),
            cancelled: AtomicBool::new(false),
            fired: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn interval(&self) -> Duration {
        *lock(&self.interval)
    }

    pub(crate) fn state(&self) -> TimerState {
        *lock(&self.state)
    }

    pub(crate) fn fired(&self) -> u64 {
        self.fired.load(Ordering::SeqCst)
    }

    pub(crate) fn start(&self) -> Result<(), TimerError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(TimerError::Cancelled);
        }
        let Some((receiver, action)) = lock(&self.pending).take() else {
            return Err(TimerError::AlreadyStarted);
        };

        let interval = self.interval();
        let (exit_tx, exited) = unbounded::<()>();
        let waiter = Waiter {
            name: self.name.clone(),
            kind: self.kind,
            interval,
            action,
            commands: receiver,
            state: Arc::clone(&self.state),
            fired: Arc::clone(&self.fired),
            _exit: exit_tx,
        };

        let handle = thread::Builder::new()
            .name(format!("timer-{}", self.name))
            .spawn(move || waiter.run())?;
        let thread = handle.thread().id();
        *lock(&self.running) = Some(Running {
            handle,
            exited,
            thread,
        });
        debug!("timer {} started ({:?}, {:?})", self.name, self.kind, interval);
        Ok(())
    }

    pub(crate) fn send(&self, command: Command) -> Result<(), TimerError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(TimerError::Cancelled);
        }
        if let Command::Reset {
            interval: Some(interval),
            ..
        }
        | Command::SetInterval(interval) = command
        {
            *lock(&self.interval) = interval;
        }
        self.commands
            .send(command)
            .map_err(|_| TimerError::Cancelled)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            warn!("timer {} already cancelled", self.name);
            return;
        }
        let _ = self.commands.send(Command::Cancel);

        let Some(running) = lock(&self.running).take() else {
            // Never started: nothing to join
            *lock(&self.state) = TimerState::Cancelled;
            debug!("timer {} cancelled before start", self.name);
            return;
        };

        if thread::current().id() == running.thread {
            // Cancelled from inside the action; the waiter exits once it returns
            debug!("timer {} cancelled from its own action", self.name);
            return;
        }

        match running.exited.recv_timeout(JOIN_TIMEOUT) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "timer {} did not exit within {:?}, detaching",
                    self.name, JOIN_TIMEOUT
                );
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if running.handle.join().is_err() {
                    warn!("timer {} action panicked", self.name);
                }
                debug!("timer {} joined", self.name);
            }
        }
    }
}

impl Drop for TimerCore {
    fn drop(&mut self) {
        if !self.is_cancelled() {
            self.cancel();
        }
    }
}

/// Waiter thread state
struct Waiter {
    name: String,
    kind: Kind,
    interval: Duration,
    action: Action,
    commands: Receiver<Command>,
    state: Arc<Mutex<TimerState>>,
    fired: Arc<AtomicU64>,
    /// Dropped on exit, which is what `cancel()` waits for
    _exit: Sender<()>,
}

impl Waiter {
    fn run(mut self) {
        let now = Instant::now();
        let mut mode = match self.kind {
            Kind::Repeat => Mode::Armed {
                start: now,
                deadline: now + self.interval,
            },
            Kind::SingleShot => Mode::Idle,
        };

        loop {
            self.publish(mode);

            let received = match mode {
                Mode::Idle => match self.commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
                Mode::Armed { deadline, .. } => match self.commands.recv_deadline(deadline) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
            };

            if let Some(command) = received {
                match self.apply(mode, command) {
                    Some(next) => mode = next,
                    None => break,
                }
                continue;
            }

            match self.expire(mode) {
                Expiry::Exit => break,
                Expiry::Preempted(next) => {
                    mode = next;
                    continue;
                }
                Expiry::Fire => {}
            }

            let Mode::Armed { deadline, .. } = mode else {
                continue;
            };
            trace!("timer {} expired", self.name);
            (self.action)();
            self.fired.fetch_add(1, Ordering::SeqCst);

            mode = match self.kind {
                Kind::SingleShot => Mode::Idle,
                Kind::Repeat => {
                    let now = Instant::now();
                    let mut next = deadline + self.interval;
                    if next <= now {
                        // The action overran whole periods; skip them
                        next = now + self.interval;
                    }
                    Mode::Armed {
                        start: next - self.interval,
                        deadline: next,
                    }
                }
            };
        }

        *lock(&self.state) = TimerState::Cancelled;
        debug!("timer {} waiter exited", self.name);
    }

    /// Decide what a passed deadline means
    ///
    /// Commands queued while the deadline passed win over the expiry: a
    /// reset arriving at the deadline re-arms instead of firing.
    fn expire(&mut self, mut mode: Mode) -> Expiry {
        let mut preempted = false;
        while let Ok(command) = self.commands.try_recv() {
            preempted = true;
            match self.apply(mode, command) {
                Some(next) => mode = next,
                None => return Expiry::Exit,
            }
        }
        if preempted {
            Expiry::Preempted(mode)
        } else {
            Expiry::Fire
        }
    }

    /// Apply a command; `None` means exit
    fn apply(&mut self, mode: Mode, command: Command) -> Option<Mode> {
        match command {
            Command::Cancel => None,
            Command::Stop => Some(Mode::Idle),
            Command::Reset { at, interval } => {
                if let Some(interval) = interval {
                    self.interval = interval;
                }
                Some(Mode::Armed {
                    start: at,
                    deadline: at + self.interval,
                })
            }
            Command::SetInterval(interval) => {
                self.interval = interval;
                Some(match mode {
                    Mode::Idle => Mode::Idle,
                    Mode::Armed { start, .. } => Mode::Armed {
                        start,
                        deadline: start + interval,
                    },
                })
            }
        }
    }

    fn publish(&self, mode: Mode) {
        *lock(&self.state) = match mode {
            Mode::Idle => TimerState::Idle,
            Mode::Armed { deadline, .. } => TimerState::Armed(deadline),
        };
    }
}
