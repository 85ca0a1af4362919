use crate::lock::lock;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Fold<T, A> = Box<dyn Fn(T, A) -> A + Send + Sync>;
type Init<A> = Box<dyn Fn() -> A + Send + Sync>;
type Deliver<A> = Box<dyn Fn(A) + Send + Sync>;

/// Trailing-edge debouncer that folds a burst of inputs into one delivery
///
/// Every push folds the input into the pending accumulator and moves the
/// quiet-window deadline. When the window elapses without another push, the
/// accumulator is handed to the delivery callback and the cycle resets, so a
/// push after a delivery always starts a fresh accumulator. One timer task
/// serves a whole cycle, however many pushes it takes.
///
/// Must be created inside a tokio runtime; timers run on that runtime.
pub struct Aggregator<T, A> {
    shared: Arc<Shared<T, A>>,
}

struct Shared<T, A> {
    pending: Mutex<Pending<A>>,
    fold: Fold<T, A>,
    init: Init<A>,
    deliver: Deliver<A>,
    wait: Duration,
    runtime: Handle,
}

struct Pending<A> {
    accumulator: Option<A>,
    /// When the current cycle delivers, unless pushed back again
    deadline: Instant,
    /// Bumped on every delivery and flush; a timer only delivers its own cycle
    cycle: u64,
    timer: Option<JoinHandle<()>>,
}

impl<T, A> Aggregator<T, A>
where
    T: 'static,
    A: Send + 'static,
{
    /// Create an aggregator
    ///
    /// `fold` merges one input into the accumulator, `init` builds an empty
    /// accumulator, `deliver` receives the accumulator `wait` after the last
    /// push of a burst.
    pub fn new(
        fold: impl Fn(T, A) -> A + Send + Sync + 'static,
        init: impl Fn() -> A + Send + Sync + 'static,
        wait: Duration,
        deliver: impl Fn(A) + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(Pending {
                    accumulator: None,
                    deadline: Instant::now(),
                    cycle: 0,
                    timer: None,
                }),
                fold: Box::new(fold),
                init: Box::new(init),
                deliver: Box::new(deliver),
                wait,
                runtime: Handle::current(),
            }),
        }
    }

    /// Fold one input and restart the quiet window
    pub fn push(&self, input: T) {
        self.push_all(std::iter::once(input));
    }

    /// Fold several inputs and restart the quiet window once
    pub fn push_all(&self, inputs: impl IntoIterator<Item = T>) {
        let shared = &self.shared;
        let mut pending = lock(&shared.pending);

        let mut accumulator = pending.accumulator.take().unwrap_or_else(|| (shared.init)());
        for input in inputs {
            accumulator = (shared.fold)(input, accumulator);
        }
        pending.accumulator = Some(accumulator);
        pending.deadline = Instant::now() + shared.wait;

        if pending.timer.is_some() {
            return;
        }

        let weak: Weak<Shared<T, A>> = Arc::downgrade(shared);
        let cycle = pending.cycle;
        let mut deadline = pending.deadline;
        pending.timer = Some(shared.runtime.spawn(async move {
            loop {
                tokio::time::sleep_until(deadline).await;
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                match shared.expire(cycle) {
                    Some(later) => deadline = later,
                    None => return,
                }
            }
        }));
    }

    /// Deliver the pending accumulator now instead of waiting for the window
    pub fn flush(&self) {
        let accumulator = {
            let mut pending = lock(&self.shared.pending);
            pending.cycle += 1;
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
            pending.accumulator.take()
        };

        if let Some(accumulator) = accumulator {
            (self.shared.deliver)(accumulator);
        }
    }

    /// Whether inputs are waiting for delivery
    pub fn is_pending(&self) -> bool {
        lock(&self.shared.pending).accumulator.is_some()
    }
}

impl<T, A> Shared<T, A> {
    /// Deliver `cycle` if its deadline has passed, otherwise return the
    /// deadline to sleep until next
    fn expire(&self, cycle: u64) -> Option<Instant> {
        let accumulator = {
            let mut pending = lock(&self.pending);
            if pending.cycle != cycle {
                return None;
            }
            if pending.deadline > Instant::now() {
                return Some(pending.deadline);
            }
            pending.cycle += 1;
            pending.timer = None;
            pending.accumulator.take()
        };

        if let Some(accumulator) = accumulator {
            (self.deliver)(accumulator);
        }
        None
    }
}

impl<T, A> Drop for Shared<T, A> {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.pending).timer.take() {
            timer.abort();
        }
    }
}
