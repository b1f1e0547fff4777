//! Commands and the bounded queue that orders them.

use crate::chain;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pattern::{Captures, Pattern};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Called with the captures of a successful match. Also the signature of hooks.
pub type OnSuccess = Rc<dyn Fn(&mut Queue, &Captures)>;

/// Called with the command whose timeout elapsed.
pub type OnFailure = Rc<dyn Fn(&mut Queue, &Command)>;

/// Where a new command goes in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timing {
    /// Ahead of every command that has not been sent yet.
    Next,
    /// At the back.
    #[default]
    Any,
}

/// Progress of the command at the front of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing has been picked up yet.
    Idle,
    /// The front command is waiting out its send delay.
    PendingSend { since: Instant },
    /// The front command was written and is waiting for its expectation.
    AwaitingMatch { sent_at: Instant },
}

impl State {
    /// Whether the front command has already been written to the transport.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, State::AwaitingMatch { .. })
    }
}

/// A unit of work: bytes to send and the response that completes it.
///
/// Commands are cheap to clone; callbacks are reference counted, so a clone
/// shares them with the original.
#[derive(Clone)]
pub struct Command {
    text: Vec<u8>,
    expectation: Pattern,
    on_success: Option<OnSuccess>,
    on_failure: Option<OnFailure>,
    timeout: Duration,
    delay: Duration,
    prompt: bool,
}

impl Command {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2500);

    /// Create a command sending `text` and waiting for a line matching `expectation`.
    ///
    /// An empty expectation completes the command as soon as it has been sent.
    pub fn new(text: impl Into<Vec<u8>>, expectation: &str) -> Result<Self> {
        Ok(Self::with_pattern(text, Pattern::new(expectation)?))
    }

    /// Create a command from an already compiled pattern.
    pub fn with_pattern(text: impl Into<Vec<u8>>, expectation: Pattern) -> Self {
        Self {
            text: text.into(),
            expectation,
            on_success: None,
            on_failure: None,
            timeout: Self::DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
            prompt: false,
        }
    }

    /// Run `f` with the captures when the expectation matches.
    #[must_use]
    pub fn on_success(mut self, f: impl Fn(&mut Queue, &Captures) + 'static) -> Self {
        self.on_success = Some(Rc::new(f));
        self
    }

    /// Run `f` when the timeout elapses without a match.
    #[must_use]
    pub fn on_failure(mut self, f: impl Fn(&mut Queue, &Command) + 'static) -> Self {
        self.on_failure = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn with_success(mut self, f: Option<OnSuccess>) -> Self {
        self.on_success = f;
        self
    }

    #[must_use]
    pub fn with_failure(mut self, f: Option<OnFailure>) -> Self {
        self.on_failure = f;
        self
    }

    /// How long after sending a match may arrive.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long to hold the command once it reaches the front before sending it.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Also match the unterminated tail of the input, for prompts such as
    /// `"> "` that never end their line.
    ///
    /// Off by default: a response split across reads would otherwise match on
    /// a prefix.
    #[must_use]
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn expectation(&self) -> &Pattern {
        &self.expectation
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_prompt(&self) -> bool {
        self.prompt
    }

    /// Shared handles to the callbacks, leaving the command intact.
    pub(crate) fn callbacks(&self) -> (Option<OnSuccess>, Option<OnFailure>) {
        (self.on_success.clone(), self.on_failure.clone())
    }

    pub(crate) fn take_callbacks(&mut self) -> (Option<OnSuccess>, Option<OnFailure>) {
        (self.on_success.take(), self.on_failure.take())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("text", &String::from_utf8_lossy(&self.text))
            .field("expectation", &self.expectation)
            .field("timeout", &self.timeout)
            .field("delay", &self.delay)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// Bounded queue of commands. The front entry is the active command.
///
/// Callbacks receive the queue mutably, so they can enqueue follow-up commands,
/// start chains or [`abort`](Self::abort) without holding on to the engine.
pub struct Queue {
    slots: VecDeque<Command>,
    capacity: usize,
    max_command_len: usize,
    max_pattern_len: usize,
    state: State,
}

impl Queue {
    pub fn new(config: &Config) -> Self {
        Self {
            slots: VecDeque::with_capacity(config.queue_capacity),
            capacity: config.queue_capacity,
            max_command_len: config.max_command_len,
            max_pattern_len: config.max_pattern_len,
            state: State::Idle,
        }
    }

    /// Add `command` according to `timing`.
    ///
    /// [`Timing::Next`] places the command at the front unless the front
    /// command is already in flight, in which case it goes right behind it.
    /// On error the queue is unchanged.
    pub fn push(&mut self, command: Command, timing: Timing) -> Result<()> {
        self.validate(&command)?;
        if self.is_full() {
            return Err(Error::QueueFull {
                capacity: self.capacity,
            });
        }
        match timing {
            Timing::Any => self.slots.push_back(command),
            Timing::Next if self.state.is_in_flight() => {
                let behind_active = self.slots.len().min(1);
                self.slots.insert(behind_active, command);
            }
            Timing::Next => {
                // A command that is only waiting out its delay gives up the front.
                self.state = State::Idle;
                self.slots.push_front(command);
            }
        }
        Ok(())
    }

    /// Enqueue `steps` as a chain: each success enqueues the next step, the
    /// first failure ends the chain.
    ///
    /// Only the first step occupies a slot now; the rest are enqueued with
    /// [`Timing::Next`] as their predecessors succeed.
    pub fn push_chain(
        &mut self,
        steps: &[Command],
        timing: Timing,
        on_success: Option<OnSuccess>,
        on_failure: Option<OnFailure>,
    ) -> Result<()> {
        for step in steps {
            self.validate(step)?;
        }
        let first = chain::link(steps, on_success, on_failure).ok_or(Error::EmptyChain)?;
        self.push(first, timing)
    }

    /// Drop every command, including the active one, without running callbacks.
    ///
    /// Returns how many commands were dropped.
    pub fn abort(&mut self) -> usize {
        let dropped = self.slots.len();
        self.slots.clear();
        self.state = State::Idle;
        dropped
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn front(&self) -> Option<&Command> {
        self.slots.front()
    }

    /// Iterate from the front (active) command to the back.
    pub fn iter(&self) -> impl Iterator<Item = &Command> + '_ {
        self.slots.iter()
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Remove the resolved front command and return to [`State::Idle`].
    pub(crate) fn dequeue_front(&mut self) -> Option<Command> {
        self.state = State::Idle;
        self.slots.pop_front()
    }

    fn validate(&self, command: &Command) -> Result<()> {
        if command.text.len() > self.max_command_len {
            return Err(Error::CommandTooLong {
                len: command.text.len(),
                max: self.max_command_len,
            });
        }
        let pattern_len = command.expectation.as_str().len();
        if pattern_len > self.max_pattern_len {
            return Err(Error::PatternTooLong {
                len: pattern_len,
                max: self.max_pattern_len,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("slots", &self.slots)
            .field("capacity", &self.capacity)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(capacity: usize) -> Queue {
        Queue::new(&Config::new().queue_capacity(capacity))
    }

    fn cmd(text: &str) -> Command {
        Command::new(text, "OK").unwrap()
    }

    fn texts(queue: &Queue) -> Vec<String> {
        queue
            .iter()
            .map(|c| String::from_utf8_lossy(c.text()).into_owned())
            .collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut q = queue(5);
        for text in ["a", "b", "c"] {
            q.push(cmd(text), Timing::Any).unwrap();
        }
        assert_eq!(texts(&q), ["a", "b", "c"]);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_next_jumps_pending_commands() {
        let mut q = queue(5);
        q.push(cmd("a"), Timing::Any).unwrap();
        q.push(cmd("b"), Timing::Any).unwrap();
        q.push(cmd("urgent"), Timing::Next).unwrap();
        assert_eq!(texts(&q), ["urgent", "a", "b"]);
    }

    #[test]
    fn test_next_never_preempts_in_flight_command() {
        let mut q = queue(5);
        q.push(cmd("active"), Timing::Any).unwrap();
        q.push(cmd("b"), Timing::Any).unwrap();
        q.set_state(State::AwaitingMatch {
            sent_at: Instant::now(),
        });
        q.push(cmd("urgent"), Timing::Next).unwrap();
        assert_eq!(texts(&q), ["active", "urgent", "b"]);
        assert!(q.state().is_in_flight());
    }

    #[test]
    fn test_next_preempts_delayed_command() {
        let mut q = queue(5);
        q.push(cmd("slow"), Timing::Any).unwrap();
        q.set_state(State::PendingSend {
            since: Instant::now(),
        });
        q.push(cmd("urgent"), Timing::Next).unwrap();
        assert_eq!(texts(&q), ["urgent", "slow"]);
        assert_eq!(q.state(), State::Idle);
    }

    #[test]
    fn test_full_queue_rejects_and_keeps_contents() {
        let mut q = queue(2);
        q.push(cmd("a"), Timing::Any).unwrap();
        q.push(cmd("b"), Timing::Any).unwrap();
        let err = q.push(cmd("c"), Timing::Next).unwrap_err();
        assert!(matches!(err, Error::QueueFull { capacity: 2 }));
        assert_eq!(texts(&q), ["a", "b"]);
    }

    #[test]
    fn test_length_limits() {
        let mut q = Queue::new(&Config::new().max_command_len(4).max_pattern_len(3));
        assert!(matches!(
            q.push(cmd("toolong"), Timing::Any),
            Err(Error::CommandTooLong { len: 7, max: 4 })
        ));
        let long_pattern = Command::new("AT", "LONG").unwrap();
        assert!(matches!(
            q.push(long_pattern, Timing::Any),
            Err(Error::PatternTooLong { len: 4, max: 3 })
        ));
        assert!(q.is_empty());
    }

    #[test]
    fn test_dequeue_front_compacts_and_resets_state() {
        let mut q = queue(3);
        q.push(cmd("a"), Timing::Any).unwrap();
        q.push(cmd("b"), Timing::Any).unwrap();
        q.set_state(State::AwaitingMatch {
            sent_at: Instant::now(),
        });
        let done = q.dequeue_front().unwrap();
        assert_eq!(done.text(), b"a");
        assert_eq!(texts(&q), ["b"]);
        assert_eq!(q.state(), State::Idle);
    }

    #[test]
    fn test_abort_clears_everything() {
        let mut q = queue(3);
        q.push(cmd("a"), Timing::Any).unwrap();
        q.push(cmd("b"), Timing::Any).unwrap();
        q.set_state(State::AwaitingMatch {
            sent_at: Instant::now(),
        });
        assert_eq!(q.abort(), 2);
        assert!(q.is_empty());
        assert_eq!(q.state(), State::Idle);
    }

    #[test]
    fn test_empty_chain_rejected() {
        let mut q = queue(3);
        assert!(matches!(
            q.push_chain(&[], Timing::Any, None, None),
            Err(Error::EmptyChain)
        ));
    }

    #[test]
    fn test_chain_occupies_one_slot() {
        let mut q = queue(3);
        let steps = [cmd("a"), cmd("b"), cmd("c")];
        q.push_chain(&steps, Timing::Any, None, None).unwrap();
        assert_eq!(texts(&q), ["a"]);
    }

    #[test]
    fn test_command_defaults() {
        let c = cmd("AT");
        assert_eq!(c.timeout(), Duration::from_millis(2500));
        assert_eq!(c.delay(), Duration::ZERO);
        assert_eq!(c.expectation().as_str(), "OK");
    }
}
