//! Standing watchers for unsolicited lines.

use crate::error::{Error, Result};
use crate::pattern::{Captures, Pattern};
use crate::queue::{OnSuccess, Queue};
use std::rc::Rc;
use tracing::trace;

struct Hook {
    expectation: Pattern,
    on_match: OnSuccess,
}

/// Fixed-capacity table of hooks, evaluated in registration order.
pub struct HookRegistry {
    hooks: Vec<Hook>,
    capacity: usize,
    max_pattern_len: usize,
}

impl HookRegistry {
    pub fn new(capacity: usize, max_pattern_len: usize) -> Self {
        Self {
            hooks: Vec::with_capacity(capacity),
            capacity,
            max_pattern_len,
        }
    }

    /// Add a hook calling `on_match` for every completed line matching `pattern`.
    pub fn register(
        &mut self,
        pattern: Pattern,
        on_match: impl Fn(&mut Queue, &Captures) + 'static,
    ) -> Result<()> {
        if self.hooks.len() >= self.capacity {
            return Err(Error::HookTableFull {
                capacity: self.capacity,
            });
        }
        let len = pattern.as_str().len();
        if len > self.max_pattern_len {
            return Err(Error::PatternTooLong {
                len,
                max: self.max_pattern_len,
            });
        }
        self.hooks.push(Hook {
            expectation: pattern,
            on_match: Rc::new(on_match),
        });
        Ok(())
    }

    /// Offer `line` to every hook. Returns how many matched.
    pub fn dispatch(&self, line: &[u8], queue: &mut Queue) -> usize {
        let mut matched = 0;
        for hook in &self.hooks {
            if let Some(found) = hook.expectation.find(line) {
                trace!(pattern = hook.expectation.as_str(), "hook matched");
                (hook.on_match)(queue, &found.captures);
                matched += 1;
            }
        }
        matched
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::cell::RefCell;

    #[test]
    fn test_all_matching_hooks_fire_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = HookRegistry::new(4, 128);
        for (name, pattern) in [("ring", "RING"), ("any", ".+"), ("sms", r"\+CMTI")] {
            let seen = seen.clone();
            hooks
                .register(Pattern::new(pattern).unwrap(), move |_, _| {
                    seen.borrow_mut().push(name)
                })
                .unwrap();
        }
        let mut queue = Queue::new(&Config::new());
        assert_eq!(hooks.dispatch(b"RING", &mut queue), 2);
        assert_eq!(*seen.borrow(), ["ring", "any"]);
    }

    #[test]
    fn test_hook_receives_captures() {
        let level = Rc::new(RefCell::new(None));
        let slot = level.clone();
        let mut hooks = HookRegistry::new(1, 128);
        hooks
            .register(Pattern::new(r"\+CREG: (\d)").unwrap(), move |_, caps| {
                *slot.borrow_mut() = caps.get(1).map(str::to_owned)
            })
            .unwrap();
        hooks.dispatch(b"+CREG: 5", &mut Queue::new(&Config::new()));
        assert_eq!(level.borrow().as_deref(), Some("5"));
    }

    #[test]
    fn test_full_table_rejects() {
        let mut hooks = HookRegistry::new(1, 128);
        hooks.register(Pattern::new("A").unwrap(), |_, _| {}).unwrap();
        assert!(matches!(
            hooks.register(Pattern::new("B").unwrap(), |_, _| {}),
            Err(Error::HookTableFull { capacity: 1 })
        ));
        assert_eq!(hooks.len(), 1);
    }

    #[test]
    fn test_hook_may_enqueue() {
        use crate::queue::{Command, Timing};
        let mut hooks = HookRegistry::new(1, 128);
        hooks
            .register(Pattern::new("RING").unwrap(), |queue, _| {
                let answer = Command::new("ATA\r", "CONNECT").unwrap();
                queue.push(answer, Timing::Next).unwrap();
            })
            .unwrap();
        let mut queue = Queue::new(&Config::new());
        hooks.dispatch(b"RING", &mut queue);
        assert_eq!(queue.front().map(|c| c.text()), Some(&b"ATA\r"[..]));
    }

    #[test]
    fn test_long_pattern_rejects() {
        let mut hooks = HookRegistry::new(1, 4);
        assert!(matches!(
            hooks.register(Pattern::new("CONNECT").unwrap(), |_, _| {}),
            Err(Error::PatternTooLong { len: 7, max: 4 })
        ));
        assert!(hooks.is_empty());
    }
}
