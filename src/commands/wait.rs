//! [`Wait`] command: blocks until every queued command has completed.
//!
//! Script syntax: `wait 5s` or `wait 500ms`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_duration;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Drives the engine until the queue is empty, failing after `timeout`.
pub struct Wait {
    pub timeout: Duration,
}

impl Wait {
    pub const NAME: &'static str = "wait";
}

#[async_trait(?Send)]
impl ScriptCommand for Wait {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            timeout: parse_duration(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.drain(self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::context;
    use crate::queue::{Command, Timing};

    #[test]
    fn test_parse() {
        assert_eq!(Wait::parse("1s").unwrap().timeout, Duration::from_secs(1));
        assert_eq!(
            Wait::parse("1.5s").unwrap().timeout,
            Duration::from_secs_f64(1.5)
        );
        assert!(Wait::parse("5minutes").is_err());
    }

    #[tokio::test]
    async fn test_wait_until_matched() {
        let (mut ctx, device, _) = context();
        let command = Command::new("AT\r", "OK").unwrap();
        ctx.engine().execute(command, Timing::Any).unwrap();
        device.feed(b"OK\r\n");
        Wait::parse("1s").unwrap().execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.engine().queue_len(), 0);
    }
}
