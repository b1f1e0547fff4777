//! [`Chain`] command: queues a sequence of dependent commands.
//!
//! Script syntax:
//! - `chain "AT+CPIN?\r" "READY" "AT+COPS?\r" "\+COPS: 0"`
//! - `chain "AT\r" "OK" "ATI\r" "OK" 3s next`: per-step timeout, jumps the queue

use super::exec::Options;
use crate::command::{Context, ScriptCommand};
use crate::parser::{Arg, split_args};
use crate::pattern::Pattern;
use crate::queue::{Command, Timing};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;

/// Queues `(text, pattern)` steps that run strictly in order.
///
/// Each step is only sent once the previous one matched; the first step to
/// time out ends the chain and stops the script.
pub struct Chain {
    pub steps: Vec<(String, Pattern)>,
    pub timeout: Option<Duration>,
    pub delay: Duration,
    pub timing: Timing,
    pub prompt: bool,
}

impl Chain {
    pub const NAME: &'static str = "chain";
}

#[async_trait(?Send)]
impl ScriptCommand for Chain {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let args = split_args(args)?;
        let split = args
            .iter()
            .position(|arg| matches!(arg, Arg::Bare(_)))
            .unwrap_or(args.len());
        let (strings, rest) = args.split_at(split);
        if strings.is_empty() || strings.len() % 2 != 0 {
            return Err(anyhow!(
                "Expected quoted command/pattern pairs after 'chain'"
            ));
        }
        let steps = strings
            .chunks(2)
            .map(|pair| match pair {
                [Arg::Quoted(text), Arg::Quoted(pattern)] => {
                    Ok((text.clone(), Pattern::new(pattern.as_str())?))
                }
                _ => Err(anyhow!("Expected quoted command/pattern pair")),
            })
            .collect::<Result<Vec<_>>>()?;
        let options = Options::parse(rest)?;
        Ok(Self {
            steps,
            timeout: options.timeout,
            delay: options.delay,
            timing: options.timing,
            prompt: options.prompt,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let timeout = self.timeout.unwrap_or(ctx.default_timeout());
        let steps: Vec<Command> = self
            .steps
            .iter()
            .map(|(text, pattern)| {
                Command::with_pattern(text.as_bytes(), pattern.clone())
                    .with_timeout(timeout)
                    .with_delay(self.delay)
                    .with_prompt(self.prompt)
            })
            .collect();
        let on_failure = ctx.record_failure();
        ctx.make_room().await?;
        ctx.engine()
            .execute_chain(&steps, self.timing, None, Some(on_failure))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::context;

    #[test]
    fn test_parse_pairs() {
        let cmd = Chain::parse(r#""AT+CPIN?\r" "READY" "AT+CSQ\r" "CSQ""#).unwrap();
        assert_eq!(cmd.steps.len(), 2);
        assert_eq!(cmd.steps[0].0, "AT+CPIN?\r");
        assert_eq!(cmd.steps[1].1.as_str(), "CSQ");
        assert_eq!(cmd.timeout, None);
    }

    #[test]
    fn test_parse_options() {
        let cmd = Chain::parse(r#""AT\r" "OK" 3s next"#).unwrap();
        assert_eq!(cmd.steps.len(), 1);
        assert_eq!(cmd.timeout, Some(Duration::from_secs(3)));
        assert_eq!(cmd.timing, Timing::Next);
        assert!(!cmd.prompt);
        assert!(Chain::parse(r#""AT+CMGS=1\r" "> " prompt"#).unwrap().prompt);
    }

    #[test]
    fn test_parse_rejects_odd_strings() {
        assert!(Chain::parse(r#""AT\r" "OK" "ATI\r""#).is_err());
        assert!(Chain::parse("").is_err());
        assert!(Chain::parse(r#""AT\r" "OK" 1s "ATI\r" "OK""#).is_err());
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let (mut ctx, device, _) = context();
        Chain::parse(r#""A\r" "OK" "B\r" "OK""#)
            .unwrap()
            .execute(&mut ctx)
            .await
            .unwrap();
        ctx.engine().poll();
        assert_eq!(device.take_written(), b"A\r");
        device.feed(b"OK\r\n");
        ctx.engine().poll();
        ctx.engine().poll();
        assert_eq!(device.take_written(), b"B\r");
        device.feed(b"OK\r\n");
        ctx.drain(Duration::from_millis(100)).await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_step_is_recorded() {
        let (mut ctx, device, _) = context();
        Chain::parse(r#""A\r" "OK" "B\r" "READY" 30ms"#)
            .unwrap()
            .execute(&mut ctx)
            .await
            .unwrap();
        ctx.engine().poll();
        device.feed(b"OK\r\n");
        let err = ctx.drain(Duration::from_secs(2)).await.unwrap_err();
        assert!(err.to_string().contains("\"B\""), "got: {err}");
    }
}
