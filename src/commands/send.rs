//! [`SendInput`] command: queues bytes that expect no response.
//!
//! Script syntax: `send "ATE0\r"`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use crate::pattern::Pattern;
use crate::queue::{Command, Timing};
use anyhow::Result;
use async_trait::async_trait;

/// Queues bytes for the device with an empty expectation: the command
/// completes as soon as it is written.
///
/// Nothing is appended: include `\r` when the device expects one.
pub struct SendInput {
    pub data: Vec<u8>,
}

impl SendInput {
    pub const NAME: &'static str = "send";

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            data: text.into().into_bytes(),
        }
    }
}

#[async_trait(?Send)]
impl ScriptCommand for SendInput {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(parse_quoted_string(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let command = Command::with_pattern(self.data.clone(), Pattern::empty())
            .with_failure(Some(ctx.record_failure()));
        ctx.make_room().await?;
        ctx.engine().execute(command, Timing::Any)?;
        Ok(())
    }
}
