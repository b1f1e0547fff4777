//! [`Abort`] command: drops every queued command.
//!
//! Script syntax: `abort`

use crate::command::{Context, ScriptCommand};
use anyhow::{Result, anyhow};
use async_trait::async_trait;

/// Drops the active command and the rest of the queue without running callbacks.
pub struct Abort;

impl Abort {
    pub const NAME: &'static str = "abort";
}

#[async_trait(?Send)]
impl ScriptCommand for Abort {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        if args.trim().is_empty() {
            Ok(Self)
        } else {
            Err(anyhow!("'abort' takes no arguments"))
        }
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.engine().abort();
        Ok(())
    }
}
