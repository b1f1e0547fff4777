//! [`Sleep`] command: keeps the engine running for a fixed duration.
//!
//! Script syntax: `sleep 500ms` or `sleep 1.5s`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_duration;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Pauses the script while the engine keeps sending, matching and running hooks.
pub struct Sleep {
    pub duration: Duration,
}

impl Sleep {
    pub const NAME: &'static str = "sleep";
}

#[async_trait(?Send)]
impl ScriptCommand for Sleep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            duration: parse_duration(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.drive_for(self.duration).await
    }
}
