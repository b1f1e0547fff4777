//! [`Hook`] command: reports every line matching a pattern.
//!
//! Script syntax: `hook "RING"` or `hook "\+CMTI: \"SM\",(\d+)"`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use crate::pattern::Pattern;
use anyhow::Result;
use async_trait::async_trait;

/// Registers a hook that writes `[hook] <match>` to the output handler each
/// time a received line matches, for the rest of the script.
pub struct Hook {
    pub pattern: Pattern,
}

impl Hook {
    pub const NAME: &'static str = "hook";
}

#[async_trait(?Send)]
impl ScriptCommand for Hook {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::new(parse_quoted_string(args)?)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let output = ctx.output_handler();
        ctx.engine()
            .register_hook_pattern(self.pattern.clone(), move |_, captures| {
                output(format!("[hook] {}\n", captures.matched()).as_bytes());
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::context;

    #[test]
    fn test_parse() {
        let cmd = Hook::parse(r#""\+CMTI: (\d+)""#).unwrap();
        assert_eq!(cmd.pattern.as_str(), r"\+CMTI: (\d+)");
        assert!(Hook::parse(r#""[""#).is_err());
    }

    #[tokio::test]
    async fn test_execute_reports_matches() {
        let (mut ctx, device, output) = context();
        Hook::parse(r#""RING""#)
            .unwrap()
            .execute(&mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.engine().hook_count(), 1);
        device.feed(b"RING\r\n");
        ctx.engine().poll();
        let output = String::from_utf8(output.borrow().clone()).unwrap();
        assert!(output.contains("[hook] RING\n"), "got: {output:?}");
    }
}
