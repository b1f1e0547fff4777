//! [`Show`] command: writes text directly to the output handler.
//!
//! Script syntax: `show "Checking signal"`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;

/// Writes text to the output handler without sending anything to the device.
pub struct Show {
    pub data: Vec<u8>,
}

impl Show {
    pub const NAME: &'static str = "show";

    /// Create a `Show` command from a string. A newline is appended automatically.
    pub fn new(text: impl Into<String>) -> Self {
        let mut t = text.into();
        t.push('\n');
        Self {
            data: t.into_bytes(),
        }
    }
}

#[async_trait(?Send)]
impl ScriptCommand for Show {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(parse_quoted_string(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.emit(&self.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::context;

    #[test]
    fn test_parse() {
        let cmd = Show::parse(r#""signal check""#).unwrap();
        assert_eq!(cmd.data, b"signal check\n");
    }

    #[test]
    fn test_parse_unclosed_quote() {
        assert!(Show::parse(r#""unclosed"#).is_err());
    }

    #[tokio::test]
    async fn test_execute_emits() {
        let (mut ctx, device, output) = context();
        Show::new("hello").execute(&mut ctx).await.unwrap();
        assert_eq!(output.borrow().as_slice(), b"hello\n");
        assert!(device.written().is_empty());
    }
}
