//! # Chatter
//!
//! A command/response engine for line-oriented serial devices such as AT
//! modems.
//!
//! Commands are queued with the pattern their response must match. The engine
//! sends one command at a time, splits incoming bytes into lines, matches each
//! line against the active command's regular expression, and calls the
//! command's success or failure callback. Hooks watch every line for
//! unsolicited messages (`RING`, `+CMTI: ...`) independently of the queue.
//!
//! Nothing runs in the background: call [`Engine::poll`] from your loop, or
//! [`Engine::wait`] to poll until the queue drains.
//!
//! ## Quick start
//!
//! ```
//! use chatter::{Command, Config, Engine, MockTransport, Timing};
//!
//! let modem = MockTransport::new();
//! let mut engine = Engine::new(Config::default());
//! engine.begin(modem.clone(), None);
//!
//! let signal = Command::new("AT+CSQ\r", r"\+CSQ: (\d+),(\d+)")?
//!     .on_success(|_, caps| println!("rssi {}", caps.get(1).unwrap_or("?")))
//!     .on_failure(|_, cmd| eprintln!("no answer to {:?}", cmd.text()));
//! engine.execute(signal, Timing::Any)?;
//!
//! engine.poll();
//! modem.feed(b"+CSQ: 21,0\r\nOK\r\n");
//! engine.poll();
//! assert_eq!(engine.queue_len(), 0);
//! # Ok::<(), chatter::Error>(())
//! ```
//!
//! ## Chains
//!
//! [`Engine::execute_chain`] queues steps that must succeed in order: each
//! step is sent only after the previous one matched, and the first timeout
//! ends the chain with the chain's failure callback.
//!
//! ## Scripts
//!
//! The `chatter` binary and the [`Runner`] drive a device from a script.
//! Use [`parse_str`] or [`parse_file`] to parse one.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `exec "AT\r" "OK"` | Queue a command and the pattern its response must match |
//! | `exec "AT\r" "OK" 5s 100ms next` | Custom timeout and send delay, jump the queue |
//! | `exec "AT+CMGS=1\r" "> " prompt` | Also match a response that never ends its line |
//! | `chain "c1" "p1" "c2" "p2" [timeout]` | Queue dependent steps |
//! | `hook "RING"` | Report every line matching a pattern |
//! | `send "ATE0\r"` | Queue bytes that expect no response |
//! | `wait 5s` | Wait for the queue to drain, failing after the timeout |
//! | `sleep 500ms` | Keep the engine running for a duration |
//! | `show "text"` | Write text to the output handler |
//! | `abort` | Drop every queued command |
//! | `# comment` | Full-line or inline comment |
//!
//! Inside quoted strings `\r`, `\n`, `\t`, `\"` and `\\` are unescaped; other
//! backslash sequences reach the regular expression unchanged.
//!
//! ```no_run
//! use chatter::{Config, Engine, Runner, SerialTransport, Transport, parse_str};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let commands = parse_str(
//!         r#"
//! exec "AT\r" "OK"
//! exec "AT+CPIN?\r" "READY" 5s
//! wait 10s
//! "#,
//!     )?;
//!
//!     let port: Box<dyn Transport> = Box::new(SerialTransport::open("/dev/ttyUSB0", 115_200)?);
//!     let mut engine = Engine::new(Config::default());
//!     engine.begin(port, Some(Box::new(std::io::stderr())));
//!
//!     Runner::new(engine).execute(commands).await
//! }
//! ```

pub mod buffer;
mod chain;
pub mod clock;
pub mod command;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod observer;
pub mod parser;
pub mod pattern;
pub mod queue;
pub mod runner;
pub mod transport;

pub use buffer::{LineBuffer, Room, Span};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Context, Device, ScriptCommand};
pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
pub use hooks::HookRegistry;
pub use observer::{Observer, TracingObserver, failure_summary, print_failure};
pub use parser::{parse_file, parse_str};
pub use pattern::{Captures, Pattern};
pub use queue::{Command, OnFailure, OnSuccess, Queue, State, Timing};
pub use runner::Runner;
pub use transport::{MockTransport, PtyTransport, SerialTransport, Transport};
