mod abort;
mod chain;
mod exec;
mod hook;
mod send;
mod show;
mod sleep;
mod wait;

pub use abort::Abort;
pub use chain::Chain;
pub use exec::Exec;
pub use hook::Hook;
pub use send::SendInput;
pub use show::Show;
pub use sleep::Sleep;
pub use wait::Wait;
