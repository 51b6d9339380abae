//! Command representation, handler plumbing, and the built-in handlers.

pub mod key;
pub mod list;
pub mod server_cmd;
pub mod string;

use crate::client::Client;
use crate::resp::RespValue;
use crate::server::Server;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// One parsed request: the raw argument list, command name included.
#[derive(Debug, Clone)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(args: Vec<Bytes>) -> Self {
        Command { args }
    }

    /// Lower-cased command name (argument 0). Empty commands have no name.
    pub fn name(&self) -> String {
        self.args
            .first()
            .map(|a| String::from_utf8_lossy(a).to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Number of arguments including the command name.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Raw binary argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// Argument at `index` as lossy UTF-8, for keys and option words.
    pub fn arg_str(&self, index: usize) -> Option<String> {
        self.args
            .get(index)
            .map(|a| String::from_utf8_lossy(a).into_owned())
    }

    /// Arguments from `index` onward.
    pub fn args_from(&self, index: usize) -> &[Bytes] {
        self.args.get(index..).unwrap_or(&[])
    }
}

/// Descriptive traits of a command, mirroring upstream command tables.
/// Nothing enforces them yet; they exist for introspection and future
/// admission control.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandFlags {
    pub write: bool,
    pub readonly: bool,
    pub fast: bool,
    pub deny_oom: bool,
}

impl CommandFlags {
    pub const fn write() -> Self {
        CommandFlags {
            write: true,
            readonly: false,
            fast: false,
            deny_oom: true,
        }
    }

    pub const fn readonly() -> Self {
        CommandFlags {
            write: false,
            readonly: true,
            fast: false,
            deny_oom: false,
        }
    }

    pub const fn fast(mut self) -> Self {
        self.fast = true;
        self
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = RespValue> + Send>>;

/// A command handler. Handlers receive the server, the issuing client, and
/// the parsed command, and produce the reply; the connection task does the
/// writing. No lock is held at invocation time, so handlers take exactly the
/// lock they need.
pub type CommandHandler = Arc<dyn Fn(Arc<Server>, Arc<Client>, Command) -> HandlerFuture + Send + Sync>;

/// A registered command: its handler plus descriptive flags.
#[derive(Clone)]
pub struct CommandSpec {
    pub handler: CommandHandler,
    pub flags: CommandFlags,
}

impl CommandSpec {
    pub fn new(handler: CommandHandler, flags: CommandFlags) -> Self {
        CommandSpec { handler, flags }
    }
}

/// Wrap an async fn of the right shape into a boxed handler.
pub fn handler<F, Fut>(f: F) -> CommandHandler
where
    F: Fn(Arc<Server>, Arc<Client>, Command) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RespValue> + Send + 'static,
{
    Arc::new(move |server, client, cmd| Box::pin(f(server, client, cmd)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&[u8]]) -> Command {
        Command::new(parts.iter().map(|p| Bytes::copy_from_slice(p)).collect())
    }

    #[test]
    fn test_name_is_lowercased() {
        assert_eq!(cmd(&[b"PiNg"]).name(), "ping");
        assert_eq!(cmd(&[b"SET", b"k", b"v"]).name(), "set");
    }

    #[test]
    fn test_empty_command_has_no_name() {
        let c = cmd(&[]);
        assert!(c.is_empty());
        assert_eq!(c.name(), "");
    }

    #[test]
    fn test_args_from() {
        let c = cmd(&[b"rpush", b"k", b"a", b"b"]);
        assert_eq!(c.args_from(2).len(), 2);
        assert!(c.args_from(9).is_empty());
    }
}
