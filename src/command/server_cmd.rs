use crate::client::Client;
use crate::command::Command;
use crate::resp::RespValue;
use crate::server::Server;
use std::sync::Arc;

/// PING [message ...]
///
/// Bare PING answers `+PONG`. With arguments, the arguments are echoed
/// joined by single spaces, as a bulk reply so binary payloads survive.
pub async fn ping(_server: Arc<Server>, _client: Arc<Client>, cmd: Command) -> RespValue {
    if cmd.arg_count() <= 1 {
        return RespValue::simple_string("PONG");
    }
    let mut msg = Vec::new();
    for (i, arg) in cmd.args_from(1).iter().enumerate() {
        if i > 0 {
            msg.push(b' ');
        }
        msg.extend_from_slice(arg);
    }
    RespValue::bulk_string(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn cmd(parts: &[&[u8]]) -> Command {
        Command::new(parts.iter().map(|p| Bytes::copy_from_slice(p)).collect())
    }

    fn client() -> Arc<Client> {
        Arc::new(Client::new(1, "127.0.0.1:0".parse().unwrap()))
    }

    #[tokio::test]
    async fn test_bare_ping_pongs() {
        let server = Server::new();
        let reply = ping(server, client(), cmd(&[b"ping"])).await;
        assert_eq!(reply, RespValue::simple_string("PONG"));
    }

    #[tokio::test]
    async fn test_ping_echoes_arguments() {
        let server = Server::new();
        let reply = ping(server, client(), cmd(&[b"ping", b"hello", b"world"])).await;
        assert_eq!(reply, RespValue::bulk_string(&b"hello world"[..]));
    }

    #[tokio::test]
    async fn test_ping_is_binary_safe() {
        let server = Server::new();
        let reply = ping(server, client(), cmd(&[b"ping", b"a\x00b"])).await;
        assert_eq!(reply, RespValue::bulk_string(&b"a\x00b"[..]));
    }
}
