use crate::client::Client;
use crate::command::Command;
use crate::error::RudisError;
use crate::resp::RespValue;
use crate::server::Server;
use crate::store::now_millis;
use std::sync::Arc;

/// DEL key
///
/// Replies with the number of keys actually removed (0 or 1). A key whose
/// deadline has passed counts as already gone.
pub async fn del(server: Arc<Server>, client: Arc<Client>, cmd: Command) -> RespValue {
    if cmd.arg_count() != 2 {
        return RudisError::WrongArgCount("del".into()).to_resp();
    }
    let key = cmd.arg_str(1).unwrap_or_default();
    let now = now_millis();

    let mut shared = server.write().await;
    let db = shared.keyspace.db_mut(client.selected_db());
    if !db.exists(&key, now) {
        return RespValue::integer(0);
    }
    db.remove(&key);
    RespValue::integer(1)
}

/// TTL key
///
/// -2 if the key does not exist, -1 if it exists without a deadline,
/// otherwise the remaining whole seconds.
pub async fn ttl(server: Arc<Server>, client: Arc<Client>, cmd: Command) -> RespValue {
    if cmd.arg_count() != 2 {
        return RudisError::WrongArgCount("ttl".into()).to_resp();
    }
    let key = cmd.arg_str(1).unwrap_or_default();
    let now = now_millis();

    let mut shared = server.write().await;
    let db = shared.keyspace.db_mut(client.selected_db());
    match db.get_or_expire(&key, now) {
        None => RespValue::integer(-2),
        Some(item) => match item.expiry_ms() {
            None => RespValue::integer(-1),
            Some(deadline) => {
                // The lazy-expiry read above guarantees deadline > now; clamp
                // so saturated far-future deadlines stay positive.
                let remaining_ms =
                    i64::try_from(deadline.saturating_sub(now)).unwrap_or(i64::MAX);
                RespValue::integer(remaining_ms / 1_000)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::list::rpush;
    use crate::command::string::{get, set};
    use bytes::Bytes;

    fn cmd(parts: &[&[u8]]) -> Command {
        Command::new(parts.iter().map(|p| Bytes::copy_from_slice(p)).collect())
    }

    fn client() -> Arc<Client> {
        Arc::new(Client::new(1, "127.0.0.1:0".parse().unwrap()))
    }

    #[tokio::test]
    async fn test_del_counts_existing_keys() {
        let server = Server::new();
        let client = client();
        set(server.clone(), client.clone(), cmd(&[b"set", b"k", b"v"])).await;
        assert_eq!(
            del(server.clone(), client.clone(), cmd(&[b"del", b"k"])).await,
            RespValue::integer(1)
        );
        assert_eq!(
            del(server.clone(), client.clone(), cmd(&[b"del", b"k"])).await,
            RespValue::integer(0)
        );
        assert_eq!(
            get(server, client, cmd(&[b"get", b"k"])).await,
            RespValue::null_bulk_string()
        );
    }

    #[tokio::test]
    async fn test_del_works_on_lists() {
        let server = Server::new();
        let client = client();
        rpush(server.clone(), client.clone(), cmd(&[b"rpush", b"l", b"a"])).await;
        assert_eq!(
            del(server, client, cmd(&[b"del", b"l"])).await,
            RespValue::integer(1)
        );
    }

    #[tokio::test]
    async fn test_ttl_missing_key() {
        let server = Server::new();
        assert_eq!(
            ttl(server, client(), cmd(&[b"ttl", b"nope"])).await,
            RespValue::integer(-2)
        );
    }

    #[tokio::test]
    async fn test_ttl_persistent_key() {
        let server = Server::new();
        let client = client();
        set(server.clone(), client.clone(), cmd(&[b"set", b"k", b"v"])).await;
        assert_eq!(
            ttl(server, client, cmd(&[b"ttl", b"k"])).await,
            RespValue::integer(-1)
        );
    }

    #[tokio::test]
    async fn test_ttl_reports_remaining_seconds() {
        let server = Server::new();
        let client = client();
        set(
            server.clone(),
            client.clone(),
            cmd(&[b"set", b"k", b"v", b"EX", b"100"]),
        )
        .await;
        let reply = ttl(server, client, cmd(&[b"ttl", b"k"])).await;
        match reply {
            RespValue::Integer(n) => assert!((98..=100).contains(&n), "ttl was {n}"),
            other => panic!("expected integer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ttl_huge_expire_stays_positive() {
        let server = Server::new();
        let client = client();
        set(
            server.clone(),
            client.clone(),
            cmd(&[b"set", b"k", b"v", b"EX", b"9223372036854775807"]),
        )
        .await;
        let reply = ttl(server, client, cmd(&[b"ttl", b"k"])).await;
        match reply {
            RespValue::Integer(n) => assert!(n > 0, "ttl was {n}"),
            other => panic!("expected integer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ttl_expired_key_reads_as_missing() {
        let server = Server::new();
        let client = client();
        set(
            server.clone(),
            client.clone(),
            cmd(&[b"set", b"k", b"v", b"PX", b"20"]),
        )
        .await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(
            ttl(server, client, cmd(&[b"ttl", b"k"])).await,
            RespValue::integer(-2)
        );
    }
}
