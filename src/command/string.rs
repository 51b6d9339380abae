use crate::client::Client;
use crate::command::Command;
use crate::error::RudisError;
use crate::resp::RespValue;
use crate::server::Server;
use crate::store::{now_millis, Item};
use std::sync::Arc;

/// GET key
pub async fn get(server: Arc<Server>, client: Arc<Client>, cmd: Command) -> RespValue {
    if cmd.arg_count() != 2 {
        return RudisError::WrongArgCount("get".into()).to_resp();
    }
    let key = cmd.arg_str(1).unwrap_or_default();
    let now = now_millis();

    // Write lock: the lazy-expiry read may delete the key.
    let mut shared = server.write().await;
    let db = shared.keyspace.db_mut(client.selected_db());
    match db.get_or_expire(&key, now) {
        None => RespValue::null_bulk_string(),
        Some(item) => match item.as_str() {
            Some(value) => RespValue::bulk_string(value),
            None => RudisError::WrongType {
                actual: item.type_name(),
                expected: "string",
            }
            .to_resp(),
        },
    }
}

#[derive(Default)]
struct SetOptions {
    expire_ms: Option<u64>,
    nx: bool,
    xx: bool,
}

/// SET key value [EX seconds | PX milliseconds] [NX | XX]
///
/// EX/PX are mutually exclusive, as are NX/XX. A truncated SET (no value)
/// acknowledges without mutating anything.
pub async fn set(server: Arc<Server>, client: Arc<Client>, cmd: Command) -> RespValue {
    if cmd.arg_count() < 3 {
        return RespValue::ok();
    }
    let key = cmd.arg_str(1).unwrap_or_default();
    let value = cmd.arg(2).map(|v| v.to_vec()).unwrap_or_default();

    let opts = match parse_set_options(&cmd) {
        Ok(opts) => opts,
        Err(e) => return e.to_resp(),
    };

    let now = now_millis();
    let mut shared = server.write().await;
    let db = shared.keyspace.db_mut(client.selected_db());

    let exists = db.exists(&key, now);
    if (opts.nx && exists) || (opts.xx && !exists) {
        return RespValue::null_bulk_string();
    }

    // Saturate: a huge but valid expire pins to the far future, never wraps.
    let expires_at = opts.expire_ms.map(|ms| now.saturating_add(ms));
    db.set(&key, Item::str(value, expires_at));
    RespValue::ok()
}

fn parse_set_options(cmd: &Command) -> Result<SetOptions, RudisError> {
    let mut opts = SetOptions::default();
    let mut i = 3;
    while i < cmd.arg_count() {
        let word = cmd.arg_str(i).unwrap_or_default().to_ascii_uppercase();
        match word.as_str() {
            "EX" | "PX" => {
                if opts.expire_ms.is_some() {
                    return Err(RudisError::Syntax);
                }
                i += 1;
                let raw = cmd.arg_str(i).ok_or(RudisError::Syntax)?;
                let n: i64 = raw.parse().map_err(|_| RudisError::NotInteger)?;
                if n <= 0 {
                    return Err(RudisError::InvalidExpire("set".into()));
                }
                opts.expire_ms = Some(if word == "EX" {
                    (n as u64).saturating_mul(1_000)
                } else {
                    n as u64
                });
            }
            "NX" => {
                if opts.xx {
                    return Err(RudisError::Syntax);
                }
                opts.nx = true;
            }
            "XX" => {
                if opts.nx {
                    return Err(RudisError::Syntax);
                }
                opts.xx = true;
            }
            _ => return Err(RudisError::Syntax),
        }
        i += 1;
    }
    Ok(opts)
}
