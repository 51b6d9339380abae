use crate::client::Client;
use crate::command::Command;
use crate::error::RudisError;
use crate::resp::RespValue;
use crate::server::Server;
use crate::store::{now_millis, Item};
use std::collections::VecDeque;
use std::sync::Arc;

/// RPUSH key element [element ...]
///
/// Creates the list if the key is absent. All elements are appended within
/// one critical section, so concurrent pushers interleave whole commands,
/// never partial ones. Replies with the resulting length.
pub async fn rpush(server: Arc<Server>, client: Arc<Client>, cmd: Command) -> RespValue {
    if cmd.arg_count() < 3 {
        return RudisError::WrongArgCount("rpush".into()).to_resp();
    }
    let key = cmd.arg_str(1).unwrap_or_default();
    let now = now_millis();

    let mut shared = server.write().await;
    let db = shared.keyspace.db_mut(client.selected_db());
    if db.get_or_expire(&key, now).is_none() {
        db.set(&key, Item::list());
    }
    let item = match db.get_mut_or_expire(&key, now) {
        Some(item) => item,
        None => return RespValue::integer(0),
    };
    let elements = match item.as_list_mut() {
        Some(elements) => elements,
        None => {
            return RudisError::WrongType {
                actual: item.type_name(),
                expected: "list",
            }
            .to_resp();
        }
    };
    for element in cmd.args_from(2) {
        elements.push_back(element.to_vec());
    }
    RespValue::integer(elements.len() as i64)
}

/// LREM key count element
///
/// count > 0 removes matches head-to-tail up to count; count < 0 removes
/// tail-to-head up to |count|; count = 0 removes every match. A list left
/// empty is deleted from the keyspace. Replies with the removed count.
pub async fn lrem(server: Arc<Server>, client: Arc<Client>, cmd: Command) -> RespValue {
    if cmd.arg_count() != 4 {
        return RudisError::WrongArgCount("lrem".into()).to_resp();
    }
    let key = cmd.arg_str(1).unwrap_or_default();
    let count: i64 = match cmd.arg_str(2).unwrap_or_default().parse() {
        Ok(n) => n,
        Err(_) => return RudisError::NotInteger.to_resp(),
    };
    let target = cmd.arg(3).map(|a| a.to_vec()).unwrap_or_default();
    let now = now_millis();

    let mut shared = server.write().await;
    let db = shared.keyspace.db_mut(client.selected_db());
    let item = match db.get_mut_or_expire(&key, now) {
        Some(item) => item,
        None => return RespValue::integer(0),
    };
    let elements = match item.as_list_mut() {
        Some(elements) => elements,
        None => {
            return RudisError::WrongType {
                actual: item.type_name(),
                expected: "list",
            }
            .to_resp();
        }
    };

    let removed = remove_matching(elements, &target, count);
    if elements.is_empty() {
        db.remove(&key);
    }
    RespValue::integer(removed)
}

fn remove_matching(elements: &mut VecDeque<Vec<u8>>, target: &[u8], count: i64) -> i64 {
    let limit = if count == 0 {
        usize::MAX
    } else {
        count.unsigned_abs() as usize
    };
    let mut removed = 0usize;
    let mut kept = VecDeque::with_capacity(elements.len());

    if count >= 0 {
        for element in elements.drain(..) {
            if removed < limit && element == target {
                removed += 1;
            } else {
                kept.push_back(element);
            }
        }
    } else {
        while let Some(element) = elements.pop_back() {
            if removed < limit && element == target {
                removed += 1;
            } else {
                kept.push_front(element);
            }
        }
    }
    *elements = kept;
    removed as i64
}
