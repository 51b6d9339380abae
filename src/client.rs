use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-connection state. One `Client` is created per accepted connection,
/// registered with the server for its lifetime, and shared with every
/// command handler invocation on that connection.
#[derive(Debug)]
pub struct Client {
    id: u64,
    addr: SocketAddr,
    selected_db: AtomicU64,
}

impl Client {
    pub fn new(id: u64, addr: SocketAddr) -> Self {
        Client {
            id,
            addr,
            selected_db: AtomicU64::new(0),
        }
    }

    /// Unique id for this connection, assigned at accept time.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Index of the database this connection operates on. New connections
    /// start at database 0.
    pub fn selected_db(&self) -> u64 {
        self.selected_db.load(Ordering::Relaxed)
    }

    /// Move this connection to another database. None of the built-in
    /// commands call this; it exists for runtime-registered commands.
    pub fn select_db(&self, index: u64) {
        self.selected_db.store(index, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_starts_on_db_zero() {
        let client = Client::new(7, "127.0.0.1:12345".parse().unwrap());
        assert_eq!(client.id(), 7);
        assert_eq!(client.selected_db(), 0);
        client.select_db(3);
        assert_eq!(client.selected_db(), 3);
    }
}
