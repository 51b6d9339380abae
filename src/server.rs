use crate::client::Client;
use crate::command::{self, handler, Command, CommandFlags, CommandHandler, CommandSpec};
use crate::config::Config;
use crate::error::{RudisError, RudisResult};
use crate::reader::CommandReader;
use crate::resp::RespValue;
use crate::store::Keyspace;
use std::collections::HashMap;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::{rustls, TlsAcceptor};
use tracing::{debug, info, warn};

/// Decides whether a freshly accepted connection may proceed.
pub type AcceptHook = Arc<dyn Fn(&Client) -> bool + Send + Sync>;
/// Observes a connection closing, with the error that ended it, if any.
pub type CloseHook = Arc<dyn Fn(&Client, Option<&RudisError>) + Send + Sync>;

/// The replaceable callbacks around command execution and the connection
/// lifecycle. `command` is the outer per-command callback; its default
/// dispatches through the registry and falls back to `unknown`.
pub struct Hooks {
    pub accept: AcceptHook,
    pub close: CloseHook,
    pub unknown: CommandHandler,
    pub command: CommandHandler,
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks {
            accept: Arc::new(|_| true),
            close: Arc::new(|_, _| {}),
            unknown: handler(|_, _, cmd: Command| async move {
                RudisError::UnknownCommand(cmd.name()).to_resp()
            }),
            command: handler(|server: Arc<Server>, client, cmd| async move {
                server.dispatch(client, cmd).await
            }),
        }
    }
}

/// Everything behind the one process-wide reader-writer lock: the keyspace,
/// the command registry, connected clients, and the hooks.
pub struct Shared {
    pub keyspace: Keyspace,
    commands: HashMap<String, CommandSpec>,
    clients: HashMap<u64, Arc<Client>>,
    hooks: Hooks,
}

/// The store instance. One per process in practice, though nothing prevents
/// several. All shared state sits behind a single `tokio::sync::RwLock`;
/// handlers and background tasks take exactly the guard they need and never
/// hold it across a reply write.
pub struct Server {
    shared: RwLock<Shared>,
    next_client_id: AtomicU64,
}

impl Server {
    /// A fresh instance with the built-in command set registered.
    pub fn new() -> Arc<Self> {
        Arc::new(Server {
            shared: RwLock::new(Shared {
                keyspace: Keyspace::new(),
                commands: default_commands(),
                clients: HashMap::new(),
                hooks: Hooks::default(),
            }),
            next_client_id: AtomicU64::new(1),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Shared> {
        self.shared.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Shared> {
        self.shared.write().await
    }

    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register (or replace) a command under its lower-cased name.
    pub async fn register_command(&self, name: &str, spec: CommandSpec) {
        self.shared
            .write()
            .await
            .commands
            .insert(name.to_ascii_lowercase(), spec);
    }

    /// Remove a command. Returns whether it was registered.
    pub async fn unregister_command(&self, name: &str) -> bool {
        self.shared
            .write()
            .await
            .commands
            .remove(&name.to_ascii_lowercase())
            .is_some()
    }

    /// Empty the registry. Subsequent commands all hit the unknown handler.
    pub async fn flush_commands(&self) {
        self.shared.write().await.commands.clear();
    }

    pub async fn command_exists(&self, name: &str) -> bool {
        self.shared
            .read()
            .await
            .commands
            .contains_key(&name.to_ascii_lowercase())
    }

    /// Create a database on first touch: a read-locked probe, then an
    /// idempotent write-locked create on miss, so two racing creators are
    /// harmless. Built-in handlers create databases inline under the write
    /// guard they already hold; this is the standalone path for
    /// runtime-registered commands.
    pub async fn ensure_db(&self, index: u64) {
        if self.shared.read().await.keyspace.db(index).is_some() {
            return;
        }
        self.shared.write().await.keyspace.db_mut(index);
    }

    pub async fn client_count(&self) -> usize {
        self.shared.read().await.clients.len()
    }

    pub async fn set_accept_hook(&self, hook: AcceptHook) {
        self.shared.write().await.hooks.accept = hook;
    }

    pub async fn set_close_hook(&self, hook: CloseHook) {
        self.shared.write().await.hooks.close = hook;
    }

    pub async fn set_unknown_handler(&self, h: CommandHandler) {
        self.shared.write().await.hooks.unknown = h;
    }

    pub async fn set_command_hook(&self, h: CommandHandler) {
        self.shared.write().await.hooks.command = h;
    }

    /// Look up the command in the registry and run its handler, or the
    /// unknown handler if nothing is registered under that name. The lookup
    /// clones the handler out so no lock is held during execution.
    pub async fn dispatch(self: &Arc<Self>, client: Arc<Client>, cmd: Command) -> RespValue {
        let name = cmd.name();
        let (spec, unknown) = {
            let shared = self.shared.read().await;
            (
                shared.commands.get(&name).cloned(),
                shared.hooks.unknown.clone(),
            )
        };
        match spec {
            Some(spec) => (spec.handler)(self.clone(), client, cmd).await,
            None => unknown(self.clone(), client, cmd).await,
        }
    }
}

fn default_commands() -> HashMap<String, CommandSpec> {
    let mut commands = HashMap::new();
    let mut add = |name: &str, h: CommandHandler, flags: CommandFlags| {
        commands.insert(name.to_string(), CommandSpec::new(h, flags));
    };
    add("ping", handler(command::server_cmd::ping), CommandFlags::readonly().fast());
    add("get", handler(command::string::get), CommandFlags::readonly().fast());
    add("set", handler(command::string::set), CommandFlags::write());
    add("del", handler(command::key::del), CommandFlags::write());
    add("ttl", handler(command::key::ttl), CommandFlags::readonly().fast());
    add("rpush", handler(command::list::rpush), CommandFlags::write().fast());
    add("lrem", handler(command::list::lrem), CommandFlags::write());
    commands
}

/// Bind the listener and serve until Ctrl-C. With both TLS paths configured,
/// every accepted stream is handshaked before it reaches the command loop.
pub async fn run_server(server: Arc<Server>, config: Config) -> RudisResult<()> {
    let tls = match (&config.tls_cert_file, &config.tls_key_file) {
        (Some(cert), Some(key)) => Some(load_tls(cert, key)?),
        (None, None) => None,
        _ => {
            return Err(RudisError::Generic(
                "tls requires both --tlscertfile and --tlskeyfile".into(),
            ));
        }
    };

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, tls = tls.is_some(), "listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let server = server.clone();
                let tls = tls.clone();
                tokio::spawn(async move {
                    match tls {
                        Some(acceptor) => match acceptor.accept(stream).await {
                            Ok(stream) => handle_client(server, stream, peer).await,
                            Err(e) => debug!(%peer, error = %e, "tls handshake failed"),
                        },
                        None => handle_client(server, stream, peer).await,
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

/// One connection's lifetime: accept hook, registration, the command loop,
/// and unconditional cleanup. A protocol error gets one error reply and then
/// the connection closes; everything command-level is answered in-band and
/// the loop continues.
pub async fn handle_client<S>(server: Arc<Server>, stream: S, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let client = Arc::new(Client::new(server.next_client_id(), peer));
    debug!(id = client.id(), %peer, "connection open");

    let accept = server.shared.read().await.hooks.accept.clone();
    if !accept(&client) {
        debug!(id = client.id(), "connection refused by accept hook");
        return;
    }
    server
        .shared
        .write()
        .await
        .clients
        .insert(client.id(), client.clone());

    let (rd, mut wr) = tokio::io::split(stream);
    let mut reader = CommandReader::new(rd);
    let mut close_err: Option<RudisError> = None;

    loop {
        match reader.next_command().await {
            Ok(Some(argv)) => {
                let cmd = Command::new(argv);
                if cmd.is_empty() {
                    continue;
                }
                let hook = server.shared.read().await.hooks.command.clone();
                let reply = hook(server.clone(), client.clone(), cmd).await;
                if let Err(e) = wr.write_all(&reply.serialize()).await {
                    close_err = Some(e.into());
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let e = RudisError::Protocol(e);
                let _ = wr.write_all(&e.to_resp().serialize()).await;
                close_err = Some(e);
                break;
            }
        }
    }

    let close = {
        let mut shared = server.shared.write().await;
        shared.clients.remove(&client.id());
        shared.hooks.close.clone()
    };
    close(&client, close_err.as_ref());
    debug!(id = client.id(), "connection closed");
}

fn load_tls(cert_path: &str, key_path: &str) -> RudisResult<TlsAcceptor> {
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut BufReader::new(std::fs::File::open(cert_path)?))
            .collect::<Result<_, _>>()?;
    let key: PrivateKeyDer<'static> =
        rustls_pemfile::private_key(&mut BufReader::new(std::fs::File::open(key_path)?))?
            .ok_or_else(|| RudisError::Generic(format!("no private key in {key_path}")))?;
    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| RudisError::Generic(format!("tls configuration: {e}")))?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}
