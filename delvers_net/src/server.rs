// TCP server: accept loop plus the fixed-rate simulation thread.
//
// Architecture: thread-per-connection I/O around a single sim thread.
//
// - **Listener thread**: non-blocking `accept()` loop that polls
//   `keep_running`. Each connection gets the next `PlayerId` (from 1), a
//   bounded outbox, a writer thread draining that outbox, and a reader thread
//   feeding the shared mailbox. `Connected` is posted before the reader starts
//   so the session always knows the peer before its first message.
// - **Reader threads**: block on the mailbox when it is full. TCP flow control
//   then slows the client down. On EOF or error they post `Disconnected`.
// - **Sim thread**: owns the `Session`. Ticks at `tick_interval`, sleeping
//   until the next deadline. It is the only writer to outboxes.
//
// Shutdown: `ServerHandle::stop` clears `keep_running`, which both the
// listener and the sim thread check once per iteration, and joins them.
// Dropping the session drops every outbox sender, so the writer threads shut
// their sockets and the readers see EOF.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use delvers_protocol::PlayerId;
use delvers_sim::{GameData, GridPoint, Role, SimConfig, Simulation, WorldSnapshot};
use tracing::{error, info, warn};

use crate::connection::{spawn_reader, spawn_writer};
use crate::error::NetError;
use crate::session::{Inbound, Mailbox, Session};

/// Configuration for starting a game server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    /// 0 lets the OS pick; the bound address is returned by `start_server`.
    pub port: u16,
    pub tick_interval: Duration,
    pub incoming_capacity: usize,
    pub outbox_capacity: usize,
    pub snapshot: WorldSnapshot,
    pub sim_config: SimConfig,
    pub data: GameData,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8999,
            tick_interval: Duration::from_millis(16),
            incoming_capacity: 1024,
            outbox_capacity: 256,
            snapshot: WorldSnapshot::arena(24, 16, GridPoint::new(5, 1)),
            sim_config: SimConfig::default(),
            data: GameData::default(),
        }
    }
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<Result<(), NetError>>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for its threads. Returns the first
    /// error either thread ended with.
    pub fn stop(self) -> Result<(), NetError> {
        self.keep_running.store(false, Ordering::SeqCst);
        let mut result = Ok(());
        for handle in self.threads {
            match handle.join() {
                Ok(Err(e)) if result.is_ok() => result = Err(e),
                Ok(_) => {}
                Err(_) => error!("server thread panicked"),
            }
        }
        result
    }

    pub fn is_running(&self) -> bool {
        self.keep_running.load(Ordering::SeqCst) && self.threads.iter().all(|t| !t.is_finished())
    }
}

/// Bind, start the listener and sim threads, and return immediately.
pub fn start_server(config: ServerConfig) -> Result<(ServerHandle, SocketAddr), NetError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    let keep_running = Arc::new(AtomicBool::new(true));

    let (tx, rx) = sync_channel(config.incoming_capacity);
    let mailbox = Mailbox::new(rx, tx.clone(), config.incoming_capacity);
    let start = config.snapshot.start;
    let sim = Simulation::new(Role::Server, config.sim_config.clone(), config.data.clone());
    let mut session = Session::new(sim, mailbox, start);
    session.open(config.snapshot.clone());

    let listener_thread = {
        let keep_running = keep_running.clone();
        let outbox_capacity = config.outbox_capacity;
        thread::Builder::new()
            .name("delvers-listener".into())
            .spawn(move || accept_loop(listener, tx, outbox_capacity, keep_running))?
    };
    let sim_thread = {
        let keep_running = keep_running.clone();
        let interval = config.tick_interval;
        thread::Builder::new()
            .name("delvers-sim".into())
            .spawn(move || run_sim(session, interval, keep_running))?
    };

    info!(%addr, "server listening");
    Ok((
        ServerHandle {
            keep_running,
            threads: vec![listener_thread, sim_thread],
        },
        addr,
    ))
}

fn accept_loop(
    listener: TcpListener,
    tx: SyncSender<Inbound>,
    outbox_capacity: usize,
    keep_running: Arc<AtomicBool>,
) -> Result<(), NetError> {
    let mut next_player = 1u32;
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let player = PlayerId(next_player);
                next_player += 1;
                if let Err(e) = attach(stream, player, &tx, outbox_capacity) {
                    warn!(%player, %peer, error = %e, "could not set up connection");
                    continue;
                }
                info!(%player, %peer, "accepted connection");
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(20));
            }
            Err(e) => {
                error!(error = %e, "accept failed");
                return Err(e.into());
            }
        }
    }
    Ok(())
}

fn attach(
    stream: std::net::TcpStream,
    player: PlayerId,
    tx: &SyncSender<Inbound>,
    outbox_capacity: usize,
) -> Result<(), NetError> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    let write_half = stream.try_clone()?;
    let (outbox, outbox_rx) = sync_channel(outbox_capacity);
    spawn_writer(format!("delvers-writer-{}", player.0), write_half, outbox_rx)?;
    tx.send(Inbound::Connected { player, outbox })
        .map_err(|_| NetError::MailboxClosed)?;
    spawn_reader(
        format!("delvers-reader-{}", player.0),
        stream,
        tx.clone(),
        move |message, raw| Inbound::Message {
            player,
            message,
            raw,
        },
        Some(Inbound::Disconnected { player }),
    )?;
    Ok(())
}

fn run_sim(mut session: Session, interval: Duration, keep_running: Arc<AtomicBool>) -> Result<(), NetError> {
    let mut deadline = Instant::now();
    while keep_running.load(Ordering::SeqCst) {
        if let Err(e) = session.tick() {
            error!(error = %e, "sim loop stopped");
            keep_running.store(false, Ordering::SeqCst);
            return Err(e);
        }
        deadline += interval;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            // Fell behind; do not try to catch up with a burst of ticks.
            deadline = now;
        }
    }
    info!(ticks = session.sim().tick_count(), "sim loop finished");
    Ok(())
}
