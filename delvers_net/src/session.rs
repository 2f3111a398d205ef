// Server session: the state owned by the server's simulation thread.
//
// `Session` holds the authoritative `Simulation`, the set of connected peers
// (each with its bounded outbox), and the incoming mailbox. Everything reaches
// it as an `Inbound` through that one mailbox: connections, client messages,
// disconnects, and the server's own messages (`Local`). The sim thread is the
// only consumer and the only code that touches any of this, so there is no
// locking.
//
// Per tick (`tick`):
//   1. `sim.tick()`.
//   2. Post whatever the sim wants sent (enemy turns) into the mailbox.
//   3. Retry the backlog of local messages that found the mailbox full.
//   4. Drain the mailbox without blocking, handling each entry.
//
// Join protocol, on a client's `new_player` request:
//   1. send it the whole journal as one message;
//   2. send it a private `SetPlayer(K)`;
//   3. add it to the broadcast set;
//   4. post `NewPlayer(K, start + (K, 3))`, which is then broadcast to all.
// Everything admitted after step 1 reaches the joiner by broadcast, so journal
// plus broadcasts is the complete stream.
//
// Client messages may only carry the sender's own `PlayerAction` (acting
// with the sender's own creature), `PlayerReady`, and `ResetPlayerActions`.
// Anything else is dropped with a warning. Accepted messages are admitted and their original bytes are
// broadcast verbatim to every joined peer.
//
// Outbox policy: a peer whose outbox is full is disconnected on the spot and
// a `PlayerLeft` is posted. Dropping its outbox sender ends its writer
// thread, which closes the socket.
//
// See also: `server.rs` for the threads that feed the mailbox,
// `connection.rs` for the per-connection I/O.

use std::collections::{BTreeMap, VecDeque};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError};

use delvers_protocol::{NetworkMessage, PlayerId};
use delvers_sim::codec::{decode_events, message_from_events};
use delvers_sim::{Event, GridPoint, Simulation, WorldSnapshot};
use tracing::{debug, info, warn};

use crate::connection::{Frame, encode_frame};
use crate::error::NetError;

/// Everything the sim thread consumes.
pub enum Inbound {
    Connected {
        player: PlayerId,
        outbox: SyncSender<Frame>,
    },
    Message {
        player: PlayerId,
        message: NetworkMessage,
        raw: Frame,
    },
    Disconnected {
        player: PlayerId,
    },
    /// Events originating on the server itself.
    Local {
        events: Vec<Event>,
    },
}

struct Peer {
    outbox: SyncSender<Frame>,
    joined: bool,
}

/// The mailbox plus the server's own handle into it.
pub struct Mailbox {
    rx: Receiver<Inbound>,
    tx: SyncSender<Inbound>,
    backlog: VecDeque<Inbound>,
    capacity: usize,
}

impl Mailbox {
    pub fn new(rx: Receiver<Inbound>, tx: SyncSender<Inbound>, capacity: usize) -> Self {
        Self {
            rx,
            tx,
            backlog: VecDeque::new(),
            capacity,
        }
    }

    /// Queue a server-originated entry without blocking. A full mailbox
    /// parks it in the backlog, which keeps its order ahead of later posts.
    fn post(&mut self, inbound: Inbound) {
        if !self.backlog.is_empty() {
            self.backlog.push_back(inbound);
            return;
        }
        match self.tx.try_send(inbound) {
            Ok(()) => {}
            Err(TrySendError::Full(inbound)) => {
                debug!("mailbox full, parking local message");
                self.backlog.push_back(inbound);
            }
            Err(TrySendError::Disconnected(_)) => warn!("mailbox receiver gone"),
        }
    }

    fn retry_backlog(&mut self) {
        while let Some(inbound) = self.backlog.pop_front() {
            match self.tx.try_send(inbound) {
                Ok(()) => {}
                Err(TrySendError::Full(inbound)) => {
                    self.backlog.push_front(inbound);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }
}

pub struct Session {
    sim: Simulation,
    peers: BTreeMap<PlayerId, Peer>,
    mailbox: Mailbox,
    /// Spawn origin for joining players (the snapshot's start cell).
    start: GridPoint,
}

impl Session {
    pub fn new(sim: Simulation, mailbox: Mailbox, start: GridPoint) -> Self {
        Self {
            sim,
            peers: BTreeMap::new(),
            mailbox,
            start,
        }
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn joined_players(&self) -> Vec<PlayerId> {
        self.peers
            .iter()
            .filter(|(_, p)| p.joined)
            .map(|(id, _)| *id)
            .collect()
    }

    fn spawn_for(&self, player: PlayerId) -> GridPoint {
        self.start.offset(player.0 as i32, 3)
    }

    /// Post the opening event: the map. The server itself never plays, so
    /// only connected clients ever sit in the turn roster.
    pub fn open(&mut self, snapshot: WorldSnapshot) {
        self.mailbox.post(Inbound::Local {
            events: vec![Event::game_start(snapshot)],
        });
    }

    /// One server tick. Fails only if the mailbox can no longer be read.
    pub fn tick(&mut self) -> Result<(), NetError> {
        self.sim.tick();
        self.sim.drain_notifications();

        let outbound = self.sim.take_outbound();
        if !outbound.is_empty() {
            self.mailbox.post(Inbound::Local { events: outbound });
        }
        self.mailbox.retry_backlog();

        for _ in 0..self.mailbox.capacity {
            match self.mailbox.rx.try_recv() {
                Ok(inbound) => self.handle(inbound),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(NetError::MailboxClosed),
            }
        }
        Ok(())
    }

    pub fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Connected { player, outbox } => {
                info!(%player, "client connected");
                self.peers.insert(
                    player,
                    Peer {
                        outbox,
                        joined: false,
                    },
                );
            }
            Inbound::Message {
                player,
                message,
                raw,
            } => {
                if message.new_player {
                    self.join(player);
                } else {
                    self.relay(player, &message, raw);
                }
            }
            Inbound::Disconnected { player } => {
                if let Some(peer) = self.peers.remove(&player) {
                    info!(%player, "client disconnected");
                    if peer.joined {
                        self.mailbox.post(Inbound::Local {
                            events: vec![Event::player_left(player)],
                        });
                    }
                }
            }
            Inbound::Local { events } => {
                let frame = message_from_events(PlayerId::HOST, &events)
                    .map_err(NetError::from)
                    .and_then(|m| encode_frame(&m).map_err(NetError::from));
                match frame {
                    Ok(frame) => {
                        self.sim.admit(events);
                        self.broadcast(&frame);
                    }
                    Err(e) => warn!(error = %e, "could not encode local events"),
                }
            }
        }
    }

    fn join(&mut self, player: PlayerId) {
        let Some(peer) = self.peers.get(&player) else {
            return;
        };
        if peer.joined {
            warn!(%player, "repeated join request ignored");
            return;
        }
        let replay = message_from_events(PlayerId::HOST, self.sim.journal())
            .map_err(NetError::from)
            .and_then(|m| encode_frame(&m).map_err(NetError::from));
        let assign = message_from_events(PlayerId::HOST, &[Event::set_player(player)])
            .map_err(NetError::from)
            .and_then(|m| encode_frame(&m).map_err(NetError::from));
        let (replay, assign) = match (replay, assign) {
            (Ok(r), Ok(a)) => (r, a),
            (Err(e), _) | (_, Err(e)) => {
                warn!(%player, error = %e, "could not encode join replay");
                return;
            }
        };

        if !self.send_to(player, replay) || !self.send_to(player, assign) {
            return;
        }
        if let Some(peer) = self.peers.get_mut(&player) {
            peer.joined = true;
        }
        info!(%player, journal = self.sim.journal().len(), "client joined");
        let spawn = self.spawn_for(player);
        self.mailbox.post(Inbound::Local {
            events: vec![Event::new_player(player, spawn)],
        });
    }

    fn relay(&mut self, player: PlayerId, message: &NetworkMessage, raw: Frame) {
        if !self.peers.get(&player).is_some_and(|p| p.joined) {
            warn!(%player, "message before join ignored");
            return;
        }
        let events = match decode_events(&message.records) {
            Ok(events) => events,
            Err(e) => {
                warn!(%player, error = %e, "undecodable message dropped");
                return;
            }
        };
        if let Some(bad) = events.iter().find(|e| !client_may_send(&self.sim, player, e)) {
            warn!(%player, event = ?bad, "client sent an event it may not send");
            return;
        }
        debug!(%player, events = events.len(), "relaying client message");
        self.sim.admit(events);
        self.broadcast(&raw);
    }

    /// Queue a frame for one peer. A full outbox disconnects it.
    fn send_to(&mut self, player: PlayerId, frame: Frame) -> bool {
        let Some(peer) = self.peers.get(&player) else {
            return false;
        };
        match peer.outbox.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(%player, "outbox full, disconnecting slow client");
                self.drop_peer(player);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.drop_peer(player);
                false
            }
        }
    }

    fn broadcast(&mut self, frame: &Frame) {
        for player in self.joined_players() {
            self.send_to(player, frame.clone());
        }
    }

    fn drop_peer(&mut self, player: PlayerId) {
        if let Some(peer) = self.peers.remove(&player) {
            if peer.joined {
                self.mailbox.post(Inbound::Local {
                    events: vec![Event::player_left(player)],
                });
            }
        }
    }
}

/// Events a client may put on the wire for itself.
fn client_may_send(sim: &Simulation, player: PlayerId, event: &Event) -> bool {
    match event {
        Event::PlayerAction(e) => {
            e.player == player && sim.world().player_creature(player) == Some(e.action.actor())
        }
        Event::PlayerReady(e) => e.player == player,
        Event::ResetPlayerActions(e) => e.player == player,
        _ => false,
    }
}
