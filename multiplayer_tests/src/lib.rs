// Test-only game client for multiplayer integration tests.
//
// Wraps the real `GameClient` (from `delvers_net::game_client`), which owns
// a real client-role `Simulation`, and adds a synchronous, test-friendly API
// for exercising the full pipeline:
// server → join → journal replay → action → barrier → enemy turn → verify.
//
// The only test-specific code here is the blocking wait loops around
// `GameClient::tick()`. All networking and sim logic uses the same code paths
// as the real client binary.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use delvers_net::client::ClientConfig;
use delvers_net::game_client::GameClient;
use delvers_sim::event::Action;
use delvers_sim::{Applied, Event, NetworkId, PlayerId, Simulation};

/// Default timeout for blocking waits.
const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sleep between client ticks while waiting.
const TICK_INTERVAL: Duration = Duration::from_millis(1);

/// A test client wrapping a real `GameClient`.
pub struct TestGameClient {
    client: GameClient,
    /// Everything this replica has finished applying, in order.
    pub applied: Vec<Applied>,
}

impl TestGameClient {
    /// Connect, join, and wait until our creature exists and the replica has
    /// caught up.
    pub fn join(addr: SocketAddr) -> Self {
        let client = GameClient::connect(addr, ClientConfig::default())
            .expect("TestGameClient::join: connect failed");
        let mut this = Self {
            client,
            applied: Vec::new(),
        };
        this.wait_until("own creature spawned", |sim| {
            sim.local_creature().is_some() && sim.is_idle()
        });
        this
    }

    pub fn sim(&self) -> &Simulation {
        self.client.sim()
    }

    pub fn player(&self) -> PlayerId {
        self.client.player().expect("not joined")
    }

    pub fn creature(&self) -> NetworkId {
        self.client.creature().expect("no creature")
    }

    /// One client tick.
    pub fn tick(&mut self) {
        let applied = self.client.tick().expect("client tick failed");
        self.applied.extend(applied);
    }

    /// Tick until `done` holds, panicking after `WAIT_TIMEOUT`.
    pub fn wait_until(&mut self, what: &str, done: impl Fn(&Simulation) -> bool) {
        let start = Instant::now();
        loop {
            self.tick();
            if done(self.client.sim()) {
                return;
            }
            assert!(start.elapsed() < WAIT_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(TICK_INTERVAL);
        }
    }

    /// Tick for roughly `duration` regardless of what happens.
    pub fn run_for(&mut self, duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {
            self.tick();
            thread::sleep(TICK_INTERVAL);
        }
    }

    /// How many times this replica has seen the players' turn handed back.
    pub fn turns_handed_back(&self) -> usize {
        self.applied
            .iter()
            .filter(|a| a.event == Event::turn_change(true))
            .count()
    }

    /// Wait for the next hand-back after `seen` and for the queue to drain.
    pub fn wait_for_next_turn(&mut self, seen: usize) {
        let start = Instant::now();
        loop {
            self.tick();
            if self.turns_handed_back() > seen && self.client.sim().is_idle() {
                return;
            }
            assert!(start.elapsed() < WAIT_TIMEOUT, "timed out waiting for the next players' turn");
            thread::sleep(TICK_INTERVAL);
        }
    }

    pub fn propose(&self, action: Action) -> bool {
        self.client.propose(action).expect("propose failed")
    }

    pub fn ready(&self) {
        self.client.ready().expect("ready failed");
    }

    /// Close the connection.
    pub fn disconnect(self) {
        self.client.disconnect();
    }
}
