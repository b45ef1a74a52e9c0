//! Process-wide fixed-rate tick driving every started room.

use crate::config::GameConfig;
use crate::room::Room;
use crate::rooms::RoomRegistry;
use log::{error, info};
use shared::ServerMessage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub struct TickScheduler {
    period: Duration,
    max_delta: Duration,
    interval: Option<Interval>,
    last_fire: Option<Instant>,
    ticks: u64,
}

impl TickScheduler {
    pub fn new(period: Duration, max_delta: Duration) -> Self {
        Self {
            period,
            max_delta,
            interval: None,
            last_fire: None,
            ticks: 0,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.tick_duration(),
            Duration::from_secs_f32(config.max_delta_secs.max(0.0)),
        )
    }

    /// Starts ticking. Calling it again replaces the running timer.
    pub fn start(&mut self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if self.interval.replace(interval).is_some() {
            info!("Tick timer restarted");
        } else {
            info!("Tick timer started at {:?} per tick", self.period);
        }
        self.last_fire = Some(Instant::now());
    }

    /// Stops ticking. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            info!("Tick timer stopped after {} ticks", self.ticks);
        }
        self.last_fire = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Waits for the next tick and returns the seconds elapsed since the
    /// previous one, capped at the configured maximum. Never resolves while
    /// stopped.
    pub async fn next_tick(&mut self) -> f32 {
        match self.interval.as_mut() {
            Some(interval) => {
                let now = interval.tick().await;
                let elapsed = self
                    .last_fire
                    .map(|last| now.saturating_duration_since(last))
                    .unwrap_or(self.period);
                self.last_fire = Some(now);
                capped_delta(elapsed, self.max_delta)
            }
            None => std::future::pending().await,
        }
    }

    /// Advances every started room by `dt`, echoes accepted events and
    /// broadcasts the resulting state change.
    pub fn fire(&mut self, rooms: &mut RoomRegistry, dt: f32) {
        self.service(rooms, |room| tick_room(room, dt));
    }

    /// Runs `step` for every started room. A panic inside one room is logged
    /// and does not stop the others from being serviced.
    fn service<F>(&mut self, rooms: &mut RoomRegistry, mut step: F)
    where
        F: FnMut(&mut Room),
    {
        self.ticks += 1;
        for room in rooms.iter_mut().filter(|room| room.is_started()) {
            let code = room.code().to_string();
            let result = panic::catch_unwind(AssertUnwindSafe(|| step(room)));
            if let Err(cause) = result {
                error!(
                    "Room {} panicked during tick {}: {}",
                    code,
                    self.ticks,
                    panic_message(cause.as_ref())
                );
            }
        }
    }
}

fn tick_room(room: &mut Room, dt: f32) {
    for event in room.advance(dt) {
        room.broadcast(&ServerMessage::GameEvent { event });
    }
    if let Some(changes) = room.compute_delta() {
        room.broadcast(&ServerMessage::StateUpdate {
            tick: room.tick(),
            changes,
        });
    }
}

fn capped_delta(elapsed: Duration, max: Duration) -> f32 {
    elapsed.min(max).as_secs_f32()
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
