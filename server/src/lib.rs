//! # Game Server Library
//!
//! This library provides the authoritative server for a session-based
//! real-time strategy game. Players meet in rooms, issue commands (move,
//! build, train, attack, research) and the server resolves one shared world
//! per room at a fixed rate, streaming compact state changes back to every
//! participant.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Each started room owns a [`world::World`]. Player intents are validated
//! against it and either applied in full or rejected without side effects.
//! Movement, gathering, combat, production and the resource trickle advance
//! on every tick.
//!
//! ### Room Management
//! Handles the complete lifecycle of a room:
//! - Joining, faction selection and ready state in the lobby
//! - A single start transition once every player is ready
//! - Disconnects with a reconnect grace window and token-checked reconnects
//! - Round trip time tracking through ping / pong
//!
//! ### State Replication
//! After every tick a room diffs its world against the last snapshot it
//! broadcast and sends only what changed. The first update after start, and
//! the update a reconnecting player receives, carry the full state.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One task owns the dispatcher, every room and the tick scheduler, and
//! processes network events and ticks sequentially in one `select!` loop.
//! Connection tasks only move frames between their socket and that loop.
//!
//! ### WebSocket Transport
//! Clients speak JSON text frames over WebSocket. Every frame is decoded
//! into a typed message and bounds checked before it can reach a room.
//!
//! ## Module Organization
//!
//! - `network`: TCP accept loop, WebSocket connection tasks and the main loop
//! - `dispatcher` / `validate`: frame decoding and routing to rooms
//! - `room` / `rooms` / `player` / `connection`: room state and membership
//! - `scheduler`: fixed-rate ticking with per-room fault isolation
//! - `world` / `simulation` / `entity` / `map` / `pathfinding` / `combat`:
//!   the world state machine
//! - `delta`: snapshot diffing
//! - `config` / `error` / `utils`: ambient plumbing

pub mod combat;
pub mod config;
pub mod connection;
pub mod delta;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod map;
pub mod network;
pub mod pathfinding;
pub mod player;
pub mod room;
pub mod rooms;
pub mod scheduler;
pub mod simulation;
pub mod utils;
pub mod validate;
pub mod world;
