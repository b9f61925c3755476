//! # Thrum Core
//!
//! Core runtime library for the Thrum world simulation.
//!
//! This crate provides the foundations shared by the simulation subsystems:
//! - **Entity identity**: stable entity IDs with generation counters
//! - **Time**: monotonic simulation timestamps, a frame clock, and cadence
//!   timers for maintenance work that should not run every frame

pub mod entity;
pub mod time;

pub use entity::EntityId;
pub use time::{FrameClock, SimTime, TickCadence};
