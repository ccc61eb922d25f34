//! Lenscast Gesture Core
//!
//! Turns raw pointer and wheel samples into bounded viewport updates:
//! - **Pinch:** two active pointers scale zoom by the distance ratio
//! - **Pan:** one active pointer drags the crop center
//! - **Wheel:** ctrl/meta + wheel steps zoom by a fixed factor
//!
//! This crate does no I/O and no rendering.
//! Every update is `(previous state, sample) -> new state`.

pub mod controller;

pub use controller::{
    apply, GestureConfig, GestureContext, GestureController, GestureEffect, GestureState,
};
