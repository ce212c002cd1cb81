//! Room lifecycle and message relay

pub mod registry;

pub use registry::{RoomRegistry, RoomStatus};
