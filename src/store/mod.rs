//! Optional best-effort persistence for room records

pub mod rooms;

pub use rooms::RoomStore;
