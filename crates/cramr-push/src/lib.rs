//! Push channel plumbing: one channel per user (`a<userID>`), fed by the
//! invite flow and drained by the user's connected device.
pub mod connection;
pub mod hub;

pub use hub::PushHub;
