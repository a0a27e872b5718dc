//! Client for a hosted video-meeting service
//!
//! Talks to the meeting backend over GraphQL/REST, drives the hosted video and
//! chat SDKs through the traits in [`sdk`], and derives the room layout, the
//! dashboards and the post-meeting report from backend data.

pub mod account;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod report;
pub mod room;
pub mod sdk;
pub mod session;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{BackendClient, MeetingBackend};
pub use config::Config;
pub use error::{MeetError, Result};
pub use room::{MeetingRoom, RoomCommand, RoomHandle, RoomServices};
pub use session::{JoinedSession, Role, Session, SessionResolver};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
