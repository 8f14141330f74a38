//! Data models for the WeCom API.
//!
//! This module contains the response envelope plus request builders and
//! typed response views for departments, users, tags, media and messages.

mod common;
mod department;
mod media;
mod message;
mod tag;
mod user;

pub use common::*;
pub use department::*;
pub use media::*;
pub use message::*;
pub use tag::*;
pub use user::*;
