#![doc = include_str!("../README.md")]

mod config;
mod digest;
mod error;
mod gate;
mod handle;
mod reply;
mod router;
pub mod service;
mod stats;
mod store;
mod worker;

pub use crate::config::*;
pub use crate::digest::*;
pub use crate::error::*;
pub use crate::gate::*;
pub use crate::handle::*;
pub use crate::reply::*;
pub use crate::router::*;
pub use crate::service::{Call, Form, Service};
pub use crate::stats::*;
pub use crate::store::*;
pub use crate::worker::*;
