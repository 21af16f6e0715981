#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod config;
pub mod error;
pub mod format;
pub mod log;
pub mod manager;
pub mod session;
pub mod socketio;
pub mod storage;
pub mod transport;
pub mod types;
pub mod ws;

use crate::error::Error;

pub use crate::manager::ConnectionManager;

pub type Result<T> = std::result::Result<T, Error>;
