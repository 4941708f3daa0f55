#![doc = include_str!("RUSTDOC.md")]

pub mod app;
pub mod auth;
pub mod firestore;
pub mod util;
