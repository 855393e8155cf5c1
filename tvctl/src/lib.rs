//! # tvctl: command-line remote control
//!
//! Loads a TOML config, opens a `tvctl_core::Remote` and presses the
//! keys given on the command line. A token issued by a websocket TV
//! is written back to the same config file.

pub mod config;
pub mod store;
