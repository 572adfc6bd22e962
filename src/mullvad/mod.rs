//! Mullvad-specific implementations.
//!
//! This module provides the concrete [`VpnClient`](crate::traits::VpnClient)
//! backend and the parsers for the client's text output.
//!
//! Nothing outside this module should spawn `mullvad` directly.

pub mod cli;
pub mod parse;
