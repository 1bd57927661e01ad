//! Common test infrastructure
//!
//! Spins up local stand-ins for the gazette website and the Brevo API and
//! wires a real pipeline against them. Tests should only import from this
//! module, not from internal submodules.

#![allow(dead_code)]

mod constants;
mod fixtures;
mod mock_servers;

pub use constants::*;
pub use fixtures::TestEnv;
#[allow(unused_imports)]
pub use mock_servers::{MockBrevo, MockGazette};
