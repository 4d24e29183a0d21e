// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Port traits at the seams of the relay.
//!
//! The engine only ever talks to the chat platform through [`ChannelPort`]
//! and to the generation provider through [`ImageGenerator`], so both can
//! be replaced with fakes in tests.

mod channel;
mod provider;

pub use channel::ChannelPort;
pub use provider::ImageGenerator;
