//! JSON wire protocol shared by the broker and its clients.
//!
//! - [`messages`] – typed inbound ([`ClientMessage`]) and outbound
//!   ([`ServerMessage`]) envelopes.
//! - [`codec`] – turning text frames into messages and back.

pub mod codec;
pub mod messages;

pub use codec::{decode_client_message, encode_server_message, ProtocolError};
pub use messages::{ClientMessage, ServerMessage};
