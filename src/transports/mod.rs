//! Transport implementations

pub mod channel;
pub mod websocket;

pub use channel::{ChannelConnector, ChannelPeer, ChannelPeers, ChannelTransport, JournalEntry};
pub use websocket::{WebSocketConnector, WebSocketTransport};
