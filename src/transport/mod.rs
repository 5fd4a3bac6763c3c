pub mod handshake;
pub mod session;
pub mod ws_session;
