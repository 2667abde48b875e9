//! Socket pump tasks: inbound dispatch, outbound serialization with
//! keepalive.

pub(crate) mod read;
pub(crate) mod write;
