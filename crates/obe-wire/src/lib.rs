#![deny(missing_docs)]
//! Wire format shared with clients written in any language.
//!
//! Every message is compact JSON text preceded by its byte length written as
//! exactly ten zero padded decimal digits, e.g. `0000000004"OK"`.

mod frame;
mod transport;

pub use frame::{
    decode_frame, decode_header, decode_payload, encode_frame, encode_header, HEADER_LEN,
    MAX_PAYLOAD_LEN,
};
pub use transport::{Client, FramedTransport, Listener, Transport};
