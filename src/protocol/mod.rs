//! Chat wire protocol
//!
//! Handles frame encoding/decoding and roster message composition.

pub mod frame;
pub mod roster;

pub use frame::{decode, encode, fits_frame, write_frame, MAX_PAYLOAD_LEN};
pub use roster::{compose_roster, is_roster, parse_roster, ROSTER_PREFIX};
