//! Status message codec.
//!
//! Converts between the binary `F7` status display message and the text the
//! host sends for it, keeps the primary and alternate messages the bus
//! shows, and renders received keypad frames as host listings.
//!
//! - [`status`]: the 48 byte message and its editable draft
//! - [`command`]: `F7 z=.. 1=..` command text
//! - [`listing`]: `KEYS_16[05] 0x50 ..` frame listings
//! - [`slots`]: primary / alternate message slots

pub mod command;
pub mod listing;
pub mod slots;
pub mod status;

pub use command::{StatusTarget, decode_command, encode_command, split_header};
pub use listing::{Listing, encode_listing};
pub use slots::StatusSlots;
pub use status::{StatusDraft, StatusFlag, StatusMessage};
