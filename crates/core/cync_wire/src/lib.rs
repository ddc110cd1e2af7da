//! The Cync LAN wire protocol: outer framing, inner-struct checksum,
//! packet taxonomy and control-packet encode/decode.

mod ack;
mod control;
mod effects;
mod error;
mod firmware;
mod frame;
mod inner;
mod mesh;
mod packet;
mod status;

pub use ack::*;
pub use control::*;
pub use effects::*;
pub use error::*;
pub use firmware::*;
pub use frame::*;
pub use inner::*;
pub use mesh::*;
pub use packet::*;
pub use status::*;
