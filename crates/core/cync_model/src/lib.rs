//! The device/group data model (§3): `Device`, `Group`, the global
//! `Registry` that owns both, and the per-device control-byte counter used
//! to mint outbound message IDs.

mod device;
mod error;
mod group;
mod registry;

pub use device::*;
pub use error::*;
pub use group::*;
pub use registry::*;

pub type DeviceId = u16;
pub type GroupId = u16;
pub type HomeId = String;
