use crate::DeviceId;
use crate::GroupId;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no device registered with id {0}")]
    UnknownDevice(DeviceId),
    #[error("no group registered with id {0}")]
    UnknownGroup(GroupId),
    #[error("device id {0} is already registered")]
    DuplicateDevice(DeviceId),
    #[error("group id {0} is already registered")]
    DuplicateGroup(GroupId),
}
