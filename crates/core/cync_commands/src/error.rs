#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no device or group registered for this command's target")]
    UnknownTarget,
    #[error(transparent)]
    Wire(#[from] cync_wire::WireError),
    #[error(transparent)]
    Session(#[from] cync_session::SessionError),
}
