use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("matrix control loop has stopped")]
    Closed,

    #[error("failed to spawn the control loop thread")]
    Spawn(#[source] io::Error),
}
