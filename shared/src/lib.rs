pub mod error;
pub mod protocol;
pub mod transport;

pub use error::NimError;
pub use protocol::{
    Command, Request, Response, Status, Version, MAX_BODY, NIM_PORT, NIM_VERSION,
};
pub use transport::{FrameReader, Transport};
