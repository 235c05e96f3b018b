use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Why the process could not start or finish a command.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("failed to load configuration")]
    Config,
    #[display("failed to set up the catalog client")]
    Source,
    #[display("failed to open the mods directory")]
    Storage,
    #[display("failed to write output")]
    Output,
    #[display("failed to start the async runtime")]
    Runtime,
}
