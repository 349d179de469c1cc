use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Nothing to do: pass one of --band, --angle or --footprint")]
    NoAction,

    #[error("{kind} is not available for tile {tile}")]
    AngleUnavailable { kind: String, tile: String },

    #[error("MSI reader error: {0}")]
    Reader(#[from] msipro::Error),
}
