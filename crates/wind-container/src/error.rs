//! Error types for container access.

use std::path::PathBuf;

use thiserror::Error;

use crate::ContainerKind;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Error types for opening and reading containers.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable, dataset or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// The file exists but is not a container of the requested kind
    #[error("{} cannot be opened as {requested}", path.display())]
    WrongKind {
        path: PathBuf,
        requested: ContainerKind,
    },

    /// Error reported by libnetcdf
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Error reported by the HDF5 library
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl ContainerError {
    /// Create a MissingData error.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingData(what.into())
    }

    /// Create an InvalidFormat error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Whether this error means the requested item does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingData(_))
    }
}
