// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for placement

use focalplate_model::{InputError, ModuleFailure, ModuleIndex};
use thiserror::Error;

/// Placement result type
pub type Result<T> = std::result::Result<T, Error>;

/// Placement errors
///
/// Everything except [`Error::Module`] is fatal and stops the pipeline before
/// any intent is emitted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Survey input could not be read
    #[error(transparent)]
    Input(#[from] InputError),

    /// Template parameters rejected
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Shell context parameters rejected
    #[error("Invalid shell context: {0}")]
    InvalidShell(String),

    /// Per-module failure
    #[error(transparent)]
    Module(ModuleFailure),

    /// No module produced a frame
    #[error("No module has a valid frame; nothing to place")]
    NoReferenceModule,

    /// The reference module's own templates cannot seed alignment
    #[error("Reference module {index} cannot be aligned: {message}")]
    ReferenceAlignment { index: ModuleIndex, message: String },

    /// The reference module itself cannot be placed; every other module is
    /// sketched on its plane
    #[error("Reference module cannot be placed: {0}")]
    ReferenceModule(ModuleFailure),

    /// A module was emitted before the reference module
    #[error("Module {index} emitted before the reference module")]
    ReferenceNotEmitted { index: ModuleIndex },
}

impl Error {
    /// Create an invalid template error
    pub fn invalid_template(msg: impl Into<String>) -> Self {
        Error::InvalidTemplate(msg.into())
    }

    /// Create an invalid shell error
    pub fn invalid_shell(msg: impl Into<String>) -> Self {
        Error::InvalidShell(msg.into())
    }

    /// Create a reference alignment error
    pub fn reference_alignment(index: ModuleIndex, msg: impl Into<String>) -> Self {
        Error::ReferenceAlignment {
            index,
            message: msg.into(),
        }
    }

    /// Whether the batch must stop
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Module(_))
    }

    /// Module the error belongs to, if any
    pub fn module_index(&self) -> Option<ModuleIndex> {
        match self {
            Error::Module(failure) => Some(failure.index()),
            Error::ReferenceModule(failure) => Some(failure.index()),
            Error::ReferenceAlignment { index, .. } | Error::ReferenceNotEmitted { index } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

impl From<ModuleFailure> for Error {
    fn from(failure: ModuleFailure) -> Self {
        Error::Module(failure)
    }
}
