// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors raised when constructing or transforming multiaddrs.

use crate::varint::VarintError;

/// The protocol code or name was not present in the registry.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum UnknownProtocolError {
    /// No protocol is registered under this code.
    #[error("no protocol with code: {0}")]
    Code(u64),
    /// No protocol is registered under this name or alias.
    #[error("no protocol with name: {0}")]
    Name(String),
}

/// A string or byte input could not be decomposed into components.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InvalidMultiaddrError {
    /// String multiaddrs always begin with a `/`.
    #[error("string multiaddr must start with '/'")]
    MissingLeadingSlash,
    /// A value-bearing protocol appeared with no value token after it.
    #[error("component {0} was missing its value")]
    MissingValue(String),
    /// A value was supplied for a protocol whose size is zero.
    #[error("component {0} does not take a value")]
    UnexpectedValue(String),
    /// The byte buffer ended in the middle of a component.
    #[error("multiaddr bytes ended mid-component")]
    Truncated,
    /// A declared value length disagrees with the encoded value.
    #[error("declared value length is inconsistent with the encoded value")]
    InconsistentLength,
    /// A fixed-size value had the wrong byte length.
    #[error("value for {protocol} was {actual} bytes, expected {expected}")]
    IncorrectValueLength {
        /// Name of the offending protocol.
        protocol: String,
        /// The byte length the protocol declares.
        expected: usize,
        /// The byte length that was encountered.
        actual: usize,
    },
    /// A value could not be converted to or from its encoded form.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// A decoded value was not valid UTF-8.
    #[error("value was not valid UTF-8")]
    InvalidUtf8,
    /// A path value contained a malformed percent escape.
    #[error("invalid percent escape in value")]
    InvalidEscape,
    /// A protocol code or length varint was malformed.
    #[error(transparent)]
    Varint(#[from] VarintError),
}

/// A protocol's validator rejected an otherwise well-formed value.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// The caller supplied a structurally wrong argument.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidParametersError(pub String);

/// Any error raised while constructing or transforming a multiaddr.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// See [`UnknownProtocolError`].
    #[error(transparent)]
    UnknownProtocol(#[from] UnknownProtocolError),
    /// See [`InvalidMultiaddrError`].
    #[error(transparent)]
    InvalidMultiaddr(#[from] InvalidMultiaddrError),
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`InvalidParametersError`].
    #[error(transparent)]
    InvalidParameters(#[from] InvalidParametersError),
}

impl From<VarintError> for Error {
    fn from(value: VarintError) -> Self {
        Self::InvalidMultiaddr(value.into())
    }
}

/// Result type for multiaddr operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
