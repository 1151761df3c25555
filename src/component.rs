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

//! A single typed segment of a multiaddr.

use std::fmt::{self, Display, Formatter};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    convert,
    errors::{Error, InvalidMultiaddrError, Result},
    registry::{ProtocolCodec, ProtocolId, Registry, Size},
    varint,
};

/// One addressable segment: a protocol code with an optional value.
///
/// Components are immutable. Construction runs the protocol's conversion and
/// validation hooks and computes the component's framed encoding
/// (`varint(code) [varint(length)] value-bytes`), so a constructed component
/// is always internally consistent.
#[derive(Debug, Clone)]
pub struct Component {
    code: u64,
    name: String,
    value: Option<String>,
    repr: String,
    bytes: Bytes,
}

/// Components compare by their framed encoding, mirroring address
/// equality; string-level differences such as the multibase prefix chosen
/// on re-encode do not affect equality.
impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Component {}

impl std::hash::Hash for Component {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl Component {
    /// Creates a component for the given protocol and decoded value.
    ///
    /// Zero-size protocols must be given no value, all other protocols
    /// require one.
    pub fn new<'a, I: Into<ProtocolId<'a>>>(
        registry: &Registry,
        protocol: I,
        value: Option<&str>,
    ) -> Result<Self> {
        let codec = registry.get_protocol(protocol)?;
        Self::from_value(codec, value)
    }

    /// Creates a component from a value that has already been through
    /// string-to-value conversion.
    pub(crate) fn from_value(codec: &ProtocolCodec, value: Option<&str>) -> Result<Self> {
        let value = match (codec.size.has_value(), value) {
            (false, None) => None,
            (false, Some(_)) => {
                return Err(InvalidMultiaddrError::UnexpectedValue(codec.name.clone()).into());
            }
            (true, None) => {
                return Err(InvalidMultiaddrError::MissingValue(codec.name.clone()).into());
            }
            (true, Some(value)) => {
                if let Some(validate) = codec.validate {
                    validate(value)?;
                }

                Some(value.to_string())
            }
        };

        let value_bytes = value
            .as_deref()
            .map(|value| encode_value(codec, value))
            .transpose()?;

        let mut frame = BytesMut::new();
        varint::encode_to(codec.code, &mut frame);
        if let Some(value_bytes) = &value_bytes {
            frame.put_slice(value_bytes);
        }

        Ok(Self {
            code: codec.code,
            name: codec.name.clone(),
            repr: render(codec, value.as_deref()),
            value,
            bytes: frame.freeze(),
        })
    }

    /// Creates a component from its framed wire encoding. `value_offset`
    /// marks the end of the code varint within `frame`.
    pub(crate) fn from_wire(
        codec: &ProtocolCodec,
        frame: Bytes,
        value_offset: usize,
    ) -> Result<Self> {
        let raw_value = &frame[value_offset..];

        let value = if codec.size.has_value() {
            Some(decode_value(codec, raw_value)?)
        } else {
            None
        };

        Ok(Self {
            code: codec.code,
            name: codec.name.clone(),
            repr: render(codec, value.as_deref()),
            value,
            bytes: frame,
        })
    }

    /// The numeric protocol code.
    pub fn code(&self) -> u64 {
        self.code
    }

    /// The protocol name at the time the component was constructed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The decoded value, if the protocol carries one.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The framed wire encoding of this component.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The rendered string fragment, including the leading `/`.
    pub fn as_str(&self) -> &str {
        &self.repr
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

/// Runs the protocol's value encoder (or the size-class default) and checks
/// the output against the declared size.
fn encode_value(codec: &ProtocolCodec, value: &str) -> Result<Bytes> {
    let value_bytes = match codec.value_to_bytes {
        Some(value_to_bytes) => value_to_bytes(value)?,
        None => match codec.size {
            Size::Variable => convert::text_to_bytes(value)?,
            Size::Fixed(_) => convert::hex_to_bytes(value)?,
        },
    };

    match codec.size {
        Size::Fixed(_) => {
            let expected = codec.size.data_bytes().unwrap_or_default();
            if value_bytes.len() != expected {
                return Err(InvalidMultiaddrError::IncorrectValueLength {
                    protocol: codec.name.clone(),
                    expected,
                    actual: value_bytes.len(),
                }
                .into());
            }
        }
        Size::Variable => {
            let (length, consumed) = varint::decode(&value_bytes)
                .map_err(|err| Error::from(InvalidMultiaddrError::from(err)))?;
            if (value_bytes.len() - consumed) as u64 != length {
                return Err(InvalidMultiaddrError::InconsistentLength.into());
            }
        }
    }

    Ok(value_bytes)
}

/// Runs the protocol's value decoder, or the size-class default.
fn decode_value(codec: &ProtocolCodec, raw_value: &[u8]) -> Result<String> {
    match codec.bytes_to_value {
        Some(bytes_to_value) => bytes_to_value(raw_value),
        None => match codec.size {
            Size::Variable => convert::text_to_string(raw_value),
            Size::Fixed(_) => Ok(convert::bytes_to_hex(raw_value)),
        },
    }
}

fn render(codec: &ProtocolCodec, value: Option<&str>) -> String {
    match value {
        None => format!("/{}", codec.name),
        Some(value) => {
            let escaped = codec
                .value_to_string
                .map_or_else(|| value.to_string(), |value_to_string| value_to_string(value));

            format!("/{}/{escaped}", codec.name)
        }
    }
}
