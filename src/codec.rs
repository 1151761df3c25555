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

//! The component framing codec.
//!
//! Decomposes binary buffers and strings into ordered component sequences
//! and re-serializes component sequences back, given a [`Registry`] that
//! supplies the per-protocol descriptors.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    component::Component,
    errors::{InvalidMultiaddrError, Result},
    registry::{Registry, Size},
    varint,
};

/// Decodes a binary buffer into its ordered component sequence.
///
/// The wire format is a concatenation of `varint(code) [varint(length)]
/// value-bytes` frames with no padding and no overall length prefix. A
/// component that would run past the end of the buffer fails with a
/// truncation error.
pub fn bytes_to_components(registry: &Registry, bytes: &[u8]) -> Result<Vec<Component>> {
    let mut components = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let (code, code_length) =
            varint::decode(&bytes[offset..]).map_err(InvalidMultiaddrError::from)?;
        let codec = registry.get_protocol(code)?;

        let value_length = match codec.size {
            Size::Fixed(bits) => bits as usize / 8,
            Size::Variable => {
                let (length, length_length) = varint::decode(&bytes[offset + code_length..])
                    .map_err(InvalidMultiaddrError::from)?;

                usize::try_from(length)
                    .ok()
                    .and_then(|length| length.checked_add(length_length))
                    .ok_or(InvalidMultiaddrError::InconsistentLength)?
            }
        };

        let end = offset
            .checked_add(code_length)
            .and_then(|end| end.checked_add(value_length))
            .filter(|end| *end <= bytes.len())
            .ok_or(InvalidMultiaddrError::Truncated)?;

        let frame = Bytes::copy_from_slice(&bytes[offset..end]);
        components.push(Component::from_wire(codec, frame, code_length)?);

        offset = end;
    }

    Ok(components)
}

/// Serializes a component sequence to its binary form.
pub fn components_to_bytes(components: &[Component]) -> Bytes {
    let length = components.iter().map(|c| c.as_bytes().len()).sum();
    let mut bytes = BytesMut::with_capacity(length);

    for component in components {
        bytes.put_slice(component.as_bytes());
    }

    bytes.freeze()
}

/// Decodes a string multiaddr into its ordered component sequence.
///
/// The input must start with `/`; runs of repeated `/` and any trailing `/`
/// are stripped. Each token names a protocol; value-bearing protocols
/// consume the following token, and path protocols greedily consume the
/// remainder of the string.
pub fn string_to_components(registry: &Registry, input: &str) -> Result<Vec<Component>> {
    if !input.starts_with('/') {
        return Err(InvalidMultiaddrError::MissingLeadingSlash.into());
    }

    let tokens: Vec<&str> = input.split('/').filter(|token| !token.is_empty()).collect();
    let mut components = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let codec = registry.get_protocol(tokens[i])?;
        i += 1;

        if !codec.size.has_value() {
            components.push(Component::from_value(codec, None)?);
            continue;
        }

        if i >= tokens.len() {
            return Err(InvalidMultiaddrError::MissingValue(codec.name.clone()).into());
        }

        let token = if codec.path {
            tokens[i..].join("/")
        } else {
            tokens[i].to_string()
        };

        let value = match codec.string_to_value {
            Some(string_to_value) => string_to_value(&token)?,
            None => token.clone(),
        };
        components.push(Component::from_value(codec, Some(&value))?);

        if codec.path {
            break;
        }
        i += 1;
    }

    Ok(components)
}

/// Serializes a component sequence to its string form.
pub fn components_to_string(components: &[Component]) -> String {
    if components.is_empty() {
        return "/".to_string();
    }

    components.iter().map(Component::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Error, UnknownProtocolError};

    fn registry() -> Registry {
        Registry::with_default_protocols()
    }

    fn parse(input: &str) -> Result<Vec<Component>> {
        string_to_components(&registry(), input)
    }

    mod strings {
        use super::*;

        #[test]
        fn parses_alternating_protocols_and_values() {
            let components = parse("/ip4/127.0.0.1/udp/1234").unwrap();

            assert_eq!(components.len(), 2);
            assert_eq!(components[0].name(), "ip4");
            assert_eq!(components[0].value(), Some("127.0.0.1"));
            assert_eq!(components[1].name(), "udp");
            assert_eq!(components[1].value(), Some("1234"));
        }

        #[test]
        fn requires_leading_slash() {
            assert_eq!(
                parse("ip4/127.0.0.1").unwrap_err(),
                Error::from(InvalidMultiaddrError::MissingLeadingSlash)
            );
            assert_eq!(
                parse("").unwrap_err(),
                Error::from(InvalidMultiaddrError::MissingLeadingSlash)
            );
        }

        #[test]
        fn root_is_the_empty_sequence() {
            assert!(parse("/").unwrap().is_empty());
        }

        #[test]
        fn strips_repeated_and_trailing_slashes() {
            let components = parse("//ip4//127.0.0.1/tcp/80/").unwrap();

            assert_eq!(components_to_string(&components), "/ip4/127.0.0.1/tcp/80");
        }

        #[test]
        fn unknown_protocol_name_fails() {
            assert_eq!(
                parse("/ip4/127.0.0.1/bogus").unwrap_err(),
                Error::UnknownProtocol(UnknownProtocolError::Name("bogus".to_string()))
            );
        }

        #[test]
        fn trailing_value_bearing_protocol_fails() {
            assert_eq!(
                parse("/ip4/127.0.0.1/tcp").unwrap_err(),
                Error::from(InvalidMultiaddrError::MissingValue("tcp".to_string()))
            );
        }

        #[test]
        fn alias_normalizes_to_canonical_name() {
            let mut multihash = vec![0x12, 0x20];
            multihash.extend_from_slice(&[0xaa; 32]);
            let id = multibase::Base::Base58Btc.encode(&multihash);

            let components = parse(&format!("/ip4/1.2.3.4/tcp/80/ipfs/{id}")).unwrap();
            assert_eq!(components[2].name(), "p2p");
            assert_eq!(components_to_string(&components), format!("/ip4/1.2.3.4/tcp/80/p2p/{id}"));
        }

        #[test]
        fn path_protocol_consumes_remainder() {
            let components = parse("/unix/var/run/socket").unwrap();

            assert_eq!(components.len(), 1);
            assert_eq!(components[0].value(), Some("var/run/socket"));
            assert_eq!(components_to_string(&components), "/unix/var%2Frun%2Fsocket");
        }

        #[test]
        fn path_protocol_swallows_protocol_like_tokens() {
            let components = parse("/ip4/1.2.3.4/unix/etc/tcp/80").unwrap();

            assert_eq!(components.len(), 2);
            assert_eq!(components[1].name(), "unix");
            assert_eq!(components[1].value(), Some("etc/tcp/80"));
        }

        #[test]
        fn zero_size_protocols_chain() {
            let components = parse("/tls/ws/http").unwrap();

            assert_eq!(components.len(), 3);
            assert!(components.iter().all(|c| c.value().is_none()));
        }
    }

    mod bytes {
        use super::*;

        #[test]
        fn decodes_fixed_size_components() {
            let encoded = [0x04, 0x7f, 0x00, 0x00, 0x01, 0x91, 0x02, 0x04, 0xd2];
            let components = bytes_to_components(&registry(), &encoded).unwrap();

            assert_eq!(components.len(), 2);
            assert_eq!(components[0].as_str(), "/ip4/127.0.0.1");
            assert_eq!(components[1].as_str(), "/udp/1234");
            assert_eq!(components_to_bytes(&components).as_ref(), encoded);
        }

        #[test]
        fn string_and_bytes_forms_agree() {
            let components = parse("/dns4/example.com/tcp/443/wss").unwrap();
            let encoded = components_to_bytes(&components);

            let decoded = bytes_to_components(&registry(), &encoded).unwrap();
            assert_eq!(decoded, components);
        }

        #[test]
        fn unknown_code_fails() {
            // Varint 0x8f 0x60 encodes code 12303, which is unassigned.
            let err = bytes_to_components(&registry(), &[0x8f, 0x60]).unwrap_err();
            assert!(matches!(err, Error::UnknownProtocol(_)));
        }

        #[test]
        fn truncated_fixed_value_fails() {
            // ip4 with only three value bytes.
            let err = bytes_to_components(&registry(), &[0x04, 0x7f, 0x00, 0x00]).unwrap_err();
            assert_eq!(err, Error::from(InvalidMultiaddrError::Truncated));
        }

        #[test]
        fn truncated_variable_value_fails() {
            // dns4 declaring 11 payload bytes but providing 3.
            let err = bytes_to_components(&registry(), &[0x36, 11, b'e', b'x', b'a']).unwrap_err();
            assert_eq!(err, Error::from(InvalidMultiaddrError::Truncated));
        }

        #[test]
        fn empty_buffer_is_the_empty_sequence() {
            assert!(bytes_to_components(&registry(), &[]).unwrap().is_empty());
        }
    }

    mod custom_protocols {
        use super::*;
        use crate::{
            convert,
            registry::{ProtocolCodec, Size},
        };

        #[test]
        fn registered_protocol_round_trips_and_unregisters() {
            let mut registry = Registry::with_default_protocols();
            registry.add_protocol(ProtocolCodec {
                value_to_bytes: Some(convert::text_to_bytes),
                bytes_to_value: Some(convert::text_to_string),
                ..ProtocolCodec::new(2049, "custom", Size::Variable)
            });

            let components = string_to_components(&registry, "/custom/hello/tcp/80").unwrap();
            let encoded = components_to_bytes(&components);

            let decoded = bytes_to_components(&registry, &encoded).unwrap();
            assert_eq!(decoded, components);
            assert_eq!(components_to_string(&decoded), "/custom/hello/tcp/80");

            registry.remove_protocol(2049);
            assert!(matches!(
                string_to_components(&registry, "/custom/hello").unwrap_err(),
                Error::UnknownProtocol(_)
            ));
            assert!(matches!(
                bytes_to_components(&registry, &encoded).unwrap_err(),
                Error::UnknownProtocol(_)
            ));
        }
    }
}
