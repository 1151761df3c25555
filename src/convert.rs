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

//! Per-protocol value converters.
//!
//! Each converter translates between a protocol's human-readable string form
//! and its canonical value byte string, the unit wrapped by the component
//! framing. For variable-size protocols the byte form carries its own varint
//! length prefix; converters emit that prefix when encoding and verify it
//! against the payload when decoding.

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, Bytes, BytesMut};
use cid::Cid;
use multibase::Base;
use multihash::Multihash;

use crate::{
    errors::{Error, InvalidMultiaddrError, Result, ValidationError},
    varint,
};

/// The longest multihash the peer-id converter accepts, in bytes.
const MAX_MULTIHASH_LENGTH: usize = 64;

const ONION_ADDRESS_LENGTH: usize = 16;
const ONION3_ADDRESS_LENGTH: usize = 56;

// ---------------------------------------------------------------------------
// IP addresses

/// Converts a dotted-decimal IPv4 string to its 4 raw bytes.
pub fn ip4_to_bytes(value: &str) -> Result<Bytes> {
    let addr: Ipv4Addr = value.parse().map_err(|_| {
        InvalidMultiaddrError::InvalidValue(format!("invalid IPv4 address \"{value}\""))
    })?;

    Ok(Bytes::copy_from_slice(&addr.octets()))
}

/// Converts 4 raw bytes to a dotted-decimal IPv4 string.
pub fn ip4_to_string(bytes: &[u8]) -> Result<String> {
    let octets: [u8; 4] = bytes
        .try_into()
        .map_err(|_| InvalidMultiaddrError::InvalidValue("IPv4 address was incorrect length".into()))?;

    Ok(Ipv4Addr::from(octets).to_string())
}

/// Converts an IPv6 string to its 16 raw bytes.
///
/// Embedded IPv4 tails (`::ffff:192.0.2.1`) are accepted and expanded.
pub fn ip6_to_bytes(value: &str) -> Result<Bytes> {
    let addr: Ipv6Addr = value.parse().map_err(|_| {
        InvalidMultiaddrError::InvalidValue(format!("invalid IPv6 address \"{value}\""))
    })?;

    Ok(Bytes::copy_from_slice(&addr.octets()))
}

/// Converts 16 raw bytes to the canonical compressed IPv6 string.
pub fn ip6_to_string(bytes: &[u8]) -> Result<String> {
    let octets: [u8; 16] = bytes.try_into().map_err(|_| {
        InvalidMultiaddrError::InvalidValue("IPv6 address was incorrect length".into())
    })?;

    let mut groups = [0u16; 8];
    for (i, group) in groups.iter_mut().enumerate() {
        *group = u16::from_be_bytes([octets[2 * i], octets[2 * i + 1]]);
    }

    Ok(format_ip6_groups(&groups))
}

/// Canonicalizes an IPv6 string without going through the byte form.
pub fn ip6_string_to_value(value: &str) -> Result<String> {
    let addr: Ipv6Addr = value.parse().map_err(|_| {
        InvalidMultiaddrError::InvalidValue(format!("invalid IPv6 address \"{value}\""))
    })?;

    Ok(format_ip6_groups(&addr.segments()))
}

/// RFC-5952-style rendering: lowercase hex groups with the leftmost longest
/// run of two or more zero groups collapsed to `::`. IPv4-mapped tails are
/// never re-emitted in dotted form.
fn format_ip6_groups(groups: &[u16; 8]) -> String {
    let mut best: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None;

    for (i, &group) in groups.iter().enumerate() {
        if group == 0 {
            let (start, len) = current.map_or((i, 0), |(s, l)| (s, l));
            current = Some((start, len + 1));
        } else {
            current = None;
        }

        if let Some((_, len)) = current {
            if len >= 2 && best.map_or(true, |(_, best_len)| len > best_len) {
                best = current;
            }
        }
    }

    let mut out = String::new();
    match best {
        Some((start, len)) => {
            for (i, group) in groups[..start].iter().enumerate() {
                if i > 0 {
                    out.push(':');
                }
                out.push_str(&format!("{group:x}"));
            }
            out.push_str("::");
            for (i, group) in groups[start + len..].iter().enumerate() {
                if i > 0 {
                    out.push(':');
                }
                out.push_str(&format!("{group:x}"));
            }
        }
        None => {
            for (i, group) in groups.iter().enumerate() {
                if i > 0 {
                    out.push(':');
                }
                out.push_str(&format!("{group:x}"));
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Ports

/// Converts a decimal port string to 2 big-endian bytes.
pub fn port_to_bytes(value: &str) -> Result<Bytes> {
    let port: u16 = value
        .parse()
        .map_err(|_| InvalidMultiaddrError::InvalidValue(format!("invalid port \"{value}\"")))?;

    Ok(Bytes::copy_from_slice(&port.to_be_bytes()))
}

/// Converts exactly 2 big-endian bytes to a decimal port string.
pub fn port_to_string(bytes: &[u8]) -> Result<String> {
    let raw: [u8; 2] = bytes
        .try_into()
        .map_err(|_| InvalidMultiaddrError::InvalidValue("port was incorrect length".into()))?;

    Ok(u16::from_be_bytes(raw).to_string())
}

// ---------------------------------------------------------------------------
// Length-prefixed text

/// Encodes a UTF-8 string as `<varint length><payload>`.
pub fn text_to_bytes(value: &str) -> Result<Bytes> {
    Ok(prefix_length(value.as_bytes()))
}

/// Decodes `<varint length><payload>` into a UTF-8 string, verifying that
/// the declared length matches the payload.
pub fn text_to_string(bytes: &[u8]) -> Result<String> {
    let payload = strip_length(bytes)?;

    String::from_utf8(payload.to_vec()).map_err(|_| InvalidMultiaddrError::InvalidUtf8.into())
}

fn prefix_length(payload: &[u8]) -> Bytes {
    let mut buffer = BytesMut::with_capacity(varint::MAX_LENGTH + payload.len());
    varint::encode_to(payload.len() as u64, &mut buffer);
    buffer.put_slice(payload);
    buffer.freeze()
}

fn strip_length(bytes: &[u8]) -> Result<&[u8]> {
    let (length, consumed) = varint::decode(bytes).map_err(InvalidMultiaddrError::from)?;
    let payload = &bytes[consumed..];

    if payload.len() as u64 != length {
        return Err(InvalidMultiaddrError::InconsistentLength.into());
    }

    Ok(payload)
}

// ---------------------------------------------------------------------------
// Peer identifiers (p2p)

/// Extracts the raw multihash bytes of a peer-id string.
///
/// Strings starting with `Q` or `1` are base58btc-encoded multihashes and
/// decode directly; anything else is parsed as a CID and reduced to its
/// multihash.
fn peer_id_multihash(value: &str) -> Result<Vec<u8>> {
    if value.starts_with('Q') || value.starts_with('1') {
        let digest = Base::Base58Btc.decode(value).map_err(|_| {
            InvalidMultiaddrError::InvalidValue(format!("invalid base58btc peer id \"{value}\""))
        })?;
        Multihash::<MAX_MULTIHASH_LENGTH>::from_bytes(&digest).map_err(|_| {
            InvalidMultiaddrError::InvalidValue(format!("\"{value}\" is not a multihash"))
        })?;

        Ok(digest)
    } else {
        let cid = Cid::try_from(value).map_err(|_| {
            InvalidMultiaddrError::InvalidValue(format!("invalid peer id \"{value}\""))
        })?;

        Ok(cid.hash().to_bytes())
    }
}

/// Canonicalizes a peer-id string to its base58btc multihash form.
///
/// Parsing a CID-form peer id and re-serializing deliberately yields the
/// base58btc form, not the original CID string.
pub fn peer_id_to_value(value: &str) -> Result<String> {
    Ok(Base::Base58Btc.encode(peer_id_multihash(value)?))
}

/// Converts a peer-id string to its length-prefixed multihash bytes.
pub fn peer_id_to_bytes(value: &str) -> Result<Bytes> {
    Ok(prefix_length(&peer_id_multihash(value)?))
}

/// Converts length-prefixed multihash bytes to the canonical base58btc
/// string form.
pub fn bytes_to_peer_id(bytes: &[u8]) -> Result<String> {
    let multihash = strip_length(bytes)?;

    Ok(Base::Base58Btc.encode(multihash))
}

// ---------------------------------------------------------------------------
// Multibase values (certhash)

/// Decodes a multibase-prefixed string to its length-prefixed payload bytes.
pub fn multibase_to_bytes(value: &str) -> Result<Bytes> {
    let (_base, payload) = multibase::decode(value).map_err(|_| {
        InvalidMultiaddrError::InvalidValue(format!("invalid multibase value \"{value}\""))
    })?;

    Ok(prefix_length(&payload))
}

/// Re-encodes length-prefixed payload bytes as a multibase string.
///
/// The output always uses the base64url (`u`) prefix, regardless of the base
/// the original input was written in.
pub fn bytes_to_multibase(bytes: &[u8]) -> Result<String> {
    let payload = strip_length(bytes)?;

    Ok(multibase::encode(Base::Base64Url, payload))
}

// ---------------------------------------------------------------------------
// Onion addresses

/// Converts a `<16 base32 chars>:<port>` onion v2 string to 12 raw bytes.
pub fn onion_to_bytes(value: &str) -> Result<Bytes> {
    onion_address_to_bytes(value, ONION_ADDRESS_LENGTH, "onion")
}

/// Converts a `<56 base32 chars>:<port>` onion v3 string to 37 raw bytes.
pub fn onion3_to_bytes(value: &str) -> Result<Bytes> {
    onion_address_to_bytes(value, ONION3_ADDRESS_LENGTH, "onion3")
}

fn onion_address_to_bytes(value: &str, address_length: usize, kind: &str) -> Result<Bytes> {
    let (address, port) = value.split_once(':').ok_or_else(|| {
        Error::from(ValidationError(format!(
            "failed to parse {kind} address \"{value}\": no port number"
        )))
    })?;

    if address.len() != address_length {
        return Err(ValidationError(format!(
            "failed to parse {kind} address: \"{address}\" is not a {address_length}-character \
             Tor address"
        ))
        .into());
    }

    let address_bytes = Base::Base32Lower.decode(address).map_err(|_| {
        ValidationError(format!("failed to parse {kind} address \"{address}\""))
    })?;

    let port: u16 = port
        .parse()
        .map_err(|_| ValidationError(format!("invalid {kind} port \"{port}\"")))?;
    if port == 0 {
        return Err(ValidationError("port number is not in range 1..=65535".into()).into());
    }

    let mut buffer = BytesMut::with_capacity(address_bytes.len() + 2);
    buffer.put_slice(&address_bytes);
    buffer.put_u16(port);

    Ok(buffer.freeze())
}

/// Converts onion value bytes (address followed by a 2-byte port) back to
/// the `<base32-address>:<port>` string form.
pub fn onion_to_string(bytes: &[u8]) -> Result<String> {
    if bytes.len() < 3 {
        return Err(InvalidMultiaddrError::InvalidValue(
            "onion address was incorrect length".into(),
        )
        .into());
    }

    let (address, port) = bytes.split_at(bytes.len() - 2);
    let port = u16::from_be_bytes([port[0], port[1]]);

    Ok(format!("{}:{port}", Base::Base32Lower.encode(address)))
}

// ---------------------------------------------------------------------------
// CIDR prefix lengths

/// Converts a decimal prefix-length string (0..=255) to a single byte.
pub fn cidr_to_bytes(value: &str) -> Result<Bytes> {
    let prefix: u8 = value.parse().map_err(|_| {
        InvalidMultiaddrError::InvalidValue(format!("invalid CIDR prefix length \"{value}\""))
    })?;

    Ok(Bytes::copy_from_slice(&[prefix]))
}

/// Converts a single byte to its decimal string.
pub fn cidr_to_string(bytes: &[u8]) -> Result<String> {
    match bytes {
        [prefix] => Ok(prefix.to_string()),
        _ => Err(InvalidMultiaddrError::InvalidValue(
            "CIDR prefix length was incorrect length".into(),
        )
        .into()),
    }
}

// ---------------------------------------------------------------------------
// Base16 fallback

/// Decodes lowercase base16 text, the fallback for fixed-size protocols with
/// no declared converter.
pub fn hex_to_bytes(value: &str) -> Result<Bytes> {
    let payload = Base::Base16Lower.decode(value).map_err(|_| {
        InvalidMultiaddrError::InvalidValue(format!("invalid base16 value \"{value}\""))
    })?;

    Ok(Bytes::from(payload))
}

/// Encodes bytes as lowercase base16 text.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    Base::Base16Lower.encode(bytes)
}

// ---------------------------------------------------------------------------
// Path values (unix, http-path)

/// Percent-decodes a path value.
pub fn path_to_value(value: &str) -> Result<String> {
    percent_decode(value)
}

/// Percent-encodes a path value, escaping `/` and `%`.
pub fn value_to_path(value: &str) -> String {
    percent_encode(value)
}

/// Percent-decodes an http-path value, restoring the leading `/`.
pub fn http_path_to_value(value: &str) -> Result<String> {
    Ok(format!("/{}", percent_decode(value)?))
}

/// Percent-encodes an http-path value, dropping the leading `/`.
pub fn value_to_http_path(value: &str) -> String {
    percent_encode(value.strip_prefix('/').unwrap_or(value))
}

fn percent_decode(value: &str) -> Result<String> {
    let input = value.as_bytes();
    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .ok_or(InvalidMultiaddrError::InvalidEscape)?;
            let high = hex_digit(hex[0])?;
            let low = hex_digit(hex[1])?;
            output.push(high << 4 | low);
            i += 3;
        } else {
            output.push(input[i]);
            i += 1;
        }
    }

    String::from_utf8(output).map_err(|_| InvalidMultiaddrError::InvalidUtf8.into())
}

fn hex_digit(byte: u8) -> Result<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(InvalidMultiaddrError::InvalidEscape.into()),
    }
}

fn percent_encode(value: &str) -> String {
    let mut output = String::with_capacity(value.len());

    for ch in value.chars() {
        match ch {
            '/' => output.push_str("%2F"),
            '%' => output.push_str("%25"),
            _ => output.push(ch),
        }
    }

    output
}
