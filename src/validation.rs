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

//! Validators for protocol values in their string form.
//!
//! These run after string-to-value conversion and before a value is accepted
//! into a component.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::errors::ValidationError;

/// Validates a transport port: a canonically-written integer in 0..=65535.
pub fn validate_port(value: &str) -> Result<(), ValidationError> {
    let port: i64 = value
        .parse()
        .map_err(|_| ValidationError("value must be an integer".into()))?;

    // Reject non-canonical spellings such as "007" or "+80".
    if port.to_string() != value {
        return Err(ValidationError("value must be an integer".into()));
    }
    if port < 0 {
        return Err(ValidationError("value must be a positive integer".into()));
    }
    if port > 65535 {
        return Err(ValidationError(
            "value must not be greater than 65535".into(),
        ));
    }

    Ok(())
}

/// Validates IPv4 dotted-decimal syntax.
pub fn validate_ip4(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| ValidationError(format!("invalid IPv4 address \"{value}\"")))
}

/// Validates IPv6 textual syntax.
pub fn validate_ip6(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Ipv6Addr>()
        .map(|_| ())
        .map_err(|_| ValidationError(format!("invalid IPv6 address \"{value}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_bounds() {
        assert!(validate_port("0").is_ok());
        assert!(validate_port("65535").is_ok());
        assert!(validate_port("65536").is_err());
        assert!(validate_port("-1").is_err());
    }

    #[test]
    fn port_rejects_non_canonical_integers() {
        assert!(validate_port("007").is_err());
        assert!(validate_port("+80").is_err());
        assert!(validate_port("80 ").is_err());
        assert!(validate_port("eighty").is_err());
    }

    #[test]
    fn ip4_syntax() {
        assert!(validate_ip4("127.0.0.1").is_ok());
        assert!(validate_ip4("256.0.0.1").is_err());
        assert!(validate_ip4("1.2.3").is_err());
    }

    #[test]
    fn ip6_syntax() {
        assert!(validate_ip6("::1").is_ok());
        assert!(validate_ip6("1:2:3:4:5:6:7:8:9").is_err());
        assert!(validate_ip6("127.0.0.1").is_err());
    }
}
