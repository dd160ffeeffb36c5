//! String formatting utilities.
//!
//! Provides functions for managing the `0x` prefix on hex strings.

/// Adds "0x" prefix to a hex string if it doesn't already have one.
///
/// # Arguments
///
/// * `hex_str` - A hex string that may or may not have "0x" prefix
///
/// # Returns
///
/// A hex string with "0x" prefix.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" prefix from a hex string if present.
///
/// # Arguments
///
/// * `hex_str` - A hex string that may or may not have "0x" prefix
///
/// # Returns
///
/// A hex string without prefix.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefix_helpers() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0XABCD"), "0XABCD");
		assert_eq!(without_0x_prefix("0xabcd"), "abcd");
		assert_eq!(without_0x_prefix("0Xabcd"), "abcd");
		assert_eq!(without_0x_prefix("abcd"), "abcd");
	}
}
