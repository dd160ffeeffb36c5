//! Utility functions for common type conversions and formatting.
//!
//! This module provides helpers for hex prefix handling and for reading the
//! integer quantities JSON-RPC nodes return in several spellings.

pub mod formatting;
pub mod quantity;

pub use formatting::{with_0x_prefix, without_0x_prefix};
pub use quantity::{parse_quantity, parse_quantity_str, quantity_to_u64};
