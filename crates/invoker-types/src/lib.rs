//! Common types module for the contract invoker.
//!
//! This module defines the data model shared by the signer, transport and core
//! crates: addresses, chain identifiers and their signing conventions,
//! transaction requests and responses, signatures and secret key material.

/// Account-related types: addresses and signatures.
pub mod account;
/// Chain identifiers and the recovery-id convention each chain expects.
pub mod chains;
/// Parse errors shared by all type constructors.
pub mod error;
/// Secure string type for private keys.
pub mod secret_string;
/// Transaction request, response, receipt and fee types.
pub mod transaction;
/// Utility functions for hex formatting and JSON-RPC quantities.
pub mod utils;

pub use account::*;
pub use chains::*;
pub use error::ParseError;
pub use secret_string::SecretString;
pub use transaction::*;
pub use utils::{parse_quantity, parse_quantity_str, quantity_to_u64, with_0x_prefix, without_0x_prefix};

/// Re-exported so downstream crates agree on the primitive types.
pub use alloy::primitives::{Address, B256, U256};
