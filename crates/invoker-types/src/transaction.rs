//! Transaction types exchanged with the transport.
//!
//! These mirror the JSON shapes standard nodes use for `eth_sendTransaction`,
//! `eth_getTransactionReceipt` and fee queries, so they can be handed to or
//! read back from any JSON-RPC transport without further mapping.

use crate::utils::quantity::{
	deserialize_opt_quantity, deserialize_quantity, deserialize_status, deserialize_u64_quantity,
	serialize_opt_quantity,
};
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// An intended transaction.
///
/// Values are assembled through the consuming `with_*` builders and are not
/// changed once handed to a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
	/// Recipient; absent for method overwrites where the contract is implied.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<Address>,
	/// Wei to transfer.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		serialize_with = "serialize_opt_quantity",
		deserialize_with = "deserialize_opt_quantity"
	)]
	pub value: Option<U256>,
	/// Fee cap for EIP-1559 transactions.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		serialize_with = "serialize_opt_quantity",
		deserialize_with = "deserialize_opt_quantity"
	)]
	pub max_fee_per_gas: Option<U256>,
	/// Tip for EIP-1559 transactions.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		serialize_with = "serialize_opt_quantity",
		deserialize_with = "deserialize_opt_quantity"
	)]
	pub max_priority_fee_per_gas: Option<U256>,
	/// Calldata overriding whatever the method would encode.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Bytes>,
}

impl TransactionRequest {
	/// A plain value transfer to `to`.
	pub fn transfer(to: Address, value: U256) -> Self {
		Self {
			to: Some(to),
			value: Some(value),
			..Default::default()
		}
	}

	/// An overwrite that only carries a value, for payable method calls.
	pub fn with_value_only(value: U256) -> Self {
		Self {
			value: Some(value),
			..Default::default()
		}
	}

	pub fn with_max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
		self.max_fee_per_gas = Some(max_fee_per_gas);
		self
	}

	pub fn with_max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
		self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
		self
	}

	/// Applies the node's fee suggestion. A missing tip stays unset.
	pub fn with_fees(self, fees: &FeeData) -> Self {
		let request = self.with_max_fee_per_gas(fees.max_fee_per_gas);
		match fees.max_priority_fee_per_gas {
			Some(tip) => request.with_max_priority_fee_per_gas(tip),
			None => request,
		}
	}
}

/// What a node answers after accepting a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
	/// The transaction hash, `0x` hex.
	pub hash: String,
	/// The nonce the transaction was sent with.
	#[serde(deserialize_with = "deserialize_u64_quantity")]
	pub nonce: u64,
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a
/// block, including its success status and block number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub transaction_hash: String,
	/// The block number where the transaction was included.
	#[serde(deserialize_with = "deserialize_u64_quantity")]
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	#[serde(rename = "status", deserialize_with = "deserialize_status")]
	pub success: bool,
	/// Gas consumed by the transaction, when the node reports it.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		deserialize_with = "deserialize_opt_quantity"
	)]
	pub gas_used: Option<U256>,
}

/// Current fee market data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
	/// Suggested fee cap.
	#[serde(deserialize_with = "deserialize_quantity")]
	pub max_fee_per_gas: U256,
	/// Suggested tip, when available.
	#[serde(default, deserialize_with = "deserialize_opt_quantity")]
	pub max_priority_fee_per_gas: Option<U256>,
}
