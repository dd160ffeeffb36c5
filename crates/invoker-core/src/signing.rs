//! Hashing and signing primitives.
//!
//! Everything here is pure: keys are supplied by the caller and nothing
//! touches the network. The chain-specific part is how the recovery id is
//! folded into `v` for raw transaction signatures, which is looked up in a
//! [`SigningConventions`] table.

use crate::InvokerError;
use alloy::primitives::{eip191_hash_message, keccak256, Signature as EcdsaSignature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use invoker_account::implementations::local::parse_private_key;
use invoker_account::AccountError;
use invoker_types::{
	without_0x_prefix, Address, ChainId, ParseError, Signature, SigningConventions, B256, U256,
};

/// Keccak-256 of the message's UTF-8 bytes, as lowercase hex without `0x`.
pub fn keccak_hex(message: &str) -> String {
	hex::encode(keccak256(message.as_bytes()))
}

/// The personal-message hash:
/// `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`.
///
/// `len` is the decimal byte length of the message.
pub fn personal_message_hash(message: &[u8]) -> B256 {
	eip191_hash_message(message)
}

fn signer_from_key(private_key: &str) -> Result<PrivateKeySigner, InvokerError> {
	parse_private_key(private_key).map_err(|e| InvokerError::MalformedInput(e.to_string()))
}

fn parse_hash(tx_hash: &str) -> Result<B256, InvokerError> {
	let bytes = hex::decode(without_0x_prefix(tx_hash.trim()))
		.map_err(|e| InvokerError::MalformedInput(format!("Invalid transaction hash: {}", e)))?;
	if bytes.len() != 32 {
		return Err(InvokerError::MalformedInput(format!(
			"Transaction hash must be 32 bytes, got {}",
			bytes.len()
		)));
	}
	Ok(B256::from_slice(&bytes))
}

/// Signs a transaction hash with a raw private key.
///
/// The recovery id is encoded into `v` according to the convention the table
/// assigns to `chain_id`.
pub fn sign_raw_transaction(
	private_key: &str,
	tx_hash: &str,
	chain_id: ChainId,
	conventions: &SigningConventions,
) -> Result<Signature, InvokerError> {
	if chain_id == 0 {
		return Err(ParseError::InvalidChainId(chain_id.to_string()).into());
	}
	let signer = signer_from_key(private_key)?;
	let hash = parse_hash(tx_hash)?;

	let signature = signer
		.sign_hash_sync(&hash)
		.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

	let convention = conventions.convention_for(chain_id);
	let v = convention.encode_v(u8::from(signature.v()), chain_id);

	tracing::debug!(chain_id, ?convention, "Signed raw transaction hash");
	Ok(Signature::from_parts(
		signature.r().to_be_bytes::<32>(),
		signature.s().to_be_bytes::<32>(),
		&v,
	)?)
}

/// Derives the account address of a private key.
pub fn derive_address(private_key: &str) -> Result<Address, InvokerError> {
	Ok(signer_from_key(private_key)?.address())
}

/// Personal-signs a message with a raw private key.
///
/// `v` is 27 or 28.
pub fn sign_with_private_key(private_key: &str, message: &str) -> Result<Signature, InvokerError> {
	let signer = signer_from_key(private_key)?;
	let signature = signer
		.sign_message_sync(message.as_bytes())
		.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
	Ok(Signature::from(signature))
}

/// Recovers the address that produced `signature` over `prehash`.
///
/// Accepts every `v` encoding [`Signature::y_parity`] understands.
pub fn recover_signer(signature: &Signature, prehash: &B256) -> Result<Address, ParseError> {
	EcdsaSignature::new(
		U256::from_be_slice(signature.r()),
		U256::from_be_slice(signature.s()),
		signature.y_parity()?,
	)
	.recover_address_from_prehash(prehash)
	.map_err(|e| ParseError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use invoker_types::{SigningConvention, Y_PARITY_CHAINS};

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

	#[test]
	fn test_keccak_hex() {
		assert_eq!(
			keccak_hex(""),
			"c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
		);
		assert_eq!(
			keccak_hex("hello"),
			"1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
		);
	}

	#[test]
	fn test_personal_message_hash_prefix() {
		let message = "héllo";
		let mut prefixed = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
		prefixed.extend_from_slice(message.as_bytes());

		assert_eq!(personal_message_hash(message.as_bytes()), keccak256(&prefixed));
	}

	#[test]
	fn test_derive_address() {
		let address = derive_address(KEY).unwrap();
		assert_eq!(
			address.to_checksum(None),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
		);
		assert_eq!(derive_address(&KEY[2..]).unwrap(), address);
		assert_eq!(
			derive_address(OTHER_KEY).unwrap().to_checksum(None),
			"0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
		);
		assert!(matches!(
			derive_address("0xdeadbeef"),
			Err(InvokerError::MalformedInput(_))
		));
	}

	#[test]
	fn test_y_parity_chains_use_bare_recovery_id() {
		let conventions = SigningConventions::default();
		let hash = parse_hash(TX_HASH).unwrap();
		let expected = derive_address(KEY).unwrap();

		for (chain_id, _) in Y_PARITY_CHAINS {
			let signature = sign_raw_transaction(KEY, TX_HASH, chain_id, &conventions).unwrap();
			assert_eq!(signature.as_bytes().len(), 65);
			assert!(signature.v_bytes()[0] <= 1, "chain {}", chain_id);
			assert_eq!(recover_signer(&signature, &hash).unwrap(), expected);
		}
	}

	#[test]
	fn test_other_chains_use_eip155_v() {
		let conventions = SigningConventions::default();
		let hash = parse_hash(TX_HASH).unwrap();
		let expected = derive_address(KEY).unwrap();

		for chain_id in [1u64, 10, 56, 8453, 42161, 11155111] {
			let signature = sign_raw_transaction(KEY, TX_HASH, chain_id, &conventions).unwrap();
			let v = signature.v().unwrap();
			let recovery_id = v - u128::from(chain_id) * 2 - 35;

			assert!(recovery_id <= 1, "chain {}", chain_id);
			assert_eq!(recover_signer(&signature, &hash).unwrap(), expected);
		}
	}

	#[test]
	fn test_polygon_and_mainnet_share_r_and_s() {
		let conventions = SigningConventions::default();
		let polygon = sign_raw_transaction(KEY, TX_HASH, 137, &conventions).unwrap();
		let mainnet = sign_raw_transaction(KEY, TX_HASH, 1, &conventions).unwrap();

		assert_eq!(polygon.r(), mainnet.r());
		assert_eq!(polygon.s(), mainnet.s());
		assert_ne!(polygon.to_string(), mainnet.to_string());
		assert_eq!(mainnet.v().unwrap(), u128::from(polygon.v_bytes()[0]) + 37);
	}

	#[test]
	fn test_configured_override_changes_encoding() {
		let conventions =
			SigningConventions::default().with_convention(56, SigningConvention::YParity);
		let signature = sign_raw_transaction(KEY, TX_HASH, 56, &conventions).unwrap();
		assert_eq!(signature.v_bytes().len(), 1);
		assert!(signature.v_bytes()[0] <= 1);
	}

	#[test]
	fn test_sign_raw_transaction_rejects_bad_input() {
		let conventions = SigningConventions::default();

		for (key, hash, chain_id) in [
			(KEY, "0x1234", 1u64),
			(KEY, "not hex", 1),
			(KEY, TX_HASH, 0),
			("0x00", TX_HASH, 1),
		] {
			assert!(matches!(
				sign_raw_transaction(key, hash, chain_id, &conventions),
				Err(InvokerError::MalformedInput(_))
			));
		}
	}

	#[test]
	fn test_sign_with_private_key_recovers() {
		let message = "Ethereum Signed Message: inside the message";
		let signature = sign_with_private_key(KEY, message).unwrap();

		assert!(matches!(signature.v_bytes(), [27] | [28]));
		assert_eq!(
			recover_signer(&signature, &personal_message_hash(message.as_bytes())).unwrap(),
			derive_address(KEY).unwrap()
		);
	}

	#[test]
	fn test_recover_signer_rejects_unknown_v() {
		let hash = parse_hash(TX_HASH).unwrap();
		let mut bytes = vec![0u8; 64];
		bytes.push(5);
		assert!(recover_signer(&Signature::from_bytes(bytes).unwrap(), &hash).is_err());
	}
}
