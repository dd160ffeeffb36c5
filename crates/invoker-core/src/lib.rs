//! Core contract invocation engine.
//!
//! This crate turns named contract methods plus arguments into chain calls and
//! transactions through a [`ContractInvoker`], caches invokers per contract in
//! a [`ContractRegistry`], and provides the hashing and ECDSA signing
//! primitives both of them rely on.
//!
//! The transport and signer are consumed only through the
//! `invoker_transport` and `invoker_account` traits. [`create_registry`] wires
//! the alloy transport and the local signer from configuration.

use invoker_account::implementations::local::LocalSigner;
use invoker_account::SignerInterface;
use invoker_config::Config;
use invoker_transport::implementations::evm::alloy::{create_contract_builder, AlloyTransportConfig};
use std::sync::Arc;

mod error;
pub mod invoker;
pub mod registry;
pub mod signing;

#[cfg(test)]
mod testing;

pub use error::InvokerError;
pub use invoker::ContractInvoker;
pub use registry::ContractRegistry;

/// Builds a registry from configuration.
///
/// The configured account, if any, both backs the invokers' signer and signs
/// the transport's transactions.
pub async fn create_registry(config: &Config) -> Result<ContractRegistry, InvokerError> {
	let signer = config
		.account
		.as_ref()
		.map(|account| LocalSigner::from_private_key(&account.private_key))
		.transpose()?;

	let transport_config = AlloyTransportConfig {
		rpc_url: config.network.rpc_url.clone(),
		chain_id: config.network.chain_id,
		receipt_timeout: config.network.receipt_timeout(),
		poll_interval: config.network.poll_interval(),
	};
	let builder = create_contract_builder(
		&transport_config,
		signer.as_ref().map(|signer| signer.inner().clone()),
	)?;

	let default_abi = config.default_abi().await?;
	let signer = signer.map(|signer| Arc::new(signer) as Arc<dyn SignerInterface>);

	tracing::info!(
		chain_id = config.network.chain_id,
		signer = ?signer.as_ref().map(|signer| signer.address()),
		"Contract registry ready"
	);

	Ok(ContractRegistry::new(builder, signer, default_abi)
		.with_conventions(config.signing_conventions()?)
		.with_multicall_address(config.multicall_address()?))
}
