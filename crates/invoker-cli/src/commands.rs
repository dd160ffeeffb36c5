//! Subcommands and their execution.

use clap::Subcommand;
use invoker_config::Config;
use invoker_core::{create_registry, signing, ContractRegistry};
use invoker_types::{checksum, parse_chain_id, parse_quantity_str, U256};
use serde_json::{json, Value};
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Current block number
	BlockNumber,
	/// Current gas price in wei
	GasPrice,
	/// Gas estimates for a contract method
	GasLimit {
		address: String,
		method: String,
		args: Vec<String>,
	},
	/// Read-only contract call
	Call {
		address: String,
		method: String,
		args: Vec<String>,
		/// Return every output as a separate item
		#[arg(long)]
		all: bool,
	},
	/// Contract transaction
	Send {
		address: String,
		method: String,
		args: Vec<String>,
		/// Wei to attach, decimal or 0x hex
		#[arg(long)]
		value: Option<String>,
	},
	/// Learn the signer's nonce by sending a small self-transfer (spends gas)
	ProbeNonce,
	/// Send a self-transfer and wait for its receipt (spends gas)
	ProbeStatus,
	/// Transfer wei to an address
	SendTx { to: String, value: String },
	/// Keccak-256 of a message
	Hash { message: String },
	/// Personal-sign a message with the configured account
	Sign { message: String },
	/// Sign a message with the configured account and verify the signature
	Verify { message: String },
	/// Sign a transaction hash with a raw private key
	SignRaw {
		tx_hash: String,
		/// Chain id, decimal or 0x hex
		chain_id: String,
		#[arg(long, env = "INVOKER_PRIVATE_KEY", hide_env_values = true)]
		private_key: String,
	},
	/// Address of a private key
	Address {
		#[arg(long, env = "INVOKER_PRIVATE_KEY", hide_env_values = true)]
		private_key: String,
	},
	/// Personal-sign a message with a raw private key
	SignWithKey {
		message: String,
		#[arg(long, env = "INVOKER_PRIVATE_KEY", hide_env_values = true)]
		private_key: String,
	},
	/// Call `method(contract_name)` on the default contract and read one unsigned integer
	ReadUint {
		contract_name: String,
		method: String,
	},
	/// Ether balance of an account, via Multicall3
	EthBalance { account: String },
	/// Hash of a recent block, via Multicall3
	BlockHash { number: u64 },
}

/// Interprets a command-line argument as JSON when it parses as such, and as a
/// plain string otherwise.
///
/// Numbers that JSON can only hold as floats stay strings, so amounts beyond
/// 64 bits reach the encoder digit for digit.
fn parse_arg(arg: &str) -> Value {
	match serde_json::from_str(arg) {
		Ok(Value::Number(number)) if number.is_f64() => Value::String(arg.to_string()),
		Ok(value) => value,
		Err(_) => Value::String(arg.to_string()),
	}
}

fn parse_args(args: &[String]) -> Vec<Value> {
	args.iter().map(|arg| parse_arg(arg)).collect()
}

fn quantities(values: Vec<U256>) -> Value {
	Value::Array(values.iter().map(|value| json!(value.to_string())).collect())
}

/// Runs a command that needs neither configuration nor network.
fn execute_offline(command: &Command) -> Result<Option<Value>, Box<dyn std::error::Error>> {
	let output = match command {
		Command::Hash { message } => json!(signing::keccak_hex(message)),
		Command::Address { private_key } => json!(checksum(&signing::derive_address(private_key)?)),
		Command::SignWithKey {
			message,
			private_key,
		} => json!(signing::sign_with_private_key(private_key, message)?.to_string()),
		_ => return Ok(None),
	};
	Ok(Some(output))
}

pub async fn execute(config_path: &Path, command: Command) -> Result<Value, Box<dyn std::error::Error>> {
	if let Some(output) = execute_offline(&command)? {
		return Ok(output);
	}

	let path = config_path
		.to_str()
		.ok_or_else(|| format!("Invalid config path: {}", config_path.display()))?;
	let config = Config::from_file(path).await?;
	tracing::info!(path, chain_id = config.network.chain_id, "Loaded configuration");
	let registry = create_registry(&config).await?;

	execute_with(&registry, command).await
}

async fn execute_with(
	registry: &ContractRegistry,
	command: Command,
) -> Result<Value, Box<dyn std::error::Error>> {
	let output = match command {
		Command::BlockNumber => json!(registry.block_number().await?),
		Command::GasPrice => json!(registry.gas_price().await?.to_string()),
		Command::GasLimit {
			address,
			method,
			args,
		} => quantities(registry.gas_limit(&address, &method, parse_args(&args)).await?),
		Command::Call {
			address,
			method,
			args,
			all,
		} => {
			let args = parse_args(&args);
			if all {
				Value::Array(registry.get_array(&address, &method, args).await?)
			} else {
				registry.call(&address, &method, args).await?
			}
		},
		Command::Send {
			address,
			method,
			args,
			value,
		} => {
			let value = value.as_deref().map(parse_quantity_str).transpose()?;
			Value::Array(registry.send(&address, &method, parse_args(&args), value).await?)
		},
		Command::ProbeNonce => json!(registry.probe_nonce().await?),
		Command::ProbeStatus => serde_json::to_value(registry.probe_transaction_status().await?)?,
		Command::SendTx { to, value } => {
			json!(registry.send_transaction(&to, parse_quantity_str(&value)?).await?)
		},
		Command::Sign { message } => json!(registry.sign_message(&message).await?),
		Command::Verify { message } => json!(registry.verify_signature(&message).await?),
		Command::SignRaw {
			tx_hash,
			chain_id,
			private_key,
		} => {
			let chain_id = parse_chain_id(&chain_id)?;
			json!(registry.sign_raw_transaction(&private_key, &tx_hash, chain_id).await?)
		},
		Command::ReadUint {
			contract_name,
			method,
		} => json!(registry
			.read_registered_uint(&contract_name, &method)
			.await?
			.to_string()),
		Command::EthBalance { account } => json!(registry.eth_balance(&account).await?.to_string()),
		Command::BlockHash { number } => json!(registry.block_hash(number).await?.to_string()),
		Command::Hash { .. } | Command::Address { .. } | Command::SignWithKey { .. } => {
			return Err("command runs without configuration".into())
		},
	};
	Ok(output)
}
