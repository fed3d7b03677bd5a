use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use evm_connect::keyless::{
    build_keyless_transaction_hex, parse_signed_transaction, signing_digest, UnsignedTransaction,
};
use evm_connect::types::DigestResponse;
use evm_connect::utils::encode_hex_prefixed;
use evm_connect::utils::logging;
use std::fs;

#[derive(Parser)]
#[command(name = "evm-connect", version, about = "Keyless EVM transaction tooling")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a signed transaction from an unsigned one and an external signature
    Keyless {
        /// Transaction JSON, or @path to read it from a file
        #[arg(long)]
        tx: String,
        /// 65-byte r||s||v or 64-byte compact signature, hex encoded
        #[arg(long)]
        signature: String,
    },
    /// Print the digest a keyless signer has to sign
    Digest {
        /// Transaction JSON, or @path to read it from a file
        #[arg(long)]
        tx: String,
    },
    /// Decode a signed raw transaction
    Decode {
        /// 0x-prefixed signed encoding
        raw: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        logging::enable_debug();
    }

    match cli.command {
        Command::Keyless { tx, signature } => {
            let transaction = load_transaction(&tx)?;
            let result = build_keyless_transaction_hex(&transaction, &signature)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Signer:           {}", result.signer_address);
                println!("Transaction hash: {}", result.transaction_hash);
                println!("Raw transaction:  {}", result.signed_serialized_transaction);
            }
        }
        Command::Digest { tx } => {
            let transaction = load_transaction(&tx)?;
            let digest = encode_hex_prefixed(&signing_digest(&transaction)?);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&DigestResponse { digest })?);
            } else {
                println!("{}", digest);
            }
        }
        Command::Decode { raw } => {
            let parsed = parse_signed_transaction(&raw)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                println!("Envelope:         {}", parsed.transaction.envelope.name());
                println!("From:             {}", parsed.signer_address);
                println!("Nonce:            {}", parsed.transaction.nonce);
                match parsed.transaction.chain_id {
                    Some(id) => println!("Chain id:         {}", id),
                    None => println!("Chain id:         none (pre-EIP-155)"),
                }
                println!("Transaction hash: {}", parsed.transaction_hash);
                println!("Signature:        {}", parsed.signature);
            }
        }
    }

    Ok(())
}

fn load_transaction(arg: &str) -> Result<UnsignedTransaction> {
    let payload = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path))?,
        None => arg.to_string(),
    };
    if payload.trim().is_empty() {
        bail!("transaction JSON is empty");
    }
    serde_json::from_str(&payload).context("parsing transaction JSON")
}
