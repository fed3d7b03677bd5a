//! Keyless Transaction Builder
//!
//! Serializes an unsigned transaction, recovers the address behind an
//! externally produced signature and embeds that signature into a
//! broadcast-ready encoding.

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::utils::rlp::Rlp;
use serde::{Deserialize, Serialize};

use super::signature::{parity_from_v, KeylessSignature};
use super::transaction::{TxEnvelope, UnsignedTransaction};
use super::{KeylessError, KeylessResult};
use crate::log_debug;
use crate::utils::{decode_hex, encode_hex_prefixed, keccak256, to_checksum_address};

/// Signed transaction produced for a keyless signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeylessTransactionResult {
    /// EIP-55 address recovered from the signature
    #[serde(rename = "signer")]
    pub signer_address: String,
    /// `0x`-prefixed signed encoding, ready for `eth_sendRawTransaction`
    #[serde(rename = "transaction")]
    pub signed_serialized_transaction: String,
    /// Keccak-256 of the signed encoding
    pub transaction_hash: String,
}

/// A decoded signed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSignedTransaction {
    pub transaction: UnsignedTransaction,
    pub signature: KeylessSignature,
    #[serde(rename = "from")]
    pub signer_address: String,
    pub transaction_hash: String,
}

/// The 32-byte digest a keyless signer has to sign for `transaction`
pub fn signing_digest(transaction: &UnsignedTransaction) -> KeylessResult<[u8; 32]> {
    let typed = transaction.to_typed()?;
    Ok(keccak256(typed.rlp().as_ref()))
}

/// Build the signed transaction for `transaction` from a keyless signature
pub fn build_keyless_transaction(
    transaction: &UnsignedTransaction,
    signature: &KeylessSignature,
) -> KeylessResult<KeylessTransactionResult> {
    // 1. Canonical unsigned encoding
    let typed = transaction.to_typed()?;
    let unsigned = typed.rlp();

    // 2. Digest
    let digest = keccak256(unsigned.as_ref());

    // 3. Signer from digest + signature
    let signer = signature.recover(digest)?;
    let signer_address = to_checksum_address(signer.as_bytes());

    // 4. Signed encoding, ready to broadcast
    let v = embedded_v(transaction, signature.y_parity)?;
    let signed = typed.rlp_signed(&signature.to_ethers(v));
    let transaction_hash = encode_hex_prefixed(&keccak256(signed.as_ref()));

    log_debug!(
        "keyless",
        "Keyless transaction built",
        envelope = transaction.envelope.name(),
        signer = signer_address,
        tx_hash = transaction_hash,
    );

    Ok(KeylessTransactionResult {
        signer_address,
        signed_serialized_transaction: encode_hex_prefixed(signed.as_ref()),
        transaction_hash,
    })
}

/// Same as [`build_keyless_transaction`] with the signature as hex text
pub fn build_keyless_transaction_hex(
    transaction: &UnsignedTransaction,
    signature_hex: &str,
) -> KeylessResult<KeylessTransactionResult> {
    let signature: KeylessSignature = signature_hex.parse()?;
    build_keyless_transaction(transaction, &signature)
}

/// Decode a signed encoding back into its transaction and signature
pub fn parse_signed_transaction(raw: &str) -> KeylessResult<ParsedSignedTransaction> {
    let bytes = decode_hex(raw).map_err(|e| KeylessError::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(KeylessError::Decode("empty transaction".to_string()));
    }

    let rlp = Rlp::new(&bytes);
    let (typed, embedded) = TypedTransaction::decode_signed(&rlp)
        .map_err(|e| KeylessError::Decode(e.to_string()))?;

    let transaction = UnsignedTransaction::from_typed(&typed)?;
    let signature = KeylessSignature::new(embedded.r, embedded.s, parity_from_v(embedded.v)?)?;

    let digest = signing_digest(&transaction)?;
    let signer = signature.recover(digest)?;

    Ok(ParsedSignedTransaction {
        transaction,
        signature,
        signer_address: to_checksum_address(signer.as_bytes()),
        transaction_hash: encode_hex_prefixed(&keccak256(&bytes)),
    })
}

/// `v` as it appears inside the signed encoding of `transaction`
fn embedded_v(transaction: &UnsignedTransaction, y_parity: u8) -> KeylessResult<u64> {
    let parity = u64::from(y_parity);
    match transaction.envelope {
        TxEnvelope::Legacy => match transaction.eip155_chain_id() {
            Some(chain_id) => chain_id
                .checked_mul(2)
                .and_then(|v| v.checked_add(35 + parity))
                .ok_or_else(|| {
                    KeylessError::InvalidTransaction(format!(
                        "chain id {} too large for EIP-155",
                        chain_id
                    ))
                }),
            None => Ok(27 + parity),
        },
        TxEnvelope::AccessList | TxEnvelope::FeeMarket => Ok(parity),
    }
}
