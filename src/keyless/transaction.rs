//! Unsigned EVM transactions
//!
//! Caller-owned transaction records and their mapping onto `ethers-core`
//! typed transactions, which own the canonical RLP encoding.

use ethers_core::types::transaction::eip1559::Eip1559TransactionRequest;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::transaction::eip2930::{AccessList, Eip2930TransactionRequest};
use ethers_core::types::{Address, NameOrAddress, TransactionRequest, U256, U64};
use serde::{Deserialize, Serialize};

use super::{KeylessError, KeylessResult};
use crate::serde_hex::{hex_bytes, quantity, quantity_option, quantity_u64, quantity_u64_option};

/// Transaction envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxEnvelope {
    /// Legacy transaction, EIP-155 protected when a chain id is present
    #[default]
    #[serde(alias = "eip155")]
    Legacy,
    /// EIP-2930 access list transaction (type 0x01)
    #[serde(alias = "eip2930")]
    AccessList,
    /// EIP-1559 fee market transaction (type 0x02)
    #[serde(alias = "eip1559")]
    FeeMarket,
}

impl TxEnvelope {
    pub fn type_byte(&self) -> Option<u8> {
        match self {
            Self::Legacy => None,
            Self::AccessList => Some(0x01),
            Self::FeeMarket => Some(0x02),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::AccessList => "EIP-2930",
            Self::FeeMarket => "EIP-1559",
        }
    }
}

/// Unsigned transaction handed to a keyless signer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    #[serde(rename = "type", default)]
    pub envelope: TxEnvelope,
    /// Chain id. Optional for legacy transactions only; absent (or zero)
    /// means a pre-EIP-155 transaction valid on every chain.
    #[serde(default, with = "quantity_u64_option", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, with = "quantity_u64")]
    pub nonce: u64,
    #[serde(with = "quantity")]
    pub gas_limit: U256,
    /// Legacy and EIP-2930 gas price
    #[serde(default, with = "quantity_option", skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, with = "quantity_option", skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, with = "quantity_option", skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Recipient, `None` for contract creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, with = "quantity")]
    pub value: U256,
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(
        default,
        deserialize_with = "access_list_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_list: Option<AccessList>,
}

fn access_list_or_none<'de, D>(deserializer: D) -> Result<Option<AccessList>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let list = Option::<AccessList>::deserialize(deserializer)?;
    Ok(list.as_ref().and_then(non_empty))
}

impl UnsignedTransaction {
    /// Legacy transaction without a chain id
    pub fn legacy(nonce: u64, gas_price: U256, gas_limit: U256) -> Self {
        Self {
            envelope: TxEnvelope::Legacy,
            nonce,
            gas_price: Some(gas_price),
            gas_limit,
            ..Default::default()
        }
    }

    /// EIP-2930 transaction
    pub fn access_list_tx(chain_id: u64, nonce: u64, gas_price: U256, gas_limit: U256) -> Self {
        Self {
            envelope: TxEnvelope::AccessList,
            chain_id: Some(chain_id),
            nonce,
            gas_price: Some(gas_price),
            gas_limit,
            ..Default::default()
        }
    }

    /// EIP-1559 transaction
    pub fn fee_market(
        chain_id: u64,
        nonce: u64,
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
        gas_limit: U256,
    ) -> Self {
        Self {
            envelope: TxEnvelope::FeeMarket,
            chain_id: Some(chain_id),
            nonce,
            max_fee_per_gas: Some(max_fee_per_gas),
            max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
            gas_limit,
            ..Default::default()
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// An empty list is the same as no list
    pub fn with_access_list(mut self, access_list: AccessList) -> Self {
        self.access_list = non_empty(&access_list);
        self
    }

    /// Chain id that takes part in EIP-155 replay protection, if any
    pub fn eip155_chain_id(&self) -> Option<u64> {
        match self.envelope {
            TxEnvelope::Legacy => self.chain_id,
            TxEnvelope::AccessList | TxEnvelope::FeeMarket => None,
        }
    }

    /// Check the fields against the envelope rules
    pub fn validate(&self) -> KeylessResult<()> {
        let envelope = self.envelope.name();
        match self.envelope {
            TxEnvelope::Legacy => {
                if self.gas_price.is_none() {
                    return Err(KeylessError::MissingField("gasPrice"));
                }
                reject_field(envelope, "maxFeePerGas", self.max_fee_per_gas.is_some())?;
                reject_field(envelope, "maxPriorityFeePerGas", self.max_priority_fee_per_gas.is_some())?;
                reject_field(envelope, "accessList", self.access_list.is_some())?;
                if self.chain_id == Some(0) {
                    return Err(KeylessError::InvalidTransaction(
                        "chainId 0 is not a chain; omit chainId for a pre-EIP-155 transaction".to_string(),
                    ));
                }
            }
            TxEnvelope::AccessList => {
                if self.chain_id.is_none() {
                    return Err(KeylessError::MissingField("chainId"));
                }
                if self.gas_price.is_none() {
                    return Err(KeylessError::MissingField("gasPrice"));
                }
                reject_field(envelope, "maxFeePerGas", self.max_fee_per_gas.is_some())?;
                reject_field(envelope, "maxPriorityFeePerGas", self.max_priority_fee_per_gas.is_some())?;
                reject_empty_access_list(self.access_list.as_ref())?;
            }
            TxEnvelope::FeeMarket => {
                if self.chain_id.is_none() {
                    return Err(KeylessError::MissingField("chainId"));
                }
                let max_fee = self
                    .max_fee_per_gas
                    .ok_or(KeylessError::MissingField("maxFeePerGas"))?;
                let priority_fee = self
                    .max_priority_fee_per_gas
                    .ok_or(KeylessError::MissingField("maxPriorityFeePerGas"))?;
                if priority_fee > max_fee {
                    return Err(KeylessError::InvalidTransaction(format!(
                        "maxPriorityFeePerGas {} exceeds maxFeePerGas {}",
                        priority_fee, max_fee
                    )));
                }
                reject_field(envelope, "gasPrice", self.gas_price.is_some())?;
                reject_empty_access_list(self.access_list.as_ref())?;
            }
        }
        Ok(())
    }

    /// Map onto the `ethers-core` typed transaction that owns the encoding
    pub fn to_typed(&self) -> KeylessResult<TypedTransaction> {
        self.validate()?;

        let typed = match self.envelope {
            TxEnvelope::Legacy => {
                let mut request = self.base_request();
                request.gas_price = self.gas_price;
                request.chain_id = self.eip155_chain_id().map(U64::from);
                TypedTransaction::Legacy(request)
            }
            TxEnvelope::AccessList => {
                let mut request = self.base_request();
                request.gas_price = self.gas_price;
                request.chain_id = self.chain_id.map(U64::from);
                TypedTransaction::Eip2930(Eip2930TransactionRequest::new(
                    request,
                    self.access_list.clone().unwrap_or_default(),
                ))
            }
            TxEnvelope::FeeMarket => {
                let mut request = Eip1559TransactionRequest::new()
                    .nonce(self.nonce)
                    .gas(self.gas_limit)
                    .value(self.value)
                    .data(self.data.clone())
                    .access_list(self.access_list.clone().unwrap_or_default());
                if let Some(to) = self.to {
                    request = request.to(to);
                }
                request.max_fee_per_gas = self.max_fee_per_gas;
                request.max_priority_fee_per_gas = self.max_priority_fee_per_gas;
                request.chain_id = self.chain_id.map(U64::from);
                TypedTransaction::Eip1559(request)
            }
        };

        Ok(typed)
    }

    /// Rebuild from a decoded `ethers-core` typed transaction
    pub fn from_typed(typed: &TypedTransaction) -> KeylessResult<Self> {
        let tx = match typed {
            TypedTransaction::Legacy(request) => Self {
                envelope: TxEnvelope::Legacy,
                chain_id: request.chain_id.map(|id| id.as_u64()),
                nonce: u256_to_u64(request.nonce.unwrap_or_default(), "nonce")?,
                gas_limit: request.gas.unwrap_or_default(),
                gas_price: Some(request.gas_price.unwrap_or_default()),
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
                to: recipient(request.to.as_ref()),
                value: request.value.unwrap_or_default(),
                data: request.data.as_ref().map(|d| d.to_vec()).unwrap_or_default(),
                access_list: None,
            },
            TypedTransaction::Eip2930(inner) => {
                let request = &inner.tx;
                Self {
                    envelope: TxEnvelope::AccessList,
                    chain_id: request.chain_id.map(|id| id.as_u64()),
                    nonce: u256_to_u64(request.nonce.unwrap_or_default(), "nonce")?,
                    gas_limit: request.gas.unwrap_or_default(),
                    gas_price: Some(request.gas_price.unwrap_or_default()),
                    max_fee_per_gas: None,
                    max_priority_fee_per_gas: None,
                    to: recipient(request.to.as_ref()),
                    value: request.value.unwrap_or_default(),
                    data: request.data.as_ref().map(|d| d.to_vec()).unwrap_or_default(),
                    access_list: non_empty(&inner.access_list),
                }
            }
            TypedTransaction::Eip1559(request) => Self {
                envelope: TxEnvelope::FeeMarket,
                chain_id: request.chain_id.map(|id| id.as_u64()),
                nonce: u256_to_u64(request.nonce.unwrap_or_default(), "nonce")?,
                gas_limit: request.gas.unwrap_or_default(),
                gas_price: None,
                max_fee_per_gas: Some(request.max_fee_per_gas.unwrap_or_default()),
                max_priority_fee_per_gas: Some(request.max_priority_fee_per_gas.unwrap_or_default()),
                to: recipient(request.to.as_ref()),
                value: request.value.unwrap_or_default(),
                data: request.data.as_ref().map(|d| d.to_vec()).unwrap_or_default(),
                access_list: non_empty(&request.access_list),
            },
            #[allow(unreachable_patterns)]
            _ => {
                return Err(KeylessError::InvalidTransaction(
                    "unsupported transaction envelope".to_string(),
                ))
            }
        };
        Ok(tx)
    }

    fn base_request(&self) -> TransactionRequest {
        let mut request = TransactionRequest::new()
            .nonce(self.nonce)
            .gas(self.gas_limit)
            .value(self.value)
            .data(self.data.clone());
        if let Some(to) = self.to {
            request = request.to(to);
        }
        request
    }
}

fn reject_field(envelope: &'static str, field: &'static str, present: bool) -> KeylessResult<()> {
    if present {
        return Err(KeylessError::UnexpectedField { envelope, field });
    }
    Ok(())
}

/// The encoding cannot tell an empty list from a missing one
fn reject_empty_access_list(list: Option<&AccessList>) -> KeylessResult<()> {
    match list {
        Some(list) if list.0.is_empty() => Err(KeylessError::InvalidTransaction(
            "accessList is empty; omit it instead".to_string(),
        )),
        _ => Ok(()),
    }
}

fn recipient(to: Option<&NameOrAddress>) -> Option<Address> {
    match to {
        Some(NameOrAddress::Address(address)) => Some(*address),
        _ => None,
    }
}

fn non_empty(list: &AccessList) -> Option<AccessList> {
    if list.0.is_empty() {
        None
    } else {
        Some(list.clone())
    }
}

fn u256_to_u64(value: U256, field: &'static str) -> KeylessResult<u64> {
    if value > U256::from(u64::MAX) {
        return Err(KeylessError::InvalidTransaction(format!(
            "{} {} does not fit in 64 bits",
            field, value
        )));
    }
    Ok(value.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_requires_gas_price() {
        let tx = UnsignedTransaction {
            gas_limit: U256::from(21_000),
            ..Default::default()
        };
        assert_eq!(tx.validate(), Err(KeylessError::MissingField("gasPrice")));
    }

    #[test]
    fn test_legacy_rejects_fee_market_fields() {
        let mut tx = UnsignedTransaction::legacy(0, U256::from(1), U256::from(21_000));
        tx.max_fee_per_gas = Some(U256::from(2));
        assert!(matches!(
            tx.validate(),
            Err(KeylessError::UnexpectedField { field: "maxFeePerGas", .. })
        ));
    }

    #[test]
    fn test_fee_market_priority_above_max_fee() {
        let tx = UnsignedTransaction::fee_market(1, 0, U256::from(10), U256::from(11), U256::from(21_000));
        assert!(matches!(tx.validate(), Err(KeylessError::InvalidTransaction(_))));
    }

    #[test]
    fn test_typed_envelopes_require_chain_id() {
        let mut tx = UnsignedTransaction::fee_market(1, 0, U256::from(10), U256::from(1), U256::from(21_000));
        tx.chain_id = None;
        assert_eq!(tx.validate(), Err(KeylessError::MissingField("chainId")));
    }

    #[test]
    fn test_legacy_zero_chain_id_rejected() {
        let tx = UnsignedTransaction::legacy(0, U256::from(1), U256::from(21_000)).with_chain_id(0);
        assert!(matches!(tx.validate(), Err(KeylessError::InvalidTransaction(_))));

        let unprotected = UnsignedTransaction::legacy(0, U256::from(1), U256::from(21_000));
        assert!(matches!(
            unprotected.to_typed().unwrap(),
            TypedTransaction::Legacy(ref r) if r.chain_id.is_none()
        ));
    }

    #[test]
    fn test_empty_access_list_is_absent() {
        let tx = UnsignedTransaction::access_list_tx(1, 0, U256::from(1), U256::from(21_000))
            .with_access_list(AccessList(vec![]));
        assert_eq!(tx.access_list, None);
        assert!(tx.validate().is_ok());

        let mut direct = tx.clone();
        direct.access_list = Some(AccessList(vec![]));
        assert!(matches!(direct.validate(), Err(KeylessError::InvalidTransaction(_))));

        let json = r#"{"type": "eip2930", "chainId": 1, "gasLimit": "21000", "gasPrice": "1", "accessList": []}"#;
        let parsed: UnsignedTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_list, None);
    }

    #[test]
    fn test_fee_market_rejects_gas_price() {
        let mut tx = UnsignedTransaction::fee_market(1, 0, U256::from(10), U256::from(1), U256::from(21_000));
        tx.gas_price = Some(U256::from(10));
        assert!(matches!(
            tx.validate(),
            Err(KeylessError::UnexpectedField { field: "gasPrice", .. })
        ));
    }

    #[test]
    fn test_typed_roundtrip_through_ethers() {
        let tx = UnsignedTransaction::fee_market(
            43114,
            7,
            U256::from(30_000_000_000u64),
            U256::from(1_500_000_000u64),
            U256::from(60_000),
        )
        .with_to(Address::repeat_byte(0x11))
        .with_value(U256::from(5))
        .with_data(vec![0xa9, 0x05, 0x9c, 0xbb]);

        let typed = tx.to_typed().unwrap();
        assert_eq!(UnsignedTransaction::from_typed(&typed).unwrap(), tx);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "type": "eip1559",
            "chainId": "0xa86a",
            "nonce": 3,
            "gasLimit": "21000",
            "maxFeePerGas": "0x6fc23ac00",
            "maxPriorityFeePerGas": "1500000000",
            "to": "0x1111111111111111111111111111111111111111",
            "value": "0x1",
            "data": "0x"
        }"#;
        let tx: UnsignedTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.envelope, TxEnvelope::FeeMarket);
        assert_eq!(tx.chain_id, Some(43114));
        assert_eq!(tx.max_fee_per_gas, Some(U256::from(30_000_000_000u64)));
        assert!(tx.data.is_empty());
        assert!(tx.validate().is_ok());
    }
}
