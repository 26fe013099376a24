//! Incremental construction of a `MethodCall` wire payload.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;

use super::abi::{ItBool, ItString, ItUint128, ItUint16, ItUint256, ItUint32, ItUint64, ItUint8};
use super::selector_of;
use super::types::DataType;
use crate::error::CodecError;
use crate::types::{MethodCall, Selector};

/// Accumulates typed arguments, each stored as its own `abi.encode` output.
///
/// ```ignore
/// let mut builder = MethodCallBuilder::for_signature("add(uint256,uint256,address)", 3);
/// builder.add_uint256(U256::from(12)).add_uint256(U256::from(30)).add_address(owner);
/// let call = builder.build()?;
/// ```
#[derive(Debug, Clone)]
pub struct MethodCallBuilder {
    selector: Selector,
    expected_args: usize,
    data: Vec<u8>,
    datatypes: Vec<u8>,
    datalens: Vec<u64>,
}

impl MethodCallBuilder {
    pub fn new(selector: Selector, expected_args: usize) -> Self {
        Self {
            selector,
            expected_args,
            data: Vec::new(),
            datatypes: Vec::with_capacity(expected_args),
            datalens: Vec::with_capacity(expected_args),
        }
    }

    /// Starts a call for a canonical signature such as `"transfer(address,uint256)"`.
    pub fn for_signature(signature: &str, expected_args: usize) -> Self {
        Self::new(selector_of(signature), expected_args)
    }

    fn push(&mut self, data_type: DataType, encoded: Vec<u8>) -> &mut Self {
        self.datatypes.push(data_type.tag());
        self.datalens.push(encoded.len() as u64);
        self.data.extend_from_slice(&encoded);
        self
    }

    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.push(DataType::Bool, value.abi_encode())
    }

    pub fn add_uint8(&mut self, value: u8) -> &mut Self {
        self.push(DataType::Uint8, U256::from(value).abi_encode())
    }

    pub fn add_uint16(&mut self, value: u16) -> &mut Self {
        self.push(DataType::Uint16, value.abi_encode())
    }

    pub fn add_uint32(&mut self, value: u32) -> &mut Self {
        self.push(DataType::Uint32, value.abi_encode())
    }

    pub fn add_uint64(&mut self, value: u64) -> &mut Self {
        self.push(DataType::Uint64, value.abi_encode())
    }

    pub fn add_uint128(&mut self, value: u128) -> &mut Self {
        self.push(DataType::Uint128, value.abi_encode())
    }

    pub fn add_uint256(&mut self, value: U256) -> &mut Self {
        self.push(DataType::Uint256, value.abi_encode())
    }

    pub fn add_address(&mut self, value: Address) -> &mut Self {
        self.push(DataType::Address, value.abi_encode())
    }

    pub fn add_bytes32(&mut self, value: B256) -> &mut Self {
        self.push(DataType::Bytes32, value.abi_encode())
    }

    pub fn add_string(&mut self, value: &str) -> &mut Self {
        self.push(DataType::String, value.to_owned().abi_encode())
    }

    pub fn add_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.push(DataType::Bytes, Bytes::copy_from_slice(value).abi_encode())
    }

    pub fn add_uint256_array(&mut self, values: &[U256]) -> &mut Self {
        self.push(DataType::Uint256Array, values.to_vec().abi_encode())
    }

    pub fn add_address_array(&mut self, values: &[Address]) -> &mut Self {
        self.push(DataType::AddressArray, values.to_vec().abi_encode())
    }

    pub fn add_bytes32_array(&mut self, values: &[B256]) -> &mut Self {
        self.push(DataType::Bytes32Array, values.to_vec().abi_encode())
    }

    pub fn add_string_array(&mut self, values: &[String]) -> &mut Self {
        self.push(DataType::StringArray, values.to_vec().abi_encode())
    }

    pub fn add_it_bool(&mut self, value: &ItBool) -> &mut Self {
        self.push(DataType::ItBool, value.abi_encode())
    }

    pub fn add_it_uint8(&mut self, value: &ItUint8) -> &mut Self {
        self.push(DataType::ItUint8, value.abi_encode())
    }

    pub fn add_it_uint16(&mut self, value: &ItUint16) -> &mut Self {
        self.push(DataType::ItUint16, value.abi_encode())
    }

    pub fn add_it_uint32(&mut self, value: &ItUint32) -> &mut Self {
        self.push(DataType::ItUint32, value.abi_encode())
    }

    pub fn add_it_uint64(&mut self, value: &ItUint64) -> &mut Self {
        self.push(DataType::ItUint64, value.abi_encode())
    }

    pub fn add_it_uint128(&mut self, value: &ItUint128) -> &mut Self {
        self.push(DataType::ItUint128, value.abi_encode())
    }

    pub fn add_it_uint256(&mut self, value: &ItUint256) -> &mut Self {
        self.push(DataType::ItUint256, value.abi_encode())
    }

    pub fn add_it_string(&mut self, value: &ItString) -> &mut Self {
        self.push(DataType::ItString, value.abi_encode())
    }

    /// Freezes the argument tables.
    pub fn build(self) -> Result<MethodCall, CodecError> {
        if self.datatypes.len() != self.expected_args {
            return Err(CodecError::ArgumentCount {
                expected: self.expected_args,
                found: self.datatypes.len(),
            });
        }
        Ok(MethodCall {
            selector: self.selector,
            data: self.data.into(),
            datatypes: self.datatypes,
            datalens: self.datalens,
        })
    }
}
