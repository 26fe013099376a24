//! Argument type tags carried in `MethodCall::datatypes`.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Wire tag of one argument.
///
/// Plain tags pass through re-encoding untouched. `It*` tags are user-encrypted
/// handles that get validated into their ground-truth form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    // Static plain values
    Bool = 0,
    Uint8 = 1,
    Uint16 = 2,
    Uint32 = 3,
    Uint64 = 4,
    Uint128 = 5,
    Uint256 = 6,
    Address = 7,
    Bytes32 = 8,

    // Dynamic plain values
    String = 16,
    Bytes = 17,
    Uint256Array = 18,
    AddressArray = 19,
    Bytes32Array = 20,
    StringArray = 21,

    // User-encrypted inputs
    ItBool = 32,
    ItUint8 = 33,
    ItUint16 = 34,
    ItUint32 = 35,
    ItUint64 = 36,
    ItUint128 = 37,
    ItUint256 = 38,
    ItString = 39,
}

impl DataType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parses a tag, naming the argument index on failure.
    pub fn from_tag(index: usize, tag: u8) -> Result<Self, CodecError> {
        let data_type = match tag {
            0 => Self::Bool,
            1 => Self::Uint8,
            2 => Self::Uint16,
            3 => Self::Uint32,
            4 => Self::Uint64,
            5 => Self::Uint128,
            6 => Self::Uint256,
            7 => Self::Address,
            8 => Self::Bytes32,
            16 => Self::String,
            17 => Self::Bytes,
            18 => Self::Uint256Array,
            19 => Self::AddressArray,
            20 => Self::Bytes32Array,
            21 => Self::StringArray,
            32 => Self::ItBool,
            33 => Self::ItUint8,
            34 => Self::ItUint16,
            35 => Self::ItUint32,
            36 => Self::ItUint64,
            37 => Self::ItUint128,
            38 => Self::ItUint256,
            39 => Self::ItString,
            _ => return Err(CodecError::UnknownDataType { index, tag }),
        };
        Ok(data_type)
    }

    /// Encrypted kind of an `It*` tag.
    pub fn encrypted_kind(self) -> Option<EncryptedKind> {
        match self {
            Self::ItBool => Some(EncryptedKind::Bool),
            Self::ItUint8 => Some(EncryptedKind::Uint8),
            Self::ItUint16 => Some(EncryptedKind::Uint16),
            Self::ItUint32 => Some(EncryptedKind::Uint32),
            Self::ItUint64 => Some(EncryptedKind::Uint64),
            Self::ItUint128 => Some(EncryptedKind::Uint128),
            Self::ItUint256 => Some(EncryptedKind::Uint256),
            Self::ItString => Some(EncryptedKind::String),
            _ => None,
        }
    }

    /// Head words occupied after re-encoding, or `None` for dynamic values.
    pub fn static_words(self) -> Option<usize> {
        match self {
            Self::Bool
            | Self::Uint8
            | Self::Uint16
            | Self::Uint32
            | Self::Uint64
            | Self::Uint128
            | Self::Uint256
            | Self::Address
            | Self::Bytes32 => Some(1),
            Self::ItBool
            | Self::ItUint8
            | Self::ItUint16
            | Self::ItUint32
            | Self::ItUint64
            | Self::ItUint128
            | Self::ItUint256 => self.encrypted_kind().and_then(EncryptedKind::limbs),
            Self::String
            | Self::Bytes
            | Self::Uint256Array
            | Self::AddressArray
            | Self::Bytes32Array
            | Self::StringArray
            | Self::ItString => None,
        }
    }

    pub fn is_dynamic(self) -> bool {
        self.static_words().is_none()
    }
}

/// Width class of a user-encrypted value, shared by the codec and the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptedKind {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uint128,
    Uint256,
    String,
}

impl EncryptedKind {
    /// Domain byte mixed into signatures and ground-truth handles.
    pub fn domain(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 3,
            Self::Uint64 => 4,
            Self::Uint128 => 5,
            Self::Uint256 => 6,
            Self::String => 7,
        }
    }

    /// Fixed ciphertext limb count; strings are variable.
    pub fn limbs(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 => Some(1),
            Self::Uint128 => Some(2),
            Self::Uint256 => Some(4),
            Self::String => None,
        }
    }
}
