//! Minimal Solidity ABI encoding.
//!
//! Only `abi.encode` of a flat parameter list is needed: payload hashes,
//! signature hashes and nonce hashes are all `keccak256(abi.encode(...))`
//! over addresses, words, `bytes32`, `bytes` and `string` values.

use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// A single ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Address(Address),
    Uint(U256),
    FixedBytes(H256),
    Bytes(Vec<u8>),
    String(String),
}

impl Token {
    /// Solidity type name, as used in contract method signatures.
    pub fn type_name(&self) -> &'static str {
        match self {
            Token::Address(_) => "address",
            Token::Uint(_) => "uint256",
            Token::FixedBytes(_) => "bytes32",
            Token::Bytes(_) => "bytes",
            Token::String(_) => "string",
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_fixed_bytes(self) -> Option<H256> {
        match self {
            Token::FixedBytes(h) => Some(h),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Token::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Encodes `tokens` the way `abi.encode(t0, t1, ...)` does.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = 32 * tokens.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(address) => head.extend_from_slice(&address_word(address)),
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::FixedBytes(hash) => head.extend_from_slice(hash.as_bytes()),
            Token::Bytes(bytes) => {
                head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                tail.extend(encode_dynamic(bytes));
            }
            Token::String(s) => {
                head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                tail.extend(encode_dynamic(s.as_bytes()));
            }
        }
    }

    head.extend(tail);
    head
}

/// Big-endian 32-byte word for a uint256.
pub fn uint_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// Left-padded 32-byte word for an address.
pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn encode_dynamic(data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(32 + padded_len);
    out.extend_from_slice(&uint_word(U256::from(data.len())));
    out.extend_from_slice(data);
    out.resize(32 + padded_len, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_static_words() {
        let encoded = encode(&[Token::Uint(U256::from(1u64)), Token::Address(Address::repeat_byte(0xaa))]);
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[31], 1);
        assert_eq!(&encoded[32..44], &[0u8; 12]);
        assert_eq!(&encoded[44..64], &[0xaa; 20]);
    }

    #[test]
    fn test_encode_dynamic_offsets() {
        // abi.encode("BTC", 7) => offset 0x40, value 7, len 3, "BTC" padded
        let encoded = encode(&[Token::String("BTC".to_string()), Token::Uint(U256::from(7u64))]);
        assert_eq!(encoded.len(), 128);
        assert_eq!(encoded[31], 0x40);
        assert_eq!(encoded[63], 7);
        assert_eq!(encoded[95], 3);
        assert_eq!(&encoded[96..99], b"BTC");
        assert!(encoded[99..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_empty_bytes() {
        let encoded = encode(&[Token::Bytes(vec![])]);
        // offset + zero length, no data words
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[31], 0x20);
        assert_eq!(encoded[63], 0);
    }
}
