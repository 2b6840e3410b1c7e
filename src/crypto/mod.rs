//! Cryptographic Operations Module
//!
//! This module handles the mint authority key used by the mock verification
//! network and the hashing rules shared by the SDK and the gateway contracts:
//! payload hashes, selector hashes, nonce hashes and the signature hash a
//! gateway checks before minting or releasing.
//!
//! Signatures follow the EVM convention: the message hash is wrapped with the
//! `"\x19Ethereum Signed Message:\n32"` prefix, signed with secp256k1, and
//! returned as 65 bytes `r || s || v` with `v` in {27, 28}.

use anyhow::{Context, Result};
use ethereum_types::{Address, H256, U256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::Rng;
use sha3::{Digest, Keccak256};

use crate::abi::{self, Token};

// ============================================================================
// HASHING
// ============================================================================

/// Keccak-256 of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    H256::from_slice(&hasher.finalize())
}

/// Applies the Ethereum signed message prefix to a 32-byte hash.
///
/// keccak256("\x19Ethereum Signed Message:\n32" || hash)
pub fn eth_signed_message_hash(hash: &H256) -> H256 {
    let prefix = b"\x19Ethereum Signed Message:\n32";
    let mut prefixed_message = Vec::with_capacity(prefix.len() + 32);
    prefixed_message.extend_from_slice(prefix);
    prefixed_message.extend_from_slice(hash.as_bytes());
    keccak256(prefixed_message)
}

/// Selector hash binding a signature to one asset and one destination chain.
///
/// keccak256("<ASSET>/to<Chain>"), e.g. "BTC/toEthereum"
pub fn selector_hash(asset: &str, to_chain: &str) -> H256 {
    keccak256(format!("{}/to{}", asset, to_chain))
}

/// Payload hash of the non-RenVM parameters of a contract call.
pub fn payload_hash(params: &[Token]) -> H256 {
    keccak256(abi::encode(params))
}

/// Nonce hash identifying one specific deposit or source transaction.
pub fn nonce_hash(nonce: &H256, txid: &H256, index: u64) -> H256 {
    keccak256(abi::encode(&[
        Token::FixedBytes(*nonce),
        Token::FixedBytes(*txid),
        Token::Uint(U256::from(index)),
    ]))
}

/// Gateway hash from which a UTXO deposit address is derived.
pub fn gateway_hash(p_hash: &H256, s_hash: &H256, to: &Address, nonce: &H256) -> H256 {
    keccak256(abi::encode(&[
        Token::FixedBytes(*p_hash),
        Token::FixedBytes(*s_hash),
        Token::Address(*to),
        Token::FixedBytes(*nonce),
    ]))
}

/// Hash signed by the mint authority and checked by mint/lock gateways.
///
/// keccak256(abi.encode(pHash, amount, selectorHash, to, nHash))
pub fn signature_hash(
    p_hash: &H256,
    amount: U256,
    selector_hash: &H256,
    to: &Address,
    n_hash: &H256,
) -> H256 {
    keccak256(abi::encode(&[
        Token::FixedBytes(*p_hash),
        Token::Uint(amount),
        Token::FixedBytes(*selector_hash),
        Token::Address(*to),
        Token::FixedBytes(*n_hash),
    ]))
}

// ============================================================================
// ADDRESS DERIVATION
// ============================================================================

/// Derives the Ethereum address of a secp256k1 public key.
///
/// keccak256(uncompressed_public_key[1..])[12..32]
pub fn address_from_verifying_key(verifying_key: &VerifyingKey) -> Address {
    let public_key_point = verifying_key.to_encoded_point(false);
    // Skip the 0x04 uncompressed point indicator
    let hash = keccak256(&public_key_point.as_bytes()[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}

/// Recovers the address that produced `signature` over the EIP-191 wrapped `hash`.
pub fn recover_signer(hash: &H256, signature: &[u8]) -> Result<Address> {
    if signature.len() != 65 {
        return Err(anyhow::anyhow!(
            "Invalid signature length: expected 65 bytes, got {}",
            signature.len()
        ));
    }

    let v = signature[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| anyhow::anyhow!("Invalid recovery id: {}", v))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| anyhow::anyhow!("Malformed signature: {}", e))?;

    let prefixed = eth_signed_message_hash(hash);
    let verifying_key = VerifyingKey::recover_from_prehash(prefixed.as_bytes(), &sig, recovery_id)
        .map_err(|e| anyhow::anyhow!("Failed to recover signer: {}", e))?;

    Ok(address_from_verifying_key(&verifying_key))
}

// ============================================================================
// MINT AUTHORITY
// ============================================================================

/// Secp256k1 key that attests cross-chain transfers.
///
/// Gateways only mint or release when the signature over the transfer's
/// signature hash recovers to this key's address.
#[derive(Clone)]
pub struct MintAuthority {
    signing_key: SigningKey,
}

impl std::fmt::Debug for MintAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintAuthority")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl MintAuthority {
    /// Generates a fresh key from the OS random number generator.
    pub fn random() -> Result<Self> {
        let mut rng = rand::rngs::OsRng;
        let mut secret_key_bytes = [0u8; 32];
        rng.fill(&mut secret_key_bytes);
        Self::from_bytes(&secret_key_bytes)
    }

    /// Creates the authority from raw 32-byte secret key material.
    pub fn from_bytes(secret_key_bytes: &[u8]) -> Result<Self> {
        if secret_key_bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                secret_key_bytes.len()
            ));
        }
        let signing_key = SigningKey::from_slice(secret_key_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;
        Ok(Self { signing_key })
    }

    /// Creates the authority from a hex encoded secret key (with or without 0x).
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let bytes = hex::decode(key_hex).context("Invalid mint authority key hex")?;
        Self::from_bytes(&bytes)
    }

    /// Hex encoded secret key with 0x prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    /// Ethereum address of the authority (what gateways compare against).
    pub fn address(&self) -> Address {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// Signs `hash` with the EIP-191 prefix and returns `r || s || v`.
    pub fn sign(&self, hash: &H256) -> Result<Vec<u8>> {
        let prefixed = eth_signed_message_hash(hash);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prefixed.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to sign precomputed hash: {}", e))?;

        let mut final_sig = Vec::with_capacity(65);
        final_sig.extend_from_slice(&signature.to_bytes());
        // Convert recovery ID to Ethereum format (27 or 28)
        final_sig.push(recovery_id.to_byte() + 27);
        Ok(final_sig)
    }
}
