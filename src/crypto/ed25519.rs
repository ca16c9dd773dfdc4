// This file is part of STAR REGISTRY.
//
// Copyright (C) 2021 Affidaty Spa.
//
// STAR REGISTRY is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// STAR REGISTRY is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with STAR REGISTRY. If not, see <https://www.gnu.org/licenses/>.

use crate::{Error, ErrorKind, Result};
use ed25519_dalek::{
    Keypair as KeyPairImpl, PublicKey as PublicKeyImpl, Signer as _, Verifier as _,
    PUBLIC_KEY_LENGTH,
};
use rand::rngs::OsRng;
use std::convert::TryFrom;

/// Multihash "identity" algorithm tag.
const MULTIHASH_TYPE_IDENTITY: u8 = 0x00;

/// Protobuf header preceding the raw public key within an account id.
#[rustfmt::skip]
const PROTOBUF_HEADER: [u8; 4] = [
    // Algorithm type tag.
    0x08,
    // Ed25519.
    0x01,
    // Length tag.
    0x12,
    // Payload length.
    PUBLIC_KEY_LENGTH as u8,
];

pub struct KeyPair(KeyPairImpl);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    imp: PublicKeyImpl,
}

impl KeyPair {
    pub fn from_bytes(bytes: &[u8]) -> Result<KeyPair> {
        let internal = KeyPairImpl::from_bytes(bytes)
            .map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))?;
        Ok(KeyPair(internal))
    }

    pub fn from_random() -> KeyPair {
        let mut csprng = OsRng {};
        let internal = KeyPairImpl::generate(&mut csprng);
        KeyPair(internal)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let sig = self.0.sign(data).to_bytes().to_vec();
        Ok(sig)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey { imp: self.0.public }
    }
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey> {
        let internal = PublicKeyImpl::from_bytes(bytes)
            .map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))?;
        Ok(PublicKey { imp: internal })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.imp.to_bytes().to_vec()
    }

    pub fn verify(&self, data: &[u8], sig: &[u8]) -> bool {
        ed25519_dalek::Signature::try_from(sig)
            .and_then(|s| self.imp.verify(data, &s))
            .is_ok()
    }

    /// Wallet address: base58 of the identity multihash wrapping the
    /// protobuf encoded public key.
    pub fn to_account_id(&self) -> String {
        let mut buf = Vec::with_capacity(2 + PROTOBUF_HEADER.len() + PUBLIC_KEY_LENGTH);
        buf.push(MULTIHASH_TYPE_IDENTITY);
        buf.push((PROTOBUF_HEADER.len() + PUBLIC_KEY_LENGTH) as u8);
        buf.extend_from_slice(&PROTOBUF_HEADER);
        buf.extend_from_slice(self.imp.as_bytes());
        bs58::encode(buf).into_string()
    }

    /// Recovers the public key embedded into a wallet address.
    pub fn from_account_id(id: &str) -> Result<PublicKey> {
        let buf = bs58::decode(id)
            .into_vec()
            .map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))?;
        let payload_len = PROTOBUF_HEADER.len() + PUBLIC_KEY_LENGTH;
        if buf.len() != 2 + payload_len
            || buf[0] != MULTIHASH_TYPE_IDENTITY
            || buf[1] as usize != payload_len
            || buf[2..6] != PROTOBUF_HEADER
        {
            return Err(Error::new_ext(
                ErrorKind::MalformedData,
                "not an ed25519 account id",
            ));
        }
        PublicKey::from_bytes(&buf[6..])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const ED25519_BYTES_HEX: &str = "5fe6fc0f9274651d278798a4d86d9395ffdf4eff7361876f72201a130befb2c9587b8d516e9605a6ee57a19e2734f1ab3bb8b45e6062801dff3e6408d8594063";
    pub const ED25519_ACCOUNT_ID: &str = "12D3KooWFmmKJ7jXhTfoYDvKkPqe7s9pHH42iZdf2xRdM5ykma1p";

    pub fn ed25519_test_keypair() -> KeyPair {
        let bytes = hex::decode(ED25519_BYTES_HEX).unwrap();
        KeyPair::from_bytes(&bytes).unwrap()
    }

    pub fn ed25519_test_public_key() -> PublicKey {
        ed25519_test_keypair().public_key()
    }

    #[test]
    fn ed25519_to_account_id() {
        let public_key = ed25519_test_public_key();

        let account_id = public_key.to_account_id();

        assert_eq!(account_id, ED25519_ACCOUNT_ID);
    }

    #[test]
    fn ed25519_from_account_id() {
        let public_key = PublicKey::from_account_id(ED25519_ACCOUNT_ID).unwrap();

        assert_eq!(public_key, ed25519_test_public_key());
    }

    #[test]
    fn ed25519_from_bad_account_id() {
        let err = PublicKey::from_account_id("QmYHnEQLdf5h7KYbjFPuHSRk2SPgdXrJWFh5W696HPfq7i")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedData);

        let err = PublicKey::from_account_id("0OIl").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedData);
    }

    #[test]
    fn ed25519_keypair_random_generation_sign_test() {
        let keypair = KeyPair::from_random();
        let data = b"hello world";

        let sign = keypair.sign(data).unwrap();

        assert!(keypair.public_key().verify(data, &sign));
        assert!(!keypair.public_key().verify(b"hello there", &sign));
    }

    #[test]
    fn ed25519_verify_truncated_signature() {
        let keypair = ed25519_test_keypair();
        let data = b"hello world";
        let sign = keypair.sign(data).unwrap();

        assert!(!keypair.public_key().verify(data, &sign[..32]));
    }
}
