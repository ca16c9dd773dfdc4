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

//! Wallet signatures verification.
//!
//! The requests pool only needs to know whether a message has been signed by
//! the owner of a wallet address, the way this is established is up to the
//! implementor of `SignatureVerifier`.

use crate::crypto::ed25519::PublicKey;

/// Capability to check a wallet signature over a text message.
pub trait SignatureVerifier: Send + Sync + 'static {
    /// Returns true if `signature` is a valid signature of `message` produced
    /// by the key owning `address`.
    fn verify(&self, message: &str, address: &str, signature: &str) -> bool;
}

/// Verifier for Ed25519 account ids.
///
/// The public key is recovered from the address itself while the signature
/// is expected as a hex string over the UTF-8 message bytes.
#[derive(Default, Clone, Copy)]
pub struct AccountVerifier;

impl SignatureVerifier for AccountVerifier {
    fn verify(&self, message: &str, address: &str, signature: &str) -> bool {
        let public_key = match PublicKey::from_account_id(address) {
            Ok(key) => key,
            Err(err) => {
                debug!("cannot recover key from '{}': {}", address, err.to_string_full());
                return false;
            }
        };
        match hex::decode(signature) {
            Ok(sig) => public_key.verify(message.as_bytes(), &sig),
            Err(_) => false,
        }
    }
}
