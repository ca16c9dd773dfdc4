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

//! Block fingerprinting.
//!
//! The fingerprint is the double SHA-256 of the block JSON representation
//! where the `hash` field is forced to the empty string. Fields are emitted in
//! declaration order and body objects with sorted keys, so equal blocks always
//! produce equal fingerprints.

use crate::{
    base::{schema::Block, serialize::json_serialize},
    crypto::double_hash,
    Result,
};
use serde_json::Value;

/// Borrowed view of a block with the fingerprint field cleared.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Unsealed<'a> {
    hash: &'static str,
    height: u64,
    body: &'a Value,
    time: u64,
    previous_block_hash: &'a str,
}

/// Computes the block fingerprint as a lowercase hex string.
/// The current content of `block.hash` does not contribute to the result.
pub fn fingerprint(block: &Block) -> Result<String> {
    let unsealed = Unsealed {
        hash: "",
        height: block.height,
        body: &block.body,
        time: block.time,
        previous_block_hash: &block.previous_block_hash,
    };
    let buf = json_serialize(&unsealed)?;
    Ok(double_hash(&buf).to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::schema::tests::create_test_block;
    use crate::crypto::Hash;
    use serde_json::json;

    #[test]
    fn fingerprint_ignores_hash_field() {
        let mut block = create_test_block(1);
        let first = fingerprint(&block).unwrap();

        block.hash = first.clone();

        assert_eq!(fingerprint(&block).unwrap(), first);
        assert_eq!(fingerprint(&block).unwrap(), first);
    }

    #[test]
    fn fingerprint_is_lowercase_hex_digest() {
        let block = create_test_block(1);

        let digest = fingerprint(&block).unwrap();

        assert_eq!(digest.len(), 64);
        assert_eq!(digest, digest.to_lowercase());
        assert!(Hash::from_hex(&digest).is_ok());
    }

    #[test]
    fn fingerprint_matches_json_double_hash() {
        let block = Block {
            hash: "whatever".to_owned(),
            height: 0,
            body: json!("First block in the chain - Genesis Block"),
            time: 1532296234,
            previous_block_hash: String::new(),
        };
        let json = r#"{"hash":"","height":0,"body":"First block in the chain - Genesis Block","time":1532296234,"previousBlockHash":""}"#;

        let digest = fingerprint(&block).unwrap();

        assert_eq!(digest, double_hash(json.as_bytes()).to_hex());
    }

    #[test]
    fn fingerprint_sensitive_to_every_field() {
        let block = create_test_block(1);
        let reference = fingerprint(&block).unwrap();

        let mut changed = block.clone();
        changed.time += 1;
        assert_ne!(fingerprint(&changed).unwrap(), reference);

        let mut changed = block.clone();
        changed.height += 1;
        assert_ne!(fingerprint(&changed).unwrap(), reference);

        let mut changed = block.clone();
        changed.previous_block_hash = "00".repeat(32);
        assert_ne!(fingerprint(&changed).unwrap(), reference);

        let mut changed = block.clone();
        changed.body["star"]["ra"] = json!("16h 29m 1.1s");
        assert_ne!(fingerprint(&changed).unwrap(), reference);
    }

    #[test]
    fn fingerprint_independent_of_body_keys_order() {
        let mut a = create_test_block(1);
        let mut b = a.clone();
        a.body = serde_json::from_str(r#"{"address":"x","star":{"ra":"1","dec":"2"}}"#).unwrap();
        b.body = serde_json::from_str(r#"{"star":{"dec":"2","ra":"1"},"address":"x"}"#).unwrap();

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }
}
