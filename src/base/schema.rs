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

//! Data structures shared by the ledger, the requests pool and the
//! outer service layers.

use crate::{base::timestamp, Error, ErrorKind, Result};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Body of the block at height zero.
pub const GENESIS_BODY: &str = "First block in the chain - Genesis Block";

/// Ledger block.
///
/// The `hash` field holds the block fingerprint (see `blockchain::codec`) and
/// is empty until the block is sealed by the ledger.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block fingerprint, lowercase hex.
    pub hash: String,
    /// Index in the blockchain, which is also the number of ancestors blocks.
    pub height: u64,
    /// Opaque block content.
    pub body: Value,
    /// Creation time, seconds since the unix epoch.
    pub time: u64,
    /// Fingerprint of the block at `height - 1`. Empty for genesis.
    pub previous_block_hash: String,
}

impl Block {
    /// Unsealed block carrying `body`, timestamped now.
    pub fn new(body: Value) -> Self {
        Block {
            hash: String::new(),
            height: 0,
            body,
            time: timestamp(),
            previous_block_hash: String::new(),
        }
    }

    /// Unsealed genesis block.
    pub fn genesis() -> Self {
        Block::new(Value::String(GENESIS_BODY.to_owned()))
    }

    /// Wallet address the block has been registered by, if any.
    pub fn address(&self) -> Option<&str> {
        self.body.get("address").and_then(Value::as_str)
    }

    /// Returns a copy of the block with `body.star.storyDecoded` holding the
    /// plain text story. Genesis is returned untouched.
    ///
    /// The decoded copy is meant for display only and must never be stored.
    pub fn with_decoded_story(mut self) -> Self {
        if self.height == 0 {
            return self;
        }
        let star = match self.body.get_mut("star").and_then(Value::as_object_mut) {
            Some(star) => star,
            None => return self,
        };
        let decoded = star
            .get("story")
            .and_then(Value::as_str)
            .map(hex::decode);
        match decoded {
            Some(Ok(buf)) => {
                let story = String::from_utf8_lossy(&buf).into_owned();
                star.insert("storyDecoded".to_owned(), Value::String(story));
            }
            Some(Err(err)) => warn!("block {}: story is not hex encoded ({})", self.height, err),
            None => (),
        }
        self
    }
}

/// Star coordinates and story, as submitted by a registrant.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Star {
    /// Right ascension.
    pub ra: String,
    /// Declination.
    pub dec: String,
    /// Magnitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag: Option<String>,
    /// Constellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cen: Option<String>,
    /// Story, plain text on submission and hex-encoded once in a block body.
    pub story: String,
}

/// Star registration submitted for an address.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct StarRequest {
    pub address: String,
    pub star: Star,
}

impl StarRequest {
    /// Checks the mandatory fields are not blank.
    pub fn check(&self) -> Result<()> {
        let blank = [
            ("address", &self.address),
            ("star.ra", &self.star.ra),
            ("star.dec", &self.star.dec),
            ("star.story", &self.star.story),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());
        match blank {
            Some((field, _)) => Err(Error::new_ext(
                ErrorKind::MalformedData,
                format!("missing {}", field),
            )),
            None => Ok(()),
        }
    }

    /// Block body for this registration: the story is stored hex-encoded.
    pub fn into_body(self) -> Result<Value> {
        let StarRequest { address, mut star } = self;
        star.story = hex::encode(star.story.as_bytes());
        let star = serde_json::to_value(star)
            .map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))?;
        Ok(serde_json::json!({
            "address": address,
            "star": star,
        }))
    }
}

/// Kind of integrity violation.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TamperKind {
    /// Stored fingerprint differs from the recomputed one.
    Fingerprint,
    /// Stored previous fingerprint differs from the predecessor fingerprint.
    Linkage,
}

/// Integrity violation detected at a given height.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct TamperReport {
    pub height: u64,
    pub kind: TamperKind,
    /// Value the field should hold.
    pub expected: String,
    /// Value actually stored.
    pub actual: String,
}

impl Display for TamperReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TamperKind::Fingerprint => write!(
                f,
                "Block {} is invalid. Expected hash {} but got {}",
                self.height, self.expected, self.actual
            ),
            TamperKind::Linkage => write!(
                f,
                "Block {} is not linked. Expected previous hash {} but got {}",
                self.height, self.expected, self.actual
            ),
        }
    }
}

impl std::error::Error for TamperReport {}

/// Pending request as returned to the registrant.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub wallet_address: String,
    pub request_time_stamp: u64,
    /// Text the registrant shall sign with the wallet key.
    pub message: String,
    /// Seconds left before the request expires.
    pub validation_window: i64,
}

/// Status of a request once the signature has been checked.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatus {
    pub address: String,
    pub request_time_stamp: u64,
    pub message: String,
    pub validation_window: i64,
    pub message_signature: bool,
}

/// Successful signature validation outcome.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignatureValidation {
    pub register_star: bool,
    pub status: ValidationStatus,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde_json::json;

    pub const TEST_ADDRESS: &str = "QmYHnEQLdf5h7KYbjFPuHSRk2SPgdXrJWFh5W696HPfq7i";

    pub fn create_test_star_request(address: &str) -> StarRequest {
        StarRequest {
            address: address.to_owned(),
            star: Star {
                ra: "16h 29m 1.0s".to_owned(),
                dec: "-26° 29' 24.9".to_owned(),
                mag: None,
                cen: None,
                story: "Found star using https://www.google.com/sky/".to_owned(),
            },
        }
    }

    pub fn create_test_block(height: u64) -> Block {
        let body = create_test_star_request(TEST_ADDRESS).into_body().unwrap();
        Block {
            hash: String::new(),
            height,
            body,
            time: 1_532_296_234,
            previous_block_hash: String::new(),
        }
    }

    #[test]
    fn block_json_field_names() {
        let block = create_test_block(3);

        let value = serde_json::to_value(&block).unwrap();

        let fields: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            fields,
            ["body", "hash", "height", "previousBlockHash", "time"]
        );
    }

    #[test]
    fn block_address() {
        let block = create_test_block(1);

        assert_eq!(block.address(), Some(TEST_ADDRESS));
        assert_eq!(Block::genesis().address(), None);
    }

    #[test]
    fn star_story_is_hex_encoded() {
        let req = create_test_star_request(TEST_ADDRESS);

        let body = req.into_body().unwrap();

        assert_eq!(
            body["star"]["story"],
            json!(hex::encode("Found star using https://www.google.com/sky/"))
        );
        assert!(body["star"].get("mag").is_none());
    }

    #[test]
    fn decoded_story() {
        let block = create_test_block(1).with_decoded_story();

        assert_eq!(
            block.body["star"]["storyDecoded"],
            json!("Found star using https://www.google.com/sky/")
        );
    }

    #[test]
    fn genesis_story_not_decoded() {
        let genesis = Block::genesis();

        let decoded = genesis.clone().with_decoded_story();

        assert_eq!(decoded, genesis);
    }

    #[test]
    fn star_request_missing_field() {
        let mut req = create_test_star_request(TEST_ADDRESS);
        req.star.story = "  ".to_owned();

        let err = req.check().unwrap_err();

        assert_eq!(err.kind, ErrorKind::MalformedData);
        assert_eq!(err.to_string_full(), "malformed data: missing star.story");
    }

    #[test]
    fn star_request_optional_fields() {
        let req: StarRequest = serde_json::from_value(json!({
            "address": TEST_ADDRESS,
            "star": { "ra": "1", "dec": "2", "mag": "4.5", "story": "hi" }
        }))
        .unwrap();

        assert_eq!(req.star.mag.as_deref(), Some("4.5"));
        assert_eq!(req.star.cen, None);
    }

    #[test]
    fn tamper_report_display() {
        let report = TamperReport {
            height: 4,
            kind: TamperKind::Fingerprint,
            expected: "aa".to_owned(),
            actual: "bb".to_owned(),
        };

        assert_eq!(
            report.to_string(),
            "Block 4 is invalid. Expected hash aa but got bb"
        );
    }
}
