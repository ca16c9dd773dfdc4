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

//! Star registry: the admission gate coupling the requests pool with the
//! chain ledger.
//!
//! A block is appended only on behalf of an address owning a signed request.
//! The request is consumed only after the block has been stored, a failed
//! append leaves it signed and the registrant can retry the submission.

use crate::{
    base::{
        schema::{SignatureValidation, TamperReport, ValidationRequest},
        Block, Mutex,
    },
    blockchain::{
        ledger::Ledger,
        pool::{Pool, DEFAULT_VALIDATION_WINDOW},
    },
    crypto::AccountVerifier,
    db::Db,
    Result,
};
#[cfg(feature = "with-rocksdb")]
use crate::db::RocksDb;
use serde_json::Value;
use std::sync::Arc;

/// Star registry configuration.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Seconds a pending request lives before being discarded.
    pub validation_window: u64,
    /// Blocks store location, used by persistent backends.
    pub db_path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            validation_window: DEFAULT_VALIDATION_WINDOW,
            db_path: "db".to_owned(),
        }
    }
}

/// Registry data, cheap to clone and shareable between threads.
pub struct StarRegistry<D: Db> {
    /// Chain ledger.
    ledger: Ledger<D>,
    /// Pending registration requests.
    pool: Arc<Pool>,
    /// Serializes the check-append-consume sequence.
    admission: Arc<Mutex<()>>,
}

impl<D: Db> Clone for StarRegistry<D> {
    fn clone(&self) -> Self {
        StarRegistry {
            ledger: self.ledger.clone(),
            pool: self.pool.clone(),
            admission: self.admission.clone(),
        }
    }
}

#[cfg(feature = "with-rocksdb")]
impl StarRegistry<RocksDb> {
    /// Opens a registry backed by a RocksDB store at `config.db_path`.
    pub fn open(config: &RegistryConfig) -> Result<Self> {
        let db = RocksDb::new(&config.db_path)?;
        Ok(Self::new(config, db))
    }
}

impl<D: Db> StarRegistry<D> {
    /// Creates a registry verifying Ed25519 account signatures.
    pub fn new(config: &RegistryConfig, db: D) -> Self {
        let pool = Pool::new(config.validation_window, AccountVerifier);
        Self::with_pool(db, pool)
    }

    /// Creates a registry with a custom requests pool.
    pub fn with_pool(db: D, pool: Pool) -> Self {
        StarRegistry {
            ledger: Ledger::new(db),
            pool: Arc::new(pool),
            admission: Arc::new(Mutex::new(())),
        }
    }

    pub fn ledger(&self) -> &Ledger<D> {
        &self.ledger
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> Result<u64> {
        self.ledger.height()
    }

    pub fn get_block(&self, height: u64) -> Result<Block> {
        self.ledger.get_block(height)
    }

    /// Same as `get_block`, with the star story decoded for display.
    pub fn get_block_decoded(&self, height: u64) -> Result<Block> {
        self.ledger.get_block(height).map(Block::with_decoded_story)
    }

    pub fn request_validation(&self, address: &str) -> Result<ValidationRequest> {
        self.pool.request_validation(address)
    }

    pub fn validate_signature(&self, address: &str, signature: &str) -> Result<SignatureValidation> {
        self.pool.validate_signature(address, signature)
    }

    /// Appends a block carrying `body` on behalf of `address`.
    ///
    /// # Errors
    ///
    /// - `NoSuchRequest` or `NotSigned` if the address is not admitted, the
    ///   ledger is not touched.
    /// - Any ledger error, the request is left signed.
    pub fn submit_block(&self, address: &str, body: Value) -> Result<Block> {
        let _guard = self.admission.lock();

        self.pool.assert_signed(address)?;
        let block = self.ledger.append(Block::new(body)).map_err(|err| {
            warn!("block submission for {} failed: {}", address, err.to_string_full());
            err
        })?;
        self.pool.consume(address);

        info!("star registered by {} at height {}", address, block.height);
        Ok(block)
    }

    /// Block with the given fingerprint, story decoded.
    pub fn find_by_hash(&self, hash: &str) -> Result<Block> {
        self.ledger.find_by_hash(hash).map(Block::with_decoded_story)
    }

    /// Blocks registered by the given address, stories decoded.
    pub fn find_by_address(&self, address: &str) -> Result<Vec<Block>> {
        let blocks = self.ledger.find_by_address(address)?;
        Ok(blocks.into_iter().map(Block::with_decoded_story).collect())
    }

    pub fn validate_chain(&self) -> Result<Vec<TamperReport>> {
        self.ledger.validate_chain()
    }
}
