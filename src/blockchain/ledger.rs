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

//! Chain ledger.
//!
//! Owns the blocks store and enforces the chain structure: dense heights
//! starting from a lazily created genesis block and every block linked to its
//! predecessor fingerprint.
//!
//! Appends are serialized by the store write lock, which is held for the
//! whole read-top/seal/store sequence. Readers share the read lock thus never
//! observe a partially appended block.

use crate::{
    base::{
        schema::{Block, TamperKind, TamperReport},
        RwLock,
    },
    blockchain::codec::fingerprint,
    db::Db,
    Error, ErrorKind, Result,
};
use std::sync::Arc;

pub struct Ledger<D: Db> {
    /// Instance of a type implementing Database trait.
    db: Arc<RwLock<D>>,
}

impl<D: Db> Clone for Ledger<D> {
    fn clone(&self) -> Self {
        Ledger {
            db: self.db.clone(),
        }
    }
}

impl<D: Db> Ledger<D> {
    /// Constructs a new ledger on top of the given store.
    pub fn new(db: D) -> Self {
        Ledger {
            db: Arc::new(RwLock::new(db)),
        }
    }

    /// Get a shared reference to the database.
    pub fn db_arc(&self) -> Arc<RwLock<D>> {
        self.db.clone()
    }

    /// Number of blocks in the chain, genesis included.
    /// This performs a full scan of the store keys.
    pub fn height(&self) -> Result<u64> {
        self.db.read().blocks_count()
    }

    /// Get block at the given height.
    pub fn get_block(&self, height: u64) -> Result<Block> {
        self.db.read().load_block(height)?.ok_or_else(|| {
            Error::new_ext(
                ErrorKind::ResourceNotFound,
                format!("No block at height {}", height),
            )
        })
    }

    /// Appends a new block to the chain tail and returns the stored block.
    ///
    /// Height, previous block hash and hash of the `block` argument are
    /// overwritten. When the chain is empty the genesis block is stored first.
    ///
    /// The new height follows the top store key. A top block whose `height`
    /// field disagrees with its key is a tamper condition, the append is
    /// refused and nothing is written.
    pub fn append(&self, mut block: Block) -> Result<Block> {
        let mut db = self.db.write();

        let (top_height, top_hash) = match db.blocks_heights()?.last() {
            Some(&height) => {
                let top = db.load_block(height)?.ok_or_else(|| {
                    Error::new_ext(
                        ErrorKind::DatabaseFault,
                        format!("top block {} vanished", height),
                    )
                })?;
                if top.height != height {
                    return Err(Error::new_ext(
                        ErrorKind::BrokenIntegrity,
                        format!("block {} claims height {}", height, top.height),
                    ));
                }
                (height, top.hash)
            }
            None => {
                let mut genesis = Block::genesis();
                genesis.hash = fingerprint(&genesis)?;
                db.store_block(0, &genesis)?;
                info!("genesis block created: {}", genesis.hash);
                (0, genesis.hash)
            }
        };

        block.height = top_height.checked_add(1).ok_or_else(|| {
            Error::new_ext(ErrorKind::Other, "blockchain height overflow")
        })?;
        block.previous_block_hash = top_hash;
        block.hash = fingerprint(&block)?;
        db.store_block(block.height, &block)?;
        debug!("block {} appended: {}", block.height, block.hash);
        Ok(block)
    }

    /// Checks the fingerprint of the block at the given height.
    ///
    /// The link with the previous block is not verified here, a block may
    /// have a consistent fingerprint and still be detached from the chain.
    /// Use `validate_chain` for the full check.
    pub fn validate_block(&self, height: u64) -> Result<()> {
        let block = self.get_block(height)?;
        let expected = fingerprint(&block)?;
        if expected != block.hash {
            let report = TamperReport {
                height,
                kind: TamperKind::Fingerprint,
                expected,
                actual: block.hash,
            };
            return Err(Error::new_ext(ErrorKind::BrokenIntegrity, report));
        }
        Ok(())
    }

    /// Checks the whole chain and returns every integrity violation found, in
    /// ascending height order. An empty list means the chain is valid.
    ///
    /// Each block fingerprint is recomputed and compared with the stored one,
    /// then the stored previous block hash is compared with the recomputed
    /// fingerprint of the predecessor. A missing predecessor is reported as a
    /// broken link with an empty expected value.
    ///
    /// Blocks are identified by their store key, the `height` field is only
    /// covered by the fingerprint.
    pub fn validate_chain(&self) -> Result<Vec<TamperReport>> {
        let blocks = self.db.read().blocks()?;

        let mut reports = vec![];
        let mut previous: Option<(u64, String)> = None;
        for (height, block) in blocks {
            let actual = fingerprint(&block)?;
            if actual != block.hash {
                reports.push(TamperReport {
                    height,
                    kind: TamperKind::Fingerprint,
                    expected: actual.clone(),
                    actual: block.hash.clone(),
                });
            }

            let expected_link = match previous {
                Some((prev, ref hash)) if height > 0 && prev == height - 1 => hash.clone(),
                _ => String::new(),
            };
            if expected_link != block.previous_block_hash {
                reports.push(TamperReport {
                    height,
                    kind: TamperKind::Linkage,
                    expected: expected_link,
                    actual: block.previous_block_hash.clone(),
                });
            }

            previous = Some((height, actual));
        }

        if !reports.is_empty() {
            warn!("chain validation found {} issue(s)", reports.len());
        }
        Ok(reports)
    }

    /// Finds the block with the given fingerprint (linear search).
    pub fn find_by_hash(&self, hash: &str) -> Result<Block> {
        self.db
            .read()
            .blocks()?
            .into_iter()
            .map(|(_, block)| block)
            .find(|block| block.hash.eq_ignore_ascii_case(hash))
            .ok_or_else(|| {
                Error::new_ext(ErrorKind::ResourceNotFound, "No such hash in blockchain")
            })
    }

    /// Collects the blocks registered by the given address (linear search).
    pub fn find_by_address(&self, address: &str) -> Result<Vec<Block>> {
        let blocks = self
            .db
            .read()
            .blocks()?
            .into_iter()
            .map(|(_, block)| block)
            .filter(|block| block.address() == Some(address))
            .collect();
        Ok(blocks)
    }
}
