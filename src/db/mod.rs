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

use crate::{base::schema::Block, error::*};
#[cfg(test)]
use mockall::automock;

pub mod memory;
#[cfg(feature = "with-rocksdb")]
pub mod rocks;

pub use memory::MemoryDb;
#[cfg(feature = "with-rocksdb")]
pub use rocks::RocksDb;

/// Trait providing access to the blocks store.
///
/// Blocks are keyed by their height. Iteration methods return the entries in
/// ascending height order. Storage faults the backend reports are returned
/// as `DatabaseFault` errors carrying the backend error as source. Backends
/// may still panic on faults their own API doesn't surface (see `RocksDb`).
#[cfg_attr(test, automock)]
pub trait Db: Send + Sync + 'static {
    /// Load block at a given `height` (position in the blockchain).
    fn load_block(&self, height: u64) -> Result<Option<Block>>;

    /// Store `block` using `height` as the key.
    /// An existing entry with the same key is overwritten.
    fn store_block(&mut self, height: u64, block: &Block) -> Result<()>;

    /// Number of stored blocks, computed by a full keys scan.
    fn blocks_count(&self) -> Result<u64>;

    /// Stored heights, in ascending order.
    fn blocks_heights(&self) -> Result<Vec<u64>>;

    /// Stored blocks paired with their height key, in ascending height order.
    fn blocks(&self) -> Result<Vec<(u64, Block)>>;
}
