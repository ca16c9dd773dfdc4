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

use std::path::Path;

use crate::{
    base::{
        schema::Block,
        serialize::{rmp_deserialize, rmp_serialize},
    },
    db::Db,
    Error, ErrorKind, Result,
};
use merkledb::{
    access::CopyAccessExt, BinaryValue, Database, DbOptions, MapIndex, RocksDB, Snapshot,
    _reexports::Error as MisteryError,
};
use std::borrow::Cow;

impl BinaryValue for Block {
    fn to_bytes(&self) -> Vec<u8> {
        rmp_serialize(self).unwrap() // Safe for blocks.
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> std::result::Result<Self, MisteryError> {
        rmp_deserialize(bytes.as_ref()).map_err(|err| err.into())
    }
}

const BLOCKS: &str = "blocks";

/// Database implementation using rocks db.
///
/// Blocks live in a map indexed by height. Heights are encoded big-endian
/// thus the map iteration order is the chain order.
///
/// Only open and write failures are reported as `DatabaseFault`. The merkledb
/// index readers panic on a stored value that fails to decode, and so does
/// the block encoding on write.
pub struct RocksDb {
    /// Backend implementing the `Database` trait (defined by merkledb crate).
    backend: RocksDB,
    /// Last state read-only snapshot.
    snap: Box<dyn Snapshot>,
}

impl RocksDb {
    /// Create/Open a database from the filesystem.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options = DbOptions::default();
        let backend = RocksDB::open(path, &options)
            .map_err(|err| Error::new_ext(ErrorKind::DatabaseFault, err))?;
        let snap = backend.snapshot();
        Ok(RocksDb { backend, snap })
    }
}

impl Db for RocksDb {
    fn load_block(&self, height: u64) -> Result<Option<Block>> {
        let map: MapIndex<_, u64, Block> = self.snap.get_map(BLOCKS);
        Ok(map.get(&height))
    }

    /// Insert or replace a block.
    /// The write is applied through a dedicated fork that is merged right
    /// away, readers keep seeing the previous snapshot until the merge is done.
    fn store_block(&mut self, height: u64, block: &Block) -> Result<()> {
        let fork = self.backend.fork();
        {
            let mut map: MapIndex<_, u64, Block> = fork.get_map(BLOCKS);
            map.put(&height, block.clone());
        }
        self.backend
            .merge(fork.into_patch())
            .map_err(|err| Error::new_ext(ErrorKind::DatabaseFault, err))?;
        self.snap = self.backend.snapshot();
        Ok(())
    }

    fn blocks_count(&self) -> Result<u64> {
        let map: MapIndex<_, u64, Block> = self.snap.get_map(BLOCKS);
        Ok(map.keys().count() as u64)
    }

    fn blocks_heights(&self) -> Result<Vec<u64>> {
        let map: MapIndex<_, u64, Block> = self.snap.get_map(BLOCKS);
        Ok(map.keys().collect())
    }

    fn blocks(&self) -> Result<Vec<(u64, Block)>> {
        let map: MapIndex<_, u64, Block> = self.snap.get_map(BLOCKS);
        Ok(map.iter().collect())
    }
}
