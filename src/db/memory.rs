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

//! Volatile blocks store.

use crate::{base::schema::Block, db::Db, Result};
use std::collections::BTreeMap;

/// Database implementation keeping blocks in memory.
/// Mostly used by tests and by short lived demo instances.
#[derive(Default)]
pub struct MemoryDb {
    blocks: BTreeMap<u64, Block>,
}

impl MemoryDb {
    pub fn new() -> Self {
        MemoryDb::default()
    }
}

impl Db for MemoryDb {
    fn load_block(&self, height: u64) -> Result<Option<Block>> {
        Ok(self.blocks.get(&height).cloned())
    }

    fn store_block(&mut self, height: u64, block: &Block) -> Result<()> {
        self.blocks.insert(height, block.clone());
        Ok(())
    }

    fn blocks_count(&self) -> Result<u64> {
        Ok(self.blocks.keys().count() as u64)
    }

    fn blocks_heights(&self) -> Result<Vec<u64>> {
        Ok(self.blocks.keys().copied().collect())
    }

    fn blocks(&self) -> Result<Vec<(u64, Block)>> {
        Ok(self
            .blocks
            .iter()
            .map(|(height, block)| (*height, block.clone()))
            .collect())
    }
}
