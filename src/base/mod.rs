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

//! Base types and helpers shared by the whole crate.

pub mod schema;
pub mod serialize;

pub use parking_lot::{Mutex, RwLock};
pub use schema::{Block, Star, StarRequest, TamperKind, TamperReport};

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds elapsed since the unix epoch.
/// Sub-second precision is discarded.
pub fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Time source used by components that compute elapsed windows.
pub trait Clock: Send + Sync + 'static {
    /// Current time in whole seconds since the unix epoch.
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        timestamp()
    }
}
