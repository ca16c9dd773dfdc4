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

//! Star registry blockchain components.
//!
//! - codec: block fingerprint computation.
//! - ledger: append-only chain of hash-linked blocks on top of a `Db`.
//! - pool: pending registration requests with expiring validation windows.
//! - registry: admission gate, appends blocks only for signed requests.
//!
//! External components interact with the `StarRegistry`, the other types are
//! exposed for finer grained usage.

pub mod codec;
pub mod ledger;
pub mod pool;
pub mod registry;

pub use codec::fingerprint;
pub use ledger::Ledger;
pub use pool::{Pool, DEFAULT_VALIDATION_WINDOW};
pub use registry::{RegistryConfig, StarRegistry};
