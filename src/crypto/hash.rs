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

//! Opaque cryptographic secure hash used by the overall project.
//!
//! Current implementation uses SHA-256. Digests travel as lowercase hex
//! strings, which is also the form block fingerprints are stored with.

use crate::{Error, ErrorKind, Result};
use ring::digest;
use std::fmt::{Display, Formatter};

/// SHA-256 digest length.
pub const HASH_LEN: usize = 32;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Default)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    /// Compute hash from arbitrary data.
    pub fn from_data(data: &[u8]) -> Self {
        let digest = digest::digest(&digest::SHA256, data);
        let mut hash = Hash::default();
        hash.0.copy_from_slice(digest.as_ref());
        hash
    }

    /// Creates a new instance from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let buf = hex::decode(hex).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))?;
        if buf.len() != HASH_LEN {
            return Err(Error::new_ext(
                ErrorKind::MalformedData,
                format!("expected {} bytes digest, got {}", HASH_LEN, buf.len()),
            ));
        }
        let mut hash = Hash::default();
        hash.0.copy_from_slice(&buf);
        Ok(hash)
    }

    /// Digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Double SHA-256: the second round digests the hex string of the first one.
pub fn double_hash(data: &[u8]) -> Hash {
    let first = Hash::from_data(data);
    Hash::from_data(first.to_hex().as_bytes())
}
