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

//! Library error codes and results.

use serde::{de::Visitor, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Project-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Max string length when the error is converted to string using `to_string_full`.
const MAX_ERROR_SOURCE_STRING_LENGTH: usize = 256;

/// Error kind to better contextualize the returned error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    MalformedData,
    InvalidSignature,
    DatabaseFault,
    ResourceNotFound,
    BrokenIntegrity,
    NoSuchRequest,
    AlreadySigned,
    NotSigned,
    Other,
}

/// Error kind strings.
pub(super) mod error_kind_str {
    pub const MALFORMED_DATA: &str = "malformed data";
    pub const INVALID_SIGNATURE: &str = "invalid signature";
    pub const DATABASE_FAULT: &str = "database fault";
    pub const RESOURCE_NOT_FOUND: &str = "resource not found";
    pub const BROKEN_INTEGRITY: &str = "broken integrity";
    pub const NO_SUCH_REQUEST: &str = "no pending request for address";
    pub const ALREADY_SIGNED: &str = "request already signed";
    pub const NOT_SIGNED: &str = "address not signed";
    pub const OTHER: &str = "other";
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        let kind_str = match self {
            MalformedData => error_kind_str::MALFORMED_DATA,
            InvalidSignature => error_kind_str::INVALID_SIGNATURE,
            DatabaseFault => error_kind_str::DATABASE_FAULT,
            ResourceNotFound => error_kind_str::RESOURCE_NOT_FOUND,
            BrokenIntegrity => error_kind_str::BROKEN_INTEGRITY,
            NoSuchRequest => error_kind_str::NO_SUCH_REQUEST,
            AlreadySigned => error_kind_str::ALREADY_SIGNED,
            NotSigned => error_kind_str::NOT_SIGNED,
            Other => error_kind_str::OTHER,
        };
        write!(f, "{}", kind_str)
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ErrorKindVisitor;

        impl<'de> Visitor<'de> for ErrorKindVisitor {
            type Value = String;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string")
            }

            fn visit_str<R>(self, value: &str) -> std::result::Result<String, R> {
                Ok(value.to_string())
            }
        }

        let kind = match deserializer.deserialize_str(ErrorKindVisitor)?.as_str() {
            error_kind_str::MALFORMED_DATA => ErrorKind::MalformedData,
            error_kind_str::INVALID_SIGNATURE => ErrorKind::InvalidSignature,
            error_kind_str::DATABASE_FAULT => ErrorKind::DatabaseFault,
            error_kind_str::RESOURCE_NOT_FOUND => ErrorKind::ResourceNotFound,
            error_kind_str::BROKEN_INTEGRITY => ErrorKind::BrokenIntegrity,
            error_kind_str::NO_SUCH_REQUEST => ErrorKind::NoSuchRequest,
            error_kind_str::ALREADY_SIGNED => ErrorKind::AlreadySigned,
            error_kind_str::NOT_SIGNED => ErrorKind::NotSigned,
            _ => ErrorKind::Other,
        };
        Ok(kind)
    }
}

/// Project-wide error type.
/// Contains a kind enumerate and a `source` carrying the detail, e.g. the
/// storage backend fault or the tamper report of a corrupted block.
#[derive(Debug, Serialize)]
pub struct Error {
    /// Error kind.
    pub kind: ErrorKind,
    /// Optional detail, serialized as its string representation.
    #[serde(serialize_with = "source_se")]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn source_se<S: Serializer>(
    source: &Option<Box<dyn std::error::Error + Send + Sync>>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match source {
        Some(b) => s.serialize_str(&b.to_string()),
        None => s.serialize_unit(),
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            kind: self.kind,
            source: None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::new_ext(ErrorKind::Other, s)
    }
}

impl<T> From<ErrorKind> for Result<T> {
    fn from(kind: ErrorKind) -> Self {
        Err(kind.into())
    }
}

impl Error {
    pub fn new_ext<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error {
            kind,
            source: Some(error.into()),
        }
    }

    pub fn new(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub fn to_string_full(&self) -> String {
        let mut err_string = self.to_string();
        if let Some(ref source) = self.source {
            let detail = format!(": {}", source);
            let max_len = std::cmp::min(detail.len(), MAX_ERROR_SOURCE_STRING_LENGTH);
            let mut end = max_len;
            while !detail.is_char_boundary(end) {
                end -= 1;
            }
            err_string.push_str(&detail[..end]);
        }
        err_string
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.source, &other.source) {
            (None, None) => true,
            (Some(a), Some(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.source {
            None => None,
            Some(ref source) => Some(source.as_ref()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::serialize::{rmp_deserialize, rmp_serialize};
    use std::io;
    use ErrorKind::*;

    #[test]
    fn generic_error_type() {
        let src1 = io::Error::new(io::ErrorKind::PermissionDenied, "oh no!");
        let src2 = io::Error::new(io::ErrorKind::TimedOut, "oh dear!");
        let err1 = Error::new_ext(DatabaseFault, src1);
        let err2 = Error::new_ext(DatabaseFault, src2);

        assert_ne!(err1, err2);
    }

    #[test]
    fn external_db_failure() {
        let source = io::Error::new(io::ErrorKind::PermissionDenied, "oh no!");

        let error = Error::new_ext(DatabaseFault, source);

        assert_eq!(error.to_string(), "database fault");
        assert_eq!(error.to_string_full(), "database fault: oh no!");
        let source = std::error::Error::source(&error)
            .unwrap()
            .downcast_ref::<io::Error>()
            .unwrap();
        assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn admission_errors_display() {
        assert_eq!(
            Error::new(NoSuchRequest).to_string(),
            "no pending request for address"
        );
        assert_eq!(Error::new(AlreadySigned).to_string(), "request already signed");
        assert_eq!(Error::new(NotSigned).to_string(), "address not signed");
    }

    #[test]
    fn error_kind_serialize() {
        let buf = rmp_serialize(&BrokenIntegrity).unwrap();

        let kind: ErrorKind = rmp_deserialize(&buf).unwrap();

        assert_eq!(kind, BrokenIntegrity);
    }

    #[test]
    fn unknown_kind_deserialize() {
        let buf = rmp_serialize(&"something odd").unwrap();

        let kind: ErrorKind = rmp_deserialize(&buf).unwrap();

        assert_eq!(kind, Other);
    }

    #[test]
    fn error_json_with_source() {
        let error = Error::new_ext(ResourceNotFound, "no block at height 7");

        let json = serde_json::to_string(&error).unwrap();

        assert_eq!(
            json,
            r#"{"kind":"resource not found","source":"no block at height 7"}"#
        );
    }
}
