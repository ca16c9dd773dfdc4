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

use crate::{
    base::{schema::StarRequest, serialize::json_serialize},
    blockchain::StarRegistry,
    db::Db,
    Error, ErrorKind, Result, VERSION,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tide::{http::mime, Request, Response, StatusCode};

/// Conversion from "core" errors to HTTP errors.
impl From<ErrorKind> for StatusCode {
    fn from(err: ErrorKind) -> StatusCode {
        use crate::error::ErrorKind::*;
        match err {
            MalformedData => StatusCode::BadRequest,
            InvalidSignature | NotSigned => StatusCode::Unauthorized,
            ResourceNotFound | NoSuchRequest => StatusCode::NotFound,
            AlreadySigned => StatusCode::Conflict,
            DatabaseFault | BrokenIntegrity | Other => StatusCode::InternalServerError,
        }
    }
}

#[derive(Deserialize)]
struct AddressPayload {
    address: String,
}

#[derive(Deserialize)]
struct SignaturePayload {
    address: String,
    signature: String,
}

/// Wallet addresses are non empty base58 strings.
fn check_address(address: &str) -> Result<()> {
    match bs58::decode(address).into_vec() {
        Ok(buf) if !buf.is_empty() => Ok(()),
        _ => Err(Error::new_ext(
            ErrorKind::MalformedData,
            format!("invalid address '{}'", address),
        )),
    }
}

fn check_signature(signature: &str) -> Result<()> {
    match hex::decode(signature) {
        Ok(buf) if !buf.is_empty() => Ok(()),
        _ => Err(Error::new_ext(
            ErrorKind::MalformedData,
            "signature shall be hex encoded",
        )),
    }
}

async fn json_body<T: DeserializeOwned, D: Db>(req: &mut Request<StarRegistry<D>>) -> Result<T> {
    let buf = req
        .body_bytes()
        .await
        .map_err(|err| Error::new_ext(ErrorKind::MalformedData, err.to_string()))?;
    serde_json::from_slice(&buf).map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))
}

fn tide_result<T: Serialize>(result: Result<T>) -> tide::Result {
    let response = match result.and_then(|val| json_serialize(&val)) {
        Ok(buf) => Response::builder(StatusCode::Ok)
            .body(buf)
            .content_type(mime::JSON)
            .build(),
        Err(err) => {
            let status: StatusCode = err.kind.into();
            if status == StatusCode::InternalServerError {
                error!("request failed: {}", err.to_string_full());
            }
            Response::builder(status)
                .body(err.to_string_full())
                .content_type(mime::PLAIN)
                .build()
        }
    };
    Ok(response)
}

async fn request_validation<D: Db>(mut req: Request<StarRegistry<D>>) -> tide::Result {
    let res = match json_body::<AddressPayload, D>(&mut req).await {
        Ok(payload) => check_address(&payload.address)
            .and_then(|_| req.state().request_validation(&payload.address)),
        Err(err) => Err(err),
    };
    tide_result(res)
}

async fn validate_signature<D: Db>(mut req: Request<StarRegistry<D>>) -> tide::Result {
    let res = match json_body::<SignaturePayload, D>(&mut req).await {
        Ok(payload) => check_address(&payload.address)
            .and_then(|_| check_signature(&payload.signature))
            .and_then(|_| {
                req.state()
                    .validate_signature(&payload.address, &payload.signature)
            }),
        Err(err) => Err(err),
    };
    tide_result(res)
}

async fn put_block<D: Db>(mut req: Request<StarRegistry<D>>) -> tide::Result {
    let res = match json_body::<StarRequest, D>(&mut req).await {
        Ok(star_req) => star_req
            .check()
            .and_then(|_| check_address(&star_req.address))
            .and_then(|_| {
                let address = star_req.address.clone();
                let body = star_req.into_body()?;
                req.state().submit_block(&address, body)
            }),
        Err(err) => Err(err),
    };
    tide_result(res)
}

async fn get_block<D: Db>(req: Request<StarRegistry<D>>) -> tide::Result {
    let res = req
        .param("height")
        .unwrap_or_default()
        .parse::<u64>()
        .map_err(|err| Error::new_ext(ErrorKind::MalformedData, err))
        .and_then(|height| req.state().get_block_decoded(height));
    tide_result(res)
}

/// Stars lookup, the path parameter is either `hash:<hash>` or
/// `address:<address>`.
async fn get_stars<D: Db>(req: Request<StarRegistry<D>>) -> tide::Result {
    let query = req.param("query").unwrap_or_default();
    let registry = req.state();
    let res = match query.split_once(':') {
        Some(("hash", hash)) => registry.find_by_hash(hash).map(|block| json!(block)),
        Some(("address", address)) => registry
            .find_by_address(address)
            .map(|blocks| json!(blocks)),
        _ => Err(Error::new_ext(
            ErrorKind::MalformedData,
            format!("unknown stars query '{}'", query),
        )),
    };
    tide_result(res)
}

async fn get_info<D: Db>(req: Request<StarRegistry<D>>) -> tide::Result {
    let res = req
        .state()
        .height()
        .map(|height| json!({ "height": height }));
    tide_result(res)
}

async fn validate_chain<D: Db>(req: Request<StarRegistry<D>>) -> tide::Result {
    let res = req.state().validate_chain().map(|reports| {
        json!({
            "valid": reports.is_empty(),
            "invalidBlocks": reports,
        })
    });
    tide_result(res)
}

async fn get_index<D: Db>(_req: Request<StarRegistry<D>>) -> tide::Result {
    Ok(format!("STAR REGISTRY v{}", VERSION).into())
}

pub fn run<D: Db>(addr: String, port: u16, registry: StarRegistry<D>) {
    let mut app = tide::with_state(registry);

    app.at("/requestValidation").post(request_validation::<D>);
    app.at("/message-signature/validate")
        .post(validate_signature::<D>);
    app.at("/block").post(put_block::<D>);
    app.at("/block/:height").get(get_block::<D>);
    app.at("/stars/:query").get(get_stars::<D>);
    app.at("/info").get(get_info::<D>);
    app.at("/validateChain").get(validate_chain::<D>);
    app.at("/").get(get_index::<D>);

    let fut = app.listen((addr, port));
    if let Err(err) = async_std::task::block_on(fut) {
        error!("REST server failure: {}", err);
    }
}
