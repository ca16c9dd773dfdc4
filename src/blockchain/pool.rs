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

//! Pool of pending registration requests.
//!
//! A wallet address may own at most one request. A request is created
//! pending, may be refreshed while pending, becomes signed once the owner
//! proves the address ownership and finally leaves the pool when consumed by
//! a block submission or when its validation window expires.
//!
//! Every pending request owns an expiry timer started at creation. Refreshing
//! a request doesn't restart the timer, the deadline is fixed by the first
//! request. The timer removes the request only if, under the pool lock, the
//! same request is still there and unsigned. Signing and consuming abort the
//! timer under the same lock, thus exactly one of the two outcomes applies.

use crate::{
    base::{
        schema::{SignatureValidation, ValidationRequest, ValidationStatus},
        Clock, Mutex, SystemClock,
    },
    crypto::SignatureVerifier,
    Error, ErrorKind, Result,
};
use async_std::task;
use futures::future::{AbortHandle, Abortable};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

/// Default validation window in seconds.
pub const DEFAULT_VALIDATION_WINDOW: u64 = 300;

type Requests = Mutex<HashMap<String, PendingRequest>>;

/// Outstanding registration request.
struct PendingRequest {
    /// Time when the current window was issued.
    request_time_stamp: u64,
    /// Time when the request has been created, preserved by refreshes.
    original_time_stamp: u64,
    /// Text to be signed by the wallet owner.
    message: String,
    /// Seconds left, as computed by the last request or refresh.
    validation_window: i64,
    /// Set once a valid signature has been presented.
    signed: bool,
    /// Identifier of the expiry timer bound to this request.
    timer_id: u64,
    /// Expiry timer cancellation handle, `None` once cancelled.
    expiry: Option<AbortHandle>,
}

impl PendingRequest {
    fn message(address: &str, timestamp: u64) -> String {
        format!("{}:{}:starRegistry", address, timestamp)
    }

    /// Issues a new window, `window` seconds after the original request.
    fn refresh(&mut self, address: &str, now: u64, window: u64) {
        self.request_time_stamp = now;
        self.validation_window = window as i64 - (now as i64 - self.original_time_stamp as i64);
        self.message = Self::message(address, now);
    }

    fn cancel_expiry(&mut self) {
        if let Some(expiry) = self.expiry.take() {
            expiry.abort();
        }
    }

    fn to_validation_request(&self, address: &str) -> ValidationRequest {
        ValidationRequest {
            wallet_address: address.to_owned(),
            request_time_stamp: self.request_time_stamp,
            message: self.message.clone(),
            validation_window: self.validation_window,
        }
    }
}

/// Pending requests pool.
pub struct Pool {
    /// Requests indexed by wallet address.
    requests: Arc<Requests>,
    /// Expiry timers identifiers generator.
    next_timer_id: AtomicU64,
    /// Validation window in seconds.
    window: u64,
    /// Time source for the windows computation.
    clock: Arc<dyn Clock>,
    /// Wallet signatures checker.
    verifier: Arc<dyn SignatureVerifier>,
}

impl Pool {
    /// Creates a new pool using the wall clock.
    pub fn new<V: SignatureVerifier>(window: u64, verifier: V) -> Self {
        Self::with_clock(window, verifier, SystemClock)
    }

    /// Creates a new pool with a custom time source.
    ///
    /// The clock is only used to compute the windows returned to the clients,
    /// expiry timers always run on the async runtime timer.
    pub fn with_clock<V: SignatureVerifier, C: Clock>(window: u64, verifier: V, clock: C) -> Self {
        Pool {
            requests: Arc::new(Mutex::new(HashMap::new())),
            next_timer_id: AtomicU64::new(0),
            window,
            clock: Arc::new(clock),
            verifier: Arc::new(verifier),
        }
    }

    /// Configured validation window in seconds.
    pub fn window(&self) -> u64 {
        self.window
    }

    /// Number of requests in the pool, regardless of their state.
    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a new request for `address` or refreshes the existing one.
    ///
    /// # Errors
    ///
    /// `AlreadySigned` if the address owns a signed request.
    pub fn request_validation(&self, address: &str) -> Result<ValidationRequest> {
        let now = self.clock.now();
        let mut requests = self.requests.lock();

        if let Some(request) = requests.get_mut(address) {
            if request.signed {
                return Err(Error::new(ErrorKind::AlreadySigned));
            }
            request.refresh(address, now, self.window);
            debug!(
                "request for {} refreshed, {}s left",
                address, request.validation_window
            );
            return Ok(request.to_validation_request(address));
        }

        // The timer can't touch the map before the insertion, we hold the lock.
        let timer_id = self.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let expiry = self.schedule_expiry(address.to_owned(), timer_id);
        let request = PendingRequest {
            request_time_stamp: now,
            original_time_stamp: now,
            message: PendingRequest::message(address, now),
            validation_window: self.window as i64,
            signed: false,
            timer_id,
            expiry: Some(expiry),
        };
        let response = request.to_validation_request(address);
        requests.insert(address.to_owned(), request);
        debug!("request for {} created, {}s window", address, self.window);
        Ok(response)
    }

    /// Checks the signature of the pending request message.
    /// On success the request is flagged as signed and it no longer expires.
    ///
    /// # Errors
    ///
    /// - `NoSuchRequest` if the address has no request.
    /// - `AlreadySigned` if the request has been already signed.
    /// - `InvalidSignature` if the signature doesn't match, the request is
    ///   left untouched.
    pub fn validate_signature(&self, address: &str, signature: &str) -> Result<SignatureValidation> {
        let mut requests = self.requests.lock();
        let request = requests
            .get_mut(address)
            .ok_or_else(|| Error::new(ErrorKind::NoSuchRequest))?;
        if request.signed {
            return Err(Error::new(ErrorKind::AlreadySigned));
        }
        if !self.verifier.verify(&request.message, address, signature) {
            debug!("bad signature for {}", address);
            return Err(Error::new(ErrorKind::InvalidSignature));
        }

        request.cancel_expiry();
        request.signed = true;
        info!("request for {} signed", address);

        Ok(SignatureValidation {
            register_star: true,
            status: ValidationStatus {
                address: address.to_owned(),
                request_time_stamp: request.request_time_stamp,
                message: request.message.clone(),
                validation_window: request.validation_window,
                message_signature: true,
            },
        })
    }

    /// Admission check to be performed right before a block submission.
    ///
    /// # Errors
    ///
    /// - `NoSuchRequest` if the address has no request.
    /// - `NotSigned` if the request is still pending.
    pub fn assert_signed(&self, address: &str) -> Result<bool> {
        match self.requests.lock().get(address) {
            None => Err(Error::new(ErrorKind::NoSuchRequest)),
            Some(request) if !request.signed => Err(Error::new(ErrorKind::NotSigned)),
            Some(_) => Ok(true),
        }
    }

    /// Removes the request of `address`, if any.
    pub fn consume(&self, address: &str) {
        if let Some(mut request) = self.requests.lock().remove(address) {
            request.cancel_expiry();
            debug!("request for {} consumed", address);
        }
    }

    fn schedule_expiry(&self, address: String, timer_id: u64) -> AbortHandle {
        let (handle, registration) = AbortHandle::new_pair();
        let requests = Arc::downgrade(&self.requests);
        let window = Duration::from_secs(self.window);
        let timer = async move {
            task::sleep(window).await;
            expire(&requests, &address, timer_id);
        };
        task::spawn(Abortable::new(timer, registration));
        handle
    }
}

/// Expiry timer action.
fn expire(requests: &Weak<Requests>, address: &str, timer_id: u64) {
    let requests = match requests.upgrade() {
        Some(requests) => requests,
        None => return,
    };
    let mut requests = requests.lock();
    let expired = matches!(
        requests.get(address),
        Some(request) if !request.signed && request.timer_id == timer_id
    );
    if expired {
        requests.remove(address);
        debug!("request for {} expired", address);
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.requests
            .lock()
            .values_mut()
            .for_each(PendingRequest::cancel_expiry);
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::{
        base::tests::ManualClock,
        crypto::{sign::tests::sign_message, AccountVerifier, KeyPair},
    };
    use std::thread;

    const START: u64 = 1_532_296_090;

    struct Wallet {
        keypair: KeyPair,
        address: String,
    }

    impl Wallet {
        fn new() -> Self {
            let keypair = KeyPair::from_random();
            let address = keypair.public_key().to_account_id();
            Wallet { keypair, address }
        }

        fn sign(&self, message: &str) -> String {
            sign_message(&self.keypair, message)
        }
    }

    fn create_pool(window: u64) -> (Pool, ManualClock) {
        let clock = ManualClock::new(START);
        let pool = Pool::with_clock(window, AccountVerifier, clock.clone());
        (pool, clock)
    }

    #[test]
    fn new_request() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();

        let res = pool.request_validation(&wallet.address).unwrap();

        assert_eq!(res.wallet_address, wallet.address);
        assert_eq!(res.request_time_stamp, START);
        assert_eq!(res.validation_window, 300);
        assert_eq!(
            res.message,
            format!("{}:{}:starRegistry", wallet.address, START)
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn refresh_shrinks_window() {
        let (pool, clock) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();
        let first = pool.request_validation(&wallet.address).unwrap();

        clock.advance(3);
        let second = pool.request_validation(&wallet.address).unwrap();

        assert!(second.validation_window < first.validation_window);
        assert_eq!(second.validation_window, 297);
        assert_eq!(second.request_time_stamp, START + 3);
        assert_eq!(
            second.message,
            format!("{}:{}:starRegistry", wallet.address, START + 3)
        );
        assert_eq!(pool.len(), 1);

        clock.advance(10);
        let third = pool.request_validation(&wallet.address).unwrap();
        assert_eq!(third.validation_window, 287);
    }

    #[test]
    fn sign_refreshed_message() {
        let (pool, clock) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();
        let first = pool.request_validation(&wallet.address).unwrap();
        clock.advance(1);
        let second = pool.request_validation(&wallet.address).unwrap();

        // The message issued by the first request is stale.
        let err = pool
            .validate_signature(&wallet.address, &wallet.sign(&first.message))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);

        let res = pool
            .validate_signature(&wallet.address, &wallet.sign(&second.message))
            .unwrap();
        assert!(res.register_star);
        assert_eq!(res.status.message, second.message);
        assert_eq!(res.status.validation_window, 299);
        assert!(res.status.message_signature);
    }

    #[test]
    fn validate_signature_without_request() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();

        let err = pool
            .validate_signature(&wallet.address, &wallet.sign("whatever"))
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NoSuchRequest);
    }

    #[test]
    fn invalid_then_valid_signature() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();
        let intruder = Wallet::new();
        let req = pool.request_validation(&wallet.address).unwrap();

        let err = pool
            .validate_signature(&wallet.address, &intruder.sign(&req.message))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);
        assert_eq!(
            pool.assert_signed(&wallet.address).unwrap_err().kind,
            ErrorKind::NotSigned
        );

        pool.validate_signature(&wallet.address, &wallet.sign(&req.message))
            .unwrap();
        assert!(pool.assert_signed(&wallet.address).unwrap());
    }

    #[test]
    fn signed_request_rejects_further_actions() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();
        let req = pool.request_validation(&wallet.address).unwrap();
        let signature = wallet.sign(&req.message);
        pool.validate_signature(&wallet.address, &signature).unwrap();

        let err = pool.validate_signature(&wallet.address, &signature).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadySigned);

        let err = pool.request_validation(&wallet.address).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadySigned);
        assert!(pool.assert_signed(&wallet.address).unwrap());
    }

    #[test]
    fn assert_signed_states() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();

        let err = pool.assert_signed(&wallet.address).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchRequest);

        pool.request_validation(&wallet.address).unwrap();
        let err = pool.assert_signed(&wallet.address).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotSigned);
    }

    #[test]
    fn consume_is_idempotent() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let wallet = Wallet::new();
        pool.request_validation(&wallet.address).unwrap();

        pool.consume(&wallet.address);
        pool.consume(&wallet.address);

        assert!(pool.is_empty());
        let err = pool.assert_signed(&wallet.address).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchRequest);
    }

    #[test]
    fn requests_are_per_address() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let alice = Wallet::new();
        let bob = Wallet::new();
        let req = pool.request_validation(&alice.address).unwrap();
        pool.request_validation(&bob.address).unwrap();

        pool.validate_signature(&alice.address, &alice.sign(&req.message))
            .unwrap();

        assert!(pool.assert_signed(&alice.address).unwrap());
        assert_eq!(
            pool.assert_signed(&bob.address).unwrap_err().kind,
            ErrorKind::NotSigned
        );
    }

    #[test]
    fn pending_request_expires() {
        let pool = Pool::new(1, AccountVerifier);
        let wallet = Wallet::new();
        let req = pool.request_validation(&wallet.address).unwrap();

        thread::sleep(Duration::from_secs(2));

        let err = pool
            .validate_signature(&wallet.address, &wallet.sign(&req.message))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchRequest);
        assert!(pool.is_empty());
    }

    #[test]
    fn refresh_keeps_original_deadline() {
        let pool = Pool::new(2, AccountVerifier);
        let wallet = Wallet::new();
        pool.request_validation(&wallet.address).unwrap();

        thread::sleep(Duration::from_millis(1000));
        pool.request_validation(&wallet.address).unwrap();
        thread::sleep(Duration::from_millis(1600));

        let err = pool.assert_signed(&wallet.address).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchRequest);
    }

    #[test]
    fn signed_request_does_not_expire() {
        let pool = Pool::new(1, AccountVerifier);
        let wallet = Wallet::new();
        let req = pool.request_validation(&wallet.address).unwrap();
        pool.validate_signature(&wallet.address, &wallet.sign(&req.message))
            .unwrap();

        thread::sleep(Duration::from_secs(2));

        assert!(pool.assert_signed(&wallet.address).unwrap());
    }

    #[test]
    fn stale_timer_spares_new_request() {
        let pool = Pool::new(1, AccountVerifier);
        let wallet = Wallet::new();
        pool.request_validation(&wallet.address).unwrap();
        thread::sleep(Duration::from_millis(600));

        // Consume and request again: the first timer must not remove the
        // second request.
        pool.consume(&wallet.address);
        pool.request_validation(&wallet.address).unwrap();
        thread::sleep(Duration::from_millis(600));

        assert_eq!(
            pool.assert_signed(&wallet.address).unwrap_err().kind,
            ErrorKind::NotSigned
        );
    }

    #[test]
    fn concurrent_requests_same_address() {
        let (pool, _) = create_pool(DEFAULT_VALIDATION_WINDOW);
        let pool = Arc::new(pool);
        let wallet = Wallet::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                let address = wallet.address.clone();
                thread::spawn(move || pool.request_validation(&address).unwrap())
            })
            .collect();
        let responses: Vec<ValidationRequest> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(pool.len(), 1);
        assert!(responses.iter().all(|r| r.validation_window == 300));
    }
}
