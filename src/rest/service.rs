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

use crate::{blockchain::StarRegistry, db::Db, rest::worker};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

/// REST service configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestConfig {
    /// IP address (e.g. 127.0.0.1 for localhost)
    pub addr: String,
    /// TCP port.
    pub port: u16,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            addr: "localhost".to_owned(),
            port: 8000,
        }
    }
}

/// REST service data.
pub struct RestService<D: Db> {
    /// Server configuration.
    config: RestConfig,
    /// Worker thread handler.
    handle: Option<JoinHandle<()>>,
    /// Registry shared with the request handlers.
    registry: StarRegistry<D>,
    /// To check if the worker thread is alive.
    canary: Arc<()>,
}

impl<D: Db> RestService<D> {
    pub fn new(config: RestConfig, registry: StarRegistry<D>) -> Self {
        RestService {
            config,
            handle: None,
            registry,
            canary: Arc::new(()),
        }
    }

    /// Start the service.
    pub fn start(&mut self) {
        debug!("Starting REST service");
        if self.is_running() {
            warn!("service was already running");
            return;
        }
        let registry = self.registry.clone();
        let addr = self.config.addr.clone();
        let port = self.config.port;
        let mut canary = Arc::clone(&self.canary);
        let handle = thread::spawn(move || {
            let _ = Arc::get_mut(&mut canary);
            worker::run(addr, port, registry);
        });
        self.handle = Some(handle);
    }

    /// Stop the service.
    ///
    /// The server thread can't be stopped: it is detached and keeps serving
    /// until the process exits. This only releases the thread handle.
    pub fn stop(&mut self) {
        debug!("Stopping REST service");
        match self.handle.take() {
            Some(_handle) => (),
            None => debug!("service was not running"),
        };
    }

    /// Check if service is running.
    pub fn is_running(&self) -> bool {
        // Hack to intercept crashed subthreads.
        Arc::strong_count(&self.canary) == 2
    }
}
