// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![deny(
    missing_debug_implementations,
    rust_2018_idioms,
    unused_imports
)]

//! A small, high-concurrency HTTP/1.1 static-file server.
//!
//! The server is built around an edge-triggered I/O readiness multiplexer
//! ([`reactor`]) and a bounded worker pool ([`pool`]). A single reactor
//! thread accepts connections and drains readable sockets; once a
//! connection's read buffer holds bytes, it is handed to a worker thread
//! over a bounded queue ([`queue`]). The worker drives the connection's
//! incremental HTTP/1.1 parser ([`parser`]), assembles a response
//! ([`response`]), and writes it back out with a scatter-gather writer
//! ([`writer`]), rearming the reactor itself before moving on.
//!
//! At any instant a connection is owned by exactly one actor — the reactor
//! or a single worker — which is enforced structurally by edge-triggered,
//! one-shot reactor registrations rather than by contention on a lock.

pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod parser;
pub mod pool;
pub mod queue;
pub mod reactor;
pub mod resource;
pub mod response;
pub mod sync;
pub mod writer;

pub use config::Config;
pub use error::ServerError;
