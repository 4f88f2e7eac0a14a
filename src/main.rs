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

use std::net::SocketAddr;

use edgeserve::{reactor::Reactor, Config, ServerError};
use socket2::{Domain, Socket, Type};
use tracing_subscriber::EnvFilter;

const LISTEN_BACKLOG: i32 = 5;

fn main() {
    if let Err(e) = run() {
        tracing::error!(error = %e, "server exiting");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ServerError> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    // A peer resetting a connection mid-write would otherwise deliver
    // SIGPIPE and kill the process; every write already surfaces EPIPE as
    // an io::Error through the normal error path.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    let listener = bind(&config)?;
    tracing::info!(port = config.port, doc_root = %config.doc_root.display(), threads = config.threads, "listening");

    let mut reactor = Reactor::new(listener, &config)?;
    reactor.run()
}

fn bind(config: &Config) -> Result<mio::net::TcpListener, ServerError> {
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();

    let socket = Socket::new(Domain::IPV4, Type::STREAM, None).map_err(ServerError::Bind)?;
    socket.set_reuse_address(true).map_err(ServerError::Bind)?;
    socket.set_nonblocking(true).map_err(ServerError::Bind)?;
    socket.bind(&addr.into()).map_err(ServerError::Bind)?;
    socket.listen(LISTEN_BACKLOG).map_err(ServerError::Bind)?;

    Ok(mio::net::TcpListener::from_std(socket.into()))
}
