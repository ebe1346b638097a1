use std::sync::Arc;

use async_std::net::{SocketAddr, TcpListener};
use async_std::task::spawn;

use log::{info, warn};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::http::*;

pub struct Server {
	pub addr: SocketAddr,
	router: Arc<Router>,
}

impl Server {
	pub fn new(addr: SocketAddr, router: Router) -> Self {
		Server {
			addr,
			router: Arc::new(router),
		}
	}

	pub fn from_config(config: &ServerConfig, router: Router) -> Self { Server::new(config.addr, router) }

	pub async fn bind(&self) -> Result<TcpListener, Error> {
		TcpListener::bind(&self.addr)
			.await
			.map_err(|source| Error::BindErr {
				addr: self.addr,
				source,
			})
	}

	/// Serves connections from `listener` until the process exits.
	pub async fn run(self, listener: TcpListener) -> Result<(), Error> {
		loop {
			let (stream, peer_addr) = match listener.accept().await {
				Ok(accepted) => accepted,
				Err(e) => {
					warn!("accept failed: {}", e);
					continue;
				}
			};
			let router = self.router.clone();
			spawn(async move {
				if let Err(e) = handle_connection(router, stream).await {
					warn!("connection from {} failed: {}", peer_addr, e);
				}
			});
		}
	}

	pub async fn start(self) -> Result<(), Error> {
		let listener = self.bind().await?;
		info!("listening on {}", listener.local_addr()?);
		self.run(listener).await
	}
}
