use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("could not read from the randomness source")]
	RandomnessErr(#[source] rand::Error),
	#[error("could not generate the key pair")]
	KeyGenErr(#[source] openssl::error::ErrorStack),
	#[error("could not sign the certificate")]
	SignErr(#[source] openssl::error::ErrorStack),
	#[error("time is outside the range a certificate can express")]
	ClockErr,
	#[error("cannot open: {}", .path.display())]
	FileOpenErr {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("cannot write: {}", .path.display())]
	WriteErr {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("cannot read: {}", .path.display())]
	ReadErr {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("cannot parse: {}", .path.display())]
	ParseErr {
		path: PathBuf,
		#[source]
		source: openssl::error::ErrorStack,
	},
	#[error("{} is not a valid self-signed certificate for the given key", .path.display())]
	MismatchErr { path: PathBuf },
	#[error("cannot listen on {addr}")]
	BindErr {
		addr: SocketAddr,
		#[source]
		source: std::io::Error,
	},
	#[error(transparent)]
	OSSLErrStack(#[from] openssl::error::ErrorStack),
	#[error(transparent)]
	IoErr(#[from] std::io::Error),
	#[error("something went wrong in http_types")]
	HttpTypeErr,
}
