use std::{
	convert::TryFrom,
	error::Error as StdError,
	net::{IpAddr, SocketAddr},
	path::PathBuf,
	process,
};

use log::error;

use structopt::StructOpt;

use echocert::{
	config::{CertConfig, ServerConfig},
	error::Error,
	gen_key_and_cert, inspect_key_and_cert,
	server::Server,
	Router,
};

#[derive(StructOpt)]
struct GenerateOpt {
	/// Where to write the certificate [default: cert.pem]
	#[structopt(short, long)]
	cert_path: Option<PathBuf>,

	/// Where to write the private key [default: key.pem]
	#[structopt(short, long)]
	key_path: Option<PathBuf>,

	/// Validity period in days [default: 365]
	#[structopt(long)]
	days: Option<u64>,

	/// RSA modulus size in bits [default: 2048]
	#[structopt(long)]
	bits: Option<u32>,

	/// IP address to bind into the certificate, repeatable [default: 127.0.0.1]
	#[structopt(long = "ip")]
	ip_addresses: Vec<IpAddr>,

	/// Subject organization
	#[structopt(long)]
	org: Option<String>,

	/// Subject organizational unit
	#[structopt(long)]
	unit: Option<String>,

	/// Subject common name
	#[structopt(long)]
	cn: Option<String>,
}

impl TryFrom<GenerateOpt> for CertConfig {
	type Error = Error;

	fn try_from(o: GenerateOpt) -> Result<Self, Error> {
		let mut config = CertConfig::default();
		if let Some(p) = o.cert_path {
			config.cert_path = p;
		}
		if let Some(p) = o.key_path {
			config.key_path = p;
		}
		if let Some(days) = o.days {
			config.validity = CertConfig::validity_from_days(days)?;
		}
		if let Some(bits) = o.bits {
			config.key_bits = bits;
		}
		if !o.ip_addresses.is_empty() {
			config.ip_addresses = o.ip_addresses;
		}
		if let Some(org) = o.org {
			config.subject.organization = org;
		}
		if let Some(unit) = o.unit {
			config.subject.organizational_unit = unit;
		}
		if let Some(cn) = o.cn {
			config.subject.common_name = cn;
		}
		Ok(config)
	}
}

#[derive(StructOpt)]
struct ServeOpt {
	/// Address to listen on [default: 0.0.0.0:8080]
	address: Option<SocketAddr>,
}

#[derive(StructOpt)]
struct InspectOpt {
	#[structopt(short, long, default_value = "cert.pem")]
	cert_path: PathBuf,

	#[structopt(short, long, default_value = "key.pem")]
	key_path: PathBuf,
}

#[derive(StructOpt)]
#[structopt(about = "Path-echo HTTP server and self-signed certificate generator")]
enum Opt {
	/// Write a fresh self-signed certificate and its private key
	Generate(GenerateOpt),
	/// Answer every HTTP request with a greeting naming its path
	Serve(ServeOpt),
	/// Check that a certificate and key written by `generate` belong together
	Inspect(InspectOpt),
}

async fn serve(o: ServeOpt) -> Result<(), Error> {
	let mut config = ServerConfig::default();
	if let Some(addr) = o.address {
		config.addr = addr;
	}
	Server::from_config(&config, Router::echo()).start().await
}

fn inspect(o: InspectOpt) -> Result<(), Error> {
	let report = inspect_key_and_cert(&o.cert_path, &o.key_path)?;
	println!("{}", report);
	if !report.is_consistent() {
		return Err(Error::MismatchErr { path: o.cert_path });
	}
	Ok(())
}

fn report(e: &Error) {
	let mut message = e.to_string();
	let mut cause = e.source();
	while let Some(c) = cause {
		message.push_str(": ");
		message.push_str(&c.to_string());
		cause = c.source();
	}
	error!("{}", message);
}

#[async_std::main]
async fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let result = match Opt::from_args() {
		Opt::Generate(o) => CertConfig::try_from(o).and_then(|config| gen_key_and_cert(&config)),
		Opt::Serve(o) => serve(o).await,
		Opt::Inspect(o) => inspect(o),
	};

	if let Err(e) = result {
		report(&e);
		process::exit(1);
	}
}
