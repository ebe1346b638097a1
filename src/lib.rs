mod crypto_helpers;
mod http;

pub mod config;
pub mod error;
pub mod server;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, info};

use openssl::nid::Nid;

pub use crate::crypto_helpers::{
	CertTemplate, ExtendedKeyUsagePurpose, KeyUsagePurpose, SERIAL_BITS,
};
pub use crate::http::{echo, Handler, Router};

use crate::{
	config::CertConfig,
	crypto_helpers::{
		generate_keys, is_self_issued, load_cert, load_key, make_self_signed_cert, random_serial,
		save_cert, save_key,
	},
	error::Error,
};

/// Generates a fresh key pair and a self-signed certificate for it, then
/// writes the certificate followed by the key.
///
/// Nothing is written unless signing succeeded, and the key is not written
/// if the certificate could not be.
pub fn gen_key_and_cert(config: &CertConfig) -> Result<(), Error> {
	let serial = random_serial()?;
	debug!("serial number {:032x}", serial);
	let template = CertTemplate::new(serial, config, SystemTime::now());

	let privkey = generate_keys(config.key_bits)?;
	debug!("generated {}-bit RSA key", config.key_bits);
	let cert = make_self_signed_cert(&template, &privkey)?;

	save_cert(&config.cert_path, &cert)?;
	info!("wrote certificate to {}", config.cert_path.display());
	save_key(&config.key_path, &privkey)?;
	info!("wrote private key to {}", config.key_path.display());

	Ok(())
}

/// What `inspect_key_and_cert` found in a certificate/key pair.
#[derive(Clone, Debug)]
pub struct CertReport {
	pub cert_path: PathBuf,
	pub serial_hex: String,
	pub common_name: Option<String>,
	pub not_before: String,
	pub not_after: String,
	/// `not_after - not_before` in seconds; negative for an inverted window.
	pub validity_secs: i64,
	pub self_issued: bool,
	pub signature_valid: bool,
	pub key_matches: bool,
}

impl CertReport {
	pub fn validity(&self) -> Option<Duration> {
		if self.validity_secs < 0 {
			None
		}
		else {
			Some(Duration::from_secs(self.validity_secs as u64))
		}
	}

	/// Self-issued, self-verifying and paired with the given key.
	pub fn is_consistent(&self) -> bool { self.self_issued && self.signature_valid && self.key_matches }
}

impl fmt::Display for CertReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "certificate: {}", self.cert_path.display())?;
		writeln!(f, "serial:      {}", self.serial_hex)?;
		writeln!(
			f,
			"subject CN:  {}",
			self.common_name.as_deref().unwrap_or("<none>")
		)?;
		writeln!(f, "not before:  {}", self.not_before)?;
		writeln!(f, "not after:   {}", self.not_after)?;
		writeln!(f, "validity:    {} hours", self.validity_secs / 3600)?;
		writeln!(f, "self-issued: {}", self.self_issued)?;
		writeln!(f, "signature:   {}", if self.signature_valid { "ok" } else { "BAD" })?;
		write!(f, "key matches: {}", self.key_matches)
	}
}

/// Reads a certificate and key back from disk and checks that they belong
/// together.
pub fn inspect_key_and_cert(cert_path: &Path, key_path: &Path) -> Result<CertReport, Error> {
	let cert = load_cert(cert_path)?;
	let privkey = load_key(key_path)?;
	let pubkey = cert.public_key()?;

	let diff = cert.not_before().diff(cert.not_after())?;
	let common_name = cert
		.subject_name()
		.entries_by_nid(Nid::COMMONNAME)
		.next()
		.and_then(|entry| entry.data().as_utf8().ok())
		.map(|cn| cn.to_string());

	Ok(CertReport {
		cert_path: cert_path.to_path_buf(),
		serial_hex: cert.serial_number().to_bn()?.to_hex_str()?.to_string(),
		common_name,
		not_before: cert.not_before().to_string(),
		not_after: cert.not_after().to_string(),
		validity_secs: i64::from(diff.days) * 24 * 3600 + i64::from(diff.secs),
		self_issued: is_self_issued(&cert)?,
		signature_valid: cert.verify(&pubkey)?,
		key_matches: privkey.public_eq(&pubkey),
	})
}
