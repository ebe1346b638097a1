use std::cmp::Ordering;
use std::convert::TryInto;
use std::fs::File;
use std::io::{Read, Write};
use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{ExtendedKeyUsage, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509Ref, X509};

use rand::{rngs::OsRng, RngCore};

use crate::config::{CertConfig, SubjectName};
use crate::error::Error;

pub const SERIAL_BITS: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyUsagePurpose {
	DigitalSignature,
	KeyEncipherment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendedKeyUsagePurpose {
	ServerAuth,
}

/// Fields of a certificate before it is signed.
#[derive(Clone, Debug)]
pub struct CertTemplate {
	pub serial: u128,
	pub subject: SubjectName,
	pub not_before: SystemTime,
	pub validity: Duration,
	pub key_usage: Vec<KeyUsagePurpose>,
	pub extended_key_usage: Vec<ExtendedKeyUsagePurpose>,
	pub ip_addresses: Vec<IpAddr>,
}

impl CertTemplate {
	pub fn new(serial: u128, config: &CertConfig, now: SystemTime) -> Self {
		CertTemplate {
			serial,
			subject: config.subject.clone(),
			not_before: now,
			validity: config.validity,
			key_usage: vec![
				KeyUsagePurpose::KeyEncipherment,
				KeyUsagePurpose::DigitalSignature,
			],
			extended_key_usage: vec![ExtendedKeyUsagePurpose::ServerAuth],
			ip_addresses: config.ip_addresses.clone(),
		}
	}

	/// Sub-second parts of `validity` are dropped.
	pub fn not_after(&self) -> Option<SystemTime> {
		self.not_before
			.checked_add(Duration::from_secs(self.validity.as_secs()))
	}
}

/// Uniform in `[0, 2^128)`.
pub fn random_serial() -> Result<u128, Error> {
	let mut bytes = [0u8; SERIAL_BITS / 8];
	OsRng
		.try_fill_bytes(&mut bytes)
		.map_err(Error::RandomnessErr)?;
	Ok(u128::from_be_bytes(bytes))
}

fn serial_to_asn1(serial: u128) -> Result<Asn1Integer, ErrorStack> {
	let bn = BigNum::from_slice(&serial.to_be_bytes())?;
	bn.to_asn1_integer()
}

pub fn generate_keys(bits: u32) -> Result<PKey<Private>, Error> {
	let rsa = Rsa::generate(bits).map_err(Error::KeyGenErr)?;
	let privkey = PKey::from_rsa(rsa).map_err(Error::KeyGenErr)?;
	Ok(privkey)
}

fn unix_secs(time: SystemTime) -> Result<u64, Error> {
	time.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.map_err(|_| Error::ClockErr)
}

fn asn1_time(secs: u64) -> Result<Asn1Time, Error> {
	Asn1Time::from_unix(secs.try_into().map_err(|_| Error::ClockErr)?).map_err(Error::SignErr)
}

fn make_name(subject: &SubjectName) -> Result<X509Name, ErrorStack> {
	let mut x509_name = X509NameBuilder::new()?;
	x509_name.append_entry_by_text("O", &subject.organization)?;
	x509_name.append_entry_by_text("OU", &subject.organizational_unit)?;
	x509_name.append_entry_by_text("CN", &subject.common_name)?;
	Ok(x509_name.build())
}

/// Signs `template` with `privkey`, using the template as both issuer and
/// subject.
pub fn make_self_signed_cert(
	template: &CertTemplate,
	privkey: &PKeyRef<Private>,
) -> Result<X509, Error> {
	// Both ends truncate the same sub-second part, so the window stays exact.
	let not_before = unix_secs(template.not_before)?;
	let not_after = unix_secs(template.not_after().ok_or(Error::ClockErr)?)?;
	let x509_not_before = asn1_time(not_before)?;
	let x509_not_after = asn1_time(not_after)?;

	build_and_sign(template, privkey, &x509_not_before, &x509_not_after)
		.map_err(Error::SignErr)
}

fn build_and_sign(
	template: &CertTemplate,
	privkey: &PKeyRef<Private>,
	not_before: &Asn1Time,
	not_after: &Asn1Time,
) -> Result<X509, ErrorStack> {
	let x509_name = make_name(&template.subject)?;
	let x509_serial = serial_to_asn1(template.serial)?;

	let mut x509 = X509Builder::new()?;
	x509.set_version(2)?;
	x509.set_serial_number(&x509_serial)?;
	x509.set_subject_name(&x509_name)?;
	x509.set_issuer_name(&x509_name)?;
	x509.set_pubkey(privkey)?;
	x509.set_not_before(not_before)?;
	x509.set_not_after(not_after)?;

	if !template.key_usage.is_empty() {
		let mut key_usage = KeyUsage::new();
		key_usage.critical();
		for purpose in &template.key_usage {
			match purpose {
				KeyUsagePurpose::DigitalSignature => key_usage.digital_signature(),
				KeyUsagePurpose::KeyEncipherment => key_usage.key_encipherment(),
			};
		}
		x509.append_extension(key_usage.build()?)?;
	}

	if !template.extended_key_usage.is_empty() {
		let mut ext_key_usage = ExtendedKeyUsage::new();
		for purpose in &template.extended_key_usage {
			match purpose {
				ExtendedKeyUsagePurpose::ServerAuth => ext_key_usage.server_auth(),
			};
		}
		x509.append_extension(ext_key_usage.build()?)?;
	}

	if !template.ip_addresses.is_empty() {
		let mut san = SubjectAlternativeName::new();
		for addr in &template.ip_addresses {
			san.ip(&addr.to_string());
		}
		let san = san.build(&x509.x509v3_context(None, None))?;
		x509.append_extension(san)?;
	}

	x509.sign(privkey, MessageDigest::sha256())?;
	Ok(x509.build())
}

/// Issuer and subject carry the same name.
pub fn is_self_issued(cert: &X509Ref) -> Result<bool, ErrorStack> {
	Ok(cert.issuer_name().try_cmp(cert.subject_name())? == Ordering::Equal)
}

fn write_pem(path: &Path, pem: &[u8]) -> Result<(), Error> {
	let mut file = File::create(path).map_err(|source| Error::FileOpenErr {
		path: path.to_path_buf(),
		source,
	})?;
	file.write_all(pem)
		.and_then(|_| file.flush())
		.map_err(|source| Error::WriteErr {
			path: path.to_path_buf(),
			source,
		})?;
	debug!("{} bytes written to {}", pem.len(), path.display());
	Ok(())
}

fn read_pem(path: &Path) -> Result<Vec<u8>, Error> {
	let mut file = File::open(path).map_err(|source| Error::ReadErr {
		path: path.to_path_buf(),
		source,
	})?;
	let mut bytes = Vec::new();
	file.read_to_end(&mut bytes)
		.map_err(|source| Error::ReadErr {
			path: path.to_path_buf(),
			source,
		})?;
	Ok(bytes)
}

pub fn save_cert(path: &Path, cert: &X509Ref) -> Result<(), Error> {
	let pem = cert.to_pem()?;
	write_pem(path, &pem)
}

pub fn load_cert(path: &Path) -> Result<X509, Error> {
	let bytes = read_pem(path)?;
	X509::from_pem(&bytes).map_err(|source| Error::ParseErr {
		path: path.to_path_buf(),
		source,
	})
}

/// Writes the key as a PKCS#1 `RSA PRIVATE KEY` block.
pub fn save_key(path: &Path, key: &PKeyRef<Private>) -> Result<(), Error> {
	let pem = key.rsa()?.private_key_to_pem()?;
	write_pem(path, &pem)
}

pub fn load_key(path: &Path) -> Result<PKey<Private>, Error> {
	let bytes = read_pem(path)?;
	PKey::private_key_from_pem(&bytes).map_err(|source| Error::ParseErr {
		path: path.to_path_buf(),
		source,
	})
}
