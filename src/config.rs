//! Tunable parameters for the generator and the server.
//!
//! Every field has a `Default` matching the behaviour of the tool when run
//! without arguments.

use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	path::PathBuf,
	time::Duration,
};

use crate::error::Error;

pub const DEFAULT_CERT_PATH: &str = "cert.pem";
pub const DEFAULT_KEY_PATH: &str = "key.pem";
pub const DEFAULT_VALIDITY_DAYS: u64 = 365;
pub const DEFAULT_KEY_BITS: u32 = 2048;
pub const DEFAULT_PORT: u16 = 8080;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Identity written into both the subject and issuer of the certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectName {
	pub organization: String,
	pub organizational_unit: String,
	pub common_name: String,
}

impl Default for SubjectName {
	fn default() -> Self {
		SubjectName {
			organization: "manning Publications Co.".to_string(),
			organizational_unit: "Books".to_string(),
			common_name: "Go Web Programming".to_string(),
		}
	}
}

/// Everything `gen_key_and_cert` needs to know.
#[derive(Clone, Debug)]
pub struct CertConfig {
	pub cert_path: PathBuf,
	pub key_path: PathBuf,
	pub subject: SubjectName,
	/// Distance between not-before and not-after.
	pub validity: Duration,
	/// RSA modulus size.
	pub key_bits: u32,
	/// Addresses bound into the subject alternative name.
	pub ip_addresses: Vec<IpAddr>,
}

impl CertConfig {
	pub fn validity_from_days(days: u64) -> Result<Duration, Error> {
		days.checked_mul(SECS_PER_DAY)
			.map(Duration::from_secs)
			.ok_or(Error::ClockErr)
	}
}

impl Default for CertConfig {
	fn default() -> Self {
		CertConfig {
			cert_path: PathBuf::from(DEFAULT_CERT_PATH),
			key_path: PathBuf::from(DEFAULT_KEY_PATH),
			subject: SubjectName::default(),
			validity: Duration::from_secs(DEFAULT_VALIDITY_DAYS * SECS_PER_DAY),
			key_bits: DEFAULT_KEY_BITS,
			ip_addresses: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
		}
	}
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
	pub addr: SocketAddr,
}

impl Default for ServerConfig {
	fn default() -> Self {
		ServerConfig {
			addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_validity_is_one_year_of_days() {
		let config = CertConfig::default();
		assert_eq!(config.validity, Duration::from_secs(365 * 24 * 3600));
	}

	#[test]
	fn validity_from_days_counts_whole_days() {
		assert_eq!(
			CertConfig::validity_from_days(30).unwrap(),
			Duration::from_secs(30 * 24 * 3600)
		);
		assert_eq!(CertConfig::validity_from_days(0).unwrap(), Duration::from_secs(0));
	}

	#[test]
	fn validity_from_days_rejects_overflow() {
		assert!(matches!(
			CertConfig::validity_from_days(u64::MAX / 1000),
			Err(Error::ClockErr)
		));
		assert!(matches!(
			CertConfig::validity_from_days(u64::MAX),
			Err(Error::ClockErr)
		));
	}

	#[test]
	fn default_binds_loopback_only() {
		let config = CertConfig::default();
		assert_eq!(config.ip_addresses, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
		assert_eq!(config.key_bits, 2048);
	}

	#[test]
	fn default_server_listens_on_all_interfaces() {
		let expected: SocketAddr = "0.0.0.0:8080".parse().unwrap();
		assert_eq!(ServerConfig::default().addr, expected);
	}
}
