use std::fmt;
use std::sync::Arc;

use async_std::net::TcpStream;

use http_types::{Request, Response, StatusCode};

use log::debug;

use crate::error::Error;

pub type Handler = fn(&Request) -> Response;

/// Maps path patterns to handlers.
///
/// A pattern ending in `/` matches every path below it, any other pattern
/// matches only itself. When several patterns match, the longest wins.
#[derive(Clone, Default)]
pub struct Router {
	routes: Vec<(String, Handler)>,
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.routes.iter().map(|(pattern, _)| pattern))
			.finish()
	}
}

impl Router {
	pub fn new() -> Self { Router::default() }

	/// A router answering every path with [`echo`].
	pub fn echo() -> Self { Router::new().route("/", echo) }

	pub fn route(mut self, pattern: &str, handler: Handler) -> Self {
		self.routes.retain(|(p, _)| p != pattern);
		self.routes.push((pattern.to_string(), handler));
		self
	}

	pub fn handler_for(&self, path: &str) -> Option<Handler> {
		self.routes
			.iter()
			.filter(|(pattern, _)| matches_pattern(pattern, path))
			.max_by_key(|(pattern, _)| pattern.len())
			.map(|(_, handler)| *handler)
	}

	/// Dispatches on the percent-decoded path.
	pub fn respond(&self, request: &Request) -> Response {
		match self.handler_for(&decoded_path(request)) {
			Some(handler) => handler(request),
			None => not_found(request),
		}
	}
}

/// Invalid UTF-8 after decoding is replaced rather than rejected.
fn decoded_path(request: &Request) -> String {
	let raw = request.url().path();
	String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

fn matches_pattern(pattern: &str, path: &str) -> bool {
	if pattern.ends_with('/') {
		path.starts_with(pattern)
	}
	else {
		path == pattern
	}
}

fn not_found(_request: &Request) -> Response {
	let mut response = Response::new(StatusCode::NotFound);
	response.set_body("404 page not found\n");
	response
}

/// Greets with the decoded request path, minus its leading `/`.
pub fn echo(request: &Request) -> Response {
	let path = decoded_path(request);
	let name = path.strip_prefix('/').unwrap_or(&path);
	let mut response = Response::new(StatusCode::Ok);
	response.set_body(format!("Hello Go Web {}", name));
	response
}

pub async fn handle_connection(router: Arc<Router>, client_stream: TcpStream) -> Result<(), Error> {
	async_h1::accept(client_stream, |request| {
		let router = router.clone();
		async move {
			debug!("{} {}", request.method(), request.url().path());
			Ok::<_, http_types::Error>(router.respond(&request))
		}
	})
	.await
	.map_err(|_| Error::HttpTypeErr)
}

#[cfg(test)]
mod tests {
	use super::*;

	use http_types::{Method, Url};

	fn request(method: Method, path: &str) -> Request {
		let url = Url::parse("http://localhost").unwrap().join(path).unwrap();
		Request::new(method, url)
	}

	fn teapot(_request: &Request) -> Response { Response::new(StatusCode::ImATeapot) }

	#[async_std::test]
	async fn echo_strips_leading_slash() {
		let mut response = echo(&request(Method::Get, "/gopher"));
		assert_eq!(response.status(), StatusCode::Ok);
		assert_eq!(response.body_string().await.unwrap(), "Hello Go Web gopher");
	}

	#[async_std::test]
	async fn echo_root_has_empty_suffix() {
		let mut response = echo(&request(Method::Get, "/"));
		assert_eq!(response.body_string().await.unwrap(), "Hello Go Web ");
	}

	#[async_std::test]
	async fn echo_decodes_escaped_path() {
		let mut response = echo(&request(Method::Get, "/hello%20world"));
		assert_eq!(response.body_string().await.unwrap(), "Hello Go Web hello world");

		let mut response = echo(&request(Method::Get, "/caf%C3%A9/%2Fslash"));
		assert_eq!(response.body_string().await.unwrap(), "Hello Go Web café//slash");
	}

	#[test]
	fn decoded_path_replaces_invalid_utf8() {
		assert_eq!(decoded_path(&request(Method::Get, "/a%FFb")), "/a\u{FFFD}b");
	}

	#[async_std::test]
	async fn echo_keeps_nested_segments() {
		let mut response = Router::echo().respond(&request(Method::Get, "/a/b/c"));
		assert_eq!(response.body_string().await.unwrap(), "Hello Go Web a/b/c");
	}

	#[async_std::test]
	async fn echo_ignores_method() {
		let router = Router::echo();
		for method in &[Method::Get, Method::Post, Method::Delete, Method::Put] {
			let mut response = router.respond(&request(*method, "/x"));
			assert_eq!(response.status(), StatusCode::Ok);
			assert_eq!(response.body_string().await.unwrap(), "Hello Go Web x");
		}
	}

	#[test]
	fn longest_pattern_wins() {
		let router = Router::echo().route("/tea/", teapot);
		assert_eq!(
			router.respond(&request(Method::Get, "/tea/green")).status(),
			StatusCode::ImATeapot
		);
		assert_eq!(
			router.respond(&request(Method::Get, "/coffee")).status(),
			StatusCode::Ok
		);
	}

	#[test]
	fn exact_pattern_matches_only_itself() {
		let router = Router::new().route("/tea", teapot);
		assert_eq!(
			router.respond(&request(Method::Get, "/tea")).status(),
			StatusCode::ImATeapot
		);
		assert_eq!(
			router.respond(&request(Method::Get, "/tea/green")).status(),
			StatusCode::NotFound
		);
	}

	#[test]
	fn routes_match_decoded_path() {
		let router = Router::new().route("/tea pot", teapot);
		assert_eq!(
			router.respond(&request(Method::Get, "/tea%20pot")).status(),
			StatusCode::ImATeapot
		);
	}

	#[test]
	fn empty_router_is_not_found() {
		let router = Router::new();
		assert!(router.handler_for("/").is_none());
		assert_eq!(
			router.respond(&request(Method::Get, "/")).status(),
			StatusCode::NotFound
		);
	}

	#[test]
	fn reregistering_replaces_handler() {
		let router = Router::echo().route("/", teapot);
		assert_eq!(
			router.respond(&request(Method::Get, "/anything")).status(),
			StatusCode::ImATeapot
		);
	}
}
