//! Media URL resolution.
//!
//! Token metadata frequently points at `ipfs://` URLs that browsers and
//! HTTP clients cannot fetch directly. This rewrites them through a
//! configured HTTP gateway and leaves every other URL untouched.

/// Rewrites an `ipfs://` URL through the given HTTP gateway.
///
/// Accepts both `ipfs://<cid>/...` and the `ipfs://ipfs/<cid>/...` form
/// some tooling emits. Non-IPFS URLs are returned unchanged.
pub fn resolve_media_url(raw: &str, gateway: &str) -> String {
	match raw.strip_prefix("ipfs://") {
		Some(rest) => {
			let rest = rest.strip_prefix("ipfs/").unwrap_or(rest);
			if gateway.ends_with('/') {
				format!("{}{}", gateway, rest)
			} else {
				format!("{}/{}", gateway, rest)
			}
		}
		None => raw.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const GATEWAY: &str = "https://ipfs.io/ipfs/";

	#[test]
	fn test_ipfs_url_is_rewritten() {
		assert_eq!(
			resolve_media_url("ipfs://QmHash/42.png", GATEWAY),
			"https://ipfs.io/ipfs/QmHash/42.png"
		);
	}

	#[test]
	fn test_double_ipfs_prefix() {
		assert_eq!(
			resolve_media_url("ipfs://ipfs/QmHash/42.png", GATEWAY),
			"https://ipfs.io/ipfs/QmHash/42.png"
		);
	}

	#[test]
	fn test_gateway_without_trailing_slash() {
		assert_eq!(
			resolve_media_url("ipfs://QmHash", "https://gateway.example.org/ipfs"),
			"https://gateway.example.org/ipfs/QmHash"
		);
	}

	#[test]
	fn test_http_url_is_untouched() {
		assert_eq!(
			resolve_media_url("https://cdn.example.org/42.png", GATEWAY),
			"https://cdn.example.org/42.png"
		);
	}
}
