pub mod fulltext;
pub mod openalex;
pub mod producer;
pub mod ranker;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = extra_headers(default_headers)?;

	headers.insert(AUTHORIZATION, header_value("authorization", &format!("Bearer {api_key}"))?);

	Ok(headers)
}

pub fn extra_headers(default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| Error::InvalidHeader {
			name: key.clone(),
			message: err.to_string(),
		})?;

		headers.insert(name, header_value(key, raw)?);
	}

	Ok(headers)
}

pub(crate) fn header_value(name: &str, raw: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(raw)
		.map_err(|err| Error::InvalidHeader { name: name.to_string(), message: err.to_string() })
}

/// Reads an id that may arrive as a JSON string or number.
pub(crate) fn id_string(value: &Value) -> Option<String> {
	match value {
		Value::String(raw) => Some(raw.trim().to_string()).filter(|id| !id.is_empty()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}
