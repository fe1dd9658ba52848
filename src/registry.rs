//! Static credential registry mapping user emails to analytics credentials and embeds.
//!
//! The registry is a JSON array loaded once at startup:
//!
//! ```json
//! [
//! 	{ "email": "analyst@example.com", "embed_id": "E1", "client_id": "c-1", "client_secret": "s-1" },
//! 	{ "email": "analyst@example.com", "embed_id": "E2" }
//! ]
//! ```
//!
//! Emails match case-insensitively. Several records may share an email: every record
//! contributes its embed id, while only the first one is consulted for credentials.

// std
use std::fs;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, EmbedId, IdentifierError, Secret},
};

/// Errors raised while loading the registry file.
#[derive(Debug, ThisError)]
pub enum RegistryError {
	/// Registry file could not be read.
	#[error("Failed to read credential registry {}.", .path.display())]
	Read {
		/// Path that failed to load.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Registry contents are not a valid record array.
	#[error("Credential registry is malformed at `{}`.", .source.path())]
	Parse {
		/// Structured parsing failure, including the JSON path of the bad record.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// One registry record.
///
/// Credentials may be spelled `DOMO_CLIENT_ID`, `client_id` or `DOMO_CLIENTID` (and likewise
/// for the secret); the first non-blank spelling in that order wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRegistryEntry")]
pub struct RegistryEntry {
	/// Email the record applies to.
	pub email: String,
	/// Embed identifier the user may view.
	pub embed_id: EmbedId,
	/// Client identifier override; blank values count as absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_id: Option<ClientId>,
	/// Client secret paired with `client_id`; blank values count as absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_secret: Option<Secret>,
}
impl TryFrom<RawRegistryEntry> for RegistryEntry {
	type Error = IdentifierError;

	fn try_from(raw: RawRegistryEntry) -> Result<Self, Self::Error> {
		let client_id = [raw.domo_client_id, raw.client_id, raw.domo_clientid]
			.into_iter()
			.flatten()
			.find(|value| !value.trim().is_empty())
			.map(ClientId::new)
			.transpose()?;
		let client_secret = [raw.domo_client_secret, raw.client_secret, raw.domo_clientsecret]
			.into_iter()
			.flatten()
			.find(|value| !value.trim().is_empty())
			.map(Secret::new);

		Ok(Self { email: raw.email, embed_id: raw.embed_id, client_id, client_secret })
	}
}

#[derive(Deserialize)]
struct RawRegistryEntry {
	#[serde(default)]
	email: String,
	embed_id: EmbedId,
	#[serde(default, rename = "DOMO_CLIENT_ID")]
	domo_client_id: Option<String>,
	#[serde(default)]
	client_id: Option<String>,
	#[serde(default, rename = "DOMO_CLIENTID")]
	domo_clientid: Option<String>,
	#[serde(default, rename = "DOMO_CLIENT_SECRET")]
	domo_client_secret: Option<String>,
	#[serde(default)]
	client_secret: Option<String>,
	#[serde(default, rename = "DOMO_CLIENTSECRET")]
	domo_clientsecret: Option<String>,
}
impl RegistryEntry {
	/// Builds a record granting `embed_id` to `email` without credential overrides.
	pub fn new(email: impl Into<String>, embed_id: EmbedId) -> Self {
		Self { email: email.into(), embed_id, client_id: None, client_secret: None }
	}

	/// Attaches client credential overrides.
	pub fn with_credentials(mut self, client_id: ClientId, client_secret: impl Into<Secret>) -> Self {
		self.client_id = Some(client_id);
		self.client_secret = Some(client_secret.into());

		self
	}
}

/// Immutable, ordered credential registry.
#[derive(Clone, Debug, Default)]
pub struct CredentialRegistry {
	entries: Vec<RegistryEntry>,
}
impl CredentialRegistry {
	/// Wraps an ordered list of records.
	pub fn from_entries(entries: impl IntoIterator<Item = RegistryEntry>) -> Self {
		Self { entries: entries.into_iter().collect() }
	}

	/// Parses a JSON record array.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self, RegistryError> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);
		let entries: Vec<RegistryEntry> = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| RegistryError::Parse { source })?;

		Ok(Self { entries })
	}

	/// Reads and parses the registry file at `path`.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
		let path = path.as_ref();
		let bytes = fs::read(path)
			.map_err(|source| RegistryError::Read { path: path.to_path_buf(), source })?;

		Self::from_json_slice(&bytes)
	}

	/// Records in registry order.
	pub fn entries(&self) -> &[RegistryEntry] {
		&self.entries
	}

	/// Number of records.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` if the registry holds no records.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over every record whose email matches `email` case-insensitively.
	///
	/// An empty `email` matches nothing.
	pub fn matching<'a>(&'a self, email: &str) -> impl Iterator<Item = &'a RegistryEntry> + use<'a> {
		let wanted = email.to_lowercase();

		self.entries
			.iter()
			.filter(move |entry| !wanted.is_empty() && entry.email.to_lowercase() == wanted)
	}

	/// First record matching `email`, the one consulted for credentials.
	pub fn first_match(&self, email: &str) -> Option<&RegistryEntry> {
		self.matching(email).next()
	}

	/// Embed identifiers granted to `email`, in registry order.
	pub fn embed_ids_for(&self, email: &str) -> Vec<EmbedId> {
		self.matching(email).map(|entry| entry.embed_id.clone()).collect()
	}
}
