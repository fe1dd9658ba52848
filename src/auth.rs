//! Auth-domain identifiers, session identities, and token models.

pub mod id;
pub mod identity;
pub mod token;

pub use id::*;
pub use identity::*;
pub use token::{secret::*, service::*};

// crates.io
use serde::{Deserializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Deserializes an optional value, treating missing, `null`, and blank strings as absent.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: TryFrom<String>,
	T::Error: Display,
{
	match Option::<String>::deserialize(deserializer)? {
		Some(raw) if !raw.trim().is_empty() => T::try_from(raw).map(Some).map_err(DeError::custom),
		_ => Ok(None),
	}
}
