//! Strongly typed analytics identifiers validated at the registry and configuration edges.
//!
//! Client identifiers travel as the HTTP Basic username on the token endpoint, so they may not
//! contain `:`. Embed identifiers arrive through comma separated configuration lists and are
//! kept short, so they may not contain `,`.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Reasons an identifier fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing was provided.
	#[error("{kind} id must not be empty.")]
	Empty {
		/// Identifier kind (`Client`, `Embed`).
		kind: &'static str,
	},
	/// Whitespace anywhere in the value.
	#[error("{kind} id must not contain whitespace.")]
	ContainsWhitespace {
		/// Identifier kind (`Client`, `Embed`).
		kind: &'static str,
	},
	/// A character reserved by the transport or configuration format.
	#[error("{kind} id must not contain {character:?}.")]
	ReservedCharacter {
		/// Identifier kind (`Client`, `Embed`).
		kind: &'static str,
		/// Offending character.
		character: char,
	},
	/// More bytes than the kind allows.
	#[error("{kind} id is longer than {max} bytes.")]
	TooLong {
		/// Identifier kind (`Client`, `Embed`).
		kind: &'static str,
		/// Byte limit for the kind.
		max: usize,
	},
}

struct IdRule {
	kind: &'static str,
	max_len: usize,
	reserved: &'static [char],
}
impl IdRule {
	fn check(&self, value: &str) -> Result<(), IdentifierError> {
		let kind = self.kind;

		if value.is_empty() {
			Err(IdentifierError::Empty { kind })
		} else if value.chars().any(char::is_whitespace) {
			Err(IdentifierError::ContainsWhitespace { kind })
		} else if let Some(character) = value.chars().find(|c| self.reserved.contains(c)) {
			Err(IdentifierError::ReservedCharacter { kind, character })
		} else if value.len() > self.max_len {
			Err(IdentifierError::TooLong { kind, max: self.max_len })
		} else {
			Ok(())
		}
	}
}

const CLIENT_RULE: IdRule = IdRule { kind: "Client", max_len: 255, reserved: &[':'] };
const EMBED_RULE: IdRule = IdRule { kind: "Embed", max_len: 64, reserved: &[','] };

macro_rules! analytics_id {
	($(#[$meta:meta])* $name:ident => $rule:ident) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates `value` and wraps it.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				Self::try_from(value.into())
			}

			/// Borrows the raw identifier.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(raw: String) -> Result<Self, IdentifierError> {
				$rule.check(&raw).map(|()| Self(raw))
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(raw: &str) -> Result<Self, IdentifierError> {
				Self::new(raw)
			}
		}
		impl From<$name> for String {
			fn from(id: $name) -> String {
				id.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				self.as_str()
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				self.as_str()
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				self.as_str()
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				Display::fmt(self.as_str(), f)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", $rule.kind, self.0)
			}
		}
	};
}

analytics_id! {
	/// Analytics OAuth client identifier; keys the service-token cache.
	ClientId => CLIENT_RULE
}
analytics_id! {
	/// Dashboard or card embed identifier exchanged for embed tokens.
	EmbedId => EMBED_RULE
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn blank_and_spaced_values_are_rejected() {
		assert_eq!(ClientId::new(""), Err(IdentifierError::Empty { kind: "Client" }));
		assert_eq!(
			ClientId::new(" client-1"),
			Err(IdentifierError::ContainsWhitespace { kind: "Client" })
		);
		assert!(EmbedId::new("ab cd").is_err());

		let client = ClientId::new("client-1").expect("Client fixture should be valid.");

		assert_eq!(client.as_str(), "client-1");
		assert_eq!(format!("{client:?}"), "Client(client-1)");
		assert_eq!(client.to_string(), "client-1");
	}

	#[test]
	fn reserved_characters_depend_on_kind() {
		assert_eq!(
			ClientId::new("tenant:client"),
			Err(IdentifierError::ReservedCharacter { kind: "Client", character: ':' })
		);
		assert_eq!(
			EmbedId::new("E1,E2"),
			Err(IdentifierError::ReservedCharacter { kind: "Embed", character: ',' })
		);
		assert!(EmbedId::new("tenant:E1").is_ok());
		assert!(ClientId::new("a,b").is_ok());
	}

	#[test]
	fn length_limits_are_inclusive() {
		assert!(EmbedId::new("e".repeat(64)).is_ok());
		assert_eq!(
			EmbedId::new("e".repeat(65)),
			Err(IdentifierError::TooLong { kind: "Embed", max: 64 })
		);
		assert!(ClientId::new("c".repeat(255)).is_ok());
		assert!(ClientId::new("c".repeat(256)).is_err());
	}

	#[test]
	fn deserialization_validates() {
		let embed: EmbedId =
			serde_json::from_str("\"E1\"").expect("Embed id should deserialize successfully.");

		assert_eq!(embed.as_str(), "E1");
		assert!(serde_json::from_str::<EmbedId>("\"\"").is_err());
		assert!(serde_json::from_str::<ClientId>("\"a:b\"").is_err());
	}

	#[test]
	fn cache_maps_look_up_by_str() {
		let map = HashMap::from([(
			ClientId::new("client-123").expect("Client used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("client-123"), Some(&7));
	}
}
