pub mod error;
pub mod source;

pub use error::RewriteError;
pub use source::Rewriter;

use serde::Deserialize;

use bytecode::lua51::{Chunk, Serializer};

fn default_decrypt_table_len() -> usize {
	32
}

// external settings surface; field names follow the tool's config keys
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
	#[serde(default)]
	pub encrypt_strings: bool,
	#[serde(default)]
	pub encrypt_important_strings: bool,
	#[serde(default = "default_decrypt_table_len")]
	pub decrypt_table_len: usize,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			encrypt_strings: false,
			encrypt_important_strings: false,
			decrypt_table_len: default_decrypt_table_len(),
		}
	}
}

pub struct Obfuscator {
	settings: Settings,
}

impl Obfuscator {
	pub fn new(settings: Settings) -> Self {
		Self { settings }
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	// string-encryption pass; marked literals opt in even with both global
	// stages disabled
	pub fn obfuscate_source(&self, source: &str) -> Result<String, RewriteError> {
		Rewriter::new(self.settings.clone()).rewrite(source)
	}

	// bytecode pass; every emission owns a fresh opcode scramble
	pub fn obfuscate_bytecode(&self, chunk: &mut Chunk) -> Vec<u8> {
		Serializer::new().serialize(chunk)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn settings_deserialize_from_config_keys() {
		let settings: Settings = toml::from_str(
			"EncryptStrings = true\nEncryptImportantStrings = false\nDecryptTableLen = 16\n",
		)
		.unwrap();
		assert!(settings.encrypt_strings);
		assert!(!settings.encrypt_important_strings);
		assert_eq!(settings.decrypt_table_len, 16);
	}

	#[test]
	fn settings_fields_default_when_absent() {
		let settings: Settings = toml::from_str("EncryptStrings = true\n").unwrap();
		assert!(settings.encrypt_strings);
		assert!(!settings.encrypt_important_strings);
		assert_eq!(settings.decrypt_table_len, 32);
	}

	#[test]
	fn obfuscator_emits_a_parseable_stream_header() {
		let obfuscator = Obfuscator::new(Settings::default());
		let mut chunk = Chunk::default();
		let out = obfuscator.obfuscate_bytecode(&mut chunk);
		assert_eq!(&out[..4], &[0xde, 0xad, 0xbe, 0xef]);
	}
}
