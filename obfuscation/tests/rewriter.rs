use obfuscation::source::unescape_lua_string;
use obfuscation::{Rewriter, Settings};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn rewriter(settings: Settings) -> Rewriter<StdRng> {
	Rewriter::with_rng(settings, StdRng::seed_from_u64(0x5eed))
}

// pull the \DDD escape string out of a `key_str="..."` or `)("...")` slot
fn decode_escapes(escaped: &str) -> Vec<u8> {
	unescape_lua_string(escaped).unwrap()
}

fn extract<'a>(output: &'a str, prefix: &str, suffix: &str) -> &'a str {
	let at = output.find(prefix).unwrap() + prefix.len();
	let end = output[at..].find(suffix).unwrap();
	&output[at..at + end]
}

#[test]
fn encrypt_all_replaces_every_literal() {
	let settings = Settings {
		encrypt_strings: true,
		..Settings::default()
	};
	let out = rewriter(settings).rewrite(r#"print("hi")"#).unwrap();

	assert!(out.starts_with("print(((function(data)"));
	assert!(out.ends_with("))"));
	assert!(!out.contains("\"hi\""));
}

#[test]
fn emitted_snippet_decrypts_back_to_the_literal() {
	let settings = Settings {
		encrypt_strings: true,
		..Settings::default()
	};
	let out = rewriter(settings).rewrite(r#"print("hi")"#).unwrap();

	let key = decode_escapes(extract(&out, "local key_str=\"", "\""));
	let key_len: usize = extract(&out, "local key_len=", ";").parse().unwrap();
	assert_eq!(key.len(), key_len);

	let cipher = decode_escapes(extract(&out, "end)(\"", "\""));
	let plain: Vec<u8> = cipher
		.iter()
		.enumerate()
		.map(|(i, b)| b ^ key[i % key.len()])
		.collect();
	assert_eq!(plain, b"hi".to_vec());
}

#[test]
fn shared_decryptor_is_sized_to_the_longest_literal() {
	let settings = Settings {
		encrypt_strings: true,
		decrypt_table_len: 64,
		..Settings::default()
	};
	let out = rewriter(settings)
		.rewrite(r#"a = "four"; b = "a much longer literal""#)
		.unwrap();

	let key_len: usize = extract(&out, "local key_len=", ";").parse().unwrap();
	assert_eq!(key_len, "a much longer literal".len());
}

#[test]
fn ceiling_caps_the_shared_key_table() {
	let settings = Settings {
		encrypt_strings: true,
		decrypt_table_len: 8,
		..Settings::default()
	};
	let out = rewriter(settings)
		.rewrite(r#"b = "a much longer literal""#)
		.unwrap();

	let key_len: usize = extract(&out, "local key_len=", ";").parse().unwrap();
	assert_eq!(key_len, 8);
}

#[test]
fn important_stage_only_touches_matching_literals() {
	let settings = Settings {
		encrypt_strings: false,
		encrypt_important_strings: true,
		..Settings::default()
	};
	let source = r#"local a = "safe"; local b = "function""#;
	let out = rewriter(settings).rewrite(source).unwrap();

	assert!(out.contains(r#"local a = "safe";"#));
	assert!(!out.contains(r#""function""#));
	assert!(out.contains("((function(data)"));
}

#[test]
fn marked_literals_opt_in_when_everything_is_off() {
	let source = "local k = '[STR_ENCRYPT]secret'; local p = 'plain'";
	let out = rewriter(Settings::default()).rewrite(source).unwrap();

	assert!(!out.contains("secret"));
	assert!(!out.contains("STR_ENCRYPT"));
	assert!(out.contains("local p = 'plain'"));

	let key = decode_escapes(extract(&out, "local key_str=\"", "\""));
	let cipher = decode_escapes(extract(&out, "end)(\"", "\""));
	let plain: Vec<u8> = cipher
		.iter()
		.enumerate()
		.map(|(i, b)| b ^ key[i % key.len()])
		.collect();
	assert_eq!(plain, b"secret".to_vec());
}

#[test]
fn untouched_regions_survive_verbatim() {
	let settings = Settings {
		encrypt_strings: true,
		..Settings::default()
	};
	let source = "if x then\n\tprint('a')\nend -- trailing comment\ny = 'b'";
	let out = rewriter(settings).rewrite(source).unwrap();

	assert!(out.starts_with("if x then\n\tprint("));
	assert!(out.contains("end -- trailing comment\ny = "));
	assert!(!out.contains("'a'"));
	assert!(!out.contains("'b'"));
}

#[test]
fn no_flags_and_no_marks_is_the_identity() {
	let source = "local a = 'one'\nlocal b = \"two\"\n";
	let out = rewriter(Settings::default()).rewrite(source).unwrap();
	assert_eq!(out, source);
}

#[test]
fn escape_errors_carry_their_position() {
	let settings = Settings {
		encrypt_strings: true,
		..Settings::default()
	};
	let err = rewriter(settings).rewrite("x = '\\999'").unwrap_err();
	assert_eq!(format!("{}", err), "numeric escape \\999 at byte 5 is out of range");
}
