use bytecode::encoding::{latin1_byte, latin1_bytes};
use regex::Regex;

use crate::error::RewriteError;

// decoded literals opening with this prefix opt themselves into encryption
pub const MARK_SENTINEL: &[u8] = b"[STR_ENCRYPT]";

// both quote forms plus the long-bracket opener; the closing bracket level
// cannot be expressed without backreferences, so the scanner completes long
// matches by hand
const LITERAL_PATTERN: &str = r#"(?s)'(?:[^\\]|\\.)*?'|"(?:[^\\]|\\.)*?"|\[(=*)\["#;

#[derive(Debug, PartialEq)]
pub struct Literal {
	pub start: usize,
	pub end: usize,
	pub decoded: Vec<u8>,
	pub marked: bool,
}

impl Literal {
	fn new(start: usize, end: usize, mut decoded: Vec<u8>) -> Self {
		let marked = decoded.starts_with(MARK_SENTINEL);
		if marked {
			decoded.drain(..MARK_SENTINEL.len());
		}
		Self {
			start,
			end,
			decoded,
			marked,
		}
	}
}

pub struct Scanner {
	pattern: Regex,
}

impl Scanner {
	pub fn new() -> Self {
		Self {
			pattern: Regex::new(LITERAL_PATTERN).unwrap(),
		}
	}

	pub fn scan(&self, source: &str) -> Result<Vec<Literal>, RewriteError> {
		let mut literals = vec![];
		let mut pos = 0;

		while let Some(caps) = self.pattern.captures_at(source, pos) {
			let m = caps.get(0).unwrap();
			if let Some(level) = caps.get(1) {
				// long bracket: the span ends at the level-matched terminator,
				// content is taken verbatim with no escape decoding
				let closer = format!("]{}]", "=".repeat(level.as_str().len()));
				match source[m.end()..].find(&closer) {
					Some(off) => {
						let content = &source[m.end()..m.end() + off];
						let end = m.end() + off + closer.len();
						literals.push(Literal::new(m.start(), end, latin1_bytes(content)));
						pos = end;
					}
					// unterminated opener; skip past it
					None => pos = m.end(),
				}
			} else {
				let text = m.as_str();
				let inner = &text[1..text.len() - 1];
				let decoded = unescape_at(inner, m.start() + 1)?;
				literals.push(Literal::new(m.start(), m.end(), decoded));
				pos = m.end();
			}
		}

		Ok(literals)
	}
}

impl Default for Scanner {
	fn default() -> Self {
		Self::new()
	}
}

pub fn unescape_lua_string(text: &str) -> Result<Vec<u8>, RewriteError> {
	unescape_at(text, 0)
}

fn unescape_at(text: &str, base: usize) -> Result<Vec<u8>, RewriteError> {
	let mut out = Vec::with_capacity(text.len());
	let mut iter = text.char_indices().peekable();

	while let Some((i, c)) = iter.next() {
		if c != '\\' {
			out.push(latin1_byte(c));
			continue;
		}
		let Some((_, esc)) = iter.next() else {
			return Err(RewriteError::TrailingBackslash { pos: base + i });
		};
		match esc {
			'a' => out.push(0x07),
			'b' => out.push(0x08),
			'f' => out.push(0x0c),
			'n' => out.push(0x0a),
			'r' => out.push(0x0d),
			't' => out.push(0x09),
			'v' => out.push(0x0b),
			'0'..='9' => {
				// longest run of at most three decimal digits
				let mut digits = String::from(esc);
				while digits.len() < 3 {
					match iter.peek() {
						Some((_, d)) if d.is_ascii_digit() => {
							digits.push(*d);
							iter.next();
						}
						_ => break,
					}
				}
				let value: u32 = digits.parse().unwrap();
				if value > 255 {
					return Err(RewriteError::EscapeOverflow {
						digits,
						pos: base + i,
					});
				}
				out.push(value as u8);
			}
			// any other escaped character stands for itself
			other => out.push(latin1_byte(other)),
		}
	}

	Ok(out)
}
