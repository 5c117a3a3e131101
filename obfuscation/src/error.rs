use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RewriteError {
	#[error("numeric escape \\{digits} at byte {pos} is out of range")]
	EscapeOverflow { digits: String, pos: usize },

	#[error("unescaped trailing backslash at byte {pos}")]
	TrailingBackslash { pos: usize },
}
