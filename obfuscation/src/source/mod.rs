mod decryptor;
mod keytable;
mod scanner;

pub use decryptor::Decryptor;
pub use keytable::KeyTable;
pub use scanner::{unescape_lua_string, Literal, Scanner, MARK_SENTINEL};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::RewriteError;
use crate::Settings;

// case-insensitive substrings that pull a literal into the important stage
const IMPORTANT: [&[u8]; 4] = [b"http", b"function", b"metatable", b"local"];

// scheduled splice over the original source
struct Replacement {
	start: usize,
	end: usize,
	text: String,
}

pub struct Rewriter<R: Rng = StdRng> {
	settings: Settings,
	scanner: Scanner,
	rng: R,
}

impl Rewriter<StdRng> {
	pub fn new(settings: Settings) -> Self {
		Self::with_rng(settings, StdRng::from_entropy())
	}
}

impl<R: Rng> Rewriter<R> {
	pub fn with_rng(settings: Settings, rng: R) -> Self {
		Self {
			settings,
			scanner: Scanner::new(),
			rng,
		}
	}

	pub fn rewrite(&mut self, source: &str) -> Result<String, RewriteError> {
		let literals = self.scanner.scan(source)?;
		let ceiling = self.settings.decrypt_table_len;
		let mut replacements: Vec<Replacement> = vec![];

		if self.settings.encrypt_strings {
			// one decryptor shared by every literal, sized to the longest
			let longest = literals.iter().map(|l| l.decoded.len()).max().unwrap_or(0);
			let shared = Decryptor::generate(&mut self.rng, longest, ceiling);
			for lit in &literals {
				replacements.push(Replacement {
					start: lit.start,
					end: lit.end,
					text: shared.emit(&lit.decoded),
				});
			}
		} else {
			// marked literals opt in individually
			for lit in literals.iter().filter(|l| l.marked) {
				let dec = Decryptor::generate(&mut self.rng, lit.decoded.len(), ceiling);
				replacements.push(Replacement {
					start: lit.start,
					end: lit.end,
					text: dec.emit(&lit.decoded),
				});
			}
		}

		if self.settings.encrypt_important_strings {
			for lit in literals.iter().filter(|l| is_important(&l.decoded)) {
				let dec = Decryptor::generate(&mut self.rng, lit.decoded.len(), ceiling);
				replacements.push(Replacement {
					start: lit.start,
					end: lit.end,
					text: dec.emit(&lit.decoded),
				});
			}
		}

		debug!(
			literals = literals.len(),
			replacements = replacements.len(),
			"string encryption pass"
		);

		Ok(apply(source, replacements))
	}
}

fn is_important(decoded: &[u8]) -> bool {
	let lowered = decoded.to_ascii_lowercase();
	IMPORTANT
		.iter()
		.any(|needle| lowered.windows(needle.len()).any(|w| w == *needle))
}

// splice right-to-left so earlier offsets stay valid; anything overlapping
// an already-applied range or running past the buffer is dropped
fn apply(source: &str, mut replacements: Vec<Replacement>) -> String {
	replacements.sort_by(|a, b| b.start.cmp(&a.start));

	let mut out = source.to_string();
	let mut floor = out.len();
	for rep in replacements {
		if rep.end > floor || rep.end > out.len() {
			continue;
		}
		out.replace_range(rep.start..rep.end, &rep.text);
		floor = rep.start;
	}
	out
}
