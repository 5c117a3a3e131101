use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use super::keytable::KeyTable;

static COUNTER: AtomicUsize = AtomicUsize::new(1);

fn next_label() -> String {
	format!("xk_{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

// three-digit zero-padded decimal escapes; every byte goes out as \DDD so
// the emitted literal survives any quoting context
fn lua_escape(bytes: &[u8]) -> String {
	let mut out = String::with_capacity(bytes.len() * 4);
	for b in bytes {
		out.push_str(&format!("\\{:03}", b));
	}
	out
}

// a key table plus the label it is emitted under; the label is only a
// marker in the output, nothing may depend on it
pub struct Decryptor {
	label: String,
	key: KeyTable,
}

impl Decryptor {
	pub fn generate<R: Rng>(rng: &mut R, want: usize, ceiling: usize) -> Self {
		Self {
			label: next_label(),
			key: KeyTable::generate(rng, want, ceiling),
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn key(&self) -> &KeyTable {
		&self.key
	}

	// self-contained Lua 5.1 expression; xor_op stays within plain
	// arithmetic so no bit library is needed at load time
	pub fn emit(&self, payload: &[u8]) -> String {
		let cipher = self.key.xor(payload);
		format!(
			"((function(data) --[[{label}]] local function xor_op(a,b) local r=0; local m=1; while a>0 or b>0 do local x=a%2; local y=b%2; if x~=y then r=r+m end; a=(a-x)/2; b=(b-y)/2; m=m*2; end; return r; end; local key_str=\"{key}\"; local key_len={key_len}; local res={{}}; local byte=string.byte; local char=string.char; local len=#data; for i=1,len do res[i]=char(xor_op(byte(data,i), byte(key_str,(i-1)%key_len+1))); end; return table.concat(res); end)(\"{data}\"))",
			label = self.label,
			key = lua_escape(self.key.bytes()),
			key_len = self.key.len(),
			data = lua_escape(&cipher),
		)
	}
}
