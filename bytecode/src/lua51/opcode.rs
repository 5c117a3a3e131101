use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use rand::seq::SliceRandom;
use rand::Rng;

pub const OPCODE_COUNT: usize = 40;

// canonical order; the last two are the emitter's pseudo-operations
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
	Move = 0,
	LoadK,
	LoadBool,
	LoadNil,
	GetUpval,
	GetGlobal,
	GetTable,
	SetGlobal,
	SetUpval,
	SetTable,
	NewTable,
	Self_,
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	Pow,
	Unm,
	Not,
	Len,
	Concat,
	Jump,
	Eq,
	Lt,
	Le,
	Test,
	TestSet,
	Call,
	TailCall,
	Return,
	ForLoop,
	ForPrep,
	TForLoop,
	SetList,
	Close,
	Closure,
	VarArg,
	Nop,
	ExtraArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opmode {
	Abc,
	Abx,
	AsBx,
}

impl Opcode {
	pub fn opmode(&self) -> Opmode {
		match self {
			Self::LoadK | Self::GetGlobal | Self::SetGlobal | Self::Closure | Self::ExtraArg => Opmode::Abx,
			Self::Jump | Self::ForLoop | Self::ForPrep => Opmode::AsBx,
			_ => Opmode::Abc,
		}
	}
}

// bijection from the canonical opcodes onto [0, 39]; owned by a serializer
// instance and never written to the stream
#[derive(Debug, Clone)]
pub struct ScrambleMap([u8; OPCODE_COUNT]);

impl ScrambleMap {
	pub fn random<R: Rng>(rng: &mut R) -> Self {
		let mut table = [0u8; OPCODE_COUNT];
		for (i, slot) in table.iter_mut().enumerate() {
			*slot = i as u8;
		}
		table.shuffle(rng);
		Self(table)
	}

	// test seam; rejects anything that is not a bijection on [0, 39]
	pub fn from_table(table: [u8; OPCODE_COUNT]) -> Option<Self> {
		let mut seen = [false; OPCODE_COUNT];
		for &v in &table {
			if v as usize >= OPCODE_COUNT || seen[v as usize] {
				return None;
			}
			seen[v as usize] = true;
		}
		Some(Self(table))
	}

	#[inline]
	pub fn get(&self, op: Opcode) -> u8 {
		self.0[op as usize]
	}

	// inverse lookup for the paired consumer
	pub fn unscramble(&self, idx: u8) -> Option<Opcode> {
		self.0
			.iter()
			.position(|&v| v == idx)
			.and_then(Opcode::from_usize)
	}
}

#[cfg(test)]
mod tests {
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	use super::*;

	fn identity_table() -> [u8; OPCODE_COUNT] {
		let mut table = [0u8; OPCODE_COUNT];
		for (i, slot) in table.iter_mut().enumerate() {
			*slot = i as u8;
		}
		table
	}

	#[test]
	fn random_map_is_a_bijection() {
		let mut rng = StdRng::seed_from_u64(7);
		let map = ScrambleMap::random(&mut rng);
		let mut seen = [false; OPCODE_COUNT];
		for i in 0..OPCODE_COUNT {
			let op = Opcode::from_usize(i).unwrap();
			let idx = map.get(op) as usize;
			assert!(idx < OPCODE_COUNT);
			assert!(!seen[idx], "index {} assigned twice", idx);
			seen[idx] = true;
		}
	}

	#[test]
	fn unscramble_inverts_get() {
		let mut rng = StdRng::seed_from_u64(99);
		let map = ScrambleMap::random(&mut rng);
		for i in 0..OPCODE_COUNT {
			let op = Opcode::from_usize(i).unwrap();
			assert_eq!(map.unscramble(map.get(op)), Some(op));
		}
		assert_eq!(map.unscramble(OPCODE_COUNT as u8), None);
	}

	#[test]
	fn from_table_rejects_duplicates_and_gaps() {
		let mut table = identity_table();
		table[3] = 4;
		assert!(ScrambleMap::from_table(table).is_none());

		let mut table = identity_table();
		table[0] = OPCODE_COUNT as u8;
		assert!(ScrambleMap::from_table(table).is_none());

		assert!(ScrambleMap::from_table(identity_table()).is_some());
	}

	#[test]
	fn pseudo_ops_fill_out_the_table() {
		assert_eq!(Opcode::VarArg as usize, 37);
		assert_eq!(Opcode::Nop as usize, 38);
		assert_eq!(Opcode::ExtraArg as usize, 39);
	}
}
