use rand::thread_rng;
use tracing::debug;

use crate::encoding;

use super::opcode::ScrambleMap;
use super::{Chunk, Constant, Writer};

// deliberately bogus header; a stock loader rejects the stream at byte 0
pub const MAGIC: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];
pub const VERSION: u8 = 0x80;
pub const FORMAT: u8 = 0x00;
pub const ENDIAN_MARK: u8 = 0xaa;
pub const SIZE_INT: u8 = 4;
pub const SIZE_T: u8 = 4;
pub const SIZE_INSTRUCTION: u8 = 4;
pub const SIZE_NUMBER: u8 = 8;
pub const NUMBER_FORMAT: u8 = 0x00;

pub const TAG_NIL: u8 = 0x00;
pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_NUMBER: u8 = 0xca;
pub const TAG_STRING: u8 = 0xab;
// defensive fallback tag; the emit-side constant enum cannot produce it,
// the paired consumer reports it as an error
pub const TAG_UNKNOWN: u8 = 0xcc;

const JUNK_DEBUG: u32 = 0xdead_beef;

pub struct Serializer {
	scramble: ScrambleMap,
}

impl Serializer {
	pub fn new() -> Self {
		Self::with_scramble(ScrambleMap::random(&mut thread_rng()))
	}

	pub fn with_scramble(scramble: ScrambleMap) -> Self {
		Self { scramble }
	}

	pub fn scramble(&self) -> &ScrambleMap {
		&self.scramble
	}

	pub fn serialize(&self, chunk: &mut Chunk) -> Vec<u8> {
		let mut writer = Writer::new();
		self.dump_header(&mut writer);
		self.dump_chunk(&mut writer, chunk);
		writer.into_bytes()
	}

	fn dump_header(&self, writer: &mut Writer) {
		writer.bytes(&MAGIC);
		writer.byte(VERSION);
		writer.byte(FORMAT);
		writer.byte(ENDIAN_MARK);
		writer.byte(SIZE_INT);
		writer.byte(SIZE_T);
		writer.byte(SIZE_INSTRUCTION);
		writer.byte(SIZE_NUMBER);
		writer.byte(NUMBER_FORMAT);
	}

	fn dump_chunk(&self, writer: &mut Writer, chunk: &mut Chunk) {
		match &chunk.source {
			Some(name) if !name.is_empty() => writer.crypt_string(&encoding::latin1_bytes(name)),
			_ => writer.int(0),
		}
		writer.int(chunk.line_defined);
		writer.int(chunk.last_line_defined);
		writer.byte(chunk.nupvals);
		writer.byte(chunk.nparams);
		writer.byte(chunk.is_vararg_flag);
		writer.byte(chunk.max_stack_size);

		chunk.update_values();

		writer.int(chunk.instructions.len() as u32);
		for instr in &chunk.instructions {
			writer.int(instr.encode(&self.scramble));
		}

		writer.int(chunk.constants.len() as u32);
		for kst in &chunk.constants {
			match kst {
				Constant::Nil => writer.byte(TAG_NIL),
				Constant::Boolean(b) => {
					writer.byte(TAG_BOOLEAN);
					writer.byte(*b as u8);
				}
				Constant::Number(n) => {
					writer.byte(TAG_NUMBER);
					writer.number(*n);
				}
				Constant::String(s) => {
					writer.byte(TAG_STRING);
					writer.crypt_string(s);
				}
			}
		}

		writer.int(chunk.prototypes.len() as u32);
		for proto in &mut chunk.prototypes {
			self.dump_chunk(writer, proto);
		}

		// junk trailer standing in for the three debug sections
		writer.int(JUNK_DEBUG);
		writer.int(JUNK_DEBUG);
		writer.int(JUNK_DEBUG);

		debug!(
			instructions = chunk.instructions.len(),
			constants = chunk.constants.len(),
			prototypes = chunk.prototypes.len(),
			"chunk serialized"
		);
	}
}

impl Default for Serializer {
	fn default() -> Self {
		Self::new()
	}
}

// one-shot entry; every call gets a fresh scramble
pub fn serialize_bytecode(chunk: &mut Chunk) -> Vec<u8> {
	Serializer::new().serialize(chunk)
}
