use thiserror::Error;
use tracing::warn;

use crate::encoding;
use crate::Bytecode;

use super::instruction::{ASBX_BIAS, WHITEN_MUL};
use super::opcode::{Opmode, ScrambleMap};
use super::serialize::{
	ENDIAN_MARK, FORMAT, MAGIC, NUMBER_FORMAT, SIZE_INSTRUCTION, SIZE_INT, SIZE_NUMBER, SIZE_T,
	TAG_BOOLEAN, TAG_NIL, TAG_NUMBER, TAG_STRING, TAG_UNKNOWN, VERSION,
};
use super::{Chunk, Constant, Instruction, Reader};

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
	#[error("bad magic {0:02x?}")]
	BadMagic([u8; 4]),

	#[error("unexpected {field} byte {value:#04x}")]
	BadHeader { field: &'static str, value: u8 },

	#[error("instruction {ip}: no operand A consistent with word {word:#010x}")]
	Whitening { ip: usize, word: u32 },

	#[error("unknown constant tag {0:#04x}")]
	UnknownTag(u8),
}

fn check(field: &'static str, value: u8, expected: u8) -> Result<(), DecodeError> {
	if value == expected {
		Ok(())
	} else {
		Err(DecodeError::BadHeader { field, value })
	}
}

fn load_header(reader: &mut Reader) -> Result<(), DecodeError> {
	let magic: [u8; 4] = reader.bytes(4).try_into().unwrap();
	if magic != MAGIC {
		return Err(DecodeError::BadMagic(magic));
	}
	check("version", reader.byte(), VERSION)?;
	check("format", reader.byte(), FORMAT)?;
	check("endianness", reader.byte(), ENDIAN_MARK)?;
	check("int size", reader.byte(), SIZE_INT)?;
	check("size_t size", reader.byte(), SIZE_T)?;
	check("instruction size", reader.byte(), SIZE_INSTRUCTION)?;
	check("number size", reader.byte(), SIZE_NUMBER)?;
	check("number format", reader.byte(), NUMBER_FORMAT)?;
	Ok(())
}

// A whitens the word it lives in, so recover it by scanning the 8-bit space
// for a value consistent with both its own field and a mapped opcode; the
// lowest such candidate wins
fn decode_word(word: u32, scramble: &ScrambleMap) -> Option<Instruction> {
	for a in 0u32..=0xff {
		let clear = word ^ a.wrapping_mul(WHITEN_MUL);
		if (clear >> 6) & 0xff != a {
			continue;
		}
		let Some(op) = scramble.unscramble((clear & 0x3f) as u8) else {
			continue;
		};
		let mut instr = Instruction::new(op, a as u8, 0, 0);
		match instr.mode {
			Opmode::Abc => {
				instr.c = ((clear >> 14) & 0x1ff) as u16;
				instr.b = ((clear >> 23) & 0x1ff) as i32;
			}
			Opmode::Abx => instr.b = ((clear >> 14) & 0x3ffff) as i32,
			Opmode::AsBx => instr.b = ((clear >> 14) & 0x3ffff) as i32 - ASBX_BIAS,
		}
		return Some(instr);
	}
	None
}

fn load_chunk(reader: &mut Reader, scramble: &ScrambleMap) -> Result<Chunk, DecodeError> {
	let source = reader.crypt_string().map(|b| encoding::latin1_string(&b));
	let line_defined = reader.int();
	let last_line_defined = reader.int();
	let nupvals = reader.byte();
	let nparams = reader.byte();
	let is_vararg_flag = reader.byte();
	let max_stack_size = reader.byte();

	let n = reader.int() as usize;
	let mut instructions = Vec::with_capacity(n);
	for ip in 0..n {
		let word = reader.int();
		let instr =
			decode_word(word, scramble).ok_or(DecodeError::Whitening { ip, word })?;
		instructions.push(instr);
	}

	let n = reader.int() as usize;
	let mut constants = Vec::with_capacity(n);
	for _ in 0..n {
		let tag = reader.byte();
		constants.push(match tag {
			TAG_NIL => Constant::Nil,
			TAG_BOOLEAN => Constant::Boolean(reader.byte() != 0),
			TAG_NUMBER => Constant::Number(reader.number()),
			TAG_STRING => Constant::String(reader.crypt_string().unwrap_or_default()),
			TAG_UNKNOWN => {
				warn!("fallback constant tag in stream");
				return Err(DecodeError::UnknownTag(TAG_UNKNOWN));
			}
			other => return Err(DecodeError::UnknownTag(other)),
		});
	}

	let n = reader.int() as usize;
	let mut prototypes = Vec::with_capacity(n);
	for _ in 0..n {
		prototypes.push(load_chunk(reader, scramble)?);
	}

	// skip the junk debug trailer
	for _ in 0..3 {
		reader.int();
	}

	Ok(Chunk {
		source,
		line_defined,
		last_line_defined,
		nupvals,
		nparams,
		is_vararg_flag,
		max_stack_size,
		instructions,
		constants,
		prototypes,
	})
}

// paired consumer: needs the serializer's scramble map out-of-band
pub fn deserialize_bytecode(bytecode: &Bytecode, scramble: &ScrambleMap) -> Result<Chunk, DecodeError> {
	let mut reader = Reader::new(bytecode);
	load_header(&mut reader)?;
	load_chunk(&mut reader, scramble)
}
