pub type Bytecode = [u8];

pub mod encoding;
pub mod lua51;

pub trait Hex: std::fmt::Debug {
	fn hex(&self) -> String;
}

impl Hex for [u8] {
	fn hex(&self) -> String {
		self.chunks(16)
			.map(|row| {
				row.iter()
					.map(|b| format!("{:02X}", b))
					.collect::<Vec<String>>()
					.join(" ")
			})
			.collect::<Vec<String>>()
			.join("\n")
	}
}
