use rand::Rng;

#[derive(Debug, Clone)]
pub struct KeyTable(Vec<u8>);

impl KeyTable {
	// requested size capped by the configured ceiling, never zero
	pub fn generate<R: Rng>(rng: &mut R, want: usize, ceiling: usize) -> Self {
		let len = want.min(ceiling).max(1);
		let mut key = vec![0u8; len];
		rng.fill(key.as_mut_slice());
		Self(key)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn xor(&self, payload: &[u8]) -> Vec<u8> {
		payload
			.iter()
			.enumerate()
			.map(|(i, b)| b ^ self.0[i % self.0.len()])
			.collect()
	}
}
