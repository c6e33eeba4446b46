use crate::backend::{UNIFORM_FLOATS, UNIFORM_HEADER_FLOATS};

/// Floats of the shared effect-parameter buffer.
pub const SHARED_UNIFORM_FLOATS: usize = UNIFORM_FLOATS - UNIFORM_HEADER_FLOATS;

/// An effect's declared region of the shared uniform buffer, in floats.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub offset: usize,
    pub size: usize,
}

impl UniformSlot {
    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// Checks the slot against the shared buffer bounds.
    pub fn validate(&self, effect: &str) -> Result<(), UniformMappingError> {
        if self.size == 0 {
            return Err(UniformMappingError::Empty {
                effect: effect.to_string(),
            });
        }
        match self.offset.checked_add(self.size) {
            Some(end) if end <= SHARED_UNIFORM_FLOATS => Ok(()),
            _ => Err(UniformMappingError::OutOfBounds {
                effect: effect.to_string(),
                offset: self.offset,
                size: self.size,
                capacity: SHARED_UNIFORM_FLOATS,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniformMappingError {
    #[error("effect `{effect}` declares an empty uniform slot")]
    Empty { effect: String },

    #[error("effect `{effect}` uniform slot {offset}+{size} exceeds the {capacity}-float shared buffer")]
    OutOfBounds {
        effect: String,
        offset: usize,
        size: usize,
        capacity: usize,
    },

    #[error("shared uniform write {offset}+{len} exceeds the {capacity}-float buffer")]
    WriteOutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("effect `{0}` is not registered or declares no uniform slot")]
    NoSlot(String),

    #[error("effect `{effect}` expects {expected} uniform floats, got {actual}")]
    LengthMismatch {
        effect: String,
        expected: usize,
        actual: usize,
    },
}

/// CPU copy of the shared effect-parameter buffer. Every effect program
/// receives the whole buffer after the per-draw header.
#[derive(Debug, Clone)]
pub struct SharedUniforms {
    values: [f32; SHARED_UNIFORM_FLOATS],
}

impl Default for SharedUniforms {
    fn default() -> Self {
        Self {
            values: [0.0; SHARED_UNIFORM_FLOATS],
        }
    }
}

impl SharedUniforms {
    pub fn write(&mut self, offset: usize, values: &[f32]) -> Result<(), UniformMappingError> {
        let end = offset
            .checked_add(values.len())
            .filter(|end| *end <= SHARED_UNIFORM_FLOATS)
            .ok_or(UniformMappingError::WriteOutOfBounds {
                offset,
                len: values.len(),
                capacity: SHARED_UNIFORM_FLOATS,
            })?;
        self.values[offset..end].copy_from_slice(values);
        Ok(())
    }

    pub fn values(&self) -> &[f32; SHARED_UNIFORM_FLOATS] {
        &self.values
    }

    /// Full uniform block: `header` followed by the shared values.
    pub fn block(&self, header: [f32; UNIFORM_HEADER_FLOATS]) -> [f32; UNIFORM_FLOATS] {
        let mut block = [0.0; UNIFORM_FLOATS];
        block[..UNIFORM_HEADER_FLOATS].copy_from_slice(&header);
        block[UNIFORM_HEADER_FLOATS..].copy_from_slice(&self.values);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_bounds_are_validated() {
        assert!(UniformSlot::new(0, SHARED_UNIFORM_FLOATS).validate("fx").is_ok());
        assert!(matches!(
            UniformSlot::new(58, 4).validate("fx"),
            Err(UniformMappingError::OutOfBounds { offset: 58, size: 4, .. })
        ));
        assert!(matches!(
            UniformSlot::new(3, 0).validate("fx"),
            Err(UniformMappingError::Empty { .. })
        ));
        assert!(UniformSlot::new(usize::MAX, 2).validate("fx").is_err());
    }

    #[test]
    fn block_places_values_after_header() {
        let mut shared = SharedUniforms::default();
        shared.write(2, &[7.0, 8.0]).unwrap();
        let block = shared.block([640.0, 480.0, 0.0, 3.0]);
        assert_eq!(&block[..4], &[640.0, 480.0, 0.0, 3.0]);
        assert_eq!(&block[6..8], &[7.0, 8.0]);
    }

    #[test]
    fn out_of_bounds_write_is_rejected() {
        let mut shared = SharedUniforms::default();
        assert!(shared.write(SHARED_UNIFORM_FLOATS - 1, &[1.0, 2.0]).is_err());
        assert!(shared.values().iter().all(|v| *v == 0.0));
    }
}
