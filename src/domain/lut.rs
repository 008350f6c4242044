use crate::Error;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Parameters a direction LUT was generated under. A pipeline refuses to
/// consume a LUT whose key does not exactly match its configuration.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct LutKey {
    pub resolution: u32,
    pub supersampling: u32,
    pub fov_x: f32,
    pub fov_y: f32,
}

/// Precomputed cube-texel → atlas-UV table for the tetrahedral projection.
///
/// Entries are face-major, row-major within each face, one normalized atlas
/// coordinate per cube texel. The table is immutable once built.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DirectionLut {
    pub key: LutKey,
    pub entries: Vec<[f32; 2]>,
}

impl DirectionLut {
    pub fn expected_len(resolution: u32) -> usize {
        6 * resolution as usize * resolution as usize
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.entries.len() != Self::expected_len(self.key.resolution) {
            return Err(Error::artifact(format!(
                "direction LUT has {} entries, expected {}",
                self.entries.len(),
                Self::expected_len(self.key.resolution)
            )));
        }

        let in_bounds = |coord: f32| coord.is_finite() && (0.0..=1.0).contains(&coord);

        if !self.entries.iter().all(|&[u, v]| in_bounds(u) && in_bounds(v)) {
            return Err(Error::artifact("direction LUT entry out of bounds"));
        }

        Ok(())
    }

    pub fn save(&self, writer: impl Write) -> Result<(), Error> {
        bincode::serialize_into(writer, self)
            .map_err(|err| Error::artifact(format!("failed to save direction LUT: {}", err)))
    }

    pub fn load(reader: impl Read) -> Result<Self, Error> {
        let lut: Self = bincode::deserialize_from(reader)
            .map_err(|err| Error::artifact(format!("failed to load direction LUT: {}", err)))?;

        lut.validate()?;

        Ok(lut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_lut() -> DirectionLut {
        DirectionLut {
            key: LutKey {
                resolution: 2,
                supersampling: 2,
                fov_x: 131.55,
                fov_y: 125.27438968,
            },
            entries: vec![[0.5, 0.5]; DirectionLut::expected_len(2)],
        }
    }

    #[test]
    fn save_load_round_trips() {
        let lut = small_lut();

        let mut bytes = vec![];
        lut.save(&mut bytes).unwrap();

        assert_eq!(DirectionLut::load(bytes.as_slice()).unwrap(), lut);
    }

    #[test]
    fn truncated_artifact_is_rejected() {
        let lut = small_lut();

        let mut bytes = vec![];
        lut.save(&mut bytes).unwrap();
        bytes.truncate(bytes.len() / 2);

        assert!(DirectionLut::load(bytes.as_slice()).is_err());
    }

    #[test]
    fn out_of_bounds_entries_are_rejected() {
        let mut lut = small_lut();
        lut.entries[3] = [1.5, 0.5];

        assert!(lut.validate().is_err());
    }
}
