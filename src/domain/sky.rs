use crate::Error;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Per-face sky visibility masks for the six-face projection.
///
/// One byte per texel, 255 where only sky is visible from the viewpoint and
/// 0 where scene geometry covers it; intermediate values feather the
/// transition. Generated offline and only loaded at runtime.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SkyVisibilityMasks {
    pub resolution: u32,
    pub faces: Vec<Vec<u8>>,
}

impl SkyVisibilityMasks {
    pub fn validate(&self) -> Result<(), Error> {
        if self.faces.len() != 6 {
            return Err(Error::artifact(format!(
                "sky visibility masks have {} faces, expected 6",
                self.faces.len()
            )));
        }

        let texels = self.resolution as usize * self.resolution as usize;

        if self.faces.iter().any(|face| face.len() != texels) {
            return Err(Error::artifact("sky visibility mask size mismatch"));
        }

        Ok(())
    }

    pub fn save(&self, writer: impl Write) -> Result<(), Error> {
        bincode::serialize_into(writer, self)
            .map_err(|err| Error::artifact(format!("failed to save sky visibility masks: {}", err)))
    }

    pub fn load(reader: impl Read) -> Result<Self, Error> {
        let masks: Self = bincode::deserialize_from(reader)
            .map_err(|err| Error::artifact(format!("failed to load sky visibility masks: {}", err)))?;

        masks.validate()?;

        Ok(masks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_round_trips() {
        let masks = SkyVisibilityMasks {
            resolution: 4,
            faces: vec![vec![255; 16]; 6],
        };

        let mut bytes = vec![];
        masks.save(&mut bytes).unwrap();

        assert_eq!(SkyVisibilityMasks::load(bytes.as_slice()).unwrap(), masks);
    }

    #[test]
    fn wrong_face_count_is_rejected() {
        let masks = SkyVisibilityMasks {
            resolution: 4,
            faces: vec![vec![0; 16]; 5],
        };

        assert!(masks.validate().is_err());
    }
}
