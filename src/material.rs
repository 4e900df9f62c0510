//! Terrain materials carried by map nodes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The material of a single node. Every node holds exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Material {
    Dirt,
    Grass,
    Water,
}

impl Material {
    pub const ALL: [Material; 3] = [Material::Dirt, Material::Grass, Material::Water];

    /// Stable code used when a node map is persisted.
    pub fn code(self) -> u8 {
        match self {
            Material::Dirt => 0,
            Material::Grass => 1,
            Material::Water => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Material::Dirt),
            1 => Ok(Material::Grass),
            2 => Ok(Material::Water),
            other => Err(Error::UnknownMaterial(other)),
        }
    }

    /// Glyph for ASCII dumps.
    pub fn glyph(self) -> char {
        match self {
            Material::Dirt => '.',
            Material::Grass => '"',
            Material::Water => '~',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for material in Material::ALL {
            assert_eq!(Material::from_code(material.code()).unwrap(), material);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!(matches!(Material::from_code(9), Err(Error::UnknownMaterial(9))));
    }
}
