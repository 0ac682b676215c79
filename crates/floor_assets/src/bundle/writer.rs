use std::{
    io::{self, Write},
    path::Path,
};

use flate2::{Compression, write::ZlibEncoder};
use floor_scene::PrefabData;

use super::format::{Codec, MAGIC, VERSION_MAJOR, VERSION_MINOR};

/// Packs entries into the `.plat` layout.
#[derive(Debug, Default)]
pub struct BundleWriter {
    entries: Vec<(String, Codec, Vec<u8>)>,
}

impl BundleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, name: &str, bytes: &[u8], codec: Codec) -> io::Result<&mut Self> {
        if name.len() > u16::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "entry name too long",
            ));
        }

        let packed = match codec {
            Codec::Stored => bytes.to_vec(),
            Codec::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()?
            }
        };

        if packed.len() > u32::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "entry too large",
            ));
        }

        self.entries.push((name.to_owned(), codec, packed));
        Ok(self)
    }

    pub fn add_object(
        &mut self,
        name: &str,
        prefab: &PrefabData,
        codec: Codec,
    ) -> io::Result<&mut Self> {
        let json = serde_json::to_vec(prefab)?;
        self.add_entry(name, &json, codec)
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&VERSION_MAJOR.to_be_bytes());
        out.extend_from_slice(&VERSION_MINOR.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for (name, codec, packed) in &self.entries {
            out.extend_from_slice(&(name.len() as u16).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            out.push(codec.tag());
            out.extend_from_slice(&(packed.len() as u32).to_be_bytes());
        }

        for (_, _, packed) in &self.entries {
            out.extend_from_slice(packed);
        }

        out
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.finish())
    }
}
