use std::{collections::HashSet, io::Read};

use flate2::read::ZlibDecoder;
use floor_scene::PrefabData;
use nom::{
    IResult,
    bytes::complete::take,
    error::{VerboseError, context},
    multi::count,
    number::complete::{be_u16, be_u32, u8 as byte},
};

use crate::error::BundleError;

pub const MAGIC: u32 = 0x504C4154; // "PLAT"
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;

type ParseResult<'a, T> = IResult<&'a [u8], T, VerboseError<&'a [u8]>>;

/// How an entry's payload is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Stored,
    Zlib,
}

impl Codec {
    pub fn tag(self) -> u8 {
        match self {
            Codec::Stored => 0,
            Codec::Zlib => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Codec::Stored),
            1 => Some(Codec::Zlib),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    codec: Codec,
    offset: usize,
    size: usize,
}

/// Parsed `.plat` container. Holds the packed bytes until dropped.
#[derive(Debug)]
pub struct PlatArchive {
    version: (u16, u16),
    entries: Vec<Entry>,
    data: Vec<u8>,
}

impl PlatArchive {
    pub fn parse(data: Vec<u8>) -> Result<Self, BundleError> {
        let (i, magic) = parse_magic(&data)?;
        if !magic {
            return Err(BundleError::UnrecognizedFile);
        }

        let (i, (major, minor)) = parse_version(i)?;
        if major != VERSION_MAJOR {
            return Err(BundleError::UnsupportedVersion(major, minor));
        }

        let (i, raw_entries) = parse_table(i)?;

        let mut offset = data.len() - i.len();
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(raw_entries.len());
        for (name, codec, size) in raw_entries {
            let name = std::str::from_utf8(name)
                .map_err(|_| BundleError::Corrupt("entry name is not utf-8"))?
                .to_owned();
            let codec = Codec::from_tag(codec).ok_or(BundleError::Corrupt("unknown codec"))?;
            if !seen.insert(name.clone()) {
                return Err(BundleError::Corrupt("duplicate entry name"));
            }

            let size = size as usize;
            entries.push(Entry {
                name,
                codec,
                offset,
                size,
            });
            offset += size;
        }

        if offset > data.len() {
            return Err(BundleError::Corrupt("truncated payload"));
        }
        if offset < data.len() {
            return Err(BundleError::Corrupt("trailing bytes after last payload"));
        }

        Ok(Self {
            version: (major, minor),
            entries,
            data,
        })
    }

    pub fn version(&self) -> (u16, u16) {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Unpacked bytes of entry `name`, or `None` if there is no such entry.
    pub fn read_entry(&self, name: &str) -> Result<Option<Vec<u8>>, BundleError> {
        let Some(entry) = self.entries.iter().find(|e| e.name == name) else {
            return Ok(None);
        };

        let packed = &self.data[entry.offset..entry.offset + entry.size];
        let bytes = match entry.codec {
            Codec::Stored => packed.to_vec(),
            Codec::Zlib => {
                let mut out = Vec::new();
                ZlibDecoder::new(packed)
                    .read_to_end(&mut out)
                    .map_err(|source| BundleError::Decompress {
                        name: name.to_owned(),
                        source,
                    })?;
                out
            }
        };

        Ok(Some(bytes))
    }

    /// Decodes entry `name` as an object graph.
    pub fn read_object(&self, name: &str) -> Result<Option<PrefabData>, BundleError> {
        let Some(bytes) = self.read_entry(name)? else {
            return Ok(None);
        };

        let prefab: PrefabData =
            serde_json::from_slice(&bytes).map_err(|source| BundleError::Deserialize {
                name: name.to_owned(),
                source,
            })?;
        prefab.validate()?;

        Ok(Some(prefab))
    }
}

/// Parse the magic number at the beginning of the header.
fn parse_magic(i: &[u8]) -> ParseResult<'_, bool> {
    let (i, magic) = context("magic", be_u32)(i)?;

    Ok((i, magic == MAGIC))
}

/// Parse major and minor version numbers.
fn parse_version(i: &[u8]) -> ParseResult<'_, (u16, u16)> {
    let (i, major) = context("major version", be_u16)(i)?;
    let (i, minor) = context("minor version", be_u16)(i)?;

    Ok((i, (major, minor)))
}

/// Parse the entry table: name, codec tag and packed size per entry.
fn parse_table(i: &[u8]) -> ParseResult<'_, Vec<(&[u8], u8, u32)>> {
    let (i, entry_count) = context("entry count", be_u32)(i)?;

    context("entry table", count(parse_entry, entry_count as usize))(i)
}

fn parse_entry(i: &[u8]) -> ParseResult<'_, (&[u8], u8, u32)> {
    let (i, name_len) = context("name length", be_u16)(i)?;
    let (i, name) = context("name", take(name_len))(i)?;
    let (i, codec) = context("codec", byte)(i)?;
    let (i, size) = context("size", be_u32)(i)?;

    Ok((i, (name, codec, size)))
}
