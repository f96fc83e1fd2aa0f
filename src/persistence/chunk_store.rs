use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use super::{atomic_write, PersistenceError, PersistenceResult};
use crate::world::chunk::{BlockId, Chunk, ChunkPos};

/// Magic bytes identifying chunk files.
const CHUNK_MAGIC: [u8; 4] = *b"MWCK";

/// Version of the chunk file format.
const CHUNK_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ChunkHeader {
    magic: [u8; 4],
    version: u32,
    pos: ChunkPos,
    checksum: u32,
}

/// Stores one file per chunk under `<world dir>/chunks/`: a bincode header
/// followed by the gzip-compressed block payload, written atomically.
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    /// Open (creating if needed) the chunk store for a world directory.
    pub fn open(world_dir: &Path) -> PersistenceResult<Self> {
        let dir = world_dir.join("chunks");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn chunk_path(&self, pos: ChunkPos) -> PathBuf {
        self.dir.join(format!("c.{}.{}.{}.ck", pos.x, pos.y, pos.z))
    }

    /// Whether a chunk has been persisted.
    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunk_path(pos).is_file()
    }

    /// Serialize, compress and persist one chunk.
    pub fn save(&self, chunk: &Chunk) -> PersistenceResult<()> {
        let raw = bincode::serialize(chunk.blocks())?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        let payload = encoder.finish()?;

        let header = ChunkHeader {
            magic: CHUNK_MAGIC,
            version: CHUNK_FORMAT_VERSION,
            pos: chunk.pos(),
            checksum: crc32fast::hash(&payload),
        };

        let mut bytes = bincode::serialize(&header)?;
        bytes.extend_from_slice(&payload);
        atomic_write(&self.chunk_path(chunk.pos()), &bytes)
    }

    /// Read back the chunk persisted at `pos`.
    pub fn load(&self, pos: ChunkPos) -> PersistenceResult<Chunk> {
        let bytes = fs::read(self.chunk_path(pos))?;
        let header: ChunkHeader = bincode::deserialize(&bytes)?;

        if header.magic != CHUNK_MAGIC {
            return Err(PersistenceError::CorruptedChunk(format!(
                "bad magic in chunk {}",
                pos
            )));
        }
        if header.version != CHUNK_FORMAT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: CHUNK_FORMAT_VERSION,
                found: header.version,
            });
        }
        if header.pos != pos {
            return Err(PersistenceError::CorruptedChunk(format!(
                "chunk file for {} claims position {}",
                pos, header.pos
            )));
        }

        let payload = &bytes[bincode::serialized_size(&header)? as usize..];
        if crc32fast::hash(payload) != header.checksum {
            return Err(PersistenceError::CorruptedChunk(format!(
                "checksum mismatch in chunk {}",
                pos
            )));
        }

        let mut raw = Vec::new();
        GzDecoder::new(payload).read_to_end(&mut raw)?;
        let blocks: Vec<BlockId> = bincode::deserialize(&raw)?;

        Chunk::from_blocks(pos, blocks).ok_or_else(|| {
            PersistenceError::CorruptedChunk(format!("unexpected block count in chunk {}", pos))
        })
    }
}
