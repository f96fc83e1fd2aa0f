use super::WorldGenerator;
use crate::world::chunk::{BlockId, Chunk, CHUNK_SIZE};

/// Classic flat world: bedrock floor, dirt body, grass surface.
pub struct SuperflatGenerator {
    surface_y: i32,
}

impl SuperflatGenerator {
    pub const TYPE_KEY: &'static str = "multiworld::generator::SuperflatGenerator";

    pub fn new(surface_y: i32) -> Self {
        Self { surface_y }
    }
}

impl Default for SuperflatGenerator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl WorldGenerator for SuperflatGenerator {
    fn type_key(&self) -> &'static str {
        Self::TYPE_KEY
    }

    fn generate_chunk(&self, chunk: &mut Chunk) {
        let base_y = chunk.pos().y * CHUNK_SIZE;
        for local_y in 0..CHUNK_SIZE {
            let world_y = base_y + local_y;
            let block = if world_y == 0 {
                BlockId::BEDROCK
            } else if world_y < self.surface_y {
                BlockId::DIRT
            } else if world_y == self.surface_y {
                BlockId::GRASS
            } else {
                continue;
            };
            chunk.fill_layer(local_y, block);
        }
    }

    fn surface_height(&self, _x: i32, _z: i32) -> i32 {
        self.surface_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::chunk::ChunkPos;

    #[test]
    fn test_flat_layers() {
        let generator = SuperflatGenerator::default();
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0));
        generator.generate_chunk(&mut chunk);

        assert_eq!(chunk.get(0, 0, 0), BlockId::BEDROCK);
        assert_eq!(chunk.get(5, 2, 5), BlockId::DIRT);
        assert_eq!(chunk.get(5, 4, 5), BlockId::GRASS);
        assert_eq!(chunk.get(5, 5, 5), BlockId::AIR);
    }

    #[test]
    fn test_chunks_above_surface_stay_empty() {
        let generator = SuperflatGenerator::default();
        let mut chunk = Chunk::new(ChunkPos::new(0, 1, 0));
        generator.generate_chunk(&mut chunk);
        assert!(chunk.is_empty());
    }
}
