use noise::{NoiseFn, Perlin};

use super::WorldGenerator;
use crate::world::chunk::{BlockId, Chunk, CHUNK_SIZE, WORLD_HEIGHT_CHUNKS};

/// Water fills columns up to this height where the terrain dips below it.
const SEA_LEVEL: i32 = 24;

const BASE_HEIGHT: f64 = 28.0;
const HEIGHT_AMPLITUDE: f64 = 20.0;
const HEIGHT_SCALE: f64 = 0.015;
const DETAIL_AMPLITUDE: f64 = 3.0;
const DETAIL_SCALE: f64 = 0.08;

/// Rolling hills from two octaves of Perlin noise, with beaches and water
/// below sea level. Deterministic for a given seed.
pub struct NoiseTerrainGenerator {
    height: Perlin,
    detail: Perlin,
}

impl NoiseTerrainGenerator {
    pub const TYPE_KEY: &'static str = "multiworld::generator::NoiseTerrainGenerator";

    pub fn new(seed: u32) -> Self {
        Self {
            height: Perlin::new(seed),
            detail: Perlin::new(seed.wrapping_add(1)),
        }
    }
}

impl Default for NoiseTerrainGenerator {
    fn default() -> Self {
        Self::new(12345)
    }
}

impl WorldGenerator for NoiseTerrainGenerator {
    fn type_key(&self) -> &'static str {
        Self::TYPE_KEY
    }

    fn generate_chunk(&self, chunk: &mut Chunk) {
        let pos = chunk.pos();
        for local_z in 0..CHUNK_SIZE {
            for local_x in 0..CHUNK_SIZE {
                let world_x = pos.x * CHUNK_SIZE + local_x;
                let world_z = pos.z * CHUNK_SIZE + local_z;
                let surface = self.surface_height(world_x, world_z);

                for local_y in 0..CHUNK_SIZE {
                    let world_y = pos.y * CHUNK_SIZE + local_y;
                    let block = if world_y == 0 {
                        BlockId::BEDROCK
                    } else if world_y < surface - 3 {
                        BlockId::STONE
                    } else if world_y < surface {
                        BlockId::DIRT
                    } else if world_y == surface {
                        if surface <= SEA_LEVEL {
                            BlockId::SAND
                        } else {
                            BlockId::GRASS
                        }
                    } else if world_y <= SEA_LEVEL {
                        BlockId::WATER
                    } else {
                        continue;
                    };
                    chunk.set(local_x, local_y, local_z, block);
                }
            }
        }
    }

    fn surface_height(&self, x: i32, z: i32) -> i32 {
        let fx = x as f64;
        let fz = z as f64;
        let rolling = self.height.get([fx * HEIGHT_SCALE, fz * HEIGHT_SCALE]);
        let detail = self.detail.get([fx * DETAIL_SCALE, fz * DETAIL_SCALE]);
        let height = BASE_HEIGHT + rolling * HEIGHT_AMPLITUDE + detail * DETAIL_AMPLITUDE;

        (height.round() as i32).clamp(1, WORLD_HEIGHT_CHUNKS * CHUNK_SIZE - 1)
    }
}
