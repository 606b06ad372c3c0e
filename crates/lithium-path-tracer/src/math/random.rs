use glam::Vec2;

/// Random stream used by the spawn kernel.
pub const SPAWN_STREAM: u32 = 0;
/// Random stream used by the trace kernel.
pub const TRACE_STREAM: u32 = 1;

const GOLDEN_RATIO: u32 = 0x9E37_79B9;

pub fn pcg_hash(x: u32) -> u32 {
    let state = x.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
    (word >> 22) ^ word
}

/// Fast high quality random number generator
pub fn xor_shift_u32(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

/// Seed for one lane, identical on every backend so renders can be reproduced.
/// Never returns 0, which would lock `xor_shift_u32` at 0 forever.
pub fn lane_seed(pixel_index: u32, sample_index: u32, seed: u32, stream: u32) -> u32 {
    let mut hash = pcg_hash(seed.wrapping_add(stream.wrapping_mul(GOLDEN_RATIO)));
    hash = pcg_hash(hash ^ sample_index);
    hash = pcg_hash(hash ^ pixel_index);
    if hash == 0 {
        GOLDEN_RATIO
    } else {
        hash
    }
}

/// Per lane pseudo random generator, mirrored by `random.wgsl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneRng {
    state: u32,
}

impl LaneRng {
    pub fn new(pixel_index: u32, sample_index: u32, seed: u32, stream: u32) -> Self {
        Self {
            state: lane_seed(pixel_index, sample_index, seed, stream),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        xor_shift_u32(&mut self.state)
    }

    /// Uniform in [0, 1), built from the top 24 bits so 1.0 is never produced.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    pub fn next_2d(&mut self) -> Vec2 {
        let x = self.next_f32();
        let y = self.next_f32();
        Vec2::new(x, y)
    }
}
