//! 4-bit IMA-style ADPCM as used by KVAG audio.

/// Step index adjustment per nibble. The upper half mirrors the lower half
/// since the sign bit does not affect the index.
pub const INDEX_TABLE: [i32; 16] = [-1, -1, -1, -1, 2, 4, 6, 8, -1, -1, -1, -1, 2, 4, 6, 8];

/// Standard IMA ADPCM quantiser step sizes.
pub const STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408, 449,
    494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066, 2272,
    2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630, 9493,
    10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794, 32767,
];

const MAX_INDEX: i32 = STEP_TABLE.len() as i32 - 1;

/// Decoder state for a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdpcmChannel {
    index: i32,
    predictor: i32,
    step: i32,
}

impl Default for AdpcmChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl AdpcmChannel {
    pub const fn new() -> Self {
        AdpcmChannel {
            index: 0,
            predictor: 0,
            step: STEP_TABLE[0],
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn predictor(&self) -> i32 {
        self.predictor
    }

    /// Feeds one nibble (only the low four bits are used) and returns the
    /// reconstructed sample.
    pub fn decode_nibble(&mut self, nibble: u8) -> i16 {
        let nibble = nibble & 0x0F;
        self.index = (self.index + INDEX_TABLE[nibble as usize]).clamp(0, MAX_INDEX);

        let negative = nibble & 0x08 != 0;
        let magnitude = nibble & 0x07;

        let mut diff = self.step >> 3;
        if magnitude & 0x04 != 0 {
            diff += self.step;
        }
        if magnitude & 0x02 != 0 {
            diff += self.step >> 1;
        }
        if magnitude & 0x01 != 0 {
            diff += self.step >> 2;
        }

        self.predictor += if negative { -diff } else { diff };
        self.predictor = self
            .predictor
            .clamp(i32::from(i16::MIN), i32::from(i16::MAX));

        // The step update lags the index update by one nibble.
        self.step = STEP_TABLE[self.index as usize];
        self.predictor as i16
    }
}

/// Mono stream: high nibble first, then low nibble. Produces two samples per
/// input byte.
pub fn decode_mono(data: &[u8]) -> Vec<i16> {
    let mut channel = AdpcmChannel::new();
    let mut samples = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        samples.push(channel.decode_nibble(byte >> 4));
        samples.push(channel.decode_nibble(byte));
    }
    samples
}

/// Stereo stream: low nibble drives the left channel, high nibble the right.
/// Output is interleaved left/right, one pair per input byte.
pub fn decode_stereo(data: &[u8]) -> Vec<i16> {
    let mut left = AdpcmChannel::new();
    let mut right = AdpcmChannel::new();
    let mut samples = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        samples.push(left.decode_nibble(byte));
        samples.push(right.decode_nibble(byte >> 4));
    }
    samples
}
