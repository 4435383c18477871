//! Colormap lookup table and the overlay that darkens the spectrogram
//! during the lower half of the blend range.

/// Entries in the lookup table uploaded to the GPU.
pub const LUT_SIZE: usize = 256;

/// Built-in ramp: 256 dark-to-bright RGB triples followed by white.
const DEFAULT_RAMP: [[u8; 3]; 257] = [
    [0, 0, 4], [1, 0, 5], [1, 1, 6], [1, 1, 8], [2, 1, 10], [2, 2, 12],
    [2, 2, 14], [3, 2, 16], [4, 3, 18], [4, 3, 21], [5, 4, 23], [6, 4, 25],
    [7, 5, 27], [8, 6, 29], [9, 6, 32], [10, 7, 34], [11, 7, 36], [12, 8, 38],
    [13, 8, 41], [14, 9, 43], [16, 9, 45], [17, 10, 48], [18, 10, 50], [20, 11, 53],
    [21, 11, 55], [22, 11, 58], [24, 12, 60], [25, 12, 62], [27, 12, 65], [28, 12, 67],
    [30, 12, 70], [31, 12, 72], [33, 12, 74], [35, 12, 77], [36, 12, 79], [38, 12, 81],
    [40, 11, 83], [42, 11, 85], [43, 11, 87], [45, 11, 89], [47, 10, 91], [49, 10, 93],
    [51, 10, 94], [52, 10, 96], [54, 9, 97], [56, 9, 98], [58, 9, 99], [59, 9, 100],
    [61, 9, 101], [63, 9, 102], [64, 10, 103], [66, 10, 104], [68, 10, 105], [69, 10, 105],
    [71, 11, 106], [73, 11, 107], [74, 12, 107], [76, 12, 108], [78, 13, 108], [79, 13, 108],
    [81, 14, 109], [83, 14, 109], [84, 15, 109], [86, 15, 110], [87, 16, 110], [89, 17, 110],
    [91, 17, 110], [92, 18, 110], [94, 18, 111], [95, 19, 111], [97, 20, 111], [99, 20, 111],
    [100, 21, 111], [102, 21, 111], [103, 22, 111], [105, 23, 111], [107, 23, 111], [108, 24, 111],
    [110, 24, 111], [111, 25, 111], [113, 25, 110], [115, 26, 110], [116, 27, 110], [118, 27, 110],
    [119, 28, 110], [121, 28, 110], [123, 29, 109], [124, 29, 109], [126, 30, 109], [127, 31, 109],
    [129, 31, 108], [130, 32, 108], [132, 32, 108], [134, 33, 107], [135, 33, 107], [137, 34, 107],
    [138, 34, 106], [140, 35, 106], [142, 36, 105], [143, 36, 105], [145, 37, 105], [146, 37, 104],
    [148, 38, 104], [150, 38, 103], [151, 39, 102], [153, 40, 102], [154, 40, 101], [156, 41, 101],
    [158, 41, 100], [159, 42, 100], [161, 43, 99], [162, 43, 98], [164, 44, 98], [165, 45, 97],
    [167, 45, 96], [169, 46, 95], [170, 46, 95], [172, 47, 94], [173, 48, 93], [175, 49, 92],
    [176, 49, 92], [178, 50, 91], [179, 51, 90], [181, 51, 89], [182, 52, 88], [184, 53, 87],
    [185, 54, 86], [187, 54, 85], [188, 55, 85], [190, 56, 84], [191, 57, 83], [193, 58, 82],
    [194, 59, 81], [196, 60, 80], [197, 60, 79], [198, 61, 78], [200, 62, 77], [201, 63, 76],
    [203, 64, 75], [204, 65, 74], [205, 66, 72], [207, 67, 71], [208, 68, 70], [209, 69, 69],
    [211, 70, 68], [212, 72, 67], [213, 73, 66], [214, 74, 65], [216, 75, 64], [217, 76, 62],
    [218, 77, 61], [219, 79, 60], [220, 80, 59], [221, 81, 58], [223, 82, 57], [224, 84, 56],
    [225, 85, 54], [226, 86, 53], [227, 88, 52], [228, 89, 51], [229, 90, 50], [230, 92, 48],
    [231, 93, 47], [232, 95, 46], [233, 96, 45], [234, 98, 43], [235, 99, 42], [235, 101, 41],
    [236, 102, 40], [237, 104, 38], [238, 105, 37], [239, 107, 36], [240, 109, 35], [240, 110, 33],
    [241, 112, 32], [242, 113, 31], [242, 115, 30], [243, 117, 28], [244, 118, 27], [244, 120, 26],
    [245, 122, 24], [246, 123, 23], [246, 125, 22], [247, 127, 20], [247, 129, 19], [248, 130, 18],
    [248, 132, 16], [249, 134, 15], [249, 136, 14], [249, 137, 12], [250, 139, 11], [250, 141, 10],
    [250, 143, 9], [251, 145, 8], [251, 146, 7], [251, 148, 7], [252, 150, 6], [252, 152, 6],
    [252, 154, 6], [252, 156, 6], [252, 158, 7], [253, 160, 7], [253, 161, 8], [253, 163, 9],
    [253, 165, 10], [253, 167, 12], [253, 169, 13], [253, 171, 15], [253, 173, 17], [253, 175, 19],
    [253, 177, 20], [253, 179, 22], [253, 181, 24], [252, 183, 27], [252, 185, 29], [252, 186, 31],
    [252, 188, 33], [252, 190, 35], [251, 192, 38], [251, 194, 40], [251, 196, 43], [251, 198, 45],
    [250, 200, 48], [250, 202, 50], [250, 204, 53], [249, 206, 56], [249, 208, 58], [248, 210, 61],
    [248, 212, 64], [247, 214, 67], [247, 216, 70], [246, 218, 73], [246, 220, 76], [245, 222, 80],
    [245, 224, 83], [244, 226, 86], [244, 228, 90], [244, 229, 94], [243, 231, 97], [243, 233, 101],
    [243, 235, 105], [242, 237, 109], [242, 238, 113], [242, 240, 117], [242, 241, 122], [243, 243, 126],
    [243, 244, 130], [244, 246, 134], [244, 247, 138], [245, 249, 142], [246, 250, 146], [247, 251, 150],
    [249, 252, 154], [250, 253, 158], [251, 254, 162], [253, 255, 165], [255, 255, 255],
];

/// Errors building a colormap from a ramp.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ColorMapError {
    #[error("ramp length {0} is not a multiple of 3 (RGB triples)")]
    NotRgb(usize),
    #[error("ramp needs at least 2 colors, got {0}")]
    TooShort(usize),
}

/// 256-entry RGBA lookup table built from a color ramp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMap {
    lut: [[u8; 4]; LUT_SIZE],
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::from_triples(&DEFAULT_RAMP)
    }
}

impl ColorMap {
    /// Build the table from a byte sequence of RGB triples, as returned by
    /// the backend's colormap call.
    pub fn from_ramp_bytes(bytes: &[u8]) -> Result<Self, ColorMapError> {
        if bytes.len() % 3 != 0 {
            return Err(ColorMapError::NotRgb(bytes.len()));
        }
        let triples: Vec<[u8; 3]> = bytes.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        if triples.len() < 2 {
            return Err(ColorMapError::TooShort(triples.len()));
        }
        Ok(Self::from_triples(&triples))
    }

    /// The built-in ramp as RGB bytes.
    pub fn default_ramp_bytes() -> Vec<u8> {
        DEFAULT_RAMP.iter().flatten().copied().collect()
    }

    fn from_triples(ramp: &[[u8; 3]]) -> Self {
        let last = (ramp.len() - 1) as f32;
        let mut lut = [[0u8, 0, 0, 255]; LUT_SIZE];
        for (i, entry) in lut.iter_mut().enumerate() {
            let pos = i as f32 / (LUT_SIZE - 1) as f32 * last;
            let lo = (pos.floor() as usize).min(ramp.len() - 1);
            let hi = (lo + 1).min(ramp.len() - 1);
            let t = pos - lo as f32;
            for c in 0..3 {
                let a = ramp[lo][c] as f32;
                let b = ramp[hi][c] as f32;
                entry[c] = (a + (b - a) * t).round() as u8;
            }
        }
        Self { lut }
    }

    pub fn lut(&self) -> &[[u8; 4]; LUT_SIZE] {
        &self.lut
    }

    /// Table as tightly packed RGBA bytes (texture upload layout).
    pub fn lut_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lut)
    }

    /// Color of a luminance value with the same linear filtering the GPU
    /// sampler applies between table entries.
    pub fn lookup(&self, value: f32) -> [f32; 3] {
        let pos = value.clamp(0.0, 1.0) * (LUT_SIZE - 1) as f32;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(LUT_SIZE - 1);
        let t = pos - lo as f32;
        let mut rgb = [0.0; 3];
        for (c, out) in rgb.iter_mut().enumerate() {
            let a = self.lut[lo][c] as f32;
            let b = self.lut[hi][c] as f32;
            *out = (a + (b - a) * t) / 255.0;
        }
        rgb
    }
}

/// Opacity of the black overlay for a blend factor.
///
/// `1 - 2*blend` over the lower half of the range, zero over the upper half.
#[inline]
pub fn overlay_alpha(blend: f32) -> f32 {
    if blend < 0.5 {
        (1.0 - 2.0 * blend).max(0.0)
    } else {
        0.0
    }
}

/// CPU colorization of a luminance image into opaque RGBA8, matching the
/// GPU compositor.
pub fn colorize(luminance: &[f32], colormap: &ColorMap, overlay_alpha: f32) -> Vec<u8> {
    let keep = 1.0 - overlay_alpha.clamp(0.0, 1.0);
    let mut out = Vec::with_capacity(luminance.len() * 4);
    for &v in luminance {
        let rgb = colormap.lookup(v);
        for c in rgb {
            out.push((c * keep * 255.0).round() as u8);
        }
        out.push(255);
    }
    out
}
