//! Vector output of the decimator.

/// Open polyline stroked with the line width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<[f32; 2]>,
    /// Draw a wider border stroke beneath the line.
    pub border: bool,
}

/// Closed region between running column maxima (`tops`) and minima
/// (`bottoms`). `y` grows downwards, so `tops[i] <= bottoms[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub xs: Vec<f32>,
    pub tops: Vec<f32>,
    pub bottoms: Vec<f32>,
    /// Stroke the outline with the border color before filling.
    pub border: bool,
}

impl Envelope {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub(crate) fn push(&mut self, x: f32, top: f32, bottom: f32) {
        self.xs.push(x);
        self.tops.push(top);
        self.bottoms.push(bottom);
    }

    /// Outline of the filled region: the top edge forward, then the bottom
    /// edge backwards, each pushed outwards by half the stroke width so the
    /// fill meets the line stroke.
    pub fn to_polygon(&self, stroke_width: f32) -> Vec<[f32; 2]> {
        let half = stroke_width / 2.0;
        let top = self.xs.iter().zip(&self.tops).map(|(&x, &y)| [x, y - half]);
        let bottom = self
            .xs
            .iter()
            .zip(&self.bottoms)
            .rev()
            .map(|(&x, &y)| [x, y + half]);
        top.chain(bottom).collect()
    }

    /// Vertical range `(min top, max bottom)` before stroke offsetting.
    pub fn y_extent(&self) -> Option<(f32, f32)> {
        let top = self.tops.iter().copied().reduce(f32::min)?;
        let bottom = self.bottoms.iter().copied().reduce(f32::max)?;
        Some((top, bottom))
    }
}

/// A polyline plus the envelope polygons interleaved with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecimatedPath {
    pub line: Polyline,
    pub envelopes: Vec<Envelope>,
}

impl DecimatedPath {
    /// True when no column needed an envelope.
    pub fn is_polyline(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.line.points.is_empty() && self.envelopes.is_empty()
    }

    /// Little-endian serialization: point count and xy pairs of the line,
    /// then per envelope its length and the xs, tops and bottoms arrays.
    pub fn to_bytes(&self) -> Vec<u8> {
        let floats = self.line.points.len() * 2
            + self.envelopes.iter().map(|e| e.len() * 3).sum::<usize>();
        let mut out = Vec::with_capacity(8 + 4 * (floats + self.envelopes.len()));
        out.extend_from_slice(&(self.line.points.len() as u32).to_le_bytes());
        for p in &self.line.points {
            out.extend_from_slice(&p[0].to_le_bytes());
            out.extend_from_slice(&p[1].to_le_bytes());
        }
        out.extend_from_slice(&(self.envelopes.len() as u32).to_le_bytes());
        for env in &self.envelopes {
            out.extend_from_slice(&(env.len() as u32).to_le_bytes());
            for values in [&env.xs, &env.tops, &env.bottoms] {
                out.extend(values.iter().flat_map(|v| v.to_le_bytes()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Envelope {
        Envelope {
            xs: vec![0.0, 1.5, 2.0],
            tops: vec![5.0, 1.0, 5.0],
            bottoms: vec![5.0, 9.0, 5.0],
            border: true,
        }
    }

    #[test]
    fn test_polygon_goes_forward_then_back() {
        let poly = envelope().to_polygon(2.0);
        assert_eq!(
            poly,
            vec![
                [0.0, 4.0],
                [1.5, 0.0],
                [2.0, 4.0],
                [2.0, 6.0],
                [1.5, 10.0],
                [0.0, 6.0]
            ]
        );
    }

    #[test]
    fn test_y_extent() {
        assert_eq!(envelope().y_extent(), Some((1.0, 9.0)));
        assert_eq!(Envelope::default().y_extent(), None);
    }

    #[test]
    fn test_to_bytes_layout() {
        let path = DecimatedPath {
            line: Polyline {
                points: vec![[1.0, 2.0]],
                border: false,
            },
            envelopes: vec![envelope()],
        };
        let bytes = path.to_bytes();
        // 4 + 8 + 4 + 4 + 3 * 3 * 4
        assert_eq!(bytes.len(), 56);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &1u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &3u32.to_le_bytes());
    }
}
