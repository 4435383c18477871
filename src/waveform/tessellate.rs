//! Triangle meshes for a [`DecimatedPath`].

use super::path::{DecimatedPath, Envelope};
use crate::config::{ConfigError, RendererConfig};

/// Vertex of the waveform layer: NDC position plus straight RGBA color.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaveVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Stroke widths (device px) and colors for the waveform layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformStyle {
    pub stroke_width: f32,
    pub border_width: f32,
    pub line_color: [f32; 4],
    pub border_color: [f32; 4],
}

impl WaveformStyle {
    pub fn from_config(config: &RendererConfig, device_pixel_ratio: f32) -> Result<Self, ConfigError> {
        Ok(Self {
            stroke_width: config.line_width * device_pixel_ratio,
            border_width: config.border_width * device_pixel_ratio,
            line_color: config.line_rgba()?,
            border_color: config.border_rgba()?,
        })
    }
}

struct Mesh {
    width: f32,
    height: f32,
    vertices: Vec<WaveVertex>,
}

impl Mesh {
    #[inline]
    fn to_ndc(&self, x: f32, y: f32) -> [f32; 2] {
        [(x / self.width) * 2.0 - 1.0, 1.0 - (y / self.height) * 2.0]
    }

    fn push_quad(&mut self, corners: [[f32; 2]; 4], color: [f32; 4]) {
        // two triangles: 0-1-2, 2-1-3
        for idx in [0, 1, 2, 2, 1, 3] {
            let [x, y] = corners[idx];
            let position = self.to_ndc(x, y);
            self.vertices.push(WaveVertex { position, color });
        }
    }

    /// One segment as a quad of the given half width.
    fn push_segment(&mut self, a: [f32; 2], b: [f32; 2], half_width: f32, color: [f32; 4]) {
        let dx = b[0] - a[0];
        let dy = b[1] - a[1];
        let len = (dx * dx + dy * dy).sqrt().max(0.001);
        let nx = -dy / len * half_width;
        let ny = dx / len * half_width;
        self.push_quad(
            [
                [a[0] + nx, a[1] + ny],
                [a[0] - nx, a[1] - ny],
                [b[0] + nx, b[1] + ny],
                [b[0] - nx, b[1] - ny],
            ],
            color,
        );
    }

    /// Square patch covering the join between two segments.
    fn push_joint(&mut self, p: [f32; 2], half_width: f32, color: [f32; 4]) {
        let h = half_width;
        self.push_quad(
            [
                [p[0] - h, p[1] - h],
                [p[0] - h, p[1] + h],
                [p[0] + h, p[1] - h],
                [p[0] + h, p[1] + h],
            ],
            color,
        );
    }

    fn stroke(&mut self, points: &[[f32; 2]], closed: bool, width: f32, color: [f32; 4]) {
        let half = width / 2.0;
        match points {
            [] => {}
            [p] => self.push_joint(*p, half, color),
            _ => {
                for pair in points.windows(2) {
                    self.push_segment(pair[0], pair[1], half, color);
                }
                if closed {
                    self.push_segment(points[points.len() - 1], points[0], half, color);
                }
                for &p in points {
                    self.push_joint(p, half, color);
                }
            }
        }
    }

    fn fill(&mut self, env: &Envelope, stroke_width: f32, color: [f32; 4]) {
        let half = stroke_width / 2.0;
        for k in 1..env.len() {
            let (x0, x1) = (env.xs[k - 1], env.xs[k]);
            self.push_quad(
                [
                    [x0, env.tops[k - 1] - half],
                    [x0, env.bottoms[k - 1] + half],
                    [x1, env.tops[k] - half],
                    [x1, env.bottoms[k] + half],
                ],
                color,
            );
        }
    }
}

/// Tessellate `path` for a `width x height` device-pixel target.
///
/// Drawing order: line border, envelope borders, line stroke, envelope fills.
pub fn tessellate(path: &DecimatedPath, style: &WaveformStyle, width: u32, height: u32) -> Vec<WaveVertex> {
    if width == 0 || height == 0 || path.is_empty() {
        return Vec::new();
    }
    let mut mesh = Mesh {
        width: width as f32,
        height: height as f32,
        vertices: Vec::new(),
    };

    if path.line.border && style.border_width > 0.0 {
        mesh.stroke(
            &path.line.points,
            false,
            style.stroke_width + 2.0 * style.border_width,
            style.border_color,
        );
    }
    if style.border_width > 0.0 {
        for env in path.envelopes.iter().filter(|e| e.border) {
            let outline = env.to_polygon(style.stroke_width);
            mesh.stroke(&outline, true, 2.0 * style.border_width, style.border_color);
        }
    }
    mesh.stroke(&path.line.points, false, style.stroke_width, style.line_color);
    for env in &path.envelopes {
        mesh.fill(env, style.stroke_width, style.line_color);
    }
    mesh.vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::path::Polyline;

    fn style() -> WaveformStyle {
        WaveformStyle {
            stroke_width: 2.0,
            border_width: 1.0,
            line_color: [1.0, 0.5, 0.0, 1.0],
            border_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    fn line(points: Vec<[f32; 2]>, border: bool) -> DecimatedPath {
        DecimatedPath {
            line: Polyline { points, border },
            envelopes: Vec::new(),
        }
    }

    #[test]
    fn test_line_without_border() {
        let path = line(vec![[0.0, 50.0], [100.0, 50.0]], false);
        let verts = tessellate(&path, &style(), 100, 100);
        // one segment + two joints
        assert_eq!(verts.len(), 3 * 6);
        assert!(verts.iter().all(|v| v.color == style().line_color));
    }

    #[test]
    fn test_border_is_drawn_first() {
        let path = line(vec![[0.0, 50.0], [100.0, 50.0]], true);
        let verts = tessellate(&path, &style(), 100, 100);
        assert_eq!(verts.len(), 2 * 3 * 6);
        assert_eq!(verts[0].color, style().border_color);
        assert_eq!(verts.last().unwrap().color, style().line_color);
        // border quad is stroke + 2 * border = 4 px wide: y 48..52
        let ys: Vec<f32> = verts[..6].iter().map(|v| v.position[1]).collect();
        let max = ys.iter().cloned().fold(f32::MIN, f32::max);
        assert!((max - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_envelope_fill_spans_top_to_bottom() {
        let path = DecimatedPath {
            line: Polyline::default(),
            envelopes: vec![Envelope {
                xs: vec![0.0, 10.0],
                tops: vec![10.0, 10.0],
                bottoms: vec![90.0, 90.0],
                border: false,
            }],
        };
        let verts = tessellate(&path, &style(), 100, 100);
        assert_eq!(verts.len(), 6);
        let ys: Vec<f32> = verts.iter().map(|v| v.position[1]).collect();
        // 9 px and 91 px after the half-stroke offset
        assert!(ys.iter().any(|&y| (y - 0.82).abs() < 1e-6));
        assert!(ys.iter().any(|&y| (y + 0.82).abs() < 1e-6));
    }

    #[test]
    fn test_empty_target_or_path() {
        assert!(tessellate(&DecimatedPath::default(), &style(), 100, 100).is_empty());
        let path = line(vec![[0.0, 0.0], [1.0, 1.0]], true);
        assert!(tessellate(&path, &style(), 0, 100).is_empty());
    }
}
