//! Integration tests for waveform decimation driven by a viewport.

mod fixtures;

use fixtures::*;
use sigscope::signal::synth;
use sigscope::viewport::Viewport;
use sigscope::waveform::{decimate, tessellate, DecimateParams, WaveformStyle};
use sigscope::RendererConfig;

fn wav_viewport(px_per_sec: f64, width_px: u32, height_px: u32) -> Viewport {
    Viewport {
        start_sec: 0.0,
        px_per_sec,
        width_px,
        height_px,
        ..viewport()
    }
}

#[test]
fn test_native_density_emits_every_sample() {
    let config = RendererConfig::default();
    let samples = synth::generate_white_noise(4000, 0.9, 7);
    // 2 device px per sample
    let vp = Viewport {
        start_sec: 0.1,
        device_pixel_ratio: 2.0,
        ..wav_viewport(1000.0, 200, 100)
    };
    let params = DecimateParams::from_viewport(&vp, &config);
    assert_eq!(params.px_per_sec, 2000.0);

    let path = decimate(&samples, 1000, &params);
    let range = params.sample_range(1000, samples.len());
    assert!(path.envelopes.is_empty());
    assert_eq!(path.line.points.len(), range.len());
    // the margin reaches past both visible edges
    assert!(path.line.points.first().unwrap()[0] < 0.0);
    assert!(path.line.points.last().unwrap()[0] > params.width);
}

#[test]
fn test_flat_zero_buffer_is_a_single_line_at_any_zoom() {
    let config = RendererConfig::default();
    let samples = vec![0.0f32; 10];
    for pps in [0.5, 3.0, 10.0, 100.0, 1e4] {
        let params = DecimateParams::from_viewport(&wav_viewport(pps, 300, 80), &config);
        let path = decimate(&samples, 10, &params);
        assert!(path.is_polyline(), "pps {pps}");
        assert!(path.line.points.iter().all(|p| p[1] == 40.0), "pps {pps}");
    }
}

#[test]
fn test_dense_square_wave_is_one_full_scale_envelope() {
    let config = RendererConfig::default();
    // 10 samples per device pixel
    let samples = synth::generate_square(10_000, 1, 1.0);
    let params = DecimateParams {
        margin_px: 0.0,
        ..DecimateParams::from_viewport(&wav_viewport(100.0, 100, 120), &config)
    };
    let path = decimate(&samples, 1000, &params);
    assert_eq!(path.envelopes.len(), 1);
    let env = &path.envelopes[0];
    assert_eq!(env.y_extent(), Some((0.0, 120.0)));
    assert_eq!(env.xs.first(), Some(&0.0));
    assert_eq!(env.xs.last(), Some(&100.0));
}

#[test]
fn test_spread_exactly_half_stroke_is_not_an_envelope() {
    let config = RendererConfig {
        line_width: 1.0,
        ..Default::default()
    };
    // height 2 px over amplitude -1..1: one pixel per unit
    let vp = wav_viewport(10.0, 10, 2);
    let params = DecimateParams::from_viewport(&vp, &config);
    assert_eq!(params.stroke_width, 1.0);

    let tie: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.25 } else { -0.25 }).collect();
    assert!(decimate(&tie, 100, &params).is_polyline());

    let just_over: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.251 } else { -0.25 }).collect();
    assert_eq!(decimate(&just_over, 100, &params).envelopes.len(), 1);
}

#[test]
fn test_same_inputs_give_identical_bytes() {
    let config = RendererConfig::default();
    let samples = synth::generate_sine(220.0, 44_100, 1.0, 0.7);
    let mut vp = wav_viewport(300.0, 640, 120);
    vp.start_sec = 0.2;
    let params = DecimateParams::from_viewport(&vp, &config);
    let first = decimate(&samples, 44_100, &params).to_bytes();
    for _ in 0..3 {
        assert_eq!(decimate(&samples, 44_100, &params).to_bytes(), first);
    }
    vp.pan_px(1.0);
    let moved = DecimateParams::from_viewport(&vp, &config);
    assert_ne!(decimate(&samples, 44_100, &moved).to_bytes(), first);
}

#[test]
fn test_amplitude_zoom_clips_points() {
    let config = RendererConfig::default();
    let samples = synth::generate_sine(5.0, 1000, 1.0, 1.0);
    let vp = Viewport {
        amp_range: (-0.5, 0.5),
        ..wav_viewport(1000.0, 1000, 100)
    };
    let params = DecimateParams::from_viewport(&vp, &config);
    let path = decimate(&samples, 1000, &params);
    assert!(path.line.points.iter().all(|p| (0.0..=100.0).contains(&p[1])));
    assert!(path.line.points.iter().any(|p| p[1] == 0.0));

    let clipped = decimate(&samples, 1000, &params.with_clip_values(Some((-0.25, 0.25))));
    assert!(clipped.line.points.iter().all(|p| (25.0..=75.0).contains(&p[1])));
}

#[test]
fn test_decimated_path_tessellates_for_viewport() {
    let config = RendererConfig::default();
    let samples = synth::generate_square(20_000, 50, 0.8);
    let vp = wav_viewport(100.0, 400, 100);
    let params = DecimateParams::from_viewport(&vp, &config);
    let path = decimate(&samples, 8000, &params);
    assert!(!path.envelopes.is_empty());

    let style = WaveformStyle::from_config(&config, vp.device_pixel_ratio).unwrap();
    let (width, height) = vp.physical_size();
    let vertices = tessellate(&path, &style, width, height);
    assert_eq!(vertices.len() % 3, 0);
    assert_eq!(vertices[0].color, style.border_color);
    assert!(vertices
        .iter()
        .all(|v| v.position[1] >= -1.5 && v.position[1] <= 1.5));
}
