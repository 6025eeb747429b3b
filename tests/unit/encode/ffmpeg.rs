use super::*;
use crate::encode::encoder::{MP4_H264_AAC, WEBM_FALLBACK};
use crate::foundation::core::FrameSize;

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn timestamps_map_to_30fps_slots() {
    assert_eq!(frame_slot(0.0, 30), 0);
    assert_eq!(frame_slot(1000.0 / 30.0, 30), 1);
    assert_eq!(frame_slot(16.0, 30), 0);
    assert_eq!(frame_slot(17.0, 30), 1);
    assert_eq!(frame_slot(13_699.0, 30), 411);
    assert_eq!(frame_slot(-5.0, 30), 0);
}

#[test]
fn encoder_list_parsing() {
    let out = "Encoders:\n V..... = Video\n A..... = Audio\n ------\n V....D libx264              libx264 H.264 / AVC\n A....D aac                  AAC (Advanced Audio Coding)\n V....D libvpx               libvpx VP8\n";
    assert_eq!(parse_encoder_list(out), vec!["libx264", "aac", "libvpx"]);
    assert!(parse_encoder_list("garbage").is_empty());
}

#[test]
fn odd_sizes_are_rejected_before_spawning() {
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts::default());
    let err = enc
        .start(EncoderConfig {
            size: FrameSize::new(3, 2),
            fps: 30,
            video_bitrate: 1_000_000,
            profile: MP4_H264_AAC,
            audio: None,
        })
        .unwrap_err();
    assert!(matches!(err, CineforgeError::Validation(_)));
}

#[test]
fn missing_binary_supports_nothing() {
    let enc = FfmpegEncoder::new(
        FfmpegEncoderOpts::default().with_ffmpeg_bin("/nonexistent/cineforge-ffmpeg"),
    );
    assert!(!enc.is_available());
    assert!(!enc.is_supported(&MP4_H264_AAC));
    assert!(!enc.is_supported(&WEBM_FALLBACK));
}

#[test]
fn encodes_a_short_clip_when_ffmpeg_is_available() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts::default().with_ffmpeg_bin("ffmpeg"));
    let profile = crate::encode::encoder::select_encoding(&enc);
    if !enc.is_supported(&profile) {
        return;
    }
    let size = FrameSize::new(32, 16);
    enc.start(EncoderConfig {
        size,
        fps: 30,
        video_bitrate: 500_000,
        profile,
        audio: None,
    })
    .unwrap();
    let frame = FrameRGBA {
        width: 32,
        height: 16,
        data: vec![128; size.rgba8_len()],
        premultiplied: true,
    };
    for i in 0..10 {
        enc.push_frame(f64::from(i) * 1000.0 / 30.0, &frame).unwrap();
    }
    // Same slot as the previous frame: dropped.
    enc.push_frame(9.2 * 1000.0 / 30.0, &frame).unwrap();
    let artifact = enc.stop().unwrap();
    assert!(!artifact.is_empty());
    assert_eq!(artifact.mime_type, profile.mime_type);
}
