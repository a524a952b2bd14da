//! Cutting a time window out of a downloaded file.

use std::path::Path;
use tracing::info;

use ytclip_models::{ClipMode, EncodingConfig, TimeWindow};

use crate::command::{FfmpegCommand, ProgressPipe, ToolRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Build the FFmpeg command that writes `window` of `input` to `output`.
pub fn build_clip_command(
    input: &Path,
    output: &Path,
    window: &TimeWindow,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(input, output)
        .seek(window.start_secs())
        .duration(window.duration().as_secs_f64());

    match encoding.mode {
        ClipMode::Copy => cmd
            .stream_copy()
            .output_args(["-avoid_negative_ts", "make_zero"]),
        ClipMode::Reencode => cmd
            .video_codec(&encoding.codec)
            .preset(&encoding.preset)
            .crf(encoding.crf)
            .audio_codec(&encoding.audio_codec)
            .audio_bitrate(&encoding.audio_bitrate)
            .output_args(["-movflags", "+faststart"])
            .output_args(encoding.extra_args.iter().cloned()),
    }
}

/// Extension of the clip file for the given input and mode.
///
/// Re-encoded clips are always MP4; stream copies keep the input container.
pub fn clip_extension(input: &Path, encoding: &EncodingConfig) -> String {
    match encoding.mode {
        ClipMode::Reencode => "mp4".to_string(),
        ClipMode::Copy => input
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string()),
    }
}

/// Clip `window` out of `input` into `output`.
///
/// `on_progress` receives the percentage of the window written so far.
pub async fn clip_media<F>(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    window: &TimeWindow,
    encoding: &EncodingConfig,
    runner: &ToolRunner,
    on_progress: F,
) -> MediaResult<()>
where
    F: Fn(f64) + Send + 'static,
{
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = build_clip_command(input, output, window, encoding);
    let total_secs = window.duration().as_secs_f64();

    info!(
        input = %input.display(),
        output = %output.display(),
        window = %window,
        mode = ?encoding.mode,
        "Clipping media"
    );

    let mut state = FfmpegProgress::default();
    runner
        .run(ffmpeg, &cmd.build_args(), ProgressPipe::Stderr, move |line| {
            if let Some(snapshot) = state.apply_line(line) {
                on_progress(snapshot.percentage(total_secs));
            }
        })
        .await?;

    if !output.exists() {
        return Err(MediaError::tool_failed(
            "ffmpeg",
            "Output file not created",
            None,
            None,
        ));
    }
    Ok(())
}
