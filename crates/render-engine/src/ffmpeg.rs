//! FFmpeg backend: filter graph, argv, and progress parsing.

use std::path::{Path, PathBuf};

use cutline_common::{CutlineError, CutlineResult};
use cutline_project_model::{ExportFormat, ExportSettings};

use crate::blob::ResolvedInputs;
use crate::compiler::{RenderOp, RenderPlan, TimeWindow, TrimWindow};

/// Label of the mixed audio stream.
const AUDIO_OUT: &str = "outa";

/// A ready-to-spawn FFmpeg invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl FfmpegCommand {
    /// Build the full argv for rendering `plan` into `output`.
    pub fn build(
        plan: &RenderPlan,
        inputs: &ResolvedInputs,
        settings: &ExportSettings,
        fonts_dir: &Path,
        output: &Path,
    ) -> CutlineResult<Self> {
        if inputs.len() != plan.inputs.len() {
            return Err(CutlineError::validation(format!(
                "plan has {} inputs but {} were resolved",
                plan.inputs.len(),
                inputs.len()
            )));
        }

        let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into()];
        for (input, path) in plan.inputs.iter().zip(inputs.paths()) {
            if let Some(duration) = input.loop_duration {
                args.extend(["-loop".into(), "1".into(), "-t".into(), secs(duration)]);
            }
            args.push("-i".into());
            args.push(path.to_string_lossy().into_owned());
        }

        let (graph, video_out) = filter_graph(plan, settings, fonts_dir);
        let with_audio = plan.has_audio() && settings.format != ExportFormat::Gif;

        args.push("-filter_complex".into());
        args.push(graph);
        args.push("-map".into());
        args.push(format!("[{video_out}]"));
        if with_audio {
            args.push("-map".into());
            args.push(format!("[{AUDIO_OUT}]"));
        }

        args.extend(codec_args(settings, with_audio));
        args.extend([
            "-r".into(),
            settings.fps.max(1).to_string(),
            "-t".into(),
            secs(plan.duration),
            "-progress".into(),
            "pipe:1".into(),
        ]);
        args.push(output.to_string_lossy().into_owned());

        Ok(Self {
            program: "ffmpeg".into(),
            args,
        })
    }

    /// Use a specific ffmpeg binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

fn secs(value: f64) -> String {
    format!("{value:.3}")
}

fn enable_expr(window: &TimeWindow) -> String {
    format!(
        "enable='gte(t,{})*lt(t,{})'",
        secs(window.start),
        secs(window.end)
    )
}

fn trim_args(trim: &TrimWindow) -> String {
    format!("start={}:duration={}", secs(trim.start), secs(trim.duration))
}

/// Build the `-filter_complex` graph. Returns the graph and the final video label.
pub fn filter_graph(
    plan: &RenderPlan,
    settings: &ExportSettings,
    fonts_dir: &Path,
) -> (String, String) {
    let mut filters = Vec::new();
    let mut last = "base".to_string();
    let mut step = 0usize;
    let gif = settings.format == ExportFormat::Gif;

    for op in &plan.ops {
        match op {
            RenderOp::Canvas {
                width,
                height,
                duration,
                color,
            } => {
                filters.push(format!(
                    "color=c={color}:size={width}x{height}:d={}[base]",
                    secs(*duration)
                ));
            }
            RenderOp::PrepareVisual {
                input,
                trim,
                width,
                height,
                offset,
                speed,
                alpha,
                ..
            } => {
                let mut chain = format!("[{input}:v]");
                if let Some(trim) = trim {
                    chain.push_str(&format!("trim={},", trim_args(trim)));
                }
                chain.push_str(&format!("scale={width}:{height},"));
                if *speed == 1.0 {
                    chain.push_str(&format!("setpts=PTS-STARTPTS+{}/TB", secs(*offset)));
                } else {
                    chain.push_str(&format!(
                        "setpts=(PTS-STARTPTS)/{speed}+{}/TB",
                        secs(*offset)
                    ));
                }
                chain.push_str(&format!(
                    ",format=yuva420p,colorchannelmixer=aa={alpha:.3}[v{input}]"
                ));
                filters.push(chain);
            }
            RenderOp::Overlay {
                input, x, y, window, ..
            } => {
                let next = format!("c{step}");
                filters.push(format!(
                    "[{last}][v{input}]overlay={x}:{y}:{}[{next}]",
                    enable_expr(window)
                ));
                last = next;
                step += 1;
            }
            RenderOp::DrawText {
                content,
                font,
                font_size,
                color,
                x,
                y,
                window,
                ..
            } => {
                let next = format!("c{step}");
                filters.push(format!(
                    "[{last}]drawtext=fontfile={}:text='{}':x={x}:y={y}:fontsize={font_size}:fontcolor={color}:{}[{next}]",
                    font_path(fonts_dir, font),
                    escape_text(content),
                    enable_expr(window)
                ));
                last = next;
                step += 1;
            }
            RenderOp::PrepareAudio { .. } | RenderOp::AudioMix { .. } if gif => {}
            RenderOp::PrepareAudio {
                input,
                trim,
                speed,
                delay_ms,
                volume,
                ..
            } => {
                let mut chain = format!("[{input}:a]atrim={},asetpts=PTS-STARTPTS", trim_args(trim));
                if *speed != 1.0 {
                    chain.push_str(&format!(",atempo={speed}"));
                }
                chain.push_str(&format!(
                    ",adelay={delay_ms}|{delay_ms},volume={volume:.3}[a{input}]"
                ));
                filters.push(chain);
            }
            RenderOp::AudioMix { inputs } => {
                let labels: String = inputs.iter().map(|i| format!("[a{i}]")).collect();
                filters.push(format!(
                    "{labels}amix=inputs={}:normalize=0[{AUDIO_OUT}]",
                    inputs.len()
                ));
            }
        }
    }

    if gif {
        filters.push(format!(
            "[{last}]fps={},split[gif0][gif1];[gif0]palettegen[gifpal];[gif1][gifpal]paletteuse[gif]",
            settings.fps.clamp(1, 30)
        ));
        last = "gif".to_string();
    }

    (filters.join(";"), last)
}

/// Escape text for a single-quoted drawtext value.
pub fn escape_text(text: &str) -> String {
    text.replace(':', "\\:").replace('\'', "'\\''")
}

/// Quoted fontfile path with separators normalized for the filter parser.
fn font_path(fonts_dir: &Path, font: &str) -> String {
    let path: PathBuf = fonts_dir.join(format!("{font}.ttf"));
    let mut normalized = path.to_string_lossy().replace('\\', "/");
    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        normalized.insert(1, '\\');
    }
    format!("'{normalized}'")
}

/// Encoder arguments for the export settings.
pub fn codec_args(settings: &ExportSettings, with_audio: bool) -> Vec<String> {
    let crf = settings.quality.crf();
    let audio_bitrate = format!("{}k", settings.quality.audio_bitrate_kbps());

    let mut args: Vec<String> = match settings.format {
        ExportFormat::Mp4 | ExportFormat::Mov => vec![
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            settings.speed.preset().into(),
            "-crf".into(),
            crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ],
        ExportFormat::Webm => vec![
            "-c:v".into(),
            "libvpx-vp9".into(),
            "-crf".into(),
            (crf + 10).to_string(),
            "-b:v".into(),
            "0".into(),
            "-row-mt".into(),
            "1".into(),
        ],
        ExportFormat::Gif => vec!["-loop".into(), "0".into()],
    };

    if with_audio {
        let codec = match settings.format {
            ExportFormat::Webm => "libopus",
            _ => "aac",
        };
        args.extend(["-c:a".into(), codec.into(), "-b:a".into(), audio_bitrate]);
    } else {
        args.push("-an".into());
    }

    if matches!(settings.format, ExportFormat::Mp4 | ExportFormat::Mov) {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }
    args
}

/// Render progress recovered from an FFmpeg log.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub out_time_secs: f64,
    pub complete: bool,
}

impl ProgressState {
    /// Fold a `-progress` key/value pair into the state.
    pub fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, FFmpeg reports out_time_ms in microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    if us >= 0.0 {
                        self.out_time_secs = us / 1_000_000.0;
                    }
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    /// Fold one log line: either a `key=value` progress line or a stats line with `time=`.
    pub fn observe_line(&mut self, line: &str) {
        let line = line.trim();
        if let Some((key, value)) = line.split_once('=') {
            if !key.contains(char::is_whitespace) && !value.contains(char::is_whitespace) {
                self.update(key, value);
                return;
            }
        }
        if let Some(secs) = line
            .split_whitespace()
            .filter_map(|token| token.strip_prefix("time="))
            .find_map(parse_clock)
        {
            self.out_time_secs = secs;
        }
    }

    pub fn from_log(log: &str) -> Self {
        let mut state = Self::default();
        for line in log.lines() {
            state.observe_line(line);
        }
        state
    }

    /// Floored percentage of `duration`, capped at 100.
    pub fn percent(&self, duration: f64) -> u8 {
        if self.complete {
            return 100;
        }
        if duration <= 0.0 {
            return 0;
        }
        ((self.out_time_secs / duration) * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

/// Parse `HH:MM:SS.xx`.
pub fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// The last `lines` non-empty lines of a log.
pub fn log_tail(log: &str, lines: usize) -> Vec<String> {
    let mut tail: Vec<String> = log
        .lines()
        .rev()
        .filter(|l| !l.trim().is_empty())
        .take(lines)
        .map(str::to_string)
        .collect();
    tail.reverse();
    tail
}

/// Whether the ffmpeg binary can be executed.
pub fn ffmpeg_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, PlanInput};
    use cutline_project_model::{
        ClipSet, MediaClip, MediaKind, Project, ProjectStore, TextClip, TrackKind,
    };
    use uuid::Uuid;

    fn sample_project() -> Project {
        let mut store = ProjectStore::new(Project::new("argv"));
        let video = store.add_track(TrackKind::Video);
        let text = store.add_track(TrackKind::Text);
        let audio = store.add_track(TrackKind::Audio);

        let mut clip = MediaClip::new(MediaKind::Video, video, Uuid::new_v4(), "a.mp4", 10.0);
        clip.source_trim_start = 1.0;
        clip.source_trim_end = 5.0;
        clip.position_start = 2.0;
        clip.position_end = 6.0;
        clip.opacity = 80.0;
        let music = MediaClip::new(MediaKind::Audio, audio, Uuid::new_v4(), "m.mp3", 3.0);
        let title = TextClip::new(text, "It's 5:00", 0.0, 1.5);
        store
            .upsert_clips(ClipSet::both(vec![clip, music], vec![title]))
            .unwrap();
        store.into_project()
    }

    fn resolved(plan: &RenderPlan) -> ResolvedInputs {
        ResolvedInputs::new(
            plan.inputs
                .iter()
                .map(|i: &PlanInput| PathBuf::from(format!("/media/{}", i.source)))
                .collect(),
        )
    }

    #[test]
    fn test_filter_graph_shape() {
        let project = sample_project();
        let plan = compile(&project).unwrap();
        let (graph, out) = filter_graph(&plan, project.export_settings(), Path::new("/fonts"));

        assert!(graph.starts_with("color=c=black:size=1920x1080:d=6.000[base];"));
        assert!(graph.contains(
            "trim=start=1.000:duration=4.000,scale=1920:1080,setpts=PTS-STARTPTS+2.000/TB,format=yuva420p,colorchannelmixer=aa=0.800[v"
        ));
        assert!(graph.contains("enable='gte(t,2.000)*lt(t,6.000)'"));
        assert!(graph.contains("text='It'\\''s 5\\:00'"));
        assert!(graph.contains("fontfile='/fonts/Arial.ttf'"));
        assert!(graph.contains("fontcolor=white@1"));
        assert!(graph.contains("asetpts=PTS-STARTPTS,adelay=0|0,volume=1.000"));
        assert!(graph.contains("amix=inputs=2:normalize=0[outa]"));
        assert_eq!(out, "c1");
    }

    #[test]
    fn test_build_argv() {
        let project = sample_project();
        let plan = compile(&project).unwrap();
        let cmd = FfmpegCommand::build(
            &plan,
            &resolved(&plan),
            project.export_settings(),
            Path::new("/fonts"),
            Path::new("/tmp/job.mp4"),
        )
        .unwrap()
        .with_program("/usr/bin/ffmpeg");

        assert_eq!(cmd.program, "/usr/bin/ffmpeg");
        let args = cmd.args.join(" ");
        assert!(args.contains("-map [c1] -map [outa]"));
        assert!(args.contains("-c:v libx264 -preset ultrafast -crf 18"));
        assert!(args.contains("-c:a aac -b:a 256k"));
        assert!(args.contains("-r 30 -t 6.000 -progress pipe:1"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("/tmp/job.mp4"));
    }

    #[test]
    fn test_build_rejects_mismatched_inputs() {
        let project = sample_project();
        let plan = compile(&project).unwrap();
        let result = FfmpegCommand::build(
            &plan,
            &ResolvedInputs::new(Vec::new()),
            project.export_settings(),
            Path::new("/fonts"),
            Path::new("/tmp/out.mp4"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_gif_has_palette_and_no_audio() {
        let project = sample_project();
        let plan = compile(&project).unwrap();
        let settings = ExportSettings {
            format: ExportFormat::Gif,
            ..ExportSettings::default()
        };
        let cmd = FfmpegCommand::build(
            &plan,
            &resolved(&plan),
            &settings,
            Path::new("/fonts"),
            Path::new("/tmp/out.gif"),
        )
        .unwrap();
        let args = cmd.args.join(" ");
        assert!(args.contains("palettegen"));
        assert!(args.contains("-map [gif]"));
        assert!(!args.contains("[outa]"));
        assert!(args.contains("-an"));
    }

    #[test]
    fn test_webm_codecs() {
        let settings = ExportSettings {
            format: ExportFormat::Webm,
            ..ExportSettings::default()
        };
        let args = codec_args(&settings, true).join(" ");
        assert!(args.contains("libvpx-vp9"));
        assert!(args.contains("-c:a libopus"));
        assert!(!args.contains("faststart"));
    }

    #[test]
    fn test_windows_font_path_escapes_drive() {
        assert_eq!(font_path(Path::new("C:\\fonts"), "Arial"), "'C\\:/fonts/Arial.ttf'");
    }

    #[test]
    fn test_progress_from_progress_keys() {
        let log = "frame=10\nout_time_us=4000000\nprogress=continue\n";
        let state = ProgressState::from_log(log);
        assert_eq!(state.out_time_secs, 4.0);
        assert_eq!(state.percent(5.0), 80);

        let state = ProgressState::from_log("out_time_ms=2500000\n");
        assert_eq!(state.out_time_secs, 2.5);
    }

    #[test]
    fn test_progress_from_stats_line() {
        let log = "frame=  120 fps= 60 q=28.0 size=     256kB time=00:01:02.50 bitrate= 524.3kbits/s speed=2.01x\n";
        let state = ProgressState::from_log(log);
        assert_eq!(state.out_time_secs, 62.5);
        assert_eq!(state.percent(125.0), 50);
    }

    #[test]
    fn test_progress_ignores_unavailable_and_caps() {
        let state = ProgressState::from_log("out_time_us=N/A\n");
        assert_eq!(state.out_time_secs, 0.0);
        let state = ProgressState::from_log("out_time_us=9000000\n");
        assert_eq!(state.percent(3.0), 100);
        assert_eq!(state.percent(0.0), 0);
        let state = ProgressState::from_log("progress=end\n");
        assert_eq!(state.percent(10.0), 100);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("01:00:01.5"), Some(3601.5));
        assert_eq!(parse_clock("bad"), None);
        assert_eq!(parse_clock("00:00"), None);
    }

    #[test]
    fn test_log_tail_skips_blank_lines() {
        let log = "a\n\nb\nc\n\n";
        assert_eq!(log_tail(log, 2), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(log_tail(log, 10).len(), 3);
    }
}
