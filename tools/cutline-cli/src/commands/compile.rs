//! Compile a project into a render plan and FFmpeg command.

use std::path::PathBuf;

use cutline_common::AppConfig;
use cutline_render_engine::{compile, resolve_inputs, DirBlobStore, FfmpegCommand};

pub fn run(path: PathBuf, print_plan: bool, config: &AppConfig) -> anyhow::Result<()> {
    let project = super::load(&path)?;
    let plan = compile(&project.project)?;

    if print_plan {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let blobs = DirBlobStore::new(project.media_dir());
    let inputs = resolve_inputs(&plan, &blobs)?;
    let settings = project.project.export_settings();
    let output = project
        .temp_dir()
        .join(format!("output.{}", settings.format.extension()));

    let command = FfmpegCommand::build(
        &plan,
        &inputs,
        settings,
        &config.render.fonts_dir,
        &output,
    )?
    .with_program(&config.render.ffmpeg_path);

    println!("{}", command.program);
    for arg in &command.args {
        println!("  {arg}");
    }
    Ok(())
}
