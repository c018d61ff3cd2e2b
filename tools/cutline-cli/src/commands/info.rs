//! Show project information.

use std::path::PathBuf;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = super::load(&path)?;
    let p = &project.project;

    println!("Project: {}", p.name());
    println!("  ID: {}", p.id());
    println!("  Created: {}", p.created_at());
    println!("  Modified: {}", p.modified_at());
    println!("  Duration: {:.3}s", p.duration());
    println!();

    println!("Tracks (top to bottom):");
    for track in p.tracks() {
        let media = p.media().iter().filter(|c| c.track_id == track.id).count();
        let text = p.text().iter().filter(|c| c.track_id == track.id).count();
        let mut flags = Vec::new();
        if track.muted {
            flags.push("muted");
        }
        if track.soloed {
            flags.push("solo");
        }
        println!(
            "  {} [{}]: {} clip(s){}",
            track.name,
            track.kind,
            media + text,
            if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            }
        );
    }
    println!();

    println!("Clips:");
    for clip in p.media() {
        println!(
            "  {} {:?} {:.3}s..{:.3}s trim {:.3}..{:.3} x{}",
            clip.file_name,
            clip.kind,
            clip.position_start,
            clip.position_end,
            clip.source_trim_start,
            clip.source_trim_end,
            clip.playback_speed
        );
    }
    for clip in p.text() {
        println!(
            "  \"{}\" text {:.3}s..{:.3}s",
            clip.content, clip.position_start, clip.position_end
        );
    }
    println!();

    let export = p.export_settings();
    let (width, height) = export.resolution.dimensions();
    println!("Export config:");
    println!("  Format: {:?}", export.format);
    println!("  Output: {}x{} @ {}fps", width, height, export.fps);
    println!("  Quality: {:?} / speed {:?}", export.quality, export.speed);

    Ok(())
}
