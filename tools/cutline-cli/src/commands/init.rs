//! Initialize a new Cutline project.

use std::path::PathBuf;

use cutline_project_model::LoadedProject;

pub fn run(name: String, output: PathBuf) -> anyhow::Result<()> {
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let project = LoadedProject::create(&project_dir, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    let settings = project.project.export_settings();
    let (width, height) = settings.resolution.dimensions();
    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!("  Export: {}x{} @ {}fps", width, height, settings.fps);
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── project.json");
    println!("  ├── media/       (source blobs)");
    println!("  ├── renders/     (persisted exports)");
    println!("  └── .tmp/        (render jobs)");

    Ok(())
}
