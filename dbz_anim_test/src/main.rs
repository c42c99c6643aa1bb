use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dbz_anim::{AnimationSystem, Diagnostic};
use log::{debug, info, warn};

use rig::{Assignment, TimedAssignment, active_state_name, bone_matrices_by_name, load_rig};

mod rig;

#[derive(Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// The rig JSON with bones, clips, and an optional animator graph.
    rig: PathBuf,

    /// The number of frames to update.
    #[arg(long, default_value_t = 60)]
    frames: usize,

    /// The time in seconds between frames.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    delta: f32,

    /// Set a graph parameter before the first frame as name=value.
    #[arg(long = "set")]
    set: Vec<Assignment>,

    /// Set a graph parameter before updating a frame as frame:name=value.
    #[arg(long = "set-at")]
    set_at: Vec<TimedAssignment>,

    /// Write the final bone matrices by bone name as JSON.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log every frame.
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init()?;

    let rig = load_rig(&cli.rig).with_context(|| format!("failed to load {:?}", cli.rig))?;

    let mut animators = vec![rig.build()];
    for assignment in &cli.set {
        assignment
            .apply(&mut animators[0])
            .with_context(|| format!("failed to set {:?}", assignment.name))?;
    }

    let start = std::time::Instant::now();

    let mut system = AnimationSystem::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut active_state = None;

    for frame in 0..cli.frames {
        for timed in cli.set_at.iter().filter(|s| s.frame == frame) {
            let name = &timed.assignment.name;
            timed
                .assignment
                .apply(&mut animators[0])
                .with_context(|| format!("failed to set {name:?} at frame {frame}"))?;
        }

        system.update_with_diagnostics(&mut animators, cli.delta, &mut diagnostics);

        let animator = &animators[0];
        match &animator.graph {
            Some(graph) => {
                let name = active_state_name(graph).map(|n| n.to_string());
                if name != active_state {
                    info!("Frame {frame}: entered state {:?}", name);
                    active_state = name;
                }
                debug!(
                    "Frame {frame}: time {:.3}, blend {:?}",
                    animator.current_time,
                    graph.blend_weights()
                );
            }
            None => debug!(
                "Frame {frame}: clip {:?}, time {:.3}",
                animator.current_clip_name,
                animator.current_time
            ),
        }
    }

    info!("Updated {} frames in {:?}", cli.frames, start.elapsed());

    report_diagnostics(&diagnostics);

    if let Some(output) = &cli.output {
        let matrices = bone_matrices_by_name(&animators[0]);
        let json = serde_json::to_string_pretty(&matrices)?;
        std::fs::write(output, json).with_context(|| format!("failed to write {output:?}"))?;
        info!("Wrote {} bone matrices to {output:?}", matrices.len());
    }

    Ok(())
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    // The same data is usually skipped every frame.
    let mut unique: Vec<&Diagnostic> = Vec::new();
    for diagnostic in diagnostics {
        if !unique.contains(&diagnostic) {
            unique.push(diagnostic);
        }
    }

    for diagnostic in unique {
        let count = diagnostics.iter().filter(|d| *d == diagnostic).count();
        warn!("{diagnostic:?} in {count} frames");
    }
}
