use clap::{Parser, Subcommand};
use rehab_core::catalog::{display_name, exercises, sample_program};
use rehab_core::scheduler::PlaybackSettings;
use rehab_core::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rehabx")]
#[command(about = "Exercise program playback for the RehabX arm demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an exercise program document without playing it
    Validate {
        /// Program JSON file
        file: PathBuf,

        /// Reject unknown exercise codes and missing pressure/cadence
        #[arg(long)]
        strict: bool,
    },

    /// Play an exercise program on the simulated arm (Ctrl-C to stop)
    Run {
        /// Program JSON file
        file: PathBuf,

        /// Playback speed multiplier (overrides playback.time_scale)
        #[arg(long)]
        speed: Option<f64>,

        /// Reject unknown exercise codes and missing pressure/cadence
        #[arg(long)]
        strict: bool,
    },

    /// Print the built-in demonstration program as JSON
    Sample {
        /// Replace the run id with a freshly generated one
        #[arg(long)]
        fresh_id: bool,
    },

    /// List the exercise codes the catalog understands
    Exercises,

    /// Print joint angles of a motion program at a point in a repetition
    Preview {
        /// Motion program (elbow-flex, wrist-rotate, finger-grip, full-range)
        program: String,

        /// Progress within one repetition, 0.0 to 1.0
        #[arg(long, default_value_t = 0.25)]
        progress: f64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    rehab_core::logging::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Validate { file, strict } => cmd_validate(&file, strict, &config),
        Commands::Run {
            file,
            speed,
            strict,
        } => cmd_run(&file, speed, strict, &config).await,
        Commands::Sample { fresh_id } => cmd_sample(fresh_id),
        Commands::Exercises => {
            cmd_exercises();
            Ok(())
        }
        Commands::Preview { program, progress } => cmd_preview(&program, progress),
    }
}

fn load_program(file: &Path, strict: bool, config: &Config) -> Result<ExerciseProgram> {
    let contents = std::fs::read_to_string(file)?;
    let document: serde_json::Value = serde_json::from_str(&contents)?;
    let policy = ValidationPolicy {
        strict: strict || config.validation.strict,
    };
    let program = validate_with(&document, policy)?;
    tracing::info!("Valid exercise program loaded from {:?}", file);
    Ok(program)
}

fn cmd_validate(file: &Path, strict: bool, config: &Config) -> Result<()> {
    let program = load_program(file, strict, config)?;

    println!(
        "✓ Valid exercise program: {} exercises for patient {}",
        program.steps().len(),
        program.patient_id
    );
    display_schedule(&program);
    Ok(())
}

async fn cmd_run(file: &Path, speed: Option<f64>, strict: bool, config: &Config) -> Result<()> {
    let program = load_program(file, strict, config)?;

    let mut playback = config.playback.clone();
    if let Some(speed) = speed {
        playback.time_scale = speed;
    }
    let mut checked = config.clone();
    checked.playback = playback.clone();
    checked.validate()?;

    display_schedule(&program);

    let rig = Arc::new(SkeletonRig::hand());
    let scheduler = Scheduler::new(rig.clone()).with_settings(PlaybackSettings::from(&playback));

    let handle = scheduler.start_with_progress(program, |event| match event {
        PlaybackEvent::StepStarted {
            index,
            total,
            exercise,
            program,
        } => println!(
            "▶ Exercise {}/{}: {} → {}",
            index + 1,
            total,
            display_name(exercise),
            program.description()
        ),
        PlaybackEvent::StateChanged(PlaybackState::Resting { .. }) => {
            println!("  ⏸ Resting, pose reset");
        }
        PlaybackEvent::StepFinished { index, total } => {
            println!("  ✓ Progress: {}/{}", index + 1, total);
        }
        _ => {}
    })?;

    // Ctrl-C cancels cooperatively
    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n⏹ Stopping after the current wait...");
            canceller.cancel();
        }
    });

    // Render loop: sample the active motion once per frame
    let frames = rig.clone();
    let mut state = handle.subscribe();
    let frame_interval = playback.frame_interval();
    let render = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(frame_interval);
        loop {
            ticker.tick().await;
            frames.tick();
            if state.borrow_and_update().is_terminal() {
                break;
            }
        }
    });

    let report = handle.wait().await;
    render.abort();
    let report = report?;

    match report.outcome {
        RunOutcome::Completed => println!(
            "\n✓ Program complete: {}/{} exercises in {:.1}s",
            report.steps_completed,
            report.total_steps,
            report.elapsed.as_secs_f64()
        ),
        RunOutcome::Cancelled { step } => println!(
            "\n⏹ Program stopped at exercise {} ({}/{} completed)",
            step + 1,
            report.steps_completed,
            report.total_steps
        ),
    }

    Ok(())
}

fn cmd_sample(fresh_id: bool) -> Result<()> {
    let mut program = sample_program();
    if fresh_id {
        program.run_id = uuid::Uuid::new_v4().simple().to_string();
    }
    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}

fn cmd_exercises() {
    println!("Supported exercises:");
    for entry in exercises() {
        println!(
            "  {:<16} {:<16} → {}",
            entry.code, entry.display_name, entry.program
        );
    }
    println!();
    println!("Intensities: LOW, MED/MEDIUM, HIGH");
    println!(
        "Unknown codes play as {} unless validated with --strict",
        rehab_core::catalog::FALLBACK_PROGRAM
    );
}

fn cmd_preview(program: &str, progress: f64) -> Result<()> {
    let program: MotionProgramId = program.parse()?;
    if !(0.0..=1.0).contains(&progress) {
        return Err(Error::Playback(format!(
            "progress must be between 0 and 1, got {}",
            progress
        )));
    }

    println!("{} at {:.0}% of a repetition:", program.description(), progress * 100.0);
    let rig = SkeletonRig::hand();
    for offset in program.sample(progress) {
        rig.rotate_joint(offset.joint, offset.axis, offset.degrees)?;
        println!("  {:<8} {:?} {:>8.2}°", offset.joint, offset.axis, offset.degrees);
    }
    for name in rig.joint_names() {
        if let Some(line) = rig.debug_joint(&name) {
            tracing::debug!("{}", line);
        }
    }
    Ok(())
}

fn display_schedule(program: &ExerciseProgram) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  PATIENT {}  (run {})", program.patient_id, short_id(&program.run_id));
    println!("╰─────────────────────────────────────────╯");
    println!("  Score: {:.1}%", program.recommended.score * 100.0);
    println!(
        "  Planned duration: ~{:.0} seconds",
        program.planned_duration().as_secs_f64()
    );
    println!();

    let last = program.steps().len() - 1;
    for (index, step) in program.steps().iter().enumerate() {
        println!(
            "  {}. {} [{}]  {} min, {} reps",
            index + 1,
            display_name(&step.exercise),
            step.intensity,
            step.duration_min,
            step.repetitions
        );
        if let (Some(pressure), Some(cadence)) = (step.pressure_percentage, step.cadence_rpm) {
            println!("     Pressure: {}% • RPM: {}", pressure, cadence);
        }
        if index < last && step.rest_min > 0.0 {
            println!("     ⏸ Rest {} min → reset pose", step.rest_min);
        }
    }
    println!();
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}
