use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use listening_tutor::config::TutorConfig;
use listening_tutor::engine::{ManualTimeSource, StubOutput};
use listening_tutor::exercise::{
    format_clock, hint_markers, Level, QuestionType, Selection, SessionIdentity, StartRequest,
    TestPart, RANDOM_TOPIC,
};
use listening_tutor::fixtures::{
    load_exercise, FileContentGenerator, FixtureCatalog, SilentSynthesizer, WavSynthesizer,
};
use listening_tutor::managers::{SessionBackends, SessionManager};
use listening_tutor::playback::PlaybackStatus;
use listening_tutor::report::JsonReportRenderer;
use listening_tutor::session::AudioSynthesizer;
use listening_tutor::telemetry::hub;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "listening_cli",
    about = "Deterministic session harness for the listening tutor"
)]
struct Cli {
    /// Override directory containing fixture assets (defaults to ./fixtures)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    /// Configuration file (defaults to assets/tutor_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an exercise summary with its hint markers
    Inspect {
        #[arg(long)]
        exercise: String,
        /// Track duration used to place the markers
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Run a scripted session against the stub output and print the report
    ///
    /// Actions: play, pause, toggle, wait:SECS, wait_end, seek:SECS,
    /// answer:ID=VALUE, lifeline:ID, script:ID, proof:ID, finalize
    Simulate {
        #[arg(long)]
        exercise: String,
        /// WAV track to play instead of the fixture's own audio
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Length of the silent track when no audio is available
        #[arg(long)]
        duration: Option<f64>,
        #[arg(long = "action")]
        actions: Vec<String>,
        /// Test part (1-4)
        #[arg(long, value_enum, default_value_t = PartArg::Part1)]
        part: PartArg,
        #[arg(long, value_enum, default_value_t = LevelArg::Official)]
        level: LevelArg,
        #[arg(long = "type", value_enum, default_value_t = QuestionTypeArg::Note)]
        question_type: QuestionTypeArg,
        /// Topic from the part's catalog
        #[arg(long, default_value = RANDOM_TOPIC)]
        topic: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        test_number: String,
        /// Seed for the 50/50 lifeline
        #[arg(long)]
        seed: Option<u64>,
        /// Directory to write the report to instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also print the telemetry snapshot
        #[arg(long)]
        telemetry: bool,
    },
    /// List available fixtures on disk
    DumpFixtures,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_else(FixtureCatalog::default);
    let config = match cli.config {
        Some(path) => TutorConfig::load_from_file(path),
        None => TutorConfig::load(),
    };

    match cli.command {
        Commands::Inspect { exercise, duration } => run_inspect(&catalog, &exercise, duration),
        Commands::Simulate {
            exercise,
            audio,
            duration,
            actions,
            part,
            level,
            question_type,
            topic,
            name,
            test_number,
            seed,
            out,
            telemetry,
        } => {
            let mut config = config;
            if seed.is_some() {
                config.session.lifeline_seed = seed;
            }
            let selection =
                Selection::new(question_type.into(), part.into(), level.into(), &topic);
            let simulation = Simulation {
                exercise,
                audio,
                duration,
                actions,
                selection,
                identity: SessionIdentity::new(&name, &test_number),
                out,
                telemetry,
            };

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;
            runtime.block_on(run_simulate(&catalog, config, simulation))
        }
        Commands::DumpFixtures => run_dump(&catalog),
    }
}

fn run_inspect(catalog: &FixtureCatalog, fixture: &str, duration: Option<f64>) -> Result<ExitCode> {
    let metadata = catalog.resolve(fixture)?;
    let exercise = load_exercise(&metadata.exercise_path, &Selection::default())?;
    let duration = match duration {
        Some(duration) => duration,
        None => SilentSynthesizer::fit_to_script().duration_for(&exercise),
    };
    let exercise = exercise.clamped_to_duration(duration);

    println!("{}", exercise.title);
    println!("{}", exercise.instruction);
    println!(
        "{} question(s), {} script segment(s), {} track",
        exercise.questions.len(),
        exercise.script_segments.len(),
        format_clock(duration)
    );
    for question in &exercise.questions {
        println!(
            "  Q{} [{:?}] {} (proof {}-{})",
            question.id,
            question.kind,
            question.label,
            format_clock(question.proof_start),
            format_clock(question.proof_end)
        );
        for option in question.choices() {
            println!("      {option}");
        }
    }

    let markers = hint_markers(&exercise, duration, 0.0);
    for marker in markers {
        println!(
            "  marker Q{} at {:.1}%",
            marker.question_id,
            marker.fraction * 100.0
        );
    }
    Ok(ExitCode::from(0))
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(audio) = metadata.audio_path {
            println!("{} -> {}", metadata.name, audio.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

struct Simulation {
    exercise: String,
    audio: Option<PathBuf>,
    duration: Option<f64>,
    actions: Vec<String>,
    selection: Selection,
    identity: SessionIdentity,
    out: Option<PathBuf>,
    telemetry: bool,
}

async fn run_simulate(
    catalog: &FixtureCatalog,
    config: TutorConfig,
    simulation: Simulation,
) -> Result<ExitCode> {
    let metadata = catalog.resolve(&simulation.exercise)?;
    let generator = FileContentGenerator::from_path(&metadata.exercise_path)?;
    let synthesizer: Arc<dyn AudioSynthesizer> =
        match (simulation.audio.or(metadata.audio_path), simulation.duration) {
            (_, Some(duration)) => Arc::new(SilentSynthesizer::with_duration(duration)),
            (Some(path), None) => Arc::new(WavSynthesizer::new(path)),
            (None, None) => Arc::new(SilentSynthesizer::fit_to_script()),
        };

    let output = Arc::new(StubOutput::new());
    let time = Arc::new(ManualTimeSource::new());
    let settle = Duration::from_millis(config.playback.poll_interval_ms.max(1) * 3);
    let manager = SessionManager::new(
        SessionBackends {
            generator: Arc::new(generator),
            synthesizer,
            output: output.clone(),
            time: time.clone(),
        },
        config,
    );

    manager
        .start_session(StartRequest::new(simulation.selection, simulation.identity))
        .await
        .context("starting session")?;

    for action in &simulation.actions {
        let step = Step::parse(action)?;
        tracing::info!("[listening_cli] {action}");
        match step {
            Step::Play => manager.play()?,
            Step::Pause => manager.pause()?,
            Step::Toggle => manager.toggle()?,
            Step::Seek(target) => manager.seek(target)?,
            Step::Wait(seconds) => {
                time.advance_secs(seconds);
                tokio::time::sleep(settle).await;
            }
            Step::WaitEnd => {
                if let Some(id) = output.active_id() {
                    output.finish(id);
                }
                tokio::time::sleep(settle).await;
            }
            Step::Answer(id, value) => manager.set_answer(id, &value)?,
            Step::Lifeline(id) => {
                let hidden = manager.use_lifeline(id)?;
                eprintln!("Q{id} lifeline hides: {}", hidden.join(", "));
            }
            Step::Script(id) => {
                let reveal = manager.reveal_script(id)?;
                eprintln!(
                    "Q{id} script [{}-{}]: {}",
                    format_clock(reveal.proof_start),
                    format_clock(reveal.proof_end),
                    reveal.answer_sentence
                );
            }
            Step::Proof(id) => manager.play_proof(id)?,
            Step::Finalize => manager.finalize()?,
        }
    }

    if manager.status()? != PlaybackStatus::Submitted {
        manager.finalize()?;
    }

    match simulation.out {
        Some(dir) => {
            ensure_dir(&dir)?;
            let path = manager.render_report(&JsonReportRenderer, &dir)?;
            println!("Report written to {}", path.display());
        }
        None => {
            let report = manager.report()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if simulation.telemetry {
        emit_telemetry()?;
    }

    if output.max_concurrent() > 1 {
        bail!(
            "{} emitters were active at once",
            output.max_concurrent()
        );
    }
    Ok(ExitCode::from(0))
}

fn emit_telemetry() -> Result<()> {
    let snapshot = hub().snapshot();
    let payload = TelemetryPayload {
        total_events: snapshot.total_events,
        dropped_events: snapshot.dropped_events,
        recent: &snapshot.recent,
    };
    eprintln!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[derive(Serialize)]
struct TelemetryPayload<'a> {
    total_events: u64,
    dropped_events: u64,
    recent: &'a [listening_tutor::telemetry::MetricEvent],
}

#[derive(Debug, PartialEq)]
enum Step {
    Play,
    Pause,
    Toggle,
    Seek(f64),
    Wait(f64),
    WaitEnd,
    Answer(u32, String),
    Lifeline(u32),
    Script(u32),
    Proof(u32),
    Finalize,
}

impl Step {
    fn parse(action: &str) -> Result<Self> {
        let (name, arg) = match action.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (action, None),
        };
        let arg = || arg.ok_or_else(|| anyhow!("action '{action}' needs an argument"));
        let seconds = || -> Result<f64> {
            arg()?
                .parse()
                .with_context(|| format!("invalid seconds in '{action}'"))
        };
        let question = || -> Result<u32> {
            arg()?
                .parse()
                .with_context(|| format!("invalid question id in '{action}'"))
        };

        let step = match name {
            "play" => Step::Play,
            "pause" => Step::Pause,
            "toggle" => Step::Toggle,
            "finalize" => Step::Finalize,
            "wait_end" => Step::WaitEnd,
            "seek" => Step::Seek(seconds()?),
            "wait" => Step::Wait(seconds()?),
            "lifeline" => Step::Lifeline(question()?),
            "script" => Step::Script(question()?),
            "proof" => Step::Proof(question()?),
            "answer" => {
                let (id, value) = arg()?
                    .split_once('=')
                    .ok_or_else(|| anyhow!("expected answer:ID=VALUE, got '{action}'"))?;
                let id = id
                    .parse()
                    .with_context(|| format!("invalid question id in '{action}'"))?;
                Step::Answer(id, value.to_string())
            }
            other => bail!("unknown action '{other}'"),
        };
        Ok(step)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum PartArg {
    #[value(name = "1")]
    Part1,
    #[value(name = "2")]
    Part2,
    #[value(name = "3")]
    Part3,
    #[value(name = "4")]
    Part4,
}

impl From<PartArg> for TestPart {
    fn from(part: PartArg) -> Self {
        match part {
            PartArg::Part1 => TestPart::Part1,
            PartArg::Part2 => TestPart::Part2,
            PartArg::Part3 => TestPart::Part3,
            PartArg::Part4 => TestPart::Part4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LevelArg {
    #[value(name = "a1-a2")]
    A1A2,
    #[value(name = "b1-b2")]
    B1B2,
    #[value(name = "c1-c2")]
    C1C2,
    Official,
}

impl From<LevelArg> for Level {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::A1A2 => Level::A1A2,
            LevelArg::B1B2 => Level::B1B2,
            LevelArg::C1C2 => Level::C1C2,
            LevelArg::Official => Level::Official,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum QuestionTypeArg {
    Sentence,
    Note,
    Mcq,
    Mixed,
}

impl From<QuestionTypeArg> for QuestionType {
    fn from(question_type: QuestionTypeArg) -> Self {
        match question_type {
            QuestionTypeArg::Sentence => QuestionType::Sentence,
            QuestionTypeArg::Note => QuestionType::Note,
            QuestionTypeArg::Mcq => QuestionType::Mcq,
            QuestionTypeArg::Mixed => QuestionType::Mixed,
        }
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))
}
