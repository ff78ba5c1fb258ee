use std::path::PathBuf;
use std::process;

use crate::cli::{Cli, Commands, EncodeArgs};
use crate::config::Config;
use crate::engine::supervisor::JobState;
use crate::engine::{OptionModel, format_command, validate};
use crate::session::Session;

pub fn run(cli: Cli) {
    let config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::CheckFfmpeg => handle_check_ffmpeg(&config),
        Commands::Probe { file } => handle_probe(&config, file),
        Commands::DetectCrop { file } => handle_detect_crop(&config, file),
        Commands::DryRun(args) => handle_dry_run(&config, args),
        Commands::Encode(args) => handle_encode(&config, args),
        Commands::InitConfig => handle_init_config(),
    }
}

/// Map CLI arguments onto an option model, falling back to config
/// defaults for anything not given on the command line.
fn model_from_args(config: &Config, args: &EncodeArgs) -> OptionModel {
    let mut model = OptionModel::new(args.input.clone(), args.output.clone());
    model.preset = args.preset.unwrap_or(config.defaults.preset);
    model.rate_control = args.rate_control.unwrap_or(config.defaults.rate_control);
    model.quality = args.quality.unwrap_or(config.defaults.quality);
    model.resolution_scale = args.scale;
    model.skip_audio = args.no_audio;
    model.sharpen = args.sharpen;
    model.crop = args.crop.clone();
    model.start_time = args.start.clone();
    model.end_time = args.end.clone();
    model.test_frames = args.test_frames;
    model.overwrite = args.overwrite || config.defaults.overwrite;

    if let Some(extra) = &args.extra_args {
        // Shell-style parsing so quoted strings with spaces survive.
        model.extra_flags = shlex::split(extra)
            .unwrap_or_else(|| extra.split_whitespace().map(str::to_string).collect());
    }

    model
}

fn handle_check_ffmpeg(config: &Config) {
    let mut failed = false;
    for (name, binary) in [
        ("ffmpeg", &config.encoder.binary),
        ("ffprobe", &config.encoder.ffprobe),
    ] {
        match process::Command::new(binary).arg("-version").output() {
            Ok(out) if out.status.success() => {
                let first_line = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string();
                println!("{} found: {}", name, first_line);
            }
            Ok(_) => {
                eprintln!("{} at {} did not run cleanly", name, binary.display());
                failed = true;
            }
            Err(e) => {
                eprintln!("{} not found at {}: {}", name, binary.display(), e);
                failed = true;
            }
        }
    }
    process::exit(if failed { 1 } else { 0 });
}

fn handle_probe(config: &Config, file: PathBuf) {
    let mut session = Session::new(config.clone());
    match session.select_file(&file) {
        Ok(info) => {
            println!("file:     {}", info.path.display());
            println!("codec:    {}", info.video_codec);
            println!("size:     {}x{}", info.width, info.height);
            println!("duration: {:.2}s", info.duration_seconds);
            println!("bitrate:  {} kbps", info.bitrate_kbps);
        }
        Err(e) => {
            eprintln!("Error: {:#}", anyhow::Error::from(e));
            process::exit(1);
        }
    }
}

fn handle_detect_crop(config: &Config, file: PathBuf) {
    let mut session = Session::new(config.clone());
    if let Err(e) = session.select_file(&file) {
        eprintln!("Error: {:#}", anyhow::Error::from(e));
        process::exit(1);
    }
    match session.detect_crop() {
        Ok(crop) => println!("{}", crop),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Fill `crop` from a cropdetect run. The input must already probe
/// cleanly; detection decodes a sample but writes nothing.
fn apply_autocrop(session: &mut Session, model: &mut OptionModel) {
    if let Err(e) = session.select_file(&model.input_path) {
        eprintln!("Error: {:#}", anyhow::Error::from(e));
        process::exit(1);
    }
    match session.detect_crop() {
        Ok(crop) => {
            println!("Detected crop: {}", crop);
            model.crop = Some(crop);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn handle_dry_run(config: &Config, args: EncodeArgs) {
    let mut session = Session::new(config.clone());
    let mut model = model_from_args(config, &args);

    if args.autocrop {
        apply_autocrop(&mut session, &mut model);
    }

    if let Err(e) = validate(&model) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    println!("{}", format_command(&session.build_command(&model)));
}

fn handle_encode(config: &Config, args: EncodeArgs) {
    let mut session = Session::new(config.clone());
    let mut model = model_from_args(config, &args);

    if args.autocrop {
        apply_autocrop(&mut session, &mut model);
    } else {
        // Probe up front for a progress denominator; a file that fails
        // validation below will already have failed here.
        let _ = session.select_file(&model.input_path);
    }
    let duration = session.current_media().map(|info| info.duration_seconds);

    let job = match session.start_encode(&model) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    println!("Command: {}", format_command(job.command()));

    // Ctrl-C cancels the encode instead of orphaning the child.
    {
        let job = job.clone();
        let supervisor = session.supervisor().clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("\nCancelling encode...");
            supervisor.cancel(&job);
        }) {
            eprintln!("Warning: could not install Ctrl-C handler: {}", e);
        }
    }

    let mut stats = crate::engine::StatsParser::new();
    if let Some(lines) = job.subscribe() {
        for line in lines {
            if stats.parse_line(&line) {
                let pct = stats.progress_pct(duration);
                if pct > 0.0 {
                    print!("\rProgress: {:.1}%", pct);
                } else if let Some(frame) = stats.frame {
                    print!("\rFrame: {}", frame);
                }
                if let Some(fps) = stats.fps {
                    print!(" | FPS: {:.1}", fps);
                }
                if let Some(speed) = stats.speed {
                    print!(" | Speed: {:.2}x", speed);
                }
                use std::io::Write;
                std::io::stdout().flush().ok();
            } else {
                println!("{}", line);
            }
        }
    }
    println!();

    match job.wait() {
        JobState::Succeeded => {
            println!("✓ Completed: {}", model.output_path.display());
        }
        JobState::Cancelled => {
            println!("Encode cancelled");
            process::exit(130);
        }
        JobState::Failed => {
            if let Some(failure) = job.failure() {
                eprintln!("Error: {}", failure);
                for line in failure.log_tail.iter().rev().take(10).rev() {
                    eprintln!("  {}", line);
                }
            }
            process::exit(1);
        }
        // wait() only returns terminal states
        _ => unreachable!(),
    }
}

fn handle_init_config() {
    match Config::config_path() {
        Ok(path) => {
            if Config::exists() {
                println!("Config exists: {}", path.display());
            } else if let Err(e) = Config::ensure_default() {
                eprintln!("Error creating config: {:#}", e);
                process::exit(1);
            } else {
                println!("Created default config: {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
