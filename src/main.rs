use anyhow::{bail, Context, Result};
use clap::Parser;
use hike_tracker_rs::clock::{Clock, ManualClock};
use hike_tracker_rs::enrichment::{analysis_or_fallback, parse_breed_traits, parse_trails};
use hike_tracker_rs::environment::EnvironmentalCache;
use hike_tracker_rs::live_status::LiveStatus;
use hike_tracker_rs::session::{HikeSessionController, StartOutcome};
use hike_tracker_rs::storage::{to_gpx_xml, HikeHistory, JsonFileStore};
use hike_tracker_rs::types::SubjectProfile;
use hike_tracker_rs::watchdog::FixWatchdog;
use hike_tracker_rs::HikeConfig;
use log::{debug, info, warn};
use std::path::PathBuf;
use tokio::sync::mpsc;

mod feed;

use feed::{ConstantEnvironment, EnvironmentSource, FixLog, SessionEvent};

#[derive(Parser, Debug)]
#[command(name = "hike_tracker")]
#[command(about = "Replay a recorded GPS fix log through the hike session engine", long_about = None)]
struct Args {
    /// JSON array of fix / error entries
    #[arg(value_name = "FIX_LOG")]
    fix_log: PathBuf,

    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the jitter threshold in miles
    #[arg(long)]
    jitter_threshold_miles: Option<f64>,

    #[arg(long, default_value = "dog")]
    subject: String,

    /// Stride length in meters (0 = use fallback)
    #[arg(long, default_value = "0.5")]
    stride_m: f64,

    #[arg(long, default_value = "20.0")]
    weight_kg: f64,

    /// 0 (poor) to 10 (excellent)
    #[arg(long, default_value = "5.0")]
    heat_tolerance: f64,

    #[arg(long)]
    medical_risk: bool,

    /// Text response holding breed traits; overrides stride and heat tolerance
    #[arg(long)]
    breed_traits: Option<PathBuf>,

    /// Text response holding trail recommendations to list before the replay
    #[arg(long)]
    trails: Option<PathBuf>,

    /// Text response attached to the record as post-hike analysis
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Ambient temperature reported by the environment source
    #[arg(long, default_value = "70.0")]
    temperature_f: f64,

    /// Replay speed multiplier (0 = as fast as possible)
    #[arg(long, default_value = "0")]
    speed: f64,

    /// Seconds without a fix before the signal is considered lost
    #[arg(long, default_value = "30")]
    signal_timeout_secs: u64,

    /// Stop the hike when the signal is lost instead of only warning
    #[arg(long)]
    stop_on_signal_loss: bool,

    /// Write live status every N ticks
    #[arg(long, default_value = "5")]
    status_every: u64,

    #[arg(long, default_value = "hike_sessions")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => HikeConfig::from_json_file(path)?,
        None => HikeConfig::default(),
    };
    if let Some(threshold) = args.jitter_threshold_miles {
        config.session.jitter_threshold_miles = threshold;
        config.validate()?;
    }

    let log = FixLog::load(&args.fix_log)?;
    let Some(start_ms) = log.start_ms() else {
        bail!("{} contains no entries", args.fix_log.display());
    };
    info!("Loaded {} entries from {}", log.entries.len(), args.fix_log.display());

    let mut store = JsonFileStore::open(&args.output_dir)?;
    let mut env_cache = EnvironmentalCache::load_from(config.environment.clone(), &store)?;
    let mut environment = ConstantEnvironment {
        temperature_f: args.temperature_f,
        fetches: 0,
    };

    let mut profile = SubjectProfile::new(&args.subject, args.stride_m, args.heat_tolerance, args.weight_kg)
        .with_medical_risk(args.medical_risk);
    if let Some(path) = &args.breed_traits {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let traits = parse_breed_traits(&text);
        info!(
            "Breed traits: stride {:.2} m, heat tolerance {:.0}, {:?}",
            traits.stride_length_meters, traits.heat_tolerance, traits.energy_baseline
        );
        profile = traits.apply_to(profile);
    }

    if let Some(path) = &args.trails {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        for trail in parse_trails(&text) {
            println!(
                "  {} ({:.1} mi, +{:.0} ft, {:?}) dog-ability {:.0}: {}",
                trail.name,
                trail.distance_miles,
                trail.elevation_gain_feet,
                trail.difficulty,
                trail.dog_ability_score,
                trail.dog_ability_reason
            );
        }
    }

    // Replay time drives every clock read in the controller.
    let clock = ManualClock::new(start_ms);
    let mut controller = HikeSessionController::new(config, &clock);
    if controller.start(profile, &log)? == StartOutcome::Restarted {
        warn!("Previous session discarded");
    }

    let mut watchdog = FixWatchdog::new(args.signal_timeout_secs);
    watchdog.arm(clock.now_ms());

    let (tx, mut rx) = mpsc::channel::<SessionEvent>(256);
    let producer = tokio::spawn(feed::replay_loop(log.entries, tx, args.speed));

    let status_path = args.output_dir.join("live_status.json").to_string_lossy().to_string();
    let mut fixes = 0u64;
    let mut errors = 0u64;
    let mut ticks = 0u64;

    while let Some(event) = rx.recv().await {
        clock.set(event.timestamp_ms().max(clock.now_ms()));
        let now = clock.now_ms();

        match event {
            SessionEvent::Fix(fix) => {
                if env_cache.should_refresh(&fix.coordinate, now) {
                    match environment.fetch(&fix.coordinate) {
                        Ok(reading) => env_cache.record_fetch(reading, fix.coordinate, now),
                        Err(e) => warn!("Environment fetch failed, keeping cached reading: {}", e),
                    }
                }
                let reading = env_cache.current();
                if let Some(outcome) = controller.on_fix(&fix, &reading) {
                    fixes += 1;
                    watchdog.record_fix(now);
                    if outcome.signal_recovered {
                        info!("GPS signal recovered");
                    }
                    debug!(
                        "fix {:.6},{:.6} +{:.5} mi",
                        outcome.smoothed.latitude, outcome.smoothed.longitude, outcome.added_distance_miles
                    );
                }
            }
            SessionEvent::FixError { reason, .. } => {
                errors += 1;
                controller.on_fix_error(&reason);
            }
            SessionEvent::Tick { .. } => {
                ticks += 1;
                controller.on_tick();
                if watchdog.check(now) && args.stop_on_signal_loss {
                    warn!("Stopping hike after signal loss");
                    break;
                }
                if args.status_every > 0 && ticks % args.status_every == 0 {
                    let status = LiveStatus::from_session(controller.state(), now)
                        .with_temperature(env_cache.current().temperature_f)
                        .with_signal(controller.is_signal_degraded(), watchdog.time_since_last_fix_ms(now));
                    if let Err(e) = status.save(&status_path) {
                        warn!("Failed to write live status: {}", e);
                    }
                }
            }
        }
    }
    drop(rx);
    let _ = producer.await;

    let final_status = LiveStatus::from_session(controller.state(), clock.now_ms())
        .with_temperature(env_cache.current().temperature_f)
        .with_signal(controller.is_signal_degraded(), watchdog.time_since_last_fix_ms(clock.now_ms()));
    let record = controller.stop();
    env_cache.save_to(&mut store)?;
    let _ = final_status.save(&status_path);

    println!("\n=== Hike Summary ===");
    println!("Fixes accepted: {}  errors: {}  environment fetches: {}", fixes, errors, environment.fetches);

    let Some(record) = record else {
        println!("Session too short to keep; nothing recorded.");
        return Ok(());
    };

    println!("Distance: {:.3} mi", record.distance_miles);
    println!("Elapsed: {} s", record.elapsed_seconds);
    println!("Steps: {:.0}", record.step_count);
    println!("Strain: {:.1}", record.strain_index);
    println!("Calories: {:.1}", record.calories_burned);
    println!("Water: {:.1} oz", record.water_need_oz);

    let gpx_path = args.output_dir.join(format!("{}.gpx", record.record_id));
    std::fs::write(&gpx_path, to_gpx_xml(&record))?;

    let record_id = record.record_id.clone();
    let mut history = HikeHistory::open(store)?;
    history.add(record)?;

    let response = match &args.analysis {
        Some(path) => std::fs::read_to_string(path).ok(),
        None => None,
    };
    let analysis = analysis_or_fallback(response.as_deref());
    history.attach_analysis(&record_id, &analysis)?;

    info!(
        "Saved {} ({} records for {}) and {}",
        record_id,
        history.for_subject(&args.subject).count(),
        args.subject,
        gpx_path.display()
    );
    Ok(())
}
