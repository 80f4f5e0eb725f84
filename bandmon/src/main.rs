//! Entry point for the bandmon CLI: parse args, resolve a connection
//! profile and run the live feed headless, logging batches and status
//! transitions.

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bandmon::profiles::{
    load_profiles, save_profiles, ProfileEntry, ProfileRequest, ProfilesFile, ResolveProfile,
};
use bandmon::{ConnectOptions, LiveFeed, SubscribeOptions};

struct ParsedArgs {
    url: Option<String>,
    profile: Option<String>,
    save: bool,
    interval_ms: Option<u64>,
    interfaces: Vec<String>,
    dry_run: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "bandmon".into());
    let usage = format!(
        "Usage: {prog} [--profile NAME|-P NAME] [--save] [--interval MS|-i MS] [--iface NAME]... [--dry-run] [ws://HOST:PORT/ws]"
    );

    let mut url: Option<String> = None;
    let mut profile: Option<String> = None;
    let mut save = false;
    let mut interval_ms: Option<u64> = None;
    let mut interfaces: Vec<String> = Vec::new();
    let mut dry_run = false;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage),
            "--profile" | "-P" => {
                profile = it.next();
            }
            "--interval" | "-i" => {
                interval_ms = it.next().and_then(|v| v.parse().ok());
            }
            "--iface" => {
                if let Some(v) = it.next() {
                    interfaces.push(v);
                }
            }
            "--save" => {
                save = true;
            }
            "--dry-run" => {
                dry_run = true;
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--interval=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    interval_ms = v.parse().ok();
                }
            }
            _ if arg.starts_with("--iface=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        interfaces.push(v.to_string());
                    }
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {usage}"));
                }
            }
        }
    }
    Ok(ParsedArgs {
        url,
        profile,
        save,
        interval_ms,
        interfaces,
        dry_run,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        interval_ms: parsed.interval_ms,
        interfaces: parsed.interfaces.clone(),
    };

    let mut profiles_mut = profiles_file.clone();
    let entry: ProfileEntry = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_ref() {
                persist_profile(&mut profiles_mut, name, &entry, parsed.save);
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            eprint!("Enter number (or blank to abort): ");
            let _ = io::stderr().flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                return Ok(());
            }
            let Ok(idx) = line.trim().parse::<usize>() else {
                return Ok(());
            };
            if idx < 1 || idx > names.len() {
                return Ok(());
            }
            match profiles_mut.profiles.get(&names[idx - 1]) {
                Some(entry) => entry.clone(),
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (ws://HOST:PORT/ws or wss://...): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                interval_ms: parsed.interval_ms,
                interfaces: parsed.interfaces.clone(),
            };
            profiles_mut.profiles.insert(name, entry.clone());
            let _ = save_profiles(&profiles_mut);
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(());
        }
    };

    if parsed.dry_run {
        eprintln!(
            "dry-run: url={} interval={}ms interfaces={:?}",
            entry.url,
            entry.interval_ms.unwrap_or(2000),
            entry.interfaces
        );
        return Ok(());
    }

    run_feed(entry).await
}

fn persist_profile(profiles: &mut ProfilesFile, name: &str, entry: &ProfileEntry, force: bool) {
    match profiles.profiles.get(name) {
        None => {
            // New profile: auto-save immediately.
            profiles.profiles.insert(name.to_string(), entry.clone());
            let _ = save_profiles(profiles);
        }
        Some(existing) if existing != entry => {
            let overwrite =
                force || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "));
            if overwrite {
                profiles.profiles.insert(name.to_string(), entry.clone());
                let _ = save_profiles(profiles);
            }
        }
        Some(_) => {}
    }
}

async fn run_feed(entry: ProfileEntry) -> anyhow::Result<()> {
    let subscribe_opts = SubscribeOptions {
        interval_ms: entry.interval_ms.unwrap_or(2000),
        interfaces: entry.interfaces.clone(),
    };
    let feed = LiveFeed::new(ConnectOptions::default(), subscribe_opts);

    feed.on_live_update(|batch| {
        for sample in batch {
            info!(
                interface = %sample.interface,
                rx_bits = sample.rx_bits,
                tx_bits = sample.tx_bits,
                timestamp = %sample.timestamp,
                "sample"
            );
        }
    });
    feed.connect(&entry.url)?;
    info!(url = %entry.url, "live feed started");

    let mut last_state = feed.connection_status().state;
    let mut ticks: u32 = 0;
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let status = feed.connection_status();
                if status.state != last_state {
                    info!(state = %status.state, attempts = status.attempts, "connection state changed");
                    last_state = status.state;
                }
                ticks += 1;
                if ticks % 10 == 0 {
                    let summary = feed.summary();
                    info!(
                        avg_rx = summary.avg_rx,
                        avg_tx = summary.avg_tx,
                        max_rx = summary.max_rx,
                        max_tx = summary.max_tx,
                        "rolling summary"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; shutting down");
                feed.disconnect();
                return Ok(());
            }
        }
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
