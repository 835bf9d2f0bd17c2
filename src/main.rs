use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use simplelog::{LevelFilter, SimpleLogger};

use inkmate::api::{self, Deliver, DemoClient, DotClient};
use inkmate::config::Config;
use inkmate::font::FontService;
use inkmate::view::{Registry, RenderResult};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--print-config") {
        match toml::to_string_pretty(&Config::default()) {
            Ok(s) => print!("{s}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("inkmate {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if let Err(e) = SimpleLogger::init(LevelFilter::Info, simplelog::Config::default()) {
        eprintln!("error: logger init failed: {e}");
        return ExitCode::FAILURE;
    }

    match args[0].as_str() {
        "render" => render_command(&args[1..]),
        "run" => run_command(&args[1..]),
        other => {
            eprintln!("error: unknown command {other:?}");
            print_help();
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("inkmate {}", env!("CARGO_PKG_VERSION"));
    println!("Status-card renderer for 296x152 e-ink dot displays\n");
    println!("USAGE:");
    println!("    inkmate render <scenario> [--params JSON] [--out PATH]");
    println!("    inkmate run [--config PATH] [--demo]\n");
    println!("OPTIONS:");
    println!("    --print-config    Print the default configuration to stdout");
    println!("    --version, -V     Print version information");
    println!("    --help, -h        Print this help message");
}

/// `render <scenario>`: render once and write the PNG (or print the text
/// payload) without touching any device.
fn render_command(args: &[String]) -> ExitCode {
    let Some(scenario) = args.first() else {
        eprintln!("error: render needs a scenario name");
        return ExitCode::FAILURE;
    };

    let mut params = serde_json::Value::Object(serde_json::Map::new());
    let mut out = PathBuf::from("card.png");
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--params" => {
                let Some(raw) = args.get(i + 1) else {
                    eprintln!("error: --params needs a JSON argument");
                    return ExitCode::FAILURE;
                };
                params = match serde_json::from_str(raw) {
                    Ok(v) => v,
                    Err(e) => {
                        eprintln!("error: invalid --params JSON: {e}");
                        return ExitCode::FAILURE;
                    }
                };
                i += 2;
            }
            "--out" => {
                let Some(path) = args.get(i + 1) else {
                    eprintln!("error: --out needs a path");
                    return ExitCode::FAILURE;
                };
                out = PathBuf::from(path);
                i += 2;
            }
            other => {
                eprintln!("error: unknown render option {other:?}");
                return ExitCode::FAILURE;
            }
        }
    }

    let registry = Registry::with_defaults(Arc::new(FontService::new()));
    let outcome = match registry.execute(scenario, params) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("available scenarios: {}", registry.names().join(", "));
            return ExitCode::FAILURE;
        }
    };
    if let Some(reason) = &outcome.degraded {
        log::warn!("{scenario}: degraded render: {reason}");
    }

    match outcome.result {
        RenderResult::Image(payload) => {
            if let Err(e) = std::fs::write(&out, &payload.png) {
                eprintln!("error: cannot write {}: {e}", out.display());
                return ExitCode::FAILURE;
            }
            println!("wrote {} ({} bytes)", out.display(), payload.png.len());
        }
        RenderResult::Text(payload) => {
            if let Some(title) = &payload.title {
                println!("{title}");
            }
            println!("{}", payload.message);
            if let Some(signature) = &payload.signature {
                println!("-- {signature}");
            }
        }
    }
    ExitCode::SUCCESS
}

/// `run`: render and deliver every configured schedule once, sequentially.
/// An external cron scheduler drives this in production.
fn run_command(args: &[String]) -> ExitCode {
    let mut config_path = PathBuf::from("config.toml");
    let mut demo = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let Some(path) = args.get(i + 1) else {
                    eprintln!("error: --config needs a path");
                    return ExitCode::FAILURE;
                };
                config_path = PathBuf::from(path);
                i += 2;
            }
            "--demo" => {
                demo = true;
                i += 1;
            }
            other => {
                eprintln!("error: unknown run option {other:?}");
                return ExitCode::FAILURE;
            }
        }
    }

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client: Box<dyn Deliver> = if demo {
        Box::new(DemoClient::new("demos"))
    } else {
        match DotClient::new(&config.api_key) {
            Ok(client) => Box::new(client),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let registry = Registry::with_defaults(Arc::new(FontService::new()));
    let mut failures = 0u32;
    for device in &config.devices {
        for schedule in &device.schedules {
            let params = match schedule.params_json() {
                Ok(params) => params,
                Err(e) => {
                    log::error!("{}/{}: {e}", device.name, schedule.view);
                    failures += 1;
                    continue;
                }
            };
            let outcome = match registry.execute(&schedule.view, params) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("{}/{}: {e}", device.name, schedule.view);
                    failures += 1;
                    continue;
                }
            };
            if let Some(reason) = &outcome.degraded {
                log::warn!("{}/{}: degraded render: {reason}", device.name, schedule.view);
            }
            match api::deliver(client.as_ref(), &device.device_id, &outcome.result) {
                Ok(response) => {
                    log::info!("{}/{}: {}", device.name, schedule.view, response.message);
                }
                Err(e) => {
                    log::error!("{}/{}: delivery failed: {e}", device.name, schedule.view);
                    failures += 1;
                }
            }
        }
    }

    if failures > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
