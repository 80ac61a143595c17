//! Coursesmith — supervisor entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Start supervisor bus + control plane
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Build subsystem handlers (management, llm, tools, courses)
//!   8. Spawn supervisor run-loop
//!   9. Run comms subsystem (drives console/HTTP until shutdown)
//!  10. Cancel token + join supervisor

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::info;

use coursesmith::bootstrap::logger;
use coursesmith::config;
use coursesmith::error::AppError;
use coursesmith::subsystems;
use coursesmith::subsystems::courses::CoursesSubsystem;
use coursesmith::subsystems::llm::LlmSubsystem;
use coursesmith::subsystems::management::{ManagementInfo, ManagementSubsystem};
use coursesmith::subsystems::tools::ToolsSubsystem;
use coursesmith::supervisor;
use coursesmith::supervisor::bus::SupervisorBus;
use coursesmith::supervisor::component_info::ComponentInfo;
use coursesmith::supervisor::control::SupervisorControl;
use coursesmith::supervisor::dispatch::BusHandler;
use coursesmith::supervisor::health::HealthRegistry;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;

    // Without -i, the console channel is inactive (daemon-safe default).
    if !args.interactive {
        config.comms.pty.enabled = false;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level)?;

    info!(
        app_name = %config.app_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        interactive = %args.interactive,
        "config loaded"
    );

    // Shared shutdown token — Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();

    // Build the supervisor bus (buffer = 64 messages) and the
    // supervisor-internal control plane (buffer = 32 messages).
    let bus = SupervisorBus::new(64);
    let control = SupervisorControl::new(32);

    // Clone the handles before moving bus/control into the supervisor task.
    let bus_handle = bus.handle.clone();
    let control_handle = control.handle.clone();

    // Ctrl-C handler — cancels the token so all tasks shut down.
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    // Push-based health registry shared by all subsystems.
    let registry = HealthRegistry::new();

    // OnceLock bridge: comms::start() will populate this once the channel
    // list is known.  ManagementSubsystem reads it when building the tree.
    let comms_info: Arc<OnceLock<ComponentInfo>> = Arc::new(OnceLock::new());

    // Build subsystem handlers and register with the supervisor.
    let mut handlers: Vec<Box<dyn BusHandler>> = vec![];

    let llm_model = match config.llm.provider.as_str() {
        "gemini" => config.llm.gemini.model.clone(),
        _ => config.llm.openai.model.clone(),
    };
    handlers.push(Box::new(ManagementSubsystem::new(
        control_handle,
        registry.clone(),
        ManagementInfo {
            app_name: config.app_name.clone(),
            llm_provider: config.llm.provider.clone(),
            llm_model: llm_model.clone(),
        },
        comms_info.clone(),
    )));

    {
        let llm = LlmSubsystem::new(&config.llm, config.llm_api_key.clone())
            .map_err(|e| AppError::Config(e.to_string()))?
            .with_health_reporter(registry.reporter("llm"));
        llm.spawn_health_checker(shutdown.clone());
        handlers.push(Box::new(llm));
    }

    {
        let tools = ToolsSubsystem::new(&config.search, config.search_api_key.clone())
            .map_err(|e| AppError::Config(e.to_string()))?
            .with_health_reporter(registry.reporter("tools"));
        tools.spawn_health_checker(shutdown.clone());
        handlers.push(Box::new(tools));
    }

    {
        let courses = CoursesSubsystem::new(&config.courses, bus_handle.clone())
            .with_health_reporter(registry.reporter("courses"));
        handlers.push(Box::new(courses));
    }

    // Spawn supervisor run-loop (owns the bus + control receivers).
    let sup_token = shutdown.clone();
    let sup_handle = tokio::spawn(async move {
        supervisor::run(bus, control, sup_token, handlers).await;
    });

    print_startup_summary(&config, &llm_model, args.interactive);

    // Start comms channels as independent concurrent tasks and block until
    // they all exit (Ctrl-C, EOF, or channel error).
    let comms = subsystems::comms::start(&config, bus_handle, shutdown.clone(), comms_info);
    comms.join().await?;

    // If comms exited on its own (EOF, not Ctrl-C), still signal everything
    // to stop.
    shutdown.cancel();

    sup_handle.await.ok();

    if args.interactive {
        use std::io::Write as _;
        println!("\nBye.");
        let _ = std::io::stdout().flush();
    }

    Ok(())
}

fn print_startup_summary(config: &config::Config, llm_model: &str, interactive: bool) {
    let pid = std::process::id();
    let mode_text = if interactive { "interactive" } else { "daemon" };

    let fit = |text: String| -> String {
        const WIDTH: usize = 56;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let llm_line = format!(
        "provider={} model={} timeout={}s",
        config.llm.provider,
        llm_model,
        match config.llm.provider.as_str() {
            "gemini" => config.llm.gemini.timeout_seconds,
            _ => config.llm.openai.timeout_seconds,
        }
    );
    let search_line = format!(
        "provider={} max_results={}",
        config.search.provider, config.search.max_results
    );

    let mut comms_lines: Vec<String> = Vec::new();
    #[cfg(feature = "channel-pty")]
    comms_lines.push(format!(
        "⌨️  pty: {}",
        if config.comms.pty.enabled { "enabled" } else { "disabled" }
    ));
    #[cfg(feature = "channel-axum")]
    {
        if config.comms.axum_channel.enabled {
            comms_lines.push(format!("🌐 http: {}", config.comms.axum_channel.bind));
        } else {
            comms_lines.push("🌐 http: disabled".to_string());
        }
    }

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║ 📚 Coursesmith Supervisor Status                           ║");
    println!("╟────────────────────────────────────────────────────────────╢");
    println!("║ 🧾 App: {}║", fit(config.app_name.clone()));
    println!("║ 🧠 PID: {}║", fit(pid.to_string()));
    println!("║ 🛰️  Mode: {}║", fit(mode_text.to_string()));
    println!("╟────────────────────────────────────────────────────────────╢");
    println!("║ 📡 Comms                                                   ║");
    for line in comms_lines {
        println!("║   {}║", fit(line));
    }
    println!("╟────────────────────────────────────────────────────────────╢");
    println!("║ 🧠 LLM                                                     ║");
    println!("║   {}║", fit(llm_line));
    println!("╟────────────────────────────────────────────────────────────╢");
    println!("║ 🔎 Search                                                  ║");
    println!("║   {}║", fit(search_line));
    println!("╚════════════════════════════════════════════════════════════╝");

    if interactive {
        println!("💡 Describe a course at the prompt, e.g. \"make me a course on sourdough for beginners\"");
    }
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: coursesmith [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Run in interactive mode (enables the console channel)");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn   (suppress info noise, show warnings+errors only)
    //   -vv     → info   (normal operational output)
    //   -vvv    → debug  (flow-level diagnostics: routing, handler registration)
    //   -vvvv+  → trace  (full payload dumps, very verbose)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs {
        log_level,
        interactive,
        config_path,
    }
}
