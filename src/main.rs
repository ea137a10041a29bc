// Hide console window in release builds on Windows
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Tray module is only used by the main binary, not the library
#[cfg(windows)]
mod tray;

use log::{info, warn};
use std::panic;
use std::sync::Arc;
use swifttunnel_agent::config::{agent_data_dir, AgentConfig};
use swifttunnel_agent::elevation;
use swifttunnel_agent::rotate_log_if_needed;
use swifttunnel_agent::scheduler;
use swifttunnel_agent::updater::UpdateAgent;
use tokio::runtime::Runtime;

/// Log file name under the agent data directory
const LOG_FILENAME: &str = "update-agent.log";

/// Crash log name under the agent data directory
const CRASH_FILENAME: &str = "update-agent-crash.log";

#[cfg(windows)]
const SINGLE_INSTANCE_MUTEX: &str = "SwiftTunnel_UpdateAgent_Mutex_v1";

/// Holds the single-instance mutex for the process lifetime
#[cfg(windows)]
struct SingleInstanceGuard {
    _handle: windows::Win32::Foundation::HANDLE,
}

/// Try to acquire the single-instance mutex.
///
/// Returns Some(guard) if we're the first instance, None if another instance
/// is already running. The deployment task launches the agent at every
/// logon, so duplicate starts are expected.
#[cfg(windows)]
fn try_acquire_single_instance() -> Option<SingleInstanceGuard> {
    use windows::core::HSTRING;
    use windows::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS};
    use windows::Win32::System::Threading::CreateMutexW;

    unsafe {
        match CreateMutexW(None, true, &HSTRING::from(SINGLE_INSTANCE_MUTEX)) {
            Ok(handle) => {
                if GetLastError() == ERROR_ALREADY_EXISTS {
                    let _ = CloseHandle(handle);
                    None
                } else {
                    Some(SingleInstanceGuard { _handle: handle })
                }
            }
            Err(_) => {
                warn!("Failed to create single-instance mutex, continuing anyway");
                Some(SingleInstanceGuard {
                    _handle: windows::Win32::Foundation::HANDLE::default(),
                })
            }
        }
    }
}

/// Set up crash logging to capture panics
fn setup_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC at {}: {}", location, message);

        let crash_dir = agent_data_dir();
        let _ = std::fs::create_dir_all(&crash_dir);
        let crash_info = format!(
            "[{}] PANIC at {}: {}\nBacktrace (if RUST_BACKTRACE=1):\n{:?}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            location,
            message,
            std::backtrace::Backtrace::capture()
        );
        let _ = std::fs::write(crash_dir.join(CRASH_FILENAME), &crash_info);
    }));
}

/// Initialize file logging; the console is hidden in release builds
fn init_logging() {
    let log_dir = agent_data_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file_path = log_dir.join(LOG_FILENAME);

    if let Err(e) = rotate_log_if_needed(&log_file_path) {
        eprintln!("Log rotation failed: {}", e);
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|_| log::LevelFilter::Debug)
        .unwrap_or(log::LevelFilter::Info);

    if let Ok(log_file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
    {
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(log_file)))
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_millis()
            .init();
    }

    info!("Log file: {}", log_file_path.display());
}

fn main() -> anyhow::Result<()> {
    setup_panic_hook();
    init_logging();

    info!("========================================");
    info!("SwiftTunnel Update Agent v{}", env!("CARGO_PKG_VERSION"));

    #[cfg(windows)]
    let _instance_guard = match try_acquire_single_instance() {
        Some(guard) => {
            info!("Single-instance lock acquired");
            guard
        }
        None => {
            info!("Another agent instance is already running. Exiting.");
            return Ok(());
        }
    };

    // Silent installs need administrator rights; relaunch elevated when the
    // deployment task didn't grant them.
    if !elevation::is_administrator() {
        info!("Not elevated, requesting administrator relaunch");
        match elevation::relaunch_elevated() {
            Ok(()) => {
                info!("Elevated instance launched. Exiting.");
                return Ok(());
            }
            Err(e) => {
                warn!("Elevated relaunch failed: {}. Continuing without elevation; installs may fail.", e);
            }
        }
    }

    let config = AgentConfig::default();
    let rt = Runtime::new()?;
    let agent = Arc::new(UpdateAgent::new(&config)?);

    let _scheduler = scheduler::spawn(rt.handle(), Arc::clone(&agent), config.check_interval);
    info!(
        "Scheduler running, checking every {} minutes",
        config.check_interval.as_secs() / 60
    );

    run_control_surface(&rt, agent)
}

/// Tray loop: poll the two menu flags, keep the message queue drained
#[cfg(windows)]
fn run_control_surface(rt: &Runtime, agent: Arc<UpdateAgent>) -> anyhow::Result<()> {
    let tray = tray::AgentTray::new().map_err(anyhow::Error::msg)?;

    loop {
        tray::pump_messages();

        if tray.take_check_now() {
            let agent = Arc::clone(&agent);
            rt.spawn(async move { agent.run_cycle().await });
        }

        if tray.quit_requested() {
            info!("Exiting on tray request");
            break;
        }

        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    Ok(())
}

/// Dev fallback for platforms without the tray: the same two actions,
/// driven from stdin
#[cfg(not(windows))]
fn run_control_surface(rt: &Runtime, agent: Arc<UpdateAgent>) -> anyhow::Result<()> {
    use std::io::BufRead;

    println!("commands: check | exit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line?.trim() {
            "check" => {
                let agent = Arc::clone(&agent);
                rt.spawn(async move { agent.run_cycle().await });
            }
            "exit" => break,
            "" => {}
            other => println!("unknown command: {}", other),
        }
    }

    info!("Exiting on control request");
    Ok(())
}
