//! Mouse Replay - record pointer input and play it back.
//!
//! The engine (capture, recording store, playback scheduler, notifier) is
//! plain Rust and usable on its own. With the `desktop` feature the crate also
//! provides the Tauri application that drives it.

pub mod capture;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod engine;
pub mod playback;
pub mod recorder;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mouse_replay=debug,tauri=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Initialize the application
#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use commands::{AppEmitter, EngineState};
    use config::EngineConfig;
    use engine::EngineController;
    use tauri::Manager;

    init_tracing();

    tracing::info!("Starting Mouse Replay v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default engine config: {:#}", e);
        EngineConfig::default()
    });
    let controller = EngineController::new(capture::default_backend(), config);

    let app = tauri::Builder::default()
        .manage(EngineState::new(controller.clone()))
        .setup(|app| {
            let state = app.state::<EngineState>();
            let rx = state.controller.subscribe();
            let sink = AppEmitter::new(app.handle().clone());
            tauri::async_runtime::spawn(playback::notifier::pump(rx, sink));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Capture commands
            commands::playback::start_mouse_listener,
            commands::playback::stop_mouse_listener,
            commands::playback::clear_playback_queue,
            // Playback commands
            commands::playback::start_playback,
            commands::playback::stop_playback,
            commands::playback::playback_events,
            // System commands
            commands::system::get_engine_status,
            commands::system::get_recording,
            commands::system::check_input_permission,
            commands::system::request_input_permission,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(move |handle, event| {
        if let tauri::RunEvent::Exit = event {
            handle.state::<EngineState>().forwarders.abort_all();
            tauri::async_runtime::block_on(controller.shutdown());
        }
    });
}
