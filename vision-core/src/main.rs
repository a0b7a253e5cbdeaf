use odal::Config;
use vision_core::{Coordinator, ParameterBlockToml};

/// Directory `vision.toml` is loaded from, relative to the process's working directory.
const CONFIG_DIR: &str = "config";

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt::init();
    miette::set_panic_hook();

    let params = ParameterBlockToml::load_without_overlay(CONFIG_DIR)?;
    let coordinator = Coordinator::spawn(params)?;
    coordinator.start_annotating();

    tracing::info!("vision pipeline running, press Ctrl+C to stop");

    // No signal-handling crate sits in this workspace's dependency tree, so normal
    // shutdown is left to the process supervisor (SIGTERM); `Coordinator::stop` is the
    // graceful API a supervisor with a handle to this process could call instead.
    loop {
        std::thread::park();
    }
}
