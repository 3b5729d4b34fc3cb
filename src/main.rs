use anyhow::Context;
use argh::FromArgs;
use local_weather::{
    config::{Props, DEFAULTS},
    display::Display,
    mock_display::FrameBuffer,
    weather::UreqFetcher,
    WeatherWidget,
};
use log::{info, warn, LevelFilter};
use std::{
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::SystemTime,
};

#[derive(FromArgs)]
/// Show current weather conditions for a location
struct Args {
    /// path to the props file. If it doesn't exist, defaults are used
    #[argh(
        option,
        short = 'c',
        default = "PathBuf::from(Props::PATH)"
    )]
    config: PathBuf,

    /// frame buffer width, in pixels
    #[argh(option, default = "296")]
    width: u32,

    /// frame buffer height, in pixels
    #[argh(option, default = "128")]
    height: u32,

    /// fetch once, print the result, and exit
    #[argh(switch)]
    once: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("local_weather", LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Args = argh::from_env();
    let mut config_file = ConfigFile::new(args.config);
    let props = config_file.load()?;
    let mut widget =
        WeatherWidget::mount(DEFAULTS, props, UreqFetcher::default());

    if args.once {
        widget.wait();
        println!("{}", widget.text());
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })
        .context("Error setting Ctrl-C handler")?;
    }

    let mut display = Display::default();
    let mut frame = FrameBuffer::new(args.width, args.height);
    println!("Ctrl-c to exit...");
    while running.load(Ordering::SeqCst) {
        if let Some(props) = config_file.reload() {
            widget.set_props(props);
        }
        if widget.draw(&mut display, &mut frame)? {
            info!("Showing `{}`", display.text().unwrap_or_default());
        }
        thread::sleep(Display::INTERVAL);
    }

    info!("Shutting down");
    Ok(())
}

/// The props file on disk. Edits are picked up while running, by watching
/// the modification time.
struct ConfigFile {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl ConfigFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            modified: None,
        }
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }

    /// Initial load. A missing file is fine, a broken one isn't.
    fn load(&mut self) -> anyhow::Result<Props> {
        self.modified = self.modified();
        if self.path.exists() {
            Props::load(&self.path)
        } else {
            info!(
                "No config file at `{}`, using defaults",
                self.path.display()
            );
            Ok(Props::default())
        }
    }

    /// Get new props if the file changed since the last load. A broken
    /// file is skipped, the widget keeps its current props.
    fn reload(&mut self) -> Option<Props> {
        let modified = self.modified();
        if modified.is_none() || modified == self.modified {
            return None;
        }
        self.modified = modified;
        Props::load(&self.path)
            .map_err(|err| warn!("Error reloading config: {err:?}"))
            .ok()
    }
}
