use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::path::PathBuf;
use std::{io, time::Duration};
use tokio::sync::mpsc;

mod analysis;
mod api;
mod config;
mod dispatch;
mod export;
mod logging;
mod poller;
mod store;
mod ui;

#[cfg(test)]
mod testing;

use api::client::HoneyClient;
use config::Config;
use dispatch::Dispatcher;
use poller::Poller;
use ui::app::{App, Update};

#[derive(Parser)]
#[command(name = "d-honey")]
#[command(about = "Live dashboard for a honeypot backend", long_about = None)]
struct Cli {
    /// Адрес бэкенда (http://host:port)
    #[arg(short, long, env = "D_HONEY_BACKEND")]
    backend: Option<String>,

    /// YAML-конфиг, по умолчанию ./d-honey.yaml если есть
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    interval_ms: Option<u64>,

    #[arg(long)]
    export_dir: Option<PathBuf>,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(b) = self.backend {
            config.backend_base_url = b;
        }
        if let Some(ms) = self.interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(dir) = self.export_dir {
            config.export_dir = dir;
        }
        if let Some(f) = self.log_file {
            config.log_file = f;
        }
    }
}

const SIM_SSH_PORT: u16 = 22;
const SIM_HTTP_PORT: u16 = 80;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    logging::init(&config.log_file)?;
    let backend = config.backend_url()?;
    info!("d-honey starting, backend {}", backend);

    let client = HoneyClient::new(&backend, config.request_timeout())
        .context("building HTTP client")?;
    let (tx, mut rx) = mpsc::channel::<Update>(64);

    let mut poller = Poller::start(client.clone(), config.poll_period(), tx.clone());
    let dispatcher = Dispatcher::new(client, tx, poller.refresher(), config.export_dir.clone());
    dispatcher.load_backend_info();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend_ui = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_ui)?;

    let mut app = App::new(config.top_n, backend.to_string());
    let res = run_app(&mut terminal, &mut app, &mut rx, &dispatcher).await;

    // Сначала гасим опрос, потом отдаём терминал
    poller.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("ui loop failed: {:?}", err);
        println!("{:?}", err)
    }
    info!("d-honey stopped");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rx: &mut mpsc::Receiver<Update>,
    dispatcher: &Dispatcher,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::view::draw(f, app))?;

        for _ in 0..100 {
            if let Ok(u) = rx.try_recv() { app.apply(u); } else { break; }
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),

                    KeyCode::Char('1') => {
                        dispatcher.simulate(SIM_SSH_PORT);
                    }
                    KeyCode::Char('2') => {
                        dispatcher.simulate(SIM_HTTP_PORT);
                    }
                    KeyCode::Char('e') => {
                        app.status_msg = dispatch::EXPORT_PENDING.to_string();
                        dispatcher.export();
                    }
                    KeyCode::Char('l') => {
                        dispatcher.set_listening(!app.store.listening());
                    }
                    KeyCode::Char('r') => dispatcher.refresh(),

                    KeyCode::Down => app.next(),
                    KeyCode::Up => app.previous(),
                    KeyCode::End => app.follow(),
                    _ => {}
                },
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollDown => app.next(),
                    MouseEventKind::ScrollUp => app.previous(),
                    _ => {}
                },
                _ => {}
            }
        }
    }
}
