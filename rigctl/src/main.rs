//! rigctl
//!
//! Controls a radio transceiver from the command line. Commands given after
//! the options run once; with none, commands are read from stdin. With
//! `--listen` the same commands are served over TCP.

mod daemon;
mod dispatch;
mod settings;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rig_backends::ModelRegistry;
use rig_core::{transport, NullTransport, Rig, RigConfig, SharedRig, Transport};
use rig_protocol::caps::PortType;
use rig_sim::{SimTransport, VirtualKenwood, VirtualRigConfig, VirtualTenTec, VirtualYaesu};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch::{execute, run_line, Flow, ReplyStyle};
use settings::Settings;

/// `-r` value that selects the built-in emulator for the model
const SIM_PORT: &str = "sim";

/// Control a radio over CAT
#[derive(Parser, Debug)]
#[command(name = "rigctl", version, about)]
struct Cli {
    /// Rig model number (see --list)
    #[arg(short = 'm', long)]
    model: Option<u32>,

    /// Serial device, host:port, or "sim" for an emulated radio
    #[arg(short = 'r', long)]
    rig_file: Option<String>,

    /// Serial speed in baud
    #[arg(short = 's', long)]
    serial_speed: Option<u32>,

    /// Configuration tokens, e.g. -C retry=5,timeout=500
    #[arg(short = 'C', long = "set-conf", value_delimiter = ',')]
    conf: Vec<String>,

    /// List supported models and exit
    #[arg(short = 'l', long)]
    list: bool,

    /// Serve commands on a TCP address such as 127.0.0.1:4532
    #[arg(long)]
    listen: Option<String>,

    /// Settings file to use instead of the one in the config directory
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings to the settings file and exit
    #[arg(long)]
    save_settings: bool,

    /// Commands to run once, e.g. `f` or `F 14074000 M USB 0`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    commands: Vec<String>,
}

impl Cli {
    /// Settings from the file with command line flags layered on top
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load(),
        };
        if self.model.is_some() {
            settings.model = self.model;
        }
        if self.rig_file.is_some() {
            settings.rig_file = self.rig_file.clone();
        }
        if self.serial_speed.is_some() {
            settings.serial_speed = self.serial_speed;
        }
        if self.listen.is_some() {
            settings.listen = self.listen.clone();
        }
        settings.apply_conf(self.conf.iter().map(String::as_str))?;
        Ok(settings)
    }
}

/// Emulated radio for a model
fn sim_transport(model: u32, config: &VirtualRigConfig) -> Result<Box<dyn Transport>> {
    let faults = config.faults.clone();
    let transport: Box<dyn Transport> = match model {
        120 => Box::new(SimTransport::with_faults(VirtualYaesu::new(config), faults)),
        228 => Box::new(SimTransport::with_faults(VirtualKenwood::new(config), faults)),
        1602 => Box::new(SimTransport::with_faults(VirtualTenTec::tt538(config), faults)),
        1611 => Box::new(SimTransport::with_faults(VirtualTenTec::tt588(config), faults)),
        other => bail!("no emulator for model {}", other),
    };
    Ok(transport)
}

/// Look up the model, apply configuration and open the session
fn open_rig(registry: &ModelRegistry, settings: &Settings) -> Result<Rig> {
    let entry = registry.get(settings.model())?;
    let caps = entry.caps;

    let mut config = RigConfig::from_caps(caps);
    for (token, value) in &settings.conf {
        config
            .set(token, value)
            .with_context(|| format!("-C {}={}", token, value))?;
    }

    let port = settings.rig_file.as_deref();
    let link: Box<dyn Transport> = if caps.port.port_type == PortType::None {
        Box::new(NullTransport)
    } else if port == Some(SIM_PORT) {
        sim_transport(caps.model, &settings.sim)?
    } else {
        transport::connect(&caps.port, port, settings.serial_speed)
            .with_context(|| format!("Failed to open port for {}", caps.model_name))?
    };

    let mut rig = Rig::with_config(entry.create(), config);
    rig.open(link)
        .with_context(|| format!("Failed to open {} {}", caps.manufacturer, caps.model_name))?;
    Ok(rig)
}

/// Run the commands given on the command line, stopping at the first error
fn run_once(rig: &mut Rig, commands: &[String]) -> Result<ExitCode> {
    let line = commands.join(" ");
    let stdout = io::stdout();
    let flow = run_line(&line, ReplyStyle::Plain, &mut stdout.lock(), |r| execute(rig, r))?;
    Ok(match flow {
        Flow::Failed => ExitCode::FAILURE,
        Flow::Continue | Flow::Quit => ExitCode::SUCCESS,
    })
}

/// Read commands from stdin until `q` or end of input
fn run_interactive(rig: &mut Rig) -> Result<ExitCode> {
    let stdin = io::stdin();
    let prompt = stdin.is_terminal();
    run_lines(rig, stdin.lock(), &mut io::stdout(), prompt)
}

/// Run every line of `input`
///
/// At a prompt errors are only reported; when reading a script the exit
/// status is a failure if any command failed.
fn run_lines(
    rig: &mut Rig,
    input: impl BufRead,
    out: &mut impl Write,
    prompt: bool,
) -> Result<ExitCode> {
    let mut failed = false;
    let mut lines = input.lines();
    loop {
        if prompt {
            write!(out, "\nRig command: ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        match run_line(&line, ReplyStyle::Plain, &mut *out, |r| execute(rig, r))? {
            Flow::Quit => break,
            Flow::Failed => failed = true,
            Flow::Continue => {}
        }
    }
    Ok(if failed && !prompt {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run(cli: Cli) -> Result<ExitCode> {
    let registry = ModelRegistry::with_builtin();
    if cli.list {
        dispatch::list_models(&registry, &mut io::stdout().lock())?;
        return Ok(ExitCode::SUCCESS);
    }

    let settings = cli.settings()?;
    if cli.save_settings {
        let path = cli
            .settings
            .clone()
            .or_else(Settings::settings_path)
            .context("no config directory for settings")?;
        settings.save_to(&path)?;
        println!("Saved settings to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut rig = open_rig(&registry, &settings)?;

    if let Some(addr) = &settings.listen {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start runtime")?;
        let shared = SharedRig::new(rig);
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to listen on {}", addr))?;
            daemon::serve(listener, shared).await
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    let code = if cli.commands.is_empty() {
        run_interactive(&mut rig)?
    } else {
        run_once(&mut rig, &cli.commands)?
    };
    rig.close()?;
    Ok(code)
}

fn main() -> ExitCode {
    // Logs go to stderr so they never mix with command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rigctl=info,rig_core=info,rig_backends=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("rigctl: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
