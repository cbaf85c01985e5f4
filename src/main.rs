use clap::Parser;
use color_eyre::eyre::{self as anyhow, Result, WrapErr};
use tracing as log;

use camtrig_core::{CameraTriggerPwm, CamtrigConfig, PwmSink, TriggerPins, WatchTelemetry};

mod mavlink_io;
mod serial_sink;

/// Baud rate of the trigger device port. USB CDC devices ignore it.
const PWM_SERIAL_BAUD: u32 = 115_200;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Path of serial device flashed with the trigger PWM firmware
    #[arg(long)]
    pwm_serial: Option<String>,

    /// MAVLink connection for arming telemetry,
    /// e.g. serial:/dev/ttyACM0:57600 or udpin:0.0.0.0:14550
    #[arg(long)]
    mavlink: Option<String>,

    /// Digit-encoded pin assignment, overrides the config file
    #[arg(long)]
    pins: Option<u32>,

    /// Seconds between intervalometer shots, overrides the config file
    #[arg(long)]
    interval: Option<f64>,

    /// Filename of configuration in YAML format
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, clap::Subcommand, Default)]
enum Commands {
    /// Run the program (default command)
    #[default]
    Run,
    /// Show the configuration and then quit
    ShowConfig,
}

/// Schedules interval shooting: one shot of `activation_time` seconds every
/// `trigger_interval` seconds. Disabled when the interval is zero.
struct Intervalometer {
    trigger_interval: f64,
    activation_time: f64,
    last_shot: Option<std::time::Instant>,
}

impl Intervalometer {
    fn new(trigger_interval: f64, activation_time: f64) -> Self {
        Self {
            trigger_interval,
            activation_time,
            last_shot: None,
        }
    }

    /// Whether the shoot level should be requested at `now_inst`.
    fn want_shoot(&mut self, now_inst: std::time::Instant) -> bool {
        if self.trigger_interval <= 0.0 {
            return false;
        }
        match self.last_shot {
            None => {
                self.last_shot = Some(now_inst);
                true
            }
            Some(last) => {
                let dt = now_inst.duration_since(last).as_secs_f64();
                if dt >= self.trigger_interval {
                    self.last_shot = Some(now_inst);
                    true
                } else {
                    dt < self.activation_time
                }
            }
        }
    }
}

async fn run_loop<S: PwmSink>(
    mut controller: CameraTriggerPwm<S, WatchTelemetry>,
    config: &CamtrigConfig,
) -> Result<()> {
    let period = std::time::Duration::from_secs_f64(1.0 / config.poll_hz);
    let mut poll = tokio::time::interval(period);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut intervalometer = Intervalometer::new(config.trigger_interval, config.activation_time);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let enable = intervalometer.want_shoot(std::time::Instant::now());
                controller.trigger(enable);
            }
            r = &mut ctrl_c => {
                r?;
                log::info!("shutting down, driving pins to the disarmed level");
                controller.drive_safe();
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        let envstr = format!("{}=info,info", env!("CARGO_PKG_NAME")).replace('-', "_");
        std::env::set_var("RUST_LOG", envstr);
    }

    // Enable logging to console using tracing.
    {
        use tracing_subscriber::{fmt, layer::SubscriberExt};
        let console_layer = fmt::layer().with_file(true).with_line_number(true);
        let collector = tracing_subscriber::registry()
            .with(console_layer)
            .with(tracing_subscriber::filter::EnvFilter::from_default_env());
        std::panic::set_hook(Box::new(tracing_panic::panic_hook));
        tracing::subscriber::set_global_default(collector)?;
    }
    color_eyre::install()?;

    let cli = Cli::parse();

    let mut config = if let Some(config_fname) = &cli.config {
        log::info!("Reading config from: {config_fname}");
        let cfg_buf = std::fs::read_to_string(config_fname)
            .with_context(|| format!("opening file {config_fname}"))?;
        serde_yaml::from_str(&cfg_buf)
            .with_context(|| format!("while parsing YAML in file {config_fname}"))?
    } else {
        log::info!("Loading default config.");
        CamtrigConfig::default()
    };

    if let Some(pins) = cli.pins {
        config.trig_pins = pins;
    }
    if let Some(interval) = cli.interval {
        config.trigger_interval = interval;
    }
    if let Some(port_path) = &cli.mavlink {
        config.mavlink.port_path = port_path.clone();
    }
    config.validate()?;

    match cli.command.unwrap_or_default() {
        Commands::ShowConfig => {
            println!("{}", serde_yaml::to_string(&config)?);
            return Ok(());
        }
        Commands::Run => {}
    }

    let pins = TriggerPins::decode(config.trig_pins);
    if pins.is_empty() {
        log::warn!(
            "trig_pins {} decodes to no assigned pins; nothing will be actuated",
            config.trig_pins
        );
    } else {
        log::info!(
            "trigger channels (slot order): {:?}",
            pins.assigned().collect::<Vec<_>>()
        );
    }

    let pwm_serial = cli
        .pwm_serial
        .as_deref()
        .ok_or_else(|| anyhow::eyre!("--pwm-serial is required to run"))?;
    let sink = serial_sink::connect(pwm_serial, PWM_SERIAL_BAUD)?;

    if config.mavlink.port_path.is_empty() {
        anyhow::bail!("no MAVLink source; set --mavlink or mavlink.port_path in the config");
    }
    let arming_rx = mavlink_io::spawn_arming_feed(&config.mavlink, config.pwm_outputs_suppressed)?;
    let telemetry = WatchTelemetry::new(arming_rx, config.mavlink.loss_timeout);

    let mut controller =
        CameraTriggerPwm::new(pins, config.levels, config.pwm_limits, sink, telemetry);
    controller
        .setup()
        .wrap_err("driving initial disarmed-safe state")?;

    run_loop(controller, &config).await
}
