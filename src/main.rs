use clap::{Parser, Subcommand, ValueEnum};
use pf_isolate::{check_privileges, Error, Settings, StampPolicy, VERSION};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Cut a host off the network except for its OSSEC/Wazuh manager", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Agent configuration holding the manager address and port
    #[arg(short = 'c', long = "config", env = "PF_ISOLATE_CONFIG", default_value = pf_isolate::config::DEFAULT_DOCUMENT_PATH)]
    config: PathBuf,

    /// pfctl binary
    #[arg(long, env = "PF_ISOLATE_PFCTL", default_value = pf_isolate::pf::DEFAULT_PFCTL)]
    pfctl: PathBuf,

    /// Command to run pfctl through, one argument per flag (e.g. --pfctl-wrapper sudo --pfctl-wrapper -n)
    #[arg(long = "pfctl-wrapper", allow_hyphen_values = true)]
    pfctl_wrapper: Vec<String>,

    /// Write rules to this file and load it, instead of piping them to pfctl
    #[arg(long, env = "PF_ISOLATE_RULES_FILE")]
    rules_file: Option<PathBuf>,

    /// Load the firewall rules before stamping the audit record
    #[arg(long)]
    stamp_after_apply: bool,

    /// Skip listing the active rules after loading them
    #[arg(long)]
    no_verify: bool,

    /// Label key of the audit record
    #[arg(long, env = "PF_ISOLATE_AUDIT_KEY", default_value = pf_isolate::document::ISOLATED_TIME_KEY)]
    audit_key: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to log to (use "stdout" or "stderr" for console output)
    #[arg(short = 'l', long, env = "PF_ISOLATE_LOG", default_value = "stderr")]
    log_path: String,

    /// Result format printed on stdout
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Stamp the agent configuration and load the isolation rules (default)
    Isolate,
    /// Disable the packet filter, lifting isolation
    Release,
    /// Print the rules an isolation would load, changing nothing
    Rules,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl Args {
    fn settings(&self) -> Settings {
        let stamp_policy = if self.stamp_after_apply {
            StampPolicy::AfterApply
        } else {
            StampPolicy::BeforeApply
        };

        Settings::builder()
            .document_path(self.config.clone())
            .pfctl(self.pfctl.clone())
            .pfctl_wrapper(self.pfctl_wrapper.clone())
            .maybe_rules_file(self.rules_file.clone())
            .stamp_policy(stamp_policy)
            .verify(!self.no_verify)
            .audit_key(self.audit_key.clone())
            .build()
    }
}

fn main() {
    // Load .env file if it exists
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Error loading .env file: {}", e);
        }
    }

    let args = Args::parse();

    // Initialize logging
    let env_filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let _guard = if args.log_path == "stdout" {
        let subscriber = subscriber.with(fmt::layer().with_writer(std::io::stdout));
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        None
    } else if args.log_path == "stderr" {
        let subscriber = subscriber.with(fmt::layer().with_writer(std::io::stderr));
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        None
    } else {
        let file_appender = tracing_appender::rolling::never("", &args.log_path);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let subscriber = subscriber.with(fmt::layer().with_ansi(false).with_writer(non_blocking));
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        Some(guard)
    };

    if let Err(e) = run(&args) {
        error!("{}", e);
        if let Some(suggestion) = e.suggestion() {
            warn!("{}", suggestion);
        }
        eprintln!("pf-isolate: {}", e);

        let code = e.exit_code();
        drop(_guard);
        std::process::exit(code);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let isolator = args.settings().isolator()?;

    match args.command.unwrap_or(Command::Isolate) {
        Command::Rules => {
            let plan = isolator.plan()?;
            match args.output {
                OutputFormat::Text => print!("{}", plan.rules_text),
                OutputFormat::Json => print_json(&plan)?,
            }
        }
        Command::Release => {
            check_privileges();
            isolator.release()?;
            if args.output == OutputFormat::Json {
                print_json(&serde_json::json!({ "released": true }))?;
            }
        }
        Command::Isolate => {
            check_privileges();
            info!("Starting pf-isolate v{}", VERSION);

            let report = isolator.isolate()?;
            match args.output {
                OutputFormat::Text => println!(
                    "Packet filter configured with rules based on the address {} and port {} from {}",
                    report.plan.endpoint.address(),
                    report.plan.endpoint.port(),
                    report.document.display()
                ),
                OutputFormat::Json => print_json(&report)?,
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
