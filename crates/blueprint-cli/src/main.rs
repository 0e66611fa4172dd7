use clap::{Args, Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "blueprint",
    about = "Blueprint — compose a web backend stack from one configuration file",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Json,
    Text,
}

/// Values that replace fields of the loaded snapshot before validation.
#[derive(Args, Clone, Debug, Default)]
pub struct Overrides {
    /// Override [project].environment (development, staging, production)
    #[arg(short, long)]
    pub environment: Option<String>,
    /// Override [project].name
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Tier {
    Keyed,
    Relational,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose the stack and emit the template
    Synth {
        /// Path to blueprint.toml
        #[arg(short, long, default_value = "blueprint.toml")]
        config: String,
        #[command(flatten)]
        overrides: Overrides,
        /// Output format: json template or text report
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Validate the configuration and compose without writing anything
    Validate {
        #[arg(short, long, default_value = "blueprint.toml")]
        config: String,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print the stack outputs
    Outputs {
        #[arg(short, long, default_value = "blueprint.toml")]
        config: String,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Scaffold a blueprint.toml
    Init {
        /// Directory to write blueprint.toml into
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Project name used as the resource name prefix
        #[arg(long)]
        project: String,
        #[arg(short, long, default_value = "development")]
        environment: String,
        #[arg(short, long, value_enum, default_value = "keyed")]
        tier: Tier,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blueprint_compose=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Synth {
            config,
            overrides,
            format,
            out,
        } => commands::synth::synth(&config, &overrides, format, out.as_deref()),
        Commands::Validate { config, overrides } => commands::synth::validate(&config, &overrides),
        Commands::Outputs { config, overrides } => commands::synth::outputs(&config, &overrides),
        Commands::Init {
            path,
            project,
            environment,
            tier,
        } => commands::init::init(&path, &project, &environment, tier),
    }
}
