//! flowmap CLI - run a single flow step over an NDJSON message stream
//!
//! Loads a step definition (settings plus input/output models) from YAML,
//! starts the configured component and feeds it messages read line by line.

use clap::{Parser, Subcommand, ValueEnum};
use flowmap::runtime::{CollectingCallback, ComponentContext, ComponentFactory, ComponentRuntime};
use flowmap::serialization::{JsonArrayWriter, MessageReader, NdjsonWriter};
use flowmap::{FlowStepConfig, Message, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowmap")]
#[command(version, about = "Run attribute mapping flow steps over message streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a flow step over NDJSON messages
    Run {
        /// Path to the step definition (YAML)
        #[arg(short, long)]
        step: PathBuf,

        /// NDJSON input file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ndjson)]
        format: OutputFormat,
    },

    /// Load and start a flow step without processing messages
    Validate {
        /// Path to the step definition (YAML)
        #[arg(short, long)]
        step: PathBuf,
    },

    /// List registered component types and their settings
    Components,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Ndjson,
    Json,
}

enum MessageSink {
    Ndjson(NdjsonWriter<Box<dyn Write>>),
    Json(JsonArrayWriter<Box<dyn Write>>),
}

impl MessageSink {
    fn open(output: Option<&Path>, format: OutputFormat) -> Result<Self> {
        let writer: Box<dyn Write> = match output {
            Some(path) => Box::new(io::BufWriter::new(File::create(path)?)),
            None => Box::new(io::BufWriter::new(io::stdout())),
        };

        Ok(match format {
            OutputFormat::Ndjson => MessageSink::Ndjson(NdjsonWriter::new(writer)),
            OutputFormat::Json => MessageSink::Json(JsonArrayWriter::new(writer)?),
        })
    }

    fn write(&mut self, message: &Message) -> Result<()> {
        match self {
            MessageSink::Ndjson(writer) => writer.write(message),
            MessageSink::Json(writer) => writer.write(message),
        }
    }

    fn finish(self) -> Result<()> {
        match self {
            MessageSink::Ndjson(mut writer) => writer.flush(),
            MessageSink::Json(writer) => writer.finish(),
        }
    }
}

fn open_input(input: &Path) -> Result<Box<dyn BufRead>> {
    if input.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    Ok(Box::new(BufReader::new(File::open(input)?)))
}

/// Feed every message to the component, then signal completion.
fn stream(
    component: &mut dyn ComponentRuntime,
    messages: impl Iterator<Item = Result<Message>>,
    sink: &mut MessageSink,
) -> Result<()> {
    let mut callback = CollectingCallback::new();

    for message in messages {
        component.handle(&message?, &mut callback)?;
        for forwarded in callback.drain() {
            sink.write(&forwarded)?;
        }
    }

    component.flow_completed(&mut callback)?;
    for forwarded in callback.drain() {
        sink.write(&forwarded)?;
    }
    Ok(())
}

fn run(step: &Path, input: &Path, output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = FlowStepConfig::load_from_file(step)?;
    let factory = ComponentFactory::default();
    let mut component = factory.create(&config.step.component)?;

    tracing::info!(step = %config.step.id, component = %config.step.component, "Starting flow step");
    component.start(ComponentContext::from_config(config))?;

    let messages = MessageReader::new(open_input(input)?);
    let mut sink = MessageSink::open(output, format)?;

    // The sink is closed even when a message fails, so JSON output stays valid
    let streamed = stream(component.as_mut(), messages, &mut sink);
    let finished = sink.finish();
    streamed?;
    finished?;

    if let Some(context) = component.context() {
        let statistics = context.statistics();
        tracing::info!(
            received = statistics.messages_received,
            forwarded = statistics.messages_forwarded,
            entities = statistics.entities_processed,
            "Flow step completed"
        );
    }

    Ok(())
}

fn validate(step: &Path) -> Result<()> {
    let config = FlowStepConfig::load_from_file(step)?;
    let factory = ComponentFactory::default();
    let mut component = factory.create(&config.step.component)?;

    let id = config.step.id.clone();
    component.start(ComponentContext::from_config(config))?;

    println!("✓ Step '{}' ({}) is valid", id, component.component_type());
    Ok(())
}

fn components() {
    let factory = ComponentFactory::default();

    for (category, types) in factory.component_types() {
        println!("{}:", category);
        for type_name in types {
            println!("  {}", type_name);
            let Some(definition) = factory.component_definition(&type_name) else {
                continue;
            };
            for setting in &definition.settings {
                let scope = if setting.per_attribute { "attribute" } else { "step" };
                println!("    - {} ({:?}, {})", setting.name, setting.kind, scope);
            }
        }
    }
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            step,
            input,
            output,
            format,
        } => run(&step, &input, output.as_deref(), format),
        Commands::Validate { step } => validate(&step),
        Commands::Components => {
            components();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
