//! ejbx command line
//!
//! `ejbx compile` translates an EJB-QL query against a JSON entity catalog.
//! `ejbx demo` pushes calls through an interceptor chain into an in-process
//! container, optionally over the loopback transport, and prints the
//! collected statistics.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use ejbx::ql::{Catalog, QueryCompiler};
use ejbx::{
    ChainFactory, ContainerInvoker, EjbxConfig, Error, InterfaceDescriptor, InterfaceId,
    Invocation, InvocationContext, InvocationDispatcher, InvocationError, InvocationType,
    LocalInvokerBinding, LoopbackTransport, MethodHashCache, RemoteInvoker,
    TypeDescriptor, Value,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ejbx", version)]
#[command(about = "EJB-QL compiler and interceptor chain driver", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an EJB-QL query
    Compile {
        /// JSON entity catalog
        #[arg(long)]
        catalog: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Sql)]
        format: Format,
        /// Query text; read from stdin when absent
        query: Option<String>,
    },
    /// Run calls through an interceptor chain and print statistics
    Demo {
        /// Number of calls
        #[arg(long, default_value_t = 10)]
        calls: u32,
        /// Skip the in-process binding so calls go over the loopback transport
        #[arg(long)]
        remote: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Canonical EJB-QL
    Ejbql,
    /// Generated SQL
    Sql,
    /// Full compilation result as JSON
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => EjbxConfig::from_json_file(path)?,
        None => EjbxConfig::default(),
    };

    match args.command {
        Command::Compile {
            catalog,
            format,
            query,
        } => compile(&config, catalog, format, query),
        Command::Demo { calls, remote } => demo(&config, calls, remote),
    }
}

fn compile(
    config: &EjbxConfig,
    catalog: PathBuf,
    format: Format,
    query: Option<String>,
) -> Result<(), Error> {
    let catalog = Catalog::from_json_file(&catalog)?;
    tracing::info!(entities = catalog.entity_count(), "Loaded catalog");

    let query = match query {
        Some(query) => query,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let compiler = QueryCompiler::new(Arc::new(catalog), config.query.clone());
    let compiled = compiler.compile(query.trim())?;
    match format {
        Format::Ejbql => println!("{}", compiled.ejbql),
        Format::Sql => println!("{}", compiled.sql),
        Format::Json => {
            let json = serde_json::to_string_pretty(&compiled)
                .map_err(|e| Error::Io(e.to_string()))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn demo(config: &EjbxConfig, calls: u32, remote: bool) -> Result<(), Error> {
    let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Greeter", 1));
    let greet = iface.declare(
        "greet",
        vec![TypeDescriptor::class("java.lang.String")],
        TypeDescriptor::class("java.lang.String"),
    );

    let host = config.invocation.server_host_name.clone();
    let container = Arc::new(ContainerInvoker::new(host.clone(), |inv: &mut Invocation| {
        let name = inv
            .arguments()
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| InvocationError::invalid_invocation("greet takes one string"))?;
        Ok(Value::from(format!("hello {name}")))
    }));

    let hashes = Arc::new(MethodHashCache::new());
    let method_map = Arc::new(hashes.register_interface(&iface)?);
    let dispatcher = Arc::new(InvocationDispatcher::new(
        Arc::clone(&method_map),
        container.clone(),
    ));
    let transport = RemoteInvoker::new(
        LoopbackTransport::new(host, dispatcher),
        Arc::clone(&hashes),
    );

    let factory = ChainFactory::new(ejbx::VmId::new()).with_hash_cache(hashes);
    let local = (!remote).then(|| {
        LocalInvokerBinding::new(factory.vm_id(), container).with_method_map(method_map)
    });
    let chain = factory.build(&config.invocation, local, Vec::new());
    tracing::info!(stages = ?chain.names(), remote, "Running demo");

    let context = InvocationContext::new().with_invoker(Arc::new(transport));
    for i in 0..calls {
        let mut invocation = Invocation::new(
            Arc::clone(&greet),
            vec![Value::from(format!("caller-{i}"))],
        )
        .with_type(InvocationType::Local)
        .with_context(context.clone());
        let result = chain.invoke(&mut invocation)?;
        tracing::debug!(call = i, ?result, "Call returned");
    }

    println!("{}", factory.statistics().to_xml());
    Ok(())
}
