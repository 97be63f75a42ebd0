use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use hookscope_core::error::{HookscopeError, HookscopeResult};
use hookscope_core::{describe_hook, InnerTypeOverride, InspectOptions, Inspection, Overrides, Snapshot};
use hookscope_utils::{debug, info, init_logging, init_logging_with_level, LogFormat, LogLevel};

mod render;

const EXPRESSION_HINT: &str = "the expression must name a value recorded in the snapshot";

/// Reconstruct intrusive lists and trees from debugger memory and type metadata.
#[derive(Parser, Debug)]
#[command(name = "hookscope")]
#[command(version)]
#[command(about = "Walk intrusive lists and trees in recorded debug sessions", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides HOOKSCOPE_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Maximum link reads per traversal, 0 for unlimited
    #[arg(long, global = true)]
    step_limit: Option<u64>,

    /// Inner type override, `OUTER::MEMBER=TYPE` (repeatable)
    #[arg(long = "inner-type", global = true, value_name = "OUTER::MEMBER=TYPE")]
    inner_types: Vec<InnerTypeOverride>,

    /// Static method override reading a field through the first argument, `FUNCTION=FIELD` (repeatable)
    #[arg(long = "static-member", global = true, value_name = "FUNCTION=FIELD")]
    static_members: Vec<StaticMember>,

    #[command(subcommand)]
    command: Commands,
}

/// Where the inspected state comes from
#[derive(Args, Debug)]
struct Source
{
    /// Snapshot file (JSON)
    #[arg(long)]
    snapshot: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Traverse a container and print each element
    Walk
    {
        #[command(flatten)]
        source: Source,
        /// Expression evaluating to the container
        #[arg(long)]
        container: String,
    },
    /// Resolve the value a single node belongs to
    Value
    {
        #[command(flatten)]
        source: Source,
        /// Value-traits type name
        #[arg(long)]
        value_traits: String,
        /// Expression evaluating to the node pointer
        #[arg(long)]
        node: String,
    },
    /// Print the node-traits type resolved for a value-traits type
    NodeTraits
    {
        #[command(flatten)]
        source: Source,
        /// Value-traits type name
        #[arg(long)]
        value_traits: String,
    },
    /// Summarize a hook and print the node it embeds
    Hook
    {
        #[command(flatten)]
        source: Source,
        /// Expression evaluating to the hook
        #[arg(long)]
        hook: String,
    },
    /// Resolve the value an intrusive iterator points at
    Iter
    {
        #[command(flatten)]
        source: Source,
        /// Expression evaluating to the iterator
        #[arg(long)]
        iterator: String,
    },
}

/// `FUNCTION=FIELD`: answer `FUNCTION(node)` by reading `node->FIELD`
#[derive(Debug, Clone, PartialEq, Eq)]
struct StaticMember
{
    function: String,
    field: String,
}

impl FromStr for StaticMember
{
    type Err = HookscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let invalid = || HookscopeError::InvalidArgument(format!("expected FUNCTION=FIELD, got {s:?}"));
        let (function, field) = s.rsplit_once('=').ok_or_else(invalid)?;
        let (function, field) = (function.trim(), field.trim());
        if function.is_empty() || field.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            function: function.to_string(),
            field: field.to_string(),
        })
    }
}

impl Cli
{
    fn overrides(&self) -> Overrides
    {
        let mut overrides = Overrides::new();
        for entry in &self.inner_types {
            overrides.apply_inner_type(entry.clone());
        }
        for entry in &self.static_members {
            let field = entry.field.clone();
            overrides.register_static_method(entry.function.clone(), move |session, args| {
                let node = args.first().ok_or_else(|| {
                    HookscopeError::InvalidArgument("static member override called without arguments".to_string())
                })?;
                let none = Overrides::new();
                let inspection = Inspection::new(session, &none);
                inspection.member(node, &field)
            });
        }
        overrides
    }

    fn options(&self) -> InspectOptions
    {
        match self.step_limit {
            Some(0) => InspectOptions { step_limit: None },
            Some(limit) => InspectOptions { step_limit: Some(limit) },
            None => InspectOptions::default(),
        }
    }
}

fn main()
{
    let cli = Cli::parse();

    // Explicit flags win over RUST_LOG / HOOKSCOPE_LOG_FORMAT
    let logging = match (cli.log_level, cli.log_format) {
        (None, None) => init_logging(),
        (level, format) => init_logging_with_level(level.unwrap_or(LogLevel::Warn), format.unwrap_or_default()),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(cli: &Cli) -> HookscopeResult<()>
{
    let overrides = cli.overrides();
    debug!(?overrides, "override tables");

    match &cli.command {
        Commands::Walk { source, container } => {
            let mut session = load(source)?;
            let mut inspection = Inspection::with_options(&mut session, &overrides, cli.options());
            let container = inspection.evaluate(container, EXPRESSION_HINT)?;
            info!(container = %container.ty().name, "walking container");

            let mut walk = inspection.traverse(&container)?;
            while let Some(element) = walk.next() {
                let element = element?;
                println!("{}", render::element(walk.inspection(), &element));
            }
            Ok(())
        }
        Commands::Value {
            source,
            value_traits,
            node,
        } => {
            let mut session = load(source)?;
            let mut inspection = Inspection::with_options(&mut session, &overrides, cli.options());
            let value_traits = inspection.require_type(value_traits)?;
            let node = inspection.evaluate(node, EXPRESSION_HINT)?;
            let value = inspection.resolve_value(&value_traits, &node)?;
            println!("{}", render::pointer(&inspection, &value));
            Ok(())
        }
        Commands::NodeTraits { source, value_traits } => {
            let mut session = load(source)?;
            let inspection = Inspection::with_options(&mut session, &overrides, cli.options());
            let value_traits = inspection.require_type(value_traits)?;
            let node_traits = inspection.resolve_node_traits(&value_traits)?;
            println!("{}", node_traits.stripped_name());
            Ok(())
        }
        Commands::Hook { source, hook } => {
            let mut session = load(source)?;
            let mut inspection = Inspection::with_options(&mut session, &overrides, cli.options());
            let hook = inspection.evaluate(hook, EXPRESSION_HINT)?;
            let hook_type = if hook.ty().is_pointer() {
                inspection.dereference(&hook)?.ty().clone()
            } else {
                hook.ty().clone()
            };
            println!("{}", describe_hook(&hook_type)?);
            let node = inspection.unwrap_hook(&hook)?;
            println!("{}", render::object(&inspection, &node));
            Ok(())
        }
        Commands::Iter { source, iterator } => {
            let mut session = load(source)?;
            let mut inspection = Inspection::with_options(&mut session, &overrides, cli.options());
            let iterator = inspection.evaluate(iterator, EXPRESSION_HINT)?;
            let value = inspection.value_from_iterator(&iterator)?;
            println!("{}", render::pointer(&inspection, &value));
            Ok(())
        }
    }
}

fn load(source: &Source) -> HookscopeResult<Snapshot>
{
    info!(path = %source.snapshot.display(), "loading snapshot");
    Snapshot::from_file(&source.snapshot)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_static_member()
    {
        let entry: StaticMember = "my::node_traits::get_next = next_".parse().unwrap();
        assert_eq!(entry.function, "my::node_traits::get_next");
        assert_eq!(entry.field, "next_");
        assert!("no_field=".parse::<StaticMember>().is_err());
        assert!("nothing".parse::<StaticMember>().is_err());
    }

    #[test]
    fn test_cli_global_flags()
    {
        let cli = Cli::try_parse_from([
            "hookscope",
            "walk",
            "--snapshot",
            "list.json",
            "--container",
            "v_list",
            "--step-limit",
            "0",
            "--inner-type",
            "my::traits::node_traits=my::node_traits",
            "--static-member",
            "my::node_traits::get_next=next_",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.options().step_limit, None);
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        let overrides = cli.overrides();
        assert_eq!(overrides.inner_type("my::traits", "node_traits"), Some("my::node_traits"));
        assert!(overrides.static_method("my::node_traits::get_next").is_some());
        assert!(matches!(cli.command, Commands::Walk { ref container, .. } if container == "v_list"));
    }

    #[test]
    fn test_default_step_limit()
    {
        let cli = Cli::try_parse_from(["hookscope", "node-traits", "--snapshot", "s.json", "--value-traits", "T"]).unwrap();
        assert_eq!(cli.options(), InspectOptions::default());
        assert!(cli.overrides().is_empty());
    }
}
