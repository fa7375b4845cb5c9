use clap::{Args, Parser, Subcommand};
use cmdfuse::config::{self, Config};
use cmdfuse::data;
use cmdfuse::fuse::{CommandFuse, FuseOptions};
use cmdfuse::package::{ParseOptions, TemplatePackage};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cmdfuse", version, about = "Fuse tabular rows with command templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate commands from a data file and a template package
    Generate(GenerateArgs),
    /// Parse a definitions file and deploy it as a named package
    Add(AddArgs),
    /// List deployed packages
    List,
}

#[derive(Args)]
struct GenerateArgs {
    /// Data file with the rows (.csv or .tsv)
    #[arg(short, long)]
    data: PathBuf,

    /// Name of a deployed package to generate from
    #[arg(short, long)]
    package: Option<String>,

    /// Template definitions file; parsed and deployed before generating
    #[arg(short, long, conflicts_with = "package")]
    commands: Option<PathBuf>,

    /// Output ordering: seq (row order) or group (batched per template)
    #[arg(short = 'g', long)]
    strategy: Option<String>,

    /// Row column holding the template ids
    #[arg(long)]
    column: Option<String>,

    /// Separator between template ids in the command column
    #[arg(long)]
    id_separator: Option<String>,

    #[command(flatten)]
    parse_flags: ParseFlags,

    /// Write the generated commands to a file as well
    #[arg(long)]
    save: bool,

    /// Where to save (defaults to the output dir, named after the package)
    #[arg(long, requires = "save")]
    output: Option<PathBuf>,

    /// Do not print the generated commands
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args)]
struct AddArgs {
    /// Template definitions file
    #[arg(short, long)]
    commands: PathBuf,

    /// Package name to deploy under
    #[arg(short, long)]
    name: String,

    #[command(flatten)]
    parse_flags: ParseFlags,
}

#[derive(Args)]
struct ParseFlags {
    /// Id/body separator in definition lines
    #[arg(long, default_value = ":")]
    separator: String,

    /// Left placeholder delimiter
    #[arg(long, default_value = "[")]
    left: String,

    /// Right placeholder delimiter
    #[arg(long, default_value = "]")]
    right: String,

    /// Replacement for stripped delimiters in the stored body
    #[arg(long, default_value = "")]
    strip: String,
}

impl ParseFlags {
    fn to_options(&self) -> ParseOptions {
        ParseOptions {
            separator: self.separator.clone(),
            left_delimiter: self.left.clone(),
            right_delimiter: self.right.clone(),
            strip: self.strip.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_config_or_default();

    let result = match cli.command {
        Command::Generate(args) => run_generate(args, &config),
        Command::Add(args) => run_add(args, &config),
        Command::List => run_list(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_colored_message(&format!("Error: {}\n", e), Color::Red);
            ExitCode::FAILURE
        }
    }
}

fn load_config_or_default() -> Config {
    match config::load_config() {
        Ok(config) => config,
        Err(config::ConfigError::NotFound(_)) => Config::default(),
        Err(e) => {
            print_colored_message(&format!("Warning: {}\n", e), Color::DarkYellow);
            Config::default()
        }
    }
}

fn run_generate(args: GenerateArgs, config: &Config) -> Result<(), Box<dyn Error>> {
    let package_dir = config.package_dir();

    let package = if let Some(path) = &args.commands {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("package");
        let text = fs::read_to_string(path)?;
        let package = TemplatePackage::parse(name, &text, &args.parse_flags.to_options())?;
        fs::create_dir_all(&package_dir)?;
        package.save_in(&package_dir)?;
        print_colored_message(
            &format!("Package '{}' deployed\n", package.name()),
            Color::Green,
        );
        package
    } else if let Some(name) = &args.package {
        TemplatePackage::load(&package_dir.join(name))?
    } else {
        return Err("Provide --package <name> or --commands <path>".into());
    };

    let rows = data::load_rows(&args.data)?;

    let defaults = FuseOptions::default();
    let strategy_selector = args
        .strategy
        .or_else(|| config.strategy.clone())
        .unwrap_or_else(|| defaults.strategy.selector().to_string());
    let options = FuseOptions {
        command_column: args
            .column
            .or_else(|| config.command_column.clone())
            .unwrap_or(defaults.command_column),
        id_separator: args
            .id_separator
            .or_else(|| config.id_separator.clone())
            .unwrap_or(defaults.id_separator),
        strategy: strategy_selector.parse()?,
    };

    let fuser = CommandFuse::new(&rows, &package, options);
    let commands = if args.save {
        let path = match args.output {
            Some(path) => path,
            None => {
                let dir = config.output_dir();
                fs::create_dir_all(&dir)?;
                dir.join(package.name())
            }
        };
        let commands = fuser.fuse_to_file(&path)?;
        print_colored_message(&format!("Saved to {}\n", path.display()), Color::Green);
        commands
    } else {
        fuser.fuse()?
    };

    if !args.quiet {
        for command in &commands {
            println!("{}", command);
        }
    }
    print_colored_message(
        &format!("{} command(s) generated\n", commands.len()),
        Color::Green,
    );
    Ok(())
}

fn run_add(args: AddArgs, config: &Config) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(&args.commands)?;
    let package = TemplatePackage::parse(&args.name, &text, &args.parse_flags.to_options())?;

    let dir = config.package_dir();
    fs::create_dir_all(&dir)?;
    let path = package.save_in(&dir)?;

    print_colored_message(
        &format!("Package '{}' saved to {}\n", package.name(), path.display()),
        Color::Green,
    );
    Ok(())
}

fn run_list(config: &Config) -> Result<(), Box<dyn Error>> {
    let dir = config.package_dir();
    if !dir.exists() {
        print_colored_message("No packages deployed yet.\n", Color::DarkYellow);
        return Ok(());
    }

    let mut names: Vec<String> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();

    if names.is_empty() {
        print_colored_message("No packages deployed yet.\n", Color::DarkYellow);
        return Ok(());
    }

    print_colored_message("Deployed packages:\n", Color::DarkMagenta);
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn print_colored_message(message: &str, color: Color) {
    let mut stdout = io::stdout();
    execute!(
        stdout,
        SetForegroundColor(color),
        Print(message),
        ResetColor
    )
    .unwrap();
}
