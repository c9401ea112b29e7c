use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tmon_monitor::{render_text, run_simulator, telemetry, MonitorConfig, SimulatorConfig, TreeMonitor};
use tmon_tree::MemoryHierarchy;

fn cli() -> Command {
    Command::new("tmon")
        .version(tmon_monitor::VERSION)
        .about("Shadow task tree monitor")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run the shadow tree simulator")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("max-tasks")
                        .long("max-tasks")
                        .default_value("64")
                        .value_parser(value_parser!(usize))
                        .help("Running tasks above which only exits are generated"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(Command::new("demo").about("Walk through a small spawn / exit scenario"))
        .subcommand(
            Command::new("check-config")
                .about("Load and validate a configuration file")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration file to check"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<MonitorConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => MonitorConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(MonitorConfig::default()),
    }
}

fn simulate(args: &ArgMatches) -> anyhow::Result<bool> {
    let config = SimulatorConfig {
        seed: *args.get_one::<u64>("seed").context("missing --seed")?,
        total_operations: *args.get_one::<u64>("operations").context("missing --ops")?,
        max_live_tasks: *args.get_one::<usize>("max-tasks").context("missing --max-tasks")?,
        stop_on_first_violation: args.get_flag("stop-on-violation"),
        ..SimulatorConfig::default()
    };

    let report = run_simulator(config);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }
    Ok(report.passed())
}

fn demo(config: MonitorConfig) -> anyhow::Result<bool> {
    let mut live = MemoryHierarchy::new();
    let root = live.root();
    let mut monitor = TreeMonitor::new(config);
    monitor.start(&live, root)?;

    let g1 = live.open_group(root)?;
    let t1 = live.spawn(g1)?;
    monitor.on_task_spawned(&live, t1)?;
    let t2 = live.spawn(g1)?;
    monitor.on_task_spawned(&live, t2)?;
    print_step("spawned", &monitor);

    for task in [t1, t2] {
        live.exit(task)?;
        monitor.on_task_exited(task)?;
        print_step(&format!("{task} exited"), &monitor);
    }

    let report = monitor.verify(&live)?;
    println!("checked {} nodes, {} mismatches", report.checked, report.mismatches.len());
    Ok(report.passed())
}

fn print_step(label: &str, monitor: &TreeMonitor<MemoryHierarchy>) {
    println!("== {label}");
    if let Some(tree) = monitor.tree() {
        print!("{}", render_text(tree));
    }
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let passed = match matches.subcommand() {
        Some(("check-config", args)) => {
            let path = args.get_one::<PathBuf>("path").context("missing --path")?;
            let config = MonitorConfig::load(path)?;
            println!("{}", toml::to_string_pretty(&config)?);
            true
        }
        Some(("simulate", args)) => {
            telemetry::init(&load_config(args)?)?;
            simulate(args)?
        }
        Some(("demo", args)) => {
            let config = load_config(args)?;
            telemetry::init(&config)?;
            demo(config)?
        }
        _ => true,
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
