#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;
extern crate libc;
extern crate loggerv;
extern crate serde_json;

extern crate quadcat;

use quadcat::*;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process;

fn print_error_debug(e: &Error) {
    // unwind the error chain
    for cause in e.iter().skip(1) {
        warn!("caused by: {}", cause);
    }
}

fn main() {
    let app = App::new("quadcat")
        .version(crate_version!())
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::ColoredHelp)
        .setting(AppSettings::DeriveDisplayOrder)
        .global_settings(&[AppSettings::ColoredHelp])
        .about("Topology driven quadlet generation")
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Increase verbosity"),
        )
        .arg(
            Arg::with_name("debug")
                .short("d")
                .long("debug")
                .help("Adds line numbers to log statements"),
        )
        .subcommand(
            SubCommand::with_name("validate")
                .arg(
                    Arg::with_name("topology")
                        .required(true)
                        .help("Topology file to validate"),
                )
                .arg(
                    Arg::with_name("summary")
                        .long("summary")
                        .help("Print a topology summary after a successful validation"),
                )
                .about("Validate a topology document"),
        )
        .subcommand(
            SubCommand::with_name("generate")
                .arg(Arg::with_name("topology").required(true).help("Topology file"))
                .arg(Arg::with_name("output").help("Output directory (default: ./output)"))
                .about("Generate quadlet unit files for the enabled services"),
        )
        .subcommand(
            SubCommand::with_name("docs")
                .arg(Arg::with_name("topology").required(true).help("Topology file"))
                .arg(Arg::with_name("output").help("Output directory (default: ./docs)"))
                .about("Generate reference documentation"),
        )
        .subcommand(
            SubCommand::with_name("graph")
                .arg(Arg::with_name("topology").required(true).help("Topology file"))
                .arg(
                    Arg::with_name("dot")
                        .long("dot")
                        .help("Generate dot output for graphviz"),
                )
                .about("Graph the dependencies of a topology"),
        )
        .subcommand(
            SubCommand::with_name("state")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .about("Configuration state tracking")
                .subcommand(
                    SubCommand::with_name("compute")
                        .arg(Arg::with_name("topology").required(true).help("Topology file"))
                        .arg(
                            Arg::with_name("output")
                                .short("o")
                                .long("output")
                                .takes_value(true)
                                .help("Write the snapshot to a file"),
                        )
                        .about("Compute the configuration state snapshot"),
                )
                .subcommand(
                    SubCommand::with_name("diff")
                        .arg(Arg::with_name("old").required(true).help("Old snapshot file"))
                        .arg(Arg::with_name("new").required(true).help("New snapshot file"))
                        .arg(
                            Arg::with_name("output")
                                .short("o")
                                .long("output")
                                .takes_value(true)
                                .help("Write the diff report to a file"),
                        )
                        .about("Compare two state snapshots"),
                )
                .subcommand(
                    SubCommand::with_name("report")
                        .arg(Arg::with_name("state").required(true).help("Snapshot file"))
                        .arg(
                            Arg::with_name("output")
                                .short("o")
                                .long("output")
                                .takes_value(true)
                                .help("Write the report to a file"),
                        )
                        .about("Render a human readable state report"),
                ),
        );

    // usage errors exit 2; help and version keep clap's exit
    let args = app.get_matches_safe().unwrap_or_else(|e| match e.kind {
        clap::ErrorKind::HelpDisplayed | clap::ErrorKind::VersionDisplayed => e.exit(),
        _ => {
            eprintln!("{}", e.message);
            process::exit(2);
        }
    });

    let name = args.subcommand_name().unwrap();
    let _ = run(&args).map_err(|e| {
        error!("{} error: {}", name, e);
        print_error_debug(&e);
        process::exit(1);
    });
    process::exit(0);
}

fn run(args: &ArgMatches) -> Result<()> {
    // initialise deps and set log default - always show INFO messages (+1)
    loggerv::Logger::new()
        .verbosity(args.occurrences_of("verbose") + 1)
        .module_path(true)
        .line_numbers(args.is_present("debug"))
        .init()
        .unwrap();

    // Ignore SIGPIPE errors to avoid having to use let _ = write! everywhere
    // See https://github.com/rust-lang/rust/issues/46016
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    dispatch_commands(args)
}

/// Dispatch clap arguments to quadcat handlers
fn dispatch_commands(args: &ArgMatches) -> Result<()> {
    if let Some(a) = args.subcommand_matches("validate") {
        let tp = Topology::read(Path::new(a.value_of("topology").unwrap()))?;
        let res = validate::validate(&tp);
        res.print_results();
        if a.is_present("summary") && res.is_valid() {
            print_summary(&tp);
        }
        if !res.is_valid() {
            return Err(ErrorKind::InvalidTopology(res.errors().len()).into());
        }
        return Ok(());
    }
    if let Some(a) = args.subcommand_matches("generate") {
        let tp = Topology::read(Path::new(a.value_of("topology").unwrap()))?;
        let out = a.value_of("output").unwrap_or("./output");
        return quadlet::generate(&tp, Path::new(out));
    }
    if let Some(a) = args.subcommand_matches("docs") {
        let tp = Topology::read(Path::new(a.value_of("topology").unwrap()))?;
        let out = a.value_of("output").unwrap_or("./docs");
        return docs::generate(&tp, Path::new(out));
    }
    if let Some(a) = args.subcommand_matches("graph") {
        let tp = Topology::read(Path::new(a.value_of("topology").unwrap()))?;
        return graph::generate(&tp, a.is_present("dot")).map(void);
    }
    if let Some(a) = args.subcommand_matches("state") {
        if let Some(b) = a.subcommand_matches("compute") {
            let tp = Topology::read(Path::new(b.value_of("topology").unwrap()))?;
            let snapshot = Snapshot::compute(&tp);
            return output_or_print(b.value_of("output"), &serde_json::to_string_pretty(&snapshot)?);
        }
        if let Some(b) = a.subcommand_matches("diff") {
            let old = read_snapshot(b.value_of("old").unwrap())?;
            let new = read_snapshot(b.value_of("new").unwrap())?;
            let diff = Snapshot::diff(&old, &new);
            return output_or_print(b.value_of("output"), &diff.report());
        }
        if let Some(b) = a.subcommand_matches("report") {
            let snapshot = read_snapshot(b.value_of("state").unwrap())?;
            return output_or_print(b.value_of("output"), &snapshot.report());
        }
    }
    unreachable!("Subcommand valid, but not implemented");
}

fn void<T>(_x: T) {}

fn read_snapshot(path: &str) -> Result<Snapshot> {
    let pth = Path::new(path);
    if !pth.exists() {
        return Err(ErrorKind::InputNotFound(path.to_string()).into());
    }
    let data = std::fs::read_to_string(pth)?;
    Ok(serde_json::from_str(&data)?)
}

fn output_or_print(output: Option<&str>, content: &str) -> Result<()> {
    if let Some(pth) = output {
        let mut f = File::create(pth)?;
        writeln!(f, "{}", content)?;
        info!("written to {}", pth);
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn print_summary(tp: &Topology) {
    let services = tp.services();
    let unconditional = services.values().filter(|s| s.infrastructure.enabled).count();
    let conditional = services.values().filter(|s| s.infrastructure.is_conditional()).count();
    let published = services
        .values()
        .filter(|s| s.infrastructure.published_port.is_some())
        .count();
    println!("\nTopology summary:");
    println!("  services: {}", services.len());
    println!("  enabled unconditionally: {}", unconditional);
    println!("  enabled conditionally: {}", conditional);
    println!("  services with published ports: {}", published);
}
