use crate::CLAP_STYLING;
use clap::{arg, command};
use spyglass_core::config::{DEFAULT_CONFIG_PATH, DEFAULT_REPORTS_DIR};
use spyglass_core::coverage::DEFAULT_CATALOG_PATH;
use spyglass_core::report::DEFAULT_REPORT_PATH;
use spyglass_core::runner::Stage;

fn config_arg() -> clap::Arg {
    arg!(-c --"config" <PATH>)
        .required(false)
        .help("Security config with stage commands and gate policy")
        .default_value(DEFAULT_CONFIG_PATH)
}

fn reports_dir_arg() -> clap::Arg {
    arg!(-r --"reports-dir" <DIR>)
        .required(false)
        .help("Directory holding stage reports")
        .default_value(DEFAULT_REPORTS_DIR)
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("spyglass")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spyglass")
        .about(
            "Crawl a website to discover pages, forms and parameters, then run heuristic \
        security probes against everything found.",
        )
        .styles(CLAP_STYLING)
        .subcommand_required(false)
        .subcommand_negates_reqs(true)
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" ... "Log verbosity: -v info, -vv debug, -vvv trace")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(<URL>)
                .required(true)
                .help("Target URL to scan; a bare host like example.com is scanned over https"),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Where to write the JSON report")
                .default_value(DEFAULT_REPORT_PATH),
        )
        .arg(
            arg!(-t --"threads" <NUM_WORKERS>)
                .required(false)
                .help("Maximum concurrent requests while crawling and probing")
                .value_parser(clap::value_parser!(usize))
                .default_value("8"),
        )
        .arg(
            arg!(--"depth" <DEPTH>)
                .required(false)
                .help("Maximum link depth to crawl from the start URL")
                .value_parser(clap::value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-request timeout")
                .value_parser(clap::value_parser!(u64))
                .default_value("10"),
        )
        .arg(
            arg!(--"burst" <REQUESTS>)
                .required(false)
                .help("Sequential requests sent by the rate-limit probe")
                .value_parser(clap::value_parser!(usize))
                .default_value("12"),
        )
        .arg(
            arg!(--"details")
                .required(false)
                .help("Print every finding after the summary")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            command!("gate")
                .about(
                    "Aggregate stage reports and pass or fail on their severities. Exits 1 when \
                the gate fails.",
                )
                .arg(
                    arg!(--"fail-on-high")
                        .required(false)
                        .help("Fail when any high finding is present")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"fail-on-critical")
                        .required(false)
                        .help("Fail when any critical finding is present (config default: on)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(config_arg())
                .arg(reports_dir_arg()),
        )
        .subcommand(
            command!("coverage")
                .about("Report how much of the attack taxonomy the test catalog maps")
                .arg(
                    arg!(--"catalog" <PATH>)
                        .required(false)
                        .help("Test catalog: a JSON list of {attack_id, ...} records")
                        .default_value(DEFAULT_CATALOG_PATH),
                )
                .arg(reports_dir_arg())
                .arg(
                    arg!(--"require-full")
                        .required(false)
                        .help("Exit 1 unless every taxonomy class is mapped and no id is unknown")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("run")
                .about("Run the configured external commands for one pipeline stage")
                .arg(
                    arg!(<STAGE>)
                        .required(true)
                        .help("Stage to run")
                        .value_parser(Stage::ALL.map(|stage| stage.as_str())),
                )
                .arg(config_arg())
                .arg(reports_dir_arg())
                .arg(
                    arg!(-w --"workdir" <DIR>)
                        .required(false)
                        .help("Working directory for the stage commands")
                        .default_value("."),
                ),
        )
}
