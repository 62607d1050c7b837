use colored::Colorize;
use commands::command_argument_builder;
use spyglass::handlers::{
    handle_coverage, handle_gate, handle_run, handle_scan, init_logging, shows_banner,
};
use spyglass_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_logging(chosen_command.get_count("verbose"));

    if shows_banner(chosen_command.subcommand_name(), quiet) {
        print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        Some(("gate", primary_command)) => handle_gate(primary_command),
        Some(("coverage", primary_command)) => handle_coverage(primary_command),
        Some(("run", primary_command)) => handle_run(primary_command).await,
        None => handle_scan(&chosen_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
