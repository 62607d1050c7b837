pub mod config;
pub mod coverage;
pub mod error;
pub mod finding;
pub mod gate;
pub mod report;
pub mod runner;
pub mod scan;
pub mod security;
pub mod taxonomy;

pub use error::{CoreError, Result};
pub use finding::{Finding, Severity};
pub use report::{Report, SeverityCounts};
pub use security::{ProbeKind, ProbeSettings};

use colored::Colorize;

const BANNER: &str = r#"
  ___ _ __  _   _  __ _| | __ _ ___ ___
 / __| '_ \| | | |/ _` | |/ _` / __/ __|
 \__ \ |_) | |_| | (_| | | (_| \__ \__ \
 |___/ .__/ \__, |\__, |_|\__,_|___/___/
     |_|    |___/ |___/
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "crawl, discover, probe".dimmed(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
