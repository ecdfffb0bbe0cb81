//! CLI argument parsing for the pipeline driver.
//!
//! The CLI only collects raw values; stage tokens, run ids and config layers
//! are validated after parsing so every usage error maps to one exit status.
use clap::Parser;
use std::path::PathBuf;

/// Root CLI entrypoint for the driver.
#[derive(Parser, Debug)]
#[command(
    name = "driver",
    version,
    about = "Staged lead-generation and website-audit pipeline driver",
    after_help = "Stages (token / alias):\n  discover               0  search for candidate domains (needs configs/manifest.yaml)\n  collect_emails         1  verify outputs/contacts/contacts.csv\n  emails_to_urls         2  derive audit URLs from contact emails\n  enrich_contacts        3  enrich contacts (optional)\n  lighthouse_audit_last  4  audit domains or URLs\n  cwv_analyze            5  compile audit reports to CSV\n  autodoc                6  render the Markdown summary\n  cleanup                7  remove transient audit files\n  all                       run every stage in order\n\nLegacy aliases: enrich, audit, compile, report\n\nExamples:\n  driver all\n  driver discover --provider google --max-results 50\n  driver audit shn-2026-10 --workers 8\n  driver all --plan"
)]
pub struct RootArgs {
    /// Stage token, numeric alias, legacy alias, or `all`
    #[arg(value_name = "STAGE")]
    pub stage: String,

    /// Run identifier recorded in the handoff stamp (defaults to a UTC timestamp)
    #[arg(value_name = "RUN_ID")]
    pub run_id: Option<String>,

    /// Pipeline root containing configs/ and outputs/
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Discovery search provider (google, duckduckgo, all)
    #[arg(long, value_name = "P")]
    pub provider: Option<String>,

    /// Maximum results requested from discovery
    #[arg(long, value_name = "N")]
    pub max_results: Option<u32>,

    /// Parallel audit workers
    #[arg(long, value_name = "N")]
    pub workers: Option<u32>,

    /// Emit info-level logs and pass --verbose to discovery
    #[arg(long)]
    pub verbose: bool,

    /// Print the handoff stamp to stdout after the run
    #[arg(long, conflicts_with = "plan")]
    pub json: bool,

    /// Print the stage plan with current precondition state and exit
    #[arg(long)]
    pub plan: bool,
}
