// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use keep_relay::Result;

use crate::cli::{Cli, Commands};
use crate::output::Output;

fn init_logging() {
    let use_json = std::env::var("KEEP_LOG_JSON").is_ok();
    let filter = EnvFilter::from_default_env();

    if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() {
    init_logging();

    let out = Output::new();

    if let Err(e) = run(&out) {
        out.error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(out: &Output) -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan(args) => {
            debug!(
                explicit = args.relay.len(),
                base = args.base.len(),
                group = args.group.is_some(),
                "computing relay plan"
            );
            commands::plan::cmd_plan(out, &args)
        }
        Commands::Check { urls, json } => commands::check::cmd_check(out, &urls, json),
    }
}
