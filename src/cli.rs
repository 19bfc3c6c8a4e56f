// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "keep-connect")]
#[command(about = "Relay planning diagnostics for FROST signing nodes")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show the relays a node would connect to, by source
    Plan(PlanArgs),
    /// Normalize URLs and run them through the group relay filter
    Check {
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct PlanArgs {
    /// Group credential (kgroup1...)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Explicit relay, may be repeated
    #[arg(short, long)]
    pub relay: Vec<String>,

    /// Operator override relay (defaults to KEEP_RELAY)
    #[arg(long)]
    pub env_relay: Option<String>,

    /// Default relay, replaces relays.toml and the built-in list
    #[arg(long, conflicts_with = "no_base")]
    pub base: Vec<String>,

    /// Use no default relays
    #[arg(long)]
    pub no_base: bool,

    /// Relay override file (defaults to <config_dir>/keep/relays.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub json: bool,
}
