// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use anyhow::Result;
use clap::{Parser, Subcommand};
use controller_shared::settings::Settings;
use std::path::PathBuf;

mod rsvp;

#[derive(Parser, Debug, Clone)]
#[clap(name = "rsvp-controller", version)]
pub struct Args {
    #[clap(
        short,
        long,
        default_value = "config.toml",
        help = "Specify path to configuration file"
    )]
    pub config: PathBuf,

    #[clap(subcommand)]
    cmd: Option<SubCommand>,
}

#[derive(Subcommand, Debug, Clone)]
#[clap(rename_all = "kebab_case")]
enum SubCommand {
    /// Print the number of registered email addresses
    Count,
    /// Confirm a registration without following the confirmation link
    Confirm {
        /// Token from the confirmation link
        token: String,
    },
}

impl Args {
    /// Returns true if we want to startup the controller after we finished the cli part
    pub fn controller_should_start(&self) -> bool {
        self.cmd.is_none()
    }
}

/// Parses the CLI-Arguments into [`Args`]
///
/// Also runs (optional) cli commands if necessary
pub async fn parse_args() -> Result<Args> {
    let args = Args::parse();

    if let Some(sub_command) = args.cmd.clone() {
        let settings = Settings::load(&args.config)?;

        match sub_command {
            SubCommand::Count => rsvp::count(settings).await?,
            SubCommand::Confirm { token } => rsvp::confirm(settings, &token).await?,
        }
    }

    Ok(args)
}
