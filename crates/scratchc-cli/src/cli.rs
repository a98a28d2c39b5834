//! CLI front end (§4.9, distilled spec §6): `translate <input> [-o <output>]`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scratchc", version, about = "Compiles a JavaScript subset into a Scratch-style .sb3 project")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compiles one input (a `.js` file, an `.html` file, or a `.zip` bundle) into a `.sb3` project.
    Translate {
        /// Source file to translate.
        input: PathBuf,
        /// Output path for the `.sb3` archive. Defaults to the input's file stem with a `.sb3` extension.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}
