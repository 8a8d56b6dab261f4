use clap::{Parser, Subcommand};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "rouillevfs",
    about = "Browse a user's sandbox through the virtual filesystem."
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Mount point, overrides the configuration file
    #[arg(short, long)]
    pub base_directory: Option<String>,

    /// User to log in as
    #[arg(short, long)]
    pub user: String,

    /// Password, when the passwd backend asks for one
    #[arg(short, long)]
    pub password: Option<String>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List names (NLST), or long lines (LIST) with --long
    Ls {
        #[arg(default_value = "")]
        path: String,
        #[arg(short, long)]
        long: bool,
    },
    /// Machine readable listing (MLSD)
    Mlsd {
        #[arg(default_value = "")]
        path: String,
    },
    /// Facts of a single entry (MLST)
    Mlst { path: String },
    /// Modification time (MDTM)
    Mdtm { path: String },
    /// Digest of a file, in hex
    Digest {
        path: String,
        #[arg(short, long, default_value = "MD5")]
        algo: String,
    },
    /// Free space of the user's root
    Free,
    /// MLST facts advertised in FEAT
    Feat,
}
