use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "carbon", about = "Command-line client for the carbon service", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Server URL (overrides the config file)
    #[arg(long, global = true, env = "CARBON_URL")]
    pub url: Option<String>,

    /// Print JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        /// Account email (defaults to the last one used)
        email: Option<String>,

        /// Password; prompted for when absent
        #[arg(long, env = "CARBON_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Create an account
    Register {
        email: String,

        #[arg(long, env = "CARBON_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the signed-in user
    Whoami,

    /// List schools
    Schools {
        /// Refetch every school even if cached
        #[arg(short, long)]
        force: bool,
    },

    /// Show one school
    School { usid: String },

    /// Show the colour theme
    Theme,

    /// Change the account password
    Passwd {
        #[arg(long, env = "CARBON_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_schools_force() {
        let args = Args::try_parse_from(["carbon", "schools", "--force"]).unwrap();
        assert!(matches!(args.command, Commands::Schools { force: true }));
    }
}
