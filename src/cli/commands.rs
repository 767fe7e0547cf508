use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "tree-copy",
    about = concat!(
        "tree-copy v",
        env!("CARGO_PKG_VERSION"),
        " - a live file tree for your tmux sidebar"
    ),
    version
)]
pub struct Cli {
    /// Directory to show (defaults to the current directory)
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Don't watch the filesystem; the tree only changes when you expand or collapse
    #[arg(long)]
    pub no_watch: bool,

    /// Use a different session state file
    #[arg(long, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Use a different config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn directory_defaults_to_cwd() {
        let cli = Cli::parse_from(["tree-copy"]);
        assert_eq!(cli.directory, PathBuf::from("."));
        assert!(!cli.no_watch);
        assert!(cli.state_file.is_none());
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from([
            "tree-copy",
            "/proj",
            "--no-watch",
            "--state-file",
            "/tmp/s.json",
            "--config",
            "/tmp/c.toml",
        ]);
        assert_eq!(cli.directory, PathBuf::from("/proj"));
        assert!(cli.no_watch);
        assert_eq!(cli.state_file, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
