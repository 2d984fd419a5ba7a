use clap::Parser;

/// Discord bot that draws text mazes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: String,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn config_path_from_flag() {
        let cli = Cli::parse_from(["maze-bot", "--config", "/etc/maze-bot.yaml"]);
        assert_eq!(cli.config, "/etc/maze-bot.yaml");

        let cli = Cli::parse_from(["maze-bot", "-c", "local.yaml"]);
        assert_eq!(cli.config, "local.yaml");
    }
}
