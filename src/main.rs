use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    config_dir: Option<PathBuf>,
    blocks_autoplay: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    podwheel::app::run(podwheel::app::AppOptions {
        config_dir: args.config_dir,
        blocks_autoplay: args.blocks_autoplay,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--config-dir" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--config-dir requires a path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--config-dir cannot be empty");
                }
                out.config_dir = Some(PathBuf::from(value.trim()));
            }
            "--blocks-autoplay" => out.blocks_autoplay = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("podwheel");
    println!("  --config-dir path   Settings, library state and logs location");
    println!("  --blocks-autoplay   Behave like a platform that blocks unprompted playback");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags() {
        let parsed = parse_args(args(&["--config-dir", "/tmp/pod", "--blocks-autoplay"])).expect("parse");
        assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/pod")));
        assert!(parsed.blocks_autoplay);
    }

    #[test]
    fn rejects_missing_and_unknown_values() {
        assert!(parse_args(args(&["--config-dir"])).is_err());
        assert!(parse_args(args(&["--host"])).is_err());
    }
}
