//! Parsing Options.
//! `pn-sim <NET_FILE> [-c CONFIG] [-s STEPS] [--run N] [--seed S] [--policy P] [--dot FILE] [-o FILE] [--explore N]`

use clap::{Arg, ArgAction, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;

use crate::sim::SelectionPolicy;

fn make_options_parser() -> clap::Command {
    Command::new("pn-sim")
        .no_binary_name(true)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Load a Petri net snapshot, validate it and simulate it")
        .arg(
            Arg::new("net")
                .value_name("NET_FILE")
                .help("Net snapshot (.json or .ron)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG")
                .help("TOML engine configuration")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("steps")
                .short('s')
                .long("steps")
                .help("Number of manual steps to take")
                .default_value("0")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("run")
                .long("run")
                .value_name("N")
                .help("Run continuously for at most N firings")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for the selection and delay generator")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .help("Tie-breaking among enabled transitions")
                .value_parser(["first", "random", "top-priority"]),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the final net as Graphviz DOT")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path to file where the final snapshot will be stored")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("explore")
                .long("explore")
                .value_name("N")
                .help("Explore up to N reachable markings and report dead ones")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print the final report")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug, Default, PartialEq)]
pub struct Options {
    pub net_file: PathBuf,
    pub config: Option<PathBuf>,
    pub steps: usize,
    pub run: Option<usize>,
    pub seed: Option<u64>,
    pub policy: Option<SelectionPolicy>,
    pub dot: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub explore: Option<usize>,
    pub quiet: bool,
}

impl Options {
    pub fn parse_from_args<I, T>(flags: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags)?;

        let policy = match matches.get_one::<String>("policy") {
            Some(name) => Some(name.parse::<SelectionPolicy>()?),
            None => None,
        };

        Ok(Options {
            net_file: matches
                .get_one::<PathBuf>("net")
                .cloned()
                .ok_or("missing NET_FILE")?,
            config: matches.get_one::<PathBuf>("config").cloned(),
            steps: matches.get_one::<usize>("steps").copied().unwrap_or(0),
            run: matches.get_one::<usize>("run").copied(),
            seed: matches.get_one::<u64>("seed").copied(),
            policy,
            dot: matches.get_one::<PathBuf>("dot").cloned(),
            output: matches.get_one::<PathBuf>("output").cloned(),
            explore: matches.get_one::<usize>("explore").copied(),
            quiet: matches.get_flag("quiet"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let options = Options::parse_from_args([
            "net.json",
            "-c",
            "pn.toml",
            "-s",
            "3",
            "--run",
            "50",
            "--seed",
            "7",
            "--policy",
            "first",
            "--dot",
            "out/net.dot",
            "-o",
            "out/final.ron",
            "--explore",
            "200",
        ])
        .unwrap();
        assert_eq!(options.net_file, PathBuf::from("net.json"));
        assert_eq!(options.config, Some(PathBuf::from("pn.toml")));
        assert_eq!(options.steps, 3);
        assert_eq!(options.run, Some(50));
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.policy, Some(SelectionPolicy::FirstEnabled));
        assert_eq!(options.dot, Some(PathBuf::from("out/net.dot")));
        assert_eq!(options.output, Some(PathBuf::from("out/final.ron")));
        assert_eq!(options.explore, Some(200));
        assert!(!options.quiet);
    }

    #[test]
    fn test_defaults() {
        let options = Options::parse_from_args(["net.ron"]).unwrap();
        assert_eq!(options.steps, 0);
        assert_eq!(options.run, None);
        assert_eq!(options.policy, None);
    }

    #[test]
    fn test_parse_from_args_err() {
        assert!(Options::parse_from_args(["net.json", "--policy", "fastest"]).is_err());
        assert!(Options::parse_from_args(["net.json", "--seed", "-1"]).is_err());
        assert!(Options::parse_from_args(Vec::<String>::new()).is_err());
    }
}
