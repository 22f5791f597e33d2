use anyhow::{Context, Result};
use pnsim::analysis::explore;
use pnsim::config::EngineConfig;
use pnsim::net::io::{load_net, save_net};
use pnsim::options::Options;
use pnsim::sim::Scheduler;

fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let options = match Options::parse_from_args(std::env::args_os().skip(1)) {
        Ok(options) => options,
        Err(err) => match err.downcast_ref::<clap::Error>() {
            Some(clap_err) => clap_err.exit(),
            None => anyhow::bail!("{err}"),
        },
    };
    log::debug!("PN options: {:?}", options);

    let mut config = match &options.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = options.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(policy) = options.policy {
        config.simulation.policy = policy;
    }

    let mut net = load_net(&options.net_file, config.net.clone())
        .with_context(|| format!("Failed to load net: {:?}", options.net_file))?;
    net.log_diagnostics();
    println!("{}", net.validate());

    if let Some(limit) = options.explore {
        println!("reachability: {}", explore(&net, limit));
    }

    let mut scheduler = Scheduler::new(config.simulation.clone());
    for _ in 0..options.steps {
        let event = scheduler.step(&mut net)?;
        if !options.quiet {
            println!("{}", event);
        }
    }
    if let Some(max_firings) = options.run {
        for event in scheduler.run(&mut net, max_firings) {
            if !options.quiet {
                println!("{}", event);
            }
        }
        scheduler.pause();
    }

    if options.steps > 0 || options.run.is_some() {
        println!(
            "after {} firings at t={:.3}:\n{}",
            scheduler.firings(),
            scheduler.now(),
            net.validate()
        );
    }

    if let Some(path) = &options.dot {
        net.write_dot(path)
            .with_context(|| format!("Failed to write DOT file: {:?}", path))?;
    }
    if let Some(path) = &options.output {
        save_net(path, &net).with_context(|| format!("Failed to write snapshot: {:?}", path))?;
    }
    Ok(())
}
