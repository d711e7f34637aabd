use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches, SubCommand};
use postwalk::{build_site, serve, Config};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = App::new("postwalk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static blog from a directory of Markdown and HTML posts")
        .arg(
            Arg::with_name("source")
                .long("source")
                .value_name("DIR")
                .takes_value(true)
                .help("The source directory (default: posts)"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .value_name("DIR")
                .takes_value(true)
                .help("The output directory, replaced on every build (default: output)"),
        )
        .subcommand(
            SubCommand::with_name("serve")
                .about("Builds the site, then serves it until interrupted")
                .arg(
                    Arg::with_name("port")
                        .long("port")
                        .short("p")
                        .takes_value(true)
                        .help("The port to listen on (default: 8000)"),
                )
                .arg(
                    Arg::with_name("host")
                        .long("host")
                        .takes_value(true)
                        .help("The address to bind to (default: 127.0.0.1)"),
                )
                .arg(
                    Arg::with_name("no-open")
                        .long("no-open")
                        .help("Don't open a browser tab"),
                ),
        )
        .get_matches();

    let cwd = std::env::current_dir().context("Getting the working directory")?;
    let mut config = Config::from_directory(&cwd)?;
    if let Some(source) = matches.value_of("source") {
        config.source_directory = PathBuf::from(source);
    }
    if let Some(output) = matches.value_of("output") {
        config.output_directory = PathBuf::from(output);
    }

    let serve_matches = matches.subcommand_matches("serve");
    if let Some(serve_matches) = serve_matches {
        apply_serve_args(&mut config, serve_matches)?;
    }

    build_site(&config).context("Building site")?;

    if serve_matches.is_some() {
        serve::serve(&config.server_config()).context("Serving site")?;
    }
    Ok(())
}

fn apply_serve_args(config: &mut Config, matches: &ArgMatches) -> Result<()> {
    if let Some(port) = matches.value_of("port") {
        config.port = port
            .parse()
            .with_context(|| format!("Invalid port `{}`", port))?;
    }
    if let Some(host) = matches.value_of("host") {
        config.host = host.to_owned();
    }
    if matches.is_present("no-open") {
        config.open_browser = false;
    }
    Ok(())
}
