use anyhow::Result;
use clap::Parser;
use cooprings_lib::app::App;
use cooprings_lib::model::metrics::init_logging;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of coin types (members per cooperation ring)
    #[arg(long)]
    types: Option<u32>,

    /// Run time in seconds (0 runs until every trader is out of funds)
    #[arg(short, long)]
    time: Option<u64>,

    /// Number of traders
    #[arg(long)]
    traders: Option<usize>,

    /// Number of traders that vote randomly
    #[arg(long)]
    random: Option<usize>,

    /// Number of traders that always vote against
    #[arg(long)]
    bad: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Write the final snapshot here (.gz compresses it)
    #[arg(short, long)]
    save: Option<String>,

    /// Resume from a saved snapshot
    #[arg(short, long)]
    load: Option<String>,

    /// Halt on the first infrastructure error
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = App::load_config(&args.config);
    let sim = &mut config.simulation;
    if let Some(types) = args.types {
        sim.coin_type_count = types;
    }
    if let Some(time) = args.time {
        sim.run_seconds = time;
    }
    if let Some(traders) = args.traders {
        sim.num_traders = traders;
    }
    if let Some(random) = args.random {
        sim.num_random_voters = random;
    }
    if let Some(bad) = args.bad {
        sim.num_bad_voters = bad;
    }
    if args.seed.is_some() {
        sim.seed = args.seed;
    }
    sim.strict |= args.strict;
    config.validate()?;

    let mut app = match &args.load {
        Some(path) => App::load(path, config)?,
        None => App::new(config)?,
    };
    app.save_path = args.save.map(Into::into);

    let report = app.run().await?;
    println!("{report}");

    let code = app.shutdown.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
