use anyhow::Context;
use clap::Parser;
use cooprings_core::report::RunReport;
use cooprings_data::TraderKind;
use cooprings_io::load_snapshot;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print run statistics for a saved snapshot", long_about = None)]
struct Args {
    /// Snapshot file (`.json` or `.json.gz`)
    #[arg(short, long, default_value = "run.json")]
    input: String,

    /// Also break down submissions by trader kind
    #[arg(short, long)]
    kinds: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let snapshot = load_snapshot(&args.input)
        .with_context(|| format!("Failed to load snapshot {}", args.input))?;
    println!("Snapshot saved at {}", snapshot.saved_at);
    println!("{}", RunReport::from_snapshot(&snapshot));

    if args.kinds {
        println!();
        for kind in [TraderKind::Normal, TraderKind::RandomVoter, TraderKind::BadVoter] {
            let (traders, submitted, accepted) = snapshot
                .traders
                .iter()
                .filter(|t| t.kind == kind)
                .fold((0usize, 0u64, 0u64), |(n, s, a), t| {
                    let id = &t.profile.id;
                    (
                        n + 1,
                        s + snapshot.submit_count.get(id).copied().unwrap_or(0),
                        a + snapshot.accepted_count.get(id).copied().unwrap_or(0),
                    )
                });
            println!("{kind:?}: {traders} traders, {submitted} submitted, {accepted} accepted");
        }
    }

    Ok(())
}
