use clap::Parser;
use clap::ValueEnum;
use probe_table::HashTable;
use probe_table::config::RecyclingPolicy;
use probe_table::config::TableConfig;
use probe_table::key_hash::KeyHash;
use probe_table::key_hash::PyHash;
use probe_table::probe::ProbeStrategy;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Probe {
    Linear,
    Perturbation,
}

#[derive(Parser, Debug)]
struct Args {
    /// Number of keys to insert
    #[arg(short = 'c', long = "count", default_value_t = 1000)]
    count: u64,

    /// Collision resolution strategy
    #[arg(short = 'p', long = "probe", value_enum, default_value_t = Probe::Perturbation)]
    probe: Probe,

    /// Step over tombstones instead of reusing them
    #[arg(long = "no-recycling")]
    no_recycling: bool,

    /// Delete every n-th key after filling, leaving tombstones behind
    #[arg(short = 'd', long = "delete-every", default_value_t = 0)]
    delete_every: u64,

    /// Print the probe trace of this key in the final table
    #[arg(short = 't', long = "trace")]
    trace: Option<i64>,

    /// Print the full slot dump
    #[arg(long = "dump")]
    dump: bool,
}

fn main() {
    let args = Args::parse();

    let config = TableConfig::cpython32()
        .with_probe(match args.probe {
            Probe::Linear => ProbeStrategy::Linear,
            Probe::Perturbation => ProbeStrategy::Perturbation,
        })
        .with_recycling(if args.no_recycling {
            RecyclingPolicy::NoRecycling
        } else {
            RecyclingPolicy::Recycling
        });

    println!("Creating HashTable with {config:?}");
    let mut table: HashTable<i64, u64, PyHash> =
        HashTable::with_config_and_hasher(config, PyHash).expect("preset configs are valid");

    println!("Inserting {} keys...", args.count);
    let mut resizes = 0;
    for i in 0..args.count {
        let size = table.size();
        // Spread keys so that start indices collide in interesting ways.
        table.set((i as i64).wrapping_mul(7919), i);
        if table.size() != size {
            resizes += 1;
        }
    }

    if args.delete_every > 0 {
        let mut deleted = 0;
        for i in (0..args.count).step_by(args.delete_every as usize) {
            if table.delete(&(i as i64).wrapping_mul(7919)).is_ok() {
                deleted += 1;
            }
        }
        println!("Deleted {deleted} keys");
    }

    println!(
        "size={} fill={} used={} after {} resizes",
        table.size(),
        table.fill(),
        table.used(),
        resizes
    );

    table.probe_histogram().print();
    table.debug_stats().print();

    if args.dump {
        let dump = table.dump();
        for (index, ((hash, key), value)) in dump
            .hashes
            .iter()
            .zip(&dump.keys)
            .zip(&dump.values)
            .enumerate()
        {
            println!("{index:>6} | {hash:?} | {key:?} | {value:?}");
        }
    }

    if let Some(key) = args.trace {
        let hash = PyHash.hash_key(&key);
        let trace = table.config().probe.trace(hash, table.size());
        println!(
            "probe trace of {key} (hash {hash}) in {} slots, start {}:",
            table.size(),
            trace.start
        );
        for (index, links) in trace.links.iter().enumerate() {
            let targets = links
                .iter()
                .map(|link| {
                    if link.perturbed {
                        format!("{}*", link.next)
                    } else {
                        link.next.to_string()
                    }
                })
                .collect::<Vec<_>>();
            println!("{index:>6} -> {}", targets.join(", "));
        }
        println!("path: {:?}", trace.path());
        println!("lookup: {:?}", table.get(&key));
    }
}
