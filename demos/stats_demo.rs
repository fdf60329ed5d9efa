use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use dense_hash::HashTable;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "initial_capacity", default_value_t = 1)]
    initial_capacity: usize,

    #[arg(short = 'n', long = "values", default_value_t = 100_000)]
    values: u64,

    /// Remove every k-th value after filling; 0 disables removal.
    #[arg(short = 'r', long = "remove_every", default_value_t = 3)]
    remove_every: u64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() -> Result<(), dense_hash::Error> {
    let args = Args::parse();

    println!(
        "Creating HashTable with initial capacity: {}",
        args.initial_capacity
    );

    let mut table: HashTable<u64, u64> = HashTable::with_capacity(args.initial_capacity)?;
    println!(
        "Actual capacity: {} ({} buckets, {} bytes)",
        table.capacity(),
        table.bucket_count(),
        table.layout().size()
    );
    println!("Filling table with {} u64 values...", args.values);

    let mut remaps = 0;
    for value in 0..args.values {
        let capacity = table.capacity();
        table.add(hash_u64(value), value, value * 2)?;
        if table.capacity() != capacity {
            remaps += 1;
        }
    }

    println!("Inserted {} values with {} remaps", table.len(), remaps);
    table.debug_stats().print();

    if args.remove_every > 0 {
        for value in (0..args.values).step_by(args.remove_every as usize) {
            table.remove(hash_u64(value), &value);
        }
        println!(
            "Removed every {} value(s); {} remain, values region holds {} entries",
            args.remove_every,
            table.len(),
            table.values().len()
        );
        table.debug_stats().print();
    }

    let layout = table.layout();
    println!(
        "Regions: values @ {} ({} bytes), nodes @ {} ({} bytes), buckets @ {} ({} bytes)",
        layout.values.offset,
        layout.values.bytes,
        layout.nodes.offset,
        layout.nodes.bytes,
        layout.buckets.offset,
        layout.buckets.bytes
    );

    table.dispose();
    Ok(())
}
