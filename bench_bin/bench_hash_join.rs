use std::time::Instant;

use clap::Parser;
use colexec_core::arrays::array::Array;
use colexec_core::arrays::batch::Batch;
use colexec_core::arrays::datatype::DataType;
use colexec_core::config::execution::{
    DEFAULT_BATCH_SIZE,
    DEFAULT_HASH_JOIN_BUCKET_COUNT,
    ExecutionConfig,
};
use colexec_core::execution::operators::hash_join::{
    HashJoinSourceSpec,
    HashJoinSpec,
    JoinType,
    PhysicalHashJoin,
};
use colexec_core::execution::operators::{BatchSource, MemorySource};
use colexec_error::{DbError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

#[derive(Parser, Debug)]
#[clap(name = "bench_hash_join")]
struct Arguments {
    /// Number of rows on the build side.
    #[arg(long, default_value_t = 1_000_000)]
    build_rows: usize,

    /// Number of rows on the probe side.
    #[arg(long, default_value_t = 1_000_000)]
    probe_rows: usize,

    /// Number of distinct key values to draw from.
    #[arg(long, default_value_t = 100_000)]
    key_cardinality: i64,

    /// Rows per input and output batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Number of hash table buckets.
    #[arg(long, default_value_t = DEFAULT_HASH_JOIN_BUCKET_COUNT)]
    bucket_count: usize,

    /// Join type (inner, left, right, full).
    #[arg(long, default_value = "inner")]
    join_type: JoinType,

    /// Use unique build keys and enable the distinct join path.
    #[arg(long)]
    distinct: bool,

    /// Seed for generating input data.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log level used if RUST_LOG isn't set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as json.
    #[arg(long)]
    json_logs: bool,
}

/// Benchmark the hash join against synthetic data.
fn main() {
    let args = Arguments::parse();

    if let Err(e) = run(args) {
        println!("ERROR: {e}");
        std::process::exit(1);
    }
}

fn run(args: Arguments) -> Result<()> {
    let level: tracing::Level = args
        .log_level
        .parse()
        .map_err(|e| DbError::new("Invalid log level").with_field("error", e))?;
    let format = if args.json_logs {
        logutil::LogFormat::Json
    } else {
        logutil::LogFormat::HumanReadable
    };
    logutil::configure_global_logger(level, format)
        .map_err(|e| DbError::with_source("Failed to configure logger", Box::new(e)))?;

    let config = ExecutionConfig {
        batch_size: args.batch_size,
        hash_join_bucket_count: args.bucket_count,
    };
    config.validate()?;

    if args.key_cardinality <= 0 {
        return Err(DbError::new("Key cardinality must be greater than zero")
            .with_field("key_cardinality", args.key_cardinality));
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = Instant::now();
    let build = generate_batches(
        &mut rng,
        args.build_rows,
        args.key_cardinality,
        args.distinct,
        config.batch_size,
    )?;
    let probe = generate_batches(
        &mut rng,
        args.probe_rows,
        args.key_cardinality,
        false,
        config.batch_size,
    )?;
    info!(elapsed = ?start.elapsed(), "generated input");

    let types = [DataType::Int64, DataType::Utf8];
    let spec = HashJoinSpec::new(
        HashJoinSourceSpec::new(MemorySource::new(build), types, [0], [0, 1]),
        HashJoinSourceSpec::new(MemorySource::new(probe), types, [0], [1]),
        args.join_type,
        config.hash_join_bucket_count,
    )
    .with_distinct(args.distinct);
    let mut join = PhysicalHashJoin::try_new(spec, config.execution_properties())?;

    let start = Instant::now();
    let mut output_rows = 0;
    let mut output_batches = 0;
    loop {
        let batch = join.next_batch()?;
        if batch.num_rows() == 0 {
            break;
        }
        output_rows += batch.num_rows();
        output_batches += 1;
    }
    let elapsed = start.elapsed();

    info!(
        join_type = %args.join_type,
        output_rows,
        output_batches,
        ?elapsed,
        "hash join complete"
    );
    println!(
        "{} join: {} build rows x {} probe rows -> {output_rows} rows in {output_batches} batches, {elapsed:?}",
        args.join_type, args.build_rows, args.probe_rows,
    );

    Ok(())
}

/// Generate batches of (key, payload) rows.
///
/// Keys are the row index when `unique_keys` is set, otherwise drawn uniformly
/// from `0..key_cardinality`.
fn generate_batches(
    rng: &mut StdRng,
    num_rows: usize,
    key_cardinality: i64,
    unique_keys: bool,
    batch_size: usize,
) -> Result<Vec<Batch>> {
    let mut batches = Vec::with_capacity(num_rows.div_ceil(batch_size));
    let mut offset = 0;

    while offset < num_rows {
        let len = batch_size.min(num_rows - offset);
        let keys: Vec<i64> = (offset..offset + len)
            .map(|idx| {
                if unique_keys {
                    idx as i64
                } else {
                    rng.random_range(0..key_cardinality)
                }
            })
            .collect();
        let payloads: Vec<String> = (0..len)
            .map(|_| format!("payload-{}", rng.random_range(0..1024)))
            .collect();

        batches.push(Batch::try_from_arrays([
            Array::from_iter(keys),
            Array::from_iter(payloads),
        ])?);
        offset += len;
    }

    Ok(batches)
}
