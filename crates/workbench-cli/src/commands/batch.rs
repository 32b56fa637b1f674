use crate::cli::BatchArgs;
use crate::error::{CliError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use workbench::protein::{ProteinBatch, RandomProteinOptions, random_protein};

const EDGE_CACHE: &str = "edge_index";

pub fn build(args: &BatchArgs) -> Result<ProteinBatch> {
    if args.batch_size == 0 {
        return Err(CliError::Argument("batch size must be at least 1".into()));
    }
    let mut rng = StdRng::seed_from_u64(args.seed);
    let options = RandomProteinOptions::default();
    let proteins = (0..args.batch_size)
        .map(|_| random_protein(&mut rng, &options))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(workbench::harness::HarnessError::from)?;

    let mut batch = ProteinBatch::from_protein_list(proteins, &["coords"])?;
    batch.assign_batch_from("coords")?;
    batch.edges(&args.edges, Some(EDGE_CACHE))?;
    batch.derive_node_features();
    info!(
        "Built batch of {} graphs with {} nodes.",
        batch.num_graphs(),
        batch.num_nodes()
    );
    Ok(batch)
}

pub fn summarize(batch: &ProteinBatch, edge_spec: &str) -> String {
    let mut lines = vec![format!(
        "{} graphs, {} nodes",
        batch.num_graphs(),
        batch.num_nodes()
    )];
    for (graph, count) in batch.node_counts().into_iter().enumerate() {
        lines.push(format!("  graph {}: {} residues", graph, count));
    }
    let edges = batch.cached_edges(EDGE_CACHE).map_or(0, |e| e.len());
    lines.push(format!("{} edges ({}) cached as '{}'", edges, edge_spec, EDGE_CACHE));
    lines.join("\n")
}

pub fn run(args: BatchArgs) -> Result<String> {
    let batch = build(&args)?;
    Ok(summarize(&batch, &args.edges))
}
