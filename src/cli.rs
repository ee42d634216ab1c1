use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kubectl-pod-inventory")]
#[command(about = "Inventory cluster pods into a spreadsheet, one row group per pod template")]
pub struct Cli {
    /// Query the live cluster (default when --offline is not given)
    #[arg(long, conflicts_with = "offline")]
    pub online: bool,

    /// Read `kubectl get -o json` exports instead of querying the cluster
    #[arg(long, value_name = "FILE", num_args = 1..)]
    pub offline: Vec<PathBuf>,

    /// Context used in online mode
    #[arg(long)]
    pub context: Option<String>,

    /// YAML file with pod descriptions
    #[arg(long, default_value = "./description.yaml")]
    pub description_yaml: PathBuf,

    /// Output spreadsheet
    #[arg(short, long, default_value = "./pod-inventory.xlsx")]
    pub output: PathBuf,

    /// Treat missing owner records as errors
    #[arg(long)]
    pub strict: bool,

    /// Only include namespaces matching this regex
    #[arg(short = 'n', long = "namespace", value_name = "REGEX")]
    pub namespace_regex: Option<String>,

    /// Add nodeName and node role columns
    #[arg(long)]
    pub node_columns: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
